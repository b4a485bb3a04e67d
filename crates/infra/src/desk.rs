//! Register desk: the application service in front of the till.
//!
//! Every call runs the same pipeline:
//!
//! ```text
//! load snapshot → rehydrate CashRegister → handle + apply → save (Exact(loaded revision))
//! ```
//!
//! A rejected command saves nothing, and a batch is saved as one snapshot, so
//! either every command in it takes effect or none does.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tillbook_core::{
    Aggregate, AggregateRoot, DomainError, ExpectedVersion, Money, RegisterId, SessionId,
};
use tillbook_events::{Event, EventEnvelope};
use tillbook_register::{
    CancelClose, CashDeposited, CashRegister, CashWithdrawn, ClosingReport, CollectPayment,
    ConfirmClose, DepositCash, InitiateClose, OpenRegister, PaymentCollected, PaymentMethod,
    RegisterCommand, RegisterEvent, RegisterOpened, RegisterSnapshot, WithdrawCash,
    WithdrawalCategory,
};

use crate::ledger_store::{LedgerStore, StoreError};

#[derive(Debug, Error)]
pub enum DeskError {
    /// The ledger refused the action (validation, funds, state) or the stored
    /// revision moved underneath the caller.
    #[error(transparent)]
    Domain(DomainError),

    #[error("register store failure: {0}")]
    Store(StoreError),
}

impl DeskError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            DeskError::Domain(e) => Some(e),
            DeskError::Store(_) => None,
        }
    }
}

impl From<DomainError> for DeskError {
    fn from(value: DomainError) -> Self {
        DeskError::Domain(value)
    }
}

impl From<StoreError> for DeskError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(e) => DeskError::Domain(e),
            other => DeskError::Store(other),
        }
    }
}

pub type RegisterEnvelope = EventEnvelope<RegisterEvent>;

#[derive(Debug)]
pub struct RegisterDesk<L> {
    register_id: RegisterId,
    store: L,
}

impl<L> RegisterDesk<L> {
    pub fn new(register_id: RegisterId, store: L) -> Self {
        Self { register_id, store }
    }

    pub fn register_id(&self) -> RegisterId {
        self.register_id
    }

    pub fn store(&self) -> &L {
        &self.store
    }
}

impl<L: LedgerStore> RegisterDesk<L> {
    /// What is persisted right now.
    pub fn snapshot(&self) -> RegisterSnapshot {
        self.store.load()
    }

    /// The register as the next command would see it.
    pub fn current(&self) -> Result<CashRegister, DeskError> {
        Ok(CashRegister::from_snapshot(self.register_id, &self.store.load())?)
    }

    pub fn dispatch(&self, command: RegisterCommand) -> Result<Vec<RegisterEnvelope>, DeskError> {
        self.dispatch_all(std::slice::from_ref(&command))
    }

    /// Run `commands` in order against one loaded snapshot and save once.
    pub fn dispatch_all(
        &self,
        commands: &[RegisterCommand],
    ) -> Result<Vec<RegisterEnvelope>, DeskError> {
        // 1) Load + rehydrate
        let snapshot = self.store.load();
        let expected = ExpectedVersion::Exact(snapshot.revision);
        let mut register = CashRegister::from_snapshot(self.register_id, &snapshot)?;

        // 2) Decide + apply, stopping at the first rejection
        let mut envelopes = Vec::new();
        for command in commands {
            let base = register.version();
            let events = register.execute(command).map_err(|error| {
                warn!(
                    register_id = %self.register_id,
                    %error,
                    ?command,
                    "register command rejected"
                );
                error
            })?;
            envelopes.extend(events.into_iter().enumerate().map(|(idx, event)| {
                EventEnvelope::new(
                    Uuid::now_v7(),
                    self.register_id,
                    Some(event.session_id()),
                    base + idx as u64 + 1,
                    event,
                )
            }));
        }

        if envelopes.is_empty() {
            return Ok(envelopes);
        }

        // 3) Persist against the loaded revision
        self.store.save(&register.to_snapshot(), expected).map_err(|error| {
            warn!(register_id = %self.register_id, %error, "register snapshot not saved");
            error
        })?;

        for envelope in &envelopes {
            log_event(envelope);
        }
        Ok(envelopes)
    }

    pub fn open(&self, opening_amount: Money) -> Result<RegisterOpened, DeskError> {
        let command = RegisterCommand::OpenRegister(OpenRegister {
            register_id: self.register_id,
            session_id: SessionId::new(),
            opening_amount,
            occurred_at: Utc::now(),
        });
        match self.single(command)? {
            RegisterEvent::RegisterOpened(e) => Ok(e),
            other => Err(unexpected(&other)),
        }
    }

    pub fn withdraw(
        &self,
        amount: Money,
        category: WithdrawalCategory,
        description: Option<String>,
    ) -> Result<CashWithdrawn, DeskError> {
        let command = RegisterCommand::WithdrawCash(WithdrawCash {
            register_id: self.register_id,
            amount,
            category,
            description,
            occurred_at: Utc::now(),
        });
        match self.single(command)? {
            RegisterEvent::CashWithdrawn(e) => Ok(e),
            other => Err(unexpected(&other)),
        }
    }

    pub fn deposit(
        &self,
        amount: Money,
        description: Option<String>,
    ) -> Result<CashDeposited, DeskError> {
        let command = RegisterCommand::DepositCash(DepositCash {
            register_id: self.register_id,
            amount,
            description,
            occurred_at: Utc::now(),
        });
        match self.single(command)? {
            RegisterEvent::CashDeposited(e) => Ok(e),
            other => Err(unexpected(&other)),
        }
    }

    pub fn collect(
        &self,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<PaymentCollected, DeskError> {
        let command = RegisterCommand::CollectPayment(CollectPayment {
            register_id: self.register_id,
            amount,
            method,
            occurred_at: Utc::now(),
        });
        match self.single(command)? {
            RegisterEvent::PaymentCollected(e) => Ok(e),
            other => Err(unexpected(&other)),
        }
    }

    /// Freeze the balance the operator has to count against.
    pub fn initiate_close(&self) -> Result<Money, DeskError> {
        let command = RegisterCommand::InitiateClose(InitiateClose {
            register_id: self.register_id,
            occurred_at: Utc::now(),
        });
        match self.single(command)? {
            RegisterEvent::CloseInitiated(e) => Ok(e.expected_balance),
            other => Err(unexpected(&other)),
        }
    }

    pub fn cancel_close(&self) -> Result<(), DeskError> {
        let command = RegisterCommand::CancelClose(CancelClose {
            register_id: self.register_id,
            occurred_at: Utc::now(),
        });
        match self.single(command)? {
            RegisterEvent::CloseCancelled(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn confirm_close(&self, counted_balance: Money) -> Result<ClosingReport, DeskError> {
        let command = RegisterCommand::ConfirmClose(ConfirmClose {
            register_id: self.register_id,
            counted_balance,
            occurred_at: Utc::now(),
        });
        match self.single(command)? {
            RegisterEvent::RegisterClosed(e) => Ok(e.report),
            other => Err(unexpected(&other)),
        }
    }

    fn single(&self, command: RegisterCommand) -> Result<RegisterEvent, DeskError> {
        self.dispatch(command)?
            .into_iter()
            .next()
            .map(EventEnvelope::into_payload)
            .ok_or_else(|| DomainError::invariant("command produced no events").into())
    }
}

fn unexpected(event: &RegisterEvent) -> DeskError {
    DomainError::invariant(format!("unexpected event '{}'", event.event_type())).into()
}

fn log_event(envelope: &RegisterEnvelope) {
    let register_id = envelope.register_id();
    let revision = envelope.revision();
    let event = envelope.payload();
    let at = event.occurred_at();
    let event_version = event.version();
    match event {
        RegisterEvent::RegisterOpened(e) => {
            info!(
                %register_id,
                revision,
                event_version,
                %at,
                opening_amount = %e.opening_amount,
                "register opened"
            );
        }
        RegisterEvent::CashWithdrawn(e) => {
            debug!(
                %register_id,
                revision,
                event_version,
                %at,
                amount = %e.amount,
                category = ?e.category,
                balance = %e.balance_after,
                "cash withdrawn"
            );
        }
        RegisterEvent::CashDeposited(e) => {
            debug!(
                %register_id,
                revision,
                event_version,
                %at,
                amount = %e.amount,
                balance = %e.balance_after,
                "cash deposited"
            );
        }
        RegisterEvent::PaymentCollected(e) => {
            debug!(
                %register_id,
                revision,
                event_version,
                %at,
                amount = %e.amount,
                method = ?e.method,
                balance = %e.balance_after,
                "payment collected"
            );
        }
        RegisterEvent::CloseInitiated(e) => {
            info!(
                %register_id,
                revision,
                event_version,
                %at,
                expected = %e.expected_balance,
                "close initiated"
            );
        }
        RegisterEvent::CloseCancelled(_) => {
            info!(%register_id, revision, event_version, %at, "close cancelled");
        }
        RegisterEvent::RegisterClosed(e) => {
            info!(
                %register_id,
                revision,
                event_version,
                %at,
                expected = %e.report.expected_balance,
                counted = %e.report.counted_balance,
                difference = %e.report.difference,
                status = ?e.report.status,
                "register closed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tillbook_register::ClosingStatus;

    use crate::ledger_store::JsonLedgerStore;
    use crate::storage::InMemoryStorage;

    fn money(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    fn desk() -> RegisterDesk<JsonLedgerStore<Arc<InMemoryStorage>>> {
        RegisterDesk::new(
            RegisterId::new(),
            JsonLedgerStore::new(Arc::new(InMemoryStorage::new())),
        )
    }

    #[test]
    fn withdraw_then_deposit_persists_balance() {
        let desk = desk();
        desk.open(money(10_000)).unwrap();
        let w = desk
            .withdraw(money(3_000), WithdrawalCategory::Purchase, Some("gelo".into()))
            .unwrap();
        assert_eq!(w.balance_after, money(7_000));
        let d = desk.deposit(money(2_000), None).unwrap();
        assert_eq!(d.balance_after, money(9_000));

        let snapshot = desk.snapshot();
        assert_eq!(snapshot.revision, 3);
        assert_eq!(snapshot.current_balance, Some(money(9_000)));
    }

    #[test]
    fn rejected_withdrawal_saves_nothing() {
        let desk = desk();
        desk.open(money(5_000)).unwrap();
        let err = desk
            .withdraw(money(6_000), WithdrawalCategory::Payment, None)
            .unwrap_err();
        assert!(matches!(err, DeskError::Domain(DomainError::InsufficientFunds { .. })));

        let snapshot = desk.snapshot();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.current_balance, Some(money(5_000)));
    }

    #[test]
    fn closing_flow_reports_difference() {
        let desk = desk();
        desk.open(money(10_000)).unwrap();
        desk.collect(money(4_200), PaymentMethod::Cash).unwrap();
        desk.collect(money(9_900), PaymentMethod::Card).unwrap();

        let expected = desk.initiate_close().unwrap();
        assert_eq!(expected, money(14_200));

        let report = desk.confirm_close(money(14_000)).unwrap();
        assert_eq!(report.status, ClosingStatus::Shortage);
        assert_eq!(report.difference, money(-200));
        assert_eq!(report.totals.card_collections, money(9_900));
        assert!(!desk.snapshot().is_open);
    }

    #[test]
    fn operations_on_closed_register_are_rejected() {
        let desk = desk();
        assert!(matches!(
            desk.deposit(money(100), None),
            Err(DeskError::Domain(DomainError::RegisterNotOpen))
        ));
        assert!(matches!(
            desk.initiate_close(),
            Err(DeskError::Domain(DomainError::RegisterNotOpen))
        ));
        assert_eq!(desk.snapshot(), RegisterSnapshot::closed(0));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let desk = desk();
        desk.open(money(1_000)).unwrap();
        let id = desk.register_id();
        let now = Utc::now();

        let err = desk
            .dispatch_all(&[
                RegisterCommand::DepositCash(DepositCash {
                    register_id: id,
                    amount: money(500),
                    description: None,
                    occurred_at: now,
                }),
                RegisterCommand::WithdrawCash(WithdrawCash {
                    register_id: id,
                    amount: money(10_000),
                    category: WithdrawalCategory::Voucher,
                    description: None,
                    occurred_at: now,
                }),
            ])
            .unwrap_err();
        assert!(matches!(err, DeskError::Domain(DomainError::InsufficientFunds { .. })));
        assert_eq!(desk.snapshot().current_balance, Some(money(1_000)));
    }

    #[test]
    fn envelopes_carry_consecutive_revisions() {
        let desk = desk();
        let opened = desk.dispatch(RegisterCommand::OpenRegister(OpenRegister {
            register_id: desk.register_id(),
            session_id: SessionId::new(),
            opening_amount: money(2_000),
            occurred_at: Utc::now(),
        }));
        let opened = opened.unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].revision(), 1);

        let id = desk.register_id();
        let batch = desk
            .dispatch_all(&[
                RegisterCommand::CollectPayment(CollectPayment {
                    register_id: id,
                    amount: money(100),
                    method: PaymentMethod::Cash,
                    occurred_at: Utc::now(),
                }),
                RegisterCommand::CollectPayment(CollectPayment {
                    register_id: id,
                    amount: money(200),
                    method: PaymentMethod::Pix,
                    occurred_at: Utc::now(),
                }),
            ])
            .unwrap();
        let revisions: Vec<_> = batch.iter().map(|e| e.revision()).collect();
        assert_eq!(revisions, vec![2, 3]);
        assert!(batch.iter().all(|e| e.session_id() == opened[0].session_id()));
    }

    #[test]
    fn concurrent_writer_causes_conflict() {
        let storage = Arc::new(InMemoryStorage::new());
        let first = RegisterDesk::new(RegisterId::new(), JsonLedgerStore::new(storage.clone()));
        first.open(money(1_000)).unwrap();

        // Another writer bumps the stored revision behind the desk's back.
        let other = JsonLedgerStore::new(storage);
        let mut moved = other.load();
        moved.revision += 1;
        other.save(&moved, ExpectedVersion::Any).unwrap();

        // The desk reloads on every call, so it sees the new revision and succeeds.
        assert!(first.deposit(money(100), None).is_ok());

        // A save against a revision loaded earlier is refused.
        let stale = RegisterSnapshot::closed(0);
        let err = DeskError::from(other.save(&stale, ExpectedVersion::Exact(1)).unwrap_err());
        assert!(matches!(err, DeskError::Domain(DomainError::Conflict(_))));
    }
}
