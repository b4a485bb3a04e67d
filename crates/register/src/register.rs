use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{Aggregate, AggregateRoot, DomainError, Money, RegisterId, SessionId};
use tillbook_events::{Command, Event};

use crate::session::{
    ClosingReport, ClosingStatus, OpenSession, PaymentMethod, PendingClose, SessionTotals,
    WithdrawalCategory,
};

/// Aggregate root: CashRegister (one physical till).
///
/// Closed → Open → (close pending) → Closed. Only one session can be open at a
/// time; the balance exists only while a session is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashRegister {
    id: RegisterId,
    session: Option<OpenSession>,
    version: u64,
}

impl CashRegister {
    /// A closed till with no history.
    pub fn empty(id: RegisterId) -> Self {
        Self {
            id,
            session: None,
            version: 0,
        }
    }

    /// Rebuild from persisted parts (see `RegisterSnapshot`).
    pub(crate) fn from_parts(id: RegisterId, session: Option<OpenSession>, version: u64) -> Self {
        Self { id, session, version }
    }

    pub fn id_typed(&self) -> RegisterId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&OpenSession> {
        self.session.as_ref()
    }

    pub fn current_balance(&self) -> Option<Money> {
        self.session.as_ref().map(|s| s.current_balance)
    }

    pub fn opening_amount(&self) -> Option<Money> {
        self.session.as_ref().map(|s| s.opening_amount)
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.opened_at)
    }

    /// Expected balance captured by a pending close, if any.
    pub fn pending_close(&self) -> Option<PendingClose> {
        self.session.as_ref().and_then(|s| s.closing)
    }
}

impl AggregateRoot for CashRegister {
    type Id = RegisterId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenRegister.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRegister {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub opening_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawCash (sangria).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawCash {
    pub register_id: RegisterId,
    pub amount: Money,
    pub category: WithdrawalCategory,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DepositCash (reforço).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCash {
    pub register_id: RegisterId,
    pub amount: Money,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CollectPayment (sale or delivery payment received).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectPayment {
    pub register_id: RegisterId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Command: InitiateClose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateClose {
    pub register_id: RegisterId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelClose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelClose {
    pub register_id: RegisterId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmClose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmClose {
    pub register_id: RegisterId,
    pub counted_balance: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterCommand {
    OpenRegister(OpenRegister),
    WithdrawCash(WithdrawCash),
    DepositCash(DepositCash),
    CollectPayment(CollectPayment),
    InitiateClose(InitiateClose),
    CancelClose(CancelClose),
    ConfirmClose(ConfirmClose),
}

impl Command for RegisterCommand {
    fn target_register_id(&self) -> RegisterId {
        match self {
            RegisterCommand::OpenRegister(c) => c.register_id,
            RegisterCommand::WithdrawCash(c) => c.register_id,
            RegisterCommand::DepositCash(c) => c.register_id,
            RegisterCommand::CollectPayment(c) => c.register_id,
            RegisterCommand::InitiateClose(c) => c.register_id,
            RegisterCommand::CancelClose(c) => c.register_id,
            RegisterCommand::ConfirmClose(c) => c.register_id,
        }
    }
}

/// Event: RegisterOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOpened {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub opening_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CashWithdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashWithdrawn {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub amount: Money,
    pub category: WithdrawalCategory,
    pub description: Option<String>,
    pub balance_after: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CashDeposited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashDeposited {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub amount: Money,
    pub description: Option<String>,
    pub balance_after: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentCollected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCollected {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// Till balance after the collection (unchanged for non-cash methods).
    pub balance_after: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CloseInitiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseInitiated {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub expected_balance: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CloseCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseCancelled {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RegisterClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterClosed {
    pub report: ClosingReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterEvent {
    RegisterOpened(RegisterOpened),
    CashWithdrawn(CashWithdrawn),
    CashDeposited(CashDeposited),
    PaymentCollected(PaymentCollected),
    CloseInitiated(CloseInitiated),
    CloseCancelled(CloseCancelled),
    RegisterClosed(RegisterClosed),
}

impl RegisterEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            RegisterEvent::RegisterOpened(e) => e.session_id,
            RegisterEvent::CashWithdrawn(e) => e.session_id,
            RegisterEvent::CashDeposited(e) => e.session_id,
            RegisterEvent::PaymentCollected(e) => e.session_id,
            RegisterEvent::CloseInitiated(e) => e.session_id,
            RegisterEvent::CloseCancelled(e) => e.session_id,
            RegisterEvent::RegisterClosed(e) => e.report.session_id,
        }
    }
}

impl Event for RegisterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RegisterEvent::RegisterOpened(_) => "register.opened",
            RegisterEvent::CashWithdrawn(_) => "register.cash_withdrawn",
            RegisterEvent::CashDeposited(_) => "register.cash_deposited",
            RegisterEvent::PaymentCollected(_) => "register.payment_collected",
            RegisterEvent::CloseInitiated(_) => "register.close_initiated",
            RegisterEvent::CloseCancelled(_) => "register.close_cancelled",
            RegisterEvent::RegisterClosed(_) => "register.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RegisterEvent::RegisterOpened(e) => e.occurred_at,
            RegisterEvent::CashWithdrawn(e) => e.occurred_at,
            RegisterEvent::CashDeposited(e) => e.occurred_at,
            RegisterEvent::PaymentCollected(e) => e.occurred_at,
            RegisterEvent::CloseInitiated(e) => e.occurred_at,
            RegisterEvent::CloseCancelled(e) => e.occurred_at,
            RegisterEvent::RegisterClosed(e) => e.report.closed_at,
        }
    }
}

impl Aggregate for CashRegister {
    type Command = RegisterCommand;
    type Event = RegisterEvent;
    type Error = DomainError;

    // Amounts were range-checked against the session in `handle`.
    fn apply(&mut self, event: &Self::Event) {
        match event {
            RegisterEvent::RegisterOpened(e) => {
                self.id = e.register_id;
                self.session = Some(OpenSession {
                    session_id: e.session_id,
                    opening_amount: e.opening_amount,
                    current_balance: e.opening_amount,
                    opened_at: e.occurred_at,
                    totals: SessionTotals::default(),
                    closing: None,
                });
            }
            RegisterEvent::CashWithdrawn(e) => {
                if let Some(session) = self.session.as_mut() {
                    session.current_balance -= e.amount;
                    session.totals.withdrawals += e.amount;
                }
            }
            RegisterEvent::CashDeposited(e) => {
                if let Some(session) = self.session.as_mut() {
                    session.current_balance += e.amount;
                    session.totals.deposits += e.amount;
                }
            }
            RegisterEvent::PaymentCollected(e) => {
                if let Some(session) = self.session.as_mut() {
                    if e.method.affects_till() {
                        session.current_balance += e.amount;
                    }
                    session.totals.record_collection(e.method, e.amount);
                }
            }
            RegisterEvent::CloseInitiated(e) => {
                if let Some(session) = self.session.as_mut() {
                    session.closing = Some(PendingClose {
                        expected_balance: e.expected_balance,
                        initiated_at: e.occurred_at,
                    });
                }
            }
            RegisterEvent::CloseCancelled(_) => {
                if let Some(session) = self.session.as_mut() {
                    session.closing = None;
                }
            }
            RegisterEvent::RegisterClosed(_) => {
                self.session = None;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_register_id(command.target_register_id())?;

        match command {
            RegisterCommand::OpenRegister(cmd) => self.handle_open(cmd),
            RegisterCommand::WithdrawCash(cmd) => self.handle_withdraw(cmd),
            RegisterCommand::DepositCash(cmd) => self.handle_deposit(cmd),
            RegisterCommand::CollectPayment(cmd) => self.handle_collect(cmd),
            RegisterCommand::InitiateClose(cmd) => self.handle_initiate_close(cmd),
            RegisterCommand::CancelClose(cmd) => self.handle_cancel_close(cmd),
            RegisterCommand::ConfirmClose(cmd) => self.handle_confirm_close(cmd),
        }
    }
}

impl CashRegister {
    fn ensure_register_id(&self, register_id: RegisterId) -> Result<(), DomainError> {
        if self.id != register_id {
            return Err(DomainError::invariant("register_id mismatch"));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<&OpenSession, DomainError> {
        self.session.as_ref().ok_or(DomainError::RegisterNotOpen)
    }

    /// Open session that accepts cash movements (no close pending).
    fn ensure_accepting_movements(&self) -> Result<&OpenSession, DomainError> {
        let session = self.ensure_open()?;
        if session.closing.is_some() {
            return Err(DomainError::invariant(
                "close in progress; confirm or cancel it before recording movements",
            ));
        }
        Ok(session)
    }

    fn handle_open(&self, cmd: &OpenRegister) -> Result<Vec<RegisterEvent>, DomainError> {
        if self.session.is_some() {
            return Err(DomainError::conflict("register is already open"));
        }

        if cmd.opening_amount.is_negative() {
            return Err(DomainError::validation("opening amount must not be negative"));
        }

        Ok(vec![RegisterEvent::RegisterOpened(RegisterOpened {
            register_id: cmd.register_id,
            session_id: cmd.session_id,
            opening_amount: cmd.opening_amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &WithdrawCash) -> Result<Vec<RegisterEvent>, DomainError> {
        let session = self.ensure_accepting_movements()?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("withdrawal amount must be positive"));
        }

        if cmd.amount > session.current_balance {
            return Err(DomainError::insufficient_funds(cmd.amount, session.current_balance));
        }
        session.totals.withdrawals.checked_add(cmd.amount)?;

        Ok(vec![RegisterEvent::CashWithdrawn(CashWithdrawn {
            register_id: cmd.register_id,
            session_id: session.session_id,
            amount: cmd.amount,
            category: cmd.category,
            description: normalize_note(cmd.description.as_deref()),
            balance_after: session.current_balance.checked_sub(cmd.amount)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deposit(&self, cmd: &DepositCash) -> Result<Vec<RegisterEvent>, DomainError> {
        let session = self.ensure_accepting_movements()?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("deposit amount must be positive"));
        }
        let balance_after = session.current_balance.checked_add(cmd.amount)?;
        session.totals.deposits.checked_add(cmd.amount)?;

        Ok(vec![RegisterEvent::CashDeposited(CashDeposited {
            register_id: cmd.register_id,
            session_id: session.session_id,
            amount: cmd.amount,
            description: normalize_note(cmd.description.as_deref()),
            balance_after,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_collect(&self, cmd: &CollectPayment) -> Result<Vec<RegisterEvent>, DomainError> {
        let session = self.ensure_accepting_movements()?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("collected amount must be positive"));
        }

        let balance_after = if cmd.method.affects_till() {
            session.current_balance.checked_add(cmd.amount)?
        } else {
            session.current_balance
        };
        session.totals.collected(cmd.method).checked_add(cmd.amount)?;

        Ok(vec![RegisterEvent::PaymentCollected(PaymentCollected {
            register_id: cmd.register_id,
            session_id: session.session_id,
            amount: cmd.amount,
            method: cmd.method,
            balance_after,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_initiate_close(
        &self,
        cmd: &InitiateClose,
    ) -> Result<Vec<RegisterEvent>, DomainError> {
        let session = self.ensure_open()?;

        if session.closing.is_some() {
            return Err(DomainError::conflict("close already initiated"));
        }

        Ok(vec![RegisterEvent::CloseInitiated(CloseInitiated {
            register_id: cmd.register_id,
            session_id: session.session_id,
            expected_balance: session.current_balance,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel_close(&self, cmd: &CancelClose) -> Result<Vec<RegisterEvent>, DomainError> {
        let session = self.ensure_open()?;

        if session.closing.is_none() {
            return Err(DomainError::invariant("no close in progress"));
        }

        Ok(vec![RegisterEvent::CloseCancelled(CloseCancelled {
            register_id: cmd.register_id,
            session_id: session.session_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm_close(&self, cmd: &ConfirmClose) -> Result<Vec<RegisterEvent>, DomainError> {
        let session = self.ensure_open()?;

        let pending = session
            .closing
            .ok_or_else(|| DomainError::invariant("close was not initiated"))?;

        if cmd.counted_balance.is_negative() {
            return Err(DomainError::validation("counted balance must not be negative"));
        }

        let difference = cmd.counted_balance.checked_sub(pending.expected_balance)?;

        Ok(vec![RegisterEvent::RegisterClosed(RegisterClosed {
            report: ClosingReport {
                register_id: cmd.register_id,
                session_id: session.session_id,
                opening_amount: session.opening_amount,
                opened_at: session.opened_at,
                closed_at: cmd.occurred_at,
                expected_balance: pending.expected_balance,
                counted_balance: cmd.counted_balance,
                difference,
                status: ClosingStatus::from_difference(difference),
                totals: session.totals,
            },
        })])
    }
}

fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string)
}
