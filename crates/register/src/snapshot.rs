//! Persisted shape of a register.
//!
//! Only the net effect of the session survives (balances, totals, pending
//! close); individual movements are not stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{AggregateRoot, DomainError, DomainResult, Money, RegisterId, SessionId};

use crate::register::CashRegister;
use crate::session::{OpenSession, PendingClose, SessionTotals};

/// Canonical JSON document for one till.
///
/// ```json
/// {
///   "revision": 4,
///   "isOpen": true,
///   "sessionId": "0190...",
///   "initialOpeningAmount": "100.00",
///   "currentBalance": "90.00",
///   "openingTimestamp": "2024-07-29T12:30:00Z",
///   "totals": { "withdrawals": "30.00", ... },
///   "closing": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSnapshot {
    #[serde(default)]
    pub revision: u64,
    pub is_open: bool,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub initial_opening_amount: Option<Money>,
    #[serde(default)]
    pub current_balance: Option<Money>,
    #[serde(default)]
    pub opening_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub totals: SessionTotals,
    #[serde(default)]
    pub closing: Option<PendingClose>,
}

impl RegisterSnapshot {
    /// A closed till at `revision`.
    pub fn closed(revision: u64) -> Self {
        Self {
            revision,
            is_open: false,
            session_id: None,
            initial_opening_amount: None,
            current_balance: None,
            opening_timestamp: None,
            totals: SessionTotals::default(),
            closing: None,
        }
    }

    /// An open till with no recorded movements yet.
    pub fn open(
        revision: u64,
        session_id: SessionId,
        opening_amount: Money,
        current_balance: Money,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            revision,
            is_open: true,
            session_id: Some(session_id),
            initial_opening_amount: Some(opening_amount),
            current_balance: Some(current_balance),
            opening_timestamp: Some(opened_at),
            totals: SessionTotals::default(),
            closing: None,
        }
    }

    /// `currentBalance` is defined iff the register is open, and never negative.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.is_open {
            if self.current_balance.is_some() || self.closing.is_some() {
                return Err(DomainError::invariant(
                    "closed register snapshot carries session state",
                ));
            }
            return Ok(());
        }

        let (Some(opening_amount), Some(current_balance), Some(_)) = (
            self.initial_opening_amount,
            self.current_balance,
            self.opening_timestamp,
        ) else {
            return Err(DomainError::invariant(
                "open register snapshot is missing amounts or timestamp",
            ));
        };

        if opening_amount.is_negative() || current_balance.is_negative() {
            return Err(DomainError::invariant("register snapshot has a negative balance"));
        }

        Ok(())
    }
}

impl Default for RegisterSnapshot {
    fn default() -> Self {
        Self::closed(0)
    }
}

impl CashRegister {
    pub fn to_snapshot(&self) -> RegisterSnapshot {
        match self.session() {
            Some(session) => RegisterSnapshot {
                revision: self.version(),
                is_open: true,
                session_id: Some(session.session_id),
                initial_opening_amount: Some(session.opening_amount),
                current_balance: Some(session.current_balance),
                opening_timestamp: Some(session.opened_at),
                totals: session.totals,
                closing: session.closing,
            },
            None => RegisterSnapshot::closed(self.version()),
        }
    }

    /// Rebuild a register, rejecting snapshots that break the session invariants.
    pub fn from_snapshot(id: RegisterId, snapshot: &RegisterSnapshot) -> DomainResult<Self> {
        snapshot.validate()?;

        let session = match (
            snapshot.initial_opening_amount,
            snapshot.current_balance,
            snapshot.opening_timestamp,
        ) {
            (Some(opening_amount), Some(current_balance), Some(opened_at)) if snapshot.is_open => {
                Some(OpenSession {
                    session_id: snapshot.session_id.unwrap_or_default(),
                    opening_amount,
                    current_balance,
                    opened_at,
                    totals: snapshot.totals,
                    closing: snapshot.closing,
                })
            }
            _ => None,
        };

        Ok(CashRegister::from_parts(id, session, snapshot.revision))
    }
}
