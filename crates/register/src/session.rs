//! Session state and the values a session produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{DomainResult, Money, RegisterId, SessionId};

/// How a customer paid. Only cash ends up in the drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] =
        [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Pix];

    /// Whether a collection with this method changes the till balance.
    pub fn affects_till(self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Dinheiro",
            PaymentMethod::Card => "Cartão",
            PaymentMethod::Pix => "Pix",
        }
    }
}

/// Why cash left the till (sangria).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalCategory {
    /// Advance to a staff member (vale).
    Voucher,
    /// Purchase paid from the drawer.
    Purchase,
    /// Bill or supplier payment.
    Payment,
}

/// Running totals for the open session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTotals {
    pub withdrawals: Money,
    pub deposits: Money,
    pub cash_collections: Money,
    pub card_collections: Money,
    pub pix_collections: Money,
}

impl SessionTotals {
    pub fn collected(&self, method: PaymentMethod) -> Money {
        match method {
            PaymentMethod::Cash => self.cash_collections,
            PaymentMethod::Card => self.card_collections,
            PaymentMethod::Pix => self.pix_collections,
        }
    }

    pub(crate) fn record_collection(&mut self, method: PaymentMethod, amount: Money) {
        match method {
            PaymentMethod::Cash => self.cash_collections += amount,
            PaymentMethod::Card => self.card_collections += amount,
            PaymentMethod::Pix => self.pix_collections += amount,
        }
    }

    /// Everything collected, regardless of method.
    pub fn total_collected(&self) -> DomainResult<Money> {
        Money::checked_sum([self.cash_collections, self.card_collections, self.pix_collections])
    }
}

/// Close flow started: the expected balance captured at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingClose {
    pub expected_balance: Money,
    pub initiated_at: DateTime<Utc>,
}

/// An open till session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSession {
    pub session_id: SessionId,
    pub opening_amount: Money,
    pub current_balance: Money,
    pub opened_at: DateTime<Utc>,
    pub totals: SessionTotals,
    pub closing: Option<PendingClose>,
}

/// Outcome of comparing the counted drawer against the expected balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingStatus {
    /// Less cash than expected.
    Shortage,
    /// More cash than expected.
    Surplus,
    Balanced,
}

impl ClosingStatus {
    pub fn from_difference(difference: Money) -> Self {
        if difference.is_negative() {
            ClosingStatus::Shortage
        } else if difference.is_positive() {
            ClosingStatus::Surplus
        } else {
            ClosingStatus::Balanced
        }
    }
}

/// Reconciliation produced when a session is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingReport {
    pub register_id: RegisterId,
    pub session_id: SessionId,
    pub opening_amount: Money,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub expected_balance: Money,
    pub counted_balance: Money,
    /// `counted_balance - expected_balance`.
    pub difference: Money,
    pub status: ClosingStatus,
    pub totals: SessionTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_sign_of_difference() {
        assert_eq!(ClosingStatus::from_difference(Money::from_cents(-1)), ClosingStatus::Shortage);
        assert_eq!(ClosingStatus::from_difference(Money::from_cents(1)), ClosingStatus::Surplus);
        assert_eq!(ClosingStatus::from_difference(Money::zero()), ClosingStatus::Balanced);
    }

    #[test]
    fn only_cash_affects_the_till() {
        let affecting: Vec<_> =
            PaymentMethod::ALL.into_iter().filter(|m| m.affects_till()).collect();
        assert_eq!(affecting, vec![PaymentMethod::Cash]);
    }

    #[test]
    fn totals_track_each_method_separately() {
        let mut totals = SessionTotals::default();
        totals.record_collection(PaymentMethod::Cash, Money::from_cents(1_000));
        totals.record_collection(PaymentMethod::Pix, Money::from_cents(550));
        totals.record_collection(PaymentMethod::Pix, Money::from_cents(50));

        assert_eq!(totals.collected(PaymentMethod::Cash), Money::from_cents(1_000));
        assert_eq!(totals.collected(PaymentMethod::Card), Money::zero());
        assert_eq!(totals.collected(PaymentMethod::Pix), Money::from_cents(600));
        assert_eq!(totals.total_collected().unwrap(), Money::from_cents(1_600));
    }
}
