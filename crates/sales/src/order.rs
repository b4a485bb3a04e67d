use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{DomainError, DomainResult, Money};

use crate::history::{SaleSource, SaleStatus, SalesHistoryEntry};
use crate::payment::PaymentLine;

/// Order identifier as shown to staff (e.g. `#PDV1001`, `#IFD2034`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(DomainError::invalid_id("order id must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order line: product name, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> DomainResult<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// Σ quantity × unit price.
pub fn order_total(items: &[OrderItem]) -> DomainResult<Money> {
    items.iter().try_fold(Money::zero(), |total, item| total.checked_add(item.line_total()?))
}

/// Short description used in the history, e.g. `1x Pizza Margherita, 2x Coca-Cola 2L`.
pub fn items_summary(items: &[OrderItem]) -> String {
    items
        .iter()
        .map(|item| format!("{}x {}", item.quantity, item.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Request to finalize a counter sale or a completed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeSale {
    pub order_id: OrderId,
    pub customer: String,
    pub source: SaleSource,
    pub items: Vec<OrderItem>,
    pub payments: Vec<PaymentLine>,
    pub status: SaleStatus,
    pub occurred_at: DateTime<Utc>,
}

impl FinalizeSale {
    pub fn total(&self) -> DomainResult<Money> {
        order_total(&self.items)
    }

    /// Shape checks that do not depend on the payments.
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("cannot finalize an order without items"));
        }

        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(DomainError::validation("item name must not be empty"));
            }
            if item.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "quantity must be positive ({})",
                    item.name
                )));
            }
            if item.unit_price.is_negative() {
                return Err(DomainError::validation(format!(
                    "unit price must not be negative ({})",
                    item.name
                )));
            }
        }

        if self.status == SaleStatus::Cancelled {
            return Err(DomainError::validation("a cancelled order cannot be finalized"));
        }

        Ok(())
    }

    pub fn to_history_entry(&self) -> DomainResult<SalesHistoryEntry> {
        Ok(SalesHistoryEntry {
            order_id: self.order_id.clone(),
            customer: self.customer.trim().to_string(),
            source: self.source,
            items_summary: items_summary(&self.items),
            total: self.total()?,
            status: self.status,
            date: self.occurred_at,
        })
    }
}
