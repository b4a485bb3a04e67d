//! Append-only sales history with search and per-channel totals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{DomainError, DomainResult, Entity, Money};

use crate::order::OrderId;

/// Channel an order came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SaleSource {
    #[serde(rename = "counter")]
    Counter,
    #[serde(rename = "ifood")]
    IFood,
    #[serde(rename = "ze_delivery")]
    ZeDelivery,
    #[serde(rename = "whatsapp")]
    WhatsApp,
    #[serde(rename = "other")]
    Other,
}

impl SaleSource {
    pub const ALL: [SaleSource; 5] = [
        SaleSource::Counter,
        SaleSource::IFood,
        SaleSource::ZeDelivery,
        SaleSource::WhatsApp,
        SaleSource::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SaleSource::Counter => "Balcão",
            SaleSource::IFood => "iFood",
            SaleSource::ZeDelivery => "Zé Delivery",
            SaleSource::WhatsApp => "WhatsApp",
            SaleSource::Other => "Outro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Delivered,
    Cancelled,
}

impl SaleStatus {
    pub fn label(self) -> &'static str {
        match self {
            SaleStatus::Completed => "Concluído",
            SaleStatus::Delivered => "Entregue",
            SaleStatus::Cancelled => "Cancelado",
        }
    }
}

/// One finalized sale or delivery. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesHistoryEntry {
    pub order_id: OrderId,
    pub customer: String,
    pub source: SaleSource,
    pub items_summary: String,
    pub total: Money,
    pub status: SaleStatus,
    pub date: DateTime<Utc>,
}

impl Entity for SalesHistoryEntry {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.order_id
    }
}

impl SalesHistoryEntry {
    fn matches_search(&self, needle: &str) -> bool {
        [
            self.order_id.as_str(),
            self.customer.as_str(),
            self.source.label(),
            self.items_summary.as_str(),
            self.status.label(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Search criteria; every unset field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub search: Option<String>,
    pub source: Option<SaleSource>,
    /// Inclusive lower bound on the sale's UTC calendar date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the sale's UTC calendar date.
    pub to: Option<NaiveDate>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn source(mut self, source: SaleSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn matches(&self, entry: &SalesHistoryEntry) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if !entry.matches_search(&term.to_lowercase()) {
                return false;
            }
        }

        if self.source.is_some_and(|s| s != entry.source) {
            return false;
        }

        let day = entry.date.date_naive();
        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }

        true
    }
}

/// Revenue for one channel (cancelled orders excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTotals {
    pub source: SaleSource,
    pub orders: usize,
    pub revenue: Money,
}

/// The append-only list of finalized sales.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesHistory {
    entries: Vec<SalesHistoryEntry>,
}

impl SalesHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<SalesHistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SalesHistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SalesHistoryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a sale. An order id can only be recorded once.
    pub fn append(&mut self, entry: SalesHistoryEntry) -> DomainResult<()> {
        if self.entries.iter().any(|e| e.id() == entry.id()) {
            return Err(DomainError::conflict(format!(
                "order {} is already in the sales history",
                entry.order_id
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Matching entries, newest first.
    pub fn filter(&self, filter: &HistoryFilter) -> Vec<&SalesHistoryEntry> {
        let mut matched: Vec<_> = self.entries.iter().filter(|e| filter.matches(e)).collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date));
        matched
    }

    /// Per-channel totals in `SaleSource::ALL` order, channels without sales omitted.
    pub fn totals_by_source(&self) -> DomainResult<Vec<SourceTotals>> {
        let mut totals = Vec::new();
        for source in SaleSource::ALL {
            let sales: Vec<_> = self
                .entries
                .iter()
                .filter(|e| e.source == source && e.status != SaleStatus::Cancelled)
                .collect();
            if sales.is_empty() {
                continue;
            }
            totals.push(SourceTotals {
                source,
                orders: sales.len(),
                revenue: Money::checked_sum(sales.iter().map(|e| e.total))?,
            });
        }
        Ok(totals)
    }
}
