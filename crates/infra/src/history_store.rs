//! Sales history persistence (`salesHistory_v1`, a JSON array of entries).
//!
//! Appends are read-modify-write with no revision check: two writers racing on
//! the same storage keep whichever wrote last. An append never replaces a
//! history it cannot read.

use std::sync::Arc;

use tracing::warn;

use tillbook_sales::{SalesHistory, SalesHistoryEntry};

use crate::ledger_store::{PersistenceReadError, StoreError};
use crate::storage::KeyValueStorage;

pub const HISTORY_KEY: &str = "salesHistory_v1";

pub trait SalesHistoryStore: Send + Sync {
    /// Stored history; missing or unreadable data loads as empty.
    fn load(&self) -> SalesHistory;

    /// Stored history, or why it cannot be read.
    fn try_load(&self) -> Result<SalesHistory, PersistenceReadError>;

    /// Record one finalized sale. Duplicate order ids are rejected.
    fn append(&self, entry: SalesHistoryEntry) -> Result<(), StoreError>;
}

impl<S> SalesHistoryStore for Arc<S>
where
    S: SalesHistoryStore + ?Sized,
{
    fn load(&self) -> SalesHistory {
        (**self).load()
    }

    fn try_load(&self) -> Result<SalesHistory, PersistenceReadError> {
        (**self).try_load()
    }

    fn append(&self, entry: SalesHistoryEntry) -> Result<(), StoreError> {
        (**self).append(entry)
    }
}

#[derive(Debug, Clone)]
pub struct JsonSalesHistoryStore<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> JsonSalesHistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, HISTORY_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

impl<S: KeyValueStorage> SalesHistoryStore for JsonSalesHistoryStore<S> {
    fn load(&self) -> SalesHistory {
        self.try_load().unwrap_or_else(|error| {
            warn!(%error, key = %self.key, "unreadable sales history; loading as empty");
            SalesHistory::new()
        })
    }

    fn try_load(&self) -> Result<SalesHistory, PersistenceReadError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return Ok(SalesHistory::new());
        };
        let entries: Vec<SalesHistoryEntry> =
            serde_json::from_str(&raw).map_err(|source| PersistenceReadError::Corrupt {
                key: self.key.clone(),
                source,
            })?;
        Ok(SalesHistory::from_entries(entries))
    }

    fn append(&self, entry: SalesHistoryEntry) -> Result<(), StoreError> {
        let mut history = self.try_load()?;
        history.append(entry)?;

        let json =
            serde_json::to_string(history.entries()).map_err(|source| StoreError::Encode {
                key: self.key.clone(),
                source,
            })?;
        self.storage.set_item(&self.key, &json)?;
        Ok(())
    }
}
