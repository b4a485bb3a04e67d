//! Infrastructure layer: storage, persistence, application services, config.

pub mod bootstrap;
pub mod checkout;
pub mod config;
pub mod desk;
pub mod history_store;
pub mod ledger_store;
pub mod storage;

#[cfg(test)]
mod integration_tests;

pub use bootstrap::{Tillbook, bootstrap};
pub use checkout::{Checkout, SaleReceipt};
pub use config::TillbookConfig;
pub use desk::{DeskError, RegisterDesk, RegisterEnvelope};
pub use history_store::{JsonSalesHistoryStore, SalesHistoryStore};
pub use ledger_store::{JsonLedgerStore, LedgerStore, PersistenceReadError, StoreError};
pub use storage::{FileStorage, InMemoryStorage, KeyValueStorage, StorageError};
