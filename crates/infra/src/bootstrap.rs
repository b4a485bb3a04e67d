//! Process wiring: configuration, logging, storage and services.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::checkout::Checkout;
use crate::config::TillbookConfig;
use crate::desk::RegisterDesk;
use crate::history_store::JsonSalesHistoryStore;
use crate::ledger_store::JsonLedgerStore;
use crate::storage::{FileStorage, InMemoryStorage, KeyValueStorage};

pub type SharedStorage = Arc<dyn KeyValueStorage>;
pub type Ledger = JsonLedgerStore<SharedStorage>;
pub type History = JsonSalesHistoryStore<SharedStorage>;

/// The services one till needs, sharing a single storage backend.
pub struct Tillbook {
    pub desk: RegisterDesk<Ledger>,
    pub history: History,
}

impl Tillbook {
    /// Wire the services without touching global logging state.
    pub fn from_config(config: &TillbookConfig) -> anyhow::Result<Self> {
        let storage: SharedStorage = match &config.storage.data_dir {
            Some(dir) => Arc::new(
                FileStorage::open(dir.clone())
                    .with_context(|| format!("opening data directory {}", dir.display()))?,
            ),
            None => Arc::new(InMemoryStorage::new()),
        };

        let ledger = JsonLedgerStore::with_keys(
            storage.clone(),
            config.storage.register_key.clone(),
            config.storage.legacy_register_key.clone(),
        );
        let history = JsonSalesHistoryStore::with_key(storage, config.storage.history_key.clone());
        let register_id = config.storage.register_id.unwrap_or_default();

        Ok(Self {
            desk: RegisterDesk::new(register_id, ledger),
            history,
        })
    }

    pub fn checkout(&self) -> Checkout<'_, Ledger, History> {
        Checkout::new(&self.desk, &self.history)
    }
}

/// Load configuration, install logging and wire the services.
pub fn bootstrap() -> anyhow::Result<Tillbook> {
    let config = TillbookConfig::load().context("loading tillbook configuration")?;
    tillbook_observability::init_with(config.log.format);

    let app = Tillbook::from_config(&config)?;
    let snapshot = app.desk.snapshot();
    info!(
        register_id = %app.desk.register_id(),
        data_dir = ?config.storage.data_dir,
        is_open = snapshot.is_open,
        revision = snapshot.revision,
        "tillbook ready"
    );
    Ok(app)
}
