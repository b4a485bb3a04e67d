use chrono::Utc;
use tracing::{info, warn};

use tillbook_core::ExpectedVersion;
use tillbook_register::RegisterSnapshot;

use super::legacy::LegacyRegisterState;
use super::{LedgerStore, PersistenceReadError, StoreError};
use crate::storage::{KeyValueStorage, StorageError};

pub const REGISTER_KEY: &str = "cashRegisterStatus_v2";
pub const LEGACY_REGISTER_KEY: &str = "cashRegisterStatus_v1";

/// [`LedgerStore`] keeping the snapshot as one JSON document.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore<S> {
    storage: S,
    key: String,
    legacy_key: String,
}

impl<S: KeyValueStorage> JsonLedgerStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_keys(storage, REGISTER_KEY, LEGACY_REGISTER_KEY)
    }

    pub fn with_keys(storage: S, key: impl Into<String>, legacy_key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            legacy_key: legacy_key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Strict read: `Ok(None)` when nothing (current or legacy) is stored.
    pub fn try_load(&self) -> Result<Option<RegisterSnapshot>, PersistenceReadError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return self.upgrade_legacy();
        };

        let snapshot: RegisterSnapshot =
            serde_json::from_str(&raw).map_err(|source| PersistenceReadError::Corrupt {
                key: self.key.clone(),
                source,
            })?;
        snapshot
            .validate()
            .map_err(|source| PersistenceReadError::Inconsistent {
                key: self.key.clone(),
                source,
            })?;

        Ok(Some(snapshot))
    }

    /// Revision of whatever is stored, readable or not (0 when absent).
    pub fn stored_revision(&self) -> Result<u64, StorageError> {
        Ok(self
            .storage
            .get_item(&self.key)?
            .map(|raw| revision_hint(&raw))
            .unwrap_or(0))
    }

    fn upgrade_legacy(&self) -> Result<Option<RegisterSnapshot>, PersistenceReadError> {
        let Some(raw) = self.storage.get_item(&self.legacy_key)? else {
            return Ok(None);
        };

        let legacy: LegacyRegisterState =
            serde_json::from_str(&raw).map_err(|source| PersistenceReadError::Corrupt {
                key: self.legacy_key.clone(),
                source,
            })?;
        let snapshot = legacy.upgrade(Utc::now());

        match self.write(&snapshot) {
            Ok(()) => {
                if let Err(error) = self.storage.remove_item(&self.legacy_key) {
                    warn!(
                        %error,
                        key = %self.legacy_key,
                        "failed to remove legacy register document"
                    );
                }
                info!(
                    from = %self.legacy_key,
                    to = %self.key,
                    is_open = snapshot.is_open,
                    "upgraded legacy register document"
                );
            }
            Err(error) => {
                warn!(
                    %error,
                    key = %self.key,
                    "legacy register upgrade not persisted; will retry on next load"
                );
            }
        }

        Ok(Some(snapshot))
    }

    fn write(&self, snapshot: &RegisterSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot).map_err(|source| StoreError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.storage.set_item(&self.key, &json)?;
        Ok(())
    }
}

impl<S: KeyValueStorage> LedgerStore for JsonLedgerStore<S> {
    fn load(&self) -> RegisterSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => RegisterSnapshot::closed(0),
            Err(error) => {
                let revision = self.stored_revision().unwrap_or(0);
                warn!(
                    %error,
                    key = %self.key,
                    revision,
                    "unreadable register snapshot; loading as closed"
                );
                RegisterSnapshot::closed(revision)
            }
        }
    }

    fn save(
        &self,
        snapshot: &RegisterSnapshot,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        snapshot.validate()?;
        expected.check(self.stored_revision()?)?;
        self.write(snapshot)
    }
}

/// Best-effort `revision` field of a possibly malformed document.
fn revision_hint(raw: &str) -> u64 {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|doc| doc.get("revision").and_then(serde_json::Value::as_u64))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tillbook_core::{DomainError, Money, SessionId};

    use crate::storage::InMemoryStorage;

    fn store() -> (Arc<InMemoryStorage>, JsonLedgerStore<Arc<InMemoryStorage>>) {
        let storage = Arc::new(InMemoryStorage::new());
        (storage.clone(), JsonLedgerStore::new(storage))
    }

    fn open_snapshot(revision: u64, cents: i64) -> RegisterSnapshot {
        let amount = Money::from_cents(cents);
        RegisterSnapshot::open(revision, SessionId::new(), amount, amount, Utc::now())
    }

    #[test]
    fn empty_storage_loads_closed() {
        let (_, store) = store();
        assert_eq!(store.load(), RegisterSnapshot::closed(0));
        assert!(store.try_load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let (storage, store) = store();
        let snapshot = open_snapshot(1, 10_000);
        store.save(&snapshot, ExpectedVersion::Exact(0)).unwrap();

        assert_eq!(store.load(), snapshot);
        let raw = storage.get_item(REGISTER_KEY).unwrap().unwrap();
        assert!(raw.contains("\"initialOpeningAmount\":\"100.00\""));
    }

    #[test]
    fn stale_revision_is_a_conflict() {
        let (_, store) = store();
        store.save(&open_snapshot(1, 10_000), ExpectedVersion::Exact(0)).unwrap();

        let err = store
            .save(&open_snapshot(1, 5_000), ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
        assert_eq!(store.load().current_balance, Some(Money::from_cents(10_000)));
    }

    #[test]
    fn invalid_snapshots_are_not_written() {
        let (storage, store) = store();
        let mut broken = RegisterSnapshot::closed(1);
        broken.current_balance = Some(Money::from_cents(100));

        assert!(matches!(
            store.save(&broken, ExpectedVersion::Any),
            Err(StoreError::Domain(DomainError::InvariantViolation(_)))
        ));
        assert!(storage.is_empty().unwrap());
    }

    #[test]
    fn corrupt_json_loads_closed_and_keeps_revision_hint() {
        let (storage, store) = store();
        storage.set_item(REGISTER_KEY, "{not json").unwrap();
        assert_eq!(store.load(), RegisterSnapshot::closed(0));
        assert!(matches!(store.try_load(), Err(PersistenceReadError::Corrupt { .. })));

        storage
            .set_item(REGISTER_KEY, r#"{"revision":7,"isOpen":true,"currentBalance":"-5.00"}"#)
            .unwrap();
        assert_eq!(store.load(), RegisterSnapshot::closed(7));
        assert!(matches!(store.try_load(), Err(PersistenceReadError::Inconsistent { .. })));

        // The recovered closed state can be saved over the bad document.
        store
            .save(&RegisterSnapshot::closed(7), ExpectedVersion::Exact(7))
            .unwrap();
        assert_eq!(store.try_load().unwrap(), Some(RegisterSnapshot::closed(7)));
    }

    #[test]
    fn legacy_document_is_upgraded_once() {
        let (storage, store) = store();
        storage
            .set_item(
                LEGACY_REGISTER_KEY,
                r#"{"isOpen":true,"openedAmount":150.5,"openingTimestamp":"29/07/2024, 12:30"}"#,
            )
            .unwrap();

        let snapshot = store.load();
        assert!(snapshot.is_open);
        assert_eq!(snapshot.initial_opening_amount, Some(Money::from_cents(15_050)));
        assert_eq!(snapshot.current_balance, snapshot.initial_opening_amount);

        assert!(storage.get_item(LEGACY_REGISTER_KEY).unwrap().is_none());
        assert!(storage.get_item(REGISTER_KEY).unwrap().is_some());
        assert_eq!(store.load(), snapshot);
    }

    #[test]
    fn corrupt_legacy_document_is_left_alone() {
        let (storage, store) = store();
        storage.set_item(LEGACY_REGISTER_KEY, "garbage").unwrap();

        assert_eq!(store.load(), RegisterSnapshot::closed(0));
        assert_eq!(storage.get_item(LEGACY_REGISTER_KEY).unwrap().as_deref(), Some("garbage"));
    }
}
