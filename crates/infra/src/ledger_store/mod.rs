//! Register snapshot persistence.
//!
//! The ledger keeps exactly one document per till. Reads never fail (an
//! unreadable document loads as a closed register) while writes are checked
//! against the revision the caller loaded.

pub mod json;
pub mod legacy;

pub use json::{JsonLedgerStore, LEGACY_REGISTER_KEY, REGISTER_KEY};
pub use legacy::LegacyRegisterState;

use std::sync::Arc;

use thiserror::Error;

use tillbook_core::{DomainError, ExpectedVersion};
use tillbook_register::RegisterSnapshot;

use crate::storage::StorageError;

/// Write-side store error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stale revision, invalid snapshot or duplicate record.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored document could not be read back, so it was left untouched.
    #[error(transparent)]
    Read(#[from] PersistenceReadError),

    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a stored document could not be used. `load` recovers from it; a write
/// that has to merge into the document refuses with it instead.
#[derive(Debug, Error)]
pub enum PersistenceReadError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("'{key}' is not valid JSON for its schema: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{key}' breaks a register invariant: {source}")]
    Inconsistent {
        key: String,
        #[source]
        source: DomainError,
    },
}

/// Persistence port for the register snapshot.
pub trait LedgerStore: Send + Sync {
    /// Current snapshot; missing or unreadable data loads as a closed register.
    fn load(&self) -> RegisterSnapshot;

    /// Replace the stored snapshot if its revision still matches `expected`.
    fn save(
        &self,
        snapshot: &RegisterSnapshot,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn load(&self) -> RegisterSnapshot {
        (**self).load()
    }

    fn save(
        &self,
        snapshot: &RegisterSnapshot,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).save(snapshot, expected)
    }
}
