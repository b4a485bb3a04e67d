//! Runtime configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional `tillbook.toml`
//! (or the path given to [`TillbookConfig::load_from`]), then `TILLBOOK__*`
//! environment variables such as `TILLBOOK__STORAGE__DATA_DIR=/var/lib/tillbook`.

use std::path::PathBuf;

use serde::Deserialize;

use tillbook_core::RegisterId;
use tillbook_observability::LogFormat;

use crate::history_store::HISTORY_KEY;
use crate::ledger_store::{LEGACY_REGISTER_KEY, REGISTER_KEY};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TillbookConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for JSON documents; in-memory storage when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_register_key")]
    pub register_key: String,
    #[serde(default = "default_legacy_register_key")]
    pub legacy_register_key: String,
    #[serde(default = "default_history_key")]
    pub history_key: String,
    /// Fixed till identity; a fresh id per process when unset.
    #[serde(default)]
    pub register_id: Option<RegisterId>,
}

fn default_register_key() -> String {
    REGISTER_KEY.to_string()
}

fn default_legacy_register_key() -> String {
    LEGACY_REGISTER_KEY.to_string()
}

fn default_history_key() -> String {
    HISTORY_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            register_key: default_register_key(),
            legacy_register_key: default_legacy_register_key(),
            history_key: default_history_key(),
            register_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl TillbookConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("tillbook")
    }

    /// `file` is a path without extension; a missing file is not an error.
    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix("TILLBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_canonical_keys() {
        let config = TillbookConfig::default();
        assert_eq!(config.storage.register_key, "cashRegisterStatus_v2");
        assert_eq!(config.storage.legacy_register_key, "cashRegisterStatus_v1");
        assert_eq!(config.storage.history_key, "salesHistory_v1");
        assert!(config.storage.data_dir.is_none());
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("tillbook-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("tillbook.toml");
        std::fs::write(
            &file,
            r#"
[storage]
data_dir = "/var/lib/tillbook"
history_key = "history_test"

[log]
format = "pretty"
"#,
        )
        .unwrap();

        let base = dir.join("tillbook");
        let config = TillbookConfig::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/var/lib/tillbook")));
        assert_eq!(config.storage.history_key, "history_test");
        assert_eq!(config.storage.register_key, "cashRegisterStatus_v2");
        assert_eq!(config.log.format, LogFormat::Pretty);

        let _ = std::fs::remove_dir_all(dir);
    }
}
