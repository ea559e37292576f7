//! User settings: which persistence backend to use and under which table name.
//!
//! Stored as `config.json` under the storage root. A missing or malformed
//! file yields defaults; only writes can fail.

use std::io::Write;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{PhaseError, Result};
use crate::storage::StorageConfig;
use crate::store::DEFAULT_TABLE_NAME;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("Unknown backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasetimeConfig {
    pub backend: StoreBackend,
    pub table_name: String,
}

impl Default for PhasetimeConfig {
    fn default() -> Self {
        PhasetimeConfig {
            backend: StoreBackend::Json,
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

/// Loads settings, returning defaults if the file is missing or unreadable.
pub fn load_config(storage: &StorageConfig) -> PhasetimeConfig {
    let path = storage.config_file();
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return PhasetimeConfig::default()
        }
        Err(err) => {
            warn!(error = %err, "Failed to read config; using defaults");
            return PhasetimeConfig::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, path = %path.display(), "Malformed config; using defaults");
            PhasetimeConfig::default()
        }
    }
}

/// Writes settings atomically (temp file + rename).
pub fn save_config(storage: &StorageConfig, config: &PhasetimeConfig) -> Result<()> {
    let path = storage.config_file();
    let write_failed = |source: std::io::Error| PhaseError::ConfigWriteFailed {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(storage.root()).map_err(write_failed)?;

    let content = serde_json::to_string_pretty(config).map_err(|source| PhaseError::Json {
        context: "serialize config".to_string(),
        source,
    })?;

    let mut temp_file = NamedTempFile::new_in(storage.root()).map_err(write_failed)?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(write_failed)?;
    temp_file
        .persist(&path)
        .map_err(|err| write_failed(err.error))?;

    Ok(())
}
