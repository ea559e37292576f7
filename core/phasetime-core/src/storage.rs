//! Storage configuration and path management for phasetime.
//!
//! All file paths live here so the rest of the crate never builds paths by
//! hand. Tests inject a temp directory with [`StorageConfig::with_root`].

use std::path::{Path, PathBuf};

const ROOT_DIR_NAME: &str = ".phasetime";

/// Central configuration for all phasetime storage paths.
///
/// Production code uses `StorageConfig::default()` which points to `~/.phasetime/`.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    /// Falls back to `./.phasetime` when the home directory cannot be resolved.
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            root: base.join(ROOT_DIR_NAME),
        }
    }
}

impl StorageConfig {
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to history.json (JSON backend data file).
    pub fn history_file(&self) -> PathBuf {
        self.root.join("history.json")
    }

    /// Last known-good copy of history.json. Only read when restoring.
    pub fn history_backup_file(&self) -> PathBuf {
        self.root.join("history.json.backup")
    }

    /// Path to history.db (SQLite backend).
    pub fn history_db_file(&self) -> PathBuf {
        self.root.join("history.db")
    }

    pub fn history_db_backup_file(&self) -> PathBuf {
        self.root.join("history.db.backup")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Settings & Diagnostics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to config.json (backend selection, table name).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
