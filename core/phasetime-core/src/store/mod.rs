//! Durable storage for closed phase records.
//!
//! Every backend follows the same commit protocol:
//!
//! 1. Snapshot the current durable state to a sibling backup.
//! 2. Append the new rows (all or nothing from the caller's point of view).
//! 3. On success, refresh the backup. On failure, restore from the backup and
//!    return [`PhaseError::CommitFailed`].
//!
//! Readers never see a half-written store. The backup is never read by
//! [`PersistenceStore::load_all`]; it exists only for restore-on-failure.
//!
//! # Backends
//!
//! - [`JsonFileStore`]: one JSON document, rows under a named table key,
//!   rewritten wholesale per commit (temp file + rename)
//! - [`SqliteStore`]: one table, one transaction per commit, online backup
//!   snapshot around the write

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{PhasetimeConfig, StoreBackend};
use crate::error::{PhaseError, Result};
use crate::phase::{PhaseKind, PhaseRecord};
use crate::storage::StorageConfig;

mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

/// Default name of the collection / table holding phase rows.
pub const DEFAULT_TABLE_NAME: &str = "SESSION_PHASE_HISTORY";

/// One stored phase record.
///
/// `id` is assigned by the store (row position for JSON, rowid for SQLite).
/// `phase_kind` stays a raw label so rows written by newer versions still load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRow {
    pub id: i64,
    /// Start of the phase, milliseconds since the Unix epoch.
    pub date: i64,
    /// Milliseconds.
    pub duration: i64,
    pub phase_kind: String,
    pub reserved1: Option<String>,
    pub reserved2: Option<String>,
    pub reserved3: Option<String>,
    pub reserved4: Option<String>,
}

impl PersistedRow {
    pub fn from_record(id: i64, record: &PhaseRecord) -> Self {
        PersistedRow {
            id,
            date: record.date_ms(),
            duration: record.duration_ms(),
            phase_kind: record.phase_kind().label().to_string(),
            reserved1: None,
            reserved2: None,
            reserved3: None,
            reserved4: None,
        }
    }

    /// Parsed kind, or `None` for an unrecognized label.
    pub fn kind(&self) -> Option<PhaseKind> {
        PhaseKind::from_label(&self.phase_kind)
    }
}

/// Durable, append-only home for phase records.
pub trait PersistenceStore: fmt::Debug + Send {
    /// Reads every stored row. A missing or empty store yields an empty list;
    /// a store that exists but cannot be opened or decoded is
    /// [`PhaseError::StorageUnavailable`].
    fn load_all(&self) -> Result<Vec<PersistedRow>>;

    /// Appends all records or none. On failure the durable state equals the
    /// pre-commit snapshot.
    fn commit(&self, records: &[PhaseRecord]) -> Result<()>;

    /// Primary durable artifact (file path), for diagnostics.
    fn location(&self) -> &Path;
}

/// Builds the configured backend under the storage root.
pub fn open_store(storage: &StorageConfig, config: &PhasetimeConfig) -> Box<dyn PersistenceStore> {
    match config.backend {
        StoreBackend::Json => Box::new(JsonFileStore::new(
            storage.history_file(),
            storage.history_backup_file(),
            &config.table_name,
        )),
        StoreBackend::Sqlite => Box::new(SqliteStore::new(
            storage.history_db_file(),
            storage.history_db_backup_file(),
            &config.table_name,
        )),
    }
}

/// Rejects batches containing the `Base` sentinel before anything is written.
fn ensure_persistable(records: &[PhaseRecord], path: &Path) -> Result<()> {
    match records.iter().find(|r| !r.phase_kind().is_persistable()) {
        Some(record) => Err(PhaseError::CommitFailed {
            path: path.to_path_buf(),
            details: format!("refusing to persist sentinel record ({})", record),
        }),
        None => Ok(()),
    }
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}
