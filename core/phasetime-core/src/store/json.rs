//! JSON-file realization of [`PersistenceStore`].
//!
//! # File Format
//!
//! ```json
//! {
//!   "SESSION_PHASE_HISTORY": [
//!     { "date": 1700000000000, "duration": 42000, "phase_kind": "LOBBY_LOADED" }
//!   ]
//! }
//! ```
//!
//! Other top-level keys are left alone. Rows written by older tooling used
//! `game_state` instead of `phase_kind` and carried older labels such as
//! `STATE_LOBBY_LOADED` or `LOBBY`; both are accepted on read (see
//! [`PhaseKind::from_label`](crate::phase::PhaseKind::from_label)).
//!
//! # Atomic Writes
//!
//! The new document goes to a temp file in the same directory and is renamed
//! over the original. The `.backup` sibling is refreshed after every
//! successful commit and copied back if the write fails.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use super::{ensure_persistable, PersistedRow, PersistenceStore};
use crate::error::{PhaseError, Result};
use crate::phase::PhaseRecord;

/// On-disk shape of one row.
#[derive(Debug, Serialize, Deserialize)]
struct RowDocument {
    date: i64,
    duration: i64,
    #[serde(alias = "game_state")]
    phase_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reserved1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reserved2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reserved3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reserved4: Option<String>,
}

impl RowDocument {
    fn from_record(record: &PhaseRecord) -> Self {
        RowDocument {
            date: record.date_ms(),
            duration: record.duration_ms(),
            phase_kind: record.phase_kind().label().to_string(),
            reserved1: None,
            reserved2: None,
            reserved3: None,
            reserved4: None,
        }
    }

    fn into_row(self, id: i64) -> PersistedRow {
        PersistedRow {
            id,
            date: self.date,
            duration: self.duration,
            phase_kind: self.phase_kind,
            reserved1: self.reserved1,
            reserved2: self.reserved2,
            reserved3: self.reserved3,
            reserved4: self.reserved4,
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
enum WriteFault {
    /// Writes half of the new document straight over the data file, then fails.
    TornWrite,
}

#[derive(Debug)]
pub struct JsonFileStore {
    file_path: PathBuf,
    backup_path: PathBuf,
    table_name: String,
    #[cfg(test)]
    fault: std::cell::Cell<Option<WriteFault>>,
}

impl JsonFileStore {
    pub fn new(file_path: PathBuf, backup_path: PathBuf, table_name: &str) -> Self {
        JsonFileStore {
            file_path,
            backup_path,
            table_name: table_name.to_string(),
            #[cfg(test)]
            fault: std::cell::Cell::new(None),
        }
    }

    /// Store with the default table name and a `<file>.backup` sibling.
    pub fn at(file_path: &Path) -> Self {
        JsonFileStore::new(
            file_path.to_path_buf(),
            super::backup_path_for(file_path),
            super::DEFAULT_TABLE_NAME,
        )
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    fn unavailable(&self, details: String) -> PhaseError {
        PhaseError::StorageUnavailable {
            path: self.file_path.clone(),
            details,
        }
    }

    fn commit_failed(&self, details: String) -> PhaseError {
        PhaseError::CommitFailed {
            path: self.file_path.clone(),
            details,
        }
    }

    fn create_if_missing(&self) -> std::result::Result<(), String> {
        if self.file_path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data dir: {}", e))?;
        }
        fs::write(&self.file_path, "{}")
            .map_err(|e| format!("Failed to create history file: {}", e))
    }

    fn save_backup(&self) -> std::result::Result<(), String> {
        fs::copy(&self.file_path, &self.backup_path)
            .map(|_| ())
            .map_err(|e| format!("Failed to save backup: {}", e))
    }

    fn restore_from_backup(&self) -> std::result::Result<(), String> {
        fs::copy(&self.backup_path, &self.file_path)
            .map(|_| ())
            .map_err(|e| format!("Failed to restore from backup: {}", e))
    }

    fn read_document(&self) -> std::result::Result<Map<String, Value>, String> {
        let content = fs::read_to_string(&self.file_path)
            .map_err(|e| format!("Failed to read history file: {}", e))?;

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str::<Map<String, Value>>(&content)
            .map_err(|e| format!("Failed to parse history file: {}", e))
    }

    fn write_appended(
        &self,
        mut document: Map<String, Value>,
        records: &[PhaseRecord],
    ) -> std::result::Result<(), String> {
        let table = document
            .entry(self.table_name.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        let rows = table
            .as_array_mut()
            .ok_or_else(|| format!("Table '{}' is not a list", self.table_name))?;

        for record in records {
            let row = serde_json::to_value(RowDocument::from_record(record))
                .map_err(|e| format!("Failed to serialize row: {}", e))?;
            rows.push(row);
        }

        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| format!("Failed to serialize history: {}", e))?;

        self.apply_write_fault(&content)?;

        let parent_dir = self
            .file_path
            .parent()
            .ok_or_else(|| "History file path has no parent directory".to_string())?;
        let mut temp_file =
            NamedTempFile::new_in(parent_dir).map_err(|e| format!("Temp file error: {}", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| format!("Failed to write temp history file: {}", e))?;
        temp_file
            .flush()
            .map_err(|e| format!("Failed to flush temp history file: {}", e))?;
        temp_file
            .persist(&self.file_path)
            .map_err(|e| format!("Failed to replace history file: {}", e.error))?;

        Ok(())
    }

    #[cfg(not(test))]
    fn apply_write_fault(&self, _content: &str) -> std::result::Result<(), String> {
        Ok(())
    }

    #[cfg(test)]
    fn apply_write_fault(&self, content: &str) -> std::result::Result<(), String> {
        match self.fault.take() {
            Some(WriteFault::TornWrite) => {
                let half = &content.as_bytes()[..content.len() / 2];
                fs::write(&self.file_path, half).map_err(|e| e.to_string())?;
                Err("injected torn write".to_string())
            }
            None => Ok(()),
        }
    }

    #[cfg(test)]
    fn inject_torn_write(&self) {
        self.fault.set(Some(WriteFault::TornWrite));
    }
}

impl PersistenceStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<PersistedRow>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }

        let mut document = self.read_document().map_err(|e| self.unavailable(e))?;
        let table = match document.remove(&self.table_name) {
            Some(table) => table,
            None => return Ok(Vec::new()),
        };

        let rows: Vec<RowDocument> = serde_json::from_value(table)
            .map_err(|e| self.unavailable(format!("Malformed table '{}': {}", self.table_name, e)))?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| row.into_row(index as i64 + 1))
            .collect())
    }

    fn commit(&self, records: &[PhaseRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        ensure_persistable(records, &self.file_path)?;

        self.create_if_missing().map_err(|e| self.commit_failed(e))?;
        // A file that does not parse must never replace the last good backup.
        let document = self.read_document().map_err(|e| self.commit_failed(e))?;
        self.save_backup().map_err(|e| self.commit_failed(e))?;

        match self.write_appended(document, records) {
            Ok(()) => {
                if let Err(err) = self.save_backup() {
                    warn!(error = %err, path = %self.backup_path.display(), "Backup refresh failed after commit");
                }
                info!(count = records.len(), path = %self.file_path.display(), "Committed phase records");
                Ok(())
            }
            Err(details) => {
                warn!(error = %details, path = %self.file_path.display(), "Commit failed; restoring backup");
                if let Err(restore_err) = self.restore_from_backup() {
                    error!(error = %restore_err, "Restore from backup failed");
                    return Err(self.commit_failed(format!("{}; {}", details, restore_err)));
                }
                Err(self.commit_failed(details))
            }
        }
    }

    fn location(&self) -> &Path {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseKind;
    use tempfile::tempdir;

    fn sample_records() -> Vec<PhaseRecord> {
        vec![
            PhaseRecord::closed(PhaseKind::ClientLoading, 1_000, 3_000),
            PhaseRecord::closed(PhaseKind::LobbyLoaded, 3_000, 10_000),
            PhaseRecord::closed(PhaseKind::ArenaLoaded, 10_000, 190_000),
        ]
    }

    fn triples(rows: &[PersistedRow]) -> Vec<(i64, i64, String)> {
        rows.iter()
            .map(|r| (r.date, r.duration, r.phase_kind.clone()))
            .collect()
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));
        assert!(store.load_all().unwrap().is_empty());
        assert!(!store.location().exists());
    }

    #[test]
    fn test_load_empty_object_returns_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        std::fs::write(&file, "{}").unwrap();
        assert!(JsonFileStore::at(&file).load_all().unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_unavailable() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        std::fs::write(&file, "{not json").unwrap();

        let err = JsonFileStore::at(&file).load_all().unwrap_err();
        assert!(matches!(err, PhaseError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_load_malformed_row_is_unavailable() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        std::fs::write(
            &file,
            r#"{"SESSION_PHASE_HISTORY":[{"date":1,"duration":"long","phase_kind":"LOBBY_LOADED"}]}"#,
        )
        .unwrap();

        let err = JsonFileStore::at(&file).load_all().unwrap_err();
        assert!(matches!(err, PhaseError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_commit_round_trip() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));
        let records = sample_records();

        store.commit(&records).unwrap();
        let rows = store.load_all().unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            triples(&rows),
            vec![
                (1_000, 2_000, "CLIENT_LOADING".to_string()),
                (3_000, 7_000, "LOBBY_LOADED".to_string()),
                (10_000, 180_000, "ARENA_LOADED".to_string()),
            ]
        );
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_commits_append() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));

        store.commit(&sample_records()[..1]).unwrap();
        store.commit(&sample_records()[1..]).unwrap();

        assert_eq!(store.load_all().unwrap().len(), 3);
    }

    #[test]
    fn test_backup_mirrors_committed_state() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));

        store.commit(&sample_records()).unwrap();

        let main = std::fs::read_to_string(store.location()).unwrap();
        let backup = std::fs::read_to_string(store.backup_path()).unwrap();
        assert_eq!(main, backup);
    }

    #[test]
    fn test_empty_commit_does_not_touch_disk() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));
        store.commit(&[]).unwrap();
        assert!(!store.location().exists());
    }

    #[test]
    fn test_preserves_foreign_keys() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        std::fs::write(&file, r#"{"OTHER_TABLE":[1,2,3]}"#).unwrap();
        let store = JsonFileStore::at(&file);

        store.commit(&sample_records()).unwrap();

        let content: Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(content["OTHER_TABLE"], serde_json::json!([1, 2, 3]));
        assert_eq!(content["SESSION_PHASE_HISTORY"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_reads_legacy_game_state_key() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        std::fs::write(
            &file,
            r#"{"SESSION_PHASE_HISTORY":[{"date":5,"duration":10,"game_state":"ARENA_LOADED"}]}"#,
        )
        .unwrap();

        let rows = JsonFileStore::at(&file).load_all().unwrap();
        assert_eq!(rows[0].kind(), Some(PhaseKind::ArenaLoaded));
    }

    #[test]
    fn test_non_list_table_fails_commit_and_keeps_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        let original = r#"{"SESSION_PHASE_HISTORY":{"oops":true}}"#;
        std::fs::write(&file, original).unwrap();

        let err = JsonFileStore::at(&file).commit(&sample_records()).unwrap_err();

        assert!(matches!(err, PhaseError::CommitFailed { .. }));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), original);
    }

    #[test]
    fn test_corrupt_file_never_overwrites_backup() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));
        store.commit(&sample_records()[..1]).unwrap();
        let good_backup = std::fs::read_to_string(store.backup_path()).unwrap();

        std::fs::write(store.location(), r#"{"SESSION_PHASE_HISTORY": ["#).unwrap();
        let err = store.commit(&sample_records()[1..]).unwrap_err();

        assert!(matches!(err, PhaseError::CommitFailed { .. }));
        let backup = std::fs::read_to_string(store.backup_path()).unwrap();
        assert_eq!(backup, good_backup);
        assert!(serde_json::from_str::<Value>(&backup).is_ok());
    }

    #[test]
    fn test_legacy_labels_map_to_phase_kinds() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        std::fs::write(
            &file,
            r#"{"SESSION_PHASE_HISTORY":[
                {"date":1,"duration":10,"game_state":"LOADING"},
                {"date":2,"duration":20,"game_state":"STATE_LOBBY_LOADED"},
                {"date":3,"duration":30,"game_state":"ARENA"}
            ]}"#,
        )
        .unwrap();

        let kinds: Vec<_> = JsonFileStore::at(&file)
            .load_all()
            .unwrap()
            .iter()
            .map(|r| r.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(PhaseKind::ClientLoading),
                Some(PhaseKind::LobbyLoaded),
                Some(PhaseKind::ArenaLoaded)
            ]
        );
    }

    #[test]
    fn test_torn_write_restores_previous_state() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));
        store.commit(&sample_records()[..1]).unwrap();
        let before = std::fs::read_to_string(store.location()).unwrap();

        store.inject_torn_write();
        let err = store.commit(&sample_records()[1..]).unwrap_err();

        assert!(matches!(err, PhaseError::CommitFailed { .. }));
        assert_eq!(std::fs::read_to_string(store.location()).unwrap(), before);
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_custom_table_name() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("history.json");
        let store = JsonFileStore::new(file.clone(), temp.path().join("h.bak"), "WOT_GAME_TIME");

        store.commit(&sample_records()).unwrap();

        let content: Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert!(content.get("WOT_GAME_TIME").is_some());
        assert!(temp.path().join("h.bak").exists());
    }
}
