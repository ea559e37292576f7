//! SQLite realization of [`PersistenceStore`].
//!
//! One append-only table, created on first access. Each commit stages every
//! row inside a single transaction. Before the transaction opens, the online
//! backup API snapshots the database to `<db>.backup`; if the transaction
//! fails the snapshot is restored, and after success it is refreshed.

use std::path::{Path, PathBuf};

use rusqlite::backup::Progress;
use rusqlite::{params, Connection, DatabaseName, OpenFlags};
use tracing::{error, info, warn};

use super::{ensure_persistable, PersistedRow, PersistenceStore};
use crate::error::{PhaseError, Result};
use crate::phase::PhaseRecord;

#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    backup_path: PathBuf,
    table: String,
}

impl SqliteStore {
    pub fn new(path: PathBuf, backup_path: PathBuf, table_name: &str) -> Self {
        SqliteStore {
            path,
            backup_path,
            table: quote_identifier(table_name),
        }
    }

    /// Store with the default table name and a `<db>.backup` sibling.
    pub fn at(path: &Path) -> Self {
        SqliteStore::new(
            path.to_path_buf(),
            super::backup_path_for(path),
            super::DEFAULT_TABLE_NAME,
        )
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> std::result::Result<T, String>,
    ) -> std::result::Result<T, String> {
        let mut conn = self.open()?;
        ensure_table(&conn, &self.table)?;
        op(&mut conn)
    }

    fn open(&self) -> std::result::Result<Connection, String> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)
                .map_err(|err| format!("Failed to create data dir: {}", err))?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|err| format!("Failed to open sqlite db: {}", err))?;

        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(|err| format!("Failed to set synchronous: {}", err))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|err| format!("Failed to set busy_timeout: {}", err))?;

        Ok(conn)
    }

    fn snapshot(&self, conn: &Connection) -> std::result::Result<(), String> {
        conn.backup(DatabaseName::Main, &self.backup_path, None)
            .map_err(|err| format!("Failed to snapshot database: {}", err))
    }

    fn restore(&self, conn: &mut Connection) -> std::result::Result<(), String> {
        conn.restore(DatabaseName::Main, &self.backup_path, None::<fn(Progress)>)
            .map_err(|err| format!("Failed to restore database snapshot: {}", err))
    }

    fn commit_failed(&self, details: String) -> PhaseError {
        PhaseError::CommitFailed {
            path: self.path.clone(),
            details,
        }
    }
}

impl PersistenceStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<PersistedRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        self.with_connection(|conn| {
            let sql = format!(
                "SELECT id, date, duration, phase_kind, reserved1, reserved2, reserved3, reserved4 \
                 FROM {} ORDER BY id ASC",
                self.table
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|err| format!("Failed to prepare history query: {}", err))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(PersistedRow {
                        id: row.get(0)?,
                        date: row.get(1)?,
                        duration: row.get(2)?,
                        phase_kind: row.get(3)?,
                        reserved1: row.get(4)?,
                        reserved2: row.get(5)?,
                        reserved3: row.get(6)?,
                        reserved4: row.get(7)?,
                    })
                })
                .map_err(|err| format!("Failed to read history rows: {}", err))?;

            let mut result = Vec::new();
            for row in rows {
                result.push(row.map_err(|err| format!("Failed to decode history row: {}", err))?);
            }
            Ok(result)
        })
        .map_err(|details| PhaseError::StorageUnavailable {
            path: self.path.clone(),
            details,
        })
    }

    fn commit(&self, records: &[PhaseRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        ensure_persistable(records, &self.path)?;

        self.with_connection(|conn| {
            self.snapshot(conn)?;

            match insert_batch(conn, &self.table, records) {
                Ok(()) => {
                    if let Err(err) = self.snapshot(conn) {
                        warn!(error = %err, path = %self.backup_path.display(), "Backup refresh failed after commit");
                    }
                    Ok(())
                }
                Err(details) => {
                    warn!(error = %details, path = %self.path.display(), "Commit failed; restoring snapshot");
                    if let Err(restore_err) = self.restore(conn) {
                        error!(error = %restore_err, "Restore from snapshot failed");
                        return Err(format!("{}; {}", details, restore_err));
                    }
                    Err(details)
                }
            }
        })
        .map_err(|details| self.commit_failed(details))?;

        info!(count = records.len(), path = %self.path.display(), "Committed phase records");
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

fn ensure_table(conn: &Connection, table: &str) -> std::result::Result<(), String> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date INTEGER NOT NULL,
            duration INTEGER NOT NULL,
            phase_kind TEXT NOT NULL,
            reserved1 TEXT,
            reserved2 TEXT,
            reserved3 TEXT,
            reserved4 TEXT
         );",
        table
    ))
    .map_err(|err| format!("Failed to initialize schema: {}", err))
}

fn insert_batch(
    conn: &mut Connection,
    table: &str,
    records: &[PhaseRecord],
) -> std::result::Result<(), String> {
    let tx = conn
        .transaction()
        .map_err(|err| format!("Failed to start commit transaction: {}", err))?;

    {
        let sql = format!(
            "INSERT INTO {} (date, duration, phase_kind) VALUES (?1, ?2, ?3)",
            table
        );
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|err| format!("Failed to prepare insert: {}", err))?;
        for record in records {
            stmt.execute(params![
                record.date_ms(),
                record.duration_ms(),
                record.phase_kind().label()
            ])
            .map_err(|err| format!("Failed to insert {} row: {}", record.phase_kind(), err))?;
        }
    }

    tx.commit()
        .map_err(|err| format!("Failed to commit transaction: {}", err))
}

/// Wraps a table name in double quotes, doubling embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
