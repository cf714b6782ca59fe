//! SQLite access to one state database file
//!
//! The editor owns these files and may hold them open, so every connection
//! waits a bounded time for locks and uses WAL mode. Mutations run inside one
//! `BEGIN IMMEDIATE` transaction that rolls back on any error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};

use super::document::{HistoryEntry, StateDocument};
use crate::error::{TaskManError, TaskManResult};

/// How long to wait for the editor to release a lock
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// The editor's key/value table
pub const ITEM_TABLE_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS ItemTable (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB)";

const SELECT_VALUE: &str = "SELECT value FROM ItemTable WHERE key = ?1";

const UPSERT_VALUE: &str = "INSERT INTO ItemTable (key, value) VALUES (?1, ?2)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value";

/// An open state database
pub struct StateStore {
    conn: Connection,
    path: PathBuf,
}

impl StateStore {
    /// Open an existing database for writing
    ///
    /// The file is never created; a missing file is `PathNotFound`.
    pub fn open(path: &Path, busy_timeout: Duration) -> TaskManResult<Self> {
        let store = Self::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            busy_timeout,
        )?;

        // Best effort: the editor may hold the file in another journal mode
        if let Err(e) = store.conn.execute_batch("PRAGMA journal_mode = WAL;") {
            tracing::warn!(path = %path.display(), error = %e, "could not switch to WAL mode");
        }
        Ok(store)
    }

    /// Open an existing database for reading only
    pub fn open_read_only(path: &Path, busy_timeout: Duration) -> TaskManResult<Self> {
        Self::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            busy_timeout,
        )
    }

    fn open_with_flags(path: &Path, flags: OpenFlags, busy_timeout: Duration) -> TaskManResult<Self> {
        if !path.is_file() {
            return Err(TaskManError::PathNotFound {
                what: "State database",
                path: path.to_path_buf(),
            });
        }

        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| TaskManError::from_sqlite(path, e))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| TaskManError::from_sqlite(path, e))?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document stored under `key`
    ///
    /// `None` when the table or the row does not exist.
    pub fn read_document(&self, key: &str) -> TaskManResult<Option<StateDocument>> {
        let raw = match read_value(&self.conn, key) {
            Ok(raw) => raw,
            Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("no such table") => None,
            Err(e) => return Err(TaskManError::from_sqlite(&self.path, e)),
        };

        raw.map(|bytes| {
            StateDocument::parse(&bytes).map_err(|e| {
                TaskManError::Json(format!("{} `{}`: {}", self.path.display(), key, e))
            })
        })
        .transpose()
    }

    /// Append `entries` to the history under `key` in one transaction
    ///
    /// Returns the history length after the commit. On any error nothing is
    /// written.
    pub fn append_history(&mut self, key: &str, entries: &[HistoryEntry]) -> TaskManResult<usize> {
        let path = &self.path;
        let fail = |e: rusqlite::Error| TaskManError::from_sqlite(path, e);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(fail)?;
        tx.execute_batch(ITEM_TABLE_SCHEMA).map_err(fail)?;

        let mut document = match read_value(&tx, key).map_err(fail)? {
            Some(bytes) => StateDocument::parse(&bytes).map_err(|e| {
                TaskManError::write_failure(path, format!("stored value is not a JSON object: {}", e))
            })?,
            None => {
                tracing::debug!(path = %path.display(), key, "no row for key, starting a new document");
                StateDocument::empty()
            }
        };

        let len = document
            .append_history(entries)
            .map_err(|e| TaskManError::write_failure(path, format!("taskHistory: {}", e)))?;
        let json = document
            .to_json()
            .map_err(|e| TaskManError::write_failure(path, e))?;

        tx.execute(UPSERT_VALUE, params![key, json]).map_err(fail)?;
        tx.commit().map_err(fail)?;
        Ok(len)
    }

    /// Fold the write-ahead log back into the main file
    ///
    /// Failure is logged only; the committed data is safe in the log.
    pub fn checkpoint(&self) {
        if let Err(e) = self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") {
            tracing::warn!(path = %self.path.display(), error = %e, "WAL checkpoint failed");
        }
    }
}

/// The value for `key`, accepting TEXT or BLOB storage
fn read_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<Vec<u8>>> {
    conn.query_row(SELECT_VALUE, params![key], |row| {
        Ok(match row.get_ref(0)? {
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(bytes.to_vec()),
            _ => None,
        })
    })
    .optional()
    .map(Option::flatten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, TaskStats};
    use chrono::Utc;
    use tempfile::TempDir;

    const KEY: &str = "RooVeterinaryInc.roo-cline";

    fn create_db(path: &Path, value: Option<&str>) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(ITEM_TABLE_SCHEMA).unwrap();
        if let Some(value) = value {
            conn.execute(
                "INSERT INTO ItemTable (key, value) VALUES (?1, ?2)",
                params![KEY, value.as_bytes()],
            )
            .unwrap();
        }
    }

    fn entry(id: &str) -> HistoryEntry {
        HistoryEntry::new(&Task::new(id, "/tmp", Utc::now()), &TaskStats::default(), "/ws")
    }

    #[test]
    fn test_open_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.vscdb");
        let err = StateStore::open(&path, DEFAULT_BUSY_TIMEOUT).err().unwrap();
        assert!(err.is_not_found());
        assert!(!path.exists());
    }

    #[test]
    fn test_append_to_blob_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.vscdb");
        create_db(&path, Some(r#"{"keep":[1,2,3],"taskHistory":[{"id":"old"}]}"#));

        let mut store = StateStore::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        assert_eq!(store.append_history(KEY, &[entry("a")]).unwrap(), 2);
        store.checkpoint();

        let doc = store.read_document(KEY).unwrap().unwrap();
        assert_eq!(doc.history_ids().unwrap(), vec!["old", "a"]);
        assert!(doc.to_json().unwrap().starts_with(r#"{"keep":[1,2,3],"#));
    }

    #[test]
    fn test_append_creates_row_and_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.vscdb");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (x INTEGER);")
            .unwrap();

        let mut store = StateStore::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        assert!(store.read_document(KEY).unwrap().is_none());
        assert_eq!(store.append_history(KEY, &[entry("a"), entry("b")]).unwrap(), 2);

        let doc = store.read_document(KEY).unwrap().unwrap();
        assert_eq!(doc.history_ids().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_bad_document_rolls_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.vscdb");
        create_db(&path, Some(r#"{"taskHistory":"not an array"}"#));

        let mut store = StateStore::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        let err = store.append_history(KEY, &[entry("a")]).unwrap_err();
        assert!(matches!(err, TaskManError::WriteFailure { .. }));

        let raw = read_value(&store.conn, KEY).unwrap().unwrap();
        assert_eq!(raw, br#"{"taskHistory":"not an array"}"#);
    }

    #[test]
    fn test_locked_database_times_out() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.vscdb");
        create_db(&path, None);

        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("PRAGMA journal_mode = WAL;").unwrap();
        holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

        let mut store = StateStore::open(&path, Duration::from_millis(50)).unwrap();
        let err = store.append_history(KEY, &[entry("a")]).unwrap_err();
        assert!(matches!(err, TaskManError::LockTimeout { .. }), "{:?}", err);

        holder.execute_batch("ROLLBACK;").unwrap();
    }

    #[test]
    fn test_read_only_missing_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.vscdb");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (x INTEGER);")
            .unwrap();

        let store = StateStore::open_read_only(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        assert!(store.read_document(KEY).unwrap().is_none());
    }
}
