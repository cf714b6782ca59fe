//! Registration of imported tasks in the editor's task history
//!
//! The editor keeps a primary state file and a mirror it may swap in on its
//! own schedule. Both get a backup with the same suffix and the same entries.
//! There is no atomicity across the two files: if the mirror fails after the
//! primary committed, the error says so and the backups allow a paired
//! restore.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::document::HistoryEntry;
use super::store::{StateStore, DEFAULT_BUSY_TIMEOUT};
use crate::backup::{backup_file, backup_path, new_suffix};
use crate::config::paths::{EditorPaths, STATE_DB_FILE, STATE_DB_MIRROR_FILE};
use crate::error::{TaskManError, TaskManResult};
use crate::models::Task;
use crate::storage::task_stats;

/// What happened to one state file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Backup written before the mutation, if that succeeded
    pub backup: Option<PathBuf>,
    /// History length after the commit
    pub history_len: usize,
}

/// Result of `register_imported_tasks`
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationReport {
    /// Suffix shared by the primary and mirror backups
    pub suffix: String,
    /// Entries appended to each file
    pub entries: usize,
    pub primary: FileOutcome,
    /// `None` when the installation has no mirror file
    pub mirror: Option<FileOutcome>,
    /// Non-fatal problems, such as a failed pre-mutation backup
    pub warnings: Vec<String>,
}

/// Per-file presence of requested IDs in `taskHistory`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Verification {
    pub primary: BTreeMap<String, bool>,
    pub mirror: BTreeMap<String, bool>,
    pub mirror_present: bool,
}

impl Verification {
    /// One `VerificationMismatch` per file that lacks some IDs
    ///
    /// An absent mirror is not a mismatch.
    pub fn mismatches(&self, primary: &Path, mirror: &Path) -> Vec<TaskManError> {
        let missing = |map: &BTreeMap<String, bool>| -> Vec<String> {
            map.iter().filter(|(_, found)| !**found).map(|(id, _)| id.clone()).collect()
        };

        let mut out = Vec::new();
        let primary_missing = missing(&self.primary);
        if !primary_missing.is_empty() {
            out.push(TaskManError::VerificationMismatch {
                file: primary.to_path_buf(),
                missing: primary_missing,
            });
        }
        if self.mirror_present {
            let mirror_missing = missing(&self.mirror);
            if !mirror_missing.is_empty() {
                out.push(TaskManError::VerificationMismatch {
                    file: mirror.to_path_buf(),
                    missing: mirror_missing,
                });
            }
        }
        out
    }
}

/// Appends task registrations to the primary and mirror state files
#[derive(Debug, Clone)]
pub struct StateSynchronizer {
    state_dir: PathBuf,
    plugin_id: String,
    busy_timeout: Duration,
    debug: bool,
}

impl StateSynchronizer {
    /// Synchronizer for the state files in `state_dir`
    pub fn new(state_dir: impl Into<PathBuf>, plugin_id: impl Into<String>) -> Self {
        Self {
            state_dir: state_dir.into(),
            plugin_id: plugin_id.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            debug: false,
        }
    }

    /// Synchronizer for the resolved editor paths
    pub fn from_paths(paths: &EditorPaths) -> TaskManResult<Self> {
        Ok(Self::new(paths.state_dir()?, paths.plugin_id()))
    }

    /// Read back and log each file after committing
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn primary(&self) -> PathBuf {
        self.state_dir.join(STATE_DB_FILE)
    }

    pub fn mirror(&self) -> PathBuf {
        self.state_dir.join(STATE_DB_MIRROR_FILE)
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Append one history entry per task to both state files
    ///
    /// Each file is backed up first with one shared suffix. A backup failure
    /// is a warning, not an error. A missing primary is `PathNotFound`; a
    /// missing mirror is skipped. Transaction failures are fatal.
    pub fn register_imported_tasks(
        &self,
        workspace: &str,
        tasks: &[Task],
    ) -> TaskManResult<RegistrationReport> {
        if tasks.is_empty() {
            return Err(TaskManError::Validation("no tasks to register".into()));
        }

        let primary = self.primary();
        let mirror = self.mirror();
        if !primary.is_file() {
            return Err(TaskManError::PathNotFound {
                what: "State database",
                path: primary,
            });
        }

        let suffix = new_suffix(&[primary.as_path(), mirror.as_path()]);
        let entries: Vec<HistoryEntry> = tasks
            .iter()
            .map(|task| HistoryEntry::new(task, &task_stats(task), workspace))
            .collect();
        let mut warnings = Vec::new();

        let primary_outcome = self.register_in(&primary, &suffix, &entries, &mut warnings)?;

        let mirror_outcome = if mirror.is_file() {
            let outcome = self
                .register_in(&mirror, &suffix, &entries, &mut warnings)
                .map_err(|e| diverged(e, &mirror, &suffix))?;
            Some(outcome)
        } else {
            tracing::info!(path = %mirror.display(), "no mirror state file; skipping");
            None
        };

        tracing::info!(
            entries = entries.len(),
            suffix = %suffix,
            mirror = mirror_outcome.is_some(),
            "registered tasks in editor state"
        );

        Ok(RegistrationReport {
            suffix,
            entries: entries.len(),
            primary: primary_outcome,
            mirror: mirror_outcome,
            warnings,
        })
    }

    fn register_in(
        &self,
        db: &Path,
        suffix: &str,
        entries: &[HistoryEntry],
        warnings: &mut Vec<String>,
    ) -> TaskManResult<FileOutcome> {
        let backup = match backup_file(db, suffix) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(
                    path = %db.display(),
                    backup = %backup_path(db, suffix).display(),
                    error = %e,
                    "backup failed; updating without it"
                );
                warnings.push(format!("backup of {} failed: {}", db.display(), e));
                None
            }
        };

        let mut store = StateStore::open(db, self.busy_timeout)?;
        if self.debug {
            for entry in entries {
                tracing::debug!(
                    db = %db.display(),
                    plugin = %self.plugin_id,
                    id = %entry.id,
                    ts = entry.ts,
                    size = entry.size,
                    tokens_in = entry.tokens_in,
                    tokens_out = entry.tokens_out,
                    cache_reads = entry.cache_reads,
                    cache_writes = entry.cache_writes,
                    total_cost = entry.total_cost,
                    mode = %entry.mode,
                    "inserting taskHistory entry"
                );
            }
        }

        let history_len = store.append_history(&self.plugin_id, entries)?;
        store.checkpoint();

        if self.debug {
            self.log_read_back(&store, entries);
        }

        Ok(FileOutcome {
            path: db.to_path_buf(),
            backup,
            history_len,
        })
    }

    fn log_read_back(&self, store: &StateStore, entries: &[HistoryEntry]) {
        match store.read_document(&self.plugin_id) {
            Ok(Some(doc)) => match doc.history_ids() {
                Ok(ids) => {
                    tracing::debug!(db = %store.path().display(), count = ids.len(), "write committed");
                    for entry in entries {
                        tracing::debug!(id = %entry.id, found = ids.contains(&entry.id), "read back");
                    }
                }
                Err(e) => tracing::debug!(error = %e, "taskHistory unreadable on read back"),
            },
            Ok(None) => tracing::debug!(db = %store.path().display(), "row missing on read back"),
            Err(e) => tracing::debug!(error = %e, "read back failed"),
        }
    }

    /// Check which `ids` are present in each file's `taskHistory`
    ///
    /// A missing primary is `PathNotFound`. A missing mirror, or any file
    /// whose row or table cannot be read, maps every ID to `false`.
    pub fn verify_registration(&self, ids: &[String]) -> TaskManResult<Verification> {
        let primary = self.primary();
        if !primary.is_file() {
            return Err(TaskManError::PathNotFound {
                what: "State database",
                path: primary,
            });
        }

        let mirror = self.mirror();
        let mirror_present = mirror.is_file();

        Ok(Verification {
            primary: self.presence(&primary, ids),
            mirror: if mirror_present {
                self.presence(&mirror, ids)
            } else {
                ids.iter().map(|id| (id.clone(), false)).collect()
            },
            mirror_present,
        })
    }

    fn presence(&self, db: &Path, ids: &[String]) -> BTreeMap<String, bool> {
        let found: Vec<String> = StateStore::open_read_only(db, self.busy_timeout)
            .and_then(|store| store.read_document(&self.plugin_id))
            .map(|doc| doc.and_then(|d| d.history_ids().ok()).unwrap_or_default())
            .unwrap_or_else(|e| {
                tracing::debug!(db = %db.display(), error = %e, "verification read failed");
                Vec::new()
            });

        ids.iter().map(|id| (id.clone(), found.contains(id))).collect()
    }
}

/// Report a mirror failure that left the primary already committed
fn diverged(err: TaskManError, mirror: &Path, suffix: &str) -> TaskManError {
    tracing::error!(
        mirror = %mirror.display(),
        suffix,
        error = %err,
        "mirror update failed after the primary was committed; files have diverged"
    );
    TaskManError::StateDiverged {
        mirror: mirror.to_path_buf(),
        suffix: suffix.to_string(),
        cause: Box::new(err),
    }
}
