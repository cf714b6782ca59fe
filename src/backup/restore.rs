//! Restore state files from backups
//!
//! Restores copy the backup to a temp file beside the live file and rename
//! it into place, so an interrupted restore never leaves a half-written
//! state database.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::manager::{backup_path, BackupManager};
use crate::error::{TaskManError, TaskManResult};
use crate::storage::copy_file_atomic;

/// Reject suffixes that could name a file outside the state directory
pub fn validate_suffix(suffix: &str) -> TaskManResult<()> {
    if suffix.is_empty() || suffix.contains(['/', '\\', '\0']) || suffix.contains("..") {
        return Err(TaskManError::Validation(format!(
            "invalid backup suffix: {:?}",
            suffix
        )));
    }
    Ok(())
}

/// Files a restore would touch
#[derive(Debug, Clone, Serialize)]
pub struct RestorePlan {
    pub suffix: String,
    pub primary_backup: PathBuf,
    pub primary: PathBuf,
    /// Paired mirror backup, when one exists
    pub mirror_backup: Option<PathBuf>,
    pub mirror: PathBuf,
}

/// Result of a restore operation
#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub suffix: String,
    /// Live primary that was replaced
    pub primary: PathBuf,
    /// Whether the mirror was restored too
    pub mirror_restored: bool,
}

impl RestoreResult {
    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        if self.mirror_restored {
            format!("Restored primary and mirror from backup {}", self.suffix)
        } else {
            format!(
                "Restored primary from backup {} (no mirror backup; mirror not restored)",
                self.suffix
            )
        }
    }
}

/// Handles restoring from backups
pub struct RestoreManager {
    backups: BackupManager,
    debug: bool,
}

impl RestoreManager {
    /// Create a new RestoreManager
    pub fn new(backups: BackupManager) -> Self {
        Self {
            backups,
            debug: false,
        }
    }

    /// Log each copy step at debug level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Work out which files a restore of `suffix` would copy
    ///
    /// Fails with a backup "not found" error when the primary backup is absent.
    pub fn plan(&self, suffix: &str) -> TaskManResult<RestorePlan> {
        validate_suffix(suffix)?;

        let primary = self.backups.primary();
        let mirror = self.backups.mirror();
        let primary_backup = backup_path(&primary, suffix);
        if !primary_backup.is_file() {
            return Err(TaskManError::backup_not_found(suffix));
        }

        let mirror_backup = Some(backup_path(&mirror, suffix)).filter(|p| p.is_file());

        Ok(RestorePlan {
            suffix: suffix.to_string(),
            primary_backup,
            primary,
            mirror_backup,
            mirror,
        })
    }

    /// Copy the backups for `suffix` over the live files
    ///
    /// The primary backup is required. The mirror is restored only when its
    /// paired backup exists; otherwise the result says so.
    pub fn restore_from_backup(&self, suffix: &str) -> TaskManResult<RestoreResult> {
        let plan = self.plan(suffix)?;

        warn_on_pending_wal(&plan.primary);
        self.restore_file(&plan.primary_backup, &plan.primary)?;

        let mirror_restored = match &plan.mirror_backup {
            Some(backup) => {
                warn_on_pending_wal(&plan.mirror);
                self.restore_file(backup, &plan.mirror)?;
                true
            }
            None => {
                tracing::warn!(suffix, "no mirror backup for this suffix; mirror not restored");
                false
            }
        };

        Ok(RestoreResult {
            suffix: plan.suffix,
            primary: plan.primary,
            mirror_restored,
        })
    }

    fn restore_file(&self, backup: &Path, live: &Path) -> TaskManResult<()> {
        if self.debug {
            tracing::debug!(from = %backup.display(), to = %live.display(), "restoring");
        }
        copy_file_atomic(backup, live)
    }
}

/// Warn when a live database still has write-ahead data that SQLite would replay
fn warn_on_pending_wal(db: &Path) {
    let mut wal = db.as_os_str().to_owned();
    wal.push("-wal");
    let wal = PathBuf::from(wal);
    if fs::metadata(&wal).map(|m| m.len() > 0).unwrap_or(false) {
        tracing::warn!(
            wal = %wal.display(),
            "write-ahead log is not empty; close the editor before restoring"
        );
    }
}
