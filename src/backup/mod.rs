//! Backups of the editor's state files
//!
//! Provides point-in-time copies of `state.vscdb` and its mirror, taken
//! before every registration, and restore from them.
//!
//! # Architecture
//!
//! The backup system consists of two main components:
//!
//! - `BackupManager`: Names, creates and lists backups
//! - `RestoreManager`: Copies a chosen backup pair back over the live files
//!
//! # Backup Format
//!
//! A backup is a plain byte copy of the database file:
//! - `state.vscdb.bak-<suffix>` for the primary
//! - `state.vscdb.backup.bak-<suffix>` for the mirror
//!
//! Both files of one operation share the suffix (`YYYYMMDD-HHMMSS`, plus
//! `-N` if that second was already used).
//!
//! # Example
//!
//! ```rust,ignore
//! use roo_task_man::backup::{BackupManager, RestoreManager};
//!
//! let manager = BackupManager::from_paths(&paths)?;
//! if let Some(latest) = manager.get_latest_backup()? {
//!     let result = RestoreManager::new(manager).restore_from_backup(&latest.suffix)?;
//!     println!("{}", result.summary());
//! }
//! ```

mod manager;
mod restore;

pub use manager::{backup_file, backup_path, new_suffix, BackupInfo, BackupManager, SUFFIX_FORMAT};
pub use restore::{validate_suffix, RestoreManager, RestorePlan, RestoreResult};
