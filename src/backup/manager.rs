//! Backup manager for the editor's state files
//!
//! A backup is a byte copy named `<original>.bak-<suffix>` next to the
//! original. The suffix is a local `YYYYMMDD-HHMMSS` timestamp shared by the
//! primary and mirror backups of one operation; it is the only link between
//! the two. The directory listing is the only index.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::config::paths::{EditorPaths, STATE_DB_FILE, STATE_DB_MIRROR_FILE};
use crate::error::{TaskManError, TaskManResult};

/// Separator between the original file name and the suffix
pub const BACKUP_MARKER: &str = ".bak-";

/// chrono format of generated suffixes
pub const SUFFIX_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `<file>.bak-<suffix>`
pub fn backup_path(file: &Path, suffix: &str) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file.with_file_name(format!("{}{}{}", name, BACKUP_MARKER, suffix))
}

/// A fresh suffix for which none of `files` has a backup yet
///
/// Two operations within the same second get `-1`, `-2`, ... appended.
pub fn new_suffix(files: &[&Path]) -> String {
    let base = Local::now().format(SUFFIX_FORMAT).to_string();
    let taken = |suffix: &str| files.iter().any(|f| backup_path(f, suffix).exists());

    let mut suffix = base.clone();
    let mut n = 1;
    while taken(&suffix) {
        suffix = format!("{}-{}", base, n);
        n += 1;
    }
    suffix
}

/// Copy `file` to `<file>.bak-<suffix>`, never replacing an existing backup
pub fn backup_file(file: &Path, suffix: &str) -> TaskManResult<PathBuf> {
    let target = backup_path(file, suffix);

    let mut source = File::open(file).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            TaskManError::PathNotFound {
                what: "State database",
                path: file.to_path_buf(),
            }
        } else {
            TaskManError::Io(format!("Failed to open {}: {}", file.display(), e))
        }
    })?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut out = options
        .open(&target)
        .map_err(|e| TaskManError::Io(format!("Failed to create {}: {}", target.display(), e)))?;

    let copied = io::copy(&mut source, &mut out).and_then(|_| out.sync_all());
    if let Err(e) = copied {
        drop(out);
        let _ = fs::remove_file(&target);
        return Err(TaskManError::Io(format!(
            "Failed to write {}: {}",
            target.display(),
            e
        )));
    }

    Ok(target)
}

/// Metadata about one primary backup
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// Suffix after `.bak-`
    pub suffix: String,
    /// Last modification time of the backup file
    pub modified: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
    /// Whether the paired mirror backup exists
    pub has_mirror: bool,
}

/// Lists and locates backups in the editor's state directory
#[derive(Debug, Clone)]
pub struct BackupManager {
    state_dir: PathBuf,
}

impl BackupManager {
    /// Create a manager for `state_dir`
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Create a manager for the resolved editor paths
    pub fn from_paths(paths: &EditorPaths) -> TaskManResult<Self> {
        Ok(Self::new(paths.state_dir()?))
    }

    /// Directory scanned for backups
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Live primary state file
    pub fn primary(&self) -> PathBuf {
        self.state_dir.join(STATE_DB_FILE)
    }

    /// Live mirror state file
    pub fn mirror(&self) -> PathBuf {
        self.state_dir.join(STATE_DB_MIRROR_FILE)
    }

    /// List primary backups, most recently modified first
    ///
    /// A missing state directory is an error; an empty one is not.
    pub fn list_backups(&self) -> TaskManResult<Vec<BackupInfo>> {
        if !self.state_dir.is_dir() {
            return Err(TaskManError::PathNotFound {
                what: "State directory",
                path: self.state_dir.clone(),
            });
        }

        let prefix = format!("{}{}", STATE_DB_FILE, BACKUP_MARKER);
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.state_dir).map_err(|e| {
            TaskManError::Io(format!("Failed to read {}: {}", self.state_dir.display(), e))
        })? {
            let entry = entry
                .map_err(|e| TaskManError::Io(format!("Failed to read directory entry: {}", e)))?;

            let filename = entry.file_name().to_string_lossy().into_owned();
            let Some(suffix) = filename.strip_prefix(&prefix).filter(|s| !s.is_empty()) else {
                continue;
            };
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            backups.push(BackupInfo {
                suffix: suffix.to_string(),
                path: entry.path(),
                modified: metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_default(),
                size_bytes: metadata.len(),
                has_mirror: backup_path(&self.mirror(), suffix).is_file(),
                filename,
            });
        }

        // Newest first; suffix breaks ties within the same mtime
        backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.suffix.cmp(&a.suffix)));

        Ok(backups)
    }

    /// Get a specific backup by suffix
    pub fn get_backup(&self, suffix: &str) -> TaskManResult<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().find(|b| b.suffix == suffix))
    }

    /// Get the most recent backup
    pub fn get_latest_backup(&self) -> TaskManResult<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn create_test_manager() -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(STATE_DB_FILE), b"primary").unwrap();
        (BackupManager::new(temp_dir.path()), temp_dir)
    }

    fn set_mtime(path: &Path, secs_ago: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
            .unwrap();
    }

    #[test]
    fn test_backup_path() {
        let path = backup_path(Path::new("/s/state.vscdb.backup"), "20240101-120000");
        assert_eq!(path, PathBuf::from("/s/state.vscdb.backup.bak-20240101-120000"));
    }

    #[test]
    fn test_backup_file_copies_bytes() {
        let (manager, _temp) = create_test_manager();

        let target = backup_file(&manager.primary(), "20240101-120000").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"primary");
        assert!(target.ends_with("state.vscdb.bak-20240101-120000"));
    }

    #[test]
    fn test_backup_never_overwrites() {
        let (manager, _temp) = create_test_manager();
        let existing = backup_path(&manager.primary(), "s1");
        fs::write(&existing, b"older").unwrap();

        assert!(backup_file(&manager.primary(), "s1").is_err());
        assert_eq!(fs::read(&existing).unwrap(), b"older");
    }

    #[test]
    fn test_backup_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = backup_file(&temp.path().join(STATE_DB_FILE), "s").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_new_suffix_skips_taken() {
        let (manager, _temp) = create_test_manager();
        let primary = manager.primary();
        let mirror = manager.mirror();

        let first = new_suffix(&[primary.as_path(), mirror.as_path()]);
        assert_eq!(first.len(), 15);
        backup_file(&primary, &first).unwrap();

        let second = new_suffix(&[primary.as_path(), mirror.as_path()]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_list_backups_sorted_newest_first() {
        let (manager, temp) = create_test_manager();
        let dir = temp.path();
        fs::write(dir.join("state.vscdb.bak-20240101-000000"), b"old").unwrap();
        fs::write(dir.join("state.vscdb.bak-20240301-000000"), b"newer").unwrap();
        fs::write(dir.join("state.vscdb.backup.bak-20240301-000000"), b"m").unwrap();
        fs::write(dir.join("state.vscdb.bak-"), b"no suffix").unwrap();
        fs::write(dir.join("unrelated.txt"), b"x").unwrap();
        fs::create_dir(dir.join("state.vscdb.bak-dir")).unwrap();
        set_mtime(&dir.join("state.vscdb.bak-20240101-000000"), 3600);
        set_mtime(&dir.join("state.vscdb.bak-20240301-000000"), 60);

        let backups = manager.list_backups().unwrap();
        let suffixes: Vec<_> = backups.iter().map(|b| b.suffix.as_str()).collect();
        assert_eq!(suffixes, vec!["20240301-000000", "20240101-000000"]);
        assert!(backups[0].has_mirror);
        assert!(!backups[1].has_mirror);
        assert_eq!(backups[0].size_bytes, 5);

        let latest = manager.get_latest_backup().unwrap().unwrap();
        assert_eq!(latest.suffix, "20240301-000000");
        assert!(manager.get_backup("20240101-000000").unwrap().is_some());
        assert!(manager.get_backup("nope").unwrap().is_none());
    }

    #[test]
    fn test_empty_state_dir() {
        let (manager, _temp) = create_test_manager();
        assert!(manager.list_backups().unwrap().is_empty());
        assert!(manager.get_latest_backup().unwrap().is_none());
    }

    #[test]
    fn test_missing_state_dir() {
        let manager = BackupManager::new("/definitely/not/a/state/dir");
        let err = manager.list_backups().unwrap_err();
        assert!(err.is_not_found());
    }
}
