//! Backup CLI commands
//!
//! Lists and restores the `.bak-<suffix>` copies of the editor state
//! database taken before each registration.

use clap::Subcommand;

use crate::backup::{BackupManager, RestoreManager};
use crate::config::{EditorPaths, Settings};
use crate::display::{format_backup_list, format_restore_plan};
use crate::error::{TaskManError, TaskManResult};

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// List all available state backups
    List,

    /// Restore the state database from a backup
    Restore {
        /// Backup suffix (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &EditorPaths,
    settings: &Settings,
    cmd: BackupCommands,
) -> TaskManResult<()> {
    let manager = BackupManager::from_paths(paths)?;

    match cmd {
        BackupCommands::List => {
            let backups = manager.list_backups()?;
            println!("{}", format_backup_list(&backups));
        }

        BackupCommands::Restore { backup, force } => {
            let suffix = resolve_suffix(&manager, &backup)?;
            let restore_manager = RestoreManager::new(manager).with_debug(settings.debug);
            let plan = restore_manager.plan(&suffix)?;

            println!("{}", format_restore_plan(&plan));

            if !force {
                println!("WARNING: This will overwrite the editor's current state!");
                println!("Close the editor first, then run again with --force:");
                println!("  roo-task-man backup restore {} --force", suffix);
                return Ok(());
            }

            let result = restore_manager.restore_from_backup(&suffix)?;
            println!("{}", result.summary());
        }
    }

    Ok(())
}

/// Resolve `latest` to the newest suffix; anything else is taken as given
fn resolve_suffix(manager: &BackupManager, backup: &str) -> TaskManResult<String> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .get_latest_backup()?
            .map(|b| b.suffix)
            .ok_or_else(|| TaskManError::backup_not_found("latest"));
    }
    Ok(backup.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::STATE_DB_FILE;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_latest() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path());
        assert!(resolve_suffix(&manager, "latest").unwrap_err().is_not_found());

        fs::write(temp.path().join(format!("{}.bak-20250101-000000", STATE_DB_FILE)), b"x").unwrap();
        assert_eq!(resolve_suffix(&manager, "LATEST").unwrap(), "20250101-000000");
        assert_eq!(resolve_suffix(&manager, "abc").unwrap(), "abc");
    }
}
