//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod backup;
pub mod export;
pub mod import;
pub mod tasks;

pub use backup::{handle_backup_command, BackupCommands};
pub use export::{handle_dump_command, handle_export_command, ExportCommands};
pub use import::{handle_import_command, handle_inspect_command};
pub use tasks::{handle_config_command, handle_delete_command, handle_list_command, handle_show_command};
