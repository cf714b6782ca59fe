//! roo-task-man - export, import and register Roo Code tasks
//!
//! This library packages the task folders of the Roo Code editor extension
//! into zip archives, extracts them on another machine, and records the
//! imported tasks in the editor's own state database so the extension lists
//! them.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Settings file and editor path resolution
//! - `error`: Custom error types
//! - `models`: Task records and derived statistics
//! - `storage`: Task discovery and atomic file helpers
//! - `hooks`: Optional task decorators
//! - `archive`: Zip archive codec with versioned manifests
//! - `state`: Read-modify-write of the editor's `state.vscdb`
//! - `backup`: Listing and restoring state database backups
//! - `services`: Task selection and the import-then-register flow
//! - `export`: Markdown dump of task prompts
//! - `display`: Terminal tables and detail views
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use roo_task_man::config::{EditorPaths, Settings};
//! use roo_task_man::state::StateSynchronizer;
//!
//! let settings = Settings::load_or_default(&config_file)?;
//! let paths = EditorPaths::from_settings(&settings)?;
//! let sync = StateSynchronizer::from_paths(&paths)?;
//! let report = sync.register_imported_tasks("/home/me/project", &tasks)?;
//! ```

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod hooks;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use error::{TaskManError, TaskManResult};
