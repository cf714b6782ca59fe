//! Configuration module for roo-task-man
//!
//! This module provides configuration management including:
//! - Editor state database and task storage path resolution
//! - User settings persistence and command-line overrides

pub mod paths;
pub mod settings;

pub use paths::EditorPaths;
pub use settings::{Settings, SettingsOverrides};
