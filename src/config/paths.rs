//! Path management for roo-task-man
//!
//! Resolves where the editor keeps its global state database and where the
//! Roo Code extension stores task directories.
//!
//! ## Path Resolution Order
//!
//! 1. `dataDir` setting (explicit override of the task storage root)
//! 2. Application data base per platform:
//!    - macOS: `~/Library/Application Support`
//!    - Linux: `$XDG_CONFIG_HOME` or `~/.config`
//!    - Windows: `%APPDATA%`
//! 3. `<base>/<Editor>/User/globalStorage` holds `state.vscdb` and the
//!    extension folder `<pluginId>/`.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use super::settings::Settings;
use crate::error::{TaskManError, TaskManResult};

/// Primary state database file name
pub const STATE_DB_FILE: &str = "state.vscdb";

/// Mirror copy the editor keeps next to the primary
pub const STATE_DB_MIRROR_FILE: &str = "state.vscdb.backup";

/// Normalize an editor channel to its application data folder name.
///
/// Returns `None` for the `custom` channel, which has no well-known folder.
/// Unknown names are assumed to already be the exact folder name.
pub fn editor_dir_name(channel: &str) -> Option<String> {
    let trimmed = channel.trim();
    if trimmed.is_empty() {
        return Some("Code".to_string());
    }

    let normalized = trimmed.to_lowercase().replace(['_', ' '], "-");
    let name = match normalized.as_str() {
        "code" | "stable" => "Code",
        "insiders" | "code-insiders" | "code---insiders" => "Code - Insiders",
        "vscodium" | "codium" => "VSCodium",
        "cursor" => "Cursor",
        "windsurf" => "Windsurf",
        "trae" => "Trae",
        "custom" => return None,
        _ => trimmed,
    };
    Some(name.to_string())
}

/// Friendly editor name used for display and default export names
pub fn display_editor_name(channel: &str) -> String {
    match editor_dir_name(channel) {
        Some(name) => name,
        None => channel.trim().to_string(),
    }
}

/// Manages all editor-side paths used by roo-task-man
#[derive(Debug, Clone)]
pub struct EditorPaths {
    /// `<base>/<Editor>/User/globalStorage`, absent for the custom channel
    state_dir: Option<PathBuf>,
    /// Explicit task storage root
    data_dir: Option<PathBuf>,
    /// Extension identifier, also the storage folder name
    plugin_id: String,
    /// Display name of the editor
    editor_name: String,
}

impl EditorPaths {
    /// Resolve paths from settings using the platform application data dir
    ///
    /// # Errors
    ///
    /// Returns an error if the platform directories cannot be determined.
    pub fn from_settings(settings: &Settings) -> TaskManResult<Self> {
        let base = BaseDirs::new()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| {
                TaskManError::Config("Could not determine application data directory".into())
            })?;
        Ok(Self::with_app_data_dir(base, settings))
    }

    /// Resolve paths against a custom application data base (useful for testing)
    pub fn with_app_data_dir(base: PathBuf, settings: &Settings) -> Self {
        let state_dir = editor_dir_name(&settings.code_channel)
            .map(|editor| base.join(editor).join("User").join("globalStorage"));

        Self {
            state_dir,
            data_dir: settings.data_dir.clone(),
            plugin_id: settings.plugin_id.clone(),
            editor_name: display_editor_name(&settings.code_channel),
        }
    }

    /// Directory expected to contain `state.vscdb`, whether or not it exists
    pub fn state_dir(&self) -> TaskManResult<&Path> {
        self.state_dir.as_deref().ok_or_else(|| {
            TaskManError::Config(
                "The custom editor channel has no known state database location".into(),
            )
        })
    }

    /// Path to the primary state database
    pub fn state_db(&self) -> TaskManResult<PathBuf> {
        Ok(self.state_dir()?.join(STATE_DB_FILE))
    }

    /// Path to the mirror state database
    pub fn state_db_mirror(&self) -> TaskManResult<PathBuf> {
        Ok(self.state_dir()?.join(STATE_DB_MIRROR_FILE))
    }

    /// Root directory holding the extension's task folders
    pub fn storage_root(&self) -> TaskManResult<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        match &self.state_dir {
            Some(dir) => Ok(dir.join(&self.plugin_id)),
            None => Err(TaskManError::Config(
                "The custom editor channel requires a dataDir override".into(),
            )),
        }
    }

    /// Extension identifier
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Display name of the configured editor
    pub fn editor_name(&self) -> &str {
        &self.editor_name
    }
}

/// The user's home directory, falling back to the current directory
pub fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
