//! User settings for roo-task-man
//!
//! Manages the extension identifier, editor channel and directory overrides,
//! loaded from a JSON file and merged with command-line overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::home_dir;
use crate::error::{TaskManError, TaskManResult};
use crate::storage::file_io::{read_json, write_json_atomic};

/// Extension identifier of Roo Code in the marketplace
pub const DEFAULT_PLUGIN_ID: &str = "RooVeterinaryInc.roo-cline";

/// User settings for roo-task-man
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Extension identifier, also the key of its row in `state.vscdb`
    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,

    /// Editor channel: Code | Insiders | VSCodium | Cursor | Windsurf | Trae | Custom | <AppDir>
    #[serde(default = "default_code_channel")]
    pub code_channel: String,

    /// Override of the task storage root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Directory containing decorator hook files
    #[serde(default = "default_hooks_dir")]
    pub hooks_dir: PathBuf,

    /// Default destination directory for exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// Verbose diagnostics for state database operations
    #[serde(default)]
    pub debug: bool,
}

fn default_plugin_id() -> String {
    DEFAULT_PLUGIN_ID.to_string()
}

fn default_code_channel() -> String {
    "Code".to_string()
}

fn default_hooks_dir() -> PathBuf {
    home_dir().join(".config").join("roo-code-man").join("hooks")
}

/// Default location of the settings file (`~/.config/roo-code-man.json`)
pub fn default_settings_file() -> PathBuf {
    home_dir().join(".config").join("roo-code-man.json")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plugin_id: default_plugin_id(),
            code_channel: default_code_channel(),
            data_dir: None,
            hooks_dir: default_hooks_dir(),
            export_dir: None,
            debug: false,
        }
    }
}

/// Command-line values layered on top of the settings file
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub plugin_id: Option<String>,
    pub code_channel: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub hooks_dir: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub debug: bool,
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_default(path: &Path) -> TaskManResult<Self> {
        let mut settings: Settings = read_json(path).map_err(|e| match e {
            TaskManError::Json(msg) => TaskManError::Config(msg),
            other => other,
        })?;

        // Blank strings in the file mean "use the default"
        if settings.plugin_id.trim().is_empty() {
            settings.plugin_id = default_plugin_id();
        }
        if settings.code_channel.trim().is_empty() {
            settings.code_channel = default_code_channel();
        }
        if settings.hooks_dir.as_os_str().is_empty() {
            settings.hooks_dir = default_hooks_dir();
        }
        if settings.data_dir.as_ref().is_some_and(|d| d.as_os_str().is_empty()) {
            settings.data_dir = None;
        }
        if settings.export_dir.as_ref().is_some_and(|d| d.as_os_str().is_empty()) {
            settings.export_dir = None;
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> TaskManResult<()> {
        write_json_atomic(path, self)
    }

    /// Merge command-line overrides; set values win
    pub fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if let Some(plugin_id) = overrides.plugin_id {
            self.plugin_id = plugin_id;
        }
        if let Some(channel) = overrides.code_channel {
            self.code_channel = channel;
        }
        if let Some(dir) = overrides.data_dir {
            self.data_dir = Some(dir);
        }
        if let Some(dir) = overrides.hooks_dir {
            self.hooks_dir = dir;
        }
        if let Some(dir) = overrides.export_dir {
            self.export_dir = Some(dir);
        }
        if overrides.debug {
            self.debug = true;
        }
    }

    /// Export destination directory, defaulting to the current directory
    pub fn export_dir_or_cwd(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.plugin_id, "RooVeterinaryInc.roo-cline");
        assert_eq!(settings.code_channel, "Code");
        assert!(!settings.debug);
        assert!(settings.data_dir.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_or_default(&temp_dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roo-code-man.json");

        let mut settings = Settings::default();
        settings.code_channel = "Cursor".into();
        settings.data_dir = Some(temp_dir.path().join("data"));
        settings.save(&path).unwrap();

        let loaded = Settings::load_or_default(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roo-code-man.json");
        std::fs::write(&path, r#"{"pluginId": "", "codeChannel": "", "dataDir": "", "debug": true}"#)
            .unwrap();

        let settings = Settings::load_or_default(&path).unwrap();
        assert_eq!(settings.plugin_id, DEFAULT_PLUGIN_ID);
        assert_eq!(settings.code_channel, "Code");
        assert!(settings.data_dir.is_none());
        assert!(settings.debug);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roo-code-man.json");
        std::fs::write(&path, "not json").unwrap();

        let err = Settings::load_or_default(&path).unwrap_err();
        assert!(matches!(err, TaskManError::Config(_)));
    }

    #[test]
    fn test_apply_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(SettingsOverrides {
            plugin_id: Some("me.fork".into()),
            code_channel: Some("insiders".into()),
            debug: true,
            ..SettingsOverrides::default()
        });

        assert_eq!(settings.plugin_id, "me.fork");
        assert_eq!(settings.code_channel, "insiders");
        assert!(settings.debug);
        assert!(settings.export_dir.is_none());
    }
}
