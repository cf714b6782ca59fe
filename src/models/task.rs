//! Task model
//!
//! A task is one recorded Roo Code conversation, backed by a directory named
//! after its ID inside the extension's storage.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of recorded work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable identifier, also the directory name
    pub id: String,

    /// Display title (the summary, or the ID when there is none)
    pub title: String,

    /// First message of the conversation
    #[serde(default)]
    pub summary: String,

    /// Creation time, approximated from file modification times
    pub created_at: DateTime<Utc>,

    /// Directory holding the task files
    pub path: PathBuf,

    /// Open extension map, filled by decorators
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Task {
    /// Create a task with an empty summary and meta map
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, created_at: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            summary: String::new(),
            created_at,
            path: path.into(),
            meta: Map::new(),
        }
    }

    /// Builder-style title setter
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder-style summary setter
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}

/// Who produced a history item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Ai,
    Other,
}

/// One message of a task's conversation log
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub at: Option<DateTime<Utc>>,
    pub kind: String,
    pub text: String,
    pub role: HistoryRole,
}

/// Usage statistics derived from a task's own files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStats {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cache_reads: u64,
    pub cache_writes: u64,
    pub total_cost: f64,
    /// Total bytes of all files under the task directory
    pub size_bytes: u64,
    /// Mode of the last AI request, when recorded
    pub mode: Option<String>,
}
