//! Archive manifest
//!
//! Two schema generations coexist:
//! - v1 describes a single task and has no `version` field
//! - v2 has `version: 2` and a `tasks` array of v1-shaped entries
//!
//! A v2 manifest is recognized only when `version >= 2` and `tasks` is
//! non-empty; anything else is read again as v1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Task;

/// Name of the manifest entry inside every archive
pub const MANIFEST_FILE: &str = "roo-task-manifest.json";

/// Current multi-task schema version
pub const MANIFEST_VERSION: u32 = 2;

/// Whether a zip entry name refers to the manifest, in any folder and any case
pub fn is_manifest_name(name: &str) -> bool {
    name.rsplit(['/', '\\'])
        .next()
        .is_some_and(|base| base.eq_ignore_ascii_case(MANIFEST_FILE))
}

/// Whether `id` can be used as a single directory name
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', ':', '\0'])
}

/// v1 manifest, also the shape of each v2 entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub plugin_id: String,
}

impl ManifestEntry {
    /// Describe a task
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            created_at: task.created_at,
            plugin_id: String::new(),
        }
    }

    /// Parse manifest bytes strictly as v1
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// v2 manifest listing several tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiManifest {
    pub version: u32,
    pub tasks: Vec<ManifestEntry>,
}

impl MultiManifest {
    /// Describe several tasks in the given order
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            version: MANIFEST_VERSION,
            tasks: tasks.iter().map(ManifestEntry::from_task).collect(),
        }
    }

    /// Whether this value satisfies the v2 recognition rule
    pub fn is_recognized(&self) -> bool {
        self.version >= MANIFEST_VERSION && !self.tasks.is_empty()
    }
}

/// A parsed manifest of either generation
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    Single(ManifestEntry),
    Multi(MultiManifest),
}

impl Manifest {
    /// Parse manifest bytes, preferring v2 and falling back to v1
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if let Ok(multi) = serde_json::from_slice::<MultiManifest>(bytes) {
            if multi.is_recognized() {
                return Ok(Self::Multi(multi));
            }
        }
        ManifestEntry::from_slice(bytes).map(Self::Single)
    }

    /// Entries in manifest order
    pub fn entries(&self) -> &[ManifestEntry] {
        match self {
            Self::Single(entry) => std::slice::from_ref(entry),
            Self::Multi(multi) => &multi.tasks,
        }
    }

    /// Task IDs in manifest order
    pub fn task_ids(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.id.clone()).collect()
    }
}
