//! The JSON document stored under the plugin's key
//!
//! Only `taskHistory` is interpreted. Every other top-level field is kept as
//! raw JSON text in its original position, and existing history entries are
//! never re-serialized, so a rewrite never loses or reorders anything.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::{to_raw_value, RawValue};

use crate::models::{Task, TaskStats};

/// Key of the history array inside the document
pub const TASK_HISTORY_KEY: &str = "taskHistory";

/// Mode recorded when a task has no AI request with a mode
pub const DEFAULT_MODE: &str = "code";

/// One registration entry in `taskHistory`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub number: u32,
    pub ts: i64,
    pub task: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub total_cost: f64,
    pub cache_writes: u64,
    pub cache_reads: u64,
    pub size: u64,
    pub workspace: String,
    pub mode: String,
}

impl HistoryEntry {
    /// Build the entry for `task` from its derived statistics
    pub fn new(task: &Task, stats: &TaskStats, workspace: &str) -> Self {
        Self {
            id: task.id.clone(),
            number: 1,
            ts: task.created_at.timestamp_millis(),
            task: task.summary.clone(),
            tokens_in: stats.tokens_in,
            tokens_out: stats.tokens_out,
            total_cost: stats.total_cost,
            cache_writes: stats.cache_writes,
            cache_reads: stats.cache_reads,
            size: stats.size_bytes,
            workspace: workspace.to_string(),
            mode: stats.mode.clone().unwrap_or_else(|| DEFAULT_MODE.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct IdProbe {
    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// Ordered top-level fields with untouched values
#[derive(Debug, Clone)]
pub struct StateDocument {
    fields: Vec<(String, Box<RawValue>)>,
}

impl StateDocument {
    /// `{"taskHistory":[]}`
    pub fn empty() -> Self {
        let history = RawValue::from_string("[]".to_string())
            .map(|raw| (TASK_HISTORY_KEY.to_string(), raw));
        Self {
            fields: history.into_iter().collect(),
        }
    }

    /// Parse a stored value; it must be a JSON object
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Serialize back to compact JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn history_raw(&self) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == TASK_HISTORY_KEY)
            .map(|(_, v)| v.as_ref())
    }

    /// Existing history entries as raw JSON
    ///
    /// A missing or `null` history counts as empty. Any other non-array value
    /// is an error so that it is never silently replaced.
    pub fn history(&self) -> serde_json::Result<Vec<Box<RawValue>>> {
        match self.history_raw() {
            None => Ok(Vec::new()),
            Some(raw) if raw.get().trim() == "null" => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw.get()),
        }
    }

    /// IDs of history entries that carry one, in order
    pub fn history_ids(&self) -> serde_json::Result<Vec<String>> {
        Ok(self
            .history()?
            .iter()
            .filter_map(|raw| serde_json::from_str::<IdProbe>(raw.get()).ok()?.id)
            .filter_map(|id| match id {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect())
    }

    /// Append entries after the existing ones, returning the new length
    pub fn append_history(&mut self, entries: &[HistoryEntry]) -> serde_json::Result<usize> {
        let mut history = self.history()?;
        for entry in entries {
            history.push(to_raw_value(entry)?);
        }
        let len = history.len();
        let raw = to_raw_value(&history)?;

        match self.fields.iter_mut().find(|(k, _)| k == TASK_HISTORY_KEY) {
            Some((_, value)) => *value = raw,
            None => self.fields.push((TASK_HISTORY_KEY.to_string(), raw)),
        }
        Ok(len)
    }
}

impl Serialize for StateDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StateDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = StateDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut fields: Vec<(String, Box<RawValue>)> = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, Box<RawValue>>()? {
                    if fields.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate key `{}`", key)));
                    }
                    fields.push((key, value));
                }
                Ok(StateDocument { fields })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}
