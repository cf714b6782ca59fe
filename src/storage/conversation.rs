//! Conversation log parsing
//!
//! Reads `ui_messages.json` inside a task directory. The log is treated as an
//! opaque payload except for the few fields needed for display metadata and
//! usage statistics.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::models::{HistoryItem, HistoryRole, Task, TaskStats};

/// Conversation log file inside each task directory
pub const UI_MESSAGES_FILE: &str = "ui_messages.json";

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    ts: i64,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    say: String,
    #[serde(default)]
    text: String,
    /// Present (even empty) on user messages only
    #[serde(default)]
    images: Option<serde_json::Value>,
}

impl RawMessage {
    fn is_user(&self) -> bool {
        self.images.is_some()
    }

    fn at(&self) -> Option<DateTime<Utc>> {
        if self.ts > 0 {
            Utc.timestamp_millis_opt(self.ts).single()
        } else {
            None
        }
    }
}

/// Usage payload the extension embeds as JSON text in AI request messages
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiRequest {
    #[serde(default)]
    api_protocol: String,
    #[serde(default, alias = "cost")]
    costs: f64,
    #[serde(default)]
    request: String,
    #[serde(default)]
    mode: String,
    #[serde(default, alias = "tokensIn")]
    token_in: u64,
    #[serde(default, alias = "tokensOut")]
    token_out: u64,
    #[serde(default)]
    cache_reads: u64,
    #[serde(default)]
    cache_writes: u64,
}

impl AiRequest {
    fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    fn has_usage(&self) -> bool {
        self.token_in > 0 || self.token_out > 0 || self.costs > 0.0
    }
}

fn read_messages(dir: &Path) -> Option<Vec<RawMessage>> {
    let bytes = fs::read(dir.join(UI_MESSAGES_FILE)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Text of the first message, or empty when the log is missing or unreadable
pub fn read_summary(dir: &Path) -> String {
    read_messages(dir)
        .and_then(|messages| messages.into_iter().next())
        .map(|m| m.text)
        .unwrap_or_default()
}

/// Parse the conversation log into history items
pub fn load_history(task: &Task) -> Vec<HistoryItem> {
    let Some(messages) = read_messages(&task.path) else {
        return Vec::new();
    };

    messages
        .into_iter()
        .map(|m| {
            let at = m.at();
            if m.is_user() {
                return HistoryItem {
                    at,
                    kind: "User".to_string(),
                    text: m.text,
                    role: HistoryRole::User,
                };
            }

            match AiRequest::parse(&m.text).filter(|ai| !ai.request.is_empty()) {
                Some(ai) => HistoryItem {
                    at,
                    kind: "AI Request".to_string(),
                    text: format_ai_request(&ai),
                    role: HistoryRole::Ai,
                },
                None => HistoryItem {
                    at,
                    kind: if m.say.is_empty() { m.kind } else { m.say },
                    text: m.text,
                    role: HistoryRole::Other,
                },
            }
        })
        .collect()
}

fn format_ai_request(ai: &AiRequest) -> String {
    let mut out = String::new();
    out.push_str(&ai.request);
    out.push_str("\n\n**Stats**\n");
    let _ = writeln!(out, "- Protocol: {}", ai.api_protocol);
    let _ = writeln!(out, "- Cost: ${:.4}", ai.costs);
    let _ = writeln!(out, "- Tokens: in {} / out {}", ai.token_in, ai.token_out);
    let _ = writeln!(out, "- Mode: {}", ai.mode);
    let _ = writeln!(out, "- Cache: reads {} / writes {}", ai.cache_reads, ai.cache_writes);
    out
}

/// Derive usage statistics from the task's own files
///
/// Size is always computed. Token, cache, cost and mode values come from the
/// last AI request that recorded usage; they stay zero when there is none.
pub fn task_stats(task: &Task) -> TaskStats {
    let mut stats = TaskStats {
        size_bytes: dir_size(&task.path),
        ..TaskStats::default()
    };

    let Some(messages) = read_messages(&task.path) else {
        return stats;
    };

    let last = messages
        .iter()
        .rev()
        .filter(|m| !m.is_user())
        .filter_map(|m| AiRequest::parse(&m.text))
        .find(AiRequest::has_usage);

    if let Some(ai) = last {
        stats.tokens_in = ai.token_in;
        stats.tokens_out = ai.token_out;
        stats.cache_reads = ai.cache_reads;
        stats.cache_writes = ai.cache_writes;
        stats.total_cost = ai.costs;
        if !ai.mode.is_empty() {
            stats.mode = Some(ai.mode);
        }
    }

    stats
}

/// Sum of the sizes of all files under `root`; unreadable entries are skipped
pub fn dir_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
