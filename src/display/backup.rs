//! State backup display formatting

use chrono::Local;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::format_size;
use crate::backup::{BackupInfo, RestorePlan};

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "Suffix")]
    suffix: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Mirror")]
    mirror: &'static str,
}

/// Format backups as a table, newest first as given
pub fn format_backup_list(backups: &[BackupInfo]) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let rows: Vec<BackupRow> = backups
        .iter()
        .map(|b| BackupRow {
            suffix: b.suffix.clone(),
            modified: b.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            size: format_size(b.size_bytes),
            mirror: if b.has_mirror { "yes" } else { "no" },
        })
        .collect();

    let mut output = Table::new(rows).with(Style::sharp()).to_string();
    output.push_str(&format!("\n\nTotal: {} backup(s)", backups.len()));
    output
}

/// Describe what a restore would overwrite
pub fn format_restore_plan(plan: &RestorePlan) -> String {
    let mut output = String::new();
    output.push_str("Restore Plan\n");
    output.push_str("============\n");
    output.push_str(&format!(
        "Primary: {} -> {}\n",
        plan.primary_backup.display(),
        plan.primary.display()
    ));
    match &plan.mirror_backup {
        Some(backup) => output.push_str(&format!(
            "Mirror:  {} -> {}\n",
            backup.display(),
            plan.mirror.display()
        )),
        None => output.push_str("Mirror:  no backup for this suffix, mirror left unchanged\n"),
    }
    output
}
