//! Task display formatting
//!
//! Formats tasks and manifest entries for terminal output in table and
//! detail views.

use chrono::Local;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{ellipsize, format_size};
use crate::archive::ManifestEntry;
use crate::hooks::TaskDecorator;
use crate::models::{Task, TaskStats};

const TITLE_WIDTH: usize = 60;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Title")]
    title: String,
}

/// Format a list of tasks as a table
pub fn format_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id.clone(),
            created: t.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            title: ellipsize(&t.title.split_whitespace().collect::<Vec<_>>().join(" "), TITLE_WIDTH),
        })
        .collect();

    let mut output = Table::new(rows).with(Style::sharp()).to_string();
    output.push_str(&format!("\n\nTotal: {} task(s)", tasks.len()));
    output
}

/// Format the detail view of one task
///
/// The decorator may replace the whole view.
pub fn format_task_details(task: &Task, stats: &TaskStats, decorator: &dyn TaskDecorator) -> String {
    if let Some(custom) = decorator.render_detail(task).filter(|s| !s.is_empty()) {
        return custom;
    }

    let mut output = String::new();
    output.push_str(&format!("Task: {}\n", task.id));
    output.push_str(&format!("{}\n", "=".repeat(6 + task.id.len())));
    output.push_str(&format!("Title:    {}\n", task.title));
    output.push_str(&format!(
        "Created:  {}\n",
        task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("Path:     {}\n", task.path.display()));
    output.push_str(&format!("Size:     {}\n", format_size(stats.size_bytes)));
    output.push_str(&format!("Mode:     {}\n", stats.mode.as_deref().unwrap_or("-")));
    output.push_str(&format!(
        "Tokens:   {} in / {} out (cache {} read, {} written)\n",
        stats.tokens_in, stats.tokens_out, stats.cache_reads, stats.cache_writes
    ));
    output.push_str(&format!("Cost:     ${:.4}\n", stats.total_cost));

    if !task.meta.is_empty() {
        output.push_str("\nMetadata:\n");
        for (key, value) in &task.meta {
            output.push_str(&format!("  {}: {}\n", key, value));
        }
    }

    if !task.summary.is_empty() && task.summary != task.title {
        output.push_str(&format!("\n{}\n", task.summary));
    }

    output
}

#[derive(Tabled)]
struct ManifestRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Title")]
    title: String,
}

/// Format the entries of an archive manifest as a table
pub fn format_manifest_entries(entries: &[ManifestEntry]) -> String {
    if entries.is_empty() {
        return "Archive lists no tasks.".to_string();
    }

    let rows: Vec<ManifestRow> = entries
        .iter()
        .map(|e| ManifestRow {
            id: e.id.clone(),
            created: e.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            title: ellipsize(&e.title, TITLE_WIDTH),
        })
        .collect();

    Table::new(rows).with(Style::sharp()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopDecorator;
    use chrono::Utc;

    struct Custom;

    impl TaskDecorator for Custom {
        fn render_detail(&self, task: &Task) -> Option<String> {
            Some(format!("custom {}", task.id))
        }
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(format_task_list(&[]), "No tasks found.");
    }

    #[test]
    fn test_list_contains_rows() {
        let tasks = vec![
            Task::new("t1", "/tmp/t1", Utc::now()).with_title("First\ntask"),
            Task::new("t2", "/tmp/t2", Utc::now()).with_title("Second"),
        ];
        let output = format_task_list(&tasks);
        assert!(output.contains("t1"));
        assert!(output.contains("First task"));
        assert!(output.contains("Total: 2 task(s)"));
    }

    #[test]
    fn test_details_respect_decorator() {
        let task = Task::new("t1", "/tmp/t1", Utc::now()).with_title("Hello");
        let stats = TaskStats {
            size_bytes: 2048,
            mode: Some("architect".into()),
            ..TaskStats::default()
        };

        let plain = format_task_details(&task, &stats, &NoopDecorator);
        assert!(plain.contains("Title:    Hello"));
        assert!(plain.contains("2.00 KB"));
        assert!(plain.contains("architect"));

        assert_eq!(format_task_details(&task, &stats, &Custom), "custom t1");
    }
}
