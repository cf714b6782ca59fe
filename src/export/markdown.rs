//! Markdown dump of tasks and their prompts

use std::io::Write;

use chrono::Local;

use super::sanitize::{clean_one_line, escape_html};
use crate::error::{TaskManError, TaskManResult};
use crate::models::{HistoryRole, Task};
use crate::storage::load_history;

/// Longest title or prompt line before truncation
pub const MAX_LINE_CHARS: usize = 120;

fn write_details<W: Write>(writer: &mut W, summary: &str, full: &str) -> std::io::Result<()> {
    write!(
        writer,
        "\n<details><summary>{}</summary>\n\n\n```\n{}\n```\n\n</details>\n\n",
        escape_html(summary),
        full
    )
}

fn write_task<W: Write>(writer: &mut W, task: &Task) -> std::io::Result<()> {
    let full_title = task.title.trim();
    let title = clean_one_line(full_title, MAX_LINE_CHARS);
    let heading = if title.text.is_empty() {
        task.id.as_str()
    } else {
        title.text.as_str()
    };

    writeln!(writer, "# {}\n", heading)?;
    writeln!(writer, "- ID: {}", task.id)?;
    writeln!(
        writer,
        "- Created: {}",
        task.created_at.with_timezone(&Local).to_rfc3339()
    )?;
    writeln!(writer, "- Path: {}\n", task.path.display())?;

    if title.changed || title.truncated {
        write_details(writer, heading, full_title)?;
    }

    let history = load_history(task);
    let mut header_written = false;
    for item in history.iter().filter(|h| h.role == HistoryRole::User) {
        let full = item.text.trim();
        let line = clean_one_line(full, MAX_LINE_CHARS);
        if line.text.is_empty() {
            continue;
        }
        if !header_written {
            writeln!(writer, "## Prompts")?;
            header_written = true;
        }
        writeln!(writer, "- {}", line.text)?;
        if line.changed || line.truncated {
            write_details(writer, &line.text, full)?;
        }
    }
    Ok(())
}

/// Write every task as a markdown section
///
/// `progress` receives `(done, total)` after each task.
pub fn dump_markdown<W: Write>(
    tasks: &[Task],
    writer: &mut W,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
) -> TaskManResult<()> {
    let total = tasks.len();
    for (i, task) in tasks.iter().enumerate() {
        write_task(writer, task)
            .and_then(|_| {
                if i + 1 == total {
                    writeln!(writer)
                } else {
                    writeln!(writer, "---\n")
                }
            })
            .map_err(|e| TaskManError::Io(format!("Failed to write task {}: {}", task.id, e)))?;

        if let Some(cb) = progress.as_mut() {
            cb(i + 1, total);
        }
    }
    writer
        .flush()
        .map_err(|e| TaskManError::Io(format!("Failed to flush dump: {}", e)))
}
