//! CLI commands for task export
//!
//! Packs one or more tasks into a zip archive, or writes a markdown dump of
//! their prompts.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};

use crate::archive::{export_multi, export_single};
use crate::config::{EditorPaths, Settings};
use crate::error::{TaskManError, TaskManResult};
use crate::export::dump_markdown;
use crate::hooks::load_decorator;
use crate::models::Task;
use crate::services::{default_export_name, parse_date_range, parse_id_list, TaskSelection};
use crate::storage::TaskRepository;

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export one task to a single-task archive
    Task {
        /// Task ID
        id: String,

        /// Output zip path (default: generated name in the export directory)
        output: Option<PathBuf>,
    },

    /// Export several tasks to one multi-task archive
    Many {
        /// Comma separated task IDs
        #[arg(long)]
        ids: Option<String>,

        /// Creation date range, FROM..TO (YYYY-MM-DD or YYYYMMDD)
        #[arg(long)]
        date_range: Option<String>,

        /// Output zip path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle export commands
pub fn handle_export_command(
    paths: &EditorPaths,
    settings: &Settings,
    cmd: ExportCommands,
) -> TaskManResult<()> {
    let repo = TaskRepository::new(paths.storage_root()?);

    match cmd {
        ExportCommands::Task { id, output } => {
            let task = repo.find(&id)?;
            let dest = output.unwrap_or_else(|| {
                settings
                    .export_dir_or_cwd()
                    .join(default_export_name(paths.editor_name(), paths.plugin_id(), &[id.clone()]))
            });

            export_single(&task, &dest)?;
            println!("Exported task {} to {}", task.id, dest.display());
        }

        ExportCommands::Many {
            ids,
            date_range,
            output,
        } => {
            let selection = build_selection(ids.as_deref(), date_range.as_deref())?;
            if selection.is_empty() {
                return Err(TaskManError::Validation(
                    "Select tasks with --ids and/or --date-range".into(),
                ));
            }

            let dest = match output {
                Some(path) => path,
                None if selection.ids.is_empty() => {
                    return Err(TaskManError::Validation(
                        "--output is required when selecting by --date-range only".into(),
                    ));
                }
                None => settings.export_dir_or_cwd().join(default_export_name(
                    paths.editor_name(),
                    paths.plugin_id(),
                    &selection.ids,
                )),
            };

            let decorator = load_decorator(&settings.hooks_dir);
            let tasks = selection.select(&repo.load_with(decorator.as_ref())?);
            if tasks.is_empty() {
                return Err(TaskManError::Validation("No tasks matched filters".into()));
            }

            let bar = progress_bar(0, "files");
            let mut on_progress = |done: usize, total: usize| {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            };
            let result = export_multi(&tasks, &dest, Some(&mut on_progress));
            bar.finish_and_clear();
            result?;

            println!("Exported {} task(s) to {}", tasks.len(), dest.display());
        }
    }

    Ok(())
}

/// Handle `dump`: write selected tasks (all when no filter is given) as markdown
pub fn handle_dump_command(
    paths: &EditorPaths,
    settings: &Settings,
    file: &Path,
    ids: Option<&str>,
    date_range: Option<&str>,
) -> TaskManResult<()> {
    let repo = TaskRepository::new(paths.storage_root()?);
    let decorator = load_decorator(&settings.hooks_dir);
    let all = repo.load_with(decorator.as_ref())?;

    let selection = build_selection(ids, date_range)?;
    let tasks: Vec<Task> = if selection.is_empty() {
        all
    } else {
        selection.select(&all)
    };

    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(file)?);

    let bar = progress_bar(tasks.len() as u64, "tasks");
    let mut on_progress = |done: usize, _total: usize| bar.set_position(done as u64);
    let result = dump_markdown(&tasks, &mut writer, Some(&mut on_progress));
    bar.finish_and_clear();
    result?;

    println!("Wrote {} task(s) to {}", tasks.len(), file.display());
    Ok(())
}

fn build_selection(ids: Option<&str>, date_range: Option<&str>) -> TaskManResult<TaskSelection> {
    Ok(TaskSelection {
        ids: ids.map(parse_id_list).unwrap_or_default(),
        date_range: date_range.map(parse_date_range).transpose()?,
    })
}

fn progress_bar(len: u64, unit: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(&format!("{{bar:40}} {{pos}}/{{len}} {}", unit))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar
}
