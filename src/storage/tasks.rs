//! Task repository
//!
//! Discovers task directories in the extension's storage and builds `Task`
//! records from them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::conversation::read_summary;
use crate::error::{TaskManError, TaskManResult};
use crate::hooks::{NoopDecorator, TaskDecorator};
use crate::models::Task;

/// Name of the folder the extension keeps task directories in
pub const TASKS_DIR: &str = "tasks";

/// Return likely task directories under `root`
///
/// `<root>/tasks` is searched first, then `<root>` itself. A directory counts
/// as a task when it contains at least one file somewhere below it.
pub fn discover_task_dirs(root: &Path) -> Vec<PathBuf> {
    for candidate in [root.join(TASKS_DIR), root.to_path_buf()] {
        let Ok(entries) = fs::read_dir(&candidate) else {
            continue;
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| contains_file(p))
            .collect();

        if !dirs.is_empty() {
            dirs.sort();
            return dirs;
        }
    }
    Vec::new()
}

fn contains_file(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| e.file_type().is_file())
}

/// Build tasks from directory paths, newest first
pub fn build_tasks(dirs: &[PathBuf]) -> Vec<Task> {
    let mut tasks: Vec<Task> = dirs
        .iter()
        .map(|dir| {
            let id = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let summary = read_summary(dir);
            let title = if summary.is_empty() {
                id.clone()
            } else {
                summary.clone()
            };
            Task::new(id, dir, dir_created_at(dir))
                .with_title(title)
                .with_summary(summary)
        })
        .collect();

    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    tasks
}

/// Earliest file modification time inside `path`, else the directory's own
fn dir_created_at(path: &Path) -> DateTime<Utc> {
    let earliest = WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .min();

    earliest
        .or_else(|| fs::metadata(path).ok()?.modified().ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or_default()
}

/// Loads tasks from one storage root
#[derive(Debug, Clone)]
pub struct TaskRepository {
    root: PathBuf,
}

impl TaskRepository {
    /// Create a repository over `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root this repository reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load all tasks with built-in discovery
    pub fn load(&self) -> TaskManResult<Vec<Task>> {
        self.load_with(&NoopDecorator)
    }

    /// Load all tasks, consulting `decorator` for overrides
    pub fn load_with(&self, decorator: &dyn TaskDecorator) -> TaskManResult<Vec<Task>> {
        let dirs = match decorator.discover(&self.root) {
            Some(dirs) if !dirs.is_empty() => {
                tracing::debug!(decorator = decorator.name(), count = dirs.len(), "discovery override");
                dirs
            }
            _ => discover_task_dirs(&self.root),
        };

        if dirs.is_empty() {
            tracing::debug!(root = %self.root.display(), "no task directories found");
        }

        let mut tasks = build_tasks(&dirs);
        for task in &mut tasks {
            if let Some(extended) = decorator.extend(task) {
                tracing::debug!(id = %task.id, "extend override applied");
                *task = extended;
            }
            if let Some(title) = decorator.decorate_row(task).filter(|t| !t.is_empty()) {
                task.title = title;
            }
        }
        Ok(tasks)
    }

    /// Find one task by ID
    pub fn find(&self, id: &str) -> TaskManResult<Task> {
        self.load()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskManError::task_not_found(id))
    }

    /// Remove the task directory recursively
    pub fn delete(&self, task: &Task) -> TaskManResult<()> {
        fs::remove_dir_all(&task.path).map_err(|e| {
            TaskManError::Io(format!("Failed to delete {}: {}", task.path.display(), e))
        })
    }
}
