//! Optional task decorators
//!
//! A decorator may override task discovery or adjust how tasks are shown.
//! Every capability is optional: returning `None` means "no override" and the
//! built-in behavior is used unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use roo_task_man::hooks::{load_decorator, TaskDecorator};
//! use roo_task_man::storage::TaskRepository;
//!
//! let decorator = load_decorator(&settings.hooks_dir);
//! let tasks = TaskRepository::new(root).load_with(decorator.as_ref())?;
//! ```

use std::path::{Path, PathBuf};

use crate::models::Task;

/// Capabilities a decorator can provide
pub trait TaskDecorator {
    /// Short name used in log messages
    fn name(&self) -> &str {
        "noop"
    }

    /// Replace built-in discovery with an explicit list of task directories
    fn discover(&self, _root: &Path) -> Option<Vec<PathBuf>> {
        None
    }

    /// Return an augmented copy of the task
    fn extend(&self, _task: &Task) -> Option<Task> {
        None
    }

    /// Override the one-line title shown in lists
    fn decorate_row(&self, _task: &Task) -> Option<String> {
        None
    }

    /// Override the detail view of a task
    fn render_detail(&self, _task: &Task) -> Option<String> {
        None
    }
}

/// Decorator that never overrides anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDecorator;

impl TaskDecorator for NoopDecorator {}

/// Load the decorator configured for `hooks_dir`
///
/// This build has no script runtime, so hook files are detected and reported
/// but the returned decorator is always a no-op.
pub fn load_decorator(hooks_dir: &Path) -> Box<dyn TaskDecorator> {
    let scripts = std::fs::read_dir(hooks_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "js"))
                .count()
        })
        .unwrap_or(0);

    if scripts > 0 {
        tracing::debug!(
            dir = %hooks_dir.display(),
            scripts,
            "hook scripts found but no script runtime is available; using built-in behavior"
        );
    }

    Box::new(NoopDecorator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_noop_has_no_overrides() {
        let decorator = NoopDecorator;
        let task = Task::new("t1", "/tmp/t1", Utc::now());

        assert!(decorator.discover(Path::new("/tmp")).is_none());
        assert!(decorator.extend(&task).is_none());
        assert!(decorator.decorate_row(&task).is_none());
        assert!(decorator.render_detail(&task).is_none());
    }

    #[test]
    fn test_load_decorator_with_scripts_degrades_to_noop() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("index.js"), "module.exports = {}").unwrap();

        let decorator = load_decorator(temp.path());
        assert_eq!(decorator.name(), "noop");
    }

    #[test]
    fn test_load_decorator_missing_dir() {
        let decorator = load_decorator(Path::new("/definitely/not/here"));
        assert_eq!(decorator.name(), "noop");
    }
}
