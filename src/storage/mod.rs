//! Storage layer for roo-task-man
//!
//! Reads task directories from the extension's storage and provides atomic
//! file helpers shared by the archive, state and backup modules.

pub mod conversation;
pub mod file_io;
pub mod tasks;

pub use conversation::{load_history, task_stats};
pub use file_io::{copy_file_atomic, read_json, write_atomic_with, write_json_atomic};
pub use tasks::{build_tasks, discover_task_dirs, TaskRepository, TASKS_DIR};
