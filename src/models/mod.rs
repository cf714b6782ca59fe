//! Core data models for roo-task-man

pub mod task;

pub use task::{HistoryItem, HistoryRole, Task, TaskStats};
