//! Export module for roo-task-man
//!
//! Human-readable exports. Zip archives live in `archive`; this module writes
//! a markdown dump of task titles and user prompts.

pub mod markdown;
pub mod sanitize;

pub use markdown::{dump_markdown, MAX_LINE_CHARS};
pub use sanitize::{clean_one_line, escape_html, CleanLine};
