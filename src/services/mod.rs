//! Service layer for roo-task-man
//!
//! Combines the archive codec, the task repository and the state
//! synchronizer into the flows the CLI exposes.

pub mod import;
pub mod selection;

pub use import::{import_and_register, ImportSummary};
pub use selection::{default_export_name, parse_date_range, parse_id_list, DateRange, TaskSelection};
