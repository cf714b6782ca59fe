//! Editor state database synchronization
//!
//! The editor keeps its task index as a JSON document in `ItemTable`, keyed by
//! the extension ID, inside `state.vscdb` and its mirror `state.vscdb.backup`.
//! This module appends entries to that index for imported tasks.

pub mod document;
pub mod store;
pub mod sync;

pub use document::{HistoryEntry, StateDocument, TASK_HISTORY_KEY};
pub use store::StateStore;
pub use sync::{FileOutcome, RegistrationReport, StateSynchronizer, Verification};
