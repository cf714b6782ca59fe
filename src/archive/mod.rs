//! Task archive codec
//!
//! Serializes task directories into portable zip archives and back. Every
//! archive carries a `roo-task-manifest.json` entry describing its tasks:
//! single-task archives use the v1 schema, multi-task archives use v2.

pub mod manifest;
pub mod reader;
pub mod writer;

pub use manifest::{Manifest, ManifestEntry, MultiManifest, MANIFEST_FILE};
pub use reader::{import_any, import_single, inspect_ids, inspect_manifest, ImportReport};
pub use writer::{export_multi, export_single, ProgressFn};
