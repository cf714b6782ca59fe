//! Archive import followed by registration in the editor state
//!
//! Extraction and registration are separate steps. Once extraction succeeds
//! the files stay on disk; later shortfalls come back as warnings in the
//! summary instead of errors.

use std::path::{Path, PathBuf};

use crate::archive::{import_any, inspect_ids, ImportReport};
use crate::error::{TaskManError, TaskManResult};
use crate::hooks::TaskDecorator;
use crate::models::Task;
use crate::state::{RegistrationReport, StateSynchronizer, Verification};
use crate::storage::TaskRepository;

/// Everything an import did
#[derive(Debug)]
pub struct ImportSummary {
    /// Task IDs listed in the manifest
    pub manifest_ids: Vec<String>,
    pub archive: ImportReport,
    pub workspace: String,
    /// `None` when registration was disabled or nothing could be registered
    pub registration: Option<RegistrationReport>,
    pub verification: Option<Verification>,
    /// `PartialRegistration` and `VerificationMismatch` values
    pub warnings: Vec<TaskManError>,
}

impl ImportSummary {
    /// IDs of the task directories as extracted, which differ from the
    /// manifest IDs when an import landed in a `-copy-` directory
    pub fn imported_ids(&self) -> Vec<String> {
        self.archive.destinations.iter().filter_map(|p| dir_name(p)).collect()
    }
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Import `zip_path` into the repository root and register the tasks
///
/// With `sync` set to `None` only the extraction happens.
pub fn import_and_register(
    zip_path: &Path,
    repo: &TaskRepository,
    decorator: &dyn TaskDecorator,
    sync: Option<&StateSynchronizer>,
    workspace: &str,
) -> TaskManResult<ImportSummary> {
    let manifest_ids = inspect_ids(zip_path)?;
    tracing::debug!(ids = ?manifest_ids, dest = %repo.root().display(), "importing archive");

    let archive = import_any(zip_path, repo.root())?;
    let mut summary = ImportSummary {
        manifest_ids,
        archive,
        workspace: workspace.to_string(),
        registration: None,
        verification: None,
        warnings: Vec::new(),
    };

    let Some(sync) = sync else {
        return Ok(summary);
    };

    let wanted = summary.imported_ids();
    let (tasks, missing) = pick_tasks(repo.load_with(decorator)?, &wanted, &summary.archive.destinations);
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "imported tasks not found after reload");
        summary
            .warnings
            .push(TaskManError::PartialRegistration { missing });
    }

    if tasks.is_empty() {
        tracing::warn!("no imported tasks found for registration");
        return Ok(summary);
    }

    let registration = sync.register_imported_tasks(workspace, &tasks)?;

    let registered: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
    match sync.verify_registration(&registered) {
        Ok(verification) => {
            summary
                .warnings
                .extend(verification.mismatches(&sync.primary(), &sync.mirror()));
            summary.verification = Some(verification);
        }
        Err(e) => tracing::warn!(error = %e, "integrity check failed"),
    }
    summary.registration = Some(registration);

    Ok(summary)
}

/// Tasks whose directory is one of `destinations`, falling back to ID match
fn pick_tasks(loaded: Vec<Task>, wanted: &[String], destinations: &[PathBuf]) -> (Vec<Task>, Vec<String>) {
    let mut picked = Vec::new();
    let mut missing = Vec::new();

    for (id, dest) in wanted.iter().zip(destinations) {
        let found = loaded
            .iter()
            .find(|t| &t.path == dest)
            .or_else(|| loaded.iter().find(|t| &t.id == id));
        match found {
            Some(task) => picked.push(task.clone()),
            None => missing.push(id.clone()),
        }
    }
    (picked, missing)
}
