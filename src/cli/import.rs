//! CLI commands for archive import and inspection

use std::path::{Path, PathBuf};

use crate::archive::inspect_manifest;
use crate::config::{EditorPaths, Settings};
use crate::display::format_manifest_entries;
use crate::error::TaskManResult;
use crate::hooks::load_decorator;
use crate::services::import_and_register;
use crate::state::StateSynchronizer;
use crate::storage::TaskRepository;

/// Handle `import`: extract an archive and register its tasks with the editor
pub fn handle_import_command(
    paths: &EditorPaths,
    settings: &Settings,
    zip: &Path,
    workspace: Option<PathBuf>,
    no_register: bool,
) -> TaskManResult<()> {
    let repo = TaskRepository::new(paths.storage_root()?);
    let decorator = load_decorator(&settings.hooks_dir);

    let sync = if no_register {
        None
    } else {
        Some(StateSynchronizer::from_paths(paths)?.with_debug(settings.debug))
    };

    let workspace = match workspace {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let workspace = workspace.display().to_string();

    let summary = import_and_register(zip, &repo, decorator.as_ref(), sync.as_ref(), &workspace)?;

    println!(
        "Imported {} task(s) into {} ({} file(s), {} skipped)",
        summary.archive.destinations.len(),
        repo.root().display(),
        summary.archive.files_extracted,
        summary.archive.skipped,
    );
    for (id, dest) in summary.manifest_ids.iter().zip(&summary.archive.destinations) {
        println!("  {} -> {}", id, dest.display());
    }
    for id in &summary.archive.overwritten {
        println!("Warning: task {} already existed; its files were overwritten", id);
    }

    if let Some(registration) = &summary.registration {
        println!();
        println!(
            "Registered {} task(s) in {} (workspace: {})",
            registration.entries,
            registration.primary.path.display(),
            summary.workspace,
        );
        if let Some(backup) = &registration.primary.backup {
            println!("Backup: {}", backup.display());
        }
        match &registration.mirror {
            Some(mirror) => println!("Mirror updated: {}", mirror.path.display()),
            None => println!("Mirror not present; only the primary was updated"),
        }
        for warning in &registration.warnings {
            println!("Warning: {}", warning);
        }
        println!("Restart the editor to see the imported tasks.");
    } else if no_register {
        println!("Registration skipped (--no-register).");
    }

    for warning in &summary.warnings {
        println!("Warning: {}", warning);
    }

    Ok(())
}

/// Handle `inspect`: list the tasks an archive contains without extracting it
pub fn handle_inspect_command(zip: &Path) -> TaskManResult<()> {
    let entries = inspect_manifest(zip)?;
    println!("{}", format_manifest_entries(&entries));
    Ok(())
}
