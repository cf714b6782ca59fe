//! Export tasks to zip archives
//!
//! Archives are written to a temp file next to the destination and renamed
//! into place, so a failed export never leaves a partial zip behind.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::manifest::{ManifestEntry, MultiManifest, MANIFEST_FILE};
use crate::error::{TaskManError, TaskManResult};
use crate::models::Task;
use crate::storage::write_atomic_with;

/// Progress callback, called with `(files_done, files_total)`
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

/// A file to add, with its path relative to the task directory
struct TaskFile {
    source: PathBuf,
    relative: String,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Every regular file under `root`, in a stable order
///
/// Symlinks to files are included with their target's contents. Symlinked
/// directories are not descended into and dangling links are skipped.
fn collect_files(root: &Path) -> TaskManResult<Vec<TaskFile>> {
    if !root.is_dir() {
        return Err(TaskManError::PathNotFound {
            what: "Task directory",
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let target_is_file = fs::metadata(entry.path()).map(|m| m.is_file()).unwrap_or(false);
            if !target_is_file {
                tracing::warn!(path = %entry.path().display(), "skipping symlink that is not a file");
                continue;
            }
        } else if !file_type.is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| TaskManError::Io(format!("{}: {}", entry.path().display(), e)))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(TaskFile {
            source: entry.into_path(),
            relative,
        });
    }
    Ok(files)
}

fn write_manifest<W, T>(zip: &mut ZipWriter<W>, manifest: &T) -> TaskManResult<()>
where
    W: Write + Seek,
    T: Serialize,
{
    zip.start_file(MANIFEST_FILE, entry_options())?;
    serde_json::to_writer_pretty(&mut *zip, manifest)?;
    Ok(())
}

fn add_file<W: Write + Seek>(zip: &mut ZipWriter<W>, file: &TaskFile, name: &str) -> TaskManResult<()> {
    let mut source = File::open(&file.source)
        .map_err(|e| TaskManError::Io(format!("Failed to open {}: {}", file.source.display(), e)))?;
    zip.start_file(name, entry_options())?;
    io::copy(&mut source, zip)
        .map_err(|e| TaskManError::Io(format!("Failed to add {}: {}", file.source.display(), e)))?;
    Ok(())
}

/// Export one task directory with a v1 manifest
///
/// Entries are stored under the task directory's own name, for example
/// `1712345678901/ui_messages.json`.
pub fn export_single(task: &Task, dest: &Path) -> TaskManResult<()> {
    let files = collect_files(&task.path)?;
    let prefix = task
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| task.id.clone());
    let manifest = ManifestEntry::from_task(task);

    write_atomic_with(dest, |out| {
        let mut zip = ZipWriter::new(out);
        write_manifest(&mut zip, &manifest)?;
        for file in &files {
            add_file(&mut zip, file, &format!("{}/{}", prefix, file.relative))?;
        }
        zip.finish()?;
        Ok(())
    })?;

    tracing::info!(id = %task.id, files = files.len(), dest = %dest.display(), "exported task");
    Ok(())
}

/// Export several tasks into one archive with a v2 manifest
///
/// Entries are stored as `<id>/<relative path>`. Every file is counted before
/// anything is written; `progress` then receives `(done, total)` once per file
/// and a final `(total, total)`. Duplicate IDs are rejected up front.
pub fn export_multi(tasks: &[Task], dest: &Path, mut progress: Option<ProgressFn<'_>>) -> TaskManResult<()> {
    if tasks.is_empty() {
        return Err(TaskManError::Validation("no tasks to export".into()));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = tasks.iter().find(|t| !seen.insert(t.id.as_str())) {
        return Err(TaskManError::Validation(format!(
            "duplicate task id in export: {}",
            dup.id
        )));
    }

    let listing = tasks
        .iter()
        .map(|task| collect_files(&task.path).map(|files| (task, files)))
        .collect::<TaskManResult<Vec<_>>>()?;
    let total: usize = listing.iter().map(|(_, files)| files.len()).sum();
    let manifest = MultiManifest::from_tasks(tasks);

    let mut report = |done: usize| {
        if let Some(cb) = progress.as_mut() {
            cb(done, total);
        }
    };

    write_atomic_with(dest, |out| {
        let mut zip = ZipWriter::new(out);
        write_manifest(&mut zip, &manifest)?;
        let mut done = 0;
        for (task, files) in &listing {
            for file in files {
                add_file(&mut zip, file, &format!("{}/{}", task.id, file.relative))?;
                done += 1;
                report(done);
            }
        }
        zip.finish()?;
        report(total);
        Ok(())
    })?;

    tracing::info!(tasks = tasks.len(), files = total, dest = %dest.display(), "exported tasks");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file_io::temp_path_for;
    use chrono::Utc;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn make_task(root: &Path, id: &str, files: &[(&str, &str)]) -> Task {
        let dir = root.join(id);
        for (name, body) in files {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        Task::new(id, dir, Utc::now()).with_title(format!("Task {}", id))
    }

    fn entry_names(zip_path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn read_entry(zip_path: &Path, name: &str) -> String {
        let mut archive = ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_export_single_layout() {
        let temp = TempDir::new().unwrap();
        let task = make_task(
            temp.path(),
            "t1",
            &[("ui_messages.json", "[]"), ("checkpoints/a.txt", "cp")],
        );
        let dest = temp.path().join("out").join("t1.zip");

        export_single(&task, &dest).unwrap();

        let names = entry_names(&dest);
        assert_eq!(names[0], MANIFEST_FILE);
        assert!(names.contains(&"t1/ui_messages.json".to_string()));
        assert!(names.contains(&"t1/checkpoints/a.txt".to_string()));

        let manifest: serde_json::Value =
            serde_json::from_str(&read_entry(&dest, MANIFEST_FILE)).unwrap();
        assert_eq!(manifest["id"], "t1");
        assert_eq!(manifest["title"], "Task t1");
        assert!(manifest.get("version").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_exported() {
        let temp = TempDir::new().unwrap();
        let task = make_task(temp.path(), "t1", &[("ui_messages.json", "[]")]);
        let target = temp.path().join("shared.txt");
        std::fs::write(&target, "shared").unwrap();
        std::os::unix::fs::symlink(&target, task.path.join("link.txt")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), task.path.join("dangling")).unwrap();
        let dest = temp.path().join("t1.zip");

        export_single(&task, &dest).unwrap();

        let names = entry_names(&dest);
        assert!(names.contains(&"t1/link.txt".to_string()));
        assert!(!names.contains(&"t1/dangling".to_string()));
        assert_eq!(read_entry(&dest, "t1/link.txt"), "shared");
    }

    #[test]
    fn test_export_multi_layout_and_progress() {
        let temp = TempDir::new().unwrap();
        let a = make_task(temp.path(), "a", &[("ui_messages.json", "[]"), ("x.txt", "1")]);
        let b = make_task(temp.path(), "b", &[("ui_messages.json", "[]")]);
        let dest = temp.path().join("many.zip");

        let mut calls = Vec::new();
        let mut on_progress = |done: usize, total: usize| calls.push((done, total));
        export_multi(&[a, b], &dest, Some(&mut on_progress)).unwrap();

        assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3), (3, 3)]);

        let names = entry_names(&dest);
        assert!(names.contains(&"a/x.txt".to_string()));
        assert!(names.contains(&"b/ui_messages.json".to_string()));

        let manifest: MultiManifest =
            serde_json::from_str(&read_entry(&dest, MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.version, 2);
        let ids: Vec<_> = manifest.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_export_multi_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        let a = make_task(temp.path(), "a", &[("f", "1")]);
        let dest = temp.path().join("dup.zip");

        let err = export_multi(&[a.clone(), a], &dest, None).unwrap_err();
        assert!(matches!(err, TaskManError::Validation(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_failed_export_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let good = make_task(temp.path(), "a", &[("f", "1")]);
        let missing = Task::new("gone", temp.path().join("gone"), Utc::now());
        let dest = temp.path().join("partial.zip");

        assert!(export_multi(&[good, missing.clone()], &dest, None).is_err());
        assert!(export_single(&missing, &dest).is_err());
        assert!(!dest.exists());
        assert!(!temp_path_for(&dest).exists());
    }

    #[test]
    fn test_export_empty_selection() {
        let temp = TempDir::new().unwrap();
        let err = export_multi(&[], &temp.path().join("none.zip"), None).unwrap_err();
        assert!(matches!(err, TaskManError::Validation(_)));
    }
}
