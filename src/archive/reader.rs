//! Import tasks from zip archives
//!
//! Entry names are normalized before extraction: both separators are
//! accepted, leading slashes are dropped, and any entry with a `..` segment
//! is skipped so nothing is written outside the destination.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::Local;
use zip::ZipArchive;

use super::manifest::{is_manifest_name, is_safe_id, Manifest, ManifestEntry};
use crate::error::{TaskManError, TaskManResult};
use crate::storage::TASKS_DIR;

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Task IDs from the manifest, in manifest order
    pub task_ids: Vec<String>,
    /// Directory each task was extracted into, same order as `task_ids`
    pub destinations: Vec<PathBuf>,
    /// Number of files written
    pub files_extracted: usize,
    /// Entries skipped because their names were unsafe or unexpected
    pub skipped: usize,
    /// Multi-task IDs whose directory already existed and was written into
    pub overwritten: Vec<String>,
}

fn open_archive(path: &Path) -> TaskManResult<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            TaskManError::PathNotFound {
                what: "Archive",
                path: path.to_path_buf(),
            }
        } else {
            TaskManError::Io(format!("Failed to open {}: {}", path.display(), e))
        }
    })?;
    ZipArchive::new(file)
        .map_err(|e| TaskManError::Io(format!("Failed to read archive {}: {}", path.display(), e)))
}

/// Raw bytes of the first entry whose base name is the manifest name
fn read_manifest_bytes(archive: &mut ZipArchive<File>, path: &Path) -> TaskManResult<Vec<u8>> {
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !is_manifest_name(entry.name()) {
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        return Ok(bytes);
    }
    Err(TaskManError::ManifestMissing(path.to_path_buf()))
}

fn invalid(path: &Path, reason: impl Into<String>) -> TaskManError {
    TaskManError::ManifestInvalid {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn parse_manifest(bytes: &[u8], path: &Path) -> TaskManResult<Manifest> {
    let manifest = Manifest::from_slice(bytes).map_err(|e| invalid(path, e.to_string()))?;
    if let Some(bad) = manifest.entries().iter().find(|e| !is_safe_id(&e.id)) {
        let reason = if bad.id.is_empty() {
            "task id is empty".to_string()
        } else {
            format!("task id is not a valid directory name: {:?}", bad.id)
        };
        return Err(invalid(path, reason));
    }
    Ok(manifest)
}

/// Safe relative segments of an entry name, or `None` to skip the entry
fn entry_segments(name: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = name
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() || segments.iter().any(|s| *s == ".." || s.contains(':')) {
        return None;
    }
    Some(segments)
}

fn extract_to(reader: &mut impl Read, out: &Path) -> TaskManResult<()> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| TaskManError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    let mut file = File::create(out)
        .map_err(|e| TaskManError::Io(format!("Failed to create {}: {}", out.display(), e)))?;
    io::copy(reader, &mut file)
        .map_err(|e| TaskManError::Io(format!("Failed to write {}: {}", out.display(), e)))?;
    Ok(())
}

/// `<dest_root>/tasks` when it already exists, else `dest_root`
fn extraction_base(dest_root: &Path) -> PathBuf {
    let tasks = dest_root.join(TASKS_DIR);
    if tasks.is_dir() {
        tasks
    } else {
        dest_root.to_path_buf()
    }
}

/// First free `<dst>-copy-<timestamp>[-N]` sibling of `dst`
fn copy_destination(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let base = format!("{}-copy-{}", name, stamp);

    let mut candidate = dst.with_file_name(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = dst.with_file_name(format!("{}-{}", base, n));
        n += 1;
    }
    candidate
}

/// Import a v1 or v2 archive into `dest_root`
///
/// v2 archives extract each manifest task to `<base>/<id>/...`, where the base
/// is `<dest_root>/tasks` if that folder exists. Entries outside the manifest's
/// IDs are ignored. v1 archives go through the single-task import.
pub fn import_any(zip_path: &Path, dest_root: &Path) -> TaskManResult<ImportReport> {
    let mut archive = open_archive(zip_path)?;
    let bytes = read_manifest_bytes(&mut archive, zip_path)?;

    match parse_manifest(&bytes, zip_path)? {
        Manifest::Multi(multi) => import_multi(&mut archive, &multi.tasks, dest_root),
        Manifest::Single(entry) => import_single_entry(&mut archive, &entry, dest_root),
    }
}

fn import_multi(
    archive: &mut ZipArchive<File>,
    tasks: &[ManifestEntry],
    dest_root: &Path,
) -> TaskManResult<ImportReport> {
    let base = extraction_base(dest_root);
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut report = ImportReport::default();

    for t in tasks {
        if !report.task_ids.contains(&t.id) {
            let dst = base.join(&t.id);
            if dst.exists() {
                tracing::warn!(id = %t.id, dest = %dst.display(), "task directory exists; files will be overwritten");
                report.overwritten.push(t.id.clone());
            }
            report.task_ids.push(t.id.clone());
            report.destinations.push(dst);
        }
    }

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || is_manifest_name(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let segments = match entry_segments(&name) {
            Some(s) if s.len() > 1 => s,
            _ => {
                tracing::warn!(entry = %name, "skipping archive entry");
                report.skipped += 1;
                continue;
            }
        };
        if !ids.contains(segments[0]) {
            continue;
        }

        let out = segments.iter().fold(base.clone(), |p, s| p.join(s));
        extract_to(&mut entry, &out)?;
        report.files_extracted += 1;
    }

    tracing::info!(
        tasks = report.task_ids.len(),
        files = report.files_extracted,
        dest = %base.display(),
        "imported archive"
    );
    Ok(report)
}

/// Import a single-task archive
///
/// The manifest is read strictly as v1. When the destination directory already
/// exists, the task lands in a sibling named `<id>-copy-<YYYYMMDD-HHMMSS>`
/// instead, so existing data is never overwritten. A leading segment equal to
/// the ID is stripped from entry names; unprefixed entries are accepted too.
pub fn import_single(zip_path: &Path, dest_root: &Path) -> TaskManResult<ImportReport> {
    let mut archive = open_archive(zip_path)?;
    let bytes = read_manifest_bytes(&mut archive, zip_path)?;
    let entry = ManifestEntry::from_slice(&bytes).map_err(|e| invalid(zip_path, e.to_string()))?;

    if entry.id.is_empty() {
        return Err(invalid(zip_path, "task id is empty"));
    }
    if !is_safe_id(&entry.id) {
        return Err(invalid(
            zip_path,
            format!("task id is not a valid directory name: {:?}", entry.id),
        ));
    }
    import_single_entry(&mut archive, &entry, dest_root)
}

fn import_single_entry(
    archive: &mut ZipArchive<File>,
    manifest: &ManifestEntry,
    dest_root: &Path,
) -> TaskManResult<ImportReport> {
    let id = manifest.id.as_str();
    let mut dst = extraction_base(dest_root).join(id);
    if dst.exists() {
        let renamed = copy_destination(&dst);
        tracing::warn!(
            existing = %dst.display(),
            dest = %renamed.display(),
            "task directory exists, importing as a copy"
        );
        dst = renamed;
    }
    fs::create_dir_all(&dst)
        .map_err(|e| TaskManError::Io(format!("Failed to create {}: {}", dst.display(), e)))?;

    let mut report = ImportReport {
        task_ids: vec![id.to_string()],
        destinations: vec![dst.clone()],
        ..ImportReport::default()
    };

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || is_manifest_name(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let Some(mut segments) = entry_segments(&name) else {
            tracing::warn!(entry = %name, "skipping archive entry");
            report.skipped += 1;
            continue;
        };
        if segments[0] == id {
            segments.remove(0);
        }
        if segments.is_empty() {
            report.skipped += 1;
            continue;
        }

        let out = segments.iter().fold(dst.clone(), |p, s| p.join(s));
        extract_to(&mut entry, &out)?;
        report.files_extracted += 1;
    }

    tracing::info!(id, files = report.files_extracted, dest = %dst.display(), "imported task");
    Ok(report)
}

/// Parsed manifest entries of an archive, without extracting anything
pub fn inspect_manifest(zip_path: &Path) -> TaskManResult<Vec<ManifestEntry>> {
    let mut archive = open_archive(zip_path)?;
    let bytes = read_manifest_bytes(&mut archive, zip_path)?;
    let manifest = Manifest::from_slice(&bytes).map_err(|e| invalid(zip_path, e.to_string()))?;
    Ok(manifest.entries().to_vec())
}

/// Task IDs an import of `zip_path` would produce
pub fn inspect_ids(zip_path: &Path) -> TaskManResult<Vec<String>> {
    let mut archive = open_archive(zip_path)?;
    let bytes = read_manifest_bytes(&mut archive, zip_path)?;
    Ok(parse_manifest(&bytes, zip_path)?.task_ids())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::manifest::MANIFEST_FILE;
    use crate::archive::{export_multi, export_single};
    use crate::models::Task;
    use chrono::Utc;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn make_task(root: &Path, id: &str, files: &[(&str, &str)]) -> Task {
        let dir = root.join(id);
        for (name, body) in files {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        Task::new(id, dir, Utc::now())
    }

    /// Write a zip with arbitrary entries
    fn raw_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_multi_round_trip() {
        let src = TempDir::new().unwrap();
        let a = make_task(src.path(), "a", &[("ui_messages.json", "[1]"), ("sub/x.txt", "x")]);
        let b = make_task(src.path(), "b", &[("ui_messages.json", "[2]")]);
        let zip_path = src.path().join("ab.zip");
        export_multi(&[a, b], &zip_path, None).unwrap();

        let dest = TempDir::new().unwrap();
        fs::create_dir_all(dest.path().join(TASKS_DIR)).unwrap();
        let report = import_any(&zip_path, dest.path()).unwrap();

        assert_eq!(report.task_ids, vec!["a", "b"]);
        assert_eq!(report.files_extracted, 3);
        let base = dest.path().join(TASKS_DIR);
        assert_eq!(fs::read_to_string(base.join("a/sub/x.txt")).unwrap(), "x");
        assert_eq!(fs::read_to_string(base.join("b/ui_messages.json")).unwrap(), "[2]");
        assert_eq!(report.destinations, vec![base.join("a"), base.join("b")]);
    }

    #[test]
    fn test_multi_reports_existing_task_dirs() {
        let src = TempDir::new().unwrap();
        let a = make_task(src.path(), "a", &[("ui_messages.json", "[new]")]);
        let b = make_task(src.path(), "b", &[("ui_messages.json", "[2]")]);
        let zip_path = src.path().join("ab.zip");
        export_multi(&[a, b], &zip_path, None).unwrap();

        let dest = TempDir::new().unwrap();
        let existing = dest.path().join(TASKS_DIR).join("a");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("ui_messages.json"), "[old]").unwrap();

        let report = import_any(&zip_path, dest.path()).unwrap();
        assert_eq!(report.overwritten, vec!["a"]);
        assert_eq!(fs::read_to_string(existing.join("ui_messages.json")).unwrap(), "[new]");
    }

    #[test]
    fn test_multi_without_tasks_folder_extracts_to_root() {
        let src = TempDir::new().unwrap();
        let a = make_task(src.path(), "a", &[("f.txt", "1")]);
        let zip_path = src.path().join("a.zip");
        export_multi(&[a], &zip_path, None).unwrap();

        let dest = TempDir::new().unwrap();
        import_any(&zip_path, dest.path()).unwrap();
        assert!(dest.path().join("a/f.txt").exists());
        assert!(!dest.path().join(TASKS_DIR).exists());
    }

    #[test]
    fn test_multi_ignores_entries_outside_manifest() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("extra.zip");
        raw_zip(
            &zip_path,
            &[
                (MANIFEST_FILE, r#"{"version":2,"tasks":[{"id":"a"}]}"#),
                ("a/keep.txt", "keep"),
                ("other/drop.txt", "drop"),
                ("../escape.txt", "bad"),
            ],
        );

        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).unwrap();
        let report = import_any(&zip_path, &dest).unwrap();

        assert_eq!(report.files_extracted, 1);
        assert!(dest.join("a/keep.txt").exists());
        assert!(!dest.join("other").exists());
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_single_round_trip() {
        let src = TempDir::new().unwrap();
        let t = make_task(src.path(), "t1", &[("ui_messages.json", "[]"), ("sub/y", "y")]);
        let zip_path = src.path().join("t1.zip");
        export_single(&t, &zip_path).unwrap();

        let dest = TempDir::new().unwrap();
        let report = import_single(&zip_path, dest.path()).unwrap();
        assert_eq!(report.task_ids, vec!["t1"]);
        assert_eq!(report.files_extracted, 2);
        assert_eq!(fs::read_to_string(dest.path().join("t1/sub/y")).unwrap(), "y");
    }

    #[test]
    fn test_single_collision_imports_as_copy() {
        let src = TempDir::new().unwrap();
        let t = make_task(src.path(), "t1", &[("ui_messages.json", "new")]);
        let zip_path = src.path().join("t1.zip");
        export_single(&t, &zip_path).unwrap();

        let dest = TempDir::new().unwrap();
        let existing = dest.path().join(TASKS_DIR).join("t1");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("ui_messages.json"), "old").unwrap();

        let first = import_any(&zip_path, dest.path()).unwrap();
        let second = import_any(&zip_path, dest.path()).unwrap();

        assert_eq!(fs::read_to_string(existing.join("ui_messages.json")).unwrap(), "old");
        for report in [&first, &second] {
            let dst = &report.destinations[0];
            assert_ne!(dst, &existing);
            let name = dst.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("t1-copy-"), "{}", name);
            assert_eq!(fs::read_to_string(dst.join("ui_messages.json")).unwrap(), "new");
        }
        assert_ne!(first.destinations[0], second.destinations[0]);
    }

    #[test]
    fn test_single_accepts_unprefixed_entries() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("legacy.zip");
        raw_zip(
            &zip_path,
            &[
                (MANIFEST_FILE, r#"{"id":"t9","title":"Legacy"}"#),
                ("ui_messages.json", "[]"),
                ("t9/api_conversation_history.json", "[]"),
            ],
        );

        let dest = temp.path().join("dest");
        import_any(&zip_path, &dest).unwrap();
        assert!(dest.join("t9/ui_messages.json").exists());
        assert!(dest.join("t9/api_conversation_history.json").exists());
    }

    #[test]
    fn test_single_empty_id_is_invalid() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("noid.zip");
        raw_zip(&zip_path, &[(MANIFEST_FILE, r#"{"title":"x"}"#), ("f", "1")]);

        let err = import_single(&zip_path, temp.path()).unwrap_err();
        assert!(matches!(err, TaskManError::ManifestInvalid { .. }));
        let err = import_any(&zip_path, temp.path()).unwrap_err();
        assert!(err.is_manifest_error());
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("bare.zip");
        raw_zip(&zip_path, &[("a/f.txt", "1")]);

        let err = import_any(&zip_path, temp.path()).unwrap_err();
        assert!(matches!(err, TaskManError::ManifestMissing(_)));
    }

    #[test]
    fn test_manifest_found_case_insensitively_in_subfolder() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("nested.zip");
        raw_zip(
            &zip_path,
            &[("meta/Roo-Task-Manifest.JSON", r#"{"version":2,"tasks":[{"id":"a"},{"id":"b"}]}"#)],
        );

        assert_eq!(inspect_ids(&zip_path).unwrap(), vec!["a", "b"]);
        let entries = inspect_manifest(&zip_path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_unsafe_manifest_id_rejected() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("evil.zip");
        raw_zip(&zip_path, &[(MANIFEST_FILE, r#"{"id":"../../etc"}"#)]);

        let err = import_any(&zip_path, temp.path()).unwrap_err();
        assert!(matches!(err, TaskManError::ManifestInvalid { .. }));
    }

    #[test]
    fn test_missing_archive() {
        let temp = TempDir::new().unwrap();
        let err = import_any(&temp.path().join("nope.zip"), temp.path()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_entry_segments() {
        assert_eq!(entry_segments("/a//b\\c"), Some(vec!["a", "b", "c"]));
        assert_eq!(entry_segments("./a/./b"), Some(vec!["a", "b"]));
        assert_eq!(entry_segments("a/../b"), None);
        assert_eq!(entry_segments("C:/x"), None);
        assert_eq!(entry_segments("//"), None);
    }
}
