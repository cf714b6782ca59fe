//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't leave half-written files behind
//! on failure.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::TaskManError;

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, TaskManError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| TaskManError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| TaskManError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Temp file used while `path` is being written
///
/// Lives in the same directory so the final rename stays on one filesystem.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp", name))
}

/// Write a file atomically (write to temp, then rename)
///
/// `write` receives the open temp file. On any error the temp file is removed
/// and `path` is left untouched.
pub fn write_atomic_with<P, F>(path: P, write: F) -> Result<(), TaskManError>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> Result<(), TaskManError>,
{
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            TaskManError::Io(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path);
    let mut file = File::create(&temp_path)
        .map_err(|e| TaskManError::Io(format!("Failed to create temp file: {}", e)))?;

    let written = write(&mut file).and_then(|_| {
        // Sync to disk before rename
        file.sync_all()
            .map_err(|e| TaskManError::Io(format!("Failed to sync data: {}", e)))
    });
    drop(file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        // Try to clean up temp file if rename fails
        let _ = fs::remove_file(&temp_path);
        TaskManError::Io(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

/// Write JSON to a file atomically
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), TaskManError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_atomic_with(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)
            .map_err(|e| TaskManError::Json(format!("Failed to serialize data: {}", e)))?;
        writer
            .flush()
            .map_err(|e| TaskManError::Io(format!("Failed to flush data: {}", e)))
    })
}

/// Copy `src` over `dst` via a temp file and an atomic rename
///
/// The destination is never opened for writing directly, so an interrupted
/// copy leaves the previous `dst` intact.
pub fn copy_file_atomic(src: &Path, dst: &Path) -> Result<(), TaskManError> {
    let mut source = File::open(src)
        .map_err(|e| TaskManError::Io(format!("Failed to open {}: {}", src.display(), e)))?;

    write_atomic_with(dst, |file| {
        std::io::copy(&mut source, file).map_err(|e| {
            TaskManError::Io(format!("Failed to copy {}: {}", src.display(), e))
        })?;
        Ok(())
    })
}
