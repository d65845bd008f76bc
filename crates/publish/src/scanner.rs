//! Directory scanning for upload.
//!
//! Recursively walks a directory and produces a list of file records
//! with relative paths normalized to forward slashes.

use std::path::Path;

use evoapp_protocol::FileRecord;

use crate::error::PublishError;

/// Platform metadata files that are never published.
const IGNORED_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    ".Spotlight-V100",
    ".Trashes",
    ".fseventsd",
];

/// Snapshot of a scanned directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub files: Vec<FileRecord>,
    pub total_bytes: u64,
}

/// Returns `true` for platform metadata entries skipped by the scan.
pub fn is_ignored(name: &str) -> bool {
    IGNORED_NAMES.contains(&name) || name.starts_with("._")
}

/// Scans a directory recursively and returns one record per regular file.
///
/// Entries are visited depth-first in ascending byte order of their names,
/// so the result does not depend on the platform's directory order.
/// Symbolic links and special files abort the scan.
pub fn scan_directory(root: &Path) -> Result<ScanReport, PublishError> {
    let metadata = std::fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(PublishError::Io(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            format!("{} is not a directory", root.display()),
        )));
    }

    let mut report = ScanReport::default();
    walk_dir(root, "", &mut report)?;
    Ok(report)
}

/// Walks `current`, whose path relative to the scan root is `prefix`.
fn walk_dir(current: &Path, prefix: &str, report: &mut ScanReport) -> Result<(), PublishError> {
    let mut entries = std::fs::read_dir(current)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        // Manifest keys must be valid UTF-8.
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            return Err(PublishError::UnsupportedEntry {
                path,
                kind: "non-UTF-8 file name",
            });
        };
        if is_ignored(&name) {
            continue;
        }

        let rel_path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        // `DirEntry::file_type` does not follow symlinks.
        let file_type = entry.file_type()?;

        if file_type.is_symlink() {
            return Err(PublishError::UnsupportedEntry {
                path,
                kind: "symbolic link",
            });
        } else if file_type.is_dir() {
            walk_dir(&path, &rel_path, report)?;
        } else if file_type.is_file() {
            let size = entry.metadata()?.len();
            report.files.push(FileRecord {
                relative_path: rel_path,
                size_bytes: size,
            });
            report.total_bytes += size;
        } else {
            return Err(PublishError::UnsupportedEntry {
                path,
                kind: "special file",
            });
        }
    }

    Ok(())
}
