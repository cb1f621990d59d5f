//! Snapshot locator
//!
//! Finds the most recently written snapshot in a reports directory.
//! Recency is the file's modification time, not the date in its name:
//! several snapshots can share a calendar date and the latest save wins.

use crate::config::{
    BACKUP_MARKER, LOCK_FILE_EXTENSION, REPORT_FILE_EXTENSION, REPORT_FILE_PREFIX,
    TEMP_FILE_EXTENSION,
};
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// One candidate snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

#[derive(Clone, Debug)]
pub struct SnapshotLocator {
    reports_dir: PathBuf,
}

impl SnapshotLocator {
    pub fn new(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Newest non-backup snapshot, or `None` if there is nothing to read
    pub async fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list().await?.into_iter().next().map(|e| e.path))
    }

    /// All snapshots, newest first
    pub async fn list(&self) -> Result<Vec<SnapshotEntry>> {
        let mut entries = match fs::read_dir(&self.reports_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Reports directory {:?} does not exist", self.reports_dir);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_snapshot_name(&path) {
                continue;
            }
            // A file can vanish between listing and stat while the writer renames
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            snapshots.push(SnapshotEntry {
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                len: metadata.len(),
                path,
            });
        }

        snapshots.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.path.file_name().cmp(&a.path.file_name()))
        });
        Ok(snapshots)
    }
}

/// Snapshot files are `report_*.json`, not temp/lock artifacts, not backups.
/// Other JSON documents may share the directory (settings, the store).
pub fn is_snapshot_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if !name.starts_with(REPORT_FILE_PREFIX) {
        return false;
    }
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if extension.eq_ignore_ascii_case(LOCK_FILE_EXTENSION)
        || extension.eq_ignore_ascii_case(TEMP_FILE_EXTENSION)
        || !extension.eq_ignore_ascii_case(REPORT_FILE_EXTENSION)
    {
        return false;
    }
    !name.to_lowercase().contains(BACKUP_MARKER)
}
