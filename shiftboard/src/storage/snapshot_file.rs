//! Snapshot file access
//!
//! The writer holds a `<file>.lock` sentinel for the whole save, writes the
//! new content to a temp file and renames it over the target. Readers
//! treat the sentinel, sharing-style I/O errors and truncated JSON as a
//! transient lock that is worth retrying. A sentinel older than
//! [`STALE_LOCK_SECS`] was left by a writer that died mid-save and is
//! treated as released.

use crate::config::{LOCK_FILE_EXTENSION, STALE_LOCK_SECS, TEMP_FILE_EXTENSION};
use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Raw snapshot content plus its fingerprint
#[derive(Debug, Clone)]
pub struct SnapshotBytes {
    pub path: PathBuf,
    pub content: String,
    pub fingerprint: String,
}

/// Path of the sentinel guarding `path`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(LOCK_FILE_EXTENSION);
    path.with_file_name(name)
}

/// SHA-256 of the content, hex encoded
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Whether the sentinel at `sentinel` is held by a live writer.
///
/// A missing sentinel is free; one whose mtime is older than `max_age` is
/// stale and counts as free too.
pub async fn lock_is_held(sentinel: &Path, max_age: Duration) -> bool {
    let metadata = match fs::metadata(sentinel).await {
        Ok(metadata) => metadata,
        Err(_) => return false,
    };
    let age = metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok());
    match age {
        Some(age) if age >= max_age => {
            tracing::warn!("Ignoring stale lock {:?} ({}s old)", sentinel, age.as_secs());
            false
        }
        _ => true,
    }
}

fn stale_after() -> Duration {
    Duration::from_secs(STALE_LOCK_SECS)
}

/// Exclusive hold on a snapshot path; the sentinel is removed on drop.
#[derive(Debug)]
pub struct WriteLock {
    sentinel: PathBuf,
}

impl WriteLock {
    /// Create the sentinel, failing with `Locked` if a live writer holds it.
    /// A stale sentinel is removed and taken over.
    pub async fn acquire(path: &Path) -> Result<Self> {
        let sentinel = lock_path(path);
        match Self::create(&sentinel).await {
            Ok(()) => return Ok(Self { sentinel }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }

        if lock_is_held(&sentinel, stale_after()).await {
            return Err(AppError::Locked(path.to_path_buf()));
        }
        match fs::remove_file(&sentinel).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Another writer may have taken it over in between
        match Self::create(&sentinel).await {
            Ok(()) => Ok(Self { sentinel }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AppError::Locked(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(sentinel: &Path) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(sentinel)
            .await?;
        let owner = format!(
            "{} {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );
        // The sentinel exists from here on; its content is informational
        let written = async {
            file.write_all(owner.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            tracing::debug!("Could not record lock owner in {:?}: {}", sentinel, e);
        }
        Ok(())
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.sentinel) {
            tracing::warn!("Failed to release lock {:?}: {}", self.sentinel, e);
        }
    }
}

/// Read a snapshot's text, mapping contention to `Locked`
pub async fn read_text(path: &Path) -> Result<SnapshotBytes> {
    if lock_is_held(&lock_path(path), stale_after()).await {
        return Err(AppError::Locked(path.to_path_buf()));
    }

    let data = fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::WouldBlock => {
            AppError::Locked(path.to_path_buf())
        }
        _ => AppError::Io(e),
    })?;

    let content = String::from_utf8_lossy(&data).into_owned();
    tracing::debug!("Read snapshot {:?} ({} bytes)", path, data.len());

    Ok(SnapshotBytes {
        path: path.to_path_buf(),
        fingerprint: fingerprint(&data),
        content,
    })
}

/// Read and parse a snapshot as loose JSON.
///
/// An empty file or JSON cut off mid-document means the writer has not
/// finished; that surfaces as `PartialWrite` so the caller retries.
pub async fn read_json(path: &Path) -> Result<(SnapshotBytes, serde_json::Value)> {
    let bytes = read_text(path).await?;
    let value = parse_json(path, &bytes.content)?;
    Ok((bytes, value))
}

pub(crate) fn parse_json(path: &Path, content: &str) -> Result<serde_json::Value> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(AppError::PartialWrite(path.to_path_buf()));
    }
    serde_json::from_str(trimmed).map_err(|e| {
        if e.is_eof() {
            AppError::PartialWrite(path.to_path_buf())
        } else {
            AppError::Serialization(e)
        }
    })
}

/// Atomically replace `path` with `data` under the write lock
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let _lock = WriteLock::acquire(path).await?;

    let temp_path = path.with_file_name(format!(
        ".{}.{}",
        Uuid::new_v4().simple(),
        TEMP_FILE_EXTENSION
    ));
    let result: Result<()> = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&temp_path).await {
            tracing::debug!("Temp file {:?} not removed: {}", temp_path, cleanup);
        }
        return Err(e);
    }

    tracing::debug!("Wrote {:?} ({} bytes)", path, data.len());
    Ok(())
}
