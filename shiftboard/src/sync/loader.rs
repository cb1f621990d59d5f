//! Latest-snapshot loading
//!
//! Locate, read (retrying on lock) and normalize the newest report. The
//! normalizer only runs when a snapshot file actually exists.

use super::retry::RetryPolicy;
use crate::error::{AppError, Result};
use crate::model::Report;
use crate::normalizer::ReportNormalizer;
use crate::storage::snapshot_file;
use crate::storage::SnapshotLocator;
use std::path::{Path, PathBuf};

/// A normalized snapshot and where it came from
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub report: Report,
    pub path: PathBuf,
    pub fingerprint: String,
}

#[derive(Debug)]
pub enum LoadOutcome {
    /// Reports directory missing or empty
    NoData,
    Loaded(LoadedSnapshot),
    /// The snapshot could not be read or parsed; try again later
    Deferred { path: PathBuf, error: AppError },
}

#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    locator: SnapshotLocator,
    normalizer: ReportNormalizer,
    retry: RetryPolicy,
}

impl SnapshotLoader {
    pub fn new(locator: SnapshotLocator, normalizer: ReportNormalizer) -> Self {
        Self {
            locator,
            normalizer,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn locator(&self) -> &SnapshotLocator {
        &self.locator
    }

    pub async fn load_latest(&self) -> LoadOutcome {
        let latest = match self.locator.latest().await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!("Failed to scan {:?}: {}", self.locator.reports_dir(), e);
                return LoadOutcome::Deferred {
                    path: self.locator.reports_dir().to_path_buf(),
                    error: e,
                };
            }
        };
        let Some(path) = latest else {
            tracing::debug!("No snapshot in {:?}", self.locator.reports_dir());
            return LoadOutcome::NoData;
        };

        match self.load_path(&path).await {
            Ok(snapshot) => LoadOutcome::Loaded(snapshot),
            Err(error) => {
                tracing::warn!("Deferring reload of {:?}: {}", path, error);
                LoadOutcome::Deferred { path, error }
            }
        }
    }

    /// Read and normalize one snapshot file
    pub async fn load_path(&self, path: &Path) -> Result<LoadedSnapshot> {
        let (bytes, value) = self
            .retry
            .retry_on_lock("snapshot read", || snapshot_file::read_json(path))
            .await?;

        let report = self.normalizer.normalize(&value).ok_or_else(|| {
            AppError::Validation(format!("{} is not a report document", path.display()))
        })?;

        tracing::debug!(
            "Loaded snapshot {:?} ({} employees)",
            path,
            report.employees.len()
        );
        Ok(LoadedSnapshot {
            report,
            path: bytes.path,
            fingerprint: bytes.fingerprint,
        })
    }

    /// Latest report, or the empty default when there is none to show
    pub async fn load_or_default(&self) -> Report {
        match self.load_latest().await {
            LoadOutcome::Loaded(snapshot) => snapshot.report,
            LoadOutcome::NoData | LoadOutcome::Deferred { .. } => Report::empty(),
        }
    }
}
