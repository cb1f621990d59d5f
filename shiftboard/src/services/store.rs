//! Workforce store
//!
//! The writer's own copy of the entity model (`workforce.json`). Reports are
//! derived from it; this file is the source of truth for the writing process.

use crate::config::WORKFORCE_STORE_FILE;
use crate::error::{AppError, Result};
use crate::model::Workforce;
use crate::storage::snapshot_file;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WorkforceStore {
    path: PathBuf,
}

impl WorkforceStore {
    pub fn new(app_data_dir: &Path) -> Self {
        Self {
            path: app_data_dir.join(WORKFORCE_STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the model, or an empty one if nothing was saved yet
    pub async fn load(&self) -> Result<Workforce> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::info!("No workforce store at {:?}, starting empty", self.path);
            return Ok(Workforce::new());
        }

        let bytes = snapshot_file::read_text(&self.path).await?;
        let workforce: Workforce = serde_json::from_str(&bytes.content).map_err(|e| {
            AppError::Generic(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        let workforce = workforce.restore();
        tracing::info!(
            "Loaded workforce: {} employees, {} groups, {} tasks",
            workforce.employees().len(),
            workforce.shifts().groups().len(),
            workforce.tasks().len()
        );
        Ok(workforce)
    }

    pub async fn save(&self, workforce: &Workforce) -> Result<()> {
        let content = serde_json::to_vec_pretty(workforce)?;
        snapshot_file::write_atomic(&self.path, &content).await?;
        tracing::debug!("Saved workforce store {:?}", self.path);
        Ok(())
    }
}
