//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! Everything is built once in [`setup`] and passed explicitly; nothing
//! reaches for a global.

use crate::error::Result;
use crate::model::{BusinessCalendar, GregorianCalendar};
use crate::normalizer::ReportNormalizer;
use crate::services::settings::parse_settings;
use crate::services::{AppSettings, ReportWriter, SettingsService, WorkforceService, WorkforceStore};
use crate::storage::SnapshotLocator;
use crate::sync::{DebouncedWatcher, SnapshotLoader, SnapshotPoller, WatchConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub settings: AppSettings,
    pub settings_service: SettingsService,
    pub calendar: Arc<dyn BusinessCalendar>,
    pub loader: SnapshotLoader,
}

impl AppState {
    /// Poller over the shared reports directory
    pub fn poller(&self) -> SnapshotPoller {
        SnapshotPoller::new(self.loader.clone(), self.settings.sync.poll_interval())
    }

    /// Debounced watcher over the settings file
    pub fn settings_watcher(&self) -> DebouncedWatcher<AppSettings> {
        let config = WatchConfig {
            debounce: self.settings.sync.debounce(),
            ..WatchConfig::default()
        };
        DebouncedWatcher::new(
            self.settings_service.path().to_path_buf(),
            config,
            parse_settings,
        )
    }

    /// Writer-side service. Only the single writer process opens this.
    pub async fn open_workforce(&self) -> Result<WorkforceService> {
        WorkforceService::open(
            WorkforceStore::new(&self.app_data_dir),
            ReportWriter::new(self.reports_dir.clone(), self.settings.manager_classifier()),
            self.calendar.clone(),
        )
        .await
    }
}

/// Application setup - called once on startup
pub async fn setup(app_data_dir: PathBuf) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    // Create necessary directories
    tokio::fs::create_dir_all(&app_data_dir).await?;

    let settings_service = SettingsService::new(app_data_dir.clone());
    let settings = match settings_service.load().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            AppSettings::default()
        }
    };

    let reports_dir = settings.resolve_reports_dir(&app_data_dir);
    tokio::fs::create_dir_all(&reports_dir).await?;
    tracing::info!("Reports directory: {:?}", reports_dir);

    let loader = SnapshotLoader::new(
        SnapshotLocator::new(reports_dir.clone()),
        ReportNormalizer::new(settings.manager_classifier()),
    );

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        app_data_dir,
        reports_dir,
        settings,
        settings_service,
        calendar: Arc::new(GregorianCalendar),
        loader,
    })
}
