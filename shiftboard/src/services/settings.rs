//! Settings service
//!
//! Display settings persisted as a small JSON document. The same file is
//! watched by running boards, so writes go through the locked atomic path
//! and reads accept partial-write detection.

use crate::config::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_MANAGER_ROLE_PREFIXES, DEFAULT_POLL_INTERVAL_SECS,
    MAX_DEBOUNCE_MS, MAX_POLL_INTERVAL_SECS, MIN_DEBOUNCE_MS, MIN_POLL_INTERVAL_SECS,
    REPORTS_DIR_NAME, SETTINGS_FILE,
};
use crate::error::{AppError, Result};
use crate::normalizer::ManagerClassifier;
use crate::storage::snapshot_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Poller and watcher timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Snapshot poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Quiet period before a watched file is reloaded
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl SyncSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_background_color", alias = "BackgroundColor")]
    pub background_color: String,
    /// Shared reports directory (if None, uses app_data_dir/reports)
    #[serde(default, alias = "ReportsDir")]
    pub reports_dir: Option<String>,
    /// Role prefixes that mark a manager when a snapshot has no explicit
    /// managers list; empty disables the role heuristic
    #[serde(default = "default_manager_role_prefixes")]
    pub manager_role_prefixes: Vec<String>,
    #[serde(default)]
    pub sync: SyncSettings,
}

fn default_background_color() -> String {
    "#FFFFFF".to_string()
}

fn default_manager_role_prefixes() -> Vec<String> {
    DEFAULT_MANAGER_ROLE_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            background_color: default_background_color(),
            reports_dir: None,
            manager_role_prefixes: default_manager_role_prefixes(),
            sync: SyncSettings::default(),
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<()> {
        if !is_hex_color(&self.background_color) {
            return Err(AppError::Validation(format!(
                "background_color must be #RGB or #RRGGBB, got {:?}",
                self.background_color
            )));
        }
        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&self.sync.poll_interval_secs)
        {
            return Err(AppError::Validation(format!(
                "poll_interval_secs must be between {} and {}",
                MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS
            )));
        }
        if !(MIN_DEBOUNCE_MS..=MAX_DEBOUNCE_MS).contains(&self.sync.debounce_ms) {
            return Err(AppError::Validation(format!(
                "debounce_ms must be between {} and {}",
                MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS
            )));
        }
        Ok(())
    }

    /// Reports directory, relative paths resolved against `app_data_dir`
    pub fn resolve_reports_dir(&self, app_data_dir: &Path) -> PathBuf {
        match self.reports_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => app_data_dir.join(dir),
            _ => app_data_dir.join(REPORTS_DIR_NAME),
        }
    }

    pub fn manager_classifier(&self) -> ManagerClassifier {
        ManagerClassifier::new(&self.manager_role_prefixes)
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse and validate settings text; truncated JSON is a `PartialWrite`.
pub fn parse_settings(path: &Path, content: &str) -> Result<AppSettings> {
    let value = snapshot_file::parse_json(path, content)?;
    let settings: AppSettings = serde_json::from_value(value)
        .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;
    settings.validate()?;
    Ok(settings)
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !tokio::fs::try_exists(&self.settings_path).await.unwrap_or(false) {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let bytes = snapshot_file::read_text(&self.settings_path).await?;
        parse_settings(&self.settings_path, &bytes.content)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        settings.validate()?;
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        snapshot_file::write_atomic(&self.settings_path, content.as_bytes()).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Update the board background color
    pub async fn update_background_color(&self, color: &str) -> Result<()> {
        let mut settings = self.load().await?;
        settings.background_color = color.trim().to_string();
        self.save(&settings).await
    }

    /// Get sync settings
    pub async fn get_sync(&self) -> Result<SyncSettings> {
        Ok(self.load().await?.sync)
    }

    /// Update sync settings
    pub async fn update_sync(&self, sync: SyncSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.sync = sync;
        self.save(&settings).await
    }

    /// Replace the manager role prefixes
    pub async fn update_manager_role_prefixes(&self, prefixes: Vec<String>) -> Result<()> {
        let mut settings = self.load().await?;
        settings.manager_role_prefixes = prefixes;
        self.save(&settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_default_settings_created_on_load() {
        let (service, _temp) = create_test_service();

        let settings = service.load().await.unwrap();

        assert_eq!(settings.background_color, "#FFFFFF");
        assert_eq!(settings.sync.poll_interval_secs, 30);
        assert_eq!(settings.sync.debounce_ms, 500);
        assert_eq!(settings.manager_role_prefixes, vec!["manager".to_string()]);
        assert!(service.path().exists());
    }

    #[tokio::test]
    async fn test_sync_settings_get_and_update() {
        let (service, _temp) = create_test_service();

        let sync = service.get_sync().await.unwrap();
        assert_eq!(sync.poll_interval(), Duration::from_secs(30));

        let updated = SyncSettings {
            poll_interval_secs: 10,
            debounce_ms: 250,
        };
        service.update_sync(updated.clone()).await.unwrap();

        let loaded = service.get_sync().await.unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(loaded.debounce(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().to_path_buf();

        // Create service, update settings, drop it
        {
            let service = SettingsService::new(settings_path.clone());
            service.update_background_color("#1E1E1E").await.unwrap();
            service
                .update_manager_role_prefixes(vec!["lead".to_string()])
                .await
                .unwrap();
        }

        // Create new service, verify settings were persisted
        {
            let service = SettingsService::new(settings_path);
            let loaded = service.load().await.unwrap();
            assert_eq!(loaded.background_color, "#1E1E1E");
            assert_eq!(loaded.manager_role_prefixes, vec!["lead".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_invalid_values_rejected() {
        let (service, _temp) = create_test_service();

        assert!(matches!(
            service.update_background_color("white").await,
            Err(AppError::Validation(_))
        ));
        let too_fast = SyncSettings {
            poll_interval_secs: 0,
            ..SyncSettings::default()
        };
        assert!(service.update_sync(too_fast).await.is_err());

        // Nothing invalid reached the file
        assert_eq!(service.load().await.unwrap(), AppSettings::default());
    }

    #[test]
    fn test_parse_legacy_minimal_document() {
        let path = Path::new("settings.json");
        let settings = parse_settings(path, r##"{"BackgroundColor": "#000"}"##).unwrap();

        assert_eq!(settings.background_color, "#000");
        assert_eq!(settings.sync, SyncSettings::default());

        assert!(matches!(
            parse_settings(path, r##"{"background_color": "#FF"##),
            Err(AppError::PartialWrite(_))
        ));
    }

    #[test]
    fn test_reports_dir_resolution() {
        let base = Path::new("/data");
        let mut settings = AppSettings::default();
        assert_eq!(settings.resolve_reports_dir(base), base.join("reports"));

        settings.reports_dir = Some("/mnt/share/reports".to_string());
        assert_eq!(
            settings.resolve_reports_dir(base),
            PathBuf::from("/mnt/share/reports")
        );
    }
}
