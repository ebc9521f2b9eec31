use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::error::OrkoError;

const DEFAULT_COOLDOWN: Duration = Duration::from_secs(45 * 60);

/// Operator settings. Everything has a default, so running without a
/// settings file is the normal case.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Root directory holding one working copy per repository.
    pub cache_dir: PathBuf,
    /// JSON document backing the persistent configuration store.
    pub store_path: PathBuf,
    pub github_api: String,
    pub per_page: u32,
    pub refresh_cooldown: Duration,
    pub update_cooldown: Duration,
    /// License applied by the license normalization step when the CLI gives none.
    pub license: Option<String>,
    /// Registry identity prefix; the GitHub username is used when unset.
    pub registry_user: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache"),
            store_path: default_store_path(),
            github_api: "https://api.github.com".to_string(),
            per_page: 100,
            refresh_cooldown: DEFAULT_COOLDOWN,
            update_cooldown: DEFAULT_COOLDOWN,
            license: None,
            registry_user: None,
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orko")
        .join("config.json")
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    cache_dir: Option<PathBuf>,
    store_path: Option<PathBuf>,
    github_api: Option<String>,
    per_page: Option<u32>,
    refresh_cooldown: Option<String>,
    update_cooldown: Option<String>,
    license: Option<String>,
    registry_user: Option<String>,
}

fn parse_duration(field: &str, value: &str) -> Result<Duration, OrkoError> {
    humantime::parse_duration(value).map_err(|e| {
        error!(error = ?e, field, value, "Invalid duration in settings");
        OrkoError::Config(format!("{field}: invalid duration {value:?}: {e}"))
    })
}

/// Loads settings from an optional YAML file, then applies environment
/// overrides (`ORKO_CACHE_DIR`, `ORKO_STORE_PATH`, `ORKO_GITHUB_API`,
/// `ORKO_REGISTRY_USER`).
pub fn load_settings(path: Option<&Path>) -> Result<Settings, OrkoError> {
    let file = match path {
        Some(path) => {
            info!(config_path = ?path, "Loading settings from file");
            let content = fs::read_to_string(path).map_err(|e| {
                error!(error = ?e, config_path = ?path, "Failed to read settings file");
                OrkoError::Config(format!("failed to read settings file {}: {e}", path.display()))
            })?;
            serde_yaml::from_str::<SettingsFile>(&content).map_err(|e| {
                error!(error = ?e, config_path = ?path, "Failed to parse settings YAML");
                OrkoError::Config(format!("failed to parse settings YAML: {e}"))
            })?
        }
        None => SettingsFile::default(),
    };

    let mut settings = Settings::default();
    if let Some(dir) = file.cache_dir {
        settings.cache_dir = dir;
    }
    if let Some(store) = file.store_path {
        settings.store_path = store;
    }
    if let Some(api) = file.github_api {
        settings.github_api = api;
    }
    if let Some(per_page) = file.per_page {
        if per_page == 0 {
            return Err(OrkoError::Config("per_page must be at least 1".to_string()));
        }
        settings.per_page = per_page;
    }
    if let Some(value) = file.refresh_cooldown {
        settings.refresh_cooldown = parse_duration("refresh_cooldown", &value)?;
    }
    if let Some(value) = file.update_cooldown {
        settings.update_cooldown = parse_duration("update_cooldown", &value)?;
    }
    settings.license = file.license;
    settings.registry_user = file.registry_user;

    if let Ok(dir) = std::env::var("ORKO_CACHE_DIR") {
        settings.cache_dir = PathBuf::from(dir);
    }
    if let Ok(store) = std::env::var("ORKO_STORE_PATH") {
        settings.store_path = PathBuf::from(store);
    }
    if let Ok(api) = std::env::var("ORKO_GITHUB_API") {
        settings.github_api = api;
    }
    if let Ok(user) = std::env::var("ORKO_REGISTRY_USER") {
        settings.registry_user = Some(user);
    }

    info!(
        cache_dir = %settings.cache_dir.display(),
        store_path = %settings.store_path.display(),
        github_api = %settings.github_api,
        "Settings loaded"
    );
    Ok(settings)
}
