use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::{ConfigError, ServiceConfig, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;
use shared::protocol::ADD_FACE_PATH;

pub const DEFAULT_SETTINGS_FILE: &str = "smartcam.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub enrollment_path: String,
    pub library_dir: Option<PathBuf>,
    pub capture_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            enrollment_path: ADD_FACE_PATH.into(),
            library_dir: dirs::picture_dir(),
            capture_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    enrollment_path: Option<String>,
    library_dir: Option<PathBuf>,
    capture_dir: Option<PathBuf>,
}

impl Settings {
    pub fn service_config(&self) -> Result<ServiceConfig, ConfigError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(ConfigError::MissingBaseUrl)?;
        ServiceConfig::new(base_url)?
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))?
            .with_enrollment_path(&self.enrollment_path)
    }
}

/// Defaults, then the settings file, then environment overrides.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match explicit_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_SETTINGS_FILE) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid settings file '{DEFAULT_SETTINGS_FILE}'"))?;
            }
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.base_url {
        settings.base_url = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.enrollment_path {
        settings.enrollment_path = v;
    }
    if let Some(v) = file_cfg.library_dir {
        settings.library_dir = Some(v);
    }
    if let Some(v) = file_cfg.capture_dir {
        settings.capture_dir = Some(v);
    }
    Ok(())
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SMARTCAM_BASE_URL") {
        settings.base_url = Some(v);
    }
    if let Some(v) = lookup("APP__BASE_URL") {
        settings.base_url = Some(v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__ENROLLMENT_PATH") {
        settings.enrollment_path = v;
    }
    if let Some(v) = lookup("APP__LIBRARY_DIR") {
        settings.library_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup("APP__CAPTURE_DIR") {
        settings.capture_dir = Some(PathBuf::from(v));
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
