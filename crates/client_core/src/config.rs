use std::time::Duration;

use shared::protocol::{ADD_FACE_PATH, VIDEO_FEED_PATH};
use thiserror::Error;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("service base url is required")]
    MissingBaseUrl,
    #[error("invalid service base url '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("unsupported scheme '{0}' in service base url; expected http or https")]
    UnsupportedScheme(String),
    #[error("enrollment path '{0}' must start with '/'")]
    InvalidEnrollmentPath(String),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Connection settings for the remote camera/enrollment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    base_url: String,
    request_timeout: Duration,
    enrollment_path: String,
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        let parsed = Url::parse(trimmed).map_err(|err| ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
        }
        if parsed.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl {
                value: trimmed.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            enrollment_path: ADD_FACE_PATH.to_string(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    pub fn with_enrollment_path(mut self, path: &str) -> Result<Self, ConfigError> {
        let path = path.trim();
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidEnrollmentPath(path.to_string()));
        }
        self.enrollment_path = path.to_string();
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn enrollment_path(&self) -> &str {
        &self.enrollment_path
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn feed_uri(&self) -> String {
        self.endpoint(VIDEO_FEED_PATH)
    }
}
