use serde::{Deserialize, Serialize};

use crate::{error::ErrorInfo, protocol::DEFAULT_IMAGE_MIME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    #[default]
    Idle,
    Starting,
    Streaming,
    Stopping,
}

impl StreamStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }
}

/// Snapshot of the remote camera feed as tracked by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSession {
    pub status: StreamStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorInfo>,
}

impl StreamSession {
    pub fn idle() -> Self {
        Self::default()
    }

    /// `feed_uri` is present exactly when the stream is live.
    pub fn is_consistent(&self) -> bool {
        self.feed_uri.is_some() == (self.status == StreamStatus::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Camera,
    Library,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera => f.write_str("camera"),
            Self::Library => f.write_str("photo library"),
        }
    }
}

/// Reference to a device-local image. The bytes stay with the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub byte_len: u64,
}

impl ImageRef {
    pub fn new(uri: impl Into<String>, byte_len: u64) -> Self {
        Self {
            uri: uri.into(),
            filename: None,
            mime_type: None,
            byte_len,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Original filename, falling back to the last URI segment.
    pub fn file_name(&self) -> String {
        if let Some(name) = self.filename.as_deref().filter(|name| !name.is_empty()) {
            return name.to_string();
        }
        self.uri
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && !segment.ends_with(':'))
            .unwrap_or("image.jpg")
            .to_string()
    }

    pub fn declared_mime_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failed {
        error: ErrorInfo,
    },
}

/// In-progress face-label record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentDraft {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picked_image: Option<ImageRef>,
    pub submission: SubmissionState,
}

impl EnrollmentDraft {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_label(&self) -> bool {
        !self.label.trim().is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.has_label() && self.picked_image.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.submission == SubmissionState::Submitting
    }
}
