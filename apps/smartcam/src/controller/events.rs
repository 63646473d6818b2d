//! Backend-to-UI events and user-facing error modeling.

use client_core::WorkflowError;
use shared::{
    domain::{EnrollmentDraft, StreamSession},
    error::{ErrorInfo, ErrorKind},
};

#[derive(Debug, Clone)]
pub enum UiEvent {
    Info(String),
    SessionChanged(StreamSession),
    DraftChanged(EnrollmentDraft),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Server,
    Validation,
    Device,
    Busy,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    StreamControl,
    Enrollment,
    ImageAcquisition,
    General,
}

impl UiErrorContext {
    pub fn label(self) -> &'static str {
        match self {
            Self::BackendStartup => "startup",
            Self::StreamControl => "stream",
            Self::Enrollment => "enrollment",
            Self::ImageAcquisition => "image",
            Self::General => "app",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn new(category: UiErrorCategory, context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            category,
            context,
            message: message.into(),
        }
    }

    /// Classifies free-form failures such as startup or queue errors.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("queue is full")
            || message_lower.contains("in flight")
            || message_lower.contains("locked")
        {
            UiErrorCategory::Busy
        } else if message_lower.contains("timed out")
            || message_lower.contains("timeout")
            || message_lower.contains("connection")
            || message_lower.contains("unreachable")
            || message_lower.contains("disconnected")
        {
            UiErrorCategory::Transport
        } else if message_lower.contains("not found")
            || message_lower.contains("not a file")
            || message_lower.contains("permission")
        {
            UiErrorCategory::Device
        } else if message_lower.contains("invalid")
            || message_lower.contains("required")
            || message_lower.contains("missing")
        {
            UiErrorCategory::Validation
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_error_info(context: UiErrorContext, info: &ErrorInfo) -> Self {
        let (category, message) = match &info.kind {
            ErrorKind::NetworkUnreachable => (
                UiErrorCategory::Transport,
                "Camera service unreachable; check the address and network, then retry."
                    .to_string(),
            ),
            ErrorKind::Timeout => (
                UiErrorCategory::Transport,
                "Camera service did not respond in time; retry.".to_string(),
            ),
            ErrorKind::ServerRejected(reason) => (
                UiErrorCategory::Server,
                format!("Camera service rejected the request: {reason}"),
            ),
            ErrorKind::AssetUnavailable => (
                UiErrorCategory::Device,
                "The selected image can no longer be read; pick it again.".to_string(),
            ),
        };
        Self::new(category, context, message)
    }

    pub fn from_workflow(context: UiErrorContext, err: &WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(issue) => Self::new(
                UiErrorCategory::Validation,
                context,
                format!("Cannot submit yet: {issue}."),
            ),
            WorkflowError::PermissionDenied(source) => Self::new(
                UiErrorCategory::Device,
                context,
                format!("Access to the {source} was denied."),
            ),
            WorkflowError::Cancelled => {
                Self::new(UiErrorCategory::Device, context, "Image selection cancelled.")
            }
            WorkflowError::DraftLocked => Self::new(
                UiErrorCategory::Busy,
                context,
                "An enrollment is being submitted; wait for it to finish.",
            ),
            WorkflowError::Submission(info) => Self::from_error_info(context, info),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category,
            UiErrorCategory::Transport | UiErrorCategory::Server | UiErrorCategory::Busy
        )
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.context.label(), self.message)
    }
}
