use shared::domain::{EnrollmentDraft, ImageRef, StreamSession, StreamStatus, SubmissionState};

use crate::controller::events::{UiError, UiErrorContext};

/// The single stream action offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    Start,
    Stop,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub stream_control: StreamControl,
    pub stream_status: &'static str,
    pub feed_uri: Option<String>,
    pub stream_error: Option<String>,
    pub label: String,
    pub image: Option<String>,
    pub submit_enabled: bool,
    pub editing_locked: bool,
    pub submission: String,
}

impl ViewState {
    pub fn from_state(session: &StreamSession, draft: &EnrollmentDraft) -> Self {
        let stream_control = match session.status {
            StreamStatus::Idle => StreamControl::Start,
            StreamStatus::Streaming => StreamControl::Stop,
            StreamStatus::Starting | StreamStatus::Stopping => StreamControl::Pending,
        };
        let stream_status = match session.status {
            StreamStatus::Idle => "idle",
            StreamStatus::Starting => "starting...",
            StreamStatus::Streaming => "streaming",
            StreamStatus::Stopping => "stopping...",
        };
        let submission = match &draft.submission {
            SubmissionState::Idle => "not submitted".to_string(),
            SubmissionState::Submitting => "submitting...".to_string(),
            SubmissionState::Succeeded { message } => match message {
                Some(message) => format!("submitted ({message})"),
                None => "submitted".to_string(),
            },
            SubmissionState::Failed { error } => format!(
                "failed: {}",
                UiError::from_error_info(UiErrorContext::Enrollment, error).message()
            ),
        };

        Self {
            stream_control,
            stream_status,
            feed_uri: session.feed_uri.clone(),
            stream_error: session.last_error.as_ref().map(|error| {
                UiError::from_error_info(UiErrorContext::StreamControl, error)
                    .message()
                    .to_string()
            }),
            label: draft.label.clone(),
            image: draft.picked_image.as_ref().map(describe_image),
            submit_enabled: draft.is_complete() && !draft.is_locked(),
            editing_locked: draft.is_locked(),
            submission,
        }
    }

    pub fn render(&self) -> String {
        let action = match self.stream_control {
            StreamControl::Start => "start",
            StreamControl::Stop => "stop",
            StreamControl::Pending => "(waiting for service)",
        };
        let mut lines = vec![format!("stream: {}  [action: {action}]", self.stream_status)];
        if let Some(feed_uri) = &self.feed_uri {
            lines.push(format!("  feed: {feed_uri}"));
        }
        if let Some(error) = &self.stream_error {
            lines.push(format!("  last error: {error}"));
        }

        let label = if self.label.is_empty() {
            "<empty>"
        } else {
            self.label.as_str()
        };
        lines.push(format!("enrollment: label={label}"));
        lines.push(format!(
            "  image: {}",
            self.image.as_deref().unwrap_or("<none>")
        ));
        let submit_hint = if self.editing_locked {
            "locked"
        } else if self.submit_enabled {
            "ready"
        } else {
            "incomplete"
        };
        lines.push(format!("  submission: {} [{submit_hint}]", self.submission));
        lines.join("\n")
    }
}

fn describe_image(image: &ImageRef) -> String {
    format!(
        "{} ({}, {})",
        image.file_name(),
        image.declared_mime_type(),
        human_readable_bytes(image.byte_len)
    )
}

fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    if bytes < GB {
        return format_scaled_unit(bytes, MB, "MB");
    }
    format_scaled_unit(bytes, GB, "GB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}
