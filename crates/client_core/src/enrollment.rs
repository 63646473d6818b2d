//! Draft management and multipart submission for face enrollment.

use std::sync::Arc;

use shared::{
    domain::{EnrollmentDraft, ImageRef, ImageSource, SubmissionState},
    error::{ErrorInfo, ErrorKind},
    protocol::DEFAULT_IMAGE_MIME,
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    capability::{AccessDecision, MediaCapability, PickOutcome},
    transport::{EnrollmentUpload, RemoteService, ServiceReply},
};

const DRAFT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyLabel,
    MissingImage,
    EmptyLabelAndMissingImage,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => f.write_str("a label is required"),
            Self::MissingImage => f.write_str("an image is required"),
            Self::EmptyLabelAndMissingImage => f.write_str("a label and an image are required"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("enrollment is incomplete: {0}")]
    Validation(ValidationIssue),
    #[error("{0} access denied")]
    PermissionDenied(ImageSource),
    #[error("image selection cancelled")]
    Cancelled,
    #[error("draft is locked while a submission is in flight")]
    DraftLocked,
    #[error("enrollment submission failed: {0}")]
    Submission(ErrorInfo),
}

/// What a submission was issued with; results for an older generation are discarded.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionTicket {
    generation: u64,
    label: String,
    image: ImageRef,
}

struct DraftState {
    draft: EnrollmentDraft,
    generation: u64,
}

pub struct EnrollmentWorkflow {
    service: Arc<dyn RemoteService>,
    capability: Arc<dyn MediaCapability>,
    inner: Mutex<DraftState>,
    events: broadcast::Sender<EnrollmentDraft>,
}

impl EnrollmentWorkflow {
    pub fn new(service: Arc<dyn RemoteService>, capability: Arc<dyn MediaCapability>) -> Self {
        let (events, _) = broadcast::channel(DRAFT_CHANNEL_CAPACITY);
        Self {
            service,
            capability,
            inner: Mutex::new(DraftState {
                draft: EnrollmentDraft::empty(),
                generation: 0,
            }),
            events,
        }
    }

    pub async fn snapshot(&self) -> EnrollmentDraft {
        self.inner.lock().await.draft.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnrollmentDraft> {
        self.events.subscribe()
    }

    pub async fn set_label(&self, text: impl Into<String>) -> Result<EnrollmentDraft, WorkflowError> {
        let text = text.into();
        self.mutate(|draft| draft.label = text).await
    }

    pub async fn set_image(&self, image: ImageRef) -> Result<EnrollmentDraft, WorkflowError> {
        debug!(uri = %image.uri, size_bytes = image.byte_len, "enrollment: image set");
        self.mutate(|draft| draft.picked_image = Some(image)).await
    }

    /// Replaces the current draft with an empty one.
    pub async fn new_entry(&self) -> Result<EnrollmentDraft, WorkflowError> {
        self.mutate(|draft| *draft = EnrollmentDraft::empty()).await
    }

    pub async fn acquire_image(&self, source: ImageSource) -> Result<EnrollmentDraft, WorkflowError> {
        if self.inner.lock().await.draft.is_locked() {
            return Err(WorkflowError::DraftLocked);
        }

        let access = match source {
            ImageSource::Camera => self.capability.request_camera_access().await,
            ImageSource::Library => self.capability.request_library_access().await,
        };
        if access == AccessDecision::Denied {
            info!(%source, "enrollment: access denied");
            return Err(WorkflowError::PermissionDenied(source));
        }

        let outcome = match source {
            ImageSource::Camera => self.capability.capture_image().await,
            ImageSource::Library => self.capability.pick_from_library().await,
        };
        match outcome {
            PickOutcome::Picked(image) => self.set_image(image).await,
            PickOutcome::Cancelled => {
                debug!(%source, "enrollment: picker cancelled");
                Err(WorkflowError::Cancelled)
            }
        }
    }

    /// Uploads the draft once. Fields are kept on failure so the user can retry.
    pub async fn submit(&self) -> Result<EnrollmentDraft, WorkflowError> {
        let SubmissionTicket {
            generation,
            label,
            image,
        } = self.begin_submission().await?;

        let bytes = match self.capability.load_image(&image).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(uri = %image.uri, "enrollment: picked image unreadable: {err:#}");
                let info = ErrorInfo::with_raw(ErrorKind::AssetUnavailable, format!("{err:#}"));
                return self.finish(generation, Err(info)).await;
            }
        };

        let upload = EnrollmentUpload {
            label,
            filename: image.file_name(),
            mime_type: resolve_content_type(image.mime_type.as_deref()),
            bytes,
        };
        let result = self
            .service
            .add_person(upload)
            .await
            .map_err(|err| err.to_error_info());
        self.finish(generation, result).await
    }

    /// Validates the draft and locks it for one submission.
    pub(crate) async fn begin_submission(&self) -> Result<SubmissionTicket, WorkflowError> {
        let mut guard = self.inner.lock().await;
        if guard.draft.is_locked() {
            return Err(WorkflowError::DraftLocked);
        }
        let issue = match (guard.draft.has_label(), &guard.draft.picked_image) {
            (true, Some(image)) => Ok(image.clone()),
            (false, Some(_)) => Err(ValidationIssue::EmptyLabel),
            (true, None) => Err(ValidationIssue::MissingImage),
            (false, None) => Err(ValidationIssue::EmptyLabelAndMissingImage),
        };
        let image = issue.map_err(WorkflowError::Validation)?;

        guard.generation += 1;
        guard.draft.submission = SubmissionState::Submitting;
        self.publish(&guard.draft);
        Ok(SubmissionTicket {
            generation: guard.generation,
            label: guard.draft.label.trim().to_string(),
            image,
        })
    }

    pub(crate) async fn finish(
        &self,
        generation: u64,
        result: Result<ServiceReply, ErrorInfo>,
    ) -> Result<EnrollmentDraft, WorkflowError> {
        let mut guard = self.inner.lock().await;
        if guard.generation != generation {
            warn!(
                ticket_generation = generation,
                current_generation = guard.generation,
                "enrollment: discarding stale submission result"
            );
            return Ok(guard.draft.clone());
        }

        guard.generation += 1;
        let outcome = match result {
            Ok(reply) => {
                info!(
                    status = reply.status,
                    message = reply.message.as_deref().unwrap_or_default(),
                    "enrollment: submission accepted"
                );
                guard.draft = EnrollmentDraft {
                    submission: SubmissionState::Succeeded {
                        message: reply.message,
                    },
                    ..EnrollmentDraft::empty()
                };
                Ok(guard.draft.clone())
            }
            Err(error) => {
                warn!("enrollment: submission failed: {error}");
                guard.draft.submission = SubmissionState::Failed {
                    error: error.clone(),
                };
                Err(WorkflowError::Submission(error))
            }
        };
        self.publish(&guard.draft);
        outcome
    }

    async fn mutate(
        &self,
        apply: impl FnOnce(&mut EnrollmentDraft),
    ) -> Result<EnrollmentDraft, WorkflowError> {
        let mut guard = self.inner.lock().await;
        if guard.draft.is_locked() {
            debug!("enrollment: edit rejected while submitting");
            return Err(WorkflowError::DraftLocked);
        }
        apply(&mut guard.draft);
        guard.generation += 1;
        self.publish(&guard.draft);
        Ok(guard.draft.clone())
    }

    fn publish(&self, draft: &EnrollmentDraft) {
        let _ = self.events.send(draft.clone());
    }
}

/// Declared MIME type when it parses, `image/jpeg` otherwise.
fn resolve_content_type(declared: Option<&str>) -> String {
    declared
        .map(str::trim)
        .filter(|mime| mime.parse::<mime_guess::Mime>().is_ok())
        .unwrap_or(DEFAULT_IMAGE_MIME)
        .to_string()
}

#[cfg(test)]
#[path = "tests/enrollment_tests.rs"]
mod tests;
