//! Presentation adapter: read-only snapshots in, commands out.

use shared::domain::{EnrollmentDraft, StreamSession, StreamStatus, SubmissionState};
use tokio::sync::mpsc::{error::TrySendError, Sender};

use crate::{
    backend_bridge::commands::AppCommand,
    controller::events::{UiError, UiErrorContext, UiEvent},
    ui::view::ViewState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(UiError),
}

pub struct PresentationAdapter {
    cmd_tx: Sender<AppCommand>,
    session: StreamSession,
    draft: EnrollmentDraft,
}

impl PresentationAdapter {
    pub fn new(cmd_tx: Sender<AppCommand>) -> Self {
        Self {
            cmd_tx,
            session: StreamSession::idle(),
            draft: EnrollmentDraft::empty(),
        }
    }

    pub fn current_session(&self) -> &StreamSession {
        &self.session
    }

    pub fn current_draft(&self) -> &EnrollmentDraft {
        &self.draft
    }

    pub fn view(&self) -> ViewState {
        ViewState::from_state(self.current_session(), self.current_draft())
    }

    pub fn dispatch(&self, cmd: AppCommand) -> Result<(), UiError> {
        dispatch_app_command(&self.cmd_tx, cmd)
    }

    /// Folds a backend event into the held snapshots.
    pub fn apply(&mut self, event: UiEvent) -> Option<Notice> {
        match event {
            UiEvent::Info(message) => Some(Notice::Info(message)),
            UiEvent::Error(err) => Some(Notice::Error(err)),
            UiEvent::SessionChanged(session) => {
                let notice = session_notice(&self.session, &session);
                self.session = session;
                notice
            }
            UiEvent::DraftChanged(draft) => {
                let notice = draft_notice(&self.draft, &draft);
                self.draft = draft;
                notice
            }
        }
    }
}

pub fn dispatch_app_command(cmd_tx: &Sender<AppCommand>, cmd: AppCommand) -> Result<(), UiError> {
    let cmd_name = match &cmd {
        AppCommand::StartStream => "start_stream",
        AppCommand::StopStream => "stop_stream",
        AppCommand::SetLabel { .. } => "set_label",
        AppCommand::SetImage { .. } => "set_image",
        AppCommand::AcquireImage { .. } => "acquire_image",
        AppCommand::SubmitEnrollment => "submit_enrollment",
        AppCommand::NewEntry => "new_entry",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            Ok(())
        }
        Err(TrySendError::Full(_)) => Err(UiError::from_message(
            UiErrorContext::General,
            "UI command queue is full; please retry",
        )),
        Err(TrySendError::Closed(_)) => Err(UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected (possible startup/runtime failure); restart the app",
        )),
    }
}

/// Reports the outcome once a start or stop request settles.
fn session_notice(previous: &StreamSession, next: &StreamSession) -> Option<Notice> {
    if !previous.status.is_in_flight() || next.status.is_in_flight() {
        return None;
    }
    if let Some(error) = &next.last_error {
        return Some(Notice::Error(UiError::from_error_info(
            UiErrorContext::StreamControl,
            error,
        )));
    }
    match next.status {
        StreamStatus::Streaming => Some(Notice::Info("Stream started".to_string())),
        StreamStatus::Idle => Some(Notice::Info("Stream stopped".to_string())),
        StreamStatus::Starting | StreamStatus::Stopping => None,
    }
}

fn draft_notice(previous: &EnrollmentDraft, next: &EnrollmentDraft) -> Option<Notice> {
    if previous.submission != SubmissionState::Submitting {
        return None;
    }
    match &next.submission {
        SubmissionState::Succeeded { message } => Some(Notice::Info(
            message
                .clone()
                .unwrap_or_else(|| "Enrollment submitted".to_string()),
        )),
        SubmissionState::Failed { error } => Some(Notice::Error(UiError::from_error_info(
            UiErrorContext::Enrollment,
            error,
        ))),
        SubmissionState::Idle | SubmissionState::Submitting => None,
    }
}

#[cfg(test)]
#[path = "../tests/orchestration_tests.rs"]
mod tests;
