//! Backend worker: owns the controllers on a current-thread runtime.

use std::{sync::Arc, thread, time::Duration};

use client_core::{
    EnrollmentWorkflow, MediaCapability, RemoteService, StreamSessionController, WorkflowError,
};
use crossbeam_channel::{Sender, TrySendError};
use shared::domain::{EnrollmentDraft, StreamSession};
use tokio::sync::{broadcast, mpsc};

use crate::{
    backend_bridge::commands::AppCommand,
    controller::events::{UiError, UiErrorContext, UiEvent},
};

const RESEND_INTERVAL: Duration = Duration::from_millis(50);

pub fn launch(
    service: Arc<dyn RemoteService>,
    capability: Arc<dyn MediaCapability>,
    cmd_rx: mpsc::Receiver<AppCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run_backend(service, capability, cmd_rx, ui_tx));
        tracing::info!("backend worker stopped");
    })
}

/// Serves commands until the presentation side drops its sender.
///
/// Each command runs in its own task so a second request against a busy
/// controller reaches its guard and is rejected instead of waiting behind
/// the first.
pub async fn run_backend(
    service: Arc<dyn RemoteService>,
    capability: Arc<dyn MediaCapability>,
    mut cmd_rx: mpsc::Receiver<AppCommand>,
    ui_tx: Sender<UiEvent>,
) {
    let session = Arc::new(StreamSessionController::new(Arc::clone(&service)));
    let enrollment = Arc::new(EnrollmentWorkflow::new(service, capability));

    let forwarder = tokio::spawn(forward_snapshots(
        Arc::clone(&session),
        Arc::clone(&enrollment),
        session.subscribe(),
        enrollment.subscribe(),
        ui_tx.clone(),
    ));
    let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

    while let Some(cmd) = cmd_rx.recv().await {
        tokio::spawn(handle_command(
            Arc::clone(&session),
            Arc::clone(&enrollment),
            cmd,
            ui_tx.clone(),
        ));
    }

    tracing::debug!("command channel closed; shutting down backend");
    forwarder.abort();
}

async fn handle_command(
    session: Arc<StreamSessionController>,
    enrollment: Arc<EnrollmentWorkflow>,
    cmd: AppCommand,
    ui_tx: Sender<UiEvent>,
) {
    let context = match &cmd {
        AppCommand::StartStream | AppCommand::StopStream => UiErrorContext::StreamControl,
        AppCommand::SetImage { .. } | AppCommand::AcquireImage { .. } => {
            UiErrorContext::ImageAcquisition
        }
        AppCommand::SetLabel { .. } | AppCommand::SubmitEnrollment | AppCommand::NewEntry => {
            UiErrorContext::Enrollment
        }
    };

    let outcome = match cmd {
        AppCommand::StartStream => {
            session.start().await;
            Ok(())
        }
        AppCommand::StopStream => {
            session.stop().await;
            Ok(())
        }
        AppCommand::SetLabel { text } => enrollment.set_label(text).await.map(drop),
        AppCommand::SetImage { image } => enrollment.set_image(image).await.map(drop),
        AppCommand::AcquireImage { source } => enrollment.acquire_image(source).await.map(drop),
        AppCommand::SubmitEnrollment => enrollment.submit().await.map(drop),
        AppCommand::NewEntry => enrollment.new_entry().await.map(drop),
    };

    match outcome {
        Ok(()) => {}
        // Remote failures already reach the UI through the draft snapshot.
        Err(WorkflowError::Submission(_)) => {}
        Err(err) => {
            tracing::debug!(context = context.label(), "command rejected: {err}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_workflow(context, &err)));
        }
    }
}

async fn forward_snapshots(
    session: Arc<StreamSessionController>,
    enrollment: Arc<EnrollmentWorkflow>,
    mut session_rx: broadcast::Receiver<StreamSession>,
    mut draft_rx: broadcast::Receiver<EnrollmentDraft>,
    ui_tx: Sender<UiEvent>,
) {
    // Set when a snapshot of that kind was dropped on a full UI queue.
    let mut session_dropped = false;
    let mut draft_dropped = false;

    loop {
        let event = tokio::select! {
            received = session_rx.recv() => match received {
                Ok(snapshot) => UiEvent::SessionChanged(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "session snapshots lagged; resending current state");
                    UiEvent::SessionChanged(session.snapshot().await)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            received = draft_rx.recv() => match received {
                Ok(snapshot) => UiEvent::DraftChanged(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "draft snapshots lagged; resending current state");
                    UiEvent::DraftChanged(enrollment.snapshot().await)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::time::sleep(RESEND_INTERVAL), if session_dropped || draft_dropped => {
                if session_dropped {
                    UiEvent::SessionChanged(session.snapshot().await)
                } else {
                    UiEvent::DraftChanged(enrollment.snapshot().await)
                }
            }
        };

        let is_session = matches!(event, UiEvent::SessionChanged(_));
        match ui_tx.try_send(event) {
            // Later snapshots of a kind supersede a dropped one.
            Ok(()) if is_session => session_dropped = false,
            Ok(()) => draft_dropped = false,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("ui event queue is full; resending current state later");
                if is_session {
                    session_dropped = true;
                } else {
                    draft_dropped = true;
                }
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
}

#[cfg(test)]
#[path = "../tests/runtime_tests.rs"]
mod tests;
