use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use anyhow::Result;
use async_trait::async_trait;
use client_core::{
    AccessDecision, EnrollmentUpload, PickOutcome, ServiceError, ServiceReply,
    UnavailableCapability,
};
use crossbeam_channel::{bounded, unbounded, Receiver, TryRecvError};
use shared::{
    domain::{ImageRef, ImageSource, StreamStatus, SubmissionState},
    error::ErrorKind,
};

use super::*;
use crate::controller::events::UiErrorCategory;

const FEED_URI: &str = "http://cam.test/video_feed";

#[derive(Default)]
struct RecordingService {
    fail_start: bool,
    start_calls: AtomicUsize,
    uploads: Mutex<Vec<EnrollmentUpload>>,
}

#[async_trait]
impl RemoteService for RecordingService {
    async fn start_stream(&self) -> Result<ServiceReply, ServiceError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ServiceError::Unreachable("connection refused".to_string()));
        }
        Ok(ServiceReply {
            status: 200,
            message: None,
        })
    }

    async fn stop_stream(&self) -> Result<ServiceReply, ServiceError> {
        Ok(ServiceReply {
            status: 200,
            message: None,
        })
    }

    async fn add_person(&self, upload: EnrollmentUpload) -> Result<ServiceReply, ServiceError> {
        let label = upload.label.clone();
        self.uploads.lock().expect("uploads lock").push(upload);
        Ok(ServiceReply {
            status: 200,
            message: Some(format!("Face added for label '{label}'")),
        })
    }

    fn feed_uri(&self) -> String {
        FEED_URI.to_string()
    }
}

struct InMemoryLibrary;

#[async_trait]
impl MediaCapability for InMemoryLibrary {
    async fn request_camera_access(&self) -> AccessDecision {
        AccessDecision::Denied
    }

    async fn capture_image(&self) -> PickOutcome {
        PickOutcome::Cancelled
    }

    async fn request_library_access(&self) -> AccessDecision {
        AccessDecision::Granted
    }

    async fn pick_from_library(&self) -> PickOutcome {
        PickOutcome::Picked(
            ImageRef::new("memory://alice.jpg", 3)
                .with_filename("alice.jpg")
                .with_mime_type("image/jpeg"),
        )
    }

    async fn load_image(&self, _image: &ImageRef) -> Result<Vec<u8>> {
        Ok(vec![0xFF, 0xD8, 0xFF])
    }
}

struct Harness {
    cmd_tx: mpsc::Sender<AppCommand>,
    ui_rx: Receiver<UiEvent>,
    backend: tokio::task::JoinHandle<()>,
}

fn spawn_backend(service: Arc<dyn RemoteService>, capability: Arc<dyn MediaCapability>) -> Harness {
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = unbounded();
    let backend = tokio::spawn(run_backend(service, capability, cmd_rx, ui_tx));
    Harness {
        cmd_tx,
        ui_rx,
        backend,
    }
}

async fn wait_for(rx: &Receiver<UiEvent>, matches: impl Fn(&UiEvent) -> bool) -> UiEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match rx.try_recv() {
            Ok(event) if matches(&event) => return event,
            Ok(_) => continue,
            Err(TryRecvError::Empty) => {
                assert!(Instant::now() < deadline, "timed out waiting for ui event");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Err(TryRecvError::Disconnected) => panic!("ui event channel closed"),
        }
    }
}

#[tokio::test]
async fn reports_ready_and_streams_on_start() {
    let service = Arc::new(RecordingService::default());
    let harness = spawn_backend(service.clone(), Arc::new(UnavailableCapability));

    wait_for(&harness.ui_rx, |event| {
        matches!(event, UiEvent::Info(message) if message == "Backend worker ready")
    })
    .await;
    harness.cmd_tx.send(AppCommand::StartStream).await.expect("send");

    let event = wait_for(&harness.ui_rx, |event| {
        matches!(event, UiEvent::SessionChanged(session) if session.status == StreamStatus::Streaming)
    })
    .await;

    let UiEvent::SessionChanged(session) = event else {
        unreachable!()
    };
    assert_eq!(session.feed_uri.as_deref(), Some(FEED_URI));
    assert_eq!(service.start_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_start_is_published_as_idle_with_error() {
    let service = Arc::new(RecordingService {
        fail_start: true,
        ..RecordingService::default()
    });
    let harness = spawn_backend(service, Arc::new(UnavailableCapability));

    harness.cmd_tx.send(AppCommand::StartStream).await.expect("send");

    let event = wait_for(&harness.ui_rx, |event| {
        matches!(event, UiEvent::SessionChanged(session) if session.last_error.is_some())
    })
    .await;
    let UiEvent::SessionChanged(session) = event else {
        unreachable!()
    };
    assert_eq!(session.status, StreamStatus::Idle);
    assert_eq!(session.feed_uri, None);
    assert_eq!(
        session.last_error.map(|error| error.kind),
        Some(ErrorKind::NetworkUnreachable)
    );
}

#[tokio::test]
async fn incomplete_submit_surfaces_validation_error() {
    let service = Arc::new(RecordingService::default());
    let harness = spawn_backend(service.clone(), Arc::new(UnavailableCapability));

    harness
        .cmd_tx
        .send(AppCommand::SubmitEnrollment)
        .await
        .expect("send");

    let event = wait_for(&harness.ui_rx, |event| matches!(event, UiEvent::Error(_))).await;
    let UiEvent::Error(err) = event else {
        unreachable!()
    };
    assert_eq!(err.category(), UiErrorCategory::Validation);
    assert_eq!(err.context(), UiErrorContext::Enrollment);
    assert!(service.uploads.lock().expect("uploads lock").is_empty());
}

#[tokio::test]
async fn denied_camera_is_reported_as_device_error() {
    let harness = spawn_backend(
        Arc::new(RecordingService::default()),
        Arc::new(InMemoryLibrary),
    );

    harness
        .cmd_tx
        .send(AppCommand::AcquireImage {
            source: ImageSource::Camera,
        })
        .await
        .expect("send");

    let event = wait_for(&harness.ui_rx, |event| matches!(event, UiEvent::Error(_))).await;
    let UiEvent::Error(err) = event else {
        unreachable!()
    };
    assert_eq!(err.category(), UiErrorCategory::Device);
    assert_eq!(err.context(), UiErrorContext::ImageAcquisition);
}

#[tokio::test]
async fn picked_and_labelled_draft_is_submitted() {
    let service = Arc::new(RecordingService::default());
    let harness = spawn_backend(service.clone(), Arc::new(InMemoryLibrary));

    harness
        .cmd_tx
        .send(AppCommand::SetLabel {
            text: "Alice".to_string(),
        })
        .await
        .expect("send");
    wait_for(&harness.ui_rx, |event| {
        matches!(event, UiEvent::DraftChanged(draft) if draft.label == "Alice")
    })
    .await;

    harness
        .cmd_tx
        .send(AppCommand::AcquireImage {
            source: ImageSource::Library,
        })
        .await
        .expect("send");
    wait_for(&harness.ui_rx, |event| {
        matches!(event, UiEvent::DraftChanged(draft) if draft.picked_image.is_some())
    })
    .await;

    harness
        .cmd_tx
        .send(AppCommand::SubmitEnrollment)
        .await
        .expect("send");
    let event = wait_for(&harness.ui_rx, |event| {
        matches!(
            event,
            UiEvent::DraftChanged(draft)
                if matches!(draft.submission, SubmissionState::Succeeded { .. })
        )
    })
    .await;

    let UiEvent::DraftChanged(draft) = event else {
        unreachable!()
    };
    assert_eq!(draft.label, "");
    assert_eq!(draft.picked_image, None);
    assert_eq!(
        draft.submission,
        SubmissionState::Succeeded {
            message: Some("Face added for label 'Alice'".to_string())
        }
    );
    let uploads = service.uploads.lock().expect("uploads lock");
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].filename, "alice.jpg");
    assert_eq!(uploads[0].bytes, vec![0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn snapshot_dropped_on_full_queue_is_resent() {
    let service: Arc<dyn RemoteService> = Arc::new(RecordingService::default());
    let session = Arc::new(StreamSessionController::new(Arc::clone(&service)));
    let enrollment = Arc::new(EnrollmentWorkflow::new(
        service,
        Arc::new(UnavailableCapability),
    ));
    let (ui_tx, ui_rx) = bounded(1);
    ui_tx
        .try_send(UiEvent::Info("occupying the queue".to_string()))
        .expect("queue has room");
    let forwarder = tokio::spawn(forward_snapshots(
        Arc::clone(&session),
        Arc::clone(&enrollment),
        session.subscribe(),
        enrollment.subscribe(),
        ui_tx,
    ));

    assert_eq!(session.start().await.status, StreamStatus::Streaming);
    // Let the forwarder drop Starting and Streaming against the full queue.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(matches!(ui_rx.try_recv(), Ok(UiEvent::Info(_))));

    let event = wait_for(&ui_rx, |event| matches!(event, UiEvent::SessionChanged(_))).await;
    let UiEvent::SessionChanged(resent) = event else {
        unreachable!()
    };
    assert_eq!(resent.status, StreamStatus::Streaming);
    assert_eq!(resent.feed_uri.as_deref(), Some(FEED_URI));
    forwarder.abort();
}

#[tokio::test]
async fn dropping_the_command_sender_stops_the_backend() {
    let harness = spawn_backend(
        Arc::new(RecordingService::default()),
        Arc::new(UnavailableCapability),
    );

    drop(harness.cmd_tx);

    tokio::time::timeout(Duration::from_secs(5), harness.backend)
        .await
        .expect("backend finished in time")
        .expect("backend task");
}

#[test]
fn launched_worker_exits_when_commands_close() {
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let (ui_tx, ui_rx) = unbounded();
    let handle = launch(
        Arc::new(RecordingService::default()),
        Arc::new(UnavailableCapability),
        cmd_rx,
        ui_tx,
    );

    drop(cmd_tx);
    handle.join().expect("backend thread");

    let infos: Vec<_> = ui_rx
        .try_iter()
        .filter_map(|event| match event {
            UiEvent::Info(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(infos, vec!["Backend worker starting...", "Backend worker ready"]);
}
