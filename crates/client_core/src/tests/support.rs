//! Scripted service and capability doubles shared by the controller tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::ImageRef;
use tokio::sync::Semaphore;

use crate::{
    capability::{AccessDecision, MediaCapability, PickOutcome},
    transport::{EnrollmentUpload, RemoteService, ServiceError, ServiceReply},
};

pub(crate) const FEED_URI: &str = "http://cam.test/video_feed";

pub(crate) fn ok_reply() -> Result<ServiceReply, ServiceError> {
    Ok(ServiceReply {
        status: 200,
        message: None,
    })
}

pub(crate) fn rejected(message: &str) -> Result<ServiceReply, ServiceError> {
    Err(ServiceError::Rejected {
        status: 400,
        message: message.to_string(),
        body: Some(format!(r#"{{"message":"{message}"}}"#)),
    })
}

pub(crate) fn timed_out() -> Result<ServiceReply, ServiceError> {
    Err(ServiceError::Timeout("operation timed out".to_string()))
}

pub(crate) fn unreachable() -> Result<ServiceReply, ServiceError> {
    Err(ServiceError::Unreachable("connection refused".to_string()))
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    start_outcomes: Mutex<VecDeque<Result<ServiceReply, ServiceError>>>,
    stop_outcomes: Mutex<VecDeque<Result<ServiceReply, ServiceError>>>,
    enroll_outcomes: Mutex<VecDeque<Result<ServiceReply, ServiceError>>>,
    pub(crate) start_calls: AtomicUsize,
    pub(crate) stop_calls: AtomicUsize,
    pub(crate) enroll_calls: AtomicUsize,
    pub(crate) uploads: Mutex<Vec<EnrollmentUpload>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call waits for a permit released through the returned semaphore.
    pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let service = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (service, gate)
    }

    pub(crate) fn push_start(&self, outcome: Result<ServiceReply, ServiceError>) {
        self.start_outcomes.lock().expect("lock").push_back(outcome);
    }

    pub(crate) fn push_stop(&self, outcome: Result<ServiceReply, ServiceError>) {
        self.stop_outcomes.lock().expect("lock").push_back(outcome);
    }

    pub(crate) fn push_enroll(&self, outcome: Result<ServiceReply, ServiceError>) {
        self.enroll_outcomes.lock().expect("lock").push_back(outcome);
    }

    pub(crate) fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
    }

    fn next(queue: &Mutex<VecDeque<Result<ServiceReply, ServiceError>>>) -> Result<ServiceReply, ServiceError> {
        queue.lock().expect("lock").pop_front().unwrap_or_else(ok_reply)
    }
}

#[async_trait]
impl RemoteService for ScriptedService {
    async fn start_stream(&self) -> Result<ServiceReply, ServiceError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        Self::next(&self.start_outcomes)
    }

    async fn stop_stream(&self) -> Result<ServiceReply, ServiceError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        Self::next(&self.stop_outcomes)
    }

    async fn add_person(&self, upload: EnrollmentUpload) -> Result<ServiceReply, ServiceError> {
        self.enroll_calls.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().expect("lock").push(upload);
        self.wait_for_gate().await;
        Self::next(&self.enroll_outcomes)
    }

    fn feed_uri(&self) -> String {
        FEED_URI.to_string()
    }
}

pub(crate) fn jpeg_ref(name: &str) -> ImageRef {
    ImageRef::new(format!("file:///photos/{name}"), 4)
        .with_filename(name)
        .with_mime_type("image/jpeg")
}

/// In-memory capability with fixed access decisions and pick results.
pub(crate) struct FakeCapability {
    pub(crate) camera_access: AccessDecision,
    pub(crate) library_access: AccessDecision,
    pub(crate) capture: PickOutcome,
    pub(crate) library_pick: PickOutcome,
    pub(crate) image_bytes: Option<Vec<u8>>,
    pub(crate) capture_calls: AtomicUsize,
}

impl FakeCapability {
    pub(crate) fn granting(image: ImageRef) -> Self {
        Self {
            camera_access: AccessDecision::Granted,
            library_access: AccessDecision::Granted,
            capture: PickOutcome::Picked(image.clone()),
            library_pick: PickOutcome::Picked(image),
            image_bytes: Some(vec![0xFF, 0xD8, 0xFF, 0xD9]),
            capture_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaCapability for FakeCapability {
    async fn request_camera_access(&self) -> AccessDecision {
        self.camera_access
    }

    async fn capture_image(&self) -> PickOutcome {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        self.capture.clone()
    }

    async fn request_library_access(&self) -> AccessDecision {
        self.library_access
    }

    async fn pick_from_library(&self) -> PickOutcome {
        self.library_pick.clone()
    }

    async fn load_image(&self, image: &ImageRef) -> Result<Vec<u8>> {
        self.image_bytes
            .clone()
            .ok_or_else(|| anyhow!("{} was removed", image.uri))
    }
}
