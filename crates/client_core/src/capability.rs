//! Device capabilities for acquiring face images.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::ImageRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Picked(ImageRef),
    Cancelled,
}

/// Permissioned camera and photo-library access provided by the host platform.
#[async_trait]
pub trait MediaCapability: Send + Sync {
    async fn request_camera_access(&self) -> AccessDecision;
    async fn capture_image(&self) -> PickOutcome;
    async fn request_library_access(&self) -> AccessDecision;
    async fn pick_from_library(&self) -> PickOutcome;
    /// Reads the bytes behind a reference handed out by this capability.
    async fn load_image(&self, image: &ImageRef) -> Result<Vec<u8>>;
}

/// Capability for hosts without camera or library support.
pub struct UnavailableCapability;

#[async_trait]
impl MediaCapability for UnavailableCapability {
    async fn request_camera_access(&self) -> AccessDecision {
        AccessDecision::Denied
    }

    async fn capture_image(&self) -> PickOutcome {
        PickOutcome::Cancelled
    }

    async fn request_library_access(&self) -> AccessDecision {
        AccessDecision::Denied
    }

    async fn pick_from_library(&self) -> PickOutcome {
        PickOutcome::Cancelled
    }

    async fn load_image(&self, image: &ImageRef) -> Result<Vec<u8>> {
        Err(anyhow!("no media backend available to read {}", image.uri))
    }
}
