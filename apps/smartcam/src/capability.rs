//! File-system backed camera and library access for desktop hosts.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use client_core::{AccessDecision, MediaCapability, PickOutcome};
use shared::domain::ImageRef;
use tracing::{debug, warn};
use url::Url;

/// Treats a directory as the photo library and another as the camera roll.
/// Picking returns the most recently modified image in the directory.
pub struct FileSystemCapability {
    library_dir: Option<PathBuf>,
    capture_dir: Option<PathBuf>,
}

impl FileSystemCapability {
    pub fn new(library_dir: Option<PathBuf>, capture_dir: Option<PathBuf>) -> Self {
        Self {
            library_dir,
            capture_dir,
        }
    }

    async fn access(dir: Option<&Path>) -> AccessDecision {
        let Some(dir) = dir else {
            return AccessDecision::Denied;
        };
        match tokio::fs::metadata(dir).await {
            Ok(metadata) if metadata.is_dir() => AccessDecision::Granted,
            Ok(_) => AccessDecision::Denied,
            Err(err) => {
                debug!(dir = %dir.display(), "capability: directory unavailable: {err}");
                AccessDecision::Denied
            }
        }
    }

    async fn newest_image(dir: Option<&Path>) -> PickOutcome {
        let Some(dir) = dir else {
            return PickOutcome::Cancelled;
        };
        match newest_image_in(dir).await {
            Ok(Some(image)) => PickOutcome::Picked(image),
            Ok(None) => {
                debug!(dir = %dir.display(), "capability: no images to pick");
                PickOutcome::Cancelled
            }
            Err(err) => {
                warn!(dir = %dir.display(), "capability: failed to scan directory: {err:#}");
                PickOutcome::Cancelled
            }
        }
    }
}

#[async_trait]
impl MediaCapability for FileSystemCapability {
    async fn request_camera_access(&self) -> AccessDecision {
        Self::access(self.capture_dir.as_deref()).await
    }

    async fn capture_image(&self) -> PickOutcome {
        Self::newest_image(self.capture_dir.as_deref()).await
    }

    async fn request_library_access(&self) -> AccessDecision {
        Self::access(self.library_dir.as_deref()).await
    }

    async fn pick_from_library(&self) -> PickOutcome {
        Self::newest_image(self.library_dir.as_deref()).await
    }

    async fn load_image(&self, image: &ImageRef) -> Result<Vec<u8>> {
        let path = path_from_uri(&image.uri)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read image '{}'", path.display()))
    }
}

/// Builds a reference for a user-supplied image path.
pub fn image_ref_from_path(path: &Path) -> Result<ImageRef> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("image '{}' not found", path.display()))?;
    let metadata = std::fs::metadata(&absolute)
        .with_context(|| format!("failed to inspect image '{}'", absolute.display()))?;
    if !metadata.is_file() {
        bail!("'{}' is not a file", absolute.display());
    }
    describe_image(&absolute, metadata.len())
}

fn describe_image(absolute: &Path, byte_len: u64) -> Result<ImageRef> {
    let uri = Url::from_file_path(absolute)
        .map_err(|_| anyhow!("cannot express '{}' as a file uri", absolute.display()))?;
    let mut image = ImageRef::new(uri.to_string(), byte_len);
    if let Some(name) = absolute.file_name().and_then(|name| name.to_str()) {
        image = image.with_filename(name);
    }
    if let Some(mime) = mime_guess::from_path(absolute).first_raw() {
        image = image.with_mime_type(mime);
    }
    Ok(image)
}

fn path_from_uri(uri: &str) -> Result<PathBuf> {
    let url = Url::parse(uri).with_context(|| format!("invalid image uri '{uri}'"))?;
    if url.scheme() != "file" {
        bail!("unsupported image uri scheme '{}'", url.scheme());
    }
    url.to_file_path()
        .map_err(|_| anyhow!("image uri '{uri}' does not name a local file"))
}

fn is_image_path(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first_raw()
        .is_some_and(|mime| mime.starts_with("image/"))
}

async fn newest_image_in(dir: &Path) -> Result<Option<ImageRef>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list '{}'", dir.display()))?;
    let mut newest: Option<(SystemTime, PathBuf, u64)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !is_image_path(&path) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest
            .as_ref()
            .map_or(true, |(current, _, _)| modified > *current)
        {
            newest = Some((modified, path, metadata.len()));
        }
    }

    let Some((_, path, byte_len)) = newest else {
        return Ok(None);
    };
    let absolute = tokio::fs::canonicalize(&path).await?;
    describe_image(&absolute, byte_len).map(Some)
}

#[cfg(test)]
#[path = "tests/capability_tests.rs"]
mod tests;
