//! Fixed HTTP contract of the camera/enrollment service.

use serde::{Deserialize, Serialize};

pub const START_STREAM_PATH: &str = "/start_stream";
pub const STOP_STREAM_PATH: &str = "/stop_stream";
pub const VIDEO_FEED_PATH: &str = "/video_feed";
pub const ADD_FACE_PATH: &str = "/add_face";
pub const ADD_PERSON_PATH: &str = "/add_person";

/// Multipart field carrying the person's label.
pub const LABEL_FIELD: &str = "label";
/// Multipart field carrying the image file.
pub const IMAGE_FIELD: &str = "image";
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Optional `{ "message": ... }` body returned by every endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceMessage {
    /// Parses a response body, tolerating empty or non-JSON payloads.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str::<Self>(body)
            .map(|parsed| Self {
                message: parsed
                    .message
                    .map(|message| message.trim().to_string())
                    .filter(|message| !message.is_empty()),
            })
            .unwrap_or_default()
    }
}
