use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("service unreachable")]
    NetworkUnreachable,
    #[error("service rejected the request: {0}")]
    ServerRejected(String),
    #[error("service did not respond in time")]
    Timeout,
    /// The picked image could not be read or packaged for upload.
    #[error("image is no longer available")]
    AssetUnavailable,
}

/// Failure attached to the remote operation that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, raw: None }
    }

    pub fn with_raw(kind: ErrorKind, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            kind,
            raw: (!raw.is_empty()).then_some(raw),
        }
    }
}
