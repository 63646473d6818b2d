//! HTTP transport for the camera/enrollment service.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    error::{ErrorInfo, ErrorKind},
    protocol::{ServiceMessage, IMAGE_FIELD, LABEL_FIELD, START_STREAM_PATH, STOP_STREAM_PATH},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("no response within deadline: {0}")]
    Timeout(String),
    #[error("service rejected request with status {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
        body: Option<String>,
    },
    #[error("request could not be encoded: {0}")]
    Encoding(String),
}

impl ServiceError {
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            Self::Unreachable(raw) => ErrorInfo::with_raw(ErrorKind::NetworkUnreachable, raw),
            Self::Timeout(raw) => ErrorInfo::with_raw(ErrorKind::Timeout, raw),
            Self::Rejected { message, body, .. } => ErrorInfo {
                kind: ErrorKind::ServerRejected(message.clone()),
                raw: body.clone(),
            },
            Self::Encoding(raw) => ErrorInfo::with_raw(ErrorKind::AssetUnavailable, raw),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_builder() {
            Self::Encoding(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// A confirmed 2xx answer from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentUpload {
    pub label: String,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn start_stream(&self) -> Result<ServiceReply, ServiceError>;
    async fn stop_stream(&self) -> Result<ServiceReply, ServiceError>;
    async fn add_person(&self, upload: EnrollmentUpload) -> Result<ServiceReply, ServiceError>;
    /// Address of the live feed. Rendered by the host, never polled here.
    fn feed_uri(&self) -> String;
}

pub struct HttpServiceClient {
    http: Client,
    config: ServiceConfig,
}

impl HttpServiceClient {
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn post_control(&self, path: &str) -> Result<ServiceReply, ServiceError> {
        let url = self.config.endpoint(path);
        debug!(%url, "service: post control request");
        let response = self.http.post(&url).send().await.map_err(|err| {
            warn!(%url, "service: control request failed: {err}");
            ServiceError::from(err)
        })?;
        read_reply(response).await
    }
}

#[async_trait]
impl RemoteService for HttpServiceClient {
    async fn start_stream(&self) -> Result<ServiceReply, ServiceError> {
        self.post_control(START_STREAM_PATH).await
    }

    async fn stop_stream(&self) -> Result<ServiceReply, ServiceError> {
        self.post_control(STOP_STREAM_PATH).await
    }

    async fn add_person(&self, upload: EnrollmentUpload) -> Result<ServiceReply, ServiceError> {
        let url = self.config.endpoint(self.config.enrollment_path());
        info!(
            %url,
            label = %upload.label,
            filename = %upload.filename,
            mime_type = %upload.mime_type,
            size_bytes = upload.bytes.len(),
            "service: upload enrollment"
        );
        let image = Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(&upload.mime_type)
            .map_err(|err| ServiceError::Encoding(err.to_string()))?;
        let form = Form::new().text(LABEL_FIELD, upload.label).part(IMAGE_FIELD, image);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                warn!(%url, "service: enrollment upload failed: {err}");
                ServiceError::from(err)
            })?;
        read_reply(response).await
    }

    fn feed_uri(&self) -> String {
        self.config.feed_uri()
    }
}

async fn read_reply(response: Response) -> Result<ServiceReply, ServiceError> {
    let status = response.status();
    if status.is_success() {
        // The body is informational only once the status confirms success.
        let body = response.text().await.unwrap_or_default();
        return Ok(ServiceReply {
            status: status.as_u16(),
            message: ServiceMessage::from_body(&body).message,
        });
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) if err.is_timeout() => return Err(ServiceError::Timeout(err.to_string())),
        Err(_) => String::new(),
    };
    let message = ServiceMessage::from_body(&body)
        .message
        .unwrap_or_else(|| generic_rejection_message(status.as_u16()));
    warn!(status = status.as_u16(), %message, "service: request rejected");
    Err(ServiceError::Rejected {
        status: status.as_u16(),
        message,
        body: (!body.trim().is_empty()).then_some(body),
    })
}

fn generic_rejection_message(status: u16) -> String {
    format!("service responded with status {status}")
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
