//! Session control and face enrollment against the remote camera service.

pub mod capability;
pub mod config;
pub mod enrollment;
pub mod stream_session;
pub mod transport;

#[cfg(test)]
mod tests;

pub use capability::{AccessDecision, MediaCapability, PickOutcome, UnavailableCapability};
pub use config::{ConfigError, ServiceConfig, DEFAULT_REQUEST_TIMEOUT};
pub use enrollment::{EnrollmentWorkflow, ValidationIssue, WorkflowError};
pub use stream_session::StreamSessionController;
pub use transport::{
    EnrollmentUpload, HttpServiceClient, RemoteService, ServiceError, ServiceReply,
};
