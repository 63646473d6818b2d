//! Start/stop state machine for the remote camera feed.

use std::sync::Arc;

use shared::domain::{StreamSession, StreamStatus};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::transport::{RemoteService, ServiceError, ServiceReply};

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamAction {
    Start,
    Stop,
}

impl StreamAction {
    fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    fn required_status(self) -> StreamStatus {
        match self {
            Self::Start => StreamStatus::Idle,
            Self::Stop => StreamStatus::Streaming,
        }
    }

    fn in_flight_status(self) -> StreamStatus {
        match self {
            Self::Start => StreamStatus::Starting,
            Self::Stop => StreamStatus::Stopping,
        }
    }
}

/// Issued when a remote call starts; completions carrying an outdated
/// generation are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestTicket {
    action: StreamAction,
    generation: u64,
}

struct SessionState {
    session: StreamSession,
    generation: u64,
    /// Feed address held back while a stop is in flight.
    retained_feed: Option<String>,
}

pub struct StreamSessionController {
    service: Arc<dyn RemoteService>,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<StreamSession>,
}

impl StreamSessionController {
    pub fn new(service: Arc<dyn RemoteService>) -> Self {
        let (events, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            service,
            inner: Mutex::new(SessionState {
                session: StreamSession::idle(),
                generation: 0,
                retained_feed: None,
            }),
            events,
        }
    }

    pub async fn snapshot(&self) -> StreamSession {
        self.inner.lock().await.session.clone()
    }

    /// Receives every published session transition.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamSession> {
        self.events.subscribe()
    }

    /// Asks the service to start streaming. A no-op unless the session is idle.
    pub async fn start(&self) -> StreamSession {
        let Some(ticket) = self.begin(StreamAction::Start).await else {
            return self.snapshot().await;
        };
        let result = self.service.start_stream().await;
        self.complete(ticket, result).await
    }

    /// Asks the service to stop streaming. A no-op unless the session is streaming.
    pub async fn stop(&self) -> StreamSession {
        let Some(ticket) = self.begin(StreamAction::Stop).await else {
            return self.snapshot().await;
        };
        let result = self.service.stop_stream().await;
        self.complete(ticket, result).await
    }

    pub(crate) async fn begin(&self, action: StreamAction) -> Option<RequestTicket> {
        let mut guard = self.inner.lock().await;
        if guard.session.status != action.required_status() {
            debug!(
                action = action.name(),
                status = ?guard.session.status,
                "stream: ignoring request outside its valid state"
            );
            return None;
        }

        guard.generation += 1;
        guard.session.status = action.in_flight_status();
        if action == StreamAction::Stop {
            guard.retained_feed = guard.session.feed_uri.take();
        }
        let ticket = RequestTicket {
            action,
            generation: guard.generation,
        };
        info!(
            action = action.name(),
            generation = ticket.generation,
            "stream: request issued"
        );
        self.publish(&guard.session);
        Some(ticket)
    }

    pub(crate) async fn complete(
        &self,
        ticket: RequestTicket,
        result: Result<ServiceReply, ServiceError>,
    ) -> StreamSession {
        let mut guard = self.inner.lock().await;
        if guard.generation != ticket.generation {
            warn!(
                action = ticket.action.name(),
                ticket_generation = ticket.generation,
                current_generation = guard.generation,
                "stream: discarding stale response"
            );
            return guard.session.clone();
        }

        guard.generation += 1;
        let retained_feed = guard.retained_feed.take();
        let session = &mut guard.session;
        match (ticket.action, result) {
            (StreamAction::Start, Ok(reply)) => {
                session.status = StreamStatus::Streaming;
                session.feed_uri = Some(self.service.feed_uri());
                session.last_error = None;
                info!(
                    status = reply.status,
                    message = reply.message.as_deref().unwrap_or_default(),
                    "stream: started"
                );
            }
            (StreamAction::Start, Err(err)) => {
                session.status = StreamStatus::Idle;
                session.feed_uri = None;
                session.last_error = Some(err.to_error_info());
                warn!("stream: start failed: {err}");
            }
            (StreamAction::Stop, Ok(reply)) => {
                session.status = StreamStatus::Idle;
                session.feed_uri = None;
                session.last_error = None;
                info!(
                    status = reply.status,
                    message = reply.message.as_deref().unwrap_or_default(),
                    "stream: stopped"
                );
            }
            (StreamAction::Stop, Err(err)) => {
                // An unconfirmed stop leaves the feed live.
                session.status = StreamStatus::Streaming;
                session.feed_uri = retained_feed.or_else(|| Some(self.service.feed_uri()));
                session.last_error = Some(err.to_error_info());
                warn!("stream: stop failed, keeping feed: {err}");
            }
        }

        let snapshot = guard.session.clone();
        self.publish(&snapshot);
        snapshot
    }

    fn publish(&self, session: &StreamSession) {
        // No subscribers is fine; snapshots stay readable through `snapshot`.
        let _ = self.events.send(session.clone());
    }
}

#[cfg(test)]
#[path = "tests/stream_session_tests.rs"]
mod tests;
