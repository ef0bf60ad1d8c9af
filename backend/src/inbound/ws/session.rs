//! Per-connection change stream.
//!
//! Forwards every change applied to the library, in commit order, as a JSON
//! text frame. The stream is push-only: clients may ping but must not send
//! data. The server pings every 5s and drops a connection after 10s without
//! client traffic; tests shorten both intervals.

use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{debug, warn};

use crate::domain::ChangeEvent;
use crate::inbound::ws::messages::FeedMessage;

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) async fn handle_ws_session(
    feed: broadcast::Receiver<ChangeEvent>,
    session: Session,
    stream: MessageStream,
) {
    FeedSession::new(feed).run(session, stream).await;
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    UnexpectedData,
    FeedClosed,
    Network(Closed),
}

struct FeedSession {
    feed: broadcast::Receiver<ChangeEvent>,
}

impl FeedSession {
    fn new(feed: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { feed }
    }

    async fn run(mut self, mut session: Session, mut stream: MessageStream) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    Self::handle_heartbeat_tick(&mut session, last_heartbeat).await
                }
                message = stream.recv() => {
                    Self::handle_stream_message(&mut session, &mut last_heartbeat, message).await
                }
                change = self.feed.recv() => {
                    Self::forward_change(&mut session, change).await
                }
            };

            if let Err(error) = result {
                log_shutdown_reason(&error);
                close_session_if_needed(session, close_reason_for(error)).await;
                return;
            }
        }
    }

    async fn handle_heartbeat_tick(
        session: &mut Session,
        last_heartbeat: Instant,
    ) -> Result<(), SessionError> {
        if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
            return Err(SessionError::HeartbeatTimeout);
        }
        session.ping(b"").await.map_err(SessionError::Network)
    }

    async fn handle_stream_message(
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), SessionError> {
        let Some(message) = message else {
            return Err(SessionError::StreamClosed);
        };

        match message.map_err(SessionError::Protocol)? {
            Message::Ping(payload) => {
                *last_heartbeat = Instant::now();
                session.pong(&payload).await.map_err(SessionError::Network)
            }
            Message::Pong(_) | Message::Continuation(_) | Message::Nop => {
                *last_heartbeat = Instant::now();
                Ok(())
            }
            Message::Text(_) | Message::Binary(_) => Err(SessionError::UnexpectedData),
            Message::Close(reason) => Err(SessionError::ClientClosed(reason)),
        }
    }

    async fn forward_change(
        session: &mut Session,
        change: Result<ChangeEvent, RecvError>,
    ) -> Result<(), SessionError> {
        let message = match change {
            Ok(event) => FeedMessage::from(&event),
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "change stream subscriber lagged; asking client to resync");
                FeedMessage::Resync { missed }
            }
            Err(RecvError::Closed) => return Err(SessionError::FeedClosed),
        };
        send_json(session, &message)
            .await
            .map_err(SessionError::Network)
    }
}

async fn send_json<T: serde::Serialize>(session: &mut Session, payload: &T) -> Result<(), Closed> {
    match serde_json::to_string(payload) {
        Ok(body) => session.text(body).await,
        Err(error) => {
            warn!(error = %error, "Failed to serialize change frame");
            Ok(())
        }
    }
}

fn log_shutdown_reason(error: &SessionError) {
    match error {
        SessionError::HeartbeatTimeout => {
            warn!("WebSocket heartbeat timeout; closing connection");
        }
        SessionError::Protocol(error) => {
            warn!(error = %error, "WebSocket protocol error");
        }
        SessionError::Network(error) => {
            warn!(error = %error, "WebSocket send failed; closing connection");
        }
        SessionError::UnexpectedData => {
            warn!("client sent data on the read-only change stream");
        }
        SessionError::FeedClosed => {
            warn!("change feed closed; ending stream");
        }
        SessionError::ClientClosed(_) | SessionError::StreamClosed => {
            debug!("change stream closed by client");
        }
    }
}

fn close_reason_for(error: SessionError) -> Option<Option<CloseReason>> {
    let reason = |code, description: &str| {
        Some(CloseReason {
            code,
            description: Some(description.to_owned()),
        })
    };
    match error {
        SessionError::HeartbeatTimeout => Some(reason(CloseCode::Normal, "heartbeat timeout")),
        SessionError::Protocol(_) => Some(reason(CloseCode::Protocol, "protocol error")),
        SessionError::UnexpectedData => Some(reason(CloseCode::Policy, "read-only stream")),
        SessionError::FeedClosed => Some(reason(CloseCode::Away, "change feed closed")),
        SessionError::ClientClosed(reason) => Some(reason),
        SessionError::StreamClosed | SessionError::Network(_) => None,
    }
}

async fn close_session_if_needed(session: Session, reason: Option<Option<CloseReason>>) {
    let Some(reason) = reason else {
        return;
    };
    if let Err(error) = session.close(reason).await {
        warn!(error = %error, "Failed to close WebSocket session");
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
