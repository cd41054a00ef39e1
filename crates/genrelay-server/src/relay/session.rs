//! Relay session: one upstream connection → one downstream sink.
//!
//! Data flow:
//! ```text
//! RelayInput → validate → start? → GenerationBackend::open
//!            → UpstreamConnection → transform → sink (bounded mpsc)
//! ```
//!
//! The session owns both ends. It returns (and so drops the upstream
//! connection and the sink sender) right after the terminal event.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use genrelay_core::{Error, RelayEvent, TransportErrorKind, transform};

use super::input::RelayInput;
use super::types::{RelayOptions, RelayOutcome, SessionState};
use crate::upstream::{GenerationBackend, UpstreamConnection};

/// The downstream receiver was dropped.
#[derive(Debug)]
struct SinkClosed;

/// Drives one request from validation to its terminal event.
pub struct RelaySession {
    id: String,
    backend: Arc<dyn GenerationBackend>,
    model: String,
    options: RelayOptions,
    sink: mpsc::Sender<RelayEvent>,
    state: SessionState,
    chunks: usize,
}

impl RelaySession {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        model: impl Into<String>,
        options: RelayOptions,
        sink: mpsc::Sender<RelayEvent>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            backend,
            model: model.into(),
            options,
            sink,
            state: SessionState::Idle,
            chunks: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion.
    pub async fn run(mut self, input: RelayInput) -> RelayOutcome {
        info!(session_id = %self.id, route = input.name(), "Relay session started");

        if let Err(e) = input.validate() {
            let message = e.to_string();
            warn!(session_id = %self.id, error = %message, "Rejecting relay request");
            let _ = self.terminate(RelayEvent::error(message.as_str())).await;
            return RelayOutcome::Rejected { message };
        }

        self.state = SessionState::Connecting;
        if self.options.emit_start && self.push(input.start_event()).await.is_err() {
            return self.cancelled();
        }

        let request = input.to_request(&self.model, true);
        let opened = tokio::select! {
            biased;
            () = self.sink.closed() => None,
            opened = self.backend.open(&request) => Some(opened),
        };
        let mut upstream = match opened {
            None => return self.cancelled(),
            Some(Ok(conn)) => conn,
            Some(Err(e)) => return self.fail(e).await,
        };

        self.state = SessionState::Streaming;
        let outcome = self.pump(&mut upstream).await;
        drop(upstream);
        outcome
    }

    /// Forward fragments until a terminal fragment, an error, or cancellation.
    async fn pump(&mut self, upstream: &mut UpstreamConnection) -> RelayOutcome {
        loop {
            let next = tokio::select! {
                biased;
                () = self.sink.closed() => None,
                next = upstream.next() => Some(next),
            };

            let fragment = match next {
                None => return self.cancelled(),
                Some(Some(Ok(fragment))) => fragment,
                Some(Some(Err(e))) => return self.fail(e).await,
                Some(None) => {
                    return self
                        .fail(Error::transport(
                            TransportErrorKind::Dropped,
                            "upstream closed without completion",
                        ))
                        .await;
                }
            };

            if fragment.done {
                debug!(
                    session_id = %self.id,
                    done_reason = fragment.done_reason.as_deref().unwrap_or(""),
                    eval_count = fragment.eval_count,
                    "Terminal fragment received"
                );
            }

            for event in transform(fragment) {
                if event == RelayEvent::End {
                    return self.complete().await;
                }
                if self.push(event).await.is_err() {
                    return self.cancelled();
                }
            }
        }
    }

    async fn complete(&mut self) -> RelayOutcome {
        let delivered = if self.options.emit_end {
            self.terminate(RelayEvent::End).await
        } else {
            self.state = SessionState::Terminated;
            Ok(())
        };
        if delivered.is_err() {
            return self.cancelled();
        }
        info!(session_id = %self.id, chunks = self.chunks, "Relay session complete");
        RelayOutcome::Completed {
            chunks: self.chunks,
        }
    }

    async fn fail(&mut self, err: Error) -> RelayOutcome {
        let message = err.to_string();
        warn!(
            session_id = %self.id,
            chunks = self.chunks,
            error = %message,
            "Relay session failed"
        );
        if self.terminate(RelayEvent::error(message.as_str())).await.is_err() {
            return self.cancelled();
        }
        RelayOutcome::Failed {
            message,
            chunks: self.chunks,
        }
    }

    fn cancelled(&mut self) -> RelayOutcome {
        self.state = SessionState::Terminated;
        debug!(session_id = %self.id, chunks = self.chunks, "Caller disconnected, relay cancelled");
        RelayOutcome::Cancelled {
            chunks: self.chunks,
        }
    }

    /// Push the terminal event; later calls are no-ops.
    async fn terminate(&mut self, event: RelayEvent) -> Result<(), SinkClosed> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        let result = self.push(event).await;
        self.state = SessionState::Terminated;
        result
    }

    /// Send one event, waiting for sink capacity.
    async fn push(&mut self, event: RelayEvent) -> Result<(), SinkClosed> {
        if self.state == SessionState::Terminated {
            debug!(session_id = %self.id, kind = %event.kind(), "Dropping event after termination");
            return Ok(());
        }
        let is_chunk = matches!(event, RelayEvent::Chunk { .. });
        self.sink.send(event).await.map_err(|_| SinkClosed)?;
        if is_chunk {
            self.chunks += 1;
        }
        Ok(())
    }
}
