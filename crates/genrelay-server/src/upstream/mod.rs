//! Upstream generation client.
//!
//! A [`GenerationBackend`] opens one connection per request and hands back an
//! [`UpstreamConnection`]: a producer task that pumps fragments into a bounded
//! channel. Dropping the connection aborts the producer and releases whatever
//! the backend was holding (the HTTP response body for [`OllamaClient`]).

mod ollama;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use genrelay_core::{GenerationRequest, RawFragment, Result};

pub use ollama::OllamaClient;

/// Fragments buffered between the producer task and the session.
pub const FRAGMENT_BUFFER: usize = 16;

/// Something that can turn a [`GenerationRequest`] into a fragment stream.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Open a connection for `request`.
    ///
    /// Returns once the backend has accepted the request; connection-level
    /// failures surface here rather than as the first fragment.
    async fn open(&self, request: &GenerationRequest) -> Result<UpstreamConnection>;
}

/// A live upstream response.
///
/// Yields fragments in delivery order. After a terminal fragment or an
/// error the producer stops and the channel closes.
pub struct UpstreamConnection {
    rx: mpsc::Receiver<Result<RawFragment>>,
    producer: JoinHandle<()>,
}

impl UpstreamConnection {
    /// Spawn a producer task that forwards `fragments` until the first
    /// terminal fragment or error.
    pub fn spawn<S>(fragments: S) -> Self
    where
        S: Stream<Item = Result<RawFragment>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let producer = tokio::spawn(async move {
            let mut fragments = std::pin::pin!(fragments);
            while let Some(item) = fragments.next().await {
                let last = item.as_ref().map_or(true, |f| f.done);
                if tx.send(item).await.is_err() {
                    debug!("Upstream consumer gone, stopping producer");
                    break;
                }
                if last {
                    break;
                }
            }
        });
        Self { rx, producer }
    }

    /// A connection that yields exactly one, already complete, fragment.
    pub fn ready(fragment: RawFragment) -> Self {
        Self::spawn(tokio_stream::once(Ok(fragment)))
    }

    /// Next fragment, or `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<Result<RawFragment>> {
        self.rx.recv().await
    }

    /// Drain the connection into one string.
    ///
    /// Fails if the producer stops before a terminal fragment.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(item) = self.next().await {
            let fragment = item?;
            text.push_str(&fragment.text);
            if fragment.done {
                return Ok(text);
            }
        }
        Err(genrelay_core::Error::transport(
            genrelay_core::TransportErrorKind::Dropped,
            "upstream closed without completion",
        ))
    }
}

impl Drop for UpstreamConnection {
    fn drop(&mut self) {
        self.producer.abort();
    }
}
