//! Ollama-style `/api/generate` client.
//!
//! Streaming responses are NDJSON, one `{"response", "done"}` object per line;
//! non-streaming responses are a single object with the full text.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio_stream::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use genrelay_core::config::UpstreamConfig;
use genrelay_core::ndjson;
use genrelay_core::{Error, GenerationRequest, RawFragment, Result, TransportErrorKind};

use super::{GenerationBackend, UpstreamConnection};

/// Longest NDJSON line accepted from the backend.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// HTTP client for an Ollama-compatible generation backend.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    generate_url: String,
    response_timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the backend described by `config`.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            generate_url: config.generate_url(),
            response_timeout: Duration::from_secs(config.response_timeout_secs),
        })
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }

    /// POST the request and wait for a successful status line.
    async fn send(&self, request: &GenerationRequest) -> Result<reqwest::Response> {
        let pending = self.http.post(&self.generate_url).json(request).send();

        let resp = match tokio::time::timeout(self.response_timeout, pending).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(classify(&e)),
            Err(_) => {
                return Err(Error::transport(
                    TransportErrorKind::Timeout,
                    format!(
                        "no response from {} within {}s",
                        self.generate_url,
                        self.response_timeout.as_secs()
                    ),
                ));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            return Err(Error::UpstreamProtocol(format!(
                "backend returned {status}: {detail}"
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn open(&self, request: &GenerationRequest) -> Result<UpstreamConnection> {
        let resp = self.send(request).await?;
        info!(
            url = %self.generate_url,
            model = request.model(),
            stream = request.is_streaming(),
            "Upstream connection open"
        );

        if request.is_streaming() {
            return Ok(UpstreamConnection::spawn(fragment_stream(resp)));
        }

        let body = resp.text().await.map_err(|e| {
            Error::transport(TransportErrorKind::Dropped, format!("reading body: {e}"))
        })?;
        Ok(UpstreamConnection::ready(ndjson::parse_complete(&body)?))
    }
}

/// Map a reqwest send error onto the transport taxonomy.
fn classify(e: &reqwest::Error) -> Error {
    let kind = if e.is_connect() {
        TransportErrorKind::ConnectFailed
    } else if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_body() || e.is_decode() {
        TransportErrorKind::Dropped
    } else {
        TransportErrorKind::ConnectFailed
    };
    Error::transport(kind, e.to_string())
}

/// Pull the `error` field out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Turn a streaming response body into fragments.
///
/// Ends after the first `done` fragment. A body that ends or breaks before
/// that yields a `Dropped` transport error.
fn fragment_stream(resp: reqwest::Response) -> impl Stream<Item = Result<RawFragment>> + Send {
    let bytes = resp.bytes_stream().map(|chunk| chunk.map_err(io::Error::other));
    let lines = FramedRead::new(
        StreamReader::new(bytes),
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
    );

    async_stream::stream! {
        let mut lines = std::pin::pin!(lines);
        let mut delivered = 0usize;
        loop {
            match lines.next().await {
                Some(Ok(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match ndjson::parse_line(line) {
                        Ok(fragment) => {
                            let done = fragment.done;
                            delivered += 1;
                            yield Ok(fragment);
                            if done {
                                debug!(delivered, "Upstream stream complete");
                                break;
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            break;
                        }
                    }
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    yield Err(Error::UpstreamProtocol(format!(
                        "fragment exceeds {MAX_LINE_BYTES} bytes"
                    )));
                    break;
                }
                Some(Err(LinesCodecError::Io(e))) if e.kind() == io::ErrorKind::InvalidData => {
                    yield Err(Error::UpstreamProtocol(format!("invalid fragment encoding: {e}")));
                    break;
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    yield Err(Error::transport(
                        TransportErrorKind::Dropped,
                        format!("{e} after {delivered} fragments"),
                    ));
                    break;
                }
                None => {
                    yield Err(Error::transport(
                        TransportErrorKind::Dropped,
                        format!("stream ended after {delivered} fragments without completion"),
                    ));
                    break;
                }
            }
        }
    }
}
