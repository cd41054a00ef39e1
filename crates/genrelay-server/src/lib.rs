//! genrelay Server Library
//!
//! HTTP front end for the generation relay:
//! - Upstream client for Ollama-compatible `/api/generate` backends
//! - Relay sessions bridging one upstream stream to one caller
//! - axum routes serving relay events as server-sent events

pub mod relay;
pub mod routes;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_helpers;
