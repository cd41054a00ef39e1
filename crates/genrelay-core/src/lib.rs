//! `genrelay` Core Library
//!
//! Shared functionality for the generation relay:
//! - NDJSON parsing for the upstream `/api/generate` stream
//! - Relay event model and `data: <json>` framing
//! - Fragment transformer (raw fragment → relay events)
//! - Prompt assembly helpers
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod error;
pub mod event;
pub mod ndjson;
pub mod prompt;
pub mod request;
pub mod tracing_init;
pub mod transform;

pub use config::Config;
pub use error::{Error, Result, TransportErrorKind};
pub use event::RelayEvent;
pub use ndjson::RawFragment;
pub use request::GenerationRequest;
pub use transform::transform;
