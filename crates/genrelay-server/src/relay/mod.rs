//! Relay module: bridges an upstream generation stream to a caller's event stream.
//!
//! This is the "glue" that connects:
//! - `GenerationBackend` (upstream connection, fragment channel)
//! - `genrelay_core::transform` (fragment → relay events)
//! - the downstream sink (bounded channel read by the HTTP response)

mod input;
mod session;
mod types;


pub use input::RelayInput;
pub use session::RelaySession;
pub use types::*;
