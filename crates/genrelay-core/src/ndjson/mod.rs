//! NDJSON parser for the upstream generate protocol.
//!
//! This module parses newline-delimited JSON from the backend's
//! `/api/generate` response into `RawFragment`s, implementing a tolerant
//! reader pattern.

mod parser;
mod types;

pub use parser::{parse_complete, parse_line, parse_value};
pub use types::*;
