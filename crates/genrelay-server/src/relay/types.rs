//! Relay module types.

use genrelay_core::config::RelayConfig;

/// Lifecycle of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    /// Absorbing: nothing is pushed after this.
    Terminated,
}

/// Per-session framing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Push a `start` event echoing the request before connecting.
    pub emit_start: bool,
    /// Push an explicit `end` event on completion. When off, closing the
    /// stream is the only completion signal.
    pub emit_end: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            emit_start: true,
            emit_end: true,
        }
    }
}

impl RelayOptions {
    /// Bare chunk stream, no `start` or `end` framing.
    pub const fn bare() -> Self {
        Self {
            emit_start: false,
            emit_end: false,
        }
    }
}

impl From<&RelayConfig> for RelayOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            emit_start: config.emit_start,
            emit_end: config.emit_end,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream completed and the terminal event (if enabled) was delivered.
    Completed { chunks: usize },
    /// An upstream or transport error was reported as an `error` event.
    Failed { message: String, chunks: usize },
    /// Input was invalid; no upstream connection was opened.
    Rejected { message: String },
    /// The caller went away before the session finished.
    Cancelled { chunks: usize },
}
