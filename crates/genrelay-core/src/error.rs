//! Error types for the genrelay core library.

use std::fmt;

use thiserror::Error;

/// Result type alias using genrelay `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// How an upstream transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    ConnectFailed,
    /// The backend accepted the connection but never answered.
    Timeout,
    /// The connection went away before the terminal fragment.
    Dropped,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::Dropped => write!(f, "connection dropped"),
        }
    }
}

/// Core error types for relay operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or blank required input
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Upstream connection failure
    #[error("Upstream {kind}: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// Malformed or error payload from the backend
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a transport error of the given kind.
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Transport kind, if this is a transport error.
    pub const fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_message_names_kind() {
        let err = Error::transport(TransportErrorKind::Dropped, "eof after 3 lines");
        assert_eq!(
            err.to_string(),
            "Upstream connection dropped: eof after 3 lines"
        );
        assert_eq!(err.transport_kind(), Some(TransportErrorKind::Dropped));
    }

    #[test]
    fn validation_is_not_transport() {
        let err = Error::Validation("message is blank".into());
        assert!(err.is_validation());
        assert_eq!(err.transport_kind(), None);
    }

    #[test]
    fn json_errors_convert_with_question_mark() {
        fn parse(raw: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(raw)?)
        }
        let err = parse("{").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }
}
