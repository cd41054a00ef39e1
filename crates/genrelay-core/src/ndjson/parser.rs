//! NDJSON parser for the upstream generate protocol.
//!
//! Implements tolerant reader pattern: unknown fields ignored, missing
//! `response`/`done` default to empty/false as long as one of them is present.

use serde_json::Value;

use super::types::RawFragment;
use crate::error::{Error, Result};

/// Parse a single NDJSON line from the backend's streaming response.
pub fn parse_line(line: &str) -> Result<RawFragment> {
    let raw: Value = serde_json::from_str(line)
        .map_err(|e| Error::UpstreamProtocol(format!("Malformed fragment: {e}")))?;
    parse_value(&raw)
}

/// Parse a complete (non-streaming) response body.
///
/// The body has the same shape as a streamed line; the result is always
/// marked complete, whatever `done` says.
pub fn parse_complete(body: &str) -> Result<RawFragment> {
    let mut fragment = parse_line(body.trim())?;
    fragment.done = true;
    Ok(fragment)
}

/// Parse a JSON value into a fragment.
pub fn parse_value(raw: &Value) -> Result<RawFragment> {
    let Some(obj) = raw.as_object() else {
        return Err(Error::UpstreamProtocol(
            "Fragment is not a JSON object".into(),
        ));
    };

    if let Some(err) = obj.get("error") {
        let message = err
            .as_str()
            .map_or_else(|| err.to_string(), String::from);
        return Err(Error::UpstreamProtocol(message));
    }

    let response = obj.get("response");
    let done = obj.get("done");
    if response.is_none() && done.is_none() {
        return Err(Error::UpstreamProtocol(
            "Fragment has neither 'response' nor 'done'".into(),
        ));
    }

    let text = match response {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(Error::UpstreamProtocol(format!(
                "'response' must be a string, got {other}"
            )));
        }
    };

    let done = match done {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(Error::UpstreamProtocol(format!(
                "'done' must be a boolean, got {other}"
            )));
        }
    };

    let done_reason = obj
        .get("done_reason")
        .and_then(|v| v.as_str())
        .map(String::from);
    let eval_count = obj.get("eval_count").and_then(Value::as_u64);

    Ok(RawFragment {
        text,
        done,
        done_reason,
        eval_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_streaming_delta() {
        let json = r#"{"model":"qwen:0.5b","created_at":"2024-05-01T10:00:00Z","response":"He","done":false}"#;
        let frag = parse_line(json).unwrap();
        assert_eq!(frag, RawFragment::delta("He"));
    }

    #[test]
    fn parse_terminal_fragment_with_stats() {
        let json = r#"{"model":"qwen:0.5b","response":"","done":true,"done_reason":"stop","eval_count":42,"total_duration":123}"#;
        let frag = parse_line(json).unwrap();
        assert!(frag.done);
        assert!(frag.text.is_empty());
        assert_eq!(frag.done_reason.as_deref(), Some("stop"));
        assert_eq!(frag.eval_count, Some(42));
    }

    #[test]
    fn tolerant_reader_defaults_missing_done() {
        let frag = parse_line(r#"{"response":"x","context":[1,2,3]}"#).unwrap();
        assert_eq!(frag, RawFragment::delta("x"));
    }

    #[test]
    fn error_object_is_protocol_error() {
        let err = parse_line(r#"{"error":"model 'nope' not found"}"#).unwrap_err();
        assert!(matches!(err, Error::UpstreamProtocol(ref m) if m == "model 'nope' not found"));
    }

    #[test]
    fn malformed_line_is_protocol_error() {
        let err = parse_line(r#"{"response":"unterminated"#).unwrap_err();
        assert!(matches!(err, Error::UpstreamProtocol(_)));
    }

    #[test]
    fn object_without_known_fields_is_rejected() {
        assert!(parse_line(r#"{"model":"m"}"#).is_err());
        assert!(parse_line("[1,2]").is_err());
    }

    #[test]
    fn wrong_field_types_are_rejected() {
        assert!(parse_line(r#"{"response":5,"done":false}"#).is_err());
        assert!(parse_line(r#"{"response":"a","done":"yes"}"#).is_err());
    }

    #[test]
    fn complete_body_is_always_terminal() {
        let frag = parse_complete("{\"response\":\"full answer\",\"done\":false}\n").unwrap();
        assert!(frag.done);
        assert_eq!(frag.text, "full answer");
    }
}
