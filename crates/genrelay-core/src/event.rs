//! Relay events and their downstream wire form.
//!
//! Every event serializes to one JSON object `{"type": <kind>, ...}` and is
//! framed for the event stream as `data: <json>\n\n`. Serialization goes
//! through `serde_json`, so generated quotes, newlines and control characters
//! are escaped and cannot break the framing.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Event kind tag, the value of the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Chunk,
    Error,
    End,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Chunk => "chunk",
            Self::Error => "error",
            Self::End => "end",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event pushed to the downstream sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Echo of the request fields, in the order given.
    Start { fields: Vec<(String, String)> },
    /// A piece of generated text.
    Chunk { text: String },
    /// Terminal failure.
    Error { message: String },
    /// Terminal success.
    End,
}

impl RelayEvent {
    pub fn start<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Start {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Chunk { .. } => EventKind::Chunk,
            Self::Error { .. } => EventKind::Error,
            Self::End => EventKind::End,
        }
    }

    /// `end` and `error` close a session.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::End)
    }

    /// Serialize to the JSON object carried by one `data:` line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Full event-stream frame: `data: <json>\n\n`.
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}

/// `type` comes first, then the payload fields in their given order.
impl Serialize for RelayEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload_len = match self {
            Self::Start { fields } => fields.len(),
            Self::Chunk { .. } | Self::Error { .. } => 1,
            Self::End => 0,
        };
        let mut map = serializer.serialize_map(Some(1 + payload_len))?;
        map.serialize_entry("type", self.kind().as_str())?;
        match self {
            Self::Start { fields } => {
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
            }
            Self::Chunk { text } => map.serialize_entry("content", text)?,
            Self::Error { message } => map.serialize_entry("message", message)?,
            Self::End => {}
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(event: &RelayEvent) -> Value {
        serde_json::from_str(&event.to_json()).unwrap()
    }

    #[test]
    fn chunk_escapes_quotes_backslashes_and_newlines() {
        assert_eq!(
            RelayEvent::chunk("a\\b\"c\nd\re\tf").to_json(),
            r#"{"type":"chunk","content":"a\\b\"c\nd\re\tf"}"#
        );
    }

    #[test]
    fn chunk_leaves_unicode_alone() {
        assert_eq!(
            RelayEvent::chunk("用户: héllo ✓").to_json(),
            r#"{"type":"chunk","content":"用户: héllo ✓"}"#
        );
    }

    #[test]
    fn chunk_escapes_other_controls() {
        let ev = RelayEvent::chunk("x\u{1}y\u{1f}");
        assert_eq!(ev.to_json(), r#"{"type":"chunk","content":"x\u0001y\u001f"}"#);
        assert_eq!(parse(&ev)["content"], "x\u{1}y\u{1f}");
    }

    #[test]
    fn chunk_with_quotes_and_newlines_is_valid_json() {
        let text = "He said \"hi\"\nthen C:\\path\t\r";
        let v = parse(&RelayEvent::chunk(text));
        assert_eq!(v["type"], "chunk");
        assert_eq!(v["content"], text);
    }

    #[test]
    fn end_has_only_type() {
        assert_eq!(RelayEvent::End.to_json(), r#"{"type":"end"}"#);
    }

    #[test]
    fn error_carries_message() {
        let v = parse(&RelayEvent::error("Upstream timed out: 10s"));
        assert_eq!(v["type"], "error");
        assert_eq!(v["message"], "Upstream timed out: 10s");
    }

    #[test]
    fn start_echoes_fields_in_order() {
        let ev = RelayEvent::start([("userMessage", "hi \"there\""), ("systemPrompt", "be brief")]);
        assert_eq!(
            ev.to_json(),
            r#"{"type":"start","userMessage":"hi \"there\"","systemPrompt":"be brief"}"#
        );
    }

    #[test]
    fn sse_frame_is_single_data_line() {
        let frame = RelayEvent::chunk("line1\nline2").to_sse_frame();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("}\n\n"));
        assert_eq!(frame.matches('\n').count(), 2);
    }

    #[test]
    fn terminal_kinds() {
        assert!(RelayEvent::End.is_terminal());
        assert!(RelayEvent::error("x").is_terminal());
        assert!(!RelayEvent::chunk("x").is_terminal());
        assert!(!RelayEvent::start(Vec::<(String, String)>::new()).is_terminal());
    }
}
