//! Upstream generation request.

use serde::Serialize;

use crate::prompt;

/// One request to the generation backend.
///
/// Built once per session and never mutated; serializes to the backend body
/// `{"model": .., "prompt": .., "stream": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    model: String,
    prompt: String,
    #[serde(skip)]
    system: Option<String>,
    stream: bool,
}

impl GenerationRequest {
    /// Build a request, folding `system` (if any) in front of `user_message`.
    pub fn new(
        model: impl Into<String>,
        user_message: &str,
        system: Option<&str>,
        stream: bool,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt::compose(system, user_message),
            system: system.map(String::from),
            stream,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full prompt as sent upstream.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub const fn is_streaming(&self) -> bool {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_body_has_exactly_three_fields() {
        let req = GenerationRequest::new("qwen:0.5b", "hello", Some("sys"), true);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "model": "qwen:0.5b",
                "prompt": "sys\n\n用户: hello\n\n助手: ",
                "stream": true,
            })
        );
    }

    #[test]
    fn plain_request_keeps_message_verbatim() {
        let req = GenerationRequest::new("m", "just this", None, false);
        assert_eq!(req.prompt(), "just this");
        assert_eq!(req.system(), None);
        assert!(!req.is_streaming());
    }
}
