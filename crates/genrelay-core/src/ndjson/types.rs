//! Fragment types for the upstream generate stream.

/// One upstream-delivered unit of generated text.
///
/// `text` may be empty. The last fragment of a response has `done` set and
/// may carry trailing text of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFragment {
    pub text: String,
    pub done: bool,
    /// Why the backend stopped (`"stop"`, `"length"`, ...), terminal fragments only.
    pub done_reason: Option<String>,
    /// Number of tokens the backend reports having generated, terminal fragments only.
    pub eval_count: Option<u64>,
}

impl RawFragment {
    /// A non-terminal fragment carrying `text`.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A terminal fragment carrying optional trailing `text`.
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: true,
            ..Self::default()
        }
    }
}
