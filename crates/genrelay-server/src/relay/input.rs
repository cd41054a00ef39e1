//! Request shapes accepted by the relay.

use genrelay_core::{Error, GenerationRequest, RelayEvent, Result, prompt};

/// What the caller asked for, before any upstream work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayInput {
    /// Plain chat message.
    Chat { message: String },
    /// Chat with a caller-supplied system preamble.
    ChatWithSystem {
        user_message: String,
        system_prompt: String,
    },
    /// Short article on `topic` in `style`.
    Template { topic: String, style: String },
    /// Code for `requirement` in `language`.
    GenerateCode {
        requirement: String,
        language: String,
    },
    /// Summary of `content`.
    Summarize { content: String },
}

impl RelayInput {
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
        }
    }

    /// Short name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::ChatWithSystem { .. } => "chat_with_system",
            Self::Template { .. } => "chat_template",
            Self::GenerateCode { .. } => "generate_code",
            Self::Summarize { .. } => "summarize",
        }
    }

    /// Reject blank required fields.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Chat { message } => require("message", message),
            Self::ChatWithSystem { user_message, .. } => require("userMessage", user_message),
            Self::Template { topic, style } => {
                require("topic", topic)?;
                require("style", style)
            }
            Self::GenerateCode {
                requirement,
                language,
            } => {
                require("requirement", requirement)?;
                require("language", language)
            }
            Self::Summarize { content } => require("content", content),
        }
    }

    /// `start` event echoing the request fields verbatim.
    pub fn start_event(&self) -> RelayEvent {
        match self {
            Self::Chat { message } => RelayEvent::start([("message", message.as_str())]),
            Self::ChatWithSystem {
                user_message,
                system_prompt,
            } => RelayEvent::start([
                ("userMessage", user_message.as_str()),
                ("systemPrompt", system_prompt.as_str()),
            ]),
            Self::Template { topic, style } => {
                RelayEvent::start([("topic", topic.as_str()), ("style", style.as_str())])
            }
            Self::GenerateCode {
                requirement,
                language,
            } => RelayEvent::start([
                ("requirement", requirement.as_str()),
                ("language", language.as_str()),
            ]),
            Self::Summarize { content } => {
                RelayEvent::start([("content_length", content.chars().count().to_string())])
            }
        }
    }

    /// Build the upstream request for this input.
    pub fn to_request(&self, model: &str, stream: bool) -> GenerationRequest {
        match self {
            Self::Chat { message } => GenerationRequest::new(model, message, None, stream),
            Self::ChatWithSystem {
                user_message,
                system_prompt,
            } => {
                let system = Some(system_prompt.as_str()).filter(|s| !s.trim().is_empty());
                GenerationRequest::new(model, user_message, system, stream)
            }
            Self::Template { topic, style } => {
                GenerationRequest::new(model, &prompt::article_template(topic, style), None, stream)
            }
            Self::GenerateCode {
                requirement,
                language,
            } => GenerationRequest::new(
                model,
                &prompt::code_request(requirement, language),
                Some(prompt::CODE_SYSTEM_PROMPT),
                stream,
            ),
            Self::Summarize { content } => GenerationRequest::new(
                model,
                content,
                Some(prompt::SUMMARY_SYSTEM_PROMPT),
                stream,
            ),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}
