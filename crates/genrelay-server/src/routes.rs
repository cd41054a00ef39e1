use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use genrelay_core::Error;

use crate::relay::{RelayInput, RelayOptions, RelaySession};
use crate::upstream::GenerationBackend;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn GenerationBackend>,
    pub model: String,
    /// Framing for every streaming route except `chat-reactive`.
    pub options: RelayOptions,
    pub channel_capacity: usize,
}

const STREAMING_FEATURES: [&str; 6] = [
    "chat",
    "chat-reactive",
    "chat-with-system",
    "chat-template",
    "generate-code",
    "summarize",
];

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/streaming/chat", post(stream_chat))
        .route("/api/streaming/chat-reactive", post(stream_chat_reactive))
        .route("/api/streaming/chat-with-system", post(stream_chat_with_system))
        .route("/api/streaming/chat-template", post(stream_chat_template))
        .route("/api/streaming/generate-code", post(stream_generate_code))
        .route("/api/streaming/summarize", post(stream_summarize))
        .route("/api/streaming/health", get(streaming_health))
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/health", get(ai_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// Missing fields deserialize as empty strings so that validation, not the
// extractor, reports them on the event stream.

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithSystemBody {
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplateBody {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub style: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateCodeBody {
    #[serde(default)]
    pub requirement: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeBody {
    #[serde(default)]
    pub content: String,
}

/// Spawn a relay session and stream its events as SSE `data:` frames.
///
/// The session runs on its own task; when the client disconnects axum drops
/// the response stream, which closes the channel and cancels the session.
fn relay_response(
    state: &AppState,
    options: RelayOptions,
    input: RelayInput,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + use<>> {
    let (tx, rx) = mpsc::channel(state.channel_capacity);
    let session = RelaySession::new(
        Arc::clone(&state.backend),
        state.model.clone(),
        options,
        tx,
    );
    debug!(session_id = session.id(), route = input.name(), "Spawning relay session");
    tokio::spawn(session.run(input));

    let events =
        ReceiverStream::new(rx).map(|event| Ok(Event::default().data(event.to_json())));
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// `POST /api/streaming/chat`
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> impl IntoResponse {
    relay_response(&state, state.options, RelayInput::chat(body.message))
}

/// `POST /api/streaming/chat-reactive`: bare chunk stream, no `start` or `end`.
pub async fn stream_chat_reactive(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> impl IntoResponse {
    relay_response(&state, RelayOptions::bare(), RelayInput::chat(body.message))
}

/// `POST /api/streaming/chat-with-system`
pub async fn stream_chat_with_system(
    State(state): State<AppState>,
    Json(body): Json<ChatWithSystemBody>,
) -> impl IntoResponse {
    let input = RelayInput::ChatWithSystem {
        user_message: body.user_message,
        system_prompt: body.system_prompt,
    };
    relay_response(&state, state.options, input)
}

/// `POST /api/streaming/chat-template`
pub async fn stream_chat_template(
    State(state): State<AppState>,
    Json(body): Json<TemplateBody>,
) -> impl IntoResponse {
    let input = RelayInput::Template {
        topic: body.topic,
        style: body.style,
    };
    relay_response(&state, state.options, input)
}

/// `POST /api/streaming/generate-code`
pub async fn stream_generate_code(
    State(state): State<AppState>,
    Json(body): Json<GenerateCodeBody>,
) -> impl IntoResponse {
    let input = RelayInput::GenerateCode {
        requirement: body.requirement,
        language: body.language,
    };
    relay_response(&state, state.options, input)
}

/// `POST /api/streaming/summarize`
pub async fn stream_summarize(
    State(state): State<AppState>,
    Json(body): Json<SummarizeBody>,
) -> impl IntoResponse {
    let input = RelayInput::Summarize {
        content: body.content,
    };
    relay_response(&state, state.options, input)
}

/// `GET /api/streaming/health`
pub async fn streaming_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.model,
        "features": STREAMING_FEATURES,
    }))
}

/// `POST /api/ai/chat`: whole reply in one JSON response.
pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Response {
    let input = RelayInput::chat(body.message.as_str());
    if let Err(e) = input.validate() {
        return error_response(StatusCode::BAD_REQUEST, &e);
    }

    let request = input.to_request(&state.model, false);
    let reply = match state.backend.open(&request).await {
        Ok(conn) => conn.collect_text().await,
        Err(e) => Err(e),
    };

    match reply {
        Ok(text) => Json(json!({ "message": body.message, "response": text })).into_response(),
        Err(e) => {
            warn!(error = %e, "Non-streaming chat failed");
            error_response(StatusCode::BAD_GATEWAY, &e)
        }
    }
}

/// `GET /api/ai/health`
pub async fn ai_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "model": state.model }))
}

fn error_response(status: StatusCode, err: &Error) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedBackend, Step};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(backend: Arc<ScriptedBackend>) -> Router {
        build_router(AppState {
            backend,
            model: "test-model".into(),
            options: RelayOptions::default(),
            channel_capacity: 8,
        })
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, String) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn blank_streaming_message_never_reaches_backend() {
        let backend = Arc::new(ScriptedBackend::new(vec![Step::Done("x")]));

        let (status, text) =
            post_json(app(backend.clone()), "/api/streaming/chat", r#"{"message":" "}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            text,
            "data: {\"type\":\"error\",\"message\":\"Invalid request: message must not be blank\"}\n\n"
        );
        assert_eq!(backend.opens(), 0);
    }

    #[tokio::test]
    async fn missing_field_is_treated_as_blank() {
        let backend = Arc::new(ScriptedBackend::new(vec![Step::Done("x")]));

        let (_, text) = post_json(
            app(backend.clone()),
            "/api/streaming/chat-template",
            r#"{"topic":"Rust"}"#,
        )
        .await;

        assert!(text.contains("style must not be blank"), "body: {text}");
        assert_eq!(backend.opens(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_by_extractor() {
        let backend = Arc::new(ScriptedBackend::new(vec![Step::Done("x")]));

        let (status, _) = post_json(app(backend.clone()), "/api/streaming/chat", "{not json").await;

        assert!(status.is_client_error());
        assert_eq!(backend.opens(), 0);
    }

    #[tokio::test]
    async fn non_streaming_chat_requests_whole_reply() {
        let backend = Arc::new(ScriptedBackend::new(vec![Step::Done("你好")]));

        let (status, text) =
            post_json(app(backend.clone()), "/api/ai/chat", r#"{"message":"hi"}"#).await;

        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["message"], "hi");
        assert_eq!(value["response"], "你好");
        assert!(!backend.requests()[0].is_streaming());
    }

    #[tokio::test]
    async fn non_streaming_chat_rejects_blank_message() {
        let backend = Arc::new(ScriptedBackend::new(vec![Step::Done("x")]));

        let (status, text) = post_json(app(backend.clone()), "/api/ai/chat", "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("message must not be blank"));
        assert_eq!(backend.opens(), 0);
    }
}
