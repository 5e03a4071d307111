use crate::error::ApiError;
use crate::routes::settings::user_settings;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{
    stream::{BoxStream, StreamExt},
    Stream,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use telegloss::agent::{event_stream, DEFAULT_STREAM_TIMEOUT};
use telegloss::models::message::ChatMessage;
use telegloss::providers::factory::ProviderType;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    prompt: String,
    #[serde(default)]
    history: Vec<ChatMessage>,
}

/// Server-sent events, one `data: {json}` frame per agent event
struct SseResponse {
    frames: BoxStream<'static, String>,
}

impl SseResponse {
    fn new(frames: BoxStream<'static, String>) -> Self {
        Self { frames }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames
            .poll_next_unpin(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            Body::from_stream(self),
        )
            .into_response()
    }
}

fn requested_provider(state: &AppState, query: Option<&str>) -> ProviderType {
    user_settings(query).provider.unwrap_or(state.ai.provider)
}

async fn chat(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let agent = state
        .agent(requested_provider(&state, query.as_deref()))
        .await?;
    let glossary = state.glossary.lock().await.glossary().clone();

    let response = agent
        .reply(&glossary, &request.history, &request.prompt)
        .await?;
    Ok(Json(json!({ "response": response })))
}

async fn chat_stream(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(request): Json<ChatRequest>,
) -> Result<SseResponse, ApiError> {
    let agent = state
        .agent(requested_provider(&state, query.as_deref()))
        .await?;
    let glossary = state.glossary.lock().await.glossary().clone();

    let rx = agent.reply_streaming(&glossary, &request.history, &request.prompt);
    let frames = event_stream(rx, DEFAULT_STREAM_TIMEOUT)
        .map(|event| match serde_json::to_string(&event) {
            Ok(data) => format!("data: {}\n\n", data),
            Err(e) => {
                tracing::error!("Error encoding stream event: {}", e);
                String::new()
            }
        })
        .boxed();
    Ok(SseResponse::new(frames))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .with_state(state)
}
