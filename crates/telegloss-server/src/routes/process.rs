use crate::error::ApiError;
use crate::routes::settings::user_settings;
use crate::state::AppState;
use axum::{
    extract::{RawQuery, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use telegloss::marker::{process, OutputFormat};
use telegloss::telegram::TelegramError;

#[derive(Debug, Deserialize)]
struct ProcessRequest {
    text: String,
    /// Overrides the format from the user settings
    #[serde(default)]
    format: Option<OutputFormat>,
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    text: String,
    #[serde(default)]
    chat_id: Option<String>,
}

async fn process_text(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<Value>, ApiError> {
    let settings = user_settings(query.as_deref());
    let pattern = settings.pattern()?;
    let format = request.format.unwrap_or(settings.format);

    let service = state.glossary.lock().await;
    let result = process(&request.text, &pattern, service.glossary(), format);
    let links = result.links(service.glossary());

    Ok(Json(json!({
        "text": result.text,
        "format": format,
        "found_terms": result.found_terms,
        "missing_terms": result.missing_terms,
        "links": links,
    })))
}

/// Process the text for Telegram and post it, linking every found term
async fn send_to_telegram(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(request): Json<SendRequest>,
) -> Result<Json<Value>, ApiError> {
    let bot = state.telegram.clone().ok_or(TelegramError::MissingToken)?;
    let settings = user_settings(query.as_deref());
    let chat_id = request
        .chat_id
        .or(settings.chat_id.clone())
        .or(state.default_chat_id.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("chat_id is required".to_string()))?;
    let pattern = settings.pattern()?;

    let (result, links) = {
        let service = state.glossary.lock().await;
        let result = process(
            &request.text,
            &pattern,
            service.glossary(),
            OutputFormat::Telegram,
        );
        let links = result.links(service.glossary());
        (result, links)
    };

    let message = bot
        .send_formatted_text(chat_id.trim(), &result.text, &links)
        .await?;
    tracing::info!(chat_id = %chat_id, linked = links.len(), "sent message to telegram");

    Ok(Json(json!({
        "sent": true,
        "message_id": message.get("message_id"),
        "found_terms": result.found_terms,
        "missing_terms": result.missing_terms,
    })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/process", post(process_text))
        .route("/telegram/send", post(send_to_telegram))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{json_request, send, state_with, MemoryStore};
    use axum::http::StatusCode;
    use std::sync::Arc;

    async fn app_with_api() -> Router {
        let state = state_with(Arc::new(MemoryStore::default()));
        state
            .glossary
            .lock()
            .await
            .add_term("API", "Application programming interface")
            .await
            .unwrap();
        routes(state)
    }

    #[tokio::test]
    async fn test_process_with_query_settings() {
        let app = app_with_api().await;
        let (status, body) = send(
            app.clone(),
            json_request(
                "POST",
                "/process?syn=%7B%7B%7D%7D&fmt=markdown",
                json!({"text": "The {{api}} and {{SDK}}"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["text"],
            "The [api](https://telegra.ph/API-01) and **SDK**"
        );
        assert_eq!(body["found_terms"], json!(["API"]));
        assert_eq!(body["missing_terms"], json!(["SDK"]));

        // default syntax and telegram format
        let (_, body) = send(
            app,
            json_request("POST", "/process", json!({"text": "Use API<?> here"})),
        )
        .await;
        assert_eq!(body["text"], "Use API here");
        assert_eq!(body["format"], "telegram");
        assert_eq!(body["links"]["API"], "https://telegra.ph/API-01");
    }

    #[tokio::test]
    async fn test_bad_syntax_and_missing_bot() {
        let app = app_with_api().await;
        let (status, _) = send(
            app.clone(),
            json_request("POST", "/process?syn=nope", json!({"text": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            app,
            json_request("POST", "/telegram/send?cid=1", json!({"text": "API<?>"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Bot token is not configured");
    }
}
