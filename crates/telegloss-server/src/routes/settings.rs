use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{RawQuery, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use telegloss::settings::{QuerySettings, SettingsStore, UserSettings};
use telegloss::telegram::TelegramError;
use telegloss::syntax::{builtin_infos, CUSTOM_SYNTAX, DEFAULT_SYNTAX, MAX_AFFIX_LEN};

/// Typed settings from the request's query string
pub fn user_settings(query: Option<&str>) -> UserSettings {
    UserSettings::load(&QuerySettings::parse(query.unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
struct SyntaxRequest {
    syntax: String,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    suffix: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    chat_id: String,
}

async fn list_syntaxes() -> Json<Value> {
    Json(json!({
        "syntaxes": builtin_infos(),
        "default": DEFAULT_SYNTAX,
        "custom": CUSTOM_SYNTAX,
        "max_affix_len": MAX_AFFIX_LEN,
    }))
}

/// Validate a syntax choice and return the query string that persists it
async fn save_syntax(
    RawQuery(query): RawQuery,
    Json(request): Json<SyntaxRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut store = QuerySettings::parse(query.as_deref().unwrap_or_default());
    let mut settings = UserSettings::load(&store);

    if request.syntax == CUSTOM_SYNTAX {
        settings.set_custom_syntax(&request.prefix, &request.suffix)?;
    } else {
        settings.set_builtin_syntax(&request.syntax)?;
    }
    let pattern = settings.pattern()?;
    settings.save(&mut store);

    Ok(Json(json!({
        "query": store.flush(),
        "syntax": settings.syntax,
        "display": pattern.display(),
        "example": pattern.example(),
    })))
}

/// Check the chat with Telegram before saving it as the user's target
async fn save_chat(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = request.chat_id.trim();
    if chat_id.is_empty() {
        return Err(ApiError::BadRequest("chat_id is required".to_string()));
    }
    let bot = state.telegram.clone().ok_or(TelegramError::MissingToken)?;
    let chat = bot.get_chat(chat_id).await?;
    let title = ["title", "username", "first_name"]
        .iter()
        .find_map(|key| chat.get(*key).and_then(Value::as_str))
        .unwrap_or("Unknown")
        .to_string();

    let mut store = QuerySettings::parse(query.as_deref().unwrap_or_default());
    let mut settings = UserSettings::load(&store);
    settings.chat_id = Some(chat_id.to_string());
    settings.save(&mut store);
    tracing::info!(chat_id, "validated telegram chat");

    Ok(Json(json!({
        "query": store.flush(),
        "chat_id": chat_id,
        "chat": chat,
        "message": format!("Valid! Chat: {}", title),
    })))
}

/// Bot identity, which doubles as a token check
async fn bot_info(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let bot = state.telegram.clone().ok_or(TelegramError::MissingToken)?;
    let me = bot.get_me().await?;
    Ok(Json(json!({
        "username": me.get("username"),
        "bot": me,
    })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/syntaxes", get(list_syntaxes))
        .route("/settings/syntax", post(save_syntax))
        .route("/settings/chat", post(save_chat))
        .route("/telegram/bot", get(bot_info))
        .with_state(state)
}
