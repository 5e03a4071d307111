use crate::error::ApiError;
use crate::state::AppState;
use anyhow::anyhow;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use telegloss::errors::GlossaryError;
use telegloss::glossary::GlossaryService;
use telegloss::telegraph::TelegraphClient;

#[derive(Debug, Deserialize)]
struct AccountRequest {
    short_name: String,
    #[serde(default)]
    author_name: Option<String>,
}

/// Register a Telegraph account, create its index page and switch the glossary over to it.
///
/// The returned token and index path are what `TELEGLOSS_TELEGRAPH__ACCESS_TOKEN` and
/// `TELEGLOSS_TELEGRAPH__INDEX_PATH` should be set to for the next start.
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<AccountRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let short_name = request.short_name.trim();
    if short_name.is_empty() {
        return Err(ApiError::BadRequest("short_name is required".to_string()));
    }
    let author_name = request.author_name.as_deref().unwrap_or_default().trim();

    let account =
        TelegraphClient::create_account(&state.telegraph_host, short_name, author_name)
            .await
            .map_err(GlossaryError::ExternalService)?;
    let access_token = account
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            GlossaryError::ExternalService(anyhow!("Telegraph returned no access token"))
        })?;

    let client = TelegraphClient::with_host(state.telegraph_host.as_str(), access_token.as_str())?;
    let mut service = GlossaryService::new(Arc::new(client));
    if !author_name.is_empty() {
        service = service.with_author(author_name);
    }
    let index = service
        .refresh_index()
        .await
        .map_err(GlossaryError::ExternalService)?;

    *state.glossary.lock().await = service;
    tracing::info!(short_name, index_path = %index.path, "created telegraph account");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "access_token": access_token,
            "short_name": account.short_name.as_deref().unwrap_or(short_name),
            "author_name": account.author_name,
            "index_path": index.path,
            "index_url": index.url,
        })),
    ))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/telegraph/account", post(create_account))
        .with_state(state)
}
