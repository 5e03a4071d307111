use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    search: String,
}

#[derive(Debug, Deserialize)]
struct AddTermRequest {
    term: String,
    definition: String,
}

#[derive(Debug, Deserialize)]
struct UpdateTermRequest {
    /// New name; omitted keeps the current one
    #[serde(default)]
    term: Option<String>,
    definition: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReloadRequest {
    #[serde(default)]
    index_path: Option<String>,
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

async fn list_terms(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let service = state.glossary.lock().await;
    let terms = service.search(query.search.trim());
    Json(json!({
        "count": terms.len(),
        "total": service.glossary().len(),
        "terms": terms,
        "index_path": service.index_path(),
    }))
}

async fn add_term(
    State(state): State<AppState>,
    Json(request): Json<AddTermRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let term = required(&request.term, "term")?;
    let definition = required(&request.definition, "definition")?;

    let mut service = state.glossary.lock().await;
    let entry = service.add_term(&term, &definition).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"entry": entry, "index_path": service.index_path()})),
    ))
}

async fn update_term(
    State(state): State<AppState>,
    Path(term): Path<String>,
    Json(request): Json<UpdateTermRequest>,
) -> Result<Json<Value>, ApiError> {
    let new_term = match request.term.as_deref() {
        Some(name) => required(name, "term")?,
        None => term.clone(),
    };
    let definition = required(&request.definition, "definition")?;

    let mut service = state.glossary.lock().await;
    let entry = service.update_term(&term, &new_term, &definition).await?;
    Ok(Json(json!({"entry": entry, "index_path": service.index_path()})))
}

async fn delete_term(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut service = state.glossary.lock().await;
    let entry = service.delete_term(&term).await?;
    Ok(Json(json!({"entry": entry, "index_path": service.index_path()})))
}

async fn reload(
    State(state): State<AppState>,
    request: Option<Json<ReloadRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let mut service = state.glossary.lock().await;
    let index_path = request
        .index_path
        .filter(|p| !p.trim().is_empty())
        .or_else(|| service.index_path().map(str::to_string))
        .ok_or_else(|| ApiError::BadRequest("index_path is required".to_string()))?;

    let count = service.load(index_path.trim()).await?;
    Ok(Json(json!({"count": count, "index_path": service.index_path()})))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/glossary", get(list_terms).post(add_term))
        .route("/glossary/:term", put(update_term).delete(delete_term))
        .route("/glossary/reload", post(reload))
        .with_state(state)
}
