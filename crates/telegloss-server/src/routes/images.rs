use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use telegloss::imgbb::MAX_FILE_SIZE_BYTES;

/// Upload the multipart `file` field to imgbb and return its public URL
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("image.png").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let url = state.imgbb.upload(&data, &filename).await?;
        tracing::info!(filename = %filename, size = data.len(), "uploaded image");
        return Ok(Json(json!({ "url": url })));
    }
    Err(ApiError::BadRequest("file is required".to_string()))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/images", post(upload_image))
        // image limit plus multipart framing
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE_BYTES + 64 * 1024))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{send, state_with, MemoryStore};
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::sync::Arc;

    const BOUNDARY: &str = "telegloss-boundary";

    fn multipart_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/images")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_requires_configuration_and_file() {
        let app = routes(state_with(Arc::new(MemoryStore::default())));

        let (status, body) = send(
            app.clone(),
            multipart_request("file", "cat.png", b"\x89PNG\r\n\x1a\n"),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("imgbb API key"));

        let (status, body) = send(app, multipart_request("other", "cat.png", b"x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "file is required");
    }
}
