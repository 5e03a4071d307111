use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use telegloss::errors::{GlossaryError, SyntaxError};
use telegloss::imgbb::ImgbbError;
use telegloss::telegram::TelegramError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable carrying a dotted settings key, e.g. `telegraph.access_token`
pub fn to_env_var(field_path: &str) -> String {
    let key = field_path
        .split('.')
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("__");
    format!("TELEGLOSS_{}", key)
}

/// Errors returned by the HTTP handlers, rendered as `{error, hint}` JSON
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Glossary(#[from] GlossaryError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Image(#[from] ImgbbError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Glossary(GlossaryError::TermExists(_)) => StatusCode::CONFLICT,
            ApiError::Glossary(GlossaryError::TermNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Glossary(GlossaryError::VerificationMismatch { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Glossary(GlossaryError::ExternalService(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Syntax(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Telegram(TelegramError::MissingToken) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Telegram(_) => StatusCode::BAD_GATEWAY,
            ApiError::Image(ImgbbError::NotConfigured) | ApiError::NotConfigured(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Image(ImgbbError::InvalidImage(_)) => StatusCode::BAD_REQUEST,
            ApiError::Image(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            ApiError::Glossary(GlossaryError::VerificationMismatch { .. }) => {
                Some("Try deleting this term and creating it again.".to_string())
            }
            ApiError::Telegram(e) => e.hint().map(str::to_string),
            ApiError::NotConfigured(what) => Some(format!(
                "Set the {} credentials in the environment and restart",
                what
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = json!({
            "error": self.to_string(),
            "hint": self.hint(),
        });
        (status, Json(body)).into_response()
    }
}
