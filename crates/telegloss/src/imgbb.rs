//! Upload images to imgbb so definitions can embed them.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";
pub const ALLOWED_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "webp"];
pub const MAX_FILE_SIZE_BYTES: usize = 32 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ImgbbError {
    #[error("imgbb API key not configured. Get a free key at https://api.imgbb.com/")]
    NotConfigured,

    #[error("{0}")]
    InvalidImage(String),

    #[error("imgbb error: {0}")]
    Upload(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    error: Option<UploadErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: Option<String>,
    display_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: Option<String>,
}

/// Check the file name and size before uploading
pub fn validate_image(data: &[u8], filename: &str) -> Result<(), ImgbbError> {
    if filename.is_empty() {
        return Err(ImgbbError::InvalidImage("Filename is required".to_string()));
    }
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ImgbbError::InvalidImage(format!(
            "Invalid file type '.{}'. Allowed: {}",
            extension,
            ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    if data.is_empty() {
        return Err(ImgbbError::InvalidImage("File is empty".to_string()));
    }
    if data.len() > MAX_FILE_SIZE_BYTES {
        return Err(ImgbbError::InvalidImage(format!(
            "File too large ({:.1}MB). Maximum: {}MB",
            data.len() as f64 / (1024.0 * 1024.0),
            MAX_FILE_SIZE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

pub struct ImgbbClient {
    client: Client,
    upload_url: String,
    api_key: String,
}

impl ImgbbClient {
    pub fn new<S: Into<String>>(api_key: S) -> Result<Self, ImgbbError> {
        Self::with_url(UPLOAD_URL, api_key)
    }

    pub fn with_url<U: Into<String>, S: Into<String>>(
        upload_url: U,
        api_key: S,
    ) -> Result<Self, ImgbbError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            upload_url: upload_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Upload the image and return its direct URL
    pub async fn upload(&self, data: &[u8], filename: &str) -> Result<String, ImgbbError> {
        if !self.is_configured() {
            return Err(ImgbbError::NotConfigured);
        }
        validate_image(data, filename)?;

        let name = Path::new(filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(filename);
        let form = [
            ("key", self.api_key.clone()),
            ("image", STANDARD.encode(data)),
            ("name", name.to_string()),
        ];

        let response = self.client.post(&self.upload_url).form(&form).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body: String = response.text().await?.chars().take(200).collect();
            return Err(ImgbbError::Upload(format!(
                "imgbb returned status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: UploadResponse = response.json().await?;
        if !body.success {
            let message = body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ImgbbError::Upload(message));
        }

        let url = body
            .data
            .and_then(|data| data.url.or(data.display_url))
            .ok_or_else(|| ImgbbError::Upload("No image URL in imgbb response".to_string()))?;
        tracing::info!(filename, "uploaded image");
        Ok(url)
    }
}
