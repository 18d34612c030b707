//! External media-store client.
//!
//! Profile images live in an external hosting service; uploads ship the file
//! as a base64 data URI, deletions go by the store's public id.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

/// Media-store errors.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media store rejected the request: {0}")]
    Rejected(String),
}

/// Hosted image handle returned by the store.
#[derive(Debug, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

/// Client for the external image-hosting API.
#[derive(Clone)]
pub struct MediaStore {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl MediaStore {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Upload an image, returning the hosted URL and public id.
    pub async fn upload(
        &self,
        bytes: &[u8],
        content_type: &str,
        folder: &str,
    ) -> Result<UploadedMedia, MediaError> {
        let data_uri = format!("data:{content_type};base64,{}", STANDARD.encode(bytes));
        let response = self
            .http
            .post(format!("{}/upload", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "file": data_uri, "folder": folder }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MediaError::Rejected(response.status().to_string()));
        }
        Ok(response.json().await?)
    }

    /// Delete a hosted image by its public id.
    pub async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let response = self
            .http
            .post(format!("{}/destroy", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "public_id": public_id }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MediaError::Rejected(response.status().to_string()));
        }
        Ok(())
    }
}
