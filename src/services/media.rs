// SPDX-License-Identifier: MIT

//! Remote media host client and local upload staging.
//!
//! The media host contract is a single call: hand it a locally staged file,
//! get back a hosted URL or a failure. The staged file is removed on every
//! exit path, success or failure, via the [`StagedFile`] guard.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::AppError;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    /// Public URL of the hosted file
    pub url: String,
}

/// External media host: `store(localPath) -> {url} | failure`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, local_path: &Path) -> Result<StoredMedia, AppError>;
}

/// HTTP client for the media host.
#[derive(Clone)]
pub struct HttpMediaStore {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Upload response from the media host.
#[derive(Deserialize)]
struct UploadResponse {
    /// Preferred HTTPS URL
    secure_url: Option<String>,
    url: Option<String>,
}

impl HttpMediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn store(&self, local_path: &Path) -> Result<StoredMedia, AppError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| AppError::Upload(format!("Cannot read staged file: {}", e)))?;

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("api_secret", self.api_secret.clone())
            .text("resource_type", "auto")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let url = format!("{}/{}/auto/upload", self.base_url, self.cloud_name);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Media host request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!(
                "Media host returned {}: {}",
                status, body
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("Media host response unreadable: {}", e)))?;

        let hosted = parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| AppError::Upload("Media host returned no URL".to_string()))?;

        Ok(StoredMedia { url: hosted })
    }
}

/// A temp file staged for upload, removed when dropped.
///
/// Scoped acquisition/release: stage, attempt the upload, and the local
/// file is gone regardless of which way the upload went.
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Write `bytes` to a uniquely named file in the system temp directory.
    pub async fn create(original_name: &str, bytes: &[u8]) -> Result<Self, AppError> {
        // Keep only the extension from the client-supplied name.
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let path =
            std::env::temp_dir().join(format!("vidstream-{}.{}", Uuid::new_v4(), extension));

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cannot stage upload: {}", e)))?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged file");
        }
    }
}
