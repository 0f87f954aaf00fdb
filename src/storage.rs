// src/storage.rs

//! Object storage for uploaded exam pages and mark schemes.
//!
//! Keys are namespaced per user and carry a random component, so uploads
//! cannot collide and other users cannot guess them. The returned URL must be
//! publicly dereferenceable: the grading oracle fetches it too.

use async_trait::async_trait;
use reqwest::header;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

/// Content storage seam. `put` writes the bytes and returns a public URL.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String, AppError>;
}

/// Production store: PUTs to an S3-compatible HTTP endpoint.
pub struct HttpFileStore {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    public_url: String,
}

impl HttpFileStore {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.storage_api_url.trim_end_matches('/').to_string(),
            api_key: config.storage_api_key.clone(),
            public_url: config.storage_public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FileStore for HttpFileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String, AppError> {
        let response = self
            .client
            .put(format!("{}/{}", self.api_url, key))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, mime_type.to_string())
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("Storage PUT for '{}' returned {}", key, response.status());
            return Err(AppError::Upstream("Upload failed".to_string()));
        }

        Ok(format!("{}/{}", self.public_url, key))
    }
}

/// Build a randomized, per-user object key, e.g.
/// `exams/42/6f1a…-paper-scan.png`.
pub fn object_key(prefix: &str, user_id: i64, file_name: &str) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    format!("{}/{}/{}-{}", prefix, user_id, Uuid::new_v4().simple(), safe_name)
}
