//! Drive v3 REST client implementation

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use super::{DriveApi, FOLDER_MIME_TYPE, FileMetadata, StorageResult};
use crate::error::StorageError;

/// Default Google API host
const API_HOST: &str = "https://www.googleapis.com";

/// Metadata fields requested on every fetch/list
const METADATA_FIELDS: &str = "id,name,mimeType,createdTime,trashed";

/// Rate limit: 10 requests per second (Drive per-user quota is 1000 per 100s)
const RATE_LIMIT_PER_SECOND: u32 = 10;

/// Google Drive REST client
pub struct DriveClient {
    http: HttpClient,
    base_url: String,
    upload_url: String,
    token: String,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl DriveClient {
    /// Create a client against the production API host.
    ///
    /// `ROADCREW_DRIVE_HOST` overrides the host for tests.
    pub fn new(token: String) -> StorageResult<Self> {
        let host = std::env::var("ROADCREW_DRIVE_HOST").unwrap_or_else(|_| API_HOST.to_string());
        Self::with_host(token, &host)
    }

    /// Create a client against a specific API host
    pub fn with_host(token: String, host: &str) -> StorageResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let quota = Quota::per_second(std::num::NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let host = host.trim_end_matches('/');
        Ok(Self {
            http,
            base_url: format!("{}/drive/v3", host),
            upload_url: format!("{}/upload/drive/v3", host),
            token,
            rate_limiter,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Map a non-success response to a storage error
    async fn error_for(response: Response) -> StorageError {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => StorageError::Unauthorized,
            StatusCode::FORBIDDEN => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "access denied".to_string());
                StorageError::Forbidden(msg)
            }
            StatusCode::NOT_FOUND => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "resource not found".to_string());
                StorageError::NotFound(msg)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                StorageError::RateLimit(Duration::from_secs(retry_after))
            }
            StatusCode::BAD_REQUEST => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "bad request".to_string());
                StorageError::BadRequest(msg)
            }
            status if status.is_server_error() => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("server error: {}", status));
                StorageError::ServerError(msg)
            }
            _ => StorageError::InvalidResponse(format!("unexpected status code: {}", status)),
        }
    }

    async fn parse_json<T: for<'de> Deserialize<'de>>(response: Response) -> StorageResult<T> {
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| StorageError::InvalidResponse(format!("failed to parse response: {}", e)))
    }

    /// Build the search query for exact-name child folders, escaping quotes
    /// the way the Drive query language requires.
    fn child_query(parent_id: &str, name: &str) -> String {
        let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
        format!(
            "name='{}' and '{}' in parents and mimeType='{}' and trashed=false",
            escaped, parent_id, FOLDER_MIME_TYPE
        )
    }
}

/// Shape of the `files.list` response; `files` is optional so a malformed
/// body surfaces as an explicit error instead of an empty result.
#[derive(Deserialize)]
struct FileListResponse {
    files: Option<Vec<FileMetadata>>,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn get_metadata(&self, file_id: &str) -> StorageResult<FileMetadata> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self
            .http
            .get(&url)
            .query(&[("fields", METADATA_FIELDS), ("supportsAllDrives", "true")])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(StorageError::from)?;

        Self::parse_json(response).await
    }

    async fn list_children(&self, parent_id: &str, name: &str) -> StorageResult<Vec<FileMetadata>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/files", self.base_url);
        let fields = format!("files({})", METADATA_FIELDS);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", Self::child_query(parent_id, name).as_str()),
                ("fields", fields.as_str()),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(StorageError::from)?;

        let listing: FileListResponse = Self::parse_json(response).await?;
        listing.files.ok_or_else(|| {
            StorageError::InvalidResponse("search response missing file list".to_string())
        })
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> StorageResult<String> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/files", self.base_url);
        let body = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });

        let response = self
            .http
            .post(&url)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(StorageError::from)?;

        let created: CreatedFile = Self::parse_json(response).await?;
        log::info!("Created folder '{}' with id {}", name, created.id);
        Ok(created.id)
    }

    async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
        source: &Path,
    ) -> StorageResult<String> {
        self.rate_limiter.until_ready().await;

        // Resumable upload: initiate with metadata, then PUT the content
        let url = format!("{}/files", self.upload_url);
        let metadata = json!({
            "name": name,
            "parents": [parent_id],
        });

        let initiate = self
            .http
            .post(&url)
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .header("Authorization", self.bearer())
            .header("X-Upload-Content-Type", mime_type)
            .json(&metadata)
            .send()
            .await
            .map_err(StorageError::from)?;

        if !initiate.status().is_success() {
            return Err(Self::error_for(initiate).await);
        }

        let session_url = initiate
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                StorageError::InvalidResponse(
                    "upload initiation response missing session location".to_string(),
                )
            })?;

        let file = tokio::fs::File::open(source)
            .await
            .map_err(|e| StorageError::Network(format!("failed to open upload source: {}", e)))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| StorageError::Network(format!("failed to stat upload source: {}", e)))?
            .len();

        let response = self
            .http
            .put(&session_url)
            .header("Authorization", self.bearer())
            .header("Content-Type", mime_type)
            .header("Content-Length", length)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(StorageError::from)?;

        let uploaded: CreatedFile = Self::parse_json(response).await?;
        log::info!("Uploaded file '{}' with id {}", name, uploaded.id);
        Ok(uploaded.id)
    }

    async fn grant_permission(&self, file_id: &str, role: &str, email: &str) -> StorageResult<()> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/files/{}/permissions", self.base_url, file_id);
        let body = json!({
            "role": role,
            "type": "user",
            "emailAddress": email,
        });

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(StorageError::from)?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }
}
