//! Google Drive storage client

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[cfg(test)]
pub mod mock;
pub mod rest;

#[cfg(test)]
pub use mock::MockDriveClient;
pub use rest::DriveClient;

/// MIME type Drive uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage backend operations the core depends on.
///
/// Every method is a network round trip and may fail with any
/// [`StorageError`]; callers decide what is fatal.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch metadata for a single object by id.
    ///
    /// Doubles as the existence probe for cached folder ids: a `NotFound`
    /// or `Forbidden` here means the id is no longer usable.
    async fn get_metadata(&self, file_id: &str) -> StorageResult<FileMetadata>;

    /// List non-trashed child folders of `parent_id` whose name matches
    /// `name` exactly.
    async fn list_children(&self, parent_id: &str, name: &str) -> StorageResult<Vec<FileMetadata>>;

    /// Create a folder named `name` under `parent_id`, returning its id.
    async fn create_folder(&self, name: &str, parent_id: &str) -> StorageResult<String>;

    /// Upload the file at `source` into `parent_id`, returning the new
    /// file's id.
    async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
        source: &Path,
    ) -> StorageResult<String>;

    /// Grant `role` on `file_id` to the user with `email`.
    async fn grant_permission(&self, file_id: &str, role: &str, email: &str) -> StorageResult<()>;
}

/// Metadata for a Drive file or folder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Object id
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// MIME type; folders carry [`FOLDER_MIME_TYPE`]
    #[serde(default)]
    pub mime_type: String,

    /// Creation timestamp (requested for duplicate ordering)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,

    /// Whether the object is in the trash
    #[serde(default)]
    pub trashed: bool,
}

impl FileMetadata {
    /// True when this object is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}
