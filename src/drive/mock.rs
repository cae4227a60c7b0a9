//! Mock Drive client for testing
//!
//! In-memory implementation of [`DriveApi`] with preloadable folder state,
//! call counting, and scripted failures. No network involved.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{DriveApi, FOLDER_MIME_TYPE, FileMetadata, StorageResult};
use crate::error::StorageError;

/// Mock Drive client.
///
/// Preload folders with builder methods, then assert against call counts
/// and recorded uploads.
///
/// # Example
/// ```ignore
/// let mock = MockDriveClient::new().with_folder("d1", "2025-06-01", "ROOT").await;
/// let found = mock.list_children("ROOT", "2025-06-01").await?;
/// assert_eq!(found[0].id, "d1");
/// ```
#[derive(Default)]
pub struct MockDriveClient {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    folders: Vec<MockFolder>,
    uploads: Vec<UploadedFile>,
    /// Ids whose metadata fetch fails with NotFound (stale-cache simulation)
    dead_ids: HashSet<String>,
    /// File names whose upload fails outright
    upload_failures: HashSet<String>,
    /// File names that upload fine but fail post-upload verification
    verify_failures: HashSet<String>,
    /// Folder names whose search always returns a malformed response
    list_invalid_names: HashSet<String>,
    /// One-shot error injected into the next backend call
    next_error: Option<StorageError>,
    counts: CallCounts,
    next_id: usize,
}

#[derive(Debug, Clone)]
struct MockFolder {
    id: String,
    name: String,
    parent_id: String,
    created_time: Option<DateTime<Utc>>,
}

/// A file recorded by `upload_file`
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_id: String,
}

/// Backend call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub get_metadata: usize,
    pub list_children: usize,
    pub create_folder: usize,
    pub upload_file: usize,
    pub grant_permission: usize,
}

impl MockDriveClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload an existing folder
    pub async fn with_folder(self, id: &str, name: &str, parent_id: &str) -> Self {
        self.with_folder_at(id, name, parent_id, None).await
    }

    /// Preload an existing folder with a creation time (duplicate-rule tests)
    pub async fn with_folder_at(
        self,
        id: &str,
        name: &str,
        parent_id: &str,
        created_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.state.lock().await.folders.push(MockFolder {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            created_time,
        });
        self
    }

    /// Make metadata fetches for `id` fail with NotFound
    pub async fn with_dead_id(self, id: &str) -> Self {
        self.state.lock().await.dead_ids.insert(id.to_string());
        self
    }

    /// Make the upload of `file_name` fail with a server error
    pub async fn with_upload_failure(self, file_name: &str) -> Self {
        self.state
            .lock()
            .await
            .upload_failures
            .insert(file_name.to_string());
        self
    }

    /// Make the upload of `file_name` succeed but fail verification
    pub async fn with_verify_failure(self, file_name: &str) -> Self {
        self.state
            .lock()
            .await
            .verify_failures
            .insert(file_name.to_string());
        self
    }

    /// Make every search for `name` return a malformed response
    pub async fn with_list_invalid(self, name: &str) -> Self {
        self.state
            .lock()
            .await
            .list_invalid_names
            .insert(name.to_string());
        self
    }

    /// Inject an error consumed by the next backend call
    pub async fn with_next_error(self, err: StorageError) -> Self {
        self.state.lock().await.next_error = Some(err);
        self
    }

    /// Snapshot of backend call counts
    pub async fn call_counts(&self) -> CallCounts {
        self.state.lock().await.counts.clone()
    }

    /// Files recorded by `upload_file`, in call order
    pub async fn uploaded_files(&self) -> Vec<UploadedFile> {
        self.state.lock().await.uploads.clone()
    }

    /// Names of folders currently under `parent_id`
    pub async fn folder_names_under(&self, parent_id: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .folders
            .iter()
            .filter(|f| f.parent_id == parent_id)
            .map(|f| f.name.clone())
            .collect()
    }
}

impl MockFolder {
    fn metadata(&self) -> FileMetadata {
        FileMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            created_time: self.created_time,
            trashed: false,
        }
    }
}

impl MockState {
    fn take_injected(&mut self) -> Option<StorageError> {
        self.next_error.take()
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[async_trait]
impl DriveApi for MockDriveClient {
    async fn get_metadata(&self, file_id: &str) -> StorageResult<FileMetadata> {
        let mut state = self.state.lock().await;
        state.counts.get_metadata += 1;

        if let Some(err) = state.take_injected() {
            return Err(err);
        }
        if state.dead_ids.contains(file_id) {
            return Err(StorageError::NotFound(format!("file {} not found", file_id)));
        }

        if let Some(folder) = state.folders.iter().find(|f| f.id == file_id) {
            return Ok(folder.metadata());
        }
        if let Some(file) = state.uploads.iter().find(|f| f.id == file_id) {
            return Ok(FileMetadata {
                id: file.id.clone(),
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                created_time: None,
                trashed: false,
            });
        }
        Err(StorageError::NotFound(format!("file {} not found", file_id)))
    }

    async fn list_children(&self, parent_id: &str, name: &str) -> StorageResult<Vec<FileMetadata>> {
        let mut state = self.state.lock().await;
        state.counts.list_children += 1;

        if let Some(err) = state.take_injected() {
            return Err(err);
        }
        if state.list_invalid_names.contains(name) {
            return Err(StorageError::InvalidResponse(
                "search response missing file list".to_string(),
            ));
        }

        Ok(state
            .folders
            .iter()
            .filter(|f| f.parent_id == parent_id && f.name == name)
            .map(MockFolder::metadata)
            .collect())
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> StorageResult<String> {
        let mut state = self.state.lock().await;
        state.counts.create_folder += 1;

        if let Some(err) = state.take_injected() {
            return Err(err);
        }

        let id = state.fresh_id("folder");
        state.folders.push(MockFolder {
            id: id.clone(),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            created_time: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
        _source: &Path,
    ) -> StorageResult<String> {
        let mut state = self.state.lock().await;
        state.counts.upload_file += 1;

        if let Some(err) = state.take_injected() {
            return Err(err);
        }
        if state.upload_failures.contains(name) {
            return Err(StorageError::ServerError(format!(
                "upload of '{}' rejected",
                name
            )));
        }

        let id = state.fresh_id("file");
        if state.verify_failures.contains(name) {
            state.dead_ids.insert(id.clone());
        }
        state.uploads.push(UploadedFile {
            id: id.clone(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parent_id: parent_id.to_string(),
        });
        Ok(id)
    }

    async fn grant_permission(&self, _file_id: &str, _role: &str, _email: &str) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        state.counts.grant_permission += 1;

        if let Some(err) = state.take_injected() {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preloaded_folder_listed() {
        let mock = MockDriveClient::new()
            .with_folder("d1", "2025-06-01", "ROOT")
            .await;

        let found = mock.list_children("ROOT", "2025-06-01").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "d1");

        let missed = mock.list_children("ROOT", "2025-06-02").await.unwrap();
        assert!(missed.is_empty());
    }

    #[tokio::test]
    async fn test_created_folder_becomes_visible() {
        let mock = MockDriveClient::new();
        let id = mock.create_folder("alice_42", "d1").await.unwrap();

        let meta = mock.get_metadata(&id).await.unwrap();
        assert_eq!(meta.name, "alice_42");
        assert!(meta.is_folder());

        let counts = mock.call_counts().await;
        assert_eq!(counts.create_folder, 1);
        assert_eq!(counts.get_metadata, 1);
    }

    #[tokio::test]
    async fn test_dead_id_fails_metadata() {
        let mock = MockDriveClient::new()
            .with_folder("d1", "2025-06-01", "ROOT")
            .await
            .with_dead_id("d1")
            .await;

        assert!(mock.get_metadata("d1").await.is_err());
    }

    #[tokio::test]
    async fn test_injected_error_consumed_once() {
        let mock = MockDriveClient::new()
            .with_next_error(StorageError::Network("boom".to_string()))
            .await;

        assert!(mock.list_children("ROOT", "x").await.is_err());
        assert!(mock.list_children("ROOT", "x").await.is_ok());
    }
}
