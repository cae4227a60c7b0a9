//! Batch upload coordination
//!
//! Drives one author's attachments into a resolved destination folder:
//! download to scratch, upload, verify, clean up, record the outcome.
//! Attachments are independent, so one failure never aborts the batch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::drive::DriveApi;

pub mod scratch;

use scratch::ScratchFile;

/// One inbound attachment, as delivered by the chat platform
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub url: String,
    pub file_name: String,
    pub content_type: String,
}

/// Terminal state of one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Success,
    Failed,
}

/// Per-attachment result recorded into the batch report
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub attachment_id: String,
    pub file_name: String,
    pub status: UploadStatus,
    pub remote_file_id: Option<String>,
    pub error_detail: Option<String>,
}

/// Aggregated outcomes for one author's batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == UploadStatus::Success)
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == UploadStatus::Failed)
            .count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Why one attachment failed; recorded as detail text, never escalated
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("scratch allocation failed: {0}")]
    Scratch(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("verification failed: {0}")]
    Verification(String),
}

/// Sequentially uploads a batch of attachments into one destination folder.
///
/// Serial on purpose: the backend rate limits aggressively and uploads
/// within a batch share a destination.
pub struct UploadCoordinator<C: DriveApi> {
    drive: Arc<C>,
    http: reqwest::Client,
    scratch_dir: PathBuf,
}

impl<C: DriveApi> UploadCoordinator<C> {
    pub fn new(drive: Arc<C>, scratch_dir: PathBuf) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| crate::error::Error::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            drive,
            http,
            scratch_dir,
        })
    }

    /// Upload every attachment, accumulating per-item outcomes. Never
    /// returns early; the report always covers the whole batch.
    pub async fn upload_batch(
        &self,
        session_id: &str,
        attachments: &[Attachment],
        destination_folder_id: &str,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for attachment in attachments {
            let outcome = match self.process_one(session_id, attachment, destination_folder_id).await
            {
                Ok(remote_id) => {
                    log::info!(
                        "Uploaded '{}' to folder {} as {}",
                        attachment.file_name,
                        destination_folder_id,
                        remote_id
                    );
                    UploadOutcome {
                        attachment_id: attachment.id.clone(),
                        file_name: attachment.file_name.clone(),
                        status: UploadStatus::Success,
                        remote_file_id: Some(remote_id),
                        error_detail: None,
                    }
                }
                Err(err) => {
                    log::error!(
                        "Failed to upload '{}' to folder {}: {}",
                        attachment.file_name,
                        destination_folder_id,
                        err
                    );
                    UploadOutcome {
                        attachment_id: attachment.id.clone(),
                        file_name: attachment.file_name.clone(),
                        status: UploadStatus::Failed,
                        remote_file_id: None,
                        error_detail: Some(err.to_string()),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        log::debug!(
            "Batch complete: {}/{} uploaded",
            report.success_count(),
            report.total()
        );
        report
    }

    async fn process_one(
        &self,
        session_id: &str,
        attachment: &Attachment,
        destination_folder_id: &str,
    ) -> Result<String, AttachmentError> {
        // The guard deletes the scratch file on every exit path below
        let scratch = ScratchFile::allocate(
            &self.scratch_dir,
            session_id,
            &attachment.id,
            &attachment.file_name,
        )
        .map_err(|e| AttachmentError::Scratch(e.to_string()))?;

        self.download_to(&attachment.url, &scratch).await?;

        let remote_id = self
            .drive
            .upload_file(
                &attachment.file_name,
                &attachment.content_type,
                destination_folder_id,
                scratch.path(),
            )
            .await
            .map_err(|e| AttachmentError::Upload(e.to_string()))?;

        // An upload we cannot read back is not a success
        self.drive
            .get_metadata(&remote_id)
            .await
            .map_err(|e| AttachmentError::Verification(e.to_string()))?;

        Ok(remote_id)
    }

    /// Stream the attachment body into the scratch file
    async fn download_to(&self, url: &str, scratch: &ScratchFile) -> Result<(), AttachmentError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AttachmentError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AttachmentError::Download(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(scratch.path())
            .await
            .map_err(|e| AttachmentError::Download(e.to_string()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AttachmentError::Download(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| AttachmentError::Download(e.to_string()))?;
        }
        file.flush()
            .await
            .map_err(|e| AttachmentError::Download(e.to_string()))?;

        Ok(())
    }
}
