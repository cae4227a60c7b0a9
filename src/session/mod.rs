//! Upload session orchestration
//!
//! One session corresponds to one inbound chat event with attachments:
//! resolve today's date folder under the configured root, resolve one folder
//! per author beneath it, and drive each author's batch through the upload
//! coordinator. Author-level failures are contained; only losing the date
//! folder kills the session.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::cache::FolderCache;
use crate::drive::DriveApi;
use crate::error::Result;
use crate::resolver::{DuplicateRule, FolderResolver};
use crate::upload::{Attachment, BatchReport, UploadCoordinator};

/// Attachments from one author within a session
#[derive(Debug, Clone)]
pub struct AuthorBatch {
    pub author_id: String,
    pub display_name: String,
    pub attachments: Vec<Attachment>,
}

impl AuthorBatch {
    /// Folder name for this author: `{display_name}_{user_id}`
    pub fn folder_name(&self) -> String {
        format!("{}_{}", self.display_name, self.author_id)
    }
}

/// Per-author slice of the session report
#[derive(Debug, Clone)]
pub struct AuthorReport {
    pub folder_name: String,
    pub success_count: usize,
    pub failure_count: usize,
    /// Set when the author's folder could not be resolved and their whole
    /// batch was skipped
    pub resolution_error: Option<String>,
}

/// Aggregate outcome of one upload session
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub total: usize,
    pub per_user: Vec<AuthorReport>,
}

impl SessionReport {
    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0 && self.success_count > 0
    }

    pub fn total_failure(&self) -> bool {
        self.success_count == 0 && self.failure_count > 0
    }

    fn absorb(&mut self, author: AuthorReport) {
        self.success_count += author.success_count;
        self.failure_count += author.failure_count;
        self.total += author.success_count + author.failure_count;
        self.per_user.push(author);
    }
}

/// Runs upload sessions against a shared drive client and folder cache
pub struct SessionDriver<C: DriveApi> {
    resolver: FolderResolver<C>,
    coordinator: UploadCoordinator<C>,
    root_folder_id: String,
    time_zone: Tz,
}

impl<C: DriveApi> SessionDriver<C> {
    pub fn new(
        drive: Arc<C>,
        cache: Arc<FolderCache>,
        root_folder_id: String,
        time_zone: Tz,
        scratch_dir: PathBuf,
    ) -> Result<Self> {
        Ok(Self {
            resolver: FolderResolver::new(Arc::clone(&drive), cache),
            coordinator: UploadCoordinator::new(drive, scratch_dir)?,
            root_folder_id,
            time_zone,
        })
    }

    pub fn with_duplicate_rule(mut self, rule: DuplicateRule) -> Self {
        self.resolver = self.resolver.with_duplicate_rule(rule);
        self
    }

    /// Run a session for the current date in the organization time zone
    pub async fn run(&self, session_id: &str, batches: &[AuthorBatch]) -> Result<SessionReport> {
        let date_key = date_key(Utc::now(), self.time_zone);
        self.run_for_date(session_id, &date_key, batches).await
    }

    /// Run a session filing under an explicit date folder name.
    ///
    /// Date-folder resolution failure is session-fatal; author-folder
    /// failures skip that author and the session continues.
    pub async fn run_for_date(
        &self,
        session_id: &str,
        date_key: &str,
        batches: &[AuthorBatch],
    ) -> Result<SessionReport> {
        let date_folder = self
            .resolver
            .resolve_with_recovery(date_key, &self.root_folder_id)
            .await?;
        log::info!(
            "Session {}: date folder '{}' under {} resolved to {} (verified: {})",
            session_id,
            date_folder.name,
            date_folder.parent_id,
            date_folder.folder_id,
            date_folder.verified
        );

        let mut report = SessionReport::default();

        for batch in batches {
            let folder_name = batch.folder_name();

            let author_folder = match self
                .resolver
                .resolve_with_recovery(&folder_name, &date_folder.folder_id)
                .await
            {
                Ok(folder) => folder,
                Err(err) => {
                    log::error!(
                        "Session {}: skipping {} attachments from '{}': {}",
                        session_id,
                        batch.attachments.len(),
                        folder_name,
                        err
                    );
                    report.absorb(AuthorReport {
                        folder_name,
                        success_count: 0,
                        failure_count: batch.attachments.len(),
                        resolution_error: Some(err.to_string()),
                    });
                    continue;
                }
            };

            let batch_report = self
                .coordinator
                .upload_batch(session_id, &batch.attachments, &author_folder.folder_id)
                .await;
            report.absorb(author_report(folder_name, &batch_report));
        }

        log::info!(
            "Session {}: {} uploaded, {} failed",
            session_id,
            report.success_count,
            report.failure_count
        );
        Ok(report)
    }
}

fn author_report(folder_name: String, batch: &BatchReport) -> AuthorReport {
    AuthorReport {
        folder_name,
        success_count: batch.success_count(),
        failure_count: batch.failure_count(),
        resolution_error: None,
    }
}

/// Render `now` as a `YYYY-MM-DD` date key in the organization time zone
pub fn date_key(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::MockDriveClient;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn jpeg(id: &str, url: &str, name: &str) -> Attachment {
        Attachment {
            id: id.to_string(),
            url: url.to_string(),
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
        }
    }

    fn harness(
        drive: Arc<MockDriveClient>,
        scratch: &TempDir,
    ) -> (SessionDriver<MockDriveClient>, Arc<FolderCache>) {
        let cache = Arc::new(FolderCache::new());
        let driver = SessionDriver::new(
            drive,
            Arc::clone(&cache),
            "ROOT".to_string(),
            chrono_tz::America::New_York,
            scratch.path().to_path_buf(),
        )
        .unwrap();
        (driver, cache)
    }

    #[test]
    fn test_date_key_renders_in_org_zone() {
        // 02:00 UTC on June 2 is still June 1 in New York (EDT, UTC-4)
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 2, 0, 0).unwrap();
        assert_eq!(date_key(now, chrono_tz::America::New_York), "2025-06-01");

        let later = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        assert_eq!(date_key(later, chrono_tz::America::New_York), "2025-06-02");
    }

    #[test]
    fn test_author_folder_name() {
        let batch = AuthorBatch {
            author_id: "42".to_string(),
            display_name: "alice".to_string(),
            attachments: Vec::new(),
        };
        assert_eq!(batch.folder_name(), "alice_42");
    }

    #[tokio::test]
    async fn test_end_to_end_single_author_session() {
        let mut server = mockito::Server::new_async().await;
        for i in 1..=4 {
            server
                .mock("GET", format!("/photos/{}.jpg", i).as_str())
                .with_status(200)
                .with_body(b"jpeg bytes")
                .create_async()
                .await;
        }

        let scratch = TempDir::new().unwrap();
        let drive = Arc::new(MockDriveClient::new());
        let (driver, _cache) = harness(Arc::clone(&drive), &scratch);

        let batch = AuthorBatch {
            author_id: "42".to_string(),
            display_name: "alice".to_string(),
            attachments: (1..=4)
                .map(|i| {
                    jpeg(
                        &format!("att-{}", i),
                        &format!("{}/photos/{}.jpg", server.url(), i),
                        &format!("{}.jpg", i),
                    )
                })
                .collect(),
        };

        let report = driver
            .run_for_date("session-1", "2025-06-01", &[batch])
            .await
            .unwrap();

        assert_eq!(report.success_count, 4);
        assert_eq!(report.failure_count, 0);
        assert_eq!(report.total, 4);
        assert!(report.all_succeeded());
        assert_eq!(report.per_user.len(), 1);
        assert_eq!(report.per_user[0].folder_name, "alice_42");

        // One create per folder level, four uploads beneath
        let counts = drive.call_counts().await;
        assert_eq!(counts.create_folder, 2);
        assert_eq!(counts.upload_file, 4);
        assert_eq!(drive.folder_names_under("ROOT").await, vec!["2025-06-01"]);

        let date_id = {
            let uploads = drive.uploaded_files().await;
            assert_eq!(uploads.len(), 4);
            // All four landed in the same author folder
            let parent = uploads[0].parent_id.clone();
            assert!(uploads.iter().all(|u| u.parent_id == parent));
            parent
        };
        assert!(!date_id.is_empty());
    }

    #[tokio::test]
    async fn test_author_resolution_failure_skips_only_that_author() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/photos/ok.jpg")
            .with_status(200)
            .with_body(b"jpeg bytes")
            .create_async()
            .await;

        let scratch = TempDir::new().unwrap();
        let drive = Arc::new(MockDriveClient::new().with_list_invalid("alice_42").await);
        let (driver, _cache) = harness(Arc::clone(&drive), &scratch);

        let batches = vec![
            AuthorBatch {
                author_id: "42".to_string(),
                display_name: "alice".to_string(),
                attachments: vec![jpeg("a1", "http://unused.invalid/a.jpg", "a.jpg")],
            },
            AuthorBatch {
                author_id: "7".to_string(),
                display_name: "bob".to_string(),
                attachments: vec![jpeg(
                    "b1",
                    &format!("{}/photos/ok.jpg", server.url()),
                    "ok.jpg",
                )],
            },
        ];

        let report = driver
            .run_for_date("session-1", "2025-06-01", &batches)
            .await
            .unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.per_user.len(), 2);
        assert!(report.per_user[0].resolution_error.is_some());
        assert!(report.per_user[1].resolution_error.is_none());
    }

    #[tokio::test]
    async fn test_date_folder_failure_is_session_fatal() {
        let scratch = TempDir::new().unwrap();
        let drive = Arc::new(MockDriveClient::new().with_list_invalid("2025-06-01").await);
        let (driver, _cache) = harness(drive, &scratch);

        let batch = AuthorBatch {
            author_id: "42".to_string(),
            display_name: "alice".to_string(),
            attachments: vec![jpeg("a1", "http://unused.invalid/a.jpg", "a.jpg")],
        };

        let result = driver.run_for_date("session-1", "2025-06-01", &[batch]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_second_session_same_day_reuses_folders() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/photos/a.jpg")
            .with_status(200)
            .with_body(b"jpeg bytes")
            .expect_at_least(2)
            .create_async()
            .await;

        let scratch = TempDir::new().unwrap();
        let drive = Arc::new(MockDriveClient::new());
        let (driver, _cache) = harness(Arc::clone(&drive), &scratch);

        let batch = AuthorBatch {
            author_id: "42".to_string(),
            display_name: "alice".to_string(),
            attachments: vec![jpeg(
                "a1",
                &format!("{}/photos/a.jpg", server.url()),
                "a.jpg",
            )],
        };

        driver
            .run_for_date("session-1", "2025-06-01", std::slice::from_ref(&batch))
            .await
            .unwrap();
        driver
            .run_for_date("session-2", "2025-06-01", &[batch])
            .await
            .unwrap();

        // Folder creation happened once per level across both sessions
        let counts = drive.call_counts().await;
        assert_eq!(counts.create_folder, 2);
    }
}
