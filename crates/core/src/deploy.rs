//! Directory deployment: one upload per file, failures tallied, never fatal

use crate::client::{ObjectStore, PutObject};
use crate::error::Result;
use crate::metadata::{content_type_for, CachePolicy};
use crate::source::{SourceFile, SourceTree, UnreadableEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Result of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum UploadStatus {
    Uploaded,
    Failed(String),
}

/// What happened to a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub key: String,
    pub content_type: String,
    pub cache_control: String,
    pub size: u64,
    #[serde(flatten)]
    pub status: UploadStatus,
}

impl FileOutcome {
    pub fn is_uploaded(&self) -> bool {
        self.status == UploadStatus::Uploaded
    }
}

/// A failed key and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpload {
    pub key: String,
    pub reason: String,
}

/// Totals for a deployment run
#[derive(Debug, Clone, Serialize)]
pub struct DeploySummary {
    pub bucket: String,
    pub uploaded: usize,
    pub failed: usize,
    pub bytes_uploaded: u64,
    pub failures: Vec<FailedUpload>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub dry_run: bool,
}

impl DeploySummary {
    /// True when no file failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Number of upload attempts, successful or not
    pub fn attempted(&self) -> usize {
        self.uploaded + self.failed
    }
}

/// Uploads a [`SourceTree`] to a bucket through an [`ObjectStore`]
pub struct Deployer<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    bucket: String,
    cache: CachePolicy,
    dry_run: bool,
}

impl<'a, S: ObjectStore + ?Sized> Deployer<'a, S> {
    pub fn new(store: &'a S, bucket: impl Into<String>, cache: CachePolicy) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            cache,
            dry_run: false,
        }
    }

    /// Mark the resulting summary as a dry run
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Scan `root` and deploy it.
    ///
    /// Errors only if `root` is not a directory; no upload is attempted then.
    pub async fn deploy_dir<F>(&self, root: &Path, on_outcome: F) -> Result<DeploySummary>
    where
        F: FnMut(&FileOutcome),
    {
        let tree = SourceTree::scan(root)?;
        Ok(self.deploy(&tree, on_outcome).await)
    }

    /// Upload every file of `tree` in key order, one at a time.
    ///
    /// `on_outcome` sees each file right after its attempt. Unreadable
    /// entries are reported last and counted as failures.
    pub async fn deploy<F>(&self, tree: &SourceTree, mut on_outcome: F) -> DeploySummary
    where
        F: FnMut(&FileOutcome),
    {
        let started_at = Utc::now();
        let timer = Instant::now();

        info!(
            bucket = %self.bucket,
            root = %tree.root.display(),
            files = tree.len(),
            bytes = tree.total_bytes(),
            dry_run = self.dry_run,
            "Starting deployment"
        );

        let mut uploaded = 0;
        let mut bytes_uploaded = 0;
        let mut failures = Vec::new();

        for file in &tree.files {
            let outcome = self.upload_file(file).await;
            match &outcome.status {
                UploadStatus::Uploaded => {
                    uploaded += 1;
                    bytes_uploaded += outcome.size;
                }
                UploadStatus::Failed(reason) => failures.push(FailedUpload {
                    key: outcome.key.clone(),
                    reason: reason.clone(),
                }),
            }
            on_outcome(&outcome);
        }

        for entry in &tree.unreadable {
            let outcome = self.unreadable_outcome(entry);
            if let UploadStatus::Failed(reason) = &outcome.status {
                failures.push(FailedUpload {
                    key: outcome.key.clone(),
                    reason: reason.clone(),
                });
            }
            on_outcome(&outcome);
        }

        let summary = DeploySummary {
            bucket: self.bucket.clone(),
            uploaded,
            failed: failures.len(),
            bytes_uploaded,
            failures,
            started_at,
            elapsed_ms: u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX),
            dry_run: self.dry_run,
        };

        info!(
            bucket = %summary.bucket,
            uploaded = summary.uploaded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "Deployment finished"
        );

        summary
    }

    async fn upload_file(&self, file: &SourceFile) -> FileOutcome {
        let content_type = content_type_for(&file.path);
        let cache_control = self.cache.cache_control_for(&file.key).to_string();

        let (size, status) = match self.put_file(file, &content_type, &cache_control).await {
            Ok(size) => {
                debug!(key = %file.key, size, content_type = %content_type, cache_control = %cache_control, "Uploaded");
                (size, UploadStatus::Uploaded)
            }
            Err(err) => {
                warn!(key = %file.key, error = %err, "Upload failed");
                (file.size, UploadStatus::Failed(err.to_string()))
            }
        };

        FileOutcome {
            key: file.key.clone(),
            content_type,
            cache_control,
            size,
            status,
        }
    }

    async fn put_file(&self, file: &SourceFile, content_type: &str, cache_control: &str) -> Result<u64> {
        let mut handle = File::open(&file.path).await?;
        let mut body = Vec::with_capacity(usize::try_from(file.size).unwrap_or(0));
        handle.read_to_end(&mut body).await?;

        let size = body.len() as u64;

        self.store
            .put_object(PutObject {
                bucket: self.bucket.clone(),
                key: file.key.clone(),
                body,
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
            })
            .await?;

        Ok(size)
    }

    fn unreadable_outcome(&self, entry: &UnreadableEntry) -> FileOutcome {
        FileOutcome {
            key: entry.key.clone(),
            content_type: content_type_for(&entry.path),
            cache_control: self.cache.cache_control_for(&entry.key).to_string(),
            size: 0,
            status: UploadStatus::Failed(entry.reason.clone()),
        }
    }
}
