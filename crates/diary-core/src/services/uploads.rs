//! Draining the pending image upload queue.

use crate::auth::Identity;
use crate::error::Result;
use crate::models::PendingImageUpload;
use crate::storage::{content_type_for, ImageStorage};

use super::DiaryClient;

/// Outcome of one pass over the upload queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// Upload every queued image, oldest first, clearing each row once stored.
///
/// A failed item stays queued and the pass moves on. Nothing is retried.
pub async fn flush_pending_uploads<I, S>(client: &DiaryClient<I>, storage: &S) -> Result<UploadReport>
where
    I: Identity,
    S: ImageStorage,
{
    let pending = client.pending_uploads().await?;
    let mut report = UploadReport::default();

    for item in pending {
        match upload_one(storage, &item).await {
            Ok(()) => {
                client.clear_upload(item.id).await?;
                report.uploaded += 1;
            }
            Err(error) => {
                tracing::warn!(
                    "Upload of {} from {} failed: {}",
                    item.remote_path,
                    item.local_path,
                    error
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "Upload pass finished: {} uploaded, {} failed",
        report.uploaded,
        report.failed
    );
    Ok(report)
}

async fn upload_one<S: ImageStorage>(storage: &S, item: &PendingImageUpload) -> Result<()> {
    let bytes = tokio::fs::read(&item.local_path).await?;
    storage
        .upload(&item.remote_path, content_type_for(&item.remote_path), &bytes)
        .await
}
