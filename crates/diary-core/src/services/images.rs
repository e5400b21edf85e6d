//! Display links for a diary's images, and removal of their stored copies.

use serde::Serialize;

use crate::auth::Identity;
use crate::error::Result;
use crate::models::Diary;
use crate::storage::ImageStorage;

use super::DiaryClient;

/// A recorded image path with the URL it can be fetched from right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageLink {
    pub remote_path: String,
    /// `None` when the storage could not resolve the path
    pub url: Option<String>,
}

/// Resolve every image of `diary` to a download URL, in recorded order.
///
/// A path that fails to resolve keeps its place with no URL.
pub async fn resolve_image_urls<S: ImageStorage>(storage: &S, diary: &Diary) -> Vec<ImageLink> {
    let mut links = Vec::with_capacity(diary.images.len());
    for remote_path in &diary.images {
        let url = match storage.download_url(remote_path).await {
            Ok(url) => Some(url),
            Err(error) => {
                tracing::warn!("Could not resolve {}: {}", remote_path, error);
                None
            }
        };
        links.push(ImageLink {
            remote_path: remote_path.clone(),
            url,
        });
    }
    links
}

/// Outcome of removing a deleted diary's images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Objects removed from remote storage
    pub deleted: usize,
    /// Images dropped from the upload queue before they were ever uploaded
    pub unqueued: usize,
    pub failed: usize,
}

/// Drop queue rows for images of `diary` that were never uploaded.
///
/// Returns the remote paths that were still queued.
pub async fn unqueue_diary_images<I: Identity>(
    client: &DiaryClient<I>,
    diary: &Diary,
) -> Result<Vec<String>> {
    let mut unqueued = Vec::new();
    for item in client.pending_uploads().await? {
        if diary.images.contains(&item.remote_path) {
            client.clear_upload(item.id).await?;
            if !unqueued.contains(&item.remote_path) {
                unqueued.push(item.remote_path);
            }
        }
    }
    Ok(unqueued)
}

/// Remove the images of a diary that was deleted from the store.
///
/// Images still waiting in the upload queue are dropped from it; the rest are
/// deleted from `storage`. Failures are counted and the pass moves on.
pub async fn purge_diary_images<I, S>(
    client: &DiaryClient<I>,
    storage: &S,
    diary: &Diary,
) -> Result<PurgeReport>
where
    I: Identity,
    S: ImageStorage,
{
    let unqueued = unqueue_diary_images(client, diary).await?;
    let mut report = PurgeReport {
        unqueued: unqueued.len(),
        ..PurgeReport::default()
    };

    for remote_path in diary.images.iter().filter(|path| !unqueued.contains(path)) {
        match storage.delete(remote_path).await {
            Ok(()) => report.deleted += 1,
            Err(error) => {
                tracing::warn!("Failed to delete {}: {}", remote_path, error);
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "Removed images of diary {}: {} deleted, {} unqueued, {} failed",
        diary.id,
        report.deleted,
        report.unqueued,
        report.failed
    );
    Ok(report)
}
