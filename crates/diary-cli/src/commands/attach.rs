use std::path::Path;

use diary_core::auth::Identity;
use diary_core::{Diary, DiaryClient};

use crate::commands::common::{discard_queued, into_cli_result, resolve_diary};
use crate::error::CliError;

/// Record a local image on an entry and queue it for upload.
pub async fn run_attach<I: Identity>(
    client: &DiaryClient<I>,
    id: &str,
    path: &Path,
) -> Result<Diary, CliError> {
    let diary = resolve_diary(client, id).await?;
    attach_and_save(client, diary, path).await
}

/// Queue `path` for `diary` and persist the new image list.
///
/// The queue row is dropped again when the entry cannot be saved.
pub async fn attach_and_save<I: Identity>(
    client: &DiaryClient<I>,
    mut diary: Diary,
    path: &Path,
) -> Result<Diary, CliError> {
    let queued = client.attach_image(&mut diary, path).await?;
    let updated = match into_cli_result(client.update_diary(&diary).await) {
        Ok(updated) => updated,
        Err(error) => {
            discard_queued(client, std::slice::from_ref(&queued)).await;
            return Err(error);
        }
    };

    println!("Queued {} as {}", path.display(), queued.remote_path);
    Ok(updated)
}
