use diary_core::auth::Identity;
use diary_core::storage::ImageStorage;
use diary_core::{purge_diary_images, unqueue_diary_images, Diary, DiaryClient};

use crate::commands::common::{into_cli_result, resolve_diary};
use crate::error::CliError;

/// Delete an entry and drop its images that were never uploaded.
///
/// With `storage`, images already uploaded are deleted remotely as well.
pub async fn run_delete<I, S>(
    client: &DiaryClient<I>,
    id: &str,
    storage: Option<&S>,
) -> Result<Diary, CliError>
where
    I: Identity,
    S: ImageStorage,
{
    let diary = resolve_diary(client, id).await?;
    let deleted = into_cli_result(client.delete_diary(&diary.id).await)?;
    println!("{}", deleted.id);

    match storage {
        Some(storage) => {
            let report = purge_diary_images(client, storage, &deleted).await?;
            if report.deleted + report.failed > 0 {
                println!(
                    "Removed {} stored image(s), {} could not be removed",
                    report.deleted, report.failed
                );
            }
        }
        None => {
            unqueue_diary_images(client, &deleted).await?;
        }
    }
    Ok(deleted)
}
