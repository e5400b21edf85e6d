use diary_core::auth::Identity;
use diary_core::storage::{ImageStorage, MediaApiClient};
use diary_core::{flush_pending_uploads, DiaryClient, UploadReport};

use crate::commands::common::ProfileContext;
use crate::error::CliError;

pub async fn run_uploads_list<I: Identity>(
    client: &DiaryClient<I>,
    as_json: bool,
) -> Result<(), CliError> {
    let pending = client.pending_uploads().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
    } else if pending.is_empty() {
        println!("No images waiting for upload.");
    } else {
        for item in &pending {
            println!("{:>5}  {}  <-  {}", item.id, item.remote_path, item.local_path);
        }
    }
    Ok(())
}

/// Media API client for the profile's signed-in user.
pub fn media_client_for(context: &ProfileContext) -> Result<MediaApiClient, CliError> {
    let base_url = context
        .profile
        .as_ref()
        .and_then(|profile| profile.media_api_base_url());
    let (Some(base_url), Some(session)) = (base_url, context.session.as_ref()) else {
        return Err(CliError::UploadsNotConfigured);
    };
    Ok(MediaApiClient::new(base_url, session.access_token.clone())?)
}

pub async fn run_uploads_flush<I, S>(
    client: &DiaryClient<I>,
    storage: &S,
) -> Result<UploadReport, CliError>
where
    I: Identity,
    S: ImageStorage,
{
    let report = flush_pending_uploads(client, storage).await?;
    println!(
        "Uploaded {} image(s), {} still pending",
        report.uploaded, report.failed
    );
    Ok(report)
}
