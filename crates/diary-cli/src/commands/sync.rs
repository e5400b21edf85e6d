use diary_core::auth::Identity;
use diary_core::DiaryClient;

use crate::error::CliError;

pub async fn run_sync<I: Identity>(client: &DiaryClient<I>) -> Result<(), CliError> {
    if !client.is_sync_enabled() {
        return Err(CliError::SyncNotConfigured);
    }

    client.sync().await?;
    println!("Sync completed");
    Ok(())
}
