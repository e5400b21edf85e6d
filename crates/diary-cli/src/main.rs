//! Diary CLI - Command-line interface for a mood diary
//!
//! Write, browse, and sync mood-tagged entries from the terminal.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use diary_core::storage::MediaApiClient;

use crate::cli::{Cli, Commands, UploadCommands};
use crate::commands::add::{run_add, AddArgs};
use crate::commands::attach::run_attach;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{
    open_client, resolve_db_path, resolve_profile_context, OpenClientMode,
};
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, EditArgs};
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::commands::uploads::{media_client_for, run_uploads_flush, run_uploads_list};
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("diary=info")),
        )
        .init();

    let cli = Cli::parse();
    let global_profile = cli.profile.as_deref();

    let command = match cli.command {
        Commands::Config { command } => return run_config(command, global_profile),
        Commands::Auth { command } => return run_auth(command, global_profile).await,
        command => command,
    };

    let db_path = resolve_db_path(cli.db_path);
    let context = resolve_profile_context(global_profile).await?;
    let mode = if matches!(command, Commands::Sync) {
        OpenClientMode::RequireSync
    } else {
        OpenClientMode::Standard
    };
    let client = open_client(&db_path, &context, mode).await?;

    let result = match command {
        Commands::Add {
            title,
            description,
            mood,
            date,
            images,
        } => run_add(
            &client,
            AddArgs {
                title,
                description,
                mood,
                date,
                images,
            },
        )
        .await
        .map(|_| ()),
        Commands::List { json } => run_list(&client, json).await,
        Commands::Show { id, json, urls } => {
            if urls {
                match media_client_for(&context) {
                    Ok(media) => run_show(&client, &id, json, Some(&media)).await.map(|_| ()),
                    Err(error) => Err(error),
                }
            } else {
                run_show::<_, MediaApiClient>(&client, &id, json, None)
                    .await
                    .map(|_| ())
            }
        }
        Commands::Edit {
            id,
            title,
            description,
            mood,
            date,
        } => run_edit(
            &client,
            &id,
            EditArgs {
                title,
                description,
                mood,
                date,
            },
        )
        .await
        .map(|_| ()),
        Commands::Delete { id, purge_images } => {
            if purge_images {
                match media_client_for(&context) {
                    Ok(media) => run_delete(&client, &id, Some(&media)).await.map(|_| ()),
                    Err(error) => Err(error),
                }
            } else {
                run_delete::<_, MediaApiClient>(&client, &id, None)
                    .await
                    .map(|_| ())
            }
        }
        Commands::Attach { id, path } => run_attach(&client, &id, &path).await.map(|_| ()),
        Commands::Uploads {
            command: UploadCommands::List { json },
        } => run_uploads_list(&client, json).await,
        Commands::Uploads {
            command: UploadCommands::Flush,
        } => match media_client_for(&context) {
            Ok(media) => run_uploads_flush(&client, &media).await.map(|_| ()),
            Err(error) => Err(error),
        },
        Commands::Watch => run_watch(&client).await,
        Commands::Sync => run_sync(&client).await,
        Commands::Config { .. } | Commands::Auth { .. } => Ok(()),
    };

    // Close even when the command failed.
    let closed = client.close().await;
    result?;
    closed?;
    Ok(())
}
