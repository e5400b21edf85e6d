use std::path::PathBuf;

use clap::{Parser, Subcommand};
use diary_core::Mood;

#[derive(Parser)]
#[command(name = "diary")]
#[command(about = "Keep a mood diary from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for auth/sync configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a new diary entry
    #[command(alias = "new")]
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Mood name (case-insensitive)
        #[arg(short, long, default_value = "neutral", value_parser = parse_mood)]
        mood: Mood,
        /// Entry date as RFC 3339 (defaults to now)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
        /// Local image to attach and queue for upload
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },
    /// List entries grouped by day
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one entry
    Show {
        /// Diary ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Resolve image paths to download URLs through the media API
        #[arg(long)]
        urls: bool,
    },
    /// Edit an existing entry; omitted fields keep their value
    Edit {
        /// Diary ID or unique ID prefix
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_parser = parse_mood)]
        mood: Option<Mood>,
        /// Entry date as RFC 3339
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// Delete an entry
    Delete {
        /// Diary ID or unique ID prefix
        id: String,
        /// Also delete already uploaded images through the media API
        #[arg(long)]
        purge_images: bool,
    },
    /// Attach a local image to an entry and queue it for upload
    Attach {
        /// Diary ID or unique ID prefix
        id: String,
        /// Local image path
        path: PathBuf,
    },
    /// Inspect or drain the pending image upload queue
    Uploads {
        #[command(subcommand)]
        command: UploadCommands,
    },
    /// Print the grouped listing again after every change
    Watch,
    /// Sync local replica with the remote database
    Sync,
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate a CLI profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum UploadCommands {
    /// List images waiting to be uploaded
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload every queued image through the media API
    Flush,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Auth service URL
        #[arg(long, value_name = "URL")]
        auth_url: Option<String>,
        /// Auth anon/public key
        #[arg(long, value_name = "KEY")]
        auth_anon_key: Option<String>,
        /// Backend sync token exchange endpoint
        #[arg(long, value_name = "URL")]
        sync_token_endpoint: Option<String>,
        /// Media API base URL for image uploads
        #[arg(long, value_name = "URL")]
        media_api_base_url: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with email/password and store session in keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Logout profile and clear stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

fn parse_mood(raw: &str) -> Result<Mood, String> {
    raw.parse::<Mood>().map_err(|error| error.to_string())
}
