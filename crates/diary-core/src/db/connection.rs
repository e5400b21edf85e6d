//! libSQL store handle: local file, in-memory, or embedded replica.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use super::migrations;
use crate::error::{Error, Result};

const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Remote replica settings.
///
/// The interval is the cadence at which an open `DiaryClient` pulls remote
/// frames; libSQL's own background sync is not used.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote database URL (e.g., `libsql://diary.turso.io`)
    pub url: String,
    pub auth_token: String,
    /// `None` disables periodic pulls; `DiaryClient::sync` still works
    pub sync_interval: Option<Duration>,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            sync_interval: Some(DEFAULT_SYNC_INTERVAL),
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncConfig")
            .field("url", &self.url)
            .field("auth_token", &"[REDACTED]")
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

/// An open, migrated libSQL database with one shared connection.
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replica: bool,
}

impl Database {
    /// Open (creating if needed) a local-only database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path).build().await?;
        Self::initialize(db).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::initialize(db).await
    }

    /// Open `local_path` as an embedded replica of `config.url`.
    ///
    /// Reads are served from the local file and writes are forwarded to the
    /// remote. The remote schema is pulled before migrations run.
    pub async fn open_with_sync(local_path: impl AsRef<Path>, config: &SyncConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::InvalidInput("Sync URL is required".into()));
        }
        if config.auth_token.trim().is_empty() {
            return Err(Error::InvalidInput("Sync auth token is required".into()));
        }

        let path = local_path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_remote_replica(&path, config.url.clone(), config.auth_token.clone())
            .build()
            .await?;
        let database = Self {
            conn: db.connect()?,
            db,
            replica: true,
        };

        let frames = database.sync().await?;
        tracing::debug!("Initial replica pull applied {} frames", frames);
        database.configure().await;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn initialize(db: LibSqlDatabase) -> Result<Self> {
        let database = Self {
            conn: db.connect()?,
            db,
            replica: false,
        };
        database.configure().await;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn configure(&self) {
        // Replicas reject some pragmas
        for pragma in ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"] {
            if let Err(error) = self.conn.execute(pragma, ()).await {
                tracing::debug!("Skipped `{}`: {}", pragma, error);
            }
        }
    }

    /// Pull remote frames into the replica and return how many were applied.
    ///
    /// Always `0` for a local-only database.
    pub async fn sync(&self) -> Result<usize> {
        if !self.replica {
            return Ok(0);
        }
        let replicated = self.db.sync().await?;
        let frames = replicated.frames_synced();
        if frames > 0 {
            tracing::debug!("Pulled {} frames from remote", frames);
        }
        Ok(frames)
    }

    /// Counter that moves whenever another connection commits to this file.
    ///
    /// Commits made through this handle's own connection leave it unchanged.
    pub async fn data_version(&self) -> Result<i64> {
        let mut rows = self.conn.query("PRAGMA data_version", ()).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| Error::Database("PRAGMA data_version returned no rows".into()))?;
        Ok(row.get::<i64>(0)?)
    }

    pub const fn is_sync_enabled(&self) -> bool {
        self.replica
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
