//! Pending image upload queue

use libsql::Connection;

use crate::error::Result;
use crate::models::PendingImageUpload;

/// Trait for the local queue of images awaiting remote upload (async)
#[allow(async_fn_in_trait)]
pub trait UploadQueue {
    /// All pending uploads, oldest first
    async fn list_pending(&self) -> Result<Vec<PendingImageUpload>>;

    /// Insert or replace the row with `item.id`
    async fn enqueue(&self, item: &PendingImageUpload) -> Result<()>;

    /// Insert a new row under a store-assigned ID
    async fn push(&self, remote_path: &str, local_path: &str) -> Result<PendingImageUpload>;

    /// Remove a row once its upload is confirmed; absent rows are ignored
    async fn clear(&self, id: i64) -> Result<()>;
}

/// libSQL implementation of `UploadQueue`
pub struct LibSqlUploadQueue<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlUploadQueue<'a> {
    /// Create a new queue with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl UploadQueue for LibSqlUploadQueue<'_> {
    async fn list_pending(&self) -> Result<Vec<PendingImageUpload>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, remote_path, local_path FROM images_to_upload ORDER BY id ASC",
                (),
            )
            .await?;

        let mut pending = Vec::new();
        while let Some(row) = rows.next().await? {
            pending.push(PendingImageUpload {
                id: row.get(0)?,
                remote_path: row.get(1)?,
                local_path: row.get(2)?,
            });
        }
        Ok(pending)
    }

    async fn enqueue(&self, item: &PendingImageUpload) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO images_to_upload (id, remote_path, local_path) VALUES (?1, ?2, ?3)",
                libsql::params![item.id, item.remote_path.clone(), item.local_path.clone()],
            )
            .await?;
        tracing::debug!("Queued image {} for upload", item.id);
        Ok(())
    }

    async fn push(&self, remote_path: &str, local_path: &str) -> Result<PendingImageUpload> {
        self.conn
            .execute(
                "INSERT INTO images_to_upload (remote_path, local_path) VALUES (?1, ?2)",
                libsql::params![remote_path.to_string(), local_path.to_string()],
            )
            .await?;
        let item = PendingImageUpload::new(self.conn.last_insert_rowid(), remote_path, local_path);
        tracing::debug!("Queued image {} for upload", item.id);
        Ok(item)
    }

    async fn clear(&self, id: i64) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM images_to_upload WHERE id = ?1",
                libsql::params![id],
            )
            .await?;
        Ok(())
    }
}
