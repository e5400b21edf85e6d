//! Owner-scoped diary repository implementation

use chrono::DateTime;
use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{Diary, DiaryId};

const DIARY_COLUMNS: &str = "id, owner_id, title, description, mood, date, images";

/// Trait for diary storage operations (async)
///
/// Every operation takes the owner explicitly and filters on it: a diary is
/// never read, changed, or removed on behalf of anyone but its owner.
#[allow(async_fn_in_trait)]
pub trait DiaryRepository {
    /// List the owner's diaries, newest first
    async fn list(&self, owner_id: &str) -> Result<Vec<Diary>>;

    /// Get one of the owner's diaries by ID
    async fn get(&self, owner_id: &str, id: &DiaryId) -> Result<Option<Diary>>;

    /// Persist a new diary under a fresh ID, stamped with `owner_id`
    async fn insert(&self, owner_id: &str, diary: &Diary) -> Result<Diary>;

    /// Overwrite every mutable field of an existing diary
    async fn update(&self, owner_id: &str, diary: &Diary) -> Result<Diary>;

    /// Delete a diary and return its last stored value
    async fn delete(&self, owner_id: &str, id: &DiaryId) -> Result<Diary>;
}

/// libSQL implementation of `DiaryRepository`
pub struct LibSqlDiaryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDiaryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a diary from a database row
    fn parse_diary(row: &libsql::Row) -> Result<Diary> {
        let id: String = row.get(0)?;
        let id = id
            .parse()
            .map_err(|_| Error::Database(format!("Invalid diary ID in store: {id}")))?;
        let mood: String = row.get(4)?;
        let date_ms: i64 = row.get(5)?;
        let date = DateTime::from_timestamp_millis(date_ms)
            .ok_or_else(|| Error::Database(format!("Invalid diary date in store: {date_ms}")))?;
        let images: String = row.get(6)?;

        Ok(Diary {
            id,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            mood: mood.parse()?,
            date,
            images: serde_json::from_str(&images)?,
        })
    }
}

impl DiaryRepository for LibSqlDiaryRepository<'_> {
    async fn list(&self, owner_id: &str) -> Result<Vec<Diary>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {DIARY_COLUMNS} FROM diaries
                     WHERE owner_id = ?1
                     ORDER BY date DESC, id DESC"
                ),
                libsql::params![owner_id.to_string()],
            )
            .await?;

        let mut diaries = Vec::new();
        while let Some(row) = rows.next().await? {
            diaries.push(Self::parse_diary(&row)?);
        }
        Ok(diaries)
    }

    async fn get(&self, owner_id: &str, id: &DiaryId) -> Result<Option<Diary>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DIARY_COLUMNS} FROM diaries WHERE id = ?1 AND owner_id = ?2"),
                libsql::params![id.as_str(), owner_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_diary(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, owner_id: &str, diary: &Diary) -> Result<Diary> {
        let stored = Diary {
            id: DiaryId::new(),
            owner_id: owner_id.to_string(),
            // the store keeps millisecond precision
            date: DateTime::from_timestamp_millis(diary.date.timestamp_millis())
                .unwrap_or(diary.date),
            ..diary.clone()
        };

        self.conn
            .execute(
                &format!("INSERT INTO diaries ({DIARY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    stored.id.as_str(),
                    stored.owner_id.clone(),
                    stored.title.clone(),
                    stored.description.clone(),
                    stored.mood.name().to_string(),
                    stored.date.timestamp_millis(),
                    serde_json::to_string(&stored.images)?
                ],
            )
            .await?;

        tracing::debug!("Inserted diary {}", stored.id);
        Ok(stored)
    }

    async fn update(&self, owner_id: &str, diary: &Diary) -> Result<Diary> {
        let rows = self
            .conn
            .execute(
                "UPDATE diaries
                 SET title = ?1, description = ?2, mood = ?3, date = ?4, images = ?5
                 WHERE id = ?6 AND owner_id = ?7",
                libsql::params![
                    diary.title.clone(),
                    diary.description.clone(),
                    diary.mood.name().to_string(),
                    diary.date.timestamp_millis(),
                    serde_json::to_string(&diary.images)?,
                    diary.id.as_str(),
                    owner_id.to_string()
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(diary.id.to_string()));
        }

        tracing::debug!("Updated diary {}", diary.id);
        self.get(owner_id, &diary.id)
            .await?
            .ok_or_else(|| Error::NotFound(diary.id.to_string()))
    }

    async fn delete(&self, owner_id: &str, id: &DiaryId) -> Result<Diary> {
        let Some(existing) = self.get(owner_id, id).await? else {
            return Err(Error::NotFound(id.to_string()));
        };

        let rows = self
            .conn
            .execute(
                "DELETE FROM diaries WHERE id = ?1 AND owner_id = ?2",
                libsql::params![id.as_str(), owner_id.to_string()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        tracing::debug!("Deleted diary {}", id);
        Ok(existing)
    }
}
