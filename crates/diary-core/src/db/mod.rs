//! Database layer for Diary

mod connection;
mod diary_repository;
mod migrations;
mod upload_queue;

pub use connection::{Database, SyncConfig};
pub use diary_repository::{DiaryRepository, LibSqlDiaryRepository};
pub use upload_queue::{LibSqlUploadQueue, UploadQueue};
