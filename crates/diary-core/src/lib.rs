//! diary-core - Core library for Diary
//!
//! This crate contains the diary models, the owner-scoped libSQL store, the
//! pending image upload queue, and the auth/sync/media clients used by the
//! Diary front ends.

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

pub use auth::{AuthUser, Identity};
pub use error::{Error, Result};
pub use models::{Diary, DiaryGroups, DiaryId, Mood, PendingImageUpload};
pub use services::{
    flush_pending_uploads, purge_diary_images, resolve_image_urls, unqueue_diary_images,
    ClientOptions, DiaryClient, ImageLink, PurgeReport, UploadReport,
};
pub use state::RequestState;
