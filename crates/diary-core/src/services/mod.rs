//! Authenticated services over the local store.

mod diary_client;
mod images;
mod uploads;

pub use diary_client::{ClientOptions, DiaryClient};
pub use images::{
    purge_diary_images, resolve_image_urls, unqueue_diary_images, ImageLink, PurgeReport,
};
pub use uploads::{flush_pending_uploads, UploadReport};
