//! Data models for Diary

mod diary;
mod mood;
mod upload;

pub use diary::{Diary, DiaryGroups, DiaryId};
pub use mood::Mood;
pub use upload::PendingImageUpload;
