//! Pending image upload model

use serde::{Deserialize, Serialize};

/// An image that was picked locally and is not yet confirmed uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImageUpload {
    /// Local sequence key; upserts replace the row with the same id.
    pub id: i64,
    /// Storage path the image is uploaded to.
    pub remote_path: String,
    /// Local file path of the picked image.
    pub local_path: String,
}

impl PendingImageUpload {
    pub fn new(id: i64, remote_path: impl Into<String>, local_path: impl Into<String>) -> Self {
        Self {
            id,
            remote_path: remote_path.into(),
            local_path: local_path.into(),
        }
    }
}
