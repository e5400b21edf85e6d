//! Remote image storage seam and object path helpers.

mod media;

use std::path::Path;

pub use media::MediaApiClient;

use crate::error::{Error, Result};

/// Remote blob storage for diary images (async)
///
/// Paths are the opaque strings recorded in `Diary::images`.
#[allow(async_fn_in_trait)]
pub trait ImageStorage {
    /// Upload image bytes to `remote_path`, replacing any existing object
    async fn upload(&self, remote_path: &str, content_type: &str, bytes: &[u8]) -> Result<()>;

    /// Resolve a short-lived URL the image can be fetched from
    async fn download_url(&self, remote_path: &str) -> Result<String>;

    /// Remove the object at `remote_path`
    async fn delete(&self, remote_path: &str) -> Result<()>;
}

/// Build the remote path for a picked image: `images/{owner}/{stem}-{millis}.{ext}`.
///
/// Files without an extension are stored as `jpg`.
pub fn image_remote_path(owner_id: &str, local_path: &Path, now_ms: i64) -> Result<String> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(Error::InvalidInput("Image owner must not be empty".into()));
    }

    let stem = local_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            Error::InvalidInput(format!("Not an image file: {}", local_path.display()))
        })?;
    let extension = local_path
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| !extension.is_empty())
        .map_or_else(|| "jpg".to_string(), str::to_ascii_lowercase);

    Ok(format!("images/{owner_id}/{stem}-{now_ms}.{extension}"))
}

/// Guess an image MIME type from a path's extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, extension)| extension);
    match extension.map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn image_remote_path_uses_owner_stem_and_timestamp() {
        let path = image_remote_path("u1", &PathBuf::from("/photos/Cat.PNG"), 1_700_000_000_123)
            .unwrap();
        assert_eq!(path, "images/u1/Cat-1700000000123.png");
    }

    #[test]
    fn image_remote_path_defaults_extension() {
        let path = image_remote_path("u1", &PathBuf::from("/photos/scan"), 5).unwrap();
        assert_eq!(path, "images/u1/scan-5.jpg");
    }

    #[test]
    fn image_remote_path_rejects_missing_parts() {
        assert!(matches!(
            image_remote_path(" ", &PathBuf::from("a.jpg"), 1),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            image_remote_path("u1", &PathBuf::from("/"), 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn content_type_for_known_extensions() {
        assert_eq!(content_type_for("images/u1/a-1.JPG"), "image/jpeg");
        assert_eq!(content_type_for("images/u1/a-1.png"), "image/png");
        assert_eq!(content_type_for("images/u1/a-1"), "application/octet-stream");
    }
}
