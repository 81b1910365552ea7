//! Uploaded media on local disk

use anyhow::{Context, Result};
use std::path::Path;

pub const PROFILE_PHOTO_DIR: &str = "profile_photos";

/// Largest accepted profile photo upload.
pub const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;

/// File extension for an accepted image content type.
pub fn photo_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Write a profile photo under `<root>/profile_photos/` and return its path
/// relative to `root`.
pub async fn save_profile_photo(root: &Path, file_name: &str, bytes: &[u8]) -> Result<String> {
    let dir = root.join(PROFILE_PHOTO_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(format!("{}/{}", PROFILE_PHOTO_DIR, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_extension() {
        assert_eq!(photo_extension("image/jpeg"), Some("jpg"));
        assert_eq!(photo_extension("image/PNG; charset=binary"), Some("png"));
        assert_eq!(photo_extension("image/gif"), Some("gif"));
        assert_eq!(photo_extension("image/webp"), None);
        assert_eq!(photo_extension(""), None);
    }

    #[tokio::test]
    async fn test_save_profile_photo() {
        let dir = tempfile::tempdir().unwrap();
        let rel = save_profile_photo(dir.path(), "u1.png", b"png-bytes")
            .await
            .unwrap();
        assert_eq!(rel, "profile_photos/u1.png");
        let written = std::fs::read(dir.path().join(&rel)).unwrap();
        assert_eq!(written, b"png-bytes");
    }
}
