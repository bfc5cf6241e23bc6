//! Background image selection.
//!
//! The pick is a pure function of the directory listing and the revision, so
//! re-rendering a commit always lands on the same image.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, RenderError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Image files directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        let is_image = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Pick one image from `dir` for `revision`, or `None` when there are none.
pub fn pick(dir: &Path, revision: &str) -> Result<Option<PathBuf>, RenderError> {
    let images = list_images(dir)?;
    if images.is_empty() {
        return Ok(None);
    }
    let digest = Sha256::digest(revision.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let index = (u64::from_be_bytes(prefix) % images.len() as u64) as usize;
    Ok(images.into_iter().nth(index))
}

/// `file://` URL for an image path, absolutised when possible.
pub fn file_url(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = absolute.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}
