use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image payload is not valid base64")]
    Decode(#[from] base64::DecodeError),
    #[error("Image payload is empty")]
    Empty,
    #[error("Failed to store image")]
    Io(#[from] std::io::Error),
}

/// Map a data-URL mime prefix to a file extension. Unknown types fall back
/// to png rather than rejecting; the bytes are stored as-is either way.
fn extension_for(meta: &str) -> &'static str {
    match meta {
        "data:image/jpeg" | "data:image/jpg" => "jpg",
        "data:image/gif" => "gif",
        "data:image/webp" => "webp",
        _ => "png",
    }
}

/// Decode a base64 image (either a `data:image/...;base64,` URL or a bare
/// base64 string), write it under `<media_root>/<subdir>/` with a random
/// name and return the media-relative path, e.g. "avatars/<uuid>.png".
pub async fn save_base64_image(
    media_root: &Path,
    subdir: &str,
    data: &str,
) -> Result<String, MediaError> {
    let (ext, payload) = match data.split_once(";base64,") {
        Some((meta, payload)) => (extension_for(meta), payload),
        None => ("png", data),
    };

    let bytes = STANDARD.decode(payload.trim())?;
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    let dir = media_root.join(subdir);
    tokio::fs::create_dir_all(&dir).await?;

    let filename = format!("{}.{}", Uuid::new_v4(), ext);
    let target = dir.join(&filename);
    tokio::fs::write(&target, &bytes).await?;
    debug!("Stored {} byte image at {}", bytes.len(), target.display());

    Ok(format!("{subdir}/{filename}"))
}

/// Best-effort removal of a previously stored media file.
pub async fn remove_media_file(media_root: &Path, relative_path: &str) {
    let target = media_root.join(relative_path);
    if let Err(err) = tokio::fs::remove_file(&target).await {
        debug!("Could not remove media file {}: {err}", target.display());
    }
}

/// Public URL for a stored media-relative path.
pub fn media_url(relative_path: &str) -> String {
    format!("/media/{relative_path}")
}
