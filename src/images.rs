//! Image payload encoding
//!
//! Image bytes are opaque to everything downstream; they are read once,
//! base64-encoded, and forwarded verbatim on every inference call.

use crate::error::{ChatError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// Read an image file and return its base64 encoding
pub fn encode_image(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| ChatError::Image(format!("{}: {}", path.display(), e)))?;

    debug!(path = %path.display(), bytes = bytes.len(), "image encoded");
    Ok(STANDARD.encode(bytes))
}

/// Encode several image files, failing on the first unreadable path
pub fn encode_images<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<String>> {
    paths.iter().map(encode_image).collect()
}
