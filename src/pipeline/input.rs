//! Input resolution: validate a user-supplied path before reading it.
//!
//! A `.docx` is a zip archive, so every valid input starts with the local
//! file header signature `PK\x03\x04`. Checking it up front gives callers a
//! meaningful error instead of a zip parser failure deep in the pipeline.

use crate::error::ConvertError;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

/// First four bytes of every zip local file header.
pub const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// True when `bytes` start like a zip archive.
pub fn looks_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_MAGIC)
}

/// Resolve a local file path, validating existence, permissions and the
/// zip magic bytes.
pub fn resolve_input(path_str: &str) -> Result<PathBuf, ConvertError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ConvertError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            let read = f.read(&mut magic).unwrap_or(0);
            if read < magic.len() || magic != ZIP_MAGIC {
                return Err(ConvertError::NotADocx { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConvertError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ConvertError::FileNotFound { path });
        }
    }

    debug!("Resolved local document: {}", path.display());
    Ok(path)
}
