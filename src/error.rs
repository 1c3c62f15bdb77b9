//! Error types for the docx2ebook library.
//!
//! [`ConvertError`] covers every fatal failure of a conversion: the input
//! could not be read, the document is not a Word package, the packager or
//! renderer failed, or the conversion ran out of time.
//!
//! Errors are split into two classes by [`ConvertError::is_client_error`]:
//! problems with what the requester sent (bad format value, malformed
//! document) versus problems on our side (I/O, storage, renderer). The HTTP
//! layer uses the split to pick a status code and a log level.

use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docx2ebook library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a zip-based Word package.
    #[error("File is not a .docx package: '{path}'\nFirst bytes: {magic:?}")]
    NotADocx { path: PathBuf, magic: [u8; 4] },

    /// The requested output format is neither `epub` nor `pdf`.
    #[error("Invalid output format '{value}' (expected 'epub' or 'pdf')")]
    InvalidFormat { value: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The package could not be opened or its main part could not be parsed.
    #[error("Malformed document: {detail}")]
    MalformedDocument { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the EPUB container failed.
    #[error("EPUB packaging failed: {detail}")]
    EpubPackagingFailed { detail: String },

    /// The PDF renderer reported errors.
    #[error("PDF rendering reported {count} error(s); first: {first_error}")]
    PdfRenderFailed { count: usize, first_error: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The conversion did not finish within the configured time budget.
    #[error("Conversion timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── Storage errors ────────────────────────────────────────────────────
    #[error(transparent)]
    Storage(#[from] StorageError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// True when the failure was caused by what the requester sent.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidFormat { .. }
                | ConvertError::NotADocx { .. }
                | ConvertError::MalformedDocument { .. }
        )
    }

    /// Shorthand for a [`ConvertError::MalformedDocument`].
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        ConvertError::MalformedDocument {
            detail: detail.into(),
        }
    }
}
