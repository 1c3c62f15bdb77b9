//! Request and result types of a conversion.

use crate::format::OutputFormat;
use serde::{Deserialize, Serialize};

/// What the requester asked for: book metadata plus the target format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub title: String,
    pub author: String,
    pub format: OutputFormat,
    /// Value of the EPUB `dc:identifier`. Defaults to a fresh `urn:uuid:`.
    pub identifier: String,
    /// Value of the EPUB `dcterms:modified` (`YYYY-MM-DDThh:mm:ssZ`).
    /// `None` stamps the current time.
    pub modified: Option<String>,
}

impl ConversionRequest {
    pub fn new(title: impl Into<String>, author: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            format,
            identifier: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            modified: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Pin the modification timestamp, making EPUB output reproducible.
    pub fn with_modified(mut self, modified: impl Into<String>) -> Self {
        self.modified = Some(modified.into());
        self
    }
}

/// The generated file plus what happened on the way.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub format: OutputFormat,
    /// Complete EPUB archive or PDF document.
    pub bytes: Vec<u8>,
    /// The intermediate HTML the output was built from.
    pub html: String,
    /// Non-fatal converter messages.
    pub warnings: Vec<String>,
    pub stats: ConversionStats,
}

/// Sizes and timings of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub input_bytes: usize,
    pub html_bytes: usize,
    pub output_bytes: usize,
    /// Pages written (PDF only; 0 for EPUB).
    pub pdf_pages: usize,
    pub warnings: usize,
    pub markup_duration_ms: u64,
    pub package_duration_ms: u64,
    pub total_duration_ms: u64,
}
