//! The two output formats a document can be converted to.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target format of a conversion.
///
/// Parsed from the `format` form field. Only the exact lowercase strings
/// `epub` and `pdf` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Epub,
    Pdf,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Epub => "epub",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// MIME type used for the download response.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Epub => "application/epub+zip",
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "epub" => Ok(OutputFormat::Epub),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(ConvertError::InvalidFormat {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
