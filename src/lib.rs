//! # docx2ebook
//!
//! Convert Word (`.docx`) documents to EPUB or PDF e-books, from a web form
//! or from the command line.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. Input    validate path and zip magic (CLI) or take the upload bytes
//!  ├─ 2. Markup   WordprocessingML → HTML (headings, lists, tables, images, notes)
//!  └─ 3. Package  HTML → single-chapter EPUB 3   or   HTML → A4 PDF pages
//! ```
//!
//! The web service (`server` feature) wraps the pipeline in a two-route axum
//! app: `GET /` serves the upload form, `POST /upload` stores the file,
//! converts it under a concurrency bound and a timeout, and returns the
//! e-book as an attachment.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docx2ebook::{convert, ConversionConfig, ConversionRequest, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let docx = std::fs::read("report.docx")?;
//!     let request = ConversionRequest::new("Relatório", "Ana Souza", OutputFormat::Epub);
//!     let output = convert(docx, request, &ConversionConfig::default()).await?;
//!     std::fs::write("report.epub", &output.bytes)?;
//!     for w in &output.warnings {
//!         eprintln!("warning: {w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum web form service ([`server::router`], [`server::serve`]) |
//! | `cli`    | on      | Enables the `docx2ebook` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable both when using only the library:
//! ```toml
//! docx2ebook = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ServerConfig, ServerConfigBuilder};
pub use convert::{convert, convert_bytes, convert_guarded, convert_sync, convert_to_file};
pub use error::ConvertError;
pub use format::OutputFormat;
pub use output::{ConversionOutput, ConversionRequest, ConversionStats};
pub use progress::{
    ConversionProgressCallback, ConversionStage, NoopProgressCallback, ProgressCallback,
};
pub use storage::{
    ArtifactHandle, ArtifactStore, LocalStore, MemoryStore, StorageArea, StorageError,
};
