//! Pipeline stages for docx-to-ebook conversion.
//!
//! Each submodule implements exactly one transformation step. The stages
//! are synchronous and CPU-bound; [`crate::convert`] runs them on the
//! blocking thread pool.
//!
//! ## Data Flow
//!
//! ```text
//!                          ┌──▶ epub ──▶ EPUB 3 container
//! input ──▶ docx ──▶ markup┤
//! (path)   (zip+XML) (HTML)└──▶ pdf  ──▶ A4 PDF document
//! ```
//!
//! 1. [`input`]  — validate a local path and the zip magic before reading
//! 2. [`docx`]   — open the Word package and turn its body into HTML
//! 3. [`markup`] — XML-safe text escaping and the XHTML chapter wrapper
//! 4. [`epub`]   — single-chapter EPUB 3 packager
//! 5. [`pdf`]    — flow layout of the HTML onto PDF pages

pub mod docx;
pub mod epub;
pub mod input;
pub mod markup;
pub mod pdf;

#[cfg(test)]
pub(crate) mod fixtures;
