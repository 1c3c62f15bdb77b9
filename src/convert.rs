//! Conversion entry points.
//!
//! [`convert_bytes`] is the synchronous core: docx bytes in, EPUB or PDF
//! bytes out. The async wrappers move it onto tokio's blocking pool and put
//! a time limit on it, because document parsing and PDF layout are CPU-bound
//! and can take a long time on pathological input.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::format::OutputFormat;
use crate::output::{ConversionOutput, ConversionRequest, ConversionStats};
use crate::pipeline::epub::{self, EpubMetadata};
use crate::pipeline::pdf::{self, PdfOptions};
use crate::pipeline::{docx, input};
use crate::progress::ConversionStage;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Convert a `.docx` held in memory to the requested format.
///
/// Runs on the calling thread and ignores `config.timeout_secs`; use
/// [`convert`] from async code.
///
/// # Errors
/// - [`ConvertError::MalformedDocument`] when the package cannot be read
/// - [`ConvertError::EpubPackagingFailed`] when the archive cannot be built
/// - [`ConvertError::PdfRenderFailed`] when the renderer reports errors
pub fn convert_bytes(
    docx: &[u8],
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    let cb = config.progress_callback.as_deref();
    info!(
        "Starting {} conversion of '{}' ({} bytes)",
        request.format,
        request.title,
        docx.len()
    );
    if let Some(cb) = cb {
        cb.on_conversion_start(request.format, docx.len());
    }

    // ── Step 1: document → HTML ──────────────────────────────────────────
    if let Some(cb) = cb {
        cb.on_stage_start(ConversionStage::ConvertMarkup);
    }
    let markup_start = Instant::now();
    let markup = docx::convert_to_html(docx, config)?;
    let markup_duration_ms = markup_start.elapsed().as_millis() as u64;
    if let Some(cb) = cb {
        cb.on_stage_complete(ConversionStage::ConvertMarkup, markup_duration_ms);
        for w in &markup.warnings {
            cb.on_warning(w);
        }
    }
    debug!(
        "HTML ready: {} bytes in {}ms",
        markup.html.len(),
        markup_duration_ms
    );

    // ── Step 2: HTML → EPUB | PDF ────────────────────────────────────────
    if let Some(cb) = cb {
        cb.on_stage_start(ConversionStage::Package);
    }
    let package_start = Instant::now();
    let (bytes, pdf_pages) = match request.format {
        OutputFormat::Epub => (package_epub(&markup.html, request, config)?, 0),
        OutputFormat::Pdf => render_pdf(&markup.html, request, config)?,
    };
    let package_duration_ms = package_start.elapsed().as_millis() as u64;
    if let Some(cb) = cb {
        cb.on_stage_complete(ConversionStage::Package, package_duration_ms);
    }

    let stats = ConversionStats {
        input_bytes: docx.len(),
        html_bytes: markup.html.len(),
        output_bytes: bytes.len(),
        pdf_pages,
        warnings: markup.warnings.len(),
        markup_duration_ms,
        package_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} → {} bytes of {}, {} warning(s), {}ms total",
        stats.input_bytes, stats.output_bytes, request.format, stats.warnings, stats.total_duration_ms
    );
    if let Some(cb) = cb {
        cb.on_conversion_complete(bytes.len());
    }

    Ok(ConversionOutput {
        format: request.format,
        bytes,
        html: markup.html,
        warnings: markup.warnings,
        stats,
    })
}

/// Convert on the blocking thread pool, bounded by `config.timeout_secs`.
///
/// # Errors
/// Everything [`convert_bytes`] returns, plus [`ConvertError::Timeout`].
pub async fn convert(
    docx: Vec<u8>,
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    convert_guarded(docx, request, config, ()).await
}

/// Like [`convert`], but `guard` is held until the blocking work has really
/// finished.
///
/// A timeout only stops the caller from waiting; the thread keeps running
/// to completion. The server passes its semaphore permit here so an
/// abandoned conversion still counts against the concurrency bound.
pub async fn convert_guarded<G: Send + 'static>(
    docx: Vec<u8>,
    request: ConversionRequest,
    config: &ConversionConfig,
    guard: G,
) -> Result<ConversionOutput, ConvertError> {
    let secs = config.timeout_secs;
    let config = config.clone();
    let task = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        convert_bytes(&docx, &request, &config)
    });

    match tokio::time::timeout(Duration::from_secs(secs), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(ConvertError::Internal(format!(
            "conversion task failed: {e}"
        ))),
        Err(_) => {
            warn!("Conversion did not finish within {}s", secs);
            Err(ConvertError::Timeout { secs })
        }
    }
}

/// Convert a local `.docx` and write the result to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let input_path = input::resolve_input(input_str.as_ref())?;
    let docx = tokio::fs::read(&input_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ConvertError::PermissionDenied {
                path: input_path.clone(),
            }
        } else {
            ConvertError::FileNotFound {
                path: input_path.clone(),
            }
        }
    })?;

    let output = convert(docx, request.clone(), config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ConvertError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", request.format.extension()));
    tokio::fs::write(&tmp_path, &output.bytes)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("Wrote {}", path.display());
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    docx: Vec<u8>,
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(docx, request, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn package_epub(
    html: &str,
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<Vec<u8>, ConvertError> {
    let meta = EpubMetadata {
        title: request.title.clone(),
        author: request.author.clone(),
        language: config.language.clone(),
        identifier: request.identifier.clone(),
        modified: request.modified.clone().unwrap_or_else(now_timestamp),
        chapter_title: config.chapter_title.clone(),
    };
    epub::build_epub(html, &meta)
}

fn render_pdf(
    html: &str,
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<(Vec<u8>, usize), ConvertError> {
    let options = PdfOptions {
        title: request.title.clone(),
        base_font_size: config.pdf_font_size,
    };
    let mut bytes = Vec::new();
    let report = pdf::render_pdf(html, &options, &mut bytes);
    if report.has_errors() {
        for e in &report.errors {
            warn!("PDF renderer: {}", e);
        }
        return Err(ConvertError::PdfRenderFailed {
            count: report.errors.len(),
            first_error: report.errors.first().cloned().unwrap_or_default(),
        });
    }
    Ok((bytes, report.pages))
}

/// Current UTC time in the `dcterms:modified` format.
fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
