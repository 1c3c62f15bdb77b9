//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to be told
//! when each stage of a conversion starts and finishes. The CLI uses it to
//! drive a spinner; tests use it to observe stage order.
//!
//! # Example
//!
//! ```rust
//! use docx2ebook::{ConversionConfig, ConversionProgressCallback, ConversionStage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     stages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: ConversionStage, elapsed_ms: u64) {
//!         self.stages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} took {elapsed_ms}ms");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { stages: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::format::OutputFormat;
use std::fmt;
use std::sync::Arc;

/// The steps of one conversion, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    /// docx package → HTML markup.
    ConvertMarkup,
    /// HTML → EPUB container or PDF pages.
    Package,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionStage::ConvertMarkup => f.write_str("converting document"),
            ConversionStage::Package => f.write_str("packaging output"),
        }
    }
}

/// Called by the dispatcher as a conversion moves through its stages.
///
/// Implementations must be `Send + Sync`: conversions run on the blocking
/// thread pool and several may run at once. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any work starts.
    fn on_conversion_start(&self, format: OutputFormat, input_bytes: usize) {
        let _ = (format, input_bytes);
    }

    fn on_stage_start(&self, stage: ConversionStage) {
        let _ = stage;
    }

    fn on_stage_complete(&self, stage: ConversionStage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Non-fatal converter message (unrecognised style, missing image, ...).
    fn on_warning(&self, message: &str) {
        let _ = message;
    }

    /// Called once after the output bytes exist.
    fn on_conversion_complete(&self, output_bytes: usize) {
        let _ = output_bytes;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_conversion_start(&self, format: OutputFormat, input_bytes: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {format} {input_bytes}"));
        }

        fn on_stage_start(&self, stage: ConversionStage) {
            self.events.lock().unwrap().push(format!("begin {stage}"));
        }

        fn on_conversion_complete(&self, output_bytes: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {output_bytes}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(OutputFormat::Pdf, 10);
        cb.on_stage_start(ConversionStage::ConvertMarkup);
        cb.on_stage_complete(ConversionStage::ConvertMarkup, 3);
        cb.on_warning("Unrecognised paragraph style");
        cb.on_conversion_complete(42);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_conversion_start(OutputFormat::Epub, 7);
        rec.on_stage_start(ConversionStage::Package);
        rec.on_stage_complete(ConversionStage::Package, 1); // default no-op
        rec.on_conversion_complete(99);
        assert_eq!(
            *rec.events.lock().unwrap(),
            vec!["start epub 7", "begin packaging output", "done 99"]
        );
    }
}
