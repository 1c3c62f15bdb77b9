//! Configuration types for conversions and for the web service.
//!
//! [`ConversionConfig`] controls a single docx → EPUB/PDF conversion and is
//! shared by the CLI and the server. [`ServerConfig`] adds the HTTP-level
//! knobs (port, storage directories, concurrency bound) and can be read from
//! the environment with [`ServerConfig::from_env`].

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default listening port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 5000;

/// The server always listens on every interface.
pub const LISTEN_HOST: &str = "0.0.0.0";

/// Configuration for a docx conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use docx2ebook::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .chapter_title("Capítulo único")
///     .language("pt-BR")
///     .timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.language, "pt-BR");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Title of the single EPUB chapter and of its TOC entry. Default: "Conteúdo".
    pub chapter_title: String,

    /// Language tag written to the EPUB metadata and chapter. Default: "pt".
    pub language: String,

    /// Base body font size for PDF output, in points. Range: 6–24. Default: 10.
    ///
    /// Headings are scaled from this value.
    pub pdf_font_size: f32,

    /// Embed document images as data URIs in the HTML. Default: true.
    ///
    /// When off, images are dropped and only their alt text is lost.
    pub embed_images: bool,

    /// Upper bound on one conversion, in seconds. Default: 120.
    ///
    /// Only enforced by the async entry points; [`crate::convert::convert_bytes`]
    /// runs to completion.
    pub timeout_secs: u64,

    /// Optional stage-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            chapter_title: "Conteúdo".to_string(),
            language: "pt".to_string(),
            pdf_font_size: 10.0,
            embed_images: true,
            timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("chapter_title", &self.chapter_title)
            .field("language", &self.language)
            .field("pdf_font_size", &self.pdf_font_size)
            .field("embed_images", &self.embed_images)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn chapter_title(mut self, title: impl Into<String>) -> Self {
        self.config.chapter_title = title.into();
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn pdf_font_size(mut self, pt: f32) -> Self {
        self.config.pdf_font_size = pt;
        self
    }

    pub fn embed_images(mut self, v: bool) -> Self {
        self.config.embed_images = v;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !(6.0..=24.0).contains(&c.pdf_font_size) {
            return Err(ConvertError::InvalidConfig(format!(
                "PDF font size must be 6–24 pt, got {}",
                c.pdf_font_size
            )));
        }
        if c.timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        if c.language.trim().is_empty() {
            return Err(ConvertError::InvalidConfig("Language must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening port. Default: 5000 (`PORT`).
    pub port: u16,

    /// Directory for raw uploads. Default: `uploads` (`UPLOAD_DIR`).
    pub upload_dir: PathBuf,

    /// Directory for generated files. Default: `output` (`OUTPUT_DIR`).
    pub output_dir: PathBuf,

    /// Conversions allowed to run at the same time. Default: available
    /// parallelism (`MAX_CONCURRENT_CONVERSIONS`).
    ///
    /// Further requests wait for a free slot.
    pub max_concurrent_conversions: usize,

    /// Request body limit in bytes. Default: none (`MAX_UPLOAD_BYTES`).
    pub max_upload_bytes: Option<usize>,

    /// Keep uploads and generated files after responding. Default: true
    /// (`RETAIN_ARTIFACTS`).
    pub retain_artifacts: bool,

    /// Per-conversion settings.
    pub conversion: ConversionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            max_concurrent_conversions: default_concurrency(),
            max_upload_bytes: None,
            retain_artifacts: true,
            conversion: ConversionConfig::default(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the configuration from process environment variables.
    ///
    /// Unset variables keep their defaults; set-but-unparseable ones are an
    /// error rather than silently ignored.
    pub fn from_env() -> Result<Self, ConvertError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConvertError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(port) = lookup("PORT") {
            builder = builder.port(parse_env("PORT", &port)?);
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            builder = builder.upload_dir(dir);
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            builder = builder.output_dir(dir);
        }
        if let Some(n) = lookup("MAX_CONCURRENT_CONVERSIONS") {
            builder = builder.max_concurrent_conversions(parse_env("MAX_CONCURRENT_CONVERSIONS", &n)?);
        }
        if let Some(n) = lookup("MAX_UPLOAD_BYTES") {
            builder = builder.max_upload_bytes(Some(parse_env("MAX_UPLOAD_BYTES", &n)?));
        }
        if let Some(v) = lookup("RETAIN_ARTIFACTS") {
            builder = builder.retain_artifacts(parse_bool("RETAIN_ARTIFACTS", &v)?);
        }

        let mut conversion = ConversionConfig::builder();
        if let Some(secs) = lookup("CONVERSION_TIMEOUT_SECS") {
            conversion = conversion.timeout_secs(parse_env("CONVERSION_TIMEOUT_SECS", &secs)?);
        }

        builder.conversion(conversion.build()?).build()
    }

    /// `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", LISTEN_HOST, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConvertError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConvertError::InvalidConfig(format!("{key} has an invalid value: {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConvertError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConvertError::InvalidConfig(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn max_concurrent_conversions(mut self, n: usize) -> Self {
        self.config.max_concurrent_conversions = n.max(1);
        self
    }

    pub fn max_upload_bytes(mut self, limit: Option<usize>) -> Self {
        self.config.max_upload_bytes = limit;
        self
    }

    pub fn retain_artifacts(mut self, v: bool) -> Self {
        self.config.retain_artifacts = v;
        self
    }

    pub fn conversion(mut self, conversion: ConversionConfig) -> Self {
        self.config.conversion = conversion;
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConvertError> {
        if self.config.upload_dir == self.config.output_dir {
            return Err(ConvertError::InvalidConfig(
                "Upload and output directories must differ".into(),
            ));
        }
        if self.config.max_upload_bytes == Some(0) {
            return Err(ConvertError::InvalidConfig(
                "MAX_UPLOAD_BYTES must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn conversion_defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.chapter_title, "Conteúdo");
        assert_eq!(c.language, "pt");
        assert!(c.embed_images);
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn conversion_builder_validates() {
        assert!(ConversionConfig::builder().pdf_font_size(3.0).build().is_err());
        assert!(ConversionConfig::builder().timeout_secs(0).build().is_err());
        assert!(ConversionConfig::builder().language(" ").build().is_err());
        assert!(ConversionConfig::builder().pdf_font_size(12.0).build().is_ok());
    }

    #[test]
    fn server_defaults_from_empty_env() {
        let c = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.bind_addr(), "0.0.0.0:5000");
        assert_eq!(c.upload_dir, PathBuf::from("uploads"));
        assert_eq!(c.output_dir, PathBuf::from("output"));
        assert!(c.retain_artifacts);
        assert!(c.max_upload_bytes.is_none());
        assert!(c.max_concurrent_conversions >= 1);
    }

    #[test]
    fn server_reads_env() {
        let c = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("UPLOAD_DIR", "/tmp/in"),
            ("OUTPUT_DIR", "/tmp/out"),
            ("MAX_CONCURRENT_CONVERSIONS", "0"),
            ("MAX_UPLOAD_BYTES", "1048576"),
            ("RETAIN_ARTIFACTS", "false"),
            ("CONVERSION_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.upload_dir, PathBuf::from("/tmp/in"));
        // Clamped to at least one slot.
        assert_eq!(c.max_concurrent_conversions, 1);
        assert_eq!(c.max_upload_bytes, Some(1_048_576));
        assert!(!c.retain_artifacts);
        assert_eq!(c.conversion.timeout_secs, 15);
    }

    #[test]
    fn server_rejects_bad_env() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("PORT", "70000")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("RETAIN_ARTIFACTS", "maybe")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[
            ("UPLOAD_DIR", "same"),
            ("OUTPUT_DIR", "same")
        ]))
        .is_err());
    }
}
