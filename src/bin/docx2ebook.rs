//! CLI binary for docx2ebook.
//!
//! `docx2ebook serve` (the default) runs the web form service;
//! `docx2ebook convert` converts one local file. Both are thin shims that
//! map flags onto the library's config types.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, FromArgMatches, Parser, Subcommand};
use docx2ebook::config::DEFAULT_PORT;
use docx2ebook::naming::output_filename;
use docx2ebook::{
    convert_to_file, ConversionConfig, ConversionProgressCallback, ConversionRequest,
    ConversionStage, ConversionStats, OutputFormat, ProgressCallback, ServerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the current stage and prints converter warnings above
/// itself.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, format: OutputFormat, input_bytes: usize) {
        self.bar.set_prefix("Converting");
        self.bar
            .set_message(format!("{input_bytes} bytes → {}", format.extension()));
    }

    fn on_stage_start(&self, stage: ConversionStage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: ConversionStage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0))
        ));
    }

    fn on_warning(&self, message: &str) {
        self.bar.println(format!("  {} {}", yellow("⚠"), message));
    }

    fn on_conversion_complete(&self, _output_bytes: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the web form on port 5000 (same as `docx2ebook serve`)
  docx2ebook

  # Serve on another port, dropping files once they are sent
  docx2ebook serve --port 8080 --retain-artifacts false

  # Convert a file to EPUB next to the input (report.epub)
  docx2ebook convert report.docx --title "Relatório" --author "Ana Souza"

  # Convert to PDF with a larger body font
  docx2ebook convert report.docx --format pdf --pdf-font-size 12 -o out/report.pdf

ENVIRONMENT VARIABLES:
  PORT                        Listening port (default 5000)
  UPLOAD_DIR                  Directory for uploaded documents (default uploads)
  OUTPUT_DIR                  Directory for generated files (default output)
  MAX_CONCURRENT_CONVERSIONS  Conversions running at once (default: CPU count)
  MAX_UPLOAD_BYTES            Request body limit (default: unlimited)
  RETAIN_ARTIFACTS            Keep uploads and outputs (default true)
  CONVERSION_TIMEOUT_SECS     Time limit per conversion (default 120)
  RUST_LOG                    Log filter, overrides -v / -q
"#;

/// Convert Word documents to EPUB or PDF e-books.
#[derive(Parser, Debug)]
#[command(
    name = "docx2ebook",
    version,
    about = "Convert Word (.docx) documents to EPUB or PDF e-books",
    long_about = "Convert Word (.docx) documents to EPUB or PDF e-books, either through a \
small web form (`serve`, the default) or directly from the command line (`convert`).",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCX2EBOOK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCX2EBOOK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web form service.
    Serve(ServeArgs),
    /// Convert one local .docx file.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listening port; the host is always 0.0.0.0.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory for uploaded documents.
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory for generated e-books.
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Conversions allowed to run at once (default: CPU count).
    #[arg(long, env = "MAX_CONCURRENT_CONVERSIONS")]
    max_concurrent: Option<usize>,

    /// Reject request bodies larger than this many bytes.
    #[arg(long, env = "MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Keep uploads and generated files after responding.
    #[arg(long, env = "RETAIN_ARTIFACTS", default_value_t = true, action = ArgAction::Set,
          value_parser = clap::builder::BoolishValueParser::new())]
    retain_artifacts: bool,

    #[command(flatten)]
    conversion: ConversionArgs,
}

impl ServeArgs {
    /// Settings for a bare `docx2ebook`, resolved through clap so the
    /// `env` fallbacks apply exactly as they do for `docx2ebook serve`.
    fn from_env_and_defaults() -> Result<Self> {
        let matches = ServeArgs::augment_args(clap::Command::new("serve"))
            .try_get_matches_from(["serve"])
            .context("Invalid server settings in the environment")?;
        ServeArgs::from_arg_matches(&matches).context("Invalid server settings in the environment")
    }
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Path of the .docx file.
    input: String,

    /// Output file (default: input name with the new extension).
    #[arg(short, long, env = "DOCX2EBOOK_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, env = "DOCX2EBOOK_FORMAT", value_enum, default_value = "epub")]
    format: FormatArg,

    /// Book title (default: input file name without extension).
    #[arg(long)]
    title: Option<String>,

    /// Book author.
    #[arg(long, default_value = "")]
    author: String,

    /// Print a JSON summary (stats and warnings) on stdout.
    #[arg(long, env = "DOCX2EBOOK_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCX2EBOOK_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    conversion: ConversionArgs,
}

/// Settings shared by both subcommands.
#[derive(Args, Debug)]
struct ConversionArgs {
    /// Title of the single EPUB chapter.
    #[arg(long, env = "DOCX2EBOOK_CHAPTER_TITLE", default_value = "Conteúdo")]
    chapter_title: String,

    /// Language tag for the EPUB metadata.
    #[arg(long, env = "DOCX2EBOOK_LANGUAGE", default_value = "pt")]
    language: String,

    /// Base font size of PDF body text, in points (6–24).
    #[arg(long, env = "DOCX2EBOOK_PDF_FONT_SIZE", default_value_t = 10.0)]
    pdf_font_size: f32,

    /// Leave images out of the output.
    #[arg(long, env = "DOCX2EBOOK_NO_IMAGES")]
    no_images: bool,

    /// Time limit per conversion, in seconds.
    #[arg(long, env = "CONVERSION_TIMEOUT_SECS", default_value_t = 120)]
    timeout: u64,
}

impl ConversionArgs {
    fn build(&self, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
        let mut builder = ConversionConfig::builder()
            .chapter_title(self.chapter_title.as_str())
            .language(self.language.as_str())
            .pdf_font_size(self.pdf_font_size)
            .embed_images(!self.no_images)
            .timeout_secs(self.timeout);
        if let Some(cb) = progress {
            builder = builder.progress_callback(cb);
        }
        builder.build().context("Invalid conversion settings")
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Epub,
    Pdf,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Epub => OutputFormat::Epub,
            FormatArg::Pdf => OutputFormat::Pdf,
        }
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    output: &'a Path,
    format: OutputFormat,
    warnings: &'a [String],
    stats: &'a ConversionStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = resolve_command(cli.command)?;

    // ── Logging setup ────────────────────────────────────────────────────
    // While the spinner is active it gives all the feedback that matters,
    // so library INFO logs are suppressed.
    let spinner = matches!(&command, Command::Convert(args) if !args.no_progress && !args.json);
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match command {
        Command::Serve(args) => serve(args).await,
        Command::Convert(args) => convert(args, spinner && !cli.quiet, cli.quiet).await,
    }
}

/// A missing subcommand means `serve`.
fn resolve_command(command: Option<Command>) -> Result<Command> {
    match command {
        Some(command) => Ok(command),
        None => Ok(Command::Serve(ServeArgs::from_env_and_defaults()?)),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut builder = ServerConfig::builder()
        .port(args.port)
        .upload_dir(args.upload_dir)
        .output_dir(args.output_dir)
        .max_upload_bytes(args.max_upload_bytes)
        .retain_artifacts(args.retain_artifacts)
        .conversion(args.conversion.build(None)?);
    if let Some(n) = args.max_concurrent {
        builder = builder.max_concurrent_conversions(n);
    }
    let config = builder.build().context("Invalid server settings")?;

    docx2ebook::server::serve(config)
        .await
        .context("Server failed")
}

async fn convert(args: ConvertArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let format = OutputFormat::from(args.format);
    let input = Path::new(&args.input);

    let output_path = match args.output.clone() {
        Some(path) => path,
        None => {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.docx".to_string());
            input.with_file_name(output_filename(&name, format))
        }
    };
    let title = args.title.clone().unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = args.conversion.build(progress)?;
    let request = ConversionRequest::new(title, args.author.as_str(), format);

    let output = convert_to_file(&args.input, &output_path, &request, &config)
        .await
        .context("Conversion failed")?;

    if args.json {
        let summary = JsonSummary {
            output: &output_path,
            format,
            warnings: &output.warnings,
            stats: &output.stats,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !quiet {
        let pages = if format == OutputFormat::Pdf {
            format!("  {} page(s)", output.stats.pdf_pages)
        } else {
            String::new()
        };
        eprintln!(
            "{}  {} bytes{}  {} warning(s)  {}ms  →  {}",
            green("✔"),
            output.stats.output_bytes,
            pages,
            output.stats.warnings,
            output.stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}
