//! CLI binary for edgequake-keywords.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints the keyword line.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_keywords::config::BASE_URL_ENV;
use edgequake_keywords::{
    extract_keywords, ExtractionConfig, ExtractionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while loading, a bar across the
/// model calls, then a spinner again while the embedding model scores the
/// candidates.
struct CliProgressCallback {
    bar: ProgressBar,
    unit_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Loading");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            unit_started: Mutex::new(None),
        })
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_units: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_units as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Prompting");
        self.bar.reset_eta();
    }

    fn on_unit_start(&self, unit: usize, _total_units: usize) {
        if let Ok(mut started) = self.unit_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {unit}"));
    }

    fn on_unit_complete(&self, unit: usize, total_units: usize, keywords: usize) {
        let elapsed_ms = self
            .unit_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<14}  {}",
            green("✓"),
            unit,
            total_units,
            dim(&format!("{keywords:>3} keywords")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_filter_start(&self, candidates: usize) {
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Filtering");
        self.bar
            .set_message(format!("scoring {candidates} candidates with SciBERT…"));
    }

    fn on_extraction_complete(&self, kept: usize, candidates: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} of {} candidates kept",
            green("✔"),
            bold(&kept.to_string()),
            candidates
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Keywords from a PDF, server URL from .env
  doc2kw lecture-notes.pdf

  # Explicit server
  doc2kw --base-url https://abc.ngrok.app slide.png

  # Route through an edgequake-llm provider instead of Ollama
  doc2kw --provider openai --text-model gpt-4.1-mini --image-model gpt-4.1-mini notes.docx

  # Offline embedding model
  doc2kw --embedding-dir ./scibert_scivocab_uncased notes.txt

  # Candidates with their similarity scores
  doc2kw --json notes.txt > keywords.json

SUPPORTED INPUTS:
  .jpg .jpeg .png .gif .bmp   sent whole to the image model
  .pdf                        text per page (needs libpdfium)
  .doc .docx                  Word text (.docx format only)
  anything else               read as UTF-8 text

ENVIRONMENT VARIABLES:
  ngrok_ollama_server     Base URL of the Ollama server (also read from .env)
  EDGEQUAKE_PROVIDER      edgequake-llm provider name (openai, anthropic, gemini, ollama)
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  HF_HOME                 Hugging Face cache for the embedding model
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Extract computer-science and mathematics keywords from a file.
#[derive(Parser, Debug)]
#[command(
    name = "doc2kw",
    version,
    about = "Extract computer-science and mathematics keywords from documents and images",
    long_about = "Send a document or image to a remote language model for keyword suggestions, \
then keep only the keywords a SciBERT embedding places close to mathematics or computer science. \
Prints the kept keywords on one line, separated by \", \".",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image, PDF, Word or text file.
    input: PathBuf,

    /// Base URL of the Ollama-compatible inference server.
    #[arg(long, env = BASE_URL_ENV)]
    base_url: Option<String>,

    /// edgequake-llm provider to use instead of the Ollama server.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Model for image inputs.
    #[arg(long, env = "DOC2KW_IMAGE_MODEL", default_value = edgequake_keywords::config::DEFAULT_IMAGE_MODEL)]
    image_model: String,

    /// Model for document chunks.
    #[arg(long, env = "DOC2KW_TEXT_MODEL", default_value = edgequake_keywords::config::DEFAULT_TEXT_MODEL)]
    text_model: String,

    /// Hugging Face repository of the embedding model.
    #[arg(long, env = "DOC2KW_EMBEDDING_MODEL", default_value = edgequake_keywords::config::DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Local directory with the embedding model files (no download).
    #[arg(long, env = "DOC2KW_EMBEDDING_DIR")]
    embedding_dir: Option<PathBuf>,

    /// Maximum chunk length in characters.
    #[arg(long, env = "DOC2KW_CHUNK_SIZE", default_value_t = 1000)]
    chunk_size: usize,

    /// Characters shared between neighbouring chunks.
    #[arg(long, env = "DOC2KW_CHUNK_OVERLAP", default_value_t = 10)]
    chunk_overlap: usize,

    /// Per-request timeout in seconds for the inference server.
    #[arg(long, env = "DOC2KW_TIMEOUT")]
    timeout: Option<u64>,

    /// Output structured JSON (keywords, scored candidates, stats).
    #[arg(long, env = "DOC2KW_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2KW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2KW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the keyword line.
    #[arg(short, long, env = "DOC2KW_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the shell.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract_keywords(&cli.input, &config)
        .await
        .with_context(|| format!("Keyword extraction failed for {}", cli.input.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    } else {
        writeln!(handle, "{}", output.keyword_line()).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{}  {} {}  {} model calls  {}ms total",
            cyan("◆"),
            output.stats.units,
            output.stats.input_kind,
            output.stats.model_calls,
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .image_model(&cli.image_model)
        .text_model(&cli.text_model)
        .embedding_model(&cli.embedding_model)
        .chunk_size(cli.chunk_size)
        .chunk_overlap(cli.chunk_overlap);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref dir) = cli.embedding_dir {
        builder = builder.embedding_model_dir(dir);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
