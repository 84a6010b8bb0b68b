//! CLI binary for polybiblioglot.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, drives one `ConversionSession` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use polybiblioglot::{
    convert, language, ApiErrorPolicy, CancellationToken, ConversionProgressCallback,
    ConversionSession, Credentials, PageOrder, PageSeparator, PipelineConfig, PolyglotError,
    ProgressCallback, RasterFormat, TranslationMethod,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a page bar during OCR, a spinner during
/// translation, and one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    /// The bar length is set by `on_conversion_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
            spinner: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .map(|mut m| m.remove(&page_num))
            .ok()
            .flatten()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognising {total_pages} page(s)…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.page_elapsed(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.page_elapsed(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, total_pages: usize, total_chars: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} page(s) recognised, {} chars",
            green("✔"),
            bold(&total_pages.to_string()),
            total_chars
        );
    }

    fn on_translation_start(&self, method: TranslationMethod, text_len: usize) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        spinner.set_prefix("Translating");
        spinner.set_message(format!("{text_len} chars via {method}"));
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    fn on_translation_complete(&self, method: TranslationMethod, text_len: usize, degraded: bool) {
        if let Some(spinner) = self.spinner.lock().ok().and_then(|mut s| s.take()) {
            spinner.finish_and_clear();
        }
        if degraded {
            eprintln!(
                "{} {} returned an error; it was kept as the translation",
                yellow("⚠"),
                method
            );
        } else {
            eprintln!("{} translated via {} ({} chars)", green("✔"), method, text_len);
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a scan and print the text
  polybiblioglot scan.png

  # OCR a PDF into a text file
  polybiblioglot book.pdf -o book.txt

  # OCR German, translate to French with the free-tier translator
  polybiblioglot brief.jpg --ocr-lang deu --translate

  # Translate with IBM Watson and save both files
  polybiblioglot report.pdf -o report.de.txt \
      --translate --from German --to English --method ibm \
      --token "$POLYBIBLIOGLOT_API_TOKEN" --translation-output report.en.txt

  # Everything as JSON
  polybiblioglot report.pdf --translate --json > report.json

  # Language names accepted by --from / --to
  polybiblioglot --list-languages

TRANSLATION METHODS:
  translator   Free public translator, no account. Only the first 499
               characters are translated.
  ibm          IBM Watson Language Translator. Needs --token.

ENVIRONMENT VARIABLES:
  POLYBIBLIOGLOT_API_TOKEN   API token for --method ibm
  PDFIUM_LIB_PATH            Path to libpdfium (file or directory)
  RUST_LOG                   Overrides --log-level / -v / -q

SETUP:
  1. Install tesseract and language packs (e.g. tesseract-ocr-deu).
  2. For PDFs, install pdfium or set PDFIUM_LIB_PATH.
"#;

/// OCR scanned documents and translate the text.
#[derive(Parser, Debug)]
#[command(
    name = "polybiblioglot",
    version,
    about = "OCR scanned images and PDFs to text, then translate it",
    long_about = "Extract text from scanned images (.png, .jpg, .jpeg) and PDFs with tesseract, \
then optionally translate it with a free-tier translator or IBM Watson Language Translator.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image or PDF to convert.
    #[arg(required_unless_present = "list_languages")]
    input: Option<PathBuf>,

    /// Write the recognised text to this file instead of stdout.
    #[arg(short, long, env = "POLYBIBLIOGLOT_OUTPUT")]
    output: Option<PathBuf>,

    /// Translate the recognised text.
    #[arg(long)]
    translate: bool,

    /// Source language name or code (see --list-languages). [default: German]
    #[arg(long, env = "POLYBIBLIOGLOT_FROM")]
    from: Option<String>,

    /// Destination language name or code. [default: French]
    #[arg(long, env = "POLYBIBLIOGLOT_TO")]
    to: Option<String>,

    /// Translation method: translator or ibm.
    #[arg(long, env = "POLYBIBLIOGLOT_METHOD", default_value = "translator")]
    method: String,

    /// API token for the ibm method.
    #[arg(long, env = "POLYBIBLIOGLOT_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Write the translation to this file instead of stdout.
    #[arg(long, env = "POLYBIBLIOGLOT_TRANSLATION_OUTPUT")]
    translation_output: Option<PathBuf>,

    /// Fail instead of keeping the provider's error text as the translation.
    #[arg(long)]
    strict_api_errors: bool,

    /// IBM translation endpoint.
    #[arg(long, env = "POLYBIBLIOGLOT_IBM_URL")]
    ibm_url: Option<String>,

    /// tesseract executable.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,

    /// tesseract language pack(s), e.g. deu or deu+fra.
    #[arg(long, env = "POLYBIBLIOGLOT_OCR_LANG")]
    ocr_lang: Option<String>,

    /// Directory with ocrs models (ocrs feature only).
    #[cfg(feature = "ocrs")]
    #[arg(long, env = "POLYBIBLIOGLOT_OCR_MODELS")]
    ocr_models: Option<PathBuf>,

    /// Pages OCR'd at once. Output order is unaffected.
    #[arg(short, long, env = "POLYBIBLIOGLOT_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Format PDF pages are rasterised to before OCR.
    #[arg(long, value_enum, default_value = "jpeg")]
    raster_format: RasterArg,

    /// Page separator: dashes, none, numbered, or a custom string.
    #[arg(long, env = "POLYBIBLIOGLOT_SEPARATOR", default_value = "dashes")]
    separator: String,

    /// Join pages last-to-first.
    #[arg(long)]
    reverse_pages: bool,

    /// Translation request timeout in seconds.
    #[arg(long, env = "POLYBIBLIOGLOT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Longest rendered edge for PDF pages, in pixels.
    #[arg(long, env = "POLYBIBLIOGLOT_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "POLYBIBLIOGLOT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print the language names accepted by --from / --to and exit.
    #[arg(long)]
    list_languages: bool,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, env = "POLYBIBLIOGLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output a JSON report instead of plain text.
    #[arg(long)]
    json: bool,

    /// Disable progress output.
    #[arg(long, env = "POLYBIBLIOGLOT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RasterArg {
    Jpeg,
    Png,
}

impl From<RasterArg> for RasterFormat {
    fn from(v: RasterArg) -> Self {
        match v {
            RasterArg::Jpeg => RasterFormat::Jpeg,
            RasterArg::Png => RasterFormat::Png,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;
    match run(cli).await {
        Err(e) if json => {
            println!("{}", error_report(&e));
            std::process::exit(1);
        }
        other => other,
    }
}

/// `{"error": {"kind", "message"}}` printed instead of a report when `--json` fails.
fn error_report(err: &anyhow::Error) -> serde_json::Value {
    let kind = err
        .chain()
        .find_map(|e| e.downcast_ref::<PolyglotError>())
        .map_or("other", PolyglotError::kind);
    serde_json::json!({
        "error": {
            "kind": kind,
            "message": format!("{err:#}"),
        }
    })
}

async fn run(cli: Cli) -> Result<()> {
    if cli.list_languages {
        for (name, code) in language::entries() {
            println!("{name:<24} {code}");
        }
        return Ok(());
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar covers stage-level feedback, so library INFO logs
    // are hidden while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = match (&cli.log_level, cli.verbose, cli.quiet || show_progress) {
        (Some(level), _, _) => level.to_lowercase(),
        (None, true, _) => "debug".to_string(),
        (None, false, true) => "error".to_string(),
        (None, false, false) => "info".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter)),
        )
        .with_writer(io::stderr)
        .init();

    let input = cli
        .input
        .clone()
        .context("No input document given")?;

    // ── Build session ────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let mut session = ConversionSession::new(config).context("Failed to set up the pipeline")?;

    // ── Convert ──────────────────────────────────────────────────────────
    let document = convert::select_document(&input).context("Invalid input")?;
    session.select(document);
    session
        .convert()
        .await
        .with_context(|| format!("Conversion of '{}' failed", input.display()))?;

    if let Some(ref path) = cli.output {
        convert::save_text(&session, path)
            .with_context(|| format!("Failed to save text to {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{}  text  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    // ── Translate ────────────────────────────────────────────────────────
    if cli.translate {
        let (source, destination) = session
            .config()
            .default_languages()
            .context("Invalid --from / --to")?;

        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        let job = session
            .begin_translate(
                source,
                destination,
                Some(cli.method.as_str()),
                Credentials::from_option(cli.token.clone()),
            )
            .context("Cannot translate")?
            .with_cancellation(cancel);
        let outcome = job.run().await;
        let translation = session
            .finish_translate(outcome)
            .context("Translation failed")?;

        if translation.degraded && !show_progress && !cli.quiet {
            eprintln!(
                "{} {} returned an error; it was kept as the translation",
                yellow("⚠"),
                translation.method
            );
        }

        if let Some(ref path) = cli.translation_output {
            convert::save_translation(&session, path)
                .with_context(|| format!("Failed to save translation to {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{}  translation  →  {}",
                    green("✔"),
                    bold(&path.display().to_string())
                );
            }
        }
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let report = session.report().context("No conversion result to report")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    // stdout gets the final product that was not already written to a file.
    let stdout_text = match (session.translation(), &cli.translation_output, &cli.output) {
        (Some(t), None, _) => Some(t.text.as_str()),
        (None, _, None) => session.text(),
        _ => None,
    };
    if let Some(text) = stdout_text {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let default_method = cli
        .method
        .parse::<TranslationMethod>()
        .context("Invalid --method")?;

    let mut builder = PipelineConfig::builder()
        .max_rendered_pixels(cli.max_pixels)
        .raster_format(cli.raster_format.into())
        .tesseract_path(&cli.tesseract)
        .ocr_concurrency(cli.concurrency)
        .page_separator(parse_separator(&cli.separator))
        .page_order(if cli.reverse_pages {
            PageOrder::Reverse
        } else {
            PageOrder::Forward
        })
        .default_method(default_method)
        .api_timeout_secs(cli.api_timeout)
        .api_error_policy(if cli.strict_api_errors {
            ApiErrorPolicy::Fail
        } else {
            ApiErrorPolicy::Degrade
        });

    if let Some(ref from) = cli.from {
        builder = builder.default_source_language(from);
    }
    if let Some(ref to) = cli.to {
        builder = builder.default_destination_language(to);
    }
    if let Some(ref lang) = cli.ocr_lang {
        builder = builder.ocr_language(lang);
    }
    #[cfg(feature = "ocrs")]
    if let Some(ref dir) = cli.ocr_models {
        builder = builder.ocr_model_dir(dir);
    }
    if let Some(ref url) = cli.ibm_url {
        builder = builder.ibm_url(url);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.pdf_password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "dashes" => PageSeparator::Dashes,
        "none" => PageSeparator::None,
        "numbered" => PageSeparator::Numbered,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
