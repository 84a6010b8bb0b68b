//! # polybiblioglot
//!
//! OCR scanned images and PDFs into plain text, then machine-translate it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Select     classify by extension (pdf / png / jpg / jpeg)
//!  ├─ 2. Render     rasterise PDF pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. OCR        tesseract per page, in page order
//!  ├─ 4. Clean      strip form feeds, normalise whitespace
//!  ├─ 5. Translate  free-tier translator or IBM Watson, via a provider registry
//!  └─ 6. Save       atomic write of text or translation
//! ```
//!
//! Everything runs through a [`ConversionSession`], a small state machine
//! (`Idle → Selected → Converted → Translated`) that decides which actions
//! are currently allowed ([`ActionGates`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polybiblioglot::{convert, ConversionSession, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ConversionSession::new(PipelineConfig::default())?;
//!     session.select(convert::select_document("scan.pdf")?);
//!     let pages = convert::convert(&mut session).await?;
//!     eprintln!("{} pages", pages.len());
//!
//!     let french = convert::translate(&mut session, "German", "French", None, None).await?;
//!     convert::save(&french, "scan.fr.txt")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `polybiblioglot` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `ocrs`  | off     | Pure-Rust OCR engine as an alternative to the tesseract CLI |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! polybiblioglot = { version = "0.2", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! * `tesseract` on `PATH` (or `PipelineConfig::tesseract_path`), with the
//!   language packs you need.
//! * A pdfium shared library for PDFs: set `PDFIUM_LIB_PATH` or install it
//!   system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod extract;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ApiErrorPolicy, PageOrder, PageSeparator, PipelineConfig, PipelineConfigBuilder, RasterFormat,
};
pub use convert::{extract_text, extract_text_sync, save, select_document};
pub use document::{Document, DocumentKind};
pub use error::{EngineError, PolyglotError};
pub use extract::{DocumentExtractor, PageExtractor};
pub use language::LanguageCode;
pub use output::{ConversionReport, PageText, TranslationResult};
pub use pipeline::ocr::{OcrEngine, OcrSource, TesseractEngine};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{
    ActionGates, ConversionSession, ConvertJob, ConvertOutcome, Operation, SessionState,
    TranslateJob, TranslateOutcome,
};
pub use translate::{
    Credentials, ProviderRegistry, TranslationMethod, TranslationProvider, TranslationRequest,
};
pub use tokio_util::sync::CancellationToken;
