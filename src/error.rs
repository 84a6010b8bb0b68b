//! Error types for the polybiblioglot library.
//!
//! Every operation returns [`PolyglotError`]. The variants fall into three
//! groups that callers treat differently:
//!
//! * **Input errors** (`InvalidInput`, `FileNotFound`, `UnsupportedFileType`)
//!   are recovered locally by the session: logged, operation aborted, state
//!   unchanged.
//! * **Engine errors** (`ExtractionFailure`, `PdfiumBindingFailed`) come from
//!   the OCR engine or the rasteriser and are propagated, never masked.
//! * **Translation errors** (`InvalidTranslationMethod`, `AuthenticationError`,
//!   `ApiError`, `Timeout`, `Cancelled`, `Request`) abort a translation.
//!   `ApiError` displays the raw provider body and nothing else, so an adapter
//!   can show it to the user verbatim.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the polybiblioglot library.
#[derive(Debug, Error)]
pub enum PolyglotError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No path was provided.
    #[error("Conversion aborted. No path provided.")]
    InvalidInput,

    /// The selected file does not exist or cannot be opened.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Extension is not one of `.pdf`, `.png`, `.jpg`, `.jpeg`.
    #[error("Conversion aborted. File type unsupported: '{path}'")]
    UnsupportedFileType { path: PathBuf },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The OCR engine or the PDF rasteriser failed.
    #[error(
        "Extraction failed for '{path}'{}: {detail}",
        .page.map(|p| format!(" (page {p})")).unwrap_or_default()
    )]
    ExtractionFailure {
        path: PathBuf,
        page: Option<usize>,
        detail: String,
    },

    /// Extraction succeeded but produced no pages.
    #[error("No pages could be extracted from '{path}'")]
    EmptyExtraction { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Translation errors ────────────────────────────────────────────────
    /// The translation method is not a recognised provider identifier.
    #[error("Translation method is invalid: '{method}'")]
    InvalidTranslationMethod { method: String },

    /// A provider that needs credentials was called without them.
    #[error("Authentication error for provider '{provider}': {detail}")]
    AuthenticationError { provider: String, detail: String },

    /// The remote provider answered with a non-success status.
    ///
    /// Displays only the raw response body.
    #[error("{body}")]
    ApiError {
        provider: String,
        status: u16,
        body: String,
    },

    /// The remote call exceeded the configured timeout.
    #[error("Translation request to '{provider}' timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// The translation was cancelled by the caller.
    #[error("Translation was cancelled")]
    Cancelled,

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("Request to '{provider}' failed: {detail}")]
    Request { provider: String, detail: String },

    /// Language name is not in the language table.
    #[error("Unknown language '{name}'")]
    UnknownLanguage { name: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// The action is not permitted in the current session state.
    #[error("Cannot {action} while the session is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    /// Another operation is already running on this session.
    #[error("Cannot {action}: '{running}' is still in progress")]
    Busy {
        action: &'static str,
        running: &'static str,
    },

    /// A job finished after the session moved on to another document.
    #[error("Discarded {action} result: the session changed while it was running")]
    StaleResult { action: &'static str },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the text file.
    #[error("Failed to save '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure inside an OCR engine or rasteriser.
///
/// Engines know nothing about documents or page numbers; the extractor
/// wraps this into [`PolyglotError::ExtractionFailure`] with that context.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{engine}: {detail}")]
pub struct EngineError {
    pub engine: String,
    pub detail: String,
}

impl EngineError {
    pub fn new(engine: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            detail: detail.into(),
        }
    }
}

impl PolyglotError {
    /// Wrap an engine failure with the document and page it happened on.
    pub fn extraction(path: &std::path::Path, page: Option<usize>, err: EngineError) -> Self {
        PolyglotError::ExtractionFailure {
            path: path.to_path_buf(),
            page,
            detail: err.to_string(),
        }
    }

    /// Whether the adapter should simply report the error and keep going.
    ///
    /// Engine and internal failures are not recoverable: retrying the same
    /// input will fail the same way.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PolyglotError::ExtractionFailure { .. }
                | PolyglotError::PdfiumBindingFailed(_)
                | PolyglotError::Internal(_)
        )
    }

    /// Short stable name of the error kind, used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            PolyglotError::InvalidInput => "invalid_input",
            PolyglotError::FileNotFound { .. } => "file_not_found",
            PolyglotError::UnsupportedFileType { .. } => "unsupported_file_type",
            PolyglotError::ExtractionFailure { .. } => "extraction_failure",
            PolyglotError::EmptyExtraction { .. } => "empty_extraction",
            PolyglotError::PdfiumBindingFailed(_) => "pdfium_binding_failed",
            PolyglotError::InvalidTranslationMethod { .. } => "invalid_translation_method",
            PolyglotError::AuthenticationError { .. } => "authentication_error",
            PolyglotError::ApiError { .. } => "api_error",
            PolyglotError::Timeout { .. } => "timeout",
            PolyglotError::Cancelled => "cancelled",
            PolyglotError::Request { .. } => "request",
            PolyglotError::UnknownLanguage { .. } => "unknown_language",
            PolyglotError::InvalidState { .. } => "invalid_state",
            PolyglotError::Busy { .. } => "busy",
            PolyglotError::StaleResult { .. } => "stale_result",
            PolyglotError::SaveFailed { .. } => "save_failed",
            PolyglotError::InvalidConfig(_) => "invalid_config",
            PolyglotError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_raw_body_only() {
        let e = PolyglotError::ApiError {
            provider: "ibm".into(),
            status: 500,
            body: "quota exceeded".into(),
        };
        assert_eq!(e.to_string(), "quota exceeded");
    }

    #[test]
    fn extraction_failure_mentions_page() {
        let e = PolyglotError::ExtractionFailure {
            path: PathBuf::from("scan.pdf"),
            page: Some(3),
            detail: "tesseract exited with 1".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("scan.pdf"), "got: {msg}");
    }

    #[test]
    fn extraction_failure_without_page() {
        let e = PolyglotError::ExtractionFailure {
            path: PathBuf::from("a.png"),
            page: None,
            detail: "boom".into(),
        };
        assert!(!e.to_string().contains("page"));
    }

    #[test]
    fn invalid_state_display() {
        let e = PolyglotError::InvalidState {
            action: "translate",
            state: "selected",
        };
        assert_eq!(e.to_string(), "Cannot translate while the session is selected");
    }

    #[test]
    fn recoverable_classification() {
        assert!(PolyglotError::InvalidInput.is_recoverable());
        assert!(PolyglotError::Cancelled.is_recoverable());
        assert!(!PolyglotError::PdfiumBindingFailed("nope".into()).is_recoverable());
        assert!(!PolyglotError::Internal("bug".into()).is_recoverable());
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(
            PolyglotError::AuthenticationError {
                provider: "ibm".into(),
                detail: "The token was not found".into(),
            }
            .kind(),
            "authentication_error"
        );
        assert_eq!(PolyglotError::InvalidInput.kind(), "invalid_input");
    }
}
