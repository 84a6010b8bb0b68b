//! The conversion session: one document moving through
//! `Idle → Selected → Converted → Translated`.
//!
//! ## Jobs
//!
//! Extraction and translation can take minutes, and the session must stay
//! responsive meanwhile. Each long operation is therefore split in three:
//!
//! ```text
//! begin_convert()  ── &mut session, marks it in flight, returns a ConvertJob
//! job.run().await  ── owned, Send + 'static; run it anywhere (tokio::spawn)
//! finish_convert() ── &mut session, applies the outcome
//! ```
//!
//! While a job is in flight the gates disable convert and translate, and a
//! second `begin_*` fails with [`PolyglotError::Busy`]. Selecting another
//! document or resetting bumps the session generation, so an outcome that
//! arrives afterwards is discarded with [`PolyglotError::StaleResult`]
//! instead of overwriting the new document's state.
//!
//! [`ConversionSession::convert`] and [`ConversionSession::translate`] do all
//! three steps in one call for callers that can simply await.

use crate::config::{ApiErrorPolicy, PipelineConfig};
use crate::document::Document;
use crate::error::PolyglotError;
use crate::extract::{DocumentExtractor, PageExtractor};
use crate::language::LanguageCode;
use crate::output::{ConversionReport, PageText, TranslationResult};
use crate::translate::{Credentials, ProviderRegistry, TranslationMethod, TranslationRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Selected,
    Converted,
    Translated,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Selected => "selected",
            SessionState::Converted => "converted",
            SessionState::Translated => "translated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Convert,
    Translate,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Convert => "convert",
            Operation::Translate => "translate",
        }
    }
}

/// Which user actions are currently allowed.
///
/// A pure function of session state and the in-flight marker; adapters
/// enable or disable their controls from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionGates {
    pub convert: bool,
    pub translate: bool,
    pub save_text: bool,
    pub save_translation: bool,
}

/// Extraction of the selected document, detached from the session.
pub struct ConvertJob {
    generation: u64,
    path: PathBuf,
    extractor: Arc<dyn PageExtractor>,
}

impl ConvertJob {
    pub async fn run(self) -> ConvertOutcome {
        let start = Instant::now();
        let result = self.extractor.extract(&self.path).await;
        ConvertOutcome {
            generation: self.generation,
            result,
            elapsed: start.elapsed(),
        }
    }
}

/// What a [`ConvertJob`] produced. Hand it to [`ConversionSession::finish_convert`].
pub struct ConvertOutcome {
    generation: u64,
    result: Result<PageText, PolyglotError>,
    elapsed: Duration,
}

impl ConvertOutcome {
    pub fn result(&self) -> Result<&PageText, &PolyglotError> {
        self.result.as_ref()
    }
}

/// Translation of the session's text, detached from the session.
pub struct TranslateJob {
    generation: u64,
    method: TranslationMethod,
    request: TranslationRequest,
    registry: Arc<ProviderRegistry>,
    cancel: CancellationToken,
    config: PipelineConfig,
}

impl TranslateJob {
    /// A token that aborts this job with [`PolyglotError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Use `token` instead of the job's own cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn method(&self) -> TranslationMethod {
        self.method
    }

    pub async fn run(self) -> TranslateOutcome {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_translation_start(self.method, self.request.text.chars().count());
        }
        let result = self
            .registry
            .dispatch(self.method, &self.request, &self.cancel)
            .await;
        TranslateOutcome {
            generation: self.generation,
            method: self.method,
            source: self.request.source,
            destination: self.request.destination,
            result,
        }
    }
}

/// What a [`TranslateJob`] produced. Hand it to [`ConversionSession::finish_translate`].
pub struct TranslateOutcome {
    generation: u64,
    method: TranslationMethod,
    source: LanguageCode,
    destination: LanguageCode,
    result: Result<String, PolyglotError>,
}

/// State machine over one selected document.
pub struct ConversionSession {
    config: PipelineConfig,
    extractor: Arc<dyn PageExtractor>,
    registry: Arc<ProviderRegistry>,
    state: SessionState,
    document: Option<Document>,
    pages: Option<PageText>,
    text: Option<String>,
    translation: Option<TranslationResult>,
    extraction_time: Option<Duration>,
    in_flight: Option<Operation>,
    generation: u64,
}

impl fmt::Debug for ConversionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionSession")
            .field("state", &self.state)
            .field("document", &self.document)
            .field("pages", &self.pages.as_ref().map(PageText::len))
            .field("translation", &self.translation.as_ref().map(|t| t.method))
            .field("in_flight", &self.in_flight)
            .field("generation", &self.generation)
            .finish()
    }
}

impl ConversionSession {
    /// A session using the standard extractor and both built-in providers.
    pub fn new(config: PipelineConfig) -> Result<Self, PolyglotError> {
        let extractor = Arc::new(DocumentExtractor::from_config(&config)?);
        let registry = Arc::new(ProviderRegistry::from_config(&config)?);
        Ok(Self::with_components(config, extractor, registry))
    }

    /// A session with caller-supplied extractor and providers.
    pub fn with_components(
        config: PipelineConfig,
        extractor: Arc<dyn PageExtractor>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            config,
            extractor,
            registry,
            state: SessionState::Idle,
            document: None,
            pages: None,
            text: None,
            translation: None,
            extraction_time: None,
            in_flight: None,
            generation: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn pages(&self) -> Option<&PageText> {
        self.pages.as_ref()
    }

    /// Pages joined for display; this is what gets translated and saved.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn translation(&self) -> Option<&TranslationResult> {
        self.translation.as_ref()
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn gates(&self) -> ActionGates {
        let free = self.in_flight.is_none();
        ActionGates {
            convert: free && matches!(self.state, SessionState::Selected | SessionState::Converted),
            translate: free
                && matches!(self.state, SessionState::Converted | SessionState::Translated),
            save_text: self.text.is_some(),
            save_translation: self.translation.is_some(),
        }
    }

    /// Everything known about the current document, once it has been converted.
    pub fn report(&self) -> Option<ConversionReport> {
        Some(ConversionReport {
            document: self.document.clone()?,
            pages: self.pages.clone()?,
            text: self.text.clone()?,
            translation: self.translation.clone(),
            extraction_duration_ms: self.extraction_time.map_or(0, |d| d.as_millis() as u64),
        })
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Select `document`, from any state. Clears text and translation.
    pub fn select(&mut self, document: Document) -> &Document {
        info!("Selected {} ({})", document.name(), document.kind());
        self.discard_all();
        self.state = SessionState::Selected;
        self.document.insert(document)
    }

    /// Back to `Idle`, from any state.
    pub fn reset(&mut self) {
        self.discard_all();
        self.document = None;
        self.state = SessionState::Idle;
    }

    /// Forget a job that will never be finished (e.g. its task panicked).
    pub fn abandon_in_flight(&mut self) {
        if let Some(op) = self.in_flight.take() {
            warn!("Abandoning in-flight {}", op.as_str());
            self.generation += 1;
        }
    }

    fn discard_all(&mut self) {
        self.pages = None;
        self.text = None;
        self.translation = None;
        self.extraction_time = None;
        self.in_flight = None;
        self.generation += 1;
    }

    fn check_ready(
        &self,
        op: Operation,
        allowed: &[SessionState],
    ) -> Result<(), PolyglotError> {
        if let Some(running) = self.in_flight {
            return Err(PolyglotError::Busy {
                action: op.as_str(),
                running: running.as_str(),
            });
        }
        if !allowed.contains(&self.state) {
            return Err(PolyglotError::InvalidState {
                action: op.as_str(),
                state: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn check_generation(&self, op: Operation, generation: u64) -> Result<(), PolyglotError> {
        if generation != self.generation {
            warn!("Discarding stale {} result", op.as_str());
            return Err(PolyglotError::StaleResult { action: op.as_str() });
        }
        Ok(())
    }

    /// Start extracting the selected document. Valid in `Selected` and `Converted`.
    pub fn begin_convert(&mut self) -> Result<ConvertJob, PolyglotError> {
        self.check_ready(
            Operation::Convert,
            &[SessionState::Selected, SessionState::Converted],
        )?;
        let document = self.document.as_ref().ok_or_else(|| {
            PolyglotError::Internal("session is selected but holds no document".into())
        })?;

        let job = ConvertJob {
            generation: self.generation,
            path: document.path().to_path_buf(),
            extractor: Arc::clone(&self.extractor),
        };
        self.in_flight = Some(Operation::Convert);
        Ok(job)
    }

    /// Apply a finished extraction.
    ///
    /// Non-empty pages move the session to `Converted`. Any failure leaves
    /// the state as it was.
    pub fn finish_convert(&mut self, outcome: ConvertOutcome) -> Result<&PageText, PolyglotError> {
        self.check_generation(Operation::Convert, outcome.generation)?;
        self.in_flight = None;

        let pages = match outcome.result {
            Ok(pages) if pages.is_empty() => {
                let path = self
                    .document
                    .as_ref()
                    .map(|d| d.path().to_path_buf())
                    .unwrap_or_default();
                let e = PolyglotError::EmptyExtraction { path };
                error!(kind = e.kind(), "{}", e);
                return Err(e);
            }
            Ok(pages) => pages,
            Err(e) => {
                error!(kind = e.kind(), "{}", e);
                return Err(e);
            }
        };

        let text = pages.display(&self.config.page_separator, self.config.page_order);
        info!(
            "Converted {} pages ({} chars) in {}ms",
            pages.len(),
            pages.char_count(),
            outcome.elapsed.as_millis()
        );
        self.text = Some(text);
        self.translation = None;
        self.extraction_time = Some(outcome.elapsed);
        self.state = SessionState::Converted;
        Ok(self.pages.insert(pages))
    }

    /// Extract the selected document and apply the result.
    pub async fn convert(&mut self) -> Result<&PageText, PolyglotError> {
        let job = self.begin_convert()?;
        let outcome = job.run().await;
        self.finish_convert(outcome)
    }

    /// Start translating the session text. Valid in `Converted` and `Translated`.
    ///
    /// The method is resolved here, so an unknown method fails before the
    /// session is marked in flight.
    pub fn begin_translate(
        &mut self,
        source: LanguageCode,
        destination: LanguageCode,
        method: Option<&str>,
        credentials: Credentials,
    ) -> Result<TranslateJob, PolyglotError> {
        self.check_ready(
            Operation::Translate,
            &[SessionState::Converted, SessionState::Translated],
        )?;
        let method = self.registry.resolve_method(method).inspect_err(|e| {
            error!(kind = e.kind(), "{}", e);
        })?;
        let text = self.text.clone().ok_or_else(|| {
            PolyglotError::Internal("session is converted but holds no text".into())
        })?;

        let job = TranslateJob {
            generation: self.generation,
            method,
            request: TranslationRequest {
                text,
                source,
                destination,
                credentials,
            },
            registry: Arc::clone(&self.registry),
            cancel: CancellationToken::new(),
            config: self.config.clone(),
        };
        self.in_flight = Some(Operation::Translate);
        Ok(job)
    }

    /// Apply a finished translation.
    ///
    /// Success moves the session to `Translated`. A provider `ApiError` is
    /// handled by the configured [`ApiErrorPolicy`]; every other failure
    /// leaves the state as it was.
    pub fn finish_translate(
        &mut self,
        outcome: TranslateOutcome,
    ) -> Result<&TranslationResult, PolyglotError> {
        self.check_generation(Operation::Translate, outcome.generation)?;
        self.in_flight = None;

        let (text, degraded) = match outcome.result {
            Ok(text) => (text, false),
            Err(PolyglotError::ApiError { provider, status, body })
                if self.config.api_error_policy == ApiErrorPolicy::Degrade =>
            {
                warn!(
                    "{} answered {}; keeping its response as the translation",
                    provider, status
                );
                (body, true)
            }
            Err(e) => {
                error!(kind = e.kind(), "{}", e);
                return Err(e);
            }
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_translation_complete(outcome.method, text.chars().count(), degraded);
        }
        info!(
            "Translated {} → {} via {}{}",
            outcome.source,
            outcome.destination,
            outcome.method,
            if degraded { " (degraded)" } else { "" }
        );

        self.state = SessionState::Translated;
        Ok(self.translation.insert(TranslationResult {
            text,
            source: outcome.source,
            destination: outcome.destination,
            method: outcome.method,
            degraded,
        }))
    }

    /// Translate the session text and apply the result.
    pub async fn translate(
        &mut self,
        source: LanguageCode,
        destination: LanguageCode,
        method: Option<&str>,
        credentials: Credentials,
    ) -> Result<&TranslationResult, PolyglotError> {
        let job = self.begin_translate(source, destination, method, credentials)?;
        let outcome = job.run().await;
        self.finish_translate(outcome)
    }
}
