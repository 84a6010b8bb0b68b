//! Collaborator entry points: select, convert, translate, save.
//!
//! These are thin wrappers over [`ConversionSession`] that speak in the
//! terms a front-end has at hand: a path string, language *names* as shown
//! in a drop-down, a method identifier, an optional token. Language names
//! are resolved through [`crate::language`] before anything is dispatched.

use crate::config::PipelineConfig;
use crate::document::Document;
use crate::error::PolyglotError;
use crate::extract::{DocumentExtractor, PageExtractor};
use crate::language;
use crate::output::PageText;
use crate::session::ConversionSession;
use crate::translate::Credentials;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Build a [`Document`] for `path`.
///
/// Only an empty path fails here; an unsupported extension is refused later
/// by conversion.
pub fn select_document(path: impl AsRef<Path>) -> Result<Document, PolyglotError> {
    let document = Document::new(path.as_ref())?;
    debug!("Document {} is {}", document.name(), document.kind());
    Ok(document)
}

/// Convert the session's selected document and return its pages.
pub async fn convert(session: &mut ConversionSession) -> Result<PageText, PolyglotError> {
    session.convert().await.cloned()
}

/// Translate the session's text between two languages given by name.
///
/// Returns the translated text. With the default
/// [`crate::config::ApiErrorPolicy::Degrade`], a provider error body is
/// returned as the text too; check [`ConversionSession::translation`] for
/// the `degraded` flag.
pub async fn translate(
    session: &mut ConversionSession,
    source_name: &str,
    destination_name: &str,
    method: Option<&str>,
    token: Option<&str>,
) -> Result<String, PolyglotError> {
    let source = language::resolve(source_name)?;
    let destination = language::resolve(destination_name)?;
    let credentials = Credentials::from_option(token.map(str::to_string));
    let result = session
        .translate(source, destination, method, credentials)
        .await?;
    Ok(result.text.clone())
}

/// Write `text` to `dest`, replacing any existing file.
///
/// The text goes to a temp file in the destination directory first and is
/// renamed into place, so a failed write never leaves a truncated file.
pub fn save(text: &str, dest: impl AsRef<Path>) -> Result<(), PolyglotError> {
    let dest = dest.as_ref();
    let save_err = |source: std::io::Error| PolyglotError::SaveFailed {
        path: dest.to_path_buf(),
        source,
    };

    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(save_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(save_err)?;
    tmp.write_all(text.as_bytes()).map_err(save_err)?;
    tmp.as_file().sync_all().map_err(save_err)?;
    tmp.persist(dest).map_err(|e| save_err(e.error))?;

    info!("Saved {} chars to {}", text.chars().count(), dest.display());
    Ok(())
}

/// Save the session's converted text. Needs a converted document.
pub fn save_text(session: &ConversionSession, dest: impl AsRef<Path>) -> Result<(), PolyglotError> {
    let text = session.text().ok_or(PolyglotError::InvalidState {
        action: "save text",
        state: session.state().as_str(),
    })?;
    save(text, dest)
}

/// Save the session's translation. Needs a translated document.
pub fn save_translation(
    session: &ConversionSession,
    dest: impl AsRef<Path>,
) -> Result<(), PolyglotError> {
    let translation = session.translation().ok_or(PolyglotError::InvalidState {
        action: "save translation",
        state: session.state().as_str(),
    })?;
    save(&translation.text, dest)
}

/// One-shot extraction without a session.
///
/// Uses the standard extractor built from `config`.
pub async fn extract_text(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PageText, PolyglotError> {
    let extractor = DocumentExtractor::from_config(config)?;
    extractor.extract(path.as_ref()).await
}

/// Synchronous wrapper around [`extract_text`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_text_sync(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PageText, PolyglotError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PolyglotError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_text(path, config))
}
