//! Free-tier translator backed by the MyMemory public API.
//!
//! MyMemory needs no account but rejects long queries, so this provider
//! only ever submits the first [`FREE_TIER_MAX_CHARS`] characters. The cut
//! is silent to the caller and logged at `debug`.

use super::{request_error, TranslationMethod, TranslationProvider, TranslationRequest};
use crate::error::PolyglotError;
use crate::language::LanguageCode;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Characters (not bytes) submitted per request.
pub const FREE_TIER_MAX_CHARS: usize = 499;

const PROVIDER: &str = "translator";

/// The HTTP half of the free-tier provider.
#[async_trait]
pub trait FreeTierBackend: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        destination: &LanguageCode,
    ) -> Result<String, PolyglotError>;
}

/// [`TranslationMethod::Translator`]: truncate, then hand off to a backend.
pub struct FreeTierProvider {
    backend: Arc<dyn FreeTierBackend>,
}

impl FreeTierProvider {
    pub fn new(backend: Arc<dyn FreeTierBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TranslationProvider for FreeTierProvider {
    fn method(&self) -> TranslationMethod {
        TranslationMethod::Translator
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, PolyglotError> {
        let text = truncate_chars(&request.text, FREE_TIER_MAX_CHARS);
        if text.len() < request.text.len() {
            debug!(
                "Free tier: submitting first {} of {} chars",
                FREE_TIER_MAX_CHARS,
                request.text.chars().count()
            );
        }
        self.backend
            .translate(text, &request.source, &request.destination)
            .await
    }
}

/// Longest prefix of `text` holding at most `max` chars.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `GET {url}?q=...&langpair=src|dst`.
#[derive(Debug, Clone)]
pub struct MyMemoryBackend {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl MyMemoryBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PolyglotError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PolyglotError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: MyMemoryData,
    #[serde(rename = "responseStatus")]
    response_status: serde_json::Value,
    #[serde(rename = "responseDetails", default)]
    response_details: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[async_trait]
impl FreeTierBackend for MyMemoryBackend {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        destination: &LanguageCode,
    ) -> Result<String, PolyglotError> {
        let langpair = format!("{}|{}", source, destination);
        let resp = self
            .client
            .get(&self.url)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, self.timeout, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| request_error(PROVIDER, self.timeout, e))?;
        parse_response(status.as_u16(), body)
    }
}

/// MyMemory reports some failures as HTTP 200 with an error `responseStatus`.
fn parse_response(http_status: u16, body: String) -> Result<String, PolyglotError> {
    if !(200..300).contains(&http_status) {
        return Err(api_error(http_status, body));
    }

    let parsed: MyMemoryResponse = serde_json::from_str(&body)
        .map_err(|e| api_error(http_status, format!("malformed response: {e}")))?;

    let status = match &parsed.response_status {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()).unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    if status != 200 {
        let detail = match parsed.response_details {
            serde_json::Value::String(s) if !s.is_empty() => s,
            _ => parsed.response_data.translated_text,
        };
        return Err(api_error(status, detail));
    }

    Ok(parsed.response_data.translated_text)
}

fn api_error(status: u16, body: String) -> PolyglotError {
    PolyglotError::ApiError {
        provider: PROVIDER.to_string(),
        status,
        body,
    }
}
