//! IBM Watson Language Translator v3.
//!
//! `POST {url}` with basic auth `apikey:<token>` and body
//! `{"text": [text], "model_id": "de-fr"}`. Success is HTTP 200 with
//! `{"translations": [{"translation": "..."}]}`; every segment is emitted
//! followed by a newline. Anything other than 200 is an
//! [`PolyglotError::ApiError`] carrying the raw response body.

use super::{request_error, TranslationMethod, TranslationProvider, TranslationRequest};
use crate::error::PolyglotError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "ibm";

#[derive(Debug, Clone)]
pub struct IbmCloudProvider {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct IbmRequest<'a> {
    text: [&'a str; 1],
    model_id: String,
}

#[derive(Deserialize)]
struct IbmResponse {
    translations: Vec<IbmTranslation>,
}

#[derive(Deserialize)]
struct IbmTranslation {
    translation: String,
}

impl IbmCloudProvider {
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

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TranslationProvider for IbmCloudProvider {
    fn method(&self) -> TranslationMethod {
        TranslationMethod::Ibm
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, PolyglotError> {
        let token = request
            .credentials
            .api_token()
            .ok_or_else(|| PolyglotError::AuthenticationError {
                provider: PROVIDER.to_string(),
                detail: "The token was not found".to_string(),
            })?;

        let body = IbmRequest {
            text: [request.text.as_str()],
            model_id: format!("{}-{}", request.source, request.destination),
        };
        debug!("POST {} model_id={}", self.url, body.model_id);

        let resp = self
            .client
            .post(&self.url)
            .basic_auth("apikey", Some(token))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, self.timeout, e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| request_error(PROVIDER, self.timeout, e))?;

        if status != StatusCode::OK {
            warn!("IBM translator answered {}", status);
            return Err(PolyglotError::ApiError {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        join_segments(&text).map_err(|e| PolyglotError::ApiError {
            provider: PROVIDER.to_string(),
            status: status.as_u16(),
            body: format!("malformed response: {e}"),
        })
    }
}

fn join_segments(body: &str) -> Result<String, serde_json::Error> {
    let parsed: IbmResponse = serde_json::from_str(body)?;
    Ok(parsed
        .translations
        .into_iter()
        .fold(String::new(), |mut out, t| {
            out.push_str(&t.translation);
            out.push('\n');
            out
        }))
}
