//! Translation providers and the registry that dispatches to them.
//!
//! A provider is anything implementing [`TranslationProvider`]. The
//! [`ProviderRegistry`] maps each [`TranslationMethod`] to one provider, so
//! adding a backend means registering an implementation rather than
//! touching dispatch code.
//!
//! Two providers ship with the crate:
//!
//! | Method | Provider | Credentials | Limit |
//! |--------|----------|-------------|-------|
//! | `translator` | [`FreeTierProvider`] (MyMemory) | none | first 499 chars |
//! | `ibm` | [`IbmCloudProvider`] (Watson Language Translator v3) | API token | none |

pub mod free_tier;
pub mod ibm;

pub use free_tier::{FreeTierBackend, FreeTierProvider, MyMemoryBackend, FREE_TIER_MAX_CHARS};
pub use ibm::IbmCloudProvider;

use crate::config::PipelineConfig;
use crate::error::PolyglotError;
use crate::language::LanguageCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Which provider to translate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMethod {
    /// Free-tier public translator. (default)
    #[default]
    Translator,
    /// IBM Watson Language Translator.
    Ibm,
}

impl TranslationMethod {
    pub const ALL: [TranslationMethod; 2] = [TranslationMethod::Translator, TranslationMethod::Ibm];

    /// Identifier used on the command line and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationMethod::Translator => "translator",
            TranslationMethod::Ibm => "ibm",
        }
    }
}

impl fmt::Display for TranslationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationMethod {
    type Err = PolyglotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "translator" => Ok(TranslationMethod::Translator),
            "ibm" => Ok(TranslationMethod::Ibm),
            other => Err(PolyglotError::InvalidTranslationMethod {
                method: other.to_string(),
            }),
        }
    }
}

/// Secrets handed to a provider. `Debug` never prints the token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn from_option(token: Option<String>) -> Self {
        Self { token }
    }

    /// The token, if one was given and it is not blank.
    pub fn api_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// One translation job as seen by a provider.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub text: String,
    pub source: LanguageCode,
    pub destination: LanguageCode,
    pub credentials: Credentials,
}

/// A translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// The method this provider answers to.
    fn method(&self) -> TranslationMethod;

    async fn translate(&self, request: &TranslationRequest) -> Result<String, PolyglotError>;
}

/// Method → provider table with a default method and a per-request timeout.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<TranslationMethod, Arc<dyn TranslationProvider>>,
    default_method: TranslationMethod,
    timeout: Duration,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.providers.keys().map(|m| m.as_str()).collect();
        methods.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("methods", &methods)
            .field("default_method", &self.default_method)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new(default_method: TranslationMethod, timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            default_method,
            timeout,
        }
    }

    /// Both built-in providers, wired to the URLs and timeout in `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PolyglotError> {
        let timeout = Duration::from_secs(config.api_timeout_secs);
        let mut registry = Self::new(config.default_method, timeout);
        registry.register(Arc::new(FreeTierProvider::new(Arc::new(
            MyMemoryBackend::new(&config.free_tier_url, timeout)?,
        ))));
        let ibm = IbmCloudProvider::new(&config.ibm_url, timeout)?;
        debug!("IBM endpoint: {}", ibm.url());
        registry.register(Arc::new(ibm));
        Ok(registry)
    }

    /// Add or replace the provider for its method.
    pub fn register(&mut self, provider: Arc<dyn TranslationProvider>) -> &mut Self {
        let method = provider.method();
        if self.providers.insert(method, provider).is_some() {
            debug!("Replaced provider for '{}'", method);
        }
        self
    }

    pub fn get(&self, method: TranslationMethod) -> Option<&Arc<dyn TranslationProvider>> {
        self.providers.get(&method)
    }

    pub fn default_method(&self) -> TranslationMethod {
        self.default_method
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve an optional method identifier to a registered method.
    ///
    /// `None` or a blank identifier means the default method. Unknown
    /// identifiers and methods with no registered provider are both
    /// `InvalidTranslationMethod`.
    pub fn resolve_method(&self, method: Option<&str>) -> Result<TranslationMethod, PolyglotError> {
        let method = match method {
            Some(s) if !s.trim().is_empty() => s.parse()?,
            _ => self.default_method,
        };
        if self.providers.contains_key(&method) {
            Ok(method)
        } else {
            Err(PolyglotError::InvalidTranslationMethod {
                method: method.to_string(),
            })
        }
    }

    /// Translate `text` with the chosen (or default) method.
    pub async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        destination: &LanguageCode,
        method: Option<&str>,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<String, PolyglotError> {
        let method = self.resolve_method(method)?;
        let request = TranslationRequest {
            text: text.to_string(),
            source: source.clone(),
            destination: destination.clone(),
            credentials: credentials.clone(),
        };
        self.dispatch(method, &request, cancel).await
    }

    /// Send an already-built request to the provider for `method`.
    ///
    /// Bounded by the registry timeout and abandoned as soon as `cancel`
    /// fires.
    pub async fn dispatch(
        &self,
        method: TranslationMethod,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> Result<String, PolyglotError> {
        let provider = self
            .get(method)
            .ok_or_else(|| PolyglotError::InvalidTranslationMethod {
                method: method.to_string(),
            })?;

        if cancel.is_cancelled() {
            return Err(PolyglotError::Cancelled);
        }

        info!(
            "Translating {} chars {} → {} via {}",
            request.text.chars().count(),
            request.source,
            request.destination,
            method
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PolyglotError::Cancelled),
            res = tokio::time::timeout(self.timeout, provider.translate(request)) => match res {
                Ok(out) => out,
                Err(_) => Err(PolyglotError::Timeout {
                    provider: method.to_string(),
                    secs: self.timeout.as_secs(),
                }),
            },
        }
    }
}

/// Map a reqwest transport failure onto the crate's error kinds.
pub(crate) fn request_error(provider: &str, timeout: Duration, e: reqwest::Error) -> PolyglotError {
    if e.is_timeout() {
        PolyglotError::Timeout {
            provider: provider.to_string(),
            secs: timeout.as_secs(),
        }
    } else {
        PolyglotError::Request {
            provider: provider.to_string(),
            detail: e.to_string(),
        }
    }
}
