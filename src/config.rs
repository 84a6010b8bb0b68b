//! Configuration types for the extraction and translation pipeline.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. One struct holds every knob so a session, the
//! CLI and the tests all share the same defaults.

use crate::error::PolyglotError;
use crate::language::{self, LanguageCode};
use crate::progress::ProgressCallback;
use crate::translate::TranslationMethod;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default endpoint of the IBM Watson Language Translator v3 API.
pub const DEFAULT_IBM_URL: &str = "https://api.us-south.language-translator.watson.cloud.ibm.com/instances/c9cf4fc5-460c-40fa-8338-b524a9428899/v3/translate?version=2018-05-01";

/// Default endpoint of the free MyMemory translation API.
pub const DEFAULT_FREE_TIER_URL: &str = "https://api.mymemory.translated.net/get";

/// Configuration for a [`crate::session::ConversionSession`].
///
/// # Example
/// ```rust
/// use polybiblioglot::{PipelineConfig, RasterFormat};
///
/// let config = PipelineConfig::builder()
///     .raster_format(RasterFormat::Png)
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum rendered page edge in pixels when rasterising PDFs. Default: 2000.
    ///
    /// Caps the longest edge regardless of physical page size so a poster-sized
    /// page cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// Image format pages are rasterised into before OCR. Default: JPEG.
    pub raster_format: RasterFormat,

    /// PDF user password for encrypted documents.
    pub pdf_password: Option<String>,

    /// Explicit path to libpdfium. Falls back to `PDFIUM_LIB_PATH`, then the
    /// system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Path or name of the tesseract executable. Default: `tesseract`.
    pub tesseract_path: PathBuf,

    /// Tesseract language pack(s), e.g. `deu` or `eng+fra`. None: engine default.
    pub ocr_language: Option<String>,

    /// Directory holding the `ocrs` detection/recognition models.
    pub ocr_model_dir: Option<PathBuf>,

    /// Pages OCR'd at the same time. Output order is unaffected. Default: 1.
    pub ocr_concurrency: usize,

    /// Marker written after each page in the display text.
    pub page_separator: PageSeparator,

    /// Order pages are joined in for display. Default: forward.
    pub page_order: PageOrder,

    /// Provider used when a translate call names no method. Default: translator.
    pub default_method: TranslationMethod,

    /// Source language name or code used when a caller names none. Default: German.
    pub default_source_language: String,

    /// Destination language name or code used when a caller names none. Default: French.
    pub default_destination_language: String,

    /// Endpoint of the IBM-style cloud translation API.
    pub ibm_url: String,

    /// Endpoint of the free-tier translation API.
    pub free_tier_url: String,

    /// Per-request timeout for translation calls in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// What a translation does with a provider's non-success response.
    pub api_error_policy: ApiErrorPolicy,

    /// Optional observer notified of per-page and translation events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 2000,
            raster_format: RasterFormat::default(),
            pdf_password: None,
            pdfium_lib_path: None,
            tesseract_path: PathBuf::from("tesseract"),
            ocr_language: None,
            ocr_model_dir: None,
            ocr_concurrency: 1,
            page_separator: PageSeparator::default(),
            page_order: PageOrder::default(),
            default_method: TranslationMethod::default(),
            default_source_language: "German".to_string(),
            default_destination_language: "French".to_string(),
            ibm_url: DEFAULT_IBM_URL.to_string(),
            free_tier_url: DEFAULT_FREE_TIER_URL.to_string(),
            api_timeout_secs: 60,
            api_error_policy: ApiErrorPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("raster_format", &self.raster_format)
            .field("pdf_password", &self.pdf_password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("tesseract_path", &self.tesseract_path)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_model_dir", &self.ocr_model_dir)
            .field("ocr_concurrency", &self.ocr_concurrency)
            .field("page_separator", &self.page_separator)
            .field("page_order", &self.page_order)
            .field("default_method", &self.default_method)
            .field("default_source_language", &self.default_source_language)
            .field("default_destination_language", &self.default_destination_language)
            .field("ibm_url", &self.ibm_url)
            .field("free_tier_url", &self.free_tier_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("api_error_policy", &self.api_error_policy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The preselected source and destination languages, resolved.
    ///
    /// Each may be given by name ("German") or by code ("de").
    pub fn default_languages(&self) -> Result<(LanguageCode, LanguageCode), PolyglotError> {
        Ok((
            language::resolve_name_or_code(&self.default_source_language)?,
            language::resolve_name_or_code(&self.default_destination_language)?,
        ))
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn raster_format(mut self, format: RasterFormat) -> Self {
        self.config.raster_format = format;
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = Some(lang.into());
        self
    }

    pub fn ocr_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.ocr_model_dir = Some(dir.into());
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn page_order(mut self, order: PageOrder) -> Self {
        self.config.page_order = order;
        self
    }

    pub fn default_method(mut self, method: TranslationMethod) -> Self {
        self.config.default_method = method;
        self
    }

    pub fn default_source_language(mut self, name: impl Into<String>) -> Self {
        self.config.default_source_language = name.into();
        self
    }

    pub fn default_destination_language(mut self, name: impl Into<String>) -> Self {
        self.config.default_destination_language = name.into();
        self
    }

    pub fn ibm_url(mut self, url: impl Into<String>) -> Self {
        self.config.ibm_url = url.into();
        self
    }

    pub fn free_tier_url(mut self, url: impl Into<String>) -> Self {
        self.config.free_tier_url = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn api_error_policy(mut self, policy: ApiErrorPolicy) -> Self {
        self.config.api_error_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PolyglotError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(PolyglotError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        for url in [&c.ibm_url, &c.free_tier_url] {
            if reqwest::Url::parse(url).is_err() {
                return Err(PolyglotError::InvalidConfig(format!(
                    "not a valid URL: '{url}'"
                )));
            }
        }
        c.default_languages()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Image format PDF pages are rasterised into before OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// JPEG. (default)
    #[default]
    Jpeg,
    /// Lossless PNG. Slightly better OCR on small fonts, larger temp files.
    Png,
}

impl RasterFormat {
    /// File extension used for temp files in this format.
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Png => "png",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            RasterFormat::Jpeg => image::ImageFormat::Jpeg,
            RasterFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// Marker written after each page when pages are joined for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// A ` - - - - - ` line after each page. (default)
    #[default]
    Dashes,
    /// A single newline.
    None,
    /// Line naming the page that just ended: "\n[page N]\n"
    Numbered,
    /// Custom string on its own line.
    Custom(String),
}

impl PageSeparator {
    /// Render the marker that follows page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::Dashes => " - - - - - \n".to_string(),
            PageSeparator::None => "\n".to_string(),
            PageSeparator::Numbered => format!("\n[page {}]\n", page_num),
            PageSeparator::Custom(s) => format!("\n{}\n", s),
        }
    }
}

/// Order in which pages are joined for display.
///
/// Extraction order is always forward; this only affects the joined text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrder {
    /// First page first. (default)
    #[default]
    Forward,
    /// Last page first, the way one early desktop front-end displayed them.
    Reverse,
}

/// What a translation does when the provider answers with an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiErrorPolicy {
    /// Store the provider's error body as the translation and mark it
    /// degraded. The session still moves to `Translated`. (default)
    #[default]
    Degrade,
    /// Return [`PolyglotError::ApiError`]; the session does not transition.
    Fail,
}
