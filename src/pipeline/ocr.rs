//! OCR engines: turn one page image into raw text.
//!
//! The default engine shells out to the `tesseract` binary, which reads
//! from disk. With the `ocrs` feature a pure-Rust engine is also available
//! (see [`super::ocrs_engine`]). Engines are synchronous and CPU-bound; the
//! extractor calls them from `spawn_blocking`.

use crate::config::{PipelineConfig, RasterFormat};
use crate::error::{EngineError, PolyglotError};
use crate::pipeline::encode::write_temp_image;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info};

/// What to recognise.
#[derive(Debug, Clone, Copy)]
pub enum OcrSource<'a> {
    /// An in-memory page, e.g. one rendered from a PDF.
    Image(&'a DynamicImage),
    /// An image file on disk.
    Path(&'a Path),
    /// Nothing. Recognises as the empty string without running the engine.
    Empty,
}

/// Recognises text in a single page image.
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and error messages.
    fn name(&self) -> &'static str;

    fn recognize_image(&self, image: &DynamicImage) -> Result<String, EngineError>;

    fn recognize_path(&self, path: &Path) -> Result<String, EngineError>;

    /// Dispatch on the source kind. Returns raw text; cleanup happens later.
    fn recognize(&self, source: OcrSource<'_>) -> Result<String, EngineError> {
        match source {
            OcrSource::Image(img) => self.recognize_image(img),
            OcrSource::Path(path) => self.recognize_path(path),
            OcrSource::Empty => Ok(String::new()),
        }
    }
}

/// Runs `tesseract <image> stdout [-l <lang>]`.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    language: Option<String>,
    raster_format: RasterFormat,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            language: None,
            raster_format: RasterFormat::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: config.tesseract_path.clone(),
            language: config.ocr_language.clone(),
            raster_format: config.raster_format,
        }
    }

    /// Tesseract language pack(s), e.g. `deu` or `deu+fra`.
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    pub fn with_raster_format(mut self, format: RasterFormat) -> Self {
        self.raster_format = format;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the binary runs at all (`tesseract --version` exits 0).
    pub fn is_available(&self) -> bool {
        command_available(&self.program)
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize_image(&self, image: &DynamicImage) -> Result<String, EngineError> {
        let file = write_temp_image(image, self.raster_format)?;
        self.recognize_path(file.path())
    }

    fn recognize_path(&self, path: &Path) -> Result<String, EngineError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(path).arg("stdout");
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            let detail = if e.kind() == std::io::ErrorKind::NotFound {
                format!(
                    "'{}' not found; install tesseract-ocr or pass --tesseract /path/to/tesseract",
                    self.program.display()
                )
            } else {
                format!("failed to execute '{}': {e}", self.program.display())
            };
            EngineError::new(self.name(), detail)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::new(
                self.name(),
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whether `program --version` runs and exits successfully.
pub fn command_available(program: &Path) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Build the engine the configuration asks for.
///
/// With the `ocrs` feature and an `ocr_model_dir` set, the neural engine is
/// loaded from that directory. Otherwise tesseract is used.
pub fn engine_from_config(config: &PipelineConfig) -> Result<Arc<dyn OcrEngine>, PolyglotError> {
    #[cfg(feature = "ocrs")]
    if let Some(dir) = &config.ocr_model_dir {
        let engine = super::ocrs_engine::OcrsEngine::from_model_dir(dir)
            .map_err(|e| PolyglotError::InvalidConfig(e.to_string()))?;
        info!("OCR engine: ocrs (models from {})", dir.display());
        return Ok(Arc::new(engine));
    }

    info!("OCR engine: {}", config.tesseract_path.display());
    Ok(Arc::new(TesseractEngine::from_config(config)))
}
