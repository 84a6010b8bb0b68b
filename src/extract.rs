//! Page extraction: a document path in, ordered per-page text out.
//!
//! ## Flow
//!
//! ```text
//! path ──▶ classify ──▶ validate ──┬─ image ─▶ OCR file ─────────────┐
//!                                  └─ pdf ───▶ rasterise ─▶ OCR pages ┴─▶ cleanup ─▶ PageText
//! ```
//!
//! Rasterisation and OCR are CPU-bound and run on `spawn_blocking`. Pages
//! are OCR'd through `buffered(n)`, so up to `ocr_concurrency` pages are in
//! flight at once but results always come back in page order. The first
//! page that fails stops the whole extraction: there is no partial output.

use crate::config::PipelineConfig;
use crate::document::{Document, DocumentKind};
use crate::error::PolyglotError;
use crate::output::PageText;
use crate::pipeline::ocr::{self, OcrEngine, OcrSource};
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::pipeline::{input, postprocess};
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Turns a document on disk into one string per page, in page order.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<PageText, PolyglotError>;
}

/// The standard extractor: pdfium for PDFs, an [`OcrEngine`] for every page.
#[derive(Clone)]
pub struct DocumentExtractor {
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

impl DocumentExtractor {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            rasterizer,
            ocr,
            concurrency: 1,
            progress: None,
        }
    }

    /// Pdfium rasteriser plus whichever OCR engine `config` selects.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PolyglotError> {
        let ocr = ocr::engine_from_config(config)?;
        let mut extractor = Self::new(Arc::new(PdfiumRasterizer::from_config(config)), ocr)
            .with_concurrency(config.ocr_concurrency);
        extractor.progress = config.progress_callback.clone();
        Ok(extractor)
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    async fn extract_image(&self, document: &Document) -> Result<Vec<String>, PolyglotError> {
        if let Some(ref cb) = self.progress {
            cb.on_conversion_start(1);
        }
        let text = ocr_page(
            Arc::clone(&self.ocr),
            document.path().to_path_buf(),
            PageInput::File,
            1,
            1,
            self.progress.clone(),
        )
        .await?;
        Ok(vec![text])
    }

    async fn extract_pdf(&self, document: &Document) -> Result<Vec<String>, PolyglotError> {
        let path = document.path().to_path_buf();

        let rasterizer = Arc::clone(&self.rasterizer);
        let render_path = path.clone();
        let render_start = Instant::now();
        let images = tokio::task::spawn_blocking(move || rasterizer.rasterize(&render_path))
            .await
            .map_err(|e| PolyglotError::Internal(format!("Render task panicked: {}", e)))??;
        let total_pages = images.len();
        info!(
            "Rendered {} pages in {}ms",
            total_pages,
            render_start.elapsed().as_millis()
        );

        if let Some(ref cb) = self.progress {
            cb.on_conversion_start(total_pages);
        }

        stream::iter(images.into_iter().enumerate().map(|(idx, img)| {
            ocr_page(
                Arc::clone(&self.ocr),
                path.clone(),
                PageInput::Rendered(img),
                idx + 1,
                total_pages,
                self.progress.clone(),
            )
        }))
        .buffered(self.concurrency)
        .try_collect()
        .await
    }
}

#[async_trait]
impl PageExtractor for DocumentExtractor {
    async fn extract(&self, path: &Path) -> Result<PageText, PolyglotError> {
        let document = Document::new(path)?;
        input::validate_document(&document)?;
        info!("Extracting text from {} ({})", document.name(), document.kind());

        let pages = match document.kind() {
            DocumentKind::Pdf => self.extract_pdf(&document).await?,
            DocumentKind::Image => self.extract_image(&document).await?,
            DocumentKind::Unsupported => {
                return Err(PolyglotError::UnsupportedFileType {
                    path: path.to_path_buf(),
                })
            }
        };

        let pages = PageText::new(pages);
        if let Some(ref cb) = self.progress {
            cb.on_conversion_complete(pages.len(), pages.char_count());
        }
        info!(
            "Extraction complete: {} pages, {} chars",
            pages.len(),
            pages.char_count()
        );
        Ok(pages)
    }
}

enum PageInput {
    /// The document itself is the page image.
    File,
    Rendered(DynamicImage),
}

/// OCR one page on the blocking pool, clean the text, fire page events.
async fn ocr_page(
    engine: Arc<dyn OcrEngine>,
    path: std::path::PathBuf,
    input: PageInput,
    page_num: usize,
    total_pages: usize,
    progress: Option<ProgressCallback>,
) -> Result<String, PolyglotError> {
    if let Some(ref cb) = progress {
        cb.on_page_start(page_num, total_pages);
    }

    let ocr_path = path.clone();
    let raw = tokio::task::spawn_blocking(move || {
        let source = match &input {
            PageInput::File => OcrSource::Path(&ocr_path),
            PageInput::Rendered(img) => OcrSource::Image(img),
        };
        engine.recognize(source)
    })
    .await
    .map_err(|e| PolyglotError::Internal(format!("OCR task panicked: {}", e)))?;

    let page = if total_pages > 1 { Some(page_num) } else { None };
    match raw {
        Ok(raw) => {
            let text = postprocess::clean_page_text(&raw);
            debug!(
                "Page {}/{}: {} chars recognised",
                page_num,
                total_pages,
                text.chars().count()
            );
            if let Some(ref cb) = progress {
                cb.on_page_complete(page_num, total_pages, text.chars().count());
            }
            Ok(text)
        }
        Err(e) => {
            if let Some(ref cb) = progress {
                cb.on_page_error(page_num, total_pages, &e.to_string());
            }
            Err(PolyglotError::extraction(&path, page, e))
        }
    }
}
