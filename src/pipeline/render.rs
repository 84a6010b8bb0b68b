//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Pdfium keeps thread-local state and is CPU-bound, so callers run
//! [`PageRasterizer::rasterize`] inside `tokio::task::spawn_blocking`.
//!
//! `max_rendered_pixels` caps the longest edge regardless of physical page
//! size. Around 2,000 px is plenty for tesseract on body text and keeps an
//! A0 scan from allocating hundreds of megabytes.

use crate::config::PipelineConfig;
use crate::error::{EngineError, PolyglotError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns a multi-page document into one image per page, in page order.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>, PolyglotError>;
}

/// [`PageRasterizer`] backed by the pdfium C library.
#[derive(Clone)]
pub struct PdfiumRasterizer {
    max_pixels: u32,
    password: Option<String>,
    lib_path: Option<PathBuf>,
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer")
            .field("max_pixels", &self.max_pixels)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("lib_path", &self.lib_path)
            .finish()
    }
}

impl PdfiumRasterizer {
    pub fn new(max_pixels: u32) -> Self {
        Self {
            max_pixels,
            password: None,
            lib_path: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_pixels: config.max_rendered_pixels,
            password: config.pdf_password.clone(),
            lib_path: config.pdfium_lib_path.clone(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lib_path = Some(path.into());
        self
    }

    /// Bind to pdfium: explicit path first, then `PDFIUM_LIB_PATH`, then
    /// whatever the system loader finds.
    fn bind(&self) -> Result<Pdfium, PolyglotError> {
        let explicit = self
            .lib_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PolyglotError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>, PolyglotError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(path, self.password.as_deref())
            .map_err(|e| {
                let detail = match format!("{:?}", e) {
                    s if s.to_lowercase().contains("password") && self.password.is_none() => {
                        format!("document is password-protected: {s}")
                    }
                    s => s,
                };
                PolyglotError::extraction(path, None, EngineError::new("pdfium", detail))
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::with_capacity(total_pages);
        for idx in 0..total_pages {
            let page_err = |e: PdfiumError| {
                PolyglotError::extraction(
                    path,
                    Some(idx + 1),
                    EngineError::new("pdfium", format!("{:?}", e)),
                )
            };

            let page = pages.get(idx as u16).map_err(page_err)?;
            let bitmap = page.render_with_config(&render_config).map_err(page_err)?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}
