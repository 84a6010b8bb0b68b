//! Pipeline stages for document-to-text extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets the
//! extractor swap implementations (pdfium for a stub rasteriser, tesseract
//! for ocrs) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ postprocess
//! (checks)  (pdfium)  (tempfile) (text)   (cleanup)
//! ```
//!
//! 1. [`input`]: check the document is supported, exists and is readable
//! 2. [`render`]: rasterise every PDF page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]: write each `DynamicImage` to a temp file for tesseract
//! 4. [`ocr`]: recognise text per page (tesseract CLI, or `ocrs`)
//! 5. [`postprocess`]: deterministic cleanup of OCR artefacts (form feeds,
//!    line endings, trailing blanks)

pub mod encode;
pub mod input;
pub mod ocr;
#[cfg(feature = "ocrs")]
pub mod ocrs_engine;
pub mod postprocess;
pub mod render;
