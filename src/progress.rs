//! Progress-callback trait for extraction and translation events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to hear about
//! each page as it is OCR'd and about translation start and finish. This is
//! how a front-end keeps its view live while a job runs off the interactive
//! thread: forward the events into whatever channel the UI drains.
//!
//! # Example
//!
//! ```rust
//! use polybiblioglot::{ConversionProgressCallback, PipelineConfig, TranslationMethod};
//! use std::sync::{mpsc, Arc, Mutex};
//!
//! enum UiEvent {
//!     Page(usize, usize),
//!     Translated { degraded: bool },
//! }
//!
//! struct ForwardToUi(Mutex<mpsc::Sender<UiEvent>>);
//!
//! impl ConversionProgressCallback for ForwardToUi {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, _text_len: usize) {
//!         if let Ok(tx) = self.0.lock() {
//!             let _ = tx.send(UiEvent::Page(page_num, total_pages));
//!         }
//!     }
//!
//!     fn on_translation_complete(&self, _: TranslationMethod, _: usize, degraded: bool) {
//!         if let Ok(tx) = self.0.lock() {
//!             let _ = tx.send(UiEvent::Translated { degraded });
//!         }
//!     }
//! }
//!
//! let (tx, _rx) = mpsc::channel();
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(ForwardToUi(Mutex::new(tx))))
//!     .build()
//!     .unwrap();
//! # let _ = config;
//! ```

use crate::translate::TranslationMethod;
use std::sync::Arc;

/// Called by the pipeline as it extracts pages and translates text.
///
/// Implementations must be `Send + Sync`: extraction runs on blocking worker
/// threads and, with `ocr_concurrency > 1`, page events may arrive from
/// several threads at once. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the page count is known, before any OCR.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is handed to the OCR engine.
    ///
    /// `page_num` is 1-indexed.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's text has been recognised.
    ///
    /// `text_len` is the character count after cleanup.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when the OCR engine fails on a page. Extraction stops after this.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been recognised.
    fn on_conversion_complete(&self, total_pages: usize, total_chars: usize) {
        let _ = (total_pages, total_chars);
    }

    /// Called before a translation request is dispatched.
    fn on_translation_start(&self, method: TranslationMethod, text_len: usize) {
        let _ = (method, text_len);
    }

    /// Called when a translation finishes.
    ///
    /// `degraded` is true when the provider failed and its error text was
    /// kept as the translation.
    fn on_translation_complete(&self, method: TranslationMethod, text_len: usize, degraded: bool) {
        let _ = (method, text_len, degraded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every event as a short string.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Recorder {
        fn push(&self, event: String) {
            self.0.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ConversionProgressCallback for Recorder {
        fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
            self.push(format!("page {page_num}/{total_pages}: {text_len}"));
        }

        fn on_page_error(&self, page_num: usize, _total_pages: usize, error: &str) {
            self.push(format!("page {page_num} failed: {error}"));
        }

        fn on_translation_start(&self, method: TranslationMethod, text_len: usize) {
            self.push(format!("translate {method} {text_len}"));
        }

        fn on_translation_complete(&self, method: TranslationMethod, _len: usize, degraded: bool) {
            self.push(format!("translated {method} degraded={degraded}"));
        }
    }

    #[test]
    fn unimplemented_events_are_ignored() {
        let rec = Recorder::default();
        rec.on_conversion_start(2);
        rec.on_page_start(1, 2);
        rec.on_conversion_complete(2, 10);
        assert!(rec.events().is_empty());
    }

    #[test]
    fn overridden_events_arrive_in_call_order() {
        let rec = Recorder::default();
        rec.on_page_complete(1, 2, 41);
        rec.on_page_error(2, 2, "tesseract exited with 1");
        rec.on_translation_start(TranslationMethod::Ibm, 41);
        rec.on_translation_complete(TranslationMethod::Ibm, 14, true);
        assert_eq!(
            rec.events(),
            [
                "page 1/2: 41",
                "page 2 failed: tesseract exited with 1",
                "translate ibm 41",
                "translated ibm degraded=true",
            ]
        );
    }

    #[test]
    fn noop_is_usable_behind_the_alias() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(1);
        cb.on_translation_complete(TranslationMethod::Translator, 5, false);
    }
}
