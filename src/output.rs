//! Results produced by the pipeline: per-page text and translations.

use crate::config::{PageOrder, PageSeparator};
use crate::document::Document;
use crate::language::LanguageCode;
use crate::translate::TranslationMethod;
use serde::{Deserialize, Serialize};

/// Ordered OCR output, one string per page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageText {
    pages: Vec<String>,
}

impl PageText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn into_pages(self) -> Vec<String> {
        self.pages
    }

    /// Join pages into one display string, each page followed by `separator`.
    pub fn display(&self, separator: &PageSeparator, order: PageOrder) -> String {
        let mut out = String::new();
        let numbered = self.pages.iter().enumerate().map(|(i, p)| (i + 1, p));
        let push = |out: &mut String, (num, page): (usize, &String)| {
            out.push_str(page);
            out.push_str(&separator.render(num));
        };
        match order {
            PageOrder::Forward => numbered.for_each(|p| push(&mut out, p)),
            PageOrder::Reverse => numbered.rev().for_each(|p| push(&mut out, p)),
        }
        out
    }

    /// Total characters across all pages.
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.chars().count()).sum()
    }
}

impl From<Vec<String>> for PageText {
    fn from(pages: Vec<String>) -> Self {
        Self::new(pages)
    }
}

/// A translation of a session's page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Translated text, or the provider's error body when `degraded`.
    pub text: String,
    pub source: LanguageCode,
    pub destination: LanguageCode,
    pub method: TranslationMethod,
    /// True when the provider failed and `text` holds its error body.
    pub degraded: bool,
}

/// Everything known about one processed document, for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub document: Document,
    pub pages: PageText,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<TranslationResult>,
    pub extraction_duration_ms: u64,
}
