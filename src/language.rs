//! Static language-name → language-code table.
//!
//! The table is loaded once on first use and is read-only afterwards.
//! Names are what a front-end offers the user; codes are what translation
//! providers receive (ISO 639-1, plus region subtags where the providers
//! need them).

use crate::error::PolyglotError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Every language offered to the user, alphabetical by name.
const LANGUAGES: &[(&str, &str)] = &[
    ("Arabic", "ar"),
    ("Basque", "eu"),
    ("Bengali", "bn"),
    ("Bosnian", "bs"),
    ("Bulgarian", "bg"),
    ("Catalan", "ca"),
    ("Chinese (Simplified)", "zh"),
    ("Chinese (Traditional)", "zh-TW"),
    ("Croatian", "hr"),
    ("Czech", "cs"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("English", "en"),
    ("Estonian", "et"),
    ("Finnish", "fi"),
    ("French", "fr"),
    ("French (Canada)", "fr-CA"),
    ("German", "de"),
    ("Greek", "el"),
    ("Gujarati", "gu"),
    ("Hebrew", "he"),
    ("Hindi", "hi"),
    ("Hungarian", "hu"),
    ("Indonesian", "id"),
    ("Irish", "ga"),
    ("Italian", "it"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Latvian", "lv"),
    ("Lithuanian", "lt"),
    ("Malay", "ms"),
    ("Malayalam", "ml"),
    ("Maltese", "mt"),
    ("Montenegrin", "cnr"),
    ("Nepali", "ne"),
    ("Norwegian Bokmål", "nb"),
    ("Polish", "pl"),
    ("Portuguese", "pt"),
    ("Romanian", "ro"),
    ("Russian", "ru"),
    ("Serbian", "sr"),
    ("Sinhala", "si"),
    ("Slovak", "sk"),
    ("Slovenian", "sl"),
    ("Spanish", "es"),
    ("Swedish", "sv"),
    ("Tamil", "ta"),
    ("Telugu", "te"),
    ("Thai", "th"),
    ("Turkish", "tr"),
    ("Ukrainian", "uk"),
    ("Urdu", "ur"),
    ("Vietnamese", "vi"),
    ("Welsh", "cy"),
];

static BY_NAME: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    LANGUAGES
        .iter()
        .map(|(name, code)| (name.to_lowercase(), *code))
        .collect()
});

/// A provider-facing language code such as `en` or `zh-TW`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Wrap a code that did not come from the table, e.g. from a config file.
    ///
    /// Returns `None` for an empty or whitespace-only code.
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a human-readable language name to its code.
///
/// Matching ignores case and surrounding whitespace.
pub fn resolve(name: &str) -> Result<LanguageCode, PolyglotError> {
    BY_NAME
        .get(&name.trim().to_lowercase())
        .map(|code| LanguageCode((*code).to_string()))
        .ok_or_else(|| PolyglotError::UnknownLanguage {
            name: name.to_string(),
        })
}

/// Resolve a language given either by name or directly by a known code.
pub fn resolve_name_or_code(input: &str) -> Result<LanguageCode, PolyglotError> {
    if let Ok(code) = resolve(input) {
        return Ok(code);
    }
    let wanted = input.trim();
    LANGUAGES
        .iter()
        .find(|(_, code)| code.eq_ignore_ascii_case(wanted))
        .map(|(_, code)| LanguageCode((*code).to_string()))
        .ok_or_else(|| PolyglotError::UnknownLanguage {
            name: input.to_string(),
        })
}

/// Names to offer in a language picker, alphabetical.
pub fn names() -> impl Iterator<Item = &'static str> {
    LANGUAGES.iter().map(|(name, _)| *name)
}

/// `(name, code)` pairs, alphabetical by name.
pub fn entries() -> &'static [(&'static str, &'static str)] {
    LANGUAGES
}
