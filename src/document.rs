//! The selected document: path, display name and kind.

use crate::error::PolyglotError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What the pipeline can do with a file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// `.png`, `.jpg`, `.jpeg`: OCR'd directly as a single page.
    Image,
    /// `.pdf`: rasterised page by page, then OCR'd.
    Pdf,
    /// Anything else. Extraction refuses it.
    Unsupported,
}

impl DocumentKind {
    /// Classify a path by extension, ignoring case.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("png") | Some("jpg") | Some("jpeg") => DocumentKind::Image,
            _ => DocumentKind::Unsupported,
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, DocumentKind::Unsupported)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Unsupported => "unsupported",
        })
    }
}

/// A file the user selected. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    path: PathBuf,
    name: String,
    kind: DocumentKind,
}

impl Document {
    /// Create a document from a path.
    ///
    /// Only an empty path is rejected here; unsupported kinds are accepted
    /// and refused later by extraction.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PolyglotError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(PolyglotError::InvalidInput);
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let kind = DocumentKind::from_path(&path);
        Ok(Self { path, name, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name shown to the user.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}
