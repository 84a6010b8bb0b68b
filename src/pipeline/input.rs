//! Input validation: check a selected document can be read before any
//! engine touches it.
//!
//! Both the rasteriser and the OCR engine produce poor messages for a
//! missing file or a mislabelled one. Checking up front turns those into
//! [`PolyglotError::FileNotFound`] and friends.

use crate::document::{Document, DocumentKind};
use crate::error::PolyglotError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate that `document` is supported, exists and is readable.
///
/// PDFs additionally have their magic bytes checked.
pub fn validate_document(document: &Document) -> Result<(), PolyglotError> {
    if !document.kind().is_supported() {
        return Err(PolyglotError::UnsupportedFileType {
            path: document.path().to_path_buf(),
        });
    }
    let path = document.path();

    if !path.exists() {
        return Err(PolyglotError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            if document.kind() == DocumentKind::Pdf {
                let mut magic = [0u8; 4];
                if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                    return Err(not_a_pdf(path, magic));
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PolyglotError::ExtractionFailure {
                path: path.to_path_buf(),
                page: None,
                detail: format!("permission denied: {e}"),
            });
        }
        Err(_) => {
            return Err(PolyglotError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated {} input: {}", document.kind(), path.display());
    Ok(())
}

fn not_a_pdf(path: &Path, magic: [u8; 4]) -> PolyglotError {
    PolyglotError::ExtractionFailure {
        path: path.to_path_buf(),
        page: None,
        detail: format!("file is not a valid PDF (first bytes {magic:?})"),
    }
}
