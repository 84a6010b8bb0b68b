//! Image encoding: `DynamicImage` → temporary image file for a CLI OCR engine.
//!
//! Tesseract reads its input from disk, so each rendered page is written to
//! a [`tempfile::NamedTempFile`] that deletes itself on drop. The file keeps
//! the format's extension because tesseract sniffs the type from it.

use crate::config::RasterFormat;
use crate::error::EngineError;
use image::DynamicImage;
use std::io::BufWriter;
use tempfile::NamedTempFile;
use tracing::debug;

/// Write `img` to a fresh temp file in `format`.
///
/// JPEG has no alpha channel, so RGBA renders from pdfium are flattened to
/// RGB first.
pub fn write_temp_image(
    img: &DynamicImage,
    format: RasterFormat,
) -> Result<NamedTempFile, EngineError> {
    let file = tempfile::Builder::new()
        .prefix("polybiblioglot-page-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()
        .map_err(|e| EngineError::new("encode", format!("cannot create temp file: {e}")))?;

    let rgb;
    let to_write = match format {
        RasterFormat::Jpeg if img.color().has_alpha() => {
            rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            &rgb
        }
        _ => img,
    };

    {
        let mut writer = BufWriter::new(file.as_file());
        to_write
            .write_to(&mut writer, format.image_format())
            .map_err(|e| EngineError::new("encode", e.to_string()))?;
    }

    debug!(
        "Encoded {}x{} page → {}",
        img.width(),
        img.height(),
        file.path().display()
    );
    Ok(file)
}
