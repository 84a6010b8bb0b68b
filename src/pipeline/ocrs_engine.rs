//! Pure-Rust OCR via `ocrs`, enabled with the `ocrs` feature.
//!
//! Needs `text-detection.rten` and `text-recognition.rten` in one
//! directory. Running `ocrs-cli` once downloads them to `~/.cache/ocrs`.
//! Both `ocrs` and `rten` are unusably slow in debug builds.

use crate::error::EngineError;
use crate::pipeline::ocr::OcrEngine;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngineParams};
use rten::Model;
use std::path::Path;
use tracing::{debug, info};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// [`OcrEngine`] backed by `ocrs`. Load once, reuse for every page.
pub struct OcrsEngine {
    engine: ocrs::OcrEngine,
}

impl OcrsEngine {
    pub fn from_model_dir(dir: &Path) -> Result<Self, EngineError> {
        let load = |file: &str| {
            let path = dir.join(file);
            if !path.exists() {
                return Err(EngineError::new(
                    "ocrs",
                    format!(
                        "model not found at {}; run `ocrs-cli` once to download models",
                        path.display()
                    ),
                ));
            }
            Model::load_file(&path).map_err(|e| {
                EngineError::new("ocrs", format!("failed to load {}: {e}", path.display()))
            })
        };

        info!("Loading ocrs models from {}", dir.display());
        let detection_model = load(DETECTION_MODEL_FILENAME)?;
        let recognition_model = load(RECOGNITION_MODEL_FILENAME)?;

        let engine = ocrs::OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| EngineError::new("ocrs", format!("failed to initialise engine: {e}")))?;

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn recognize_image(&self, image: &DynamicImage) -> Result<String, EngineError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|e| {
            EngineError::new("ocrs", format!("bad image source ({width}x{height}): {e}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| EngineError::new("ocrs", format!("preprocessing failed: {e}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|e| EngineError::new("ocrs", format!("recognition failed: {e}")))?;

        debug!("ocrs recognised {} lines", text.lines().count());
        Ok(text)
    }

    fn recognize_path(&self, path: &Path) -> Result<String, EngineError> {
        let image = image::open(path)
            .map_err(|e| EngineError::new("ocrs", format!("cannot open {}: {e}", path.display())))?;
        self.recognize_image(&image)
    }
}
