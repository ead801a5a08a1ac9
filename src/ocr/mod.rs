pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod remote;
pub mod setup;

pub use engine::{OcrEngine, OcrError, TesseractOcr};
pub use extract::extract_code;
pub use preprocess::prepare_for_ocr;
pub use remote::RemoteOcr;
pub use setup::report_tesseract_status;

use image::RgbaImage;

use crate::config::{AppConfig, OcrBackend, OcrConfig};
use crate::log;
use crate::selection::PixelRect;

/// Output of one recognition round.
#[derive(Clone, Debug, PartialEq)]
pub struct Recognition {
    /// Text exactly as returned by the engine
    pub raw_text: String,
    /// Best-guess product code, possibly empty
    pub extracted_code: String,
    /// Name of the engine that produced the text
    pub engine: String,
}

/// Builds an engine for a configured slot. `None` when the slot is disabled.
pub fn build_engine(backend: OcrBackend, config: &OcrConfig) -> Option<Box<dyn OcrEngine>> {
    match backend {
        OcrBackend::Remote => Some(Box::new(RemoteOcr::from_config(config))),
        OcrBackend::Tesseract => {
            let engine = TesseractOcr::new(&config.tesseract_languages, config.tesseract_psm);
            // Resolve once; when missing, each call reports the lookup failure
            Some(Box::new(match setup::find_tesseract_executable() {
                Ok(path) => engine.with_executable(path),
                Err(_) => engine,
            }))
        }
        OcrBackend::None => None,
    }
}

/// Primary and optional fallback engines from configuration.
pub fn engines_from_config(
    config: &OcrConfig,
) -> (Option<Box<dyn OcrEngine>>, Option<Box<dyn OcrEngine>>) {
    (
        build_engine(config.primary, config),
        build_engine(config.fallback, config),
    )
}

/// Runs the primary engine once and, if it fails, the fallback once.
///
/// Returns the engine name alongside the text. When both fail the fallback's
/// error is returned; with no fallback the primary's error is.
pub fn recognize_with_fallback(
    primary: &dyn OcrEngine,
    fallback: Option<&dyn OcrEngine>,
    img: &RgbaImage,
) -> Result<(String, String), OcrError> {
    match primary.recognize(img) {
        Ok(text) => Ok((text, primary.name().to_string())),
        Err(primary_err) => {
            log(&format!("OCR: {}", primary_err));
            let Some(fallback) = fallback else {
                return Err(primary_err);
            };

            log(&format!("OCR: trying fallback engine '{}'", fallback.name()));
            match fallback.recognize(img) {
                Ok(text) => Ok((text, fallback.name().to_string())),
                Err(fallback_err) => {
                    log(&format!("OCR: fallback failed too: {}", fallback_err));
                    Err(fallback_err)
                }
            }
        }
    }
}

/// High-level function: surface region → recognized text and candidate code.
///
/// Crops and upscales the region, normalizes it, recognizes it with the
/// primary/fallback pair, and extracts the product code.
pub fn recognize_region(
    surface: &RgbaImage,
    rect: PixelRect,
    primary: &dyn OcrEngine,
    fallback: Option<&dyn OcrEngine>,
    config: &AppConfig,
) -> Result<Recognition, OcrError> {
    log(&format!(
        "OCR region: x={} y={} w={} h={}",
        rect.x, rect.y, rect.width, rect.height
    ));

    let prepared = prepare_for_ocr(surface, rect, &config.preprocess);
    let (raw_text, engine) = recognize_with_fallback(primary, fallback, &prepared)?;

    let extracted_code =
        extract_code(&raw_text).map_err(|e| OcrError::failed(&engine, e.to_string()))?;

    log(&format!(
        "OCR complete via {}: raw={:?} code={:?}",
        engine, raw_text, extracted_code
    ));

    Ok(Recognition {
        raw_text,
        extracted_code,
        engine,
    })
}
