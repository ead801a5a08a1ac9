use image::RgbaImage;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::setup::find_tesseract_executable;

/// The single failure condition of a recognition attempt.
///
/// Transport errors, non-success statuses, undecodable bodies, missing
/// engines and encode failures are all reported as this.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OcrError {
    #[error("recognition failed ({engine}): {reason}")]
    RecognitionFailed { engine: String, reason: String },
}

impl OcrError {
    pub fn failed(engine: &str, reason: impl Into<String>) -> Self {
        Self::RecognitionFailed {
            engine: engine.to_string(),
            reason: reason.into(),
        }
    }
}

/// A text-recognition backend.
///
/// Implementations block the caller until the engine answers.
pub trait OcrEngine {
    /// Short name used in logs and notices.
    fn name(&self) -> &str;

    /// Recognizes the text in a preprocessed image.
    fn recognize(&self, img: &RgbaImage) -> Result<String, OcrError>;
}

/// Encodes an image as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Local Tesseract executable.
pub struct TesseractOcr {
    /// Explicit executable; discovered on each call when `None`
    executable: Option<PathBuf>,
    languages: String,
    psm: u8,
}

impl TesseractOcr {
    pub fn new(languages: &str, psm: u8) -> Self {
        Self {
            executable: None,
            languages: languages.to_string(),
            psm,
        }
    }

    pub fn with_executable(mut self, executable: PathBuf) -> Self {
        self.executable = Some(executable);
        self
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    /// Runs Tesseract on the image and returns its stdout text.
    fn recognize(&self, img: &RgbaImage) -> Result<String, OcrError> {
        let fail = |reason: String| OcrError::failed(self.name(), reason);

        let tesseract_exe = match &self.executable {
            Some(path) => path.clone(),
            None => find_tesseract_executable().map_err(|e| fail(e.to_string()))?,
        };

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")
            .map_err(|e| fail(format!("temp file: {}", e)))?;
        img.save(temp_input.path())
            .map_err(|e| fail(format!("failed to write input image: {}", e)))?;

        // Run Tesseract to stdout
        let output = Command::new(&tesseract_exe)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .map_err(|e| fail(format!("failed to start {}: {}", tesseract_exe.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!("Tesseract failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_encode_png_signature() {
        let img: RgbaImage = ImageBuffer::from_pixel(4, 2, Rgba([255, 255, 255, 255]));
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_missing_executable_is_recognition_failure() {
        let engine = TesseractOcr::new("eng", 7)
            .with_executable(PathBuf::from("/nonexistent/stock-scan/tesseract"));
        let img: RgbaImage = ImageBuffer::from_pixel(8, 8, Rgba([0, 0, 0, 255]));

        match engine.recognize(&img) {
            Err(OcrError::RecognitionFailed { engine, reason }) => {
                assert_eq!(engine, "tesseract");
                assert!(reason.contains("failed to start"));
            }
            other => panic!("expected RecognitionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_error_display() {
        let err = OcrError::failed("remote", "HTTP 503");
        assert_eq!(err.to_string(), "recognition failed (remote): HTTP 503");
    }
}
