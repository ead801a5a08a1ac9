//! Application configuration.
//!
//! Loads settings from config.json at startup. Provides viewport defaults,
//! selection and preprocessing thresholds, OCR backend selection and export
//! targets. Every group falls back to its defaults when absent.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Environment variable overriding `ocr.endpoint`.
const ENDPOINT_ENV: &str = "STOCK_SCAN_OCR_ENDPOINT";

/// Display surface container and zoom limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Width of the area the display surface is fitted into (pixels)
    pub container_width: f64,
    /// Height of the area the display surface is fitted into (pixels)
    pub container_height: f64,
    /// Zoom applied whenever a new image is loaded
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            container_width: 390.0,
            container_height: 640.0,
            default_zoom: 1.0,
            min_zoom: 0.5,
            max_zoom: 5.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Selections narrower or shorter than this (surface pixels) are discarded
    pub min_size_px: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { min_size_px: 10.0 }
    }
}

/// Crop and binarization parameters applied before OCR.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Crops are widened to at least this many pixels before upscaling
    pub min_crop_width: u32,
    /// Crops are heightened to at least this many pixels before upscaling
    pub min_crop_height: u32,
    /// Nearest-neighbour upscale factor
    pub upscale: u32,
    /// Contrast gain around the 128 midpoint
    pub contrast_gain: f32,
    /// Enhanced values at or below this become black
    pub threshold: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_crop_width: 20,
            min_crop_height: 15,
            upscale: 2,
            contrast_gain: 2.0,
            threshold: 128,
        }
    }
}

/// Which recognition backend to use for a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    /// HTTP OCR service
    Remote,
    /// Local Tesseract executable
    Tesseract,
    /// Slot disabled
    None,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub primary: OcrBackend,
    pub fallback: OcrBackend,
    /// HTTP endpoint of the remote OCR service
    pub endpoint: String,
    /// Language hint sent to the remote service
    pub language: String,
    pub use_angle_cls: bool,
    pub use_gpu: bool,
    pub timeout_secs: u64,
    /// Tesseract `-l` argument
    pub tesseract_languages: String,
    /// Tesseract page segmentation mode (7 = single text line)
    pub tesseract_psm: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            primary: OcrBackend::Remote,
            fallback: OcrBackend::Tesseract,
            endpoint: "https://api.paddleocr.com/v1/ocr".to_string(),
            language: "korean".to_string(),
            use_angle_cls: true,
            use_gpu: false,
            timeout_secs: 30,
            tesseract_languages: "kor+eng".to_string(),
            tesseract_psm: 7,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Endpoint receiving `{title, text}` for the share channel; share is unavailable when unset
    pub share_url: Option<String>,
    /// Directory for downloaded reports (defaults to `<data_dir>/exports`)
    pub download_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewport: ViewportConfig,
    pub selection: SelectionConfig,
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    /// Parses a config document, applying environment overrides.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        let mut config: AppConfig = serde_json::from_str(contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.ocr.endpoint = endpoint.trim().to_string();
            }
        }
    }
}

/// Candidate config locations, in lookup order.
fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        candidates.push(exe_dir.join("config.json"));
    }
    if let Some(user) = crate::paths::get_user_config_path() {
        candidates.push(user);
    }
    candidates
}

/// Reads one config file. `None` when it is missing or invalid.
fn load_config_file(path: &Path) -> Option<AppConfig> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(contents) => match AppConfig::from_json(&contents) {
            Ok(config) => {
                crate::log(&format!("Config loaded from {}", path.display()));
                Some(config)
            }
            Err(e) => {
                crate::log(&format!(
                    "Failed to parse {}: {}. Ignoring it.",
                    path.display(),
                    e
                ));
                None
            }
        },
        Err(e) => {
            crate::log(&format!(
                "Failed to read {}: {}. Ignoring it.",
                path.display(),
                e
            ));
            None
        }
    }
}

/// Loads configuration from the first usable config.json or returns defaults.
fn load_config() -> AppConfig {
    for path in config_candidates() {
        crate::log(&format!("Looking for config at: {}", path.display()));
        if let Some(config) = load_config_file(&path) {
            return config;
        }
    }

    crate::log("config.json not found. Using default config.");
    let mut config = AppConfig::default();
    config.apply_env_overrides();
    config
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns a reference to the global configuration.
/// Loads it on first use if `init_config()` was never called.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(load_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.selection.min_size_px, 10.0);
        assert_eq!(config.preprocess.min_crop_width, 20);
        assert_eq!(config.preprocess.min_crop_height, 15);
        assert_eq!(config.preprocess.upscale, 2);
        assert_eq!(config.preprocess.threshold, 128);
        assert_eq!(config.ocr.primary, OcrBackend::Remote);
        assert_eq!(config.ocr.fallback, OcrBackend::Tesseract);
        assert!(config.export.share_url.is_none());
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let json = r#"{
            "preprocess": { "upscale": 3 },
            "ocr": { "fallback": "none" }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.preprocess.upscale, 3);
        assert_eq!(config.preprocess.min_crop_width, 20);
        assert_eq!(config.ocr.fallback, OcrBackend::None);
        assert_eq!(config.ocr.primary, OcrBackend::Remote);
        assert_eq!(config.viewport.max_zoom, 5.0);
    }

    #[test]
    fn test_load_config_file_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(load_config_file(&path).is_none());
    }

    #[test]
    fn test_load_config_file_missing() {
        let dir = tempdir().unwrap();
        assert!(load_config_file(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn test_load_config_file_reads_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "export": { "share_url": "http://localhost:9000/share" } }"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(
            config.export.share_url.as_deref(),
            Some("http://localhost:9000/share")
        );
    }
}
