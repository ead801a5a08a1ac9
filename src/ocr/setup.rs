use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::log;

/// Environment variable pointing at a Tesseract executable.
const TESSERACT_PATH_ENV: &str = "TESSERACT_PATH";

/// Common install locations checked after PATH.
const COMMON_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

/// Returns the app-local directory for a bundled Tesseract.
pub fn get_tesseract_dir() -> PathBuf {
    crate::paths::get_data_dir().join("tesseract")
}

fn local_executable_name() -> &'static str {
    if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    }
}

/// Finds the Tesseract executable.
///
/// Checks, in order: `TESSERACT_PATH`, the app-local directory, the system
/// PATH, then common install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(TESSERACT_PATH_ENV) {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
        log(&format!(
            "{} is set but {} does not exist",
            TESSERACT_PATH_ENV,
            p.display()
        ));
    }

    let local_exe = get_tesseract_dir().join(local_executable_name());
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR (with the kor traineddata), \
         add it to PATH, or set {} to the executable",
        TESSERACT_PATH_ENV
    ))
}

/// Logs whether the fallback engine is usable. Call at startup.
pub fn report_tesseract_status() {
    match find_tesseract_executable() {
        Ok(path) => log(&format!("Tesseract found at: {}", path.display())),
        Err(e) => log(&format!("Warning: {}. OCR fallback will be unavailable.", e)),
    }
}
