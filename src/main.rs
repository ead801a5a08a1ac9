//! Stock Scan
//!
//! Reads a product code off a photo: the user selects the code region, the
//! crop is cleaned up and recognized, and the result is added to an inventory
//! list that can be copied, shared or saved as plain text.

mod app;
mod capture;
mod cli;
mod config;
mod error;
mod inventory;
mod ocr;
mod paths;
mod selection;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;

/// Logs a message to both stderr and the log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    eprint!("{}", line);
    let log_path = paths::get_logs_dir().join("stock_scan.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    let cli = cli::Cli::parse();

    // Ensure output directories exist
    paths::ensure_directories()?;

    // Load configuration
    config::init_config();
    let config = config::get_config();

    if config.ocr.primary == config::OcrBackend::Tesseract
        || config.ocr.fallback == config::OcrBackend::Tesseract
    {
        ocr::report_tesseract_status();
    }

    cli::run(cli, config)
}
