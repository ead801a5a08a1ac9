use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the per-user data directory: `<local data>/stock-scan/`
///
/// Falls back to the directory containing the executable when the platform
/// has no local data directory.
pub fn get_data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        dirs::data_local_dir()
            .map(|p| p.join("stock-scan"))
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            })
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<data_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_data_dir().join("logs")
}

/// Returns the persisted state directory: `<data_dir>/storage/`
pub fn get_storage_dir() -> PathBuf {
    get_data_dir().join("storage")
}

/// Returns the default export directory: `<data_dir>/exports/`
pub fn get_exports_dir() -> PathBuf {
    get_data_dir().join("exports")
}

/// Returns the user config file location: `<config dir>/stock-scan/config.json`
pub fn get_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stock-scan").join("config.json"))
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_storage_dir())?;
    std::fs::create_dir_all(get_exports_dir())?;
    Ok(())
}
