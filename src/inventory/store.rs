//! Persistence for the inventory list and packaging units.
//!
//! State lives in a string key-value store, one JSON document per key.
//! Both values are read once at startup and rewritten in full after every
//! mutation of the respective entity.

use anyhow::{Context, Result};
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::item::InventoryItem;
use super::units::PackagingUnits;
use crate::log;

/// Key holding the serialized inventory list.
pub const ITEMS_KEY: &str = "itemList";
/// Key holding the serialized packaging units.
pub const UNITS_KEY: &str = "packagingUnits";

/// Device-local key-value storage.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .context(format!("Failed to read {}", path.display()))?;
        Ok(Some(contents))
    }

    /// Writes to a temporary file first, then renames it over the old value,
    /// so a failed write never leaves a truncated document behind.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .context(format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(key);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary storage file")?;
        tmp.write_all(value.as_bytes())
            .context(format!("Failed to write {}", key))?;
        tmp.persist(&path)
            .map_err(|e| e.error)
            .context(format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// In-memory storage for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, String>>,
    fail_writes: bool,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose writes always fail (quota exceeded, storage unavailable).
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("storage quota exceeded while writing {}", key);
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads the inventory list. Missing or unreadable data yields an empty list.
pub fn load_items(storage: &dyn Storage) -> Vec<InventoryItem> {
    match storage.get(ITEMS_KEY) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(items) => items,
            Err(e) => {
                log(&format!(
                    "Warning: stored {} is not a valid list ({}). Starting empty.",
                    ITEMS_KEY, e
                ));
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            log(&format!("Warning: failed to read {}: {:#}", ITEMS_KEY, e));
            Vec::new()
        }
    }
}

/// Loads the packaging units. Missing or unreadable data yields the defaults.
pub fn load_units(storage: &dyn Storage) -> PackagingUnits {
    match storage.get(UNITS_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<Vec<String>>(&json) {
            Ok(labels) => PackagingUnits::from_labels(labels),
            Err(e) => {
                log(&format!(
                    "Warning: stored {} is not a valid list ({}). Using defaults.",
                    UNITS_KEY, e
                ));
                PackagingUnits::default()
            }
        },
        Ok(None) => PackagingUnits::default(),
        Err(e) => {
            log(&format!("Warning: failed to read {}: {:#}", UNITS_KEY, e));
            PackagingUnits::default()
        }
    }
}

pub fn save_items(storage: &dyn Storage, items: &[InventoryItem]) -> Result<()> {
    let json = serde_json::to_string(items).context("Failed to serialize inventory list")?;
    storage.set(ITEMS_KEY, &json)
}

pub fn save_units(storage: &dyn Storage, units: &PackagingUnits) -> Result<()> {
    let json = serde_json::to_string(units).context("Failed to serialize packaging units")?;
    storage.set(UNITS_KEY, &json)
}

/// Opens the file storage under `dir`.
pub fn open_file_storage(dir: &Path) -> FileStorage {
    log(&format!("Using storage at {}", dir.display()));
    FileStorage::new(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn item(code: &str, qty: u32) -> InventoryItem {
        InventoryItem {
            product_number: code.into(),
            quantity: qty,
            unit: "카톤".into(),
            expiry_date: String::new(),
        }
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage"));

        assert_eq!(storage.get(ITEMS_KEY).unwrap(), None);
        storage.set(ITEMS_KEY, "[]").unwrap();
        assert_eq!(storage.get(ITEMS_KEY).unwrap().as_deref(), Some("[]"));

        // Overwrite replaces the whole value
        storage.set(ITEMS_KEY, "[1]").unwrap();
        assert_eq!(storage.get(ITEMS_KEY).unwrap().as_deref(), Some("[1]"));
        assert!(dir.path().join("storage").join("itemList.json").exists());
    }

    #[test]
    fn test_items_persist_across_instances() {
        let dir = tempdir().unwrap();
        let items = vec![item("88881234", 5), item("A-7", 1)];

        save_items(&FileStorage::new(dir.path()), &items).unwrap();
        let loaded = load_items(&FileStorage::new(dir.path()));

        assert_eq!(loaded, items);
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let storage = MemoryStorage::new();
        assert!(load_items(&storage).is_empty());
        assert_eq!(load_units(&storage), PackagingUnits::default());
    }

    #[test]
    fn test_garbled_blobs_fall_back() {
        let storage = MemoryStorage::new()
            .with_value(ITEMS_KEY, "{oops")
            .with_value(UNITS_KEY, "42");
        assert!(load_items(&storage).is_empty());
        assert_eq!(load_units(&storage), PackagingUnits::default());
    }

    #[test]
    fn test_units_round_trip_as_string_array() {
        let storage = MemoryStorage::new();
        let units = PackagingUnits::from_labels(["카톤", "중포", "박스"]);

        save_units(&storage, &units).unwrap();

        assert_eq!(storage.raw(UNITS_KEY).unwrap(), r#"["카톤","중포","박스"]"#);
        assert_eq!(load_units(&storage), units);
    }

    #[test]
    fn test_failing_storage_reports_error() {
        let storage = MemoryStorage::failing();
        assert!(save_items(&storage, &[item("1", 1)]).is_err());
    }
}
