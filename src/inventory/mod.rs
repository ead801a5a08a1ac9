//! Inventory list, packaging units, persistence and export.

pub mod export;
pub mod item;
pub mod store;
pub mod units;

pub use export::{
    copy_plan, export_items, render_report, share_plan, Delivered, DeliveryChannel, DeliveryError,
};
pub use item::{format_expiry, FormField, InventoryItem, ItemForm};
pub use store::{
    load_items, load_units, open_file_storage, save_items, save_units, FileStorage, Storage,
};
#[cfg(test)]
pub use store::MemoryStorage;
pub use units::PackagingUnits;
