//! Plain-text inventory report and its delivery.
//!
//! The report is one `productNumber | quantity | unit | expiryDate` line per
//! item. Delivery tries an ordered list of channels and advances to the next
//! one whenever a channel is unavailable or fails.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::item::InventoryItem;
use crate::config::ExportConfig;
use crate::log;

/// Title attached to shared reports.
pub const SHARE_TITLE: &str = "재고 정리 목록";

/// Renders the list as a report. `None` when there is nothing to export.
pub fn render_report(items: &[InventoryItem]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .map(|item| {
                format!(
                    "{} | {} | {} | {}",
                    item.product_number, item.quantity, item.unit, item.expiry_date
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Where a report ended up.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivered {
    pub channel: String,
    /// File written, for channels that produce one
    pub path: Option<PathBuf>,
}

impl Delivered {
    fn via(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            path: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DeliveryError {
    #[error("내보낼 항목이 없습니다")]
    NothingToExport,

    #[error("목록 내보내기에 실패했습니다 ({tried}): {reason}")]
    AllChannelsFailed { tried: String, reason: String },
}

/// A way of handing the report to the user.
pub trait DeliveryChannel {
    fn name(&self) -> &str;

    /// Whether the channel can be attempted at all on this machine.
    fn is_available(&self) -> bool {
        true
    }

    fn deliver(&self, text: &str) -> Result<Delivered>;
}

/// System clipboard.
pub struct ClipboardChannel;

impl DeliveryChannel for ClipboardChannel {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn deliver(&self, text: &str) -> Result<Delivered> {
        let mut clipboard = arboard::Clipboard::new().context("Clipboard is not available")?;
        clipboard
            .set_text(text.to_string())
            .context("Failed to write to clipboard")?;
        Ok(Delivered::via(self.name()))
    }
}

#[derive(Serialize)]
struct SharePayload<'a> {
    title: &'a str,
    text: &'a str,
}

/// Share target reached over HTTP. Unavailable without a configured URL.
pub struct ShareChannel {
    url: Option<String>,
    timeout: Duration,
}

impl ShareChannel {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            timeout: Duration::from_secs(15),
        }
    }
}

impl DeliveryChannel for ShareChannel {
    fn name(&self) -> &str {
        "share"
    }

    fn is_available(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    fn deliver(&self, text: &str) -> Result<Delivered> {
        let Some(url) = self.url.as_deref() else {
            bail!("No share target configured");
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .post(url)
            .header("User-Agent", "stock-scan")
            .json(&SharePayload {
                title: SHARE_TITLE,
                text,
            })
            .send()
            .context(format!("Failed to reach share target {}", url))?;

        if !response.status().is_success() {
            bail!("Share target returned HTTP {}", response.status());
        }
        Ok(Delivered::via(self.name()))
    }
}

/// Writes `재고목록_<YYYY-MM-DD>.txt` into a directory.
pub struct DownloadChannel {
    dir: PathBuf,
}

impl DownloadChannel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name_for(date: chrono::NaiveDate) -> String {
        format!("재고목록_{}.txt", date.format("%Y-%m-%d"))
    }
}

impl DeliveryChannel for DownloadChannel {
    fn name(&self) -> &str {
        "download"
    }

    fn deliver(&self, text: &str) -> Result<Delivered> {
        fs::create_dir_all(&self.dir)
            .context(format!("Failed to create {}", self.dir.display()))?;

        let path = self
            .dir
            .join(Self::file_name_for(chrono::Local::now().date_naive()));
        fs::write(&path, text).context(format!("Failed to write {}", path.display()))?;

        Ok(Delivered {
            channel: self.name().to_string(),
            path: Some(path),
        })
    }
}

/// Tries each channel in order until one succeeds.
pub fn deliver_with_fallback(
    channels: &[Box<dyn DeliveryChannel>],
    text: &str,
) -> Result<Delivered, DeliveryError> {
    let mut tried = Vec::new();
    let mut reason = String::from("no delivery channel available");

    for channel in channels {
        if !channel.is_available() {
            log(&format!("Export: {} unavailable, skipping", channel.name()));
            continue;
        }

        tried.push(channel.name().to_string());
        match channel.deliver(text) {
            Ok(delivered) => {
                log(&format!("Export: delivered via {}", delivered.channel));
                return Ok(delivered);
            }
            Err(e) => {
                log(&format!("Export: {} failed: {:#}", channel.name(), e));
                reason = format!("{:#}", e);
            }
        }
    }

    Err(DeliveryError::AllChannelsFailed {
        tried: tried.join(", "),
        reason,
    })
}

/// Renders and delivers the list in one step.
pub fn export_items(
    items: &[InventoryItem],
    channels: &[Box<dyn DeliveryChannel>],
) -> Result<Delivered, DeliveryError> {
    let report = render_report(items).ok_or(DeliveryError::NothingToExport)?;
    deliver_with_fallback(channels, &report)
}

/// Copy button: clipboard, then file.
pub fn copy_plan(download_dir: PathBuf) -> Vec<Box<dyn DeliveryChannel>> {
    vec![
        Box::new(ClipboardChannel),
        Box::new(DownloadChannel::new(download_dir)),
    ]
}

/// Share button: share target, then clipboard, then file.
pub fn share_plan(config: &ExportConfig, download_dir: PathBuf) -> Vec<Box<dyn DeliveryChannel>> {
    vec![
        Box::new(ShareChannel::new(config.share_url.clone())),
        Box::new(ClipboardChannel),
        Box::new(DownloadChannel::new(download_dir)),
    ]
}
