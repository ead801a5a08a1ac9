//! HTTP OCR service client.
//!
//! Request body: `{ image: <base64 PNG>, lang, use_angle_cls, use_gpu }`.
//! Response body: `{ data: [{ text, box? }, ...] }`; the texts are joined
//! with single spaces. Per-token boxes are ignored.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::engine::{encode_png, OcrEngine, OcrError};
use crate::config::OcrConfig;

const ENGINE_NAME: &str = "remote";

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    image: String,
    lang: &'a str,
    use_angle_cls: bool,
    use_gpu: bool,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    data: Vec<OcrToken>,
}

#[derive(Debug, Deserialize)]
struct OcrToken {
    text: String,
    #[serde(rename = "box", default)]
    #[allow(dead_code)]
    bounding_box: Option<serde_json::Value>,
}

/// Remote OCR service reached over HTTP.
pub struct RemoteOcr {
    endpoint: String,
    language: String,
    use_angle_cls: bool,
    use_gpu: bool,
    timeout: Duration,
}

impl RemoteOcr {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
            use_angle_cls: config.use_angle_cls,
            use_gpu: config.use_gpu,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    fn build_request(&self, img: &RgbaImage) -> Result<OcrRequest<'_>, OcrError> {
        let png = encode_png(img)
            .map_err(|e| OcrError::failed(ENGINE_NAME, format!("PNG encoding failed: {}", e)))?;
        Ok(OcrRequest {
            image: STANDARD.encode(png),
            lang: &self.language,
            use_angle_cls: self.use_angle_cls,
            use_gpu: self.use_gpu,
        })
    }
}

/// Joins the recognized tokens of a response body.
fn parse_response_body(body: &str) -> Result<String, OcrError> {
    let response: OcrResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::failed(ENGINE_NAME, format!("malformed response: {}", e)))?;

    Ok(response
        .data
        .iter()
        .map(|token| token.text.as_str())
        .collect::<Vec<_>>()
        .join(" "))
}

impl OcrEngine for RemoteOcr {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn recognize(&self, img: &RgbaImage) -> Result<String, OcrError> {
        let request = self.build_request(img)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| OcrError::failed(ENGINE_NAME, e.to_string()))?;

        crate::log(&format!(
            "Remote OCR: POST {} ({} bytes base64)",
            self.endpoint,
            request.image.len()
        ));

        let response = client
            .post(&self.endpoint)
            .header("User-Agent", "stock-scan")
            .json(&request)
            .send()
            .map_err(|e| OcrError::failed(ENGINE_NAME, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OcrError::failed(
                ENGINE_NAME,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .text()
            .map_err(|e| OcrError::failed(ENGINE_NAME, format!("failed to read body: {}", e)))?;

        parse_response_body(&body)
    }
}
