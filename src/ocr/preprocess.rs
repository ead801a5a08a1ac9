use image::{ImageBuffer, Rgba, RgbaImage};

use crate::config::PreprocessConfig;
use crate::selection::PixelRect;

/// Fill used for crop pixels that fall outside the source bitmap.
const OUTSIDE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Largest accepted upscale factor.
pub const MAX_UPSCALE: u32 = 8;

/// Parameters for [`normalize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizeParams {
    /// Contrast gain around the 128 midpoint
    pub gain: f32,
    /// Enhanced values at or below this become black
    pub threshold: u8,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            gain: 2.0,
            threshold: 128,
        }
    }
}

impl From<&PreprocessConfig> for NormalizeParams {
    fn from(config: &PreprocessConfig) -> Self {
        Self {
            gain: config.contrast_gain,
            threshold: config.threshold,
        }
    }
}

/// Crops `rect` out of `img` and upscales it with nearest-neighbour sampling.
///
/// The rect is clamped to the bitmap first, then grown to at least
/// `min_size` (width, height). When the grown region would run past the
/// right or bottom edge its origin is shifted back; anything still outside
/// the bitmap (a bitmap smaller than the floor) is filled with opaque white.
///
/// Output size is `(max(clamped_w, min_w) * upscale, max(clamped_h, min_h) * upscale)`
/// with `upscale` limited to `1..=MAX_UPSCALE`.
pub fn extract_crop(
    img: &RgbaImage,
    rect: PixelRect,
    min_size: (u32, u32),
    upscale: u32,
) -> RgbaImage {
    let (w, h) = img.dimensions();
    let upscale = upscale.clamp(1, MAX_UPSCALE);

    let left = rect.x.min(w);
    let top = rect.y.min(h);
    let right = rect.x.saturating_add(rect.width).min(w);
    let bottom = rect.y.saturating_add(rect.height).min(h);

    let crop_w = (right - left).max(min_size.0).max(1);
    let crop_h = (bottom - top).max(min_size.1).max(1);

    let x0 = left.min(w.saturating_sub(crop_w));
    let y0 = top.min(h.saturating_sub(crop_h));

    let out_w = crop_w.saturating_mul(upscale);
    let out_h = crop_h.saturating_mul(upscale);

    ImageBuffer::from_fn(out_w, out_h, |x, y| {
        let sx = x0 + x / upscale;
        let sy = y0 + y / upscale;
        if sx < w && sy < h {
            *img.get_pixel(sx, sy)
        } else {
            OUTSIDE_FILL
        }
    })
}

/// Converts to a black/white image for OCR.
///
/// Per pixel: luma (`0.299R + 0.587G + 0.114B`), contrast stretch
/// `(gray - 128) * gain + 128` clamped to 0–255, then values at or below the
/// threshold become 0 and the rest 255. RGB channels receive the result;
/// alpha is kept.
///
/// Output pixels are exactly 0 or 255, so normalizing twice is a no-op.
pub fn normalize(img: &RgbaImage, params: NormalizeParams) -> RgbaImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;

        let gray = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let enhanced = ((gray - 128.0) * params.gain + 128.0).clamp(0.0, 255.0);

        let value = if enhanced <= params.threshold as f32 {
            0u8
        } else {
            255u8
        };

        output.put_pixel(x, y, Rgba([value, value, value, a]));
    }

    output
}

/// Crop, upscale and normalize a surface region using the configured parameters.
pub fn prepare_for_ocr(surface: &RgbaImage, rect: PixelRect, config: &PreprocessConfig) -> RgbaImage {
    let cropped = extract_crop(
        surface,
        rect,
        (config.min_crop_width, config.min_crop_height),
        config.upscale,
    );
    normalize(&cropped, NormalizeParams::from(config))
}
