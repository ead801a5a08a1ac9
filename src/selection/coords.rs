//! Coordinate conversion utilities.
//!
//! Converts pointer positions in on-screen pixel space into Display Surface
//! pixel coordinates, undoing element scaling and the viewport pan/zoom.
//!
//! Forward model (surface point → screen point):
//! `element = surface * scale + pan`, then
//! `screen = rect.origin + element * rect.size / surface.size`.
//! The inverse therefore subtracts the pan before dividing by the scale.

/// Pixel dimensions of the Display Surface (the buffer the image is drawn into).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Rounded pixel dimensions, never smaller than 1x1.
    pub fn pixels(&self) -> (u32, u32) {
        (
            (self.width.round() as u32).max(1),
            (self.height.round() as u32).max(1),
        )
    }
}

/// Fits an image of `image_w x image_h` into a container, preserving aspect ratio.
///
/// Wider-than-container images take the full container width; all others take
/// the full container height.
pub fn fit_surface(image_w: u32, image_h: u32, container_w: f64, container_h: f64) -> SurfaceSize {
    if image_w == 0 || image_h == 0 || container_w <= 0.0 || container_h <= 0.0 {
        return SurfaceSize::new(0.0, 0.0);
    }

    let image_ratio = image_w as f64 / image_h as f64;
    let container_ratio = container_w / container_h;

    if image_ratio > container_ratio {
        SurfaceSize::new(container_w, container_w / image_ratio)
    } else {
        SurfaceSize::new(container_h * image_ratio, container_h)
    }
}

/// On-screen bounding box of the rendered surface element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A rect at the origin rendered at exactly the surface's pixel size.
    pub fn unscaled(surface: SurfaceSize) -> Self {
        Self::new(0.0, 0.0, surface.width, surface.height)
    }
}

/// Zoom and pan applied on top of the Display Surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    /// Zoom factor, always > 0
    pub scale: f64,
    /// Horizontal pan in element pixels
    pub pan_x: f64,
    /// Vertical pan in element pixels
    pub pan_y: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewportTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    /// Unpanned transform at the given zoom. Non-positive zooms fall back to 1.
    pub fn with_zoom(scale: f64) -> Self {
        Self {
            scale: if scale > 0.0 && scale.is_finite() { scale } else { 1.0 },
            ..Self::identity()
        }
    }

    /// Maps a surface point to element space (the forward CSS transform).
    pub fn forward(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.pan_x, y * self.scale + self.pan_y)
    }

    /// Maps an element-space point back to surface space.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pan_x) / self.scale, (y - self.pan_y) / self.scale)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Multiplies the zoom by `factor`, keeping the surface point under the
    /// element-space focus fixed. The resulting scale is clamped to `[min, max]`.
    pub fn zoom_at(&mut self, focus_x: f64, focus_y: f64, factor: f64, min: f64, max: f64) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        let new_scale = (self.scale * factor).clamp(min, max);
        let ratio = new_scale / self.scale;

        self.pan_x = focus_x - (focus_x - self.pan_x) * ratio;
        self.pan_y = focus_y - (focus_y - self.pan_y) * ratio;
        self.scale = new_scale;
    }
}

/// Which device produced a pointer event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    /// First contact point of a touch event
    Touch,
}

/// A pointer position in on-screen (client) pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInput {
    pub x: f64,
    pub y: f64,
    pub source: PointerSource,
}

impl PointerInput {
    pub fn mouse(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            source: PointerSource::Mouse,
        }
    }

    pub fn touch(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            source: PointerSource::Touch,
        }
    }
}

/// Converts a pointer position to Display Surface coordinates.
///
/// 1. Make relative to the element's top-left.
/// 2. Undo element scaling (rendered size vs. pixel buffer size).
/// 3. Undo the viewport: subtract pan, then divide by scale.
/// 4. Clamp into `[0, surface.width] x [0, surface.height]`.
pub fn to_source_space(
    pointer_x: f64,
    pointer_y: f64,
    rect: &DisplayRect,
    surface: SurfaceSize,
    transform: &ViewportTransform,
) -> (f64, f64) {
    let mut x = pointer_x - rect.left;
    let mut y = pointer_y - rect.top;

    if rect.width > 0.0 {
        x = x / rect.width * surface.width;
    }
    if rect.height > 0.0 {
        y = y / rect.height * surface.height;
    }

    let (x, y) = transform.inverse(x, y);

    (
        clamp_axis(x, surface.width),
        clamp_axis(y, surface.height),
    )
}

/// Same as [`to_source_space`] for a mouse or touch event.
pub fn map_pointer(
    pointer: &PointerInput,
    rect: &DisplayRect,
    surface: SurfaceSize,
    transform: &ViewportTransform,
) -> (f64, f64) {
    to_source_space(pointer.x, pointer.y, rect, surface, transform)
}

fn clamp_axis(value: f64, upper: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.max(0.0).min(upper.max(0.0))
}

/// Maps a surface point all the way to screen space (inverse of [`to_source_space`]
/// for in-bounds points).
pub fn to_screen_space(
    x: f64,
    y: f64,
    rect: &DisplayRect,
    surface: SurfaceSize,
    transform: &ViewportTransform,
) -> (f64, f64) {
    let (ex, ey) = transform.forward(x, y);
    let sx = if surface.width > 0.0 {
        ex * rect.width / surface.width
    } else {
        ex
    };
    let sy = if surface.height > 0.0 {
        ey * rect.height / surface.height
    } else {
        ey
    };
    (rect.left + sx, rect.top + sy)
}
