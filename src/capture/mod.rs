//! Source Bitmap acquisition.
//!
//! This module provides:
//! - Still image loading (`load_still`), the substitute for a live camera frame
//! - Display Surface rendering (`render_surface`)

pub mod still;

pub use still::{load_still, render_surface, CaptureError, SourceImage};
