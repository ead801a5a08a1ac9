//! Region selection on the Display Surface.
//!
//! Maps pointer events from screen space into surface space and tracks the
//! drag that produces the rectangle handed to OCR.

pub mod coords;
pub mod tracker;

pub use coords::{
    fit_surface, map_pointer, DisplayRect, PointerInput, SurfaceSize, ViewportTransform,
};
pub use tracker::{PixelRect, SelectionOutcome, SelectionRect, SelectionTracker};
