//! Selection state tracking.
//!
//! Accumulates a start/end pair while the user drags over the Display Surface
//! and yields a normalized rectangle on release. Purely event driven.

/// An axis-aligned rectangle in Display Surface pixels, normalized so that
/// `x0 <= x1` and `y0 <= y1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl SelectionRect {
    /// Builds a normalized rectangle from two opposite corners.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            x0: a.0.min(b.0),
            y0: a.1.min(b.1),
            x1: a.0.max(b.0),
            y1: a.1.max(b.1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Integer pixel region covering the rectangle (origin floored, far edge ceiled).
    pub fn to_pixel_rect(&self) -> PixelRect {
        let x = self.x0.max(0.0).floor();
        let y = self.y0.max(0.0).floor();
        let x1 = self.x1.max(0.0).ceil();
        let y1 = self.y1.max(0.0).ceil();
        PixelRect {
            x: x as u32,
            y: y as u32,
            width: (x1 - x).max(0.0) as u32,
            height: (y1 - y).max(0.0) as u32,
        }
    }
}

/// A rectangle in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Tracker states.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionState {
    /// No selection in progress.
    Idle,
    /// Pointer is down; `end` follows the pointer.
    Dragging { start: (f64, f64), end: (f64, f64) },
    /// Released with a large enough rectangle.
    Committed(SelectionRect),
}

/// Result of a pointer-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionOutcome {
    Committed(SelectionRect),
    /// Below the minimum size; the selection was discarded.
    TooSmall,
    /// No drag was in progress.
    Ignored,
}

#[derive(Clone, Debug)]
pub struct SelectionTracker {
    state: SelectionState,
    /// Selection mode; pointer-downs are ignored while inactive.
    active: bool,
    min_size: f64,
}

impl SelectionTracker {
    pub fn new(min_size: f64) -> Self {
        Self {
            state: SelectionState::Idle,
            active: false,
            min_size,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            if let SelectionState::Dragging { .. } = self.state {
                self.state = SelectionState::Idle;
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectionState::Dragging { .. })
    }

    /// The committed rectangle, if any.
    pub fn committed(&self) -> Option<SelectionRect> {
        match self.state {
            SelectionState::Committed(rect) => Some(rect),
            _ => None,
        }
    }

    /// In-progress or committed rectangle, for drawing the overlay.
    pub fn current(&self) -> Option<SelectionRect> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::Dragging { start, end } => Some(SelectionRect::from_corners(start, end)),
            SelectionState::Committed(rect) => Some(rect),
        }
    }

    /// Starts a drag. Returns false when the event was ignored.
    pub fn pointer_down(&mut self, point: (f64, f64)) -> bool {
        if !self.active || matches!(self.state, SelectionState::Committed(_)) {
            return false;
        }
        self.state = SelectionState::Dragging {
            start: point,
            end: point,
        };
        true
    }

    pub fn pointer_move(&mut self, point: (f64, f64)) -> bool {
        match &mut self.state {
            SelectionState::Dragging { end, .. } => {
                *end = point;
                true
            }
            _ => false,
        }
    }

    /// Finishes the drag. `point`, when given, is applied as a final move.
    pub fn pointer_up(&mut self, point: Option<(f64, f64)>) -> SelectionOutcome {
        let (start, end) = match self.state {
            SelectionState::Dragging { start, end } => (start, point.unwrap_or(end)),
            _ => return SelectionOutcome::Ignored,
        };

        let rect = SelectionRect::from_corners(start, end);
        if rect.width() < self.min_size || rect.height() < self.min_size {
            self.state = SelectionState::Idle;
            return SelectionOutcome::TooSmall;
        }

        self.state = SelectionState::Committed(rect);
        SelectionOutcome::Committed(rect)
    }

    /// Drops any selection and re-enables selection mode.
    pub fn reselect(&mut self) {
        self.state = SelectionState::Idle;
        self.active = true;
    }

    /// Clears everything; used when a new image is loaded.
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
    }
}
