//! Pointer tracking around a popup with a grace margin
//!
//! Moving from an anchor to its popup usually crosses a few pixels that belong
//! to neither. The monitor pads the popup box so those excursions do not count
//! as leaving.

use crate::geometry::{Point, Rect};
use crate::interaction::InteractionEvent;

pub const DEFAULT_PADDING_X: f64 = 60.0;
pub const DEFAULT_PADDING_Y: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct MouseMonitor {
    padding_x: f64,
    padding_y: f64,
    /// Popup box in viewport coordinates; `None` until the popup is placed.
    bounds: Option<Rect>,
    /// The pointer starts next to the popup it just opened.
    inside: bool,
}

impl Default for MouseMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING_X, DEFAULT_PADDING_Y)
    }
}

impl MouseMonitor {
    pub fn new(padding_x: f64, padding_y: f64) -> Self {
        Self { padding_x, padding_y, bounds: None, inside: true }
    }

    pub fn padding(&self) -> (f64, f64) {
        (self.padding_x, self.padding_y)
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = Some(bounds);
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Whether `point` lies within the padded popup box.
    pub fn is_within(&self, point: Point) -> bool {
        match self.bounds {
            Some(bounds) => bounds.inflate(self.padding_x, self.padding_y).contains(point),
            None => true,
        }
    }

    /// Handle pointer motion.
    ///
    /// Reports `MovedAway` when the pointer crosses out of the padded box and
    /// `PointerReturn` when it crosses back in. Motion before the popup has
    /// been placed reports nothing.
    pub fn on_pointer_move(&mut self, point: Point) -> Option<InteractionEvent> {
        self.bounds?;

        let within = self.is_within(point);
        if within == self.inside {
            return None;
        }
        self.inside = within;

        if within {
            Some(InteractionEvent::PointerReturn)
        } else {
            Some(InteractionEvent::MovedAway)
        }
    }
}
