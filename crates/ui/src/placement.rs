//! Adaptive popup placement
//!
//! The popup goes below its anchor when there is room for it, or when there is
//! at least as much room below as above; otherwise it flips above. It is
//! centered on the anchor horizontally and clamped to the page.

use crate::geometry::{Rect, Size};
use serde::{Deserialize, Serialize};

/// Distance between anchor and popup.
pub const GAP: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementInput {
    /// Anchor in the overlay's coordinate space.
    pub anchor: Rect,
    /// Bounds of the page the anchor sits on.
    pub page: Rect,
    /// Top of the page in the anchor's coordinate space.
    pub page_offset_top: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub top: f64,
    pub left: f64,
    /// False until the popup has been measured.
    pub visible: bool,
    pub side: Side,
}

impl Placement {
    pub fn bounds(&self, popup: Size) -> Rect {
        Rect::new(self.left, self.top, popup.width, popup.height)
    }
}

/// Position a popup of size `popup` next to `input.anchor`.
///
/// An empty `popup` size yields an invisible placement; the position is still
/// computed so the popup can be laid out and measured in place.
pub fn place(input: &PlacementInput, popup: Size, gap: f64) -> Placement {
    let top_in_page = input.anchor.top - input.page_offset_top;
    let bottom_in_page = input.anchor.bottom() - input.page_offset_top;
    let available_below = input.page.height - bottom_in_page;
    let available_above = top_in_page;

    let side = if available_below >= popup.height + gap || available_below >= available_above {
        Side::Below
    } else {
        Side::Above
    };

    let top = match side {
        Side::Below => input.anchor.bottom() + gap,
        Side::Above => input.anchor.top - popup.height - gap,
    };

    let max_left = (input.page.width - popup.width).max(0.0);
    let left = (input.anchor.center_x() - popup.width / 2.0).clamp(0.0, max_left);

    Placement { top, left, visible: !popup.is_empty(), side }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: Rect = Rect { left: 0.0, top: 0.0, width: 800.0, height: 1000.0 };
    const POPUP: Size = Size { width: 200.0, height: 80.0 };

    fn input(anchor: Rect) -> PlacementInput {
        PlacementInput { anchor, page: PAGE, page_offset_top: 0.0 }
    }

    #[test]
    fn test_anchor_near_right_edge_is_clamped() {
        let placement = place(&input(Rect::new(750.0, 500.0, 40.0, 20.0)), POPUP, GAP);
        assert_eq!(placement.left, 600.0);
        assert!(placement.left >= 0.0 && placement.left <= 600.0);
    }

    #[test]
    fn test_anchor_near_left_edge_is_clamped() {
        let placement = place(&input(Rect::new(0.0, 500.0, 20.0, 20.0)), POPUP, GAP);
        assert_eq!(placement.left, 0.0);
    }

    #[test]
    fn test_left_stays_on_page_across_anchor_positions() {
        for x in (0..=800).step_by(25) {
            let placement = place(&input(Rect::new(f64::from(x), 300.0, 10.0, 10.0)), POPUP, GAP);
            assert!(
                (0.0..=600.0).contains(&placement.left),
                "left {} for anchor x {}",
                placement.left,
                x
            );
        }
    }

    #[test]
    fn test_top_of_page_goes_below() {
        let placement = place(&input(Rect::new(100.0, 0.0, 50.0, 20.0)), POPUP, GAP);
        assert_eq!(placement.side, Side::Below);
        assert_eq!(placement.top, 26.0);
        assert_eq!(placement.left, 25.0);
    }

    #[test]
    fn test_bottom_of_page_flips_above() {
        let placement = place(&input(Rect::new(100.0, 960.0, 50.0, 20.0)), POPUP, GAP);
        assert_eq!(placement.side, Side::Above);
        assert_eq!(placement.top, 874.0);
    }

    #[test]
    fn test_page_offset_is_subtracted() {
        let anchor = Rect::new(100.0, 1960.0, 50.0, 20.0);
        let input = PlacementInput { anchor, page: PAGE, page_offset_top: 1000.0 };
        let placement = place(&input, POPUP, GAP);
        assert_eq!(placement.side, Side::Above);
        assert_eq!(placement.top, 1874.0);
    }

    #[test]
    fn test_tight_space_prefers_larger_side() {
        let page = Rect::new(0.0, 0.0, 800.0, 100.0);
        let anchor = Rect::new(100.0, 40.0, 50.0, 10.0);
        let placement = place(&PlacementInput { anchor, page, page_offset_top: 0.0 }, POPUP, GAP);
        assert_eq!(placement.side, Side::Below);
    }

    #[test]
    fn test_popup_wider_than_page_pins_left() {
        let page = Rect::new(0.0, 0.0, 150.0, 1000.0);
        let anchor = Rect::new(100.0, 10.0, 20.0, 10.0);
        let placement = place(&PlacementInput { anchor, page, page_offset_top: 0.0 }, POPUP, GAP);
        assert_eq!(placement.left, 0.0);
    }

    #[test]
    fn test_unmeasured_popup_is_hidden() {
        let placement = place(&input(Rect::new(100.0, 100.0, 10.0, 10.0)), Size::default(), GAP);
        assert!(!placement.visible);
        assert!(place(&input(Rect::new(100.0, 100.0, 10.0, 10.0)), POPUP, GAP).visible);
    }
}
