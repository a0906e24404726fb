//! Measured popup container
//!
//! A popup has to be laid out before its size is known, and its size decides
//! where it goes. The container keeps the popup invisible until a measurement
//! pass has run on a frame, and schedules at most one pass at a time.

use crate::geometry::Size;
use crate::placement::{place, Placement, PlacementInput, GAP};
use marginalia_scheduler::{FrameRequestId, FrameScheduler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets popup content ask for a re-measure when its shape changes.
#[derive(Debug, Clone, Default)]
pub struct RelayoutHandle {
    requested: Arc<AtomicBool>,
}

impl RelayoutHandle {
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug)]
pub struct TipContainer {
    frames: FrameScheduler,
    size: Option<Size>,
    gap: f64,
    relayout: RelayoutHandle,
}

impl Default for TipContainer {
    fn default() -> Self {
        Self::new(GAP)
    }
}

impl TipContainer {
    /// A freshly mounted container schedules its first measurement.
    pub fn new(gap: f64) -> Self {
        let mut frames = FrameScheduler::new();
        frames.request();
        Self { frames, size: None, gap, relayout: RelayoutHandle::default() }
    }

    pub fn relayout_handle(&self) -> RelayoutHandle {
        self.relayout.clone()
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }

    pub fn is_visible(&self) -> bool {
        self.size.is_some()
    }

    pub fn has_pending_measurement(&self) -> bool {
        self.frames.is_pending() || self.relayout.requested.load(Ordering::Acquire)
    }

    /// The popup's children changed; measure again on the next frame.
    pub fn content_changed(&mut self) -> FrameRequestId {
        self.frames.request()
    }

    /// Forget the current size, hiding the popup, and measure again.
    pub fn request_relayout(&mut self) -> FrameRequestId {
        self.size = None;
        self.frames.request()
    }

    /// Run the pending measurement pass, if any.
    ///
    /// `measure` returns the rendered popup size, or `None` when nothing is
    /// rendered; the popup then stays hidden. Returns whether a pass ran.
    pub fn on_frame(&mut self, measure: impl FnOnce() -> Option<Size>) -> bool {
        if self.relayout.take() {
            self.request_relayout();
        }
        let Some(request) = self.frames.take_due() else {
            return false;
        };

        self.size = measure().filter(|size| !size.is_empty());
        match self.size {
            Some(size) => tracing::trace!(
                ?request,
                width = size.width,
                height = size.height,
                "measured popup"
            ),
            None => tracing::debug!(?request, "popup has no rendered node; keeping it hidden"),
        }
        true
    }

    /// Placement for the current measurement; invisible until measured.
    pub fn placement(&self, input: &PlacementInput) -> Placement {
        place(input, self.size.unwrap_or_default(), self.gap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn input() -> PlacementInput {
        PlacementInput {
            anchor: Rect::new(100.0, 100.0, 50.0, 20.0),
            page: Rect::new(0.0, 0.0, 800.0, 1000.0),
            page_offset_top: 0.0,
        }
    }

    #[test]
    fn test_hidden_until_first_frame() {
        let mut container = TipContainer::default();
        assert!(!container.placement(&input()).visible);
        assert!(container.has_pending_measurement());

        assert!(container.on_frame(|| Some(Size::new(200.0, 80.0))));
        assert!(container.placement(&input()).visible);
        assert!(!container.on_frame(|| panic!("no pass should be pending")));
    }

    #[test]
    fn test_relayout_hides_and_remeasures() {
        let mut container = TipContainer::default();
        container.on_frame(|| Some(Size::new(200.0, 80.0)));

        container.request_relayout();
        assert!(!container.is_visible());
        assert!(container.on_frame(|| Some(Size::new(240.0, 160.0))));
        assert_eq!(container.size(), Some(Size::new(240.0, 160.0)));
    }

    #[test]
    fn test_content_change_keeps_popup_visible_while_remeasuring() {
        let mut container = TipContainer::default();
        container.on_frame(|| Some(Size::new(200.0, 80.0)));

        container.content_changed();
        assert!(container.is_visible());
        container.on_frame(|| Some(Size::new(200.0, 120.0)));
        assert_eq!(container.size(), Some(Size::new(200.0, 120.0)));
    }

    #[test]
    fn test_repeated_requests_run_one_pass() {
        let mut container = TipContainer::default();
        container.content_changed();
        container.request_relayout();
        container.content_changed();

        let mut passes = 0;
        container.on_frame(|| {
            passes += 1;
            Some(Size::new(10.0, 10.0))
        });
        container.on_frame(|| {
            passes += 1;
            None
        });
        assert_eq!(passes, 1);
    }

    #[test]
    fn test_missing_node_keeps_popup_hidden() {
        let mut container = TipContainer::default();
        assert!(container.on_frame(|| None));
        assert!(!container.is_visible());

        container.content_changed();
        assert!(container.on_frame(|| Some(Size::default())));
        assert!(!container.is_visible());
    }

    #[test]
    fn test_relayout_handle_requests_from_content() {
        let mut container = TipContainer::default();
        container.on_frame(|| Some(Size::new(200.0, 80.0)));
        let handle = container.relayout_handle();

        handle.request();
        assert!(container.has_pending_measurement());
        assert!(container.on_frame(|| Some(Size::new(300.0, 200.0))));
        assert_eq!(container.size(), Some(Size::new(300.0, 200.0)));
    }
}
