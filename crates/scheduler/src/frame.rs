//! Single-slot frame scheduler
//!
//! Models "run this on the next paint". Requesting a frame while one is
//! pending replaces it, so at most one pass is ever queued per scheduler.

/// Identifies one frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    pending: Option<FrameRequestId>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a pass for the next frame, cancelling any pass already queued.
    pub fn request(&mut self) -> FrameRequestId {
        if let Some(previous) = self.pending.take() {
            tracing::trace!(?previous, "frame request superseded");
        }
        self.next_id += 1;
        let id = FrameRequestId(self.next_id);
        self.pending = Some(id);
        id
    }

    pub fn cancel(&mut self) -> Option<FrameRequestId> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Called by the host once per frame; yields the pass to run, if any.
    pub fn take_due(&mut self) -> Option<FrameRequestId> {
        self.pending.take()
    }
}
