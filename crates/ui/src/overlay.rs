//! Popup overlay for the displayed annotations
//!
//! One popup slot shared by every annotation on screen. The overlay owns the
//! active popup's interaction machine, grace-margin monitor and measuring
//! container, and turns pointer input and lock requests into show/hide
//! commands for the host.

use crate::config::OverlayConfig;
use crate::geometry::{Point, Size};
use crate::interaction::{HoverLockMachine, InteractionEvent, PopupCommand, PopupState};
use crate::mouse_monitor::MouseMonitor;
use crate::placement::{Placement, PlacementInput};
use crate::popup::{LockControl, LockReceiver, LockRequest, PopupBody};
use crate::tip_container::{RelayoutHandle, TipContainer};
use marginalia_model::Annotation;
use std::fmt;

struct ActivePopup<K, C> {
    key: K,
    body: PopupBody<C>,
    machine: HoverLockMachine,
    monitor: MouseMonitor,
    container: TipContainer,
    lock: LockReceiver,
}

pub struct PopupOverlay<K, C> {
    config: OverlayConfig,
    active: Option<ActivePopup<K, C>>,
}

impl<K, C> Default for PopupOverlay<K, C> {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

impl<K, C> PopupOverlay<K, C> {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config, active: None }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn active_key(&self) -> Option<&K> {
        self.active.as_ref().map(|active| &active.key)
    }

    pub fn state(&self) -> PopupState {
        self.active.as_ref().map_or(PopupState::Hidden, |active| active.machine.state())
    }

    pub fn is_locked(&self) -> bool {
        self.state() == PopupState::Locked
    }

    pub fn body(&self) -> Option<&PopupBody<C>> {
        self.active.as_ref().map(|active| &active.body)
    }

    pub fn body_mut(&mut self) -> Option<&mut PopupBody<C>> {
        self.active.as_mut().map(|active| &mut active.body)
    }

    /// For content that changes shape, such as a [`crate::TipEditor`].
    pub fn relayout_handle(&self) -> Option<RelayoutHandle> {
        self.active.as_ref().map(|active| active.container.relayout_handle())
    }

    /// Close the popup regardless of lock state.
    pub fn hide(&mut self) -> Option<PopupCommand> {
        self.apply(InteractionEvent::Hide)
    }

    /// Pointer motion anywhere over the overlay.
    pub fn pointer_move(&mut self, point: Point) -> Option<PopupCommand> {
        let event = self.active.as_mut()?.monitor.on_pointer_move(point)?;
        self.apply(event)
    }

    /// Apply lock requests sent by the popup content since the last poll.
    pub fn poll_lock_requests(&mut self) -> Option<PopupCommand> {
        let active = self.active.as_ref()?;
        let requests = active.lock.drain();
        if !active.body.is_lockable() && !requests.is_empty() {
            tracing::debug!(
                count = requests.len(),
                "plain popup content asked for a lock; ignoring"
            );
            return None;
        }

        let mut command = None;
        for request in requests {
            let event = match request {
                LockRequest::Lock => InteractionEvent::Lock,
                LockRequest::Unlock => InteractionEvent::Unlock,
            };
            command = self.apply(event).or(command);
            if self.active.is_none() {
                break;
            }
        }
        command
    }

    /// Run the active popup's pending measurement pass.
    pub fn on_frame(&mut self, measure: impl FnOnce() -> Option<Size>) -> bool {
        match self.active.as_mut() {
            Some(active) => active.container.on_frame(measure),
            None => false,
        }
    }

    /// Where to draw the active popup. Also updates the grace box.
    pub fn placement(&mut self, input: &PlacementInput) -> Option<Placement> {
        let active = self.active.as_mut()?;
        let placement = active.container.placement(input);
        if let Some(size) = active.container.size() {
            active.monitor.set_bounds(placement.bounds(size));
        }
        Some(placement)
    }

    fn apply(&mut self, event: InteractionEvent) -> Option<PopupCommand> {
        let active = self.active.as_mut()?;
        let command = active.machine.handle(event);
        active.lock.publish(active.machine.is_locked());
        if active.machine.state() == PopupState::Hidden {
            self.active = None;
        }
        command
    }
}

impl<K, C> PopupOverlay<K, C>
where
    K: PartialEq + fmt::Debug,
{
    /// Pointer entered the anchor of `annotation`.
    ///
    /// Annotations without a note get no popup. A locked popup stays open
    /// when the pointer crosses another annotation; otherwise the slot is
    /// handed to the new one and `build` creates its content.
    pub fn pointer_enter(
        &mut self,
        key: K,
        annotation: &Annotation,
        build: impl FnOnce(LockControl) -> PopupBody<C>,
    ) -> Option<PopupCommand> {
        if !annotation.has_note() {
            tracing::trace!(?key, "annotation has no note; no popup");
            return None;
        }

        if let Some(active) = &self.active {
            if active.key == key {
                return self.apply(InteractionEvent::PointerEnter);
            }
            if active.machine.is_locked() {
                tracing::debug!(locked = ?active.key, entered = ?key, "keeping locked popup open");
                return None;
            }
        }

        let (control, lock) = LockControl::channel();
        let body = build(control);
        let mut popup = ActivePopup {
            key,
            body,
            machine: HoverLockMachine::new(),
            monitor: MouseMonitor::new(self.config.grace_padding_x, self.config.grace_padding_y),
            container: TipContainer::new(self.config.gap),
            lock,
        };
        let command = popup.machine.handle(InteractionEvent::PointerEnter);
        self.active = Some(popup);
        command
    }

    /// Pointer left the anchor of the annotation identified by `key`.
    pub fn pointer_leave(&mut self, key: &K) -> Option<PopupCommand> {
        if self.active_key() != Some(key) {
            return None;
        }
        self.apply(InteractionEvent::PointerLeave)
    }
}

impl<K: fmt::Debug, C> fmt::Debug for PopupOverlay<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupOverlay")
            .field("active", &self.active_key())
            .field("state", &self.state())
            .finish()
    }
}
