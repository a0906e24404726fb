//! Hover/lock state machine for an annotation popup
//!
//! Hovering shows a transient preview that closes once the pointer moves away
//! from both the anchor and the popup. Locking pins the popup open until it is
//! unlocked or hidden explicitly, so content such as a note editor can keep it
//! on screen while the pointer wanders.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PopupState {
    #[default]
    Hidden,
    Hovering,
    Locked,
}

impl PopupState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, PopupState::Hidden)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    /// Pointer entered the anchor.
    PointerEnter,
    /// Pointer left the anchor.
    PointerLeave,
    /// Pointer exited the popup's grace box.
    MovedAway,
    /// Pointer came back inside the popup's grace box.
    PointerReturn,
    Lock,
    Unlock,
    /// Host-initiated close, e.g. after the annotation was deleted.
    Hide,
}

/// What the host should do with the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupCommand {
    Show,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    to: PopupState,
    over_anchor: bool,
    near_popup: bool,
    command: Option<PopupCommand>,
}

#[derive(Debug, Default)]
pub struct HoverLockMachine {
    state: PopupState,
    over_anchor: bool,
    near_popup: bool,
}

impl HoverLockMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == PopupState::Locked
    }

    /// Whether the pointer is over the anchor or near the popup.
    pub fn pointer_present(&self) -> bool {
        self.over_anchor || self.near_popup
    }

    pub fn can_handle(&self, event: InteractionEvent) -> bool {
        self.next(event).is_some()
    }

    fn next(&self, event: InteractionEvent) -> Option<Transition> {
        use InteractionEvent::*;
        use PopupState::*;

        let stay = |over_anchor, near_popup| Transition {
            to: self.state,
            over_anchor,
            near_popup,
            command: None,
        };
        let hide = Transition {
            to: Hidden,
            over_anchor: false,
            near_popup: false,
            command: Some(PopupCommand::Hide),
        };

        let transition = match (self.state, event) {
            (Hidden, PointerEnter) => Transition {
                to: Hovering,
                over_anchor: true,
                near_popup: true,
                command: Some(PopupCommand::Show),
            },
            (Hidden, _) => return None,

            (_, PointerEnter) => stay(true, self.near_popup),
            (_, PointerLeave) => stay(false, self.near_popup),
            (_, PointerReturn) => stay(self.over_anchor, true),

            (Hovering, MovedAway) if !self.over_anchor => hide,
            (_, MovedAway) => stay(self.over_anchor, false),

            (Hovering, Lock) => {
                Transition { to: Locked, ..stay(self.over_anchor, self.near_popup) }
            }
            (Locked, Unlock) if self.pointer_present() => {
                Transition { to: Hovering, ..stay(self.over_anchor, self.near_popup) }
            }
            (Locked, Unlock) => hide,

            (_, Hide) => hide,
            (Hovering, Unlock) | (Locked, Lock) => return None,
        };

        let unchanged = transition.to == self.state
            && transition.over_anchor == self.over_anchor
            && transition.near_popup == self.near_popup
            && transition.command.is_none();
        (!unchanged).then_some(transition)
    }

    /// Apply `event` and return the command the host should carry out, if any.
    pub fn handle(&mut self, event: InteractionEvent) -> Option<PopupCommand> {
        let Some(transition) = self.next(event) else {
            tracing::trace!(state = ?self.state, ?event, "popup event ignored");
            return None;
        };

        if transition.to != self.state {
            tracing::debug!(
                from = ?self.state,
                to = ?transition.to,
                ?event,
                "popup state transition"
            );
        }
        self.state = transition.to;
        self.over_anchor = transition.over_anchor;
        self.near_popup = transition.near_popup;
        transition.command
    }
}

impl fmt::Display for HoverLockMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PopupState::{:?}", self.state)
    }
}
