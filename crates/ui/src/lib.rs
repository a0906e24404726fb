//! Marginalia UI Library
//!
//! Interaction overlay for annotations: the hover/lock popup state machine,
//! grace-margin pointer tracking, measured adaptive placement and the popup
//! content contract. Rendering stays with the host; everything here works on
//! plain geometry and events.

pub mod config;
pub mod geometry;
pub mod interaction;
pub mod mouse_monitor;
pub mod overlay;
pub mod placement;
pub mod popup;
pub mod tip;
pub mod tip_container;

pub use config::OverlayConfig;
pub use geometry::{Point, Rect, Size};
pub use interaction::{HoverLockMachine, InteractionEvent, PopupCommand, PopupState};
pub use mouse_monitor::MouseMonitor;
pub use overlay::PopupOverlay;
pub use placement::{place, Placement, PlacementInput, Side, GAP};
pub use popup::{LockControl, LockRequest, NoteEditor, NoteMode, PopupBody, EMPTY_NOTE_TEXT};
pub use tip::{TipEditor, DEFAULT_COLOR, PALETTE};
pub use tip_container::{RelayoutHandle, TipContainer};
