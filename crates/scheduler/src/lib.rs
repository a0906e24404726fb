//! Marginalia scheduling primitives
//!
//! Cooperative cancellation, cancellable delayed tasks and a single-slot frame
//! scheduler. The lifecycle controller uses them for hydration and debounced
//! saves; the overlay uses the frame scheduler for measurement passes.
//!
//! # Example
//!
//! ```
//! use marginalia_scheduler::FrameScheduler;
//!
//! let mut frames = FrameScheduler::new();
//! let first = frames.request();
//! let second = frames.request();
//!
//! // Only the latest request survives until the next frame.
//! assert_ne!(first, second);
//! assert_eq!(frames.take_due(), Some(second));
//! assert_eq!(frames.take_due(), None);
//! ```

mod cancel;
mod frame;
mod task;

pub use cancel::{CancellationToken, Cancelled};
pub use frame::{FrameRequestId, FrameScheduler};
pub use task::{Debouncer, ScheduledTask};
