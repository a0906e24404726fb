//! Cancellation tokens for cooperative cancellation
//!
//! A request captures a token when it starts and checks it after every
//! suspension point. Cancelling never interrupts running code; it only makes
//! the next check fail.

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token shared between a request and whoever may supersede it
///
/// # Example
///
/// ```
/// use marginalia_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let request_token = token.clone();
///
/// token.cancel();
/// assert!(request_token.is_cancelled());
/// assert!(request_token.checkpoint().is_err());
/// ```
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

/// Returned by [`CancellationToken::checkpoint`] once the token is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("request was superseded")
    }
}

impl std::error::Error for Cancelled {}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancelled, for use with `?` after an await.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Cancel this token and put a fresh one in its place.
    ///
    /// Requests holding clones of the old token observe the cancellation; the
    /// returned token belongs to the request that replaces them.
    pub fn renew(&mut self) -> CancellationToken {
        self.cancel();
        *self = CancellationToken::new();
        self.clone()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken").field("cancelled", &self.is_cancelled()).finish()
    }
}
