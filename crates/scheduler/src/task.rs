//! Cancellable delayed tasks
//!
//! A [`ScheduledTask`] waits for its delay and then runs its work to
//! completion. Cancelling only affects the waiting phase, so a write that has
//! already started is never torn. [`Debouncer`] keeps at most one such task
//! pending and restarts the delay on every schedule.

use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct ScheduledTask {
    cancel_tx: Option<oneshot::Sender<()>>,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `work` on the current tokio runtime, to start after `delay`.
    ///
    /// Dropping the returned task cancels it if it has not fired yet.
    pub fn spawn_after<F>(delay: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = Arc::clone(&fired);

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => return,
                () = tokio::time::sleep(delay) => {}
            }
            fired_flag.store(true, Ordering::Release);
            work.await;
        });

        Self { cancel_tx: Some(cancel_tx), fired, handle }
    }

    /// Whether the delay elapsed and the work started.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task if it is still waiting.
    ///
    /// Returns `true` when the work was prevented from running.
    pub fn cancel(&mut self) -> bool {
        let Some(cancel_tx) = self.cancel_tx.take() else {
            return false;
        };
        if self.has_fired() {
            return false;
        }
        let _ = cancel_tx.send(());
        true
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("fired", &self.has_fired())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Single-slot debounce: scheduling replaces whatever was pending.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<ScheduledTask>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pending task, if any, and schedule `work` after `delay`.
    pub fn schedule<F>(&mut self, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel() {
            tracing::trace!(?delay, "debounce restarted");
        }
        self.pending = Some(ScheduledTask::spawn_after(delay, work));
    }

    /// Cancel the pending task. Returns `true` if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some_and(|mut task| task.cancel())
    }

    /// Whether a task is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.has_fired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    type Work = std::pin::Pin<Box<dyn Future<Output = ()> + Send>>;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Work) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        let make = move || {
            let handle = Arc::clone(&handle);
            Box::pin(async move {
                handle.fetch_add(1, Ordering::SeqCst);
            }) as Work
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn task_runs_after_delay() {
        let (count, work) = counter();
        let task = ScheduledTask::spawn_after(Duration::from_millis(150), work());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!task.has_fired());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs() {
        let (count, work) = counter();
        let mut task = ScheduledTask::spawn_after(Duration::from_millis(150), work());

        assert!(task.cancel());
        assert!(!task.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_task_cancels_it() {
        let (count, work) = counter();
        drop(ScheduledTask::spawn_after(Duration::from_millis(10), work()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_reports_false() {
        let (count, work) = counter();
        let mut task = ScheduledTask::spawn_after(Duration::from_millis(10), work());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_coalesces_rapid_schedules() {
        let (count, work) = counter();
        let mut debouncer = Debouncer::new();

        for _ in 0..5 {
            debouncer.schedule(Duration::from_millis(150), work());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(debouncer.is_pending());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_cancel_clears_pending() {
        let (count, work) = counter();
        let mut debouncer = Debouncer::new();
        debouncer.schedule(Duration::from_millis(150), work());

        assert!(debouncer.cancel());
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
