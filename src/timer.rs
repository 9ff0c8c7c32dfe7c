//! One-shot timers that fire back into the foreground event loop.
//!
//! The scheduler only ever sees the [`Timer`] trait. A firing is delivered as
//! a [`TimerId`] on a channel, never as a callback, so it is handled on the
//! same timeline as user input. Cancelling is best effort: a timer that has
//! already posted its id cannot be recalled, which is why the scheduler checks
//! every id it receives against the one it is waiting for.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::trace;

/// Identifies one scheduled firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Schedules and cancels one-shot firings.
pub trait Timer {
    /// Arrange for `id` to be delivered after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Cancel a firing. Unknown or already-fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// Timer backed by `tokio::time::sleep` tasks posting to a channel.
///
/// Must be used from within a Tokio runtime.
pub struct TokioTimer {
    tx: UnboundedSender<TimerId>,
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new(tx: UnboundedSender<TimerId>) -> Self {
        Self {
            tx,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }

    /// Timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }
}

impl Timer for TokioTimer {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.tasks.retain(|_, handle| !handle.is_finished());

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone once the session ends.
            let _ = tx.send(id);
        });
        trace!("Timer {:?} scheduled in {:?}", id, delay);
        self.tasks.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.tasks.remove(&id) {
            handle.abort();
            trace!("Timer {:?} cancelled", id);
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::mpsc;

    /// Deterministic timer for scheduler tests: firings happen only when the
    /// test says so.
    #[derive(Debug, Default)]
    pub(crate) struct ManualTimer {
        next_id: u64,
        pub(crate) pending: Vec<(TimerId, Duration)>,
        pub(crate) cancelled: Vec<TimerId>,
    }

    impl ManualTimer {
        /// Remove and return the earliest pending firing.
        pub(crate) fn fire_next(&mut self) -> Option<(TimerId, Duration)> {
            if self.pending.is_empty() {
                None
            } else {
                Some(self.pending.remove(0))
            }
        }
    }

    impl Timer for ManualTimer {
        fn schedule(&mut self, delay: Duration) -> TimerId {
            self.next_id += 1;
            let id = TimerId(self.next_id);
            self.pending.push((id, delay));
            id
        }

        fn cancel(&mut self, id: TimerId) {
            let before = self.pending.len();
            self.pending.retain(|(pending, _)| *pending != id);
            if self.pending.len() != before {
                self.cancelled.push(id);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TokioTimer::new(tx);
        let id = timer.schedule(Duration::from_millis(100));

        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(id));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TokioTimer::new(tx);
        let first = timer.schedule(Duration::from_millis(100));
        timer.cancel(first);
        timer.cancel(first);
        let second = timer.schedule(Duration::from_millis(200));

        assert_eq!(rx.recv().await, Some(second));
        assert!(rx.try_recv().is_err());
    }
}
