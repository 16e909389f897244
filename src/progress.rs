//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] observes sampling runs and probes as they advance;
//! [`CancellationToken`] aborts them. A cancelled operation settles with
//! [`ThumbnailError::Cancelled`](crate::ThumbnailError::Cancelled) and its
//! state machine is torn down, so no further media event can act on it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidthumb::{CancellationToken, ProgressCallback, ProgressInfo, Session, SessionOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}%", info.operation);
//!         }
//!     }
//! }
//!
//! # async fn example() -> Result<(), vidthumb::ThumbnailError> {
//! let token = CancellationToken::new();
//! let mut session = Session::open("input.mp4")?.with_session_options(
//!     SessionOptions::new()
//!         .with_progress(Arc::new(PrintProgress))
//!         .with_cancellation(token.clone()),
//! );
//! let thumbnails = session.thumbnails(None).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// The kind of operation a progress report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Waiting for and reading decode metadata.
    MetadataProbe,
    /// Sampling thumbnails.
    Sampling,
}

/// A snapshot of operation progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// Items completed so far (thumbnails appended, or 1 for a finished probe).
    pub current: u64,
    /// Items expected in total, when the duration is known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
    /// Timestamp label of the item just completed, in seconds.
    pub timestamp: Option<f64>,
}

/// Receives progress updates.
///
/// Callbacks observe but cannot halt the operation; use
/// [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called as the operation advances.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards every notification. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

#[derive(Debug, Default)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation token that can also be awaited.
///
/// Clones share state. [`cancel`](CancellationToken::cancel) may be called
/// from any thread; a pending sampling run or probe observes it before it
/// handles its next media event.
///
/// ```
/// use vidthumb::CancellationToken;
///
/// let token = CancellationToken::new();
/// let clone = token.clone();
/// clone.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<CancellationState>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
        self.state.notify.notify_waiters();
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking so a concurrent cancel is not missed.
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Tracks timing for one operation and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record one completed item; report when the batch threshold is hit.
    pub(crate) fn advance(&mut self, timestamp: Option<f64>) {
        self.current += 1;
        self.since_last_report += 1;

        if self.since_last_report >= self.batch_size {
            self.report(timestamp);
            self.since_last_report = 0;
        }
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&self, timestamp: Option<f64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current.min(total) as f32 / total as f32) * 100.0);

        let estimated_remaining = match self.total {
            Some(total) if self.current > 0 => {
                let remaining = total.saturating_sub(self.current);
                Some(elapsed.div_f64(self.current as f64).mul_f64(remaining as f64))
            }
            _ => None,
        };

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder(Mutex<Vec<ProgressInfo>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn tracker_reports_every_batch() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut tracker =
            ProgressTracker::new(recorder.clone(), OperationType::Sampling, Some(4), 2);
        for index in 0..4 {
            tracker.advance(Some(index as f64));
        }

        let reports = recorder.0.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].current, 4);
        assert_eq!(reports[1].percentage, Some(100.0));
        assert_eq!(reports[1].timestamp, Some(3.0));
    }

    #[test]
    fn tracker_without_total_has_no_percentage() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut tracker = ProgressTracker::new(recorder.clone(), OperationType::Sampling, None, 1);
        tracker.advance(None);
        tracker.finish();

        let reports = recorder.0.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|info| info.percentage.is_none()));
        assert!(reports.iter().all(|info| info.estimated_remaining.is_none()));
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancelled().await;
    }
}
