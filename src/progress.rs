//! Progress-callback trait for batch conversion events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as [`crate::jobs::JobQueue`] or [`crate::stream::convert_stream`]
//! work through a batch.
//!
//! # Example
//!
//! ```rust
//! use edgequake_convert::{JobProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl JobProgressCallback for CountingCallback {
//!     fn on_job_complete(&self, job_id: u64, file_name: &str, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("job {job_id} ({file_name}) done: {output_len} bytes");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn JobProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the job runner as it processes each job.
///
/// Jobs run concurrently, so `on_job_start`, `on_job_complete` and
/// `on_job_error` may be called from several threads at once. All methods
/// default to no-ops.
pub trait JobProgressCallback: Send + Sync {
    /// Called once before any job starts.
    fn on_batch_start(&self, total_jobs: usize) {
        let _ = total_jobs;
    }

    /// Called when a job moves to `converting`.
    fn on_job_start(&self, job_id: u64, file_name: &str) {
        let _ = (job_id, file_name);
    }

    /// Called when a job reaches `done`.
    ///
    /// # Arguments
    /// * `output_len` — byte length of the converted output
    fn on_job_complete(&self, job_id: u64, file_name: &str, output_len: usize) {
        let _ = (job_id, file_name, output_len);
    }

    /// Called when a job reaches `error`.
    fn on_job_error(&self, job_id: u64, file_name: &str, error: &str) {
        let _ = (job_id, file_name, error);
    }

    /// Called once after every job has reached a terminal state.
    fn on_batch_complete(&self, total_jobs: usize, success_count: usize) {
        let _ = (total_jobs, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl JobProgressCallback for TrackingCallback {
        fn on_job_start(&self, _job_id: u64, _file_name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_complete(&self, _job_id: u64, _file_name: &str, _output_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_error(&self, _job_id: u64, _file_name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total_jobs: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_job_start(1, "a.png");
        cb.on_job_complete(1, "a.png", 10);
        cb.on_job_error(2, "b.zip", "unsupported");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_job_start(1, "a.png");
        tracker.on_job_complete(1, "a.png", 100);
        tracker.on_job_start(2, "b.tif");
        tracker.on_job_error(2, "b.tif", "no IFD");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 1);
    }
}
