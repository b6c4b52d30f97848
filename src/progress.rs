//! Progress reporting: range-composed per-job percentages and batch events.
//!
//! Two layers:
//!
//! * [`Progress`] — a cheap, cloneable reporter that maps a stage's local
//!   0–100 scale onto the caller's `[lo, hi]` output range. Nested stages
//!   call [`Progress::stage`] and never need to know the overall scale.
//!
//! * [`BatchProgressCallback`] — job-level events for a batch run, with
//!   default no-op methods so callers override only what they need.
//!
//! # Example
//!
//! ```rust
//! use localconv::Progress;
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let progress = Progress::from_fn(move |pct| sink.lock().unwrap().push(pct));
//!
//! // Engine load occupies the first half of the job.
//! let load = progress.stage(0.0, 50.0);
//! load.report(50.0);
//! progress.report(100.0);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![25, 100]);
//! ```

use std::fmt;
use std::sync::Arc;

/// Receives whole-percent progress values in `[0, 100]`.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

struct Discard;

impl ProgressSink for Discard {
    fn report(&self, _percent: u8) {}
}

/// A progress reporter bound to an output range.
#[derive(Clone)]
pub struct Progress {
    sink: Arc<dyn ProgressSink>,
    lo: f64,
    hi: f64,
}

impl Progress {
    /// Reporter covering the full 0–100 range of `sink`.
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            lo: 0.0,
            hi: 100.0,
        }
    }

    pub fn from_fn(f: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self::new(Arc::new(f))
    }

    /// Reporter that drops every value.
    pub fn noop() -> Self {
        Self::new(Arc::new(Discard))
    }

    /// Nested reporter whose local 0–100 maps onto `[lo, hi]` of this one.
    pub fn stage(&self, lo: f64, hi: f64) -> Progress {
        Progress {
            sink: Arc::clone(&self.sink),
            lo: self.map(lo),
            hi: self.map(hi),
        }
    }

    /// Report a value on this reporter's local 0–100 scale.
    pub fn report(&self, local: f64) {
        let out = self.map(local).round().clamp(0.0, 100.0);
        self.sink.report(out as u8);
    }

    /// Report a fraction in `0.0..=1.0` of this reporter's range.
    pub fn fraction(&self, f: f64) {
        self.report(f * 100.0);
    }

    /// Report completion of this reporter's range.
    pub fn done(&self) {
        self.report(100.0);
    }

    fn map(&self, local: f64) -> f64 {
        let local = if local.is_finite() {
            local.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.lo + (self.hi - self.lo) * local / 100.0
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("lo", &self.lo)
            .field("hi", &self.hi)
            .finish_non_exhaustive()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::noop()
    }
}

/// Called by [`crate::Converter::run_batch`] as it processes each job.
///
/// Jobs run one at a time, so calls never overlap. Implementations must
/// still be `Send + Sync` because the batch future may move between
/// runtime threads.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first job starts.
    ///
    /// # Arguments
    /// * `total_jobs` — number of jobs in the batch
    fn on_batch_start(&self, total_jobs: usize) {
        let _ = total_jobs;
    }

    /// Called when a job moves to `processing`.
    ///
    /// # Arguments
    /// * `index`  — 0-based position in the batch
    /// * `job_id` — the job's identifier
    fn on_job_start(&self, index: usize, job_id: &str) {
        let _ = (index, job_id);
    }

    /// Called for every progress value the job's engine reports.
    fn on_job_progress(&self, index: usize, percent: u8) {
        let _ = (index, percent);
    }

    /// Called when a job finishes successfully.
    ///
    /// # Arguments
    /// * `result_name` — output file name, e.g. `report.pdf`
    /// * `size`        — output size in bytes
    fn on_job_complete(&self, index: usize, result_name: &str, size: usize) {
        let _ = (index, result_name, size);
    }

    /// Called when a job fails. Sibling jobs keep running.
    fn on_job_error(&self, index: usize, error: &str) {
        let _ = (index, error);
    }

    /// Called once after every job has been attempted.
    fn on_batch_complete(&self, total_jobs: usize, success_count: usize) {
        let _ = (total_jobs, success_count);
    }
}

/// A no-op callback for callers that don't need batch events.
pub struct NoopBatchCallback;

impl BatchProgressCallback for NoopBatchCallback {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn recorder() -> (Progress, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (
            Progress::from_fn(move |p| sink.lock().unwrap().push(p)),
            seen,
        )
    }

    #[test]
    fn full_range_reports_rounded_values() {
        let (p, seen) = recorder();
        p.report(10.0);
        p.report(40.4);
        p.report(70.5);
        p.done();
        assert_eq!(*seen.lock().unwrap(), vec![10, 40, 71, 100]);
    }

    #[test]
    fn nested_stages_compose() {
        let (p, seen) = recorder();
        // 30..60 of a 0..50 stage == 15..30 overall
        let inner = p.stage(0.0, 50.0).stage(30.0, 60.0);
        inner.report(0.0);
        inner.report(50.0);
        inner.done();
        assert_eq!(*seen.lock().unwrap(), vec![15, 23, 30]);
    }

    #[test]
    fn values_are_clamped() {
        let (p, seen) = recorder();
        let s = p.stage(20.0, 95.0);
        s.report(-5.0);
        s.report(250.0);
        s.report(f64::NAN);
        assert_eq!(*seen.lock().unwrap(), vec![20, 95, 20]);
    }

    #[test]
    fn fraction_maps_onto_range() {
        let (p, seen) = recorder();
        p.stage(20.0, 95.0).fraction(0.5);
        assert_eq!(*seen.lock().unwrap(), vec![58]);
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopBatchCallback;
        cb.on_batch_start(2);
        cb.on_job_start(0, "abc");
        cb.on_job_progress(0, 50);
        cb.on_job_complete(0, "a.pdf", 10);
        cb.on_job_error(1, "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        struct Counting(AtomicUsize);
        impl BatchProgressCallback for Counting {
            fn on_job_error(&self, _index: usize, _error: &str) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let cb: Arc<dyn BatchProgressCallback> = Arc::new(Counting(AtomicUsize::new(0)));
        cb.on_job_error(0, "x");
        cb.on_job_error(3, "y");
        cb.on_job_complete(1, "ok.txt", 3);
    }
}
