//! Executor pools
//!
//! Two pools are built once per session and handed to the pipelines:
//! a bounded multi-worker pool for decodes and a single-worker pool for
//! filter jobs. Work is CPU bound and blocking, so both run it through
//! `spawn_blocking`; the blocking-thread cap is what bounds concurrency.
//! Jobs queued on the filter pool run strictly one after another in
//! submission order.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PhotoloadError, Result};

pub struct ExecutorPools {
    decode: Runtime,
    filter: Runtime,
    decode_workers: usize,
    decode_jobs: AtomicU64,
    filter_jobs: AtomicU64,
    /// Jobs queued or running on either pool
    in_flight: Arc<AtomicUsize>,
}

impl ExecutorPools {
    /// Build both pools with `decode_workers` concurrent decodes
    pub fn new(decode_workers: usize) -> Result<Self> {
        if decode_workers == 0 {
            return Err(PhotoloadError::InvalidConfig(
                "decode pool needs at least one worker".to_string(),
            ));
        }

        let decode = build_pool("photoload-decode", decode_workers)?;
        let filter = build_pool("photoload-filter", 1)?;

        info!(decode_workers, "Started executor pools");

        Ok(Self {
            decode,
            filter,
            decode_workers,
            decode_jobs: AtomicU64::new(0),
            filter_jobs: AtomicU64::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.decode_workers)
    }

    pub fn decode_workers(&self) -> usize {
        self.decode_workers
    }

    /// Run `job` on the decode pool
    pub fn spawn_decode<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.decode_jobs.fetch_add(1, Ordering::Relaxed);
        // Detached: results come back through the UI loop
        drop(self.decode.spawn_blocking(self.tracked(job)));
    }

    /// Queue `job` behind every previously queued filter job
    pub fn spawn_filter<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.filter_jobs.fetch_add(1, Ordering::Relaxed);
        drop(self.filter.spawn_blocking(self.tracked(job)));
    }

    fn tracked<F>(&self, job: F) -> impl FnOnce() + Send + 'static
    where
        F: FnOnce() + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));
        move || {
            let _guard = guard;
            job();
        }
    }

    /// Jobs submitted to either pool that have not returned yet. Anything a
    /// finished job posted to the UI loop is already queued there.
    pub fn jobs_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Decode jobs submitted so far
    pub fn decode_jobs_submitted(&self) -> u64 {
        self.decode_jobs.load(Ordering::Relaxed)
    }

    /// Filter jobs submitted so far
    pub fn filter_jobs_submitted(&self) -> u64 {
        self.filter_jobs.load(Ordering::Relaxed)
    }

    /// Stop both pools, giving running jobs up to `timeout` to finish
    pub fn shutdown(self, timeout: Duration) {
        info!(
            decode_jobs = self.decode_jobs_submitted(),
            filter_jobs = self.filter_jobs_submitted(),
            "Shutting down executor pools"
        );
        self.decode.shutdown_timeout(timeout);
        self.filter.shutdown_timeout(timeout);
    }
}

/// Counts a job out of the in-flight total when dropped, including when
/// the job panics or is discarded unrun at shutdown
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn build_pool(name: &str, blocking_threads: usize) -> Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(blocking_threads)
        .thread_name(name)
        .build()
        .map_err(PhotoloadError::Runtime)
}

impl std::fmt::Debug for ExecutorPools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorPools")
            .field("decode_workers", &self.decode_workers)
            .field("decode_jobs", &self.decode_jobs_submitted())
            .field("filter_jobs", &self.filter_jobs_submitted())
            .field("in_flight", &self.jobs_in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Instant;

    fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(ExecutorPools::new(0), Err(PhotoloadError::InvalidConfig(_))));
    }

    #[test]
    fn test_filter_pool_runs_in_order_one_at_a_time() {
        let pools = ExecutorPools::new(2).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let order = Arc::clone(&order);
            pools.spawn_filter(move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(10));
                order.lock().push(i);
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }

        assert!(wait_for(Duration::from_secs(5), || order.lock().len() == 5));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(pools.filter_jobs_submitted(), 5);
        assert!(wait_for(Duration::from_secs(5), || pools.jobs_in_flight() == 0));
    }

    #[test]
    fn test_panicking_job_leaves_in_flight() {
        let pools = ExecutorPools::new(1).unwrap();

        pools.spawn_decode(|| panic!("decoder blew up"));
        pools.spawn_filter(|| panic!("filter blew up"));

        assert!(wait_for(Duration::from_secs(5), || pools.jobs_in_flight() == 0));

        // Both pools still take work afterwards
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let done = Arc::clone(&done);
            pools.spawn_filter(move || {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(wait_for(Duration::from_secs(5), || done.load(Ordering::SeqCst) == 2));
    }

    #[test]
    fn test_decode_pool_runs_concurrently() {
        let pools = ExecutorPools::new(3).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            pools.spawn_decode(move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                active.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(wait_for(Duration::from_secs(5), || done.load(Ordering::SeqCst) == 6));
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak > 1, "decodes never overlapped");
        assert!(peak <= 3, "pool exceeded its bound: {}", peak);
        assert!(wait_for(Duration::from_secs(5), || pools.jobs_in_flight() == 0));
        pools.shutdown(Duration::from_secs(1));
    }
}
