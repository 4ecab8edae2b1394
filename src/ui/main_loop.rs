//! Owning-thread event loop
//!
//! Display targets are only mutated on the thread that created the
//! `UiLoop`. Background jobs get back to that thread by posting closures
//! through a `UiHandle`; the owner runs them when it pumps the loop.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::marker::PhantomData;
use std::rc::Rc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Upper bound on a single blocking wait while pumping
const PUMP_SLICE: Duration = Duration::from_millis(10);

/// The owning thread's queue of posted work. Not `Send`: it stays on the
/// thread that created it.
pub struct UiLoop {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    owner: ThreadId,
    _not_send: PhantomData<Rc<()>>,
}

/// Cloneable poster used by background work
#[derive(Clone)]
pub struct UiHandle {
    sender: Sender<Job>,
    owner: ThreadId,
}

impl UiLoop {
    /// Create a loop owned by the calling thread
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            owner: thread::current().id(),
            _not_send: PhantomData,
        }
    }

    pub fn handle(&self) -> UiHandle {
        UiHandle {
            sender: self.sender.clone(),
            owner: self.owner,
        }
    }

    /// Run everything already posted without blocking. Returns the number
    /// of closures run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Pump posted work until `done` returns true or `timeout` elapses.
    /// Returns whether `done` was satisfied.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            match self.receiver.recv_timeout(remaining.min(PUMP_SLICE)) {
                Ok(job) => job(),
                Err(RecvTimeoutError::Timeout) => {}
                // We hold a sender ourselves
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }

    /// Pump posted work for a fixed duration
    pub fn run_for(&self, duration: Duration) {
        self.run_until(duration, || false);
    }
}

impl Default for UiLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl UiHandle {
    /// Queue `job` to run on the owning thread. Returns false if the loop
    /// is gone, in which case the job is dropped unrun.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        let posted = self.sender.send(Box::new(job)).is_ok();
        if !posted {
            trace!("UI loop dropped; discarding posted work");
        }
        posted
    }

    /// Whether the caller is running on the owning thread
    pub fn is_owning_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

impl std::fmt::Debug for UiHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiHandle").field("owner", &self.owner).finish()
    }
}
