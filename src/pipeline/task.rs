use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::CacheKey;

/// Handle to an in-flight decode.
///
/// Cancellation only sets a flag. The decode itself always runs to
/// completion; the flag is consulted once, right before the result is
/// written to the view.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    inner: Arc<TaskState>,
}

#[derive(Debug)]
struct TaskState {
    key: CacheKey,
    generation: u64,
    cancelled: AtomicBool,
}

impl TaskHandle {
    pub(crate) fn new(key: CacheKey, generation: u64) -> Self {
        Self {
            inner: Arc::new(TaskState {
                key,
                generation,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.inner.key
    }

    /// View generation the task was issued under
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Whether both handles track the same task
    pub fn same_task(&self, other: &TaskHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
