/// Display targets
///
/// An `ImageView` is the model behind one on-screen image widget. A widget
/// framework renders whatever `displayed()` returns; this crate only decides
/// what that is. Background work never owns a view: it holds a `ViewHandle`
/// and asks it whether the view is still live before touching it.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::bitmap::Bitmap;
use crate::pipeline::TaskHandle;

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a view, stable for its whole life
pub type ViewId = u64;

/// Something that shows one decoded image at a time
pub struct ImageView {
    id: ViewId,
    live: AtomicBool,
    displayed: Mutex<Option<Bitmap>>,
    /// The one decode this view is waiting on, if any
    current_task: Mutex<Option<TaskHandle>>,
    /// Bumped on every request so stale results can be recognised
    generation: AtomicU64,
    display_writes: AtomicU64,
}

impl ImageView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed),
            live: AtomicBool::new(true),
            displayed: Mutex::new(None),
            current_task: Mutex::new(None),
            generation: AtomicU64::new(0),
            display_writes: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Non-owning handle for background work
    pub fn handle(self: &Arc<Self>) -> ViewHandle {
        ViewHandle {
            id: self.id,
            view: Arc::downgrade(self),
        }
    }

    /// False once the view has been destroyed
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Detach the view from the screen. Outstanding work keeps running but
    /// will no longer write to it.
    pub fn destroy(&self) {
        self.live.store(false, Ordering::Release);
        if let Some(task) = self.current_task.lock().take() {
            task.cancel();
        }
        self.displayed.lock().take();
    }

    pub fn displayed(&self) -> Option<Bitmap> {
        self.displayed.lock().clone()
    }

    pub fn set_displayed_image(&self, image: Option<Bitmap>) {
        if !self.is_live() {
            trace!(view = self.id, "Ignoring display write to destroyed view");
            return;
        }
        *self.displayed.lock() = image;
        self.display_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear_display(&self) {
        self.set_displayed_image(None);
    }

    /// Clear the display and recycle the image it showed. Does nothing if
    /// no image is shown.
    pub fn release_current_image(&self) {
        let current = self.displayed.lock().take();
        if let Some(bitmap) = current {
            self.display_writes.fetch_add(1, Ordering::Relaxed);
            bitmap.recycle();
        }
    }

    /// Number of display mutations so far
    pub fn display_writes(&self) -> u64 {
        self.display_writes.load(Ordering::Relaxed)
    }

    pub fn current_task(&self) -> Option<TaskHandle> {
        self.current_task.lock().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new request: cancel the tracked task and advance the
    /// generation. Returns the new generation.
    pub(crate) fn begin_request(&self) -> u64 {
        if let Some(task) = self.current_task.lock().take() {
            task.cancel();
        }
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn track_task(&self, task: TaskHandle) {
        *self.current_task.lock() = Some(task);
    }

    /// Forget `task` if it is still the tracked one
    pub(crate) fn finish_task(&self, task: &TaskHandle) {
        let mut current = self.current_task.lock();
        if current.as_ref().is_some_and(|tracked| tracked.same_task(task)) {
            current.take();
        }
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }
}

impl fmt::Debug for ImageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageView")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .field("generation", &self.generation())
            .field("displayed", &self.displayed())
            .finish()
    }
}

/// Identity plus a liveness query; never keeps the view alive
#[derive(Debug, Clone)]
pub struct ViewHandle {
    id: ViewId,
    view: Weak<ImageView>,
}

impl ViewHandle {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.view.upgrade().is_some_and(|view| view.is_live())
    }

    /// The view, if it still exists and has not been destroyed
    pub fn get(&self) -> Option<Arc<ImageView>> {
        self.view.upgrade().filter(|view| view.is_live())
    }
}
