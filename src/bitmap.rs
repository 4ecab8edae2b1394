/// Shared decoded images
///
/// A `Bitmap` is a cheaply clonable handle to decoded pixels. Any holder can
/// recycle it, which releases the pixel buffer for every other holder too;
/// after that the bitmap reports itself invalid and yields no pixels.

use image::DynamicImage;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded image that can be released by any of its holders
#[derive(Clone)]
pub struct Bitmap {
    inner: Arc<BitmapInner>,
}

struct BitmapInner {
    id: u64,
    width: u32,
    height: u32,
    byte_size: usize,
    pixels: RwLock<Option<Arc<DynamicImage>>>,
}

impl Bitmap {
    /// Wrap freshly decoded pixels
    pub fn new(image: DynamicImage) -> Self {
        let byte_size = image.as_bytes().len();
        Self {
            inner: Arc::new(BitmapInner {
                id: NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed),
                width: image.width(),
                height: image.height(),
                byte_size,
                pixels: RwLock::new(Some(Arc::new(image))),
            }),
        }
    }

    /// Process-unique identity, stable across clones
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Size of the pixel buffer at decode time, used for capacity accounting
    pub fn byte_size(&self) -> usize {
        self.inner.byte_size
    }

    /// False once the pixel buffer has been recycled
    pub fn is_valid(&self) -> bool {
        self.inner.pixels.read().is_some()
    }

    /// Snapshot of the pixels, or `None` if the bitmap was recycled.
    ///
    /// The snapshot keeps the pixels alive even if the bitmap is recycled
    /// while a reader still holds it.
    pub fn image(&self) -> Option<Arc<DynamicImage>> {
        self.inner.pixels.read().clone()
    }

    /// Release the pixel buffer. Idempotent.
    pub fn recycle(&self) {
        self.inner.pixels.write().take();
    }

    /// Whether both handles refer to the same decoded image
    pub fn same_as(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("id", &self.inner.id)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("valid", &self.is_valid())
            .finish()
    }
}
