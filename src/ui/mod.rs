/// Display side of the pipeline
///
/// - `view` - display targets and the weak handles background work holds
/// - `main_loop` - the owning thread's queue of posted work

pub mod main_loop;
pub mod view;

pub use main_loop::{UiHandle, UiLoop};
pub use view::{ImageView, ViewHandle, ViewId};
