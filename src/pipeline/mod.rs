/// Load, cache and filter orchestration
///
/// This module handles:
/// - Routing display requests (dispatcher.rs)
/// - Cache hits and background decodes, one per view (fetch.rs)
/// - Serialized filter jobs (filter.rs)
/// - The decode and filter executor pools (pools.rs)
/// - Flag-only cancellation handles (task.rs)

mod dispatcher;
mod fetch;
mod filter;
mod pools;
mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{Dispatch, Dispatcher, ImageRequest};
pub use fetch::FetchPipeline;
pub use filter::FilterPipeline;
pub use pools::ExecutorPools;
pub use task::TaskHandle;
