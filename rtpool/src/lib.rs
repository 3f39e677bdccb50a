//! A pool of render targets. Callers ask for a texture matching a def and get back a reference
//! counted handle. Released render targets stay in the pool to be handed out again and are
//! released once they have been unused for a while or the pool grows over its budget.

mod cleanup;
pub use cleanup::ResourceDropSink;

mod config;
pub use config::*;

mod events;
pub use events::*;

mod pooled_render_target;
pub use pooled_render_target::PooledRenderTarget;
pub use pooled_render_target::RenderTargetId;

mod pool;
pub use pool::FindResult;
pub use pool::RenderTargetPool;
pub use pool::WRITABLE_RESOURCE_STATE;

mod snapshot;
pub use snapshot::RenderTargetSnapshot;
pub use snapshot::SnapshotArena;

mod stats;
pub use stats::RenderTargetPoolStats;

mod transition;
pub use transition::TransitionBarrier;

pub use rtpool_api;

#[cfg(test)]
mod pool_tests;
