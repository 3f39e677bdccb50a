use crate::{PooledRenderTarget, RenderTargetId};
use rtpool_api::RtTextureDef;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct RenderTargetSnapshotInner<TextureT> {
    texture: TextureT,
    texture_def: RtTextureDef,
    debug_name: String,
    resource_id: RenderTargetId,
    generation: u64,
    arena_generation: Arc<AtomicU64>,
}

/// A read-only copy of a render target's handle for use from another thread.
///
/// Snapshots do not own the texture and are invisible to the pool's bookkeeping: they are never
/// matched, aged, evicted or counted. They are valid until the next `destroy_all_snapshots`,
/// after which `texture()` panics.
pub struct RenderTargetSnapshot<TextureT> {
    inner: Arc<RenderTargetSnapshotInner<TextureT>>,
}

impl<TextureT> Clone for RenderTargetSnapshot<TextureT> {
    fn clone(&self) -> Self {
        RenderTargetSnapshot {
            inner: self.inner.clone(),
        }
    }
}

impl<TextureT> RenderTargetSnapshot<TextureT> {
    pub fn texture(&self) -> &TextureT {
        assert!(
            self.is_alive(),
            "Snapshot of render target {} '{}' used after its snapshots were destroyed",
            self.inner.resource_id,
            self.inner.debug_name
        );
        &self.inner.texture
    }

    pub fn texture_def(&self) -> &RtTextureDef {
        &self.inner.texture_def
    }

    pub fn debug_name(&self) -> &str {
        &self.inner.debug_name
    }

    pub fn resource_id(&self) -> RenderTargetId {
        self.inner.resource_id
    }

    /// False once the arena that produced this snapshot destroyed its snapshots
    pub fn is_alive(&self) -> bool {
        self.inner.arena_generation.load(Ordering::Acquire) == self.inner.generation
    }

    /// Always 1, snapshots do not take part in reference counting
    pub fn ref_count(&self) -> usize {
        1
    }

    pub fn is_snapshot(&self) -> bool {
        true
    }
}

impl<TextureT: std::fmt::Debug> std::fmt::Debug for RenderTargetSnapshot<TextureT> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RenderTargetSnapshot")
            .field("resource_id", &self.inner.resource_id)
            .field("debug_name", &self.inner.debug_name)
            .field("texture", &self.inner.texture)
            .field("is_alive", &self.is_alive())
            .finish()
    }
}

/// Owns every snapshot taken since the last `destroy_all_snapshots`
pub struct SnapshotArena<TextureT> {
    snapshots: Vec<RenderTargetSnapshot<TextureT>>,
    generation: Arc<AtomicU64>,
}

impl<TextureT> Default for SnapshotArena<TextureT> {
    fn default() -> Self {
        SnapshotArena {
            snapshots: Default::default(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<TextureT: Clone> SnapshotArena<TextureT> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn make_snapshot(
        &mut self,
        render_target: &PooledRenderTarget<TextureT>,
    ) -> RenderTargetSnapshot<TextureT> {
        let snapshot = RenderTargetSnapshot {
            inner: Arc::new(RenderTargetSnapshotInner {
                texture: render_target.texture().clone(),
                texture_def: render_target.texture_def().clone(),
                debug_name: render_target.debug_name(),
                resource_id: render_target.resource_id(),
                generation: self.generation.load(Ordering::Relaxed),
                arena_generation: self.generation.clone(),
            }),
        };

        self.snapshots.push(snapshot.clone());
        snapshot
    }

    /// Invalidates every outstanding snapshot. Readers on other threads must be done with them,
    /// this is not checked beyond a warning. Returns how many snapshots were destroyed.
    pub fn destroy_all_snapshots(&mut self) -> usize {
        let still_referenced = self
            .snapshots
            .iter()
            .filter(|x| Arc::strong_count(&x.inner) > 1)
            .count();
        if still_referenced > 0 {
            log::warn!(
                "Destroying snapshots while {} of them are still referenced by readers",
                still_referenced
            );
        }

        self.generation.fetch_add(1, Ordering::Release);
        let destroyed = self.snapshots.len();
        self.snapshots.clear();
        destroyed
    }
}
