use crossbeam_channel::Sender;
use rtpool_api::RtTextureDef;
use std::fmt::Formatter;
use std::sync::{Arc, Mutex};

/// Unique (per pool) id of a render target, stable for its whole life. Slot indices are not,
/// compaction moves them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u64);

impl std::fmt::Display for RenderTargetId {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sent to the pool when the last reference to a render target is dropped
pub(crate) struct DroppedRenderTarget<TextureT> {
    pub(crate) texture: TextureT,
    pub(crate) resource_id: RenderTargetId,
    pub(crate) debug_name: String,
}

struct PooledRenderTargetInner<TextureT>
where
    TextureT: Clone,
{
    texture: TextureT,
    texture_def: RtTextureDef,
    debug_name: Mutex<String>,
    resource_id: RenderTargetId,
    size_kb: u64,
    is_untracked: bool,
    drop_tx: Sender<DroppedRenderTarget<TextureT>>,
}

impl<TextureT> Drop for PooledRenderTargetInner<TextureT>
where
    TextureT: Clone,
{
    fn drop(&mut self) {
        let debug_name = std::mem::take(self.debug_name.get_mut().unwrap());
        let dropped = DroppedRenderTarget {
            texture: self.texture.clone(),
            resource_id: self.resource_id,
            debug_name,
        };

        if self.drop_tx.send(dropped).is_err() {
            log::warn!(
                "Render target {} was released after its pool was destroyed, the texture is leaked",
                self.resource_id
            );
        }
    }
}

/// A reference counted handle to a pooled texture. Clones share the same texture.
///
/// The pool keeps one clone of every render target it owns. When that is the only one left the
/// render target is free and may be handed out again or evicted. Dropping the last clone queues
/// the texture for destruction on the pool's next tick.
pub struct PooledRenderTarget<TextureT>
where
    TextureT: Clone,
{
    inner: Arc<PooledRenderTargetInner<TextureT>>,
}

impl<TextureT> Clone for PooledRenderTarget<TextureT>
where
    TextureT: Clone,
{
    fn clone(&self) -> Self {
        PooledRenderTarget {
            inner: self.inner.clone(),
        }
    }
}

impl<TextureT> PooledRenderTarget<TextureT>
where
    TextureT: Clone,
{
    pub(crate) fn new(
        texture: TextureT,
        texture_def: RtTextureDef,
        debug_name: &str,
        resource_id: RenderTargetId,
        size_kb: u64,
        is_untracked: bool,
        drop_tx: Sender<DroppedRenderTarget<TextureT>>,
    ) -> Self {
        PooledRenderTarget {
            inner: Arc::new(PooledRenderTargetInner {
                texture,
                texture_def,
                debug_name: Mutex::new(debug_name.to_string()),
                resource_id,
                size_kb,
                is_untracked,
                drop_tx,
            }),
        }
    }

    pub fn texture(&self) -> &TextureT {
        &self.inner.texture
    }

    pub fn texture_def(&self) -> &RtTextureDef {
        &self.inner.texture_def
    }

    pub fn debug_name(&self) -> String {
        self.inner.debug_name.lock().unwrap().clone()
    }

    pub(crate) fn set_debug_name(
        &self,
        debug_name: &str,
    ) -> bool {
        let mut current = self.inner.debug_name.lock().unwrap();
        if *current != debug_name {
            *current = debug_name.to_string();
            true
        } else {
            false
        }
    }

    pub fn resource_id(&self) -> RenderTargetId {
        self.inner.resource_id
    }

    /// Size charged to the pool, in KB rounded up
    pub fn size_kb(&self) -> u64 {
        self.inner.size_kb
    }

    /// Number of live handles, including the one held by the pool
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Untracked render targets wrap a texture created outside the pool. The pool never matches,
    /// ages or counts them.
    pub fn is_untracked(&self) -> bool {
        self.inner.is_untracked
    }

    pub fn is_snapshot(&self) -> bool {
        false
    }

    /// True if both handles refer to the same render target
    pub fn ptr_eq(
        &self,
        other: &PooledRenderTarget<TextureT>,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<TextureT> std::fmt::Debug for PooledRenderTarget<TextureT>
where
    TextureT: std::fmt::Debug + Clone,
{
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PooledRenderTarget")
            .field("resource_id", &self.inner.resource_id)
            .field("debug_name", &*self.inner.debug_name.lock().unwrap())
            .field("texture", &self.inner.texture)
            .field("texture_def", &self.inner.texture_def)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtpool_api::{RtFormat, RtTextureFlags};

    fn make_render_target(
        drop_tx: Sender<DroppedRenderTarget<u32>>
    ) -> PooledRenderTarget<u32> {
        PooledRenderTarget::new(
            7,
            RtTextureDef::new_2d(16, 16, RtFormat::R8_UNORM, RtTextureFlags::RENDER_TARGET),
            "test",
            RenderTargetId(3),
            1,
            false,
            drop_tx,
        )
    }

    #[test]
    fn test_last_drop_sends_texture() {
        let (drop_tx, drop_rx) = crossbeam_channel::unbounded();
        let render_target = make_render_target(drop_tx);

        let clone = render_target.clone();
        assert_eq!(render_target.ref_count(), 2);
        assert!(render_target.ptr_eq(&clone));

        std::mem::drop(render_target);
        assert!(drop_rx.try_recv().is_err());
        assert_eq!(clone.ref_count(), 1);

        clone.set_debug_name("renamed");
        std::mem::drop(clone);
        let dropped = drop_rx.try_recv().unwrap();
        assert_eq!(dropped.texture, 7);
        assert_eq!(dropped.resource_id, RenderTargetId(3));
        assert_eq!(dropped.debug_name, "renamed");
    }

    #[test]
    fn test_rename() {
        let (drop_tx, _drop_rx) = crossbeam_channel::unbounded();
        let render_target = make_render_target(drop_tx);
        assert!(!render_target.set_debug_name("test"));
        assert!(render_target.set_debug_name("other"));
        assert_eq!(render_target.debug_name(), "other");
    }
}
