use rtpool_api::{RtDeviceContext, RtResourceState, RtResult};

/// Tracks the single outstanding batched transition. Nothing that can rename, reuse or destroy a
/// render target may run while a fence is pending, so the pool waits on this before every
/// structural change.
pub struct TransitionBarrier<FenceT> {
    pending_fence: Option<FenceT>,
}

impl<FenceT> Default for TransitionBarrier<FenceT> {
    fn default() -> Self {
        TransitionBarrier {
            pending_fence: None,
        }
    }
}

impl<FenceT> TransitionBarrier<FenceT> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending_fence.is_some()
    }

    /// Submits one batched transition for all textures. Does not call the device if the list is
    /// empty.
    pub fn issue<D: RtDeviceContext<Fence = FenceT>>(
        &mut self,
        device_context: &D,
        textures: &[&D::Texture],
        state: RtResourceState,
    ) -> RtResult<()> {
        assert!(
            self.pending_fence.is_none(),
            "A transition is already in flight, wait for it before issuing another"
        );

        if textures.is_empty() {
            return Ok(());
        }

        log::trace!("Transitioning {} textures to {:?}", textures.len(), state);
        self.pending_fence = device_context.transition_textures(textures, state)?;
        Ok(())
    }

    /// Blocks until the outstanding transition (if any) completes. Returns true if there was one.
    #[profiling::function]
    pub fn wait<D: RtDeviceContext<Fence = FenceT>>(
        &mut self,
        device_context: &D,
    ) -> RtResult<bool> {
        if let Some(fence) = &self.pending_fence {
            device_context.wait_for_fence(fence)?;
            self.pending_fence = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
