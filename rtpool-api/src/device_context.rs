use crate::{RtResourceState, RtResult, RtTextureCategory, RtTextureDef};

/// The graphics device as seen by the render target pool. Implementations are expected to be
/// cheap to clone (usually an Arc around the real device) since the pool keeps its own copy.
///
/// Texture creation failing is treated as unrecoverable by the pool: the error is handed back to
/// the caller and nothing is retried.
pub trait RtDeviceContext {
    /// Opaque handle to a device texture. Clones refer to the same texture, they do not own it.
    type Texture: Clone + std::fmt::Debug + Send + Sync + 'static;

    /// Token for a batch of submitted work
    type Fence: std::fmt::Debug + Send + Sync + 'static;

    fn create_texture(
        &self,
        texture_def: &RtTextureDef,
        category: RtTextureCategory,
        debug_name: &str,
    ) -> RtResult<Self::Texture>;

    fn destroy_texture(
        &self,
        texture: Self::Texture,
    ) -> RtResult<()>;

    /// Moves all given textures to `state` as one batch. Returns a fence if the work runs
    /// asynchronously and must be waited on before the textures are touched again.
    fn transition_textures(
        &self,
        textures: &[&Self::Texture],
        state: RtResourceState,
    ) -> RtResult<Option<Self::Fence>>;

    /// Blocks until the fence is signaled
    fn wait_for_fence(
        &self,
        fence: &Self::Fence,
    ) -> RtResult<()>;

    /// Memory actually reserved for the texture. May differ from what the def implies due to
    /// padding or compression.
    fn texture_size_in_bytes(
        &self,
        texture: &Self::Texture,
    ) -> u64;

    fn set_debug_name(
        &self,
        texture: &Self::Texture,
        debug_name: &str,
    );
}
