//! A headless device that keeps textures as bookkeeping entries in memory. Nothing is rendered.
//! It is used by tests and tools that need to drive the pool without a GPU, and it records every
//! call so callers can assert on ordering.

use crate::{
    RtDeviceContext, RtFenceStatus, RtResourceState, RtResult, RtTextureCategory, RtTextureDef,
};
use fnv::{FnvHashMap, FnvHashSet};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RtTextureEmpty {
    texture_id: u64,
}

impl RtTextureEmpty {
    pub fn texture_id(&self) -> u64 {
        self.texture_id
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RtFenceEmpty {
    fence_id: u64,
}

impl RtFenceEmpty {
    pub fn fence_id(&self) -> u64 {
        self.fence_id
    }
}

/// One recorded device call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmptyDeviceOp {
    CreateTexture {
        texture_id: u64,
        category: RtTextureCategory,
    },
    DestroyTexture {
        texture_id: u64,
    },
    TransitionTextures {
        texture_ids: Vec<u64>,
        state: RtResourceState,
        fence_id: Option<u64>,
    },
    WaitForFence {
        fence_id: u64,
    },
    SetDebugName {
        texture_id: u64,
        debug_name: String,
    },
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct EmptyDeviceStats {
    pub created_count: u64,
    pub destroyed_count: u64,
    pub live_count: u64,
    pub transition_batch_count: u64,
    pub fence_wait_count: u64,
}

struct EmptyTextureInfo {
    debug_name: String,
    size_in_bytes: u64,
    state: RtResourceState,
}

struct EmptyDeviceState {
    next_texture_id: u64,
    next_fence_id: u64,
    textures: FnvHashMap<u64, EmptyTextureInfo>,
    pending_fences: FnvHashSet<u64>,
    fail_next_create: bool,
    uses_fences: bool,
    stats: EmptyDeviceStats,
    op_log: Vec<EmptyDeviceOp>,
}

impl Default for EmptyDeviceState {
    fn default() -> Self {
        EmptyDeviceState {
            next_texture_id: 1,
            next_fence_id: 1,
            textures: Default::default(),
            pending_fences: Default::default(),
            fail_next_create: false,
            uses_fences: true,
            stats: Default::default(),
            op_log: Default::default(),
        }
    }
}

/// Bytes a texture matching the def occupies with tightly packed mips
pub fn compute_texture_size_in_bytes(texture_def: &RtTextureDef) -> u64 {
    let bytes_per_pixel = texture_def.format.bytes_per_pixel() as u64;
    let layers = texture_def.layer_count() as u64;
    let samples = texture_def.sample_count.max(1) as u64;

    let mut size_in_bytes = 0;
    for mip in 0..texture_def.mip_count {
        let width = (texture_def.extents.width >> mip).max(1) as u64;
        let height = (texture_def.extents.height >> mip).max(1) as u64;
        let depth = (texture_def.extents.depth >> mip).max(1) as u64;
        size_in_bytes += width * height * depth * layers * samples * bytes_per_pixel;
    }

    size_in_bytes
}

/// Cheap to clone, all clones share the same bookkeeping
#[derive(Clone, Default)]
pub struct EmptyDeviceContext {
    inner: Arc<Mutex<EmptyDeviceState>>,
}

impl EmptyDeviceContext {
    pub fn new() -> Self {
        Default::default()
    }

    /// Transitions complete immediately and no fences are handed out
    pub fn with_synchronous_transitions() -> Self {
        let device_context = Self::new();
        device_context.inner.lock().unwrap().uses_fences = false;
        device_context
    }

    /// The next call to create_texture will fail
    pub fn fail_next_create(&self) {
        self.inner.lock().unwrap().fail_next_create = true;
    }

    pub fn stats(&self) -> EmptyDeviceStats {
        self.inner.lock().unwrap().stats
    }

    pub fn op_log(&self) -> Vec<EmptyDeviceOp> {
        self.inner.lock().unwrap().op_log.clone()
    }

    pub fn clear_op_log(&self) {
        self.inner.lock().unwrap().op_log.clear();
    }

    pub fn is_alive(
        &self,
        texture: &RtTextureEmpty,
    ) -> bool {
        self.inner
            .lock()
            .unwrap()
            .textures
            .contains_key(&texture.texture_id)
    }

    pub fn debug_name(
        &self,
        texture: &RtTextureEmpty,
    ) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .textures
            .get(&texture.texture_id)
            .map(|x| x.debug_name.clone())
    }

    pub fn texture_state(
        &self,
        texture: &RtTextureEmpty,
    ) -> Option<RtResourceState> {
        self.inner
            .lock()
            .unwrap()
            .textures
            .get(&texture.texture_id)
            .map(|x| x.state)
    }

    pub fn fence_status(
        &self,
        fence: &RtFenceEmpty,
    ) -> RtFenceStatus {
        if self
            .inner
            .lock()
            .unwrap()
            .pending_fences
            .contains(&fence.fence_id)
        {
            RtFenceStatus::Incomplete
        } else {
            RtFenceStatus::Complete
        }
    }
}

impl RtDeviceContext for EmptyDeviceContext {
    type Texture = RtTextureEmpty;
    type Fence = RtFenceEmpty;

    #[profiling::function]
    fn create_texture(
        &self,
        texture_def: &RtTextureDef,
        category: RtTextureCategory,
        debug_name: &str,
    ) -> RtResult<RtTextureEmpty> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next_create {
            inner.fail_next_create = false;
            return Err(format!(
                "Out of device memory creating texture {} '{}'",
                texture_def, debug_name
            ))?;
        }

        let texture_id = inner.next_texture_id;
        inner.next_texture_id += 1;

        inner.textures.insert(
            texture_id,
            EmptyTextureInfo {
                debug_name: debug_name.to_string(),
                size_in_bytes: compute_texture_size_in_bytes(texture_def),
                state: RtResourceState::UNDEFINED,
            },
        );
        inner.stats.created_count += 1;
        inner.stats.live_count += 1;
        inner.op_log.push(EmptyDeviceOp::CreateTexture {
            texture_id,
            category,
        });

        log::trace!(
            "create texture {} {:?} {} '{}'",
            texture_id,
            category,
            texture_def,
            debug_name
        );
        Ok(RtTextureEmpty { texture_id })
    }

    #[profiling::function]
    fn destroy_texture(
        &self,
        texture: RtTextureEmpty,
    ) -> RtResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.textures.remove(&texture.texture_id).is_none() {
            return Err(format!(
                "Tried to destroy texture {} which does not exist",
                texture.texture_id
            ))?;
        }

        inner.stats.destroyed_count += 1;
        inner.stats.live_count -= 1;
        inner.op_log.push(EmptyDeviceOp::DestroyTexture {
            texture_id: texture.texture_id,
        });
        log::trace!("destroy texture {}", texture.texture_id);
        Ok(())
    }

    #[profiling::function]
    fn transition_textures(
        &self,
        textures: &[&RtTextureEmpty],
        state: RtResourceState,
    ) -> RtResult<Option<RtFenceEmpty>> {
        let mut inner = self.inner.lock().unwrap();
        for texture in textures {
            match inner.textures.get_mut(&texture.texture_id) {
                Some(info) => info.state = state,
                None => {
                    return Err(format!(
                        "Tried to transition texture {} which does not exist",
                        texture.texture_id
                    ))?
                }
            }
        }

        let fence_id = if inner.uses_fences {
            let fence_id = inner.next_fence_id;
            inner.next_fence_id += 1;
            inner.pending_fences.insert(fence_id);
            Some(fence_id)
        } else {
            None
        };

        inner.stats.transition_batch_count += 1;
        inner.op_log.push(EmptyDeviceOp::TransitionTextures {
            texture_ids: textures.iter().map(|x| x.texture_id).collect(),
            state,
            fence_id,
        });

        Ok(fence_id.map(|fence_id| RtFenceEmpty { fence_id }))
    }

    #[profiling::function]
    fn wait_for_fence(
        &self,
        fence: &RtFenceEmpty,
    ) -> RtResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.pending_fences.remove(&fence.fence_id);
        inner.stats.fence_wait_count += 1;
        inner.op_log.push(EmptyDeviceOp::WaitForFence {
            fence_id: fence.fence_id,
        });
        Ok(())
    }

    fn texture_size_in_bytes(
        &self,
        texture: &RtTextureEmpty,
    ) -> u64 {
        match self.inner.lock().unwrap().textures.get(&texture.texture_id) {
            Some(info) => info.size_in_bytes,
            None => {
                log::warn!(
                    "Queried size of texture {} which does not exist",
                    texture.texture_id
                );
                0
            }
        }
    }

    fn set_debug_name(
        &self,
        texture: &RtTextureEmpty,
        debug_name: &str,
    ) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(info) = inner.textures.get_mut(&texture.texture_id) {
            info.debug_name = debug_name.to_string();
        }
        inner.op_log.push(EmptyDeviceOp::SetDebugName {
            texture_id: texture.texture_id,
            debug_name: debug_name.to_string(),
        });
    }
}
