#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// A 3d size for textures. For 2d textures depth is 1.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RtExtents3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl RtExtents3D {
    pub fn new_2d(
        width: u32,
        height: u32,
    ) -> Self {
        RtExtents3D {
            width,
            height,
            depth: 1,
        }
    }

    pub fn has_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

bitflags::bitflags! {
    /// Capabilities and hints requested for a pooled texture.
    #[derive(Default)]
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct RtTextureFlags: u32 {
        const NONE = 0;
        /// Can be bound as a color attachment
        const RENDER_TARGET = 1<<0;
        /// Can be bound as a depth/stencil attachment
        const DEPTH_STENCIL = 1<<1;
        /// Can be sampled/read in shaders. Similar to DX12 SRV
        const SHADER_RESOURCE = 1<<2;
        /// Can be written from compute. Similar to DX12 UAV and vulkan STORAGE_IMAGE
        const UNORDERED_ACCESS = 1<<3;
        /// Included in the batched per-frame transition back to a writable state
        const AUTO_WRITABLE = 1<<4;
        /// Prefer scarce low-latency memory. A request with this flag may be satisfied by an
        /// otherwise identical texture without it.
        const FAST_MEMORY = 1<<5;
    }
}

bitflags::bitflags! {
    /// The state of a texture from the GPU's point of view. Textures are moved between states
    /// with transitions.
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct RtResourceState: u32 {
        const UNDEFINED = 0;
        /// Similar to vulkan's COLOR_ATTACHMENT_OPTIMAL image layout
        const RENDER_TARGET = 0x1;
        const UNORDERED_ACCESS = 0x2;
        /// Similar to vulkan's DEPTH_STENCIL_ATTACHMENT_OPTIMAL image layout
        const DEPTH_WRITE = 0x4;
        const DEPTH_READ = 0x8;
        /// Similar to vulkan's SHADER_READ_ONLY_OPTIMAL image layout
        const SHADER_RESOURCE = 0x10;
        const COPY_DST = 0x20;
        const COPY_SRC = 0x40;
        const PRESENT = 0x80;
    }
}

impl Default for RtResourceState {
    fn default() -> Self {
        RtResourceState::UNDEFINED
    }
}

/// Which device entry point a texture def maps to
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum RtTextureCategory {
    Texture2D,
    Texture2DArray,
    Texture3D,
    Cube,
    CubeArray,
}

/// Status of a fence returned by a batched transition
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RtFenceStatus {
    /// Submitted work has not finished yet
    Incomplete,
    /// Work referencing the transitioned textures has retired
    Complete,
}
