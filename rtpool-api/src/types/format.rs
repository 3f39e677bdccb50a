#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Pixel formats a pooled render target may be created with. Names follow the vulkan naming
/// convention.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum RtFormat {
    UNDEFINED,
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    A2R10G10B10_UNORM_PACK32,
    B10G11R11_UFLOAT_PACK32,
    R16_SFLOAT,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32_UINT,
    R32G32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl Default for RtFormat {
    fn default() -> Self {
        RtFormat::UNDEFINED
    }
}

impl RtFormat {
    /// Size of a single texel. Every supported format is uncompressed so blocks are 1x1.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            RtFormat::UNDEFINED => 0,
            RtFormat::R8_UNORM => 1,
            RtFormat::R8G8_UNORM | RtFormat::R16_SFLOAT | RtFormat::D16_UNORM => 2,
            RtFormat::R8G8B8A8_UNORM
            | RtFormat::R8G8B8A8_SRGB
            | RtFormat::B8G8R8A8_UNORM
            | RtFormat::A2R10G10B10_UNORM_PACK32
            | RtFormat::B10G11R11_UFLOAT_PACK32
            | RtFormat::R16G16_SFLOAT
            | RtFormat::R32_SFLOAT
            | RtFormat::R32_UINT
            | RtFormat::D32_SFLOAT
            | RtFormat::D24_UNORM_S8_UINT => 4,
            RtFormat::R16G16B16A16_SFLOAT
            | RtFormat::R32G32_SFLOAT
            | RtFormat::D32_SFLOAT_S8_UINT => 8,
            RtFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    pub fn has_depth(self) -> bool {
        match self {
            RtFormat::D16_UNORM
            | RtFormat::D32_SFLOAT
            | RtFormat::D24_UNORM_S8_UINT
            | RtFormat::D32_SFLOAT_S8_UINT => true,
            _ => false,
        }
    }

    pub fn has_stencil(self) -> bool {
        match self {
            RtFormat::D24_UNORM_S8_UINT | RtFormat::D32_SFLOAT_S8_UINT => true,
            _ => false,
        }
    }
}
