#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use super::{RtExtents3D, RtFormat, RtTextureCategory, RtTextureFlags};

/// Describes the shape, format and capabilities of a pooled texture.
///
/// The debug name is intentionally not part of the def. It is carried next to it by whoever owns
/// the texture, so renaming never changes how two defs compare.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RtTextureDef {
    pub extents: RtExtents3D,
    // Number of array slices. For cube arrays, this is the number of cubes (faces are implied)
    pub array_length: u32,
    pub mip_count: u32,
    pub sample_count: u32,
    pub format: RtFormat,
    pub flags: RtTextureFlags,
    pub is_cube: bool,
    pub is_array: bool,
}

impl Default for RtTextureDef {
    fn default() -> Self {
        RtTextureDef {
            extents: RtExtents3D {
                width: 0,
                height: 0,
                depth: 1,
            },
            array_length: 1,
            mip_count: 1,
            sample_count: 1,
            format: RtFormat::UNDEFINED,
            flags: RtTextureFlags::empty(),
            is_cube: false,
            is_array: false,
        }
    }
}

impl RtTextureDef {
    pub fn new_2d(
        width: u32,
        height: u32,
        format: RtFormat,
        flags: RtTextureFlags,
    ) -> Self {
        RtTextureDef {
            extents: RtExtents3D::new_2d(width, height),
            format,
            flags,
            ..Default::default()
        }
    }

    pub fn new_3d(
        extents: RtExtents3D,
        format: RtFormat,
        flags: RtTextureFlags,
    ) -> Self {
        RtTextureDef {
            extents,
            format,
            flags,
            ..Default::default()
        }
    }

    pub fn new_cube(
        size: u32,
        format: RtFormat,
        flags: RtTextureFlags,
    ) -> Self {
        RtTextureDef {
            extents: RtExtents3D::new_2d(size, size),
            format,
            flags,
            is_cube: true,
            ..Default::default()
        }
    }

    /// Requests with an invalid def are ignored by the pool
    pub fn is_valid(&self) -> bool {
        !self.extents.has_zero_area() && self.format != RtFormat::UNDEFINED
    }

    /// Asserts on combinations that indicate a programming error
    pub fn verify(&self) {
        assert!(self.extents.width > 0);
        assert!(self.extents.height > 0);
        assert!(self.extents.depth > 0);
        assert!(self.array_length > 0);
        assert!(self.mip_count > 0);
        assert!(self.sample_count > 0);
        assert!(self.mip_count < 2 || self.sample_count == 1);

        if self.is_cube {
            assert_eq!(self.extents.depth, 1, "Cube textures cannot have depth");
            assert_eq!(
                self.extents.width, self.extents.height,
                "Cube textures must be square"
            );
        }

        assert!(
            !(self.format.has_depth() && self.flags.intersects(RtTextureFlags::UNORDERED_ACCESS)),
            "Cannot use depth stencil as UAV"
        );
    }

    pub fn category(&self) -> RtTextureCategory {
        if self.is_cube {
            if self.is_array {
                RtTextureCategory::CubeArray
            } else {
                RtTextureCategory::Cube
            }
        } else if self.extents.depth > 1 {
            RtTextureCategory::Texture3D
        } else if self.is_array {
            RtTextureCategory::Texture2DArray
        } else {
            RtTextureCategory::Texture2D
        }
    }

    /// Number of 2d layers the device has to allocate (faces included)
    pub fn layer_count(&self) -> u32 {
        let faces = if self.is_cube { 6 } else { 1 };
        let slices = if self.is_array { self.array_length } else { 1 };
        faces * slices
    }

    /// True if every field matches
    pub fn exact_equals(
        &self,
        other: &RtTextureDef,
    ) -> bool {
        self.compare(other, self.flags, other.flags)
    }

    /// True if every field matches, ignoring the fast memory hint on either side
    pub fn relaxed_equals(
        &self,
        other: &RtTextureDef,
    ) -> bool {
        let mask = !RtTextureFlags::FAST_MEMORY;
        self.compare(other, self.flags & mask, other.flags & mask)
    }

    fn compare(
        &self,
        other: &RtTextureDef,
        lhs_flags: RtTextureFlags,
        rhs_flags: RtTextureFlags,
    ) -> bool {
        self.extents == other.extents
            && self.array_length == other.array_length
            && self.mip_count == other.mip_count
            && self.sample_count == other.sample_count
            && self.format == other.format
            && self.is_cube == other.is_cube
            && self.is_array == other.is_array
            && lhs_flags == rhs_flags
    }
}

impl PartialEq for RtTextureDef {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.exact_equals(other)
    }
}

impl Eq for RtTextureDef {}

impl std::fmt::Display for RtTextureDef {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}x{}", self.extents.width, self.extents.height)?;
        if self.extents.depth > 1 {
            write!(f, "x{}", self.extents.depth)?;
        }
        if self.is_cube {
            write!(f, " cube")?;
        }
        if self.is_array {
            write!(f, "[{}]", self.array_length)?;
        }
        write!(f, " {:?} {}mip(s)", self.format, self.mip_count)?;
        if self.sample_count > 1 {
            write!(f, " {}xMSAA", self.sample_count)?;
        }

        let mut tags = Vec::new();
        if self.flags.contains(RtTextureFlags::RENDER_TARGET) {
            tags.push("RT");
        }
        if self.flags.contains(RtTextureFlags::DEPTH_STENCIL) {
            tags.push("DS");
        }
        if self.flags.contains(RtTextureFlags::SHADER_RESOURCE) {
            tags.push("SRV");
        }
        if self.flags.contains(RtTextureFlags::UNORDERED_ACCESS) {
            tags.push("UAV");
        }
        if self.flags.contains(RtTextureFlags::AUTO_WRITABLE) {
            tags.push("AutoWritable");
        }
        if self.flags.contains(RtTextureFlags::FAST_MEMORY) {
            tags.push("Fast");
        }
        if !tags.is_empty() {
            write!(f, " [{}]", tags.join(" "))?;
        }

        Ok(())
    }
}
