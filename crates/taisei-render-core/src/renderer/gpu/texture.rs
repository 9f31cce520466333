// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines data structures related to GPU textures and samplers.

use crate::render_bitflags;
use std::borrow::Cow;

/// The texel formats a device may support.
///
/// Discriminants are dense and start at zero; they are the format ids packed into
/// pipeline cache keys, so the enum must stay below 63 variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TextureFormat {
    /// 8-bit single channel, unsigned normalized.
    R8Unorm = 0,
    /// 8-bit alpha only, unsigned normalized.
    A8Unorm,
    /// Two 8-bit channels, signed normalized.
    Rg8Snorm,
    /// Four 8-bit channels, unsigned normalized.
    Rgba8Unorm,
    /// Four 8-bit channels, unsigned normalized, sRGB encoded.
    Rgba8UnormSrgb,
    /// Four 8-bit channels, signed normalized.
    Rgba8Snorm,
    /// Four 8-bit channels in BGRA order, unsigned normalized.
    Bgra8Unorm,
    /// Four 8-bit channels in BGRA order, unsigned normalized, sRGB encoded.
    Bgra8UnormSrgb,
    /// 8-bit single channel, unsigned integer.
    R8Uint,
    /// Two 8-bit channels, unsigned integer.
    Rg8Uint,
    /// Four 8-bit channels, unsigned integer.
    Rgba8Uint,
    /// Two 16-bit channels, unsigned normalized.
    Rg16Unorm,
    /// Four 16-bit channels, unsigned normalized.
    Rgba16Unorm,
    /// 16-bit single channel, unsigned integer.
    R16Uint,
    /// Two 16-bit channels, unsigned integer.
    Rg16Uint,
    /// Four 16-bit channels, unsigned integer.
    Rgba16Uint,
    /// 16-bit single channel float.
    R16Float,
    /// Two 16-bit float channels.
    Rg16Float,
    /// Four 16-bit float channels.
    Rgba16Float,
    /// 32-bit single channel float.
    R32Float,
    /// Two 32-bit float channels.
    Rg32Float,
    /// Four 32-bit float channels.
    Rgba32Float,
    /// Packed 5-6-5 BGR.
    B5g6r5Unorm,
    /// Packed 5-5-5-1 BGRA.
    B5g5r5a1Unorm,
    /// Packed 4-4-4-4 BGRA.
    B4g4r4a4Unorm,
    /// Packed 10-10-10-2 RGBA.
    Rgb10a2Unorm,
    /// BC1 block compression (RGB + 1-bit alpha).
    Bc1,
    /// BC2 block compression.
    Bc2,
    /// BC3 block compression.
    Bc3,
    /// BC3 block compression, sRGB encoded.
    Bc3Srgb,
    /// BC7 block compression.
    Bc7,
    /// BC7 block compression, sRGB encoded.
    Bc7Srgb,
    /// 16-bit depth.
    D16Unorm,
    /// 24-bit depth.
    D24Unorm,
    /// 32-bit float depth.
    D32Float,
    /// 24-bit depth with 8-bit stencil.
    D24UnormS8Uint,
    /// 32-bit float depth with 8-bit stencil.
    D32FloatS8Uint,
}

impl TextureFormat {
    /// Every format, in discriminant order.
    pub const ALL: [TextureFormat; 37] = [
        Self::R8Unorm,
        Self::A8Unorm,
        Self::Rg8Snorm,
        Self::Rgba8Unorm,
        Self::Rgba8UnormSrgb,
        Self::Rgba8Snorm,
        Self::Bgra8Unorm,
        Self::Bgra8UnormSrgb,
        Self::R8Uint,
        Self::Rg8Uint,
        Self::Rgba8Uint,
        Self::Rg16Unorm,
        Self::Rgba16Unorm,
        Self::R16Uint,
        Self::Rg16Uint,
        Self::Rgba16Uint,
        Self::R16Float,
        Self::Rg16Float,
        Self::Rgba16Float,
        Self::R32Float,
        Self::Rg32Float,
        Self::Rgba32Float,
        Self::B5g6r5Unorm,
        Self::B5g5r5a1Unorm,
        Self::B4g4r4a4Unorm,
        Self::Rgb10a2Unorm,
        Self::Bc1,
        Self::Bc2,
        Self::Bc3,
        Self::Bc3Srgb,
        Self::Bc7,
        Self::Bc7Srgb,
        Self::D16Unorm,
        Self::D24Unorm,
        Self::D32Float,
        Self::D24UnormS8Uint,
        Self::D32FloatS8Uint,
    ];

    /// The dense numeric id of the format.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Returns `true` for depth (and depth-stencil) formats.
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            Self::D16Unorm
                | Self::D24Unorm
                | Self::D32Float
                | Self::D24UnormS8Uint
                | Self::D32FloatS8Uint
        )
    }

    /// Returns `true` for block-compressed formats.
    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            Self::Bc1 | Self::Bc2 | Self::Bc3 | Self::Bc3Srgb | Self::Bc7 | Self::Bc7Srgb
        )
    }

    /// Returns `true` for sRGB-encoded formats.
    pub const fn is_srgb(self) -> bool {
        matches!(
            self,
            Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb | Self::Bc3Srgb | Self::Bc7Srgb
        )
    }

    /// Returns the size in bytes of one texel, or of one 4x4 block for compressed formats.
    pub const fn block_bytes(self) -> u32 {
        match self {
            Self::R8Unorm | Self::A8Unorm | Self::R8Uint => 1,
            Self::Rg8Snorm
            | Self::Rg8Uint
            | Self::R16Uint
            | Self::R16Float
            | Self::B5g6r5Unorm
            | Self::B5g5r5a1Unorm
            | Self::B4g4r4a4Unorm
            | Self::D16Unorm => 2,
            Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Rgba8Snorm
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Rgba8Uint
            | Self::Rg16Unorm
            | Self::Rg16Uint
            | Self::Rg16Float
            | Self::R32Float
            | Self::Rgb10a2Unorm
            | Self::D24Unorm
            | Self::D32Float
            | Self::D24UnormS8Uint => 4,
            Self::Rgba16Unorm
            | Self::Rgba16Uint
            | Self::Rgba16Float
            | Self::Rg32Float
            | Self::D32FloatS8Uint => 8,
            Self::Rgba32Float => 16,
            Self::Bc1 => 8,
            Self::Bc2 | Self::Bc3 | Self::Bc3Srgb | Self::Bc7 | Self::Bc7Srgb => 16,
        }
    }

    /// Returns the edge length of a compression block (1 for uncompressed formats).
    pub const fn block_dim(self) -> u32 {
        if self.is_compressed() {
            4
        } else {
            1
        }
    }

    /// Returns the number of bytes in one row of blocks covering `width` texels.
    pub const fn bytes_per_row(self, width: u32) -> u32 {
        let dim = self.block_dim();
        width.div_ceil(dim) * self.block_bytes()
    }

    /// Returns the number of bytes covering a `width` x `height` region.
    pub const fn data_size(self, width: u32, height: u32) -> u64 {
        let rows = height.div_ceil(self.block_dim()) as u64;
        rows * self.bytes_per_row(width) as u64
    }
}

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// A single 2D image (per mip level).
    D2,
    /// Six square 2D layers forming a cube.
    Cube,
}

render_bitflags! {
    /// A set of flags describing how a texture will be used.
    pub struct TextureUsage: u32 {
        /// The texture can be sampled in shaders.
        const SAMPLER = 1 << 0;
        /// The texture can be a color render target.
        const COLOR_TARGET = 1 << 1;
        /// The texture can be a depth-stencil render target.
        const DEPTH_STENCIL_TARGET = 1 << 2;
    }
}

/// A descriptor used to create a texture.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// 2D or cube.
    pub kind: TextureKind,
    /// The texel format.
    pub format: TextureFormat,
    /// Width of mip level 0.
    pub width: u32,
    /// Height of mip level 0.
    pub height: u32,
    /// Number of array layers (6 for cubes).
    pub layers: u32,
    /// Number of mip levels, at least 1.
    pub mip_levels: u32,
    /// Allowed usages.
    pub usage: TextureUsage,
}

/// An opaque handle to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Texel filtering for magnification and minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Filtering between mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapMode {
    /// Nearest mip level.
    Nearest,
    /// Linear blend of the two nearest levels.
    Linear,
}

/// Behaviour of texture coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Tile the texture.
    Repeat,
    /// Tile the texture, mirroring every other tile.
    MirroredRepeat,
    /// Clamp to the edge texel.
    ClampToEdge,
}

/// A descriptor used to create a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Mip level filter.
    pub mipmap_mode: MipmapMode,
    /// Addressing along U.
    pub address_mode_u: AddressMode,
    /// Addressing along V.
    pub address_mode_v: AddressMode,
    /// Addressing along W.
    pub address_mode_w: AddressMode,
    /// Bias added to the computed level of detail.
    pub mip_lod_bias: f32,
    /// Maximum anisotropy; `None` disables anisotropic filtering.
    pub max_anisotropy: Option<u32>,
    /// Lowest accessible level of detail.
    pub min_lod: f32,
    /// Highest accessible level of detail.
    pub max_lod: f32,
}

/// An opaque handle to a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub usize);

/// A box of texels inside one mip level of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    /// The texture.
    pub texture: TextureId,
    /// Mip level.
    pub mip_level: u32,
    /// Array layer (cube face).
    pub layer: u32,
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in texels.
    pub w: u32,
    /// Height in texels.
    pub h: u32,
}
