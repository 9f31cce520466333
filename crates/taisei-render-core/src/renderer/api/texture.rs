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

//! Engine texture types and creation parameters.

use super::pixmap::{PixmapFormat, PixmapOrigin};
use crate::render_bitflags;

/// The storage type the engine requests for a texture.
///
/// Not every type maps to a device format; unsupported ones are either remapped to a
/// wider type or rejected at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    /// 8-bit RGBA.
    Rgba8,
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RG.
    Rg8,
    /// 8-bit R.
    R8,
    /// 16-bit RGBA.
    Rgba16,
    /// 16-bit RGB.
    Rgb16,
    /// 16-bit RG.
    Rg16,
    /// 16-bit R.
    R16,
    /// Half float RGBA.
    Rgba16Float,
    /// Half float RGB.
    Rgb16Float,
    /// Half float RG.
    Rg16Float,
    /// Half float R.
    R16Float,
    /// Float RGBA.
    Rgba32Float,
    /// Float RGB.
    Rgb32Float,
    /// Float RG.
    Rg32Float,
    /// Float R.
    R32Float,
    /// 8-bit depth.
    Depth8,
    /// 16-bit depth.
    Depth16,
    /// 24-bit depth.
    Depth24,
    /// 32-bit depth.
    Depth32,
    /// Half float depth.
    Depth16Float,
    /// Float depth.
    Depth32Float,
    /// ETC1 RGB.
    CompressedEtc1Rgb,
    /// ETC2 RGBA.
    CompressedEtc2Rgba,
    /// BC1 RGB.
    CompressedBc1Rgb,
    /// BC3 RGBA.
    CompressedBc3Rgba,
    /// BC4 R.
    CompressedBc4R,
    /// BC5 RG.
    CompressedBc5Rg,
    /// BC7 RGBA.
    CompressedBc7Rgba,
    /// ASTC 4x4 RGBA.
    CompressedAstc4x4Rgba,
}

impl TextureType {
    /// Returns the printable name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            TextureType::Rgba8 => "RGBA_8",
            TextureType::Rgb8 => "RGB_8",
            TextureType::Rg8 => "RG_8",
            TextureType::R8 => "R_8",
            TextureType::Rgba16 => "RGBA_16",
            TextureType::Rgb16 => "RGB_16",
            TextureType::Rg16 => "RG_16",
            TextureType::R16 => "R_16",
            TextureType::Rgba16Float => "RGBA_16_FLOAT",
            TextureType::Rgb16Float => "RGB_16_FLOAT",
            TextureType::Rg16Float => "RG_16_FLOAT",
            TextureType::R16Float => "R_16_FLOAT",
            TextureType::Rgba32Float => "RGBA_32_FLOAT",
            TextureType::Rgb32Float => "RGB_32_FLOAT",
            TextureType::Rg32Float => "RG_32_FLOAT",
            TextureType::R32Float => "R_32_FLOAT",
            TextureType::Depth8 => "DEPTH_8",
            TextureType::Depth16 => "DEPTH_16",
            TextureType::Depth24 => "DEPTH_24",
            TextureType::Depth32 => "DEPTH_32",
            TextureType::Depth16Float => "DEPTH_16_FLOAT",
            TextureType::Depth32Float => "DEPTH_32_FLOAT",
            TextureType::CompressedEtc1Rgb => "COMPRESSED_ETC1_RGB",
            TextureType::CompressedEtc2Rgba => "COMPRESSED_ETC2_RGBA",
            TextureType::CompressedBc1Rgb => "COMPRESSED_BC1_RGB",
            TextureType::CompressedBc3Rgba => "COMPRESSED_BC3_RGBA",
            TextureType::CompressedBc4R => "COMPRESSED_BC4_R",
            TextureType::CompressedBc5Rg => "COMPRESSED_BC5_RG",
            TextureType::CompressedBc7Rgba => "COMPRESSED_BC7_RGBA",
            TextureType::CompressedAstc4x4Rgba => "COMPRESSED_ASTC_4x4_RGBA",
        }
    }
}

/// The shape of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureClass {
    /// A single 2D image.
    #[default]
    D2,
    /// A cube map of six square faces.
    Cubemap,
}

impl TextureClass {
    /// Both classes, in null-texture order.
    pub const ALL: [TextureClass; 2] = [TextureClass::D2, TextureClass::Cubemap];

    /// Returns the index of the class.
    pub const fn index(self) -> usize {
        match self {
            TextureClass::D2 => 0,
            TextureClass::Cubemap => 1,
        }
    }
}

render_bitflags! {
    /// Creation flags of a texture.
    pub struct TextureFlags: u32 {
        /// Texels are sRGB encoded.
        const SRGB = 1 << 0;
    }
}

/// Texture filtering, optionally combined with mip level selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilterMode {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation.
    #[default]
    Linear,
    /// Nearest texel of the nearest mip level.
    NearestMipmapNearest,
    /// Nearest texel, blended between mip levels.
    NearestMipmapLinear,
    /// Linear interpolation in the nearest mip level.
    LinearMipmapNearest,
    /// Trilinear filtering.
    LinearMipmapLinear,
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrapMode {
    /// Clamp to the edge.
    Clamp,
    /// Mirrored repeat.
    Mirror,
    /// Repeat.
    #[default]
    Repeat,
}

/// How the mip chain of a texture is maintained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureMipmapMode {
    /// The engine uploads each level itself.
    #[default]
    Manual,
    /// Levels are regenerated from level 0 whenever it changes.
    Auto,
}

/// A channel swizzle. `None` components mean identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SwizzleMask {
    /// Source of the red channel.
    pub r: Option<char>,
    /// Source of the green channel.
    pub g: Option<char>,
    /// Source of the blue channel.
    pub b: Option<char>,
    /// Source of the alpha channel.
    pub a: Option<char>,
}

impl SwizzleMask {
    /// Returns `true` if every component is unset or maps a channel to itself.
    pub fn is_identity(&self) -> bool {
        let ok = |c: Option<char>, own: char| c.is_none_or(|c| c == own);
        ok(self.r, 'r') && ok(self.g, 'g') && ok(self.b, 'b') && ok(self.a, 'a')
    }
}

/// Minification and magnification filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureFilter {
    /// Minification filter.
    pub min: TextureFilterMode,
    /// Magnification filter.
    pub mag: TextureFilterMode,
}

/// Wrap modes along S and T.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureWrap {
    /// Along S (U).
    pub s: TextureWrapMode,
    /// Along T (V).
    pub t: TextureWrapMode,
}

/// Everything needed to create a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureParams {
    /// Width of mip level 0.
    pub width: u32,
    /// Height of mip level 0.
    pub height: u32,
    /// Layer count; 0 means 1 for 2D textures, cubemaps need 6.
    pub layers: u32,
    /// 2D or cubemap.
    pub class: TextureClass,
    /// The storage type.
    pub ty: TextureType,
    /// Filtering.
    pub filter: TextureFilter,
    /// Wrapping.
    pub wrap: TextureWrap,
    /// Mip level count; 0 picks a default and [`TextureParams::MIPMAPS_MAX`] the full chain.
    pub mipmaps: u32,
    /// Maximum anisotropy; 0 picks the default.
    pub anisotropy: u32,
    /// Mip chain maintenance.
    pub mipmap_mode: TextureMipmapMode,
    /// Creation flags.
    pub flags: TextureFlags,
    /// Channel swizzle.
    pub swizzle: SwizzleMask,
}

impl TextureParams {
    /// Requests every mip level down to 1x1.
    pub const MIPMAPS_MAX: u32 = u32::MAX;

    /// Creates parameters for a plain 2D texture with default sampling state.
    pub fn new_2d(width: u32, height: u32, ty: TextureType) -> Self {
        Self {
            width,
            height,
            layers: 1,
            class: TextureClass::D2,
            ty,
            filter: TextureFilter::default(),
            wrap: TextureWrap::default(),
            mipmaps: 1,
            anisotropy: 0,
            mipmap_mode: TextureMipmapMode::Manual,
            flags: TextureFlags::EMPTY,
            swizzle: SwizzleMask::default(),
        }
    }
}

/// Returns the length of the full mip chain of a `width` x `height` texture.
pub fn max_num_miplevels(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    u32::BITS - largest.leading_zeros()
}

/// The answer of a texture type query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureTypeQueryResult {
    /// The pixmap format uploads should use.
    pub optimal_pixmap_format: PixmapFormat,
    /// The pixmap origin uploads should use.
    pub optimal_pixmap_origin: PixmapOrigin,
    /// Whether the supplied pixmap format can be uploaded as is.
    pub supplied_pixmap_format_supported: bool,
    /// Whether the supplied pixmap origin can be uploaded as is.
    pub supplied_pixmap_origin_supported: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_num_miplevels() {
        assert_eq!(max_num_miplevels(1, 1), 1);
        assert_eq!(max_num_miplevels(256, 16), 9);
        assert_eq!(max_num_miplevels(300, 2), 9);
    }

    #[test]
    fn test_swizzle_identity() {
        assert!(SwizzleMask::default().is_identity());
        let swapped = SwizzleMask {
            r: Some('b'),
            ..Default::default()
        };
        assert!(!swapped.is_identity());
        let explicit = SwizzleMask {
            r: Some('r'),
            g: Some('g'),
            b: None,
            a: Some('a'),
        };
        assert!(explicit.is_identity());
    }
}
