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

//! Translation tables from the engine vocabulary to the device vocabulary.
//!
//! Everything here is a pure function. Texture types without a device format are
//! first remapped to a wider type (`remap_texture_type`); types that are still
//! unsupported after remapping are refused by the caller.

use crate::renderer::api::{
    self, BlendComponent, BlendMode, BlendOp, CullFaceMode, DepthTestFunc, PixmapFormat,
    Primitive, TextureClass, TextureFilterMode, TextureType, TextureWrapMode, VertexAttribConversion,
    VertexAttribSpec, VertexAttribType,
};
use crate::renderer::gpu::{
    AddressMode, BlendFactor, BlendOperation, ColorTargetBlendState, ColorWriteMask,
    CompareFunction, CullMode, FilterMode, MipmapMode, PrimitiveTopology, TextureFormat,
    TextureKind, VertexElementFormat,
};

/// Returns the device format backing a texture type, if it has one.
pub fn texture_type_to_format(ty: TextureType) -> Option<TextureFormat> {
    use TextureType as T;
    Some(match ty {
        T::Rgba8 => TextureFormat::Rgba8Unorm,
        T::R8 => TextureFormat::R8Unorm,
        T::Rgba16 => TextureFormat::Rgba16Unorm,
        T::Rg16 => TextureFormat::Rg16Unorm,
        T::Rgba16Float => TextureFormat::Rgba16Float,
        T::Rg16Float => TextureFormat::Rg16Float,
        T::R16Float => TextureFormat::R16Float,
        T::Rgba32Float => TextureFormat::Rgba32Float,
        T::Rg32Float => TextureFormat::Rg32Float,
        T::R32Float => TextureFormat::R32Float,
        T::Depth16 => TextureFormat::D16Unorm,
        T::Depth24 => TextureFormat::D24Unorm,
        T::Depth32Float => TextureFormat::D32Float,
        T::CompressedBc1Rgb => TextureFormat::Bc1,
        T::CompressedBc3Rgba => TextureFormat::Bc3,
        T::CompressedBc7Rgba => TextureFormat::Bc7,
        T::Rgb8
        | T::Rg8
        | T::Rgb16
        | T::R16
        | T::Rgb16Float
        | T::Rgb32Float
        | T::Depth8
        | T::Depth32
        | T::Depth16Float
        | T::CompressedEtc1Rgb
        | T::CompressedEtc2Rgba
        | T::CompressedBc4R
        | T::CompressedBc5Rg
        | T::CompressedAstc4x4Rgba => return None,
    })
}

/// Returns the wider type used in place of a type with no device format.
///
/// Types that need no remapping are returned unchanged.
pub fn remap_texture_type(ty: TextureType) -> TextureType {
    use TextureType as T;
    match ty {
        T::Rgb8 | T::Rg8 => T::Rgba8,
        T::Rgb16 => T::Rgba16,
        T::R16 => T::Rg16,
        T::Rgb16Float => T::Rgba16Float,
        T::Rgb32Float => T::Rgba32Float,
        T::Depth8 => T::Depth16,
        T::Depth32 => T::Depth24,
        T::Depth16Float => T::Depth32Float,
        other => other,
    }
}

/// Returns the sRGB-encoded variant of a format.
pub fn format_to_srgb(format: TextureFormat) -> Option<TextureFormat> {
    match format {
        TextureFormat::Rgba8Unorm => Some(TextureFormat::Rgba8UnormSrgb),
        TextureFormat::Bgra8Unorm => Some(TextureFormat::Bgra8UnormSrgb),
        TextureFormat::Bc3 => Some(TextureFormat::Bc3Srgb),
        TextureFormat::Bc7 => Some(TextureFormat::Bc7Srgb),
        _ => None,
    }
}

/// Returns the pixmap layout matching the texel layout of a device format.
///
/// Packed, BC2, 24-bit depth and stencil formats have no pixmap equivalent.
pub fn format_to_pixmap_format(format: TextureFormat) -> Option<PixmapFormat> {
    use TextureFormat as F;
    Some(match format {
        F::R8Unorm | F::A8Unorm | F::R8Uint => PixmapFormat::R8,
        F::Rg8Snorm | F::Rg8Uint => PixmapFormat::Rg8,
        F::Rgba8Unorm
        | F::Rgba8UnormSrgb
        | F::Rgba8Snorm
        | F::Bgra8Unorm
        | F::Bgra8UnormSrgb
        | F::Rgba8Uint => PixmapFormat::Rgba8,
        F::R16Uint | F::D16Unorm => PixmapFormat::R16,
        F::Rg16Unorm | F::Rg16Uint => PixmapFormat::Rg16,
        F::Rgba16Unorm | F::Rgba16Uint => PixmapFormat::Rgba16,
        F::R16Float => PixmapFormat::R16F,
        F::Rg16Float => PixmapFormat::Rg16F,
        F::Rgba16Float => PixmapFormat::Rgba16F,
        F::R32Float | F::D32Float => PixmapFormat::R32F,
        F::Rg32Float => PixmapFormat::Rg32F,
        F::Rgba32Float => PixmapFormat::Rgba32F,
        F::Bc1 => PixmapFormat::Bc1Rgb,
        F::Bc3 | F::Bc3Srgb => PixmapFormat::Bc3Rgba,
        F::Bc7 | F::Bc7Srgb => PixmapFormat::Bc7Rgba,
        F::B5g6r5Unorm
        | F::B5g5r5a1Unorm
        | F::B4g4r4a4Unorm
        | F::Rgb10a2Unorm
        | F::Bc2
        | F::D24Unorm
        | F::D24UnormS8Uint
        | F::D32FloatS8Uint => return None,
    })
}

/// Splits an engine filter into the texel filter and the mip level filter.
pub fn filter_mode(filter: TextureFilterMode) -> (FilterMode, MipmapMode) {
    use TextureFilterMode as M;
    match filter {
        M::Nearest | M::NearestMipmapNearest => (FilterMode::Nearest, MipmapMode::Nearest),
        M::NearestMipmapLinear => (FilterMode::Nearest, MipmapMode::Linear),
        M::Linear | M::LinearMipmapNearest => (FilterMode::Linear, MipmapMode::Nearest),
        M::LinearMipmapLinear => (FilterMode::Linear, MipmapMode::Linear),
    }
}

/// Maps a wrap mode to an address mode.
pub fn address_mode(wrap: TextureWrapMode) -> AddressMode {
    match wrap {
        TextureWrapMode::Clamp => AddressMode::ClampToEdge,
        TextureWrapMode::Mirror => AddressMode::MirroredRepeat,
        TextureWrapMode::Repeat => AddressMode::Repeat,
    }
}

/// Maps a texture class to a texture kind.
pub fn texture_kind(class: TextureClass) -> TextureKind {
    match class {
        TextureClass::D2 => TextureKind::D2,
        TextureClass::Cubemap => TextureKind::Cube,
    }
}

/// Maps a primitive to a topology.
pub fn primitive_topology(primitive: Primitive) -> PrimitiveTopology {
    match primitive {
        Primitive::Points => PrimitiveTopology::PointList,
        Primitive::LineStrip => PrimitiveTopology::LineStrip,
        Primitive::Lines => PrimitiveTopology::LineList,
        Primitive::TriangleStrip => PrimitiveTopology::TriangleStrip,
        Primitive::Triangles => PrimitiveTopology::TriangleList,
    }
}

/// Maps a cull face mode to a cull mode. Devices cannot cull both faces.
pub fn cull_mode(mode: CullFaceMode) -> CullMode {
    match mode {
        CullFaceMode::Back => CullMode::Back,
        CullFaceMode::Front => CullMode::Front,
        CullFaceMode::Both => CullMode::None,
    }
}

/// Maps a depth test function to a compare function.
pub fn compare_function(func: DepthTestFunc) -> CompareFunction {
    match func {
        DepthTestFunc::Never => CompareFunction::Never,
        DepthTestFunc::Always => CompareFunction::Always,
        DepthTestFunc::Equal => CompareFunction::Equal,
        DepthTestFunc::NotEqual => CompareFunction::NotEqual,
        DepthTestFunc::Less => CompareFunction::Less,
        DepthTestFunc::LEqual => CompareFunction::LessEqual,
        DepthTestFunc::Greater => CompareFunction::Greater,
        DepthTestFunc::GEqual => CompareFunction::GreaterEqual,
    }
}

/// Maps a blend op to a blend operation.
pub fn blend_operation(op: BlendOp) -> BlendOperation {
    match op {
        BlendOp::Add => BlendOperation::Add,
        BlendOp::Sub => BlendOperation::Subtract,
        BlendOp::RevSub => BlendOperation::ReverseSubtract,
        BlendOp::Min => BlendOperation::Min,
        BlendOp::Max => BlendOperation::Max,
    }
}

/// Maps an engine blend factor to a device blend factor.
pub fn blend_factor(factor: api::BlendFactor) -> BlendFactor {
    use api::BlendFactor as B;
    match factor {
        B::Zero => BlendFactor::Zero,
        B::One => BlendFactor::One,
        B::SrcColor => BlendFactor::SrcColor,
        B::InvSrcColor => BlendFactor::OneMinusSrcColor,
        B::SrcAlpha => BlendFactor::SrcAlpha,
        B::InvSrcAlpha => BlendFactor::OneMinusSrcAlpha,
        B::DstColor => BlendFactor::DstColor,
        B::InvDstColor => BlendFactor::OneMinusDstColor,
        B::DstAlpha => BlendFactor::DstAlpha,
        B::InvDstAlpha => BlendFactor::OneMinusDstAlpha,
    }
}

/// Expands a packed blend mode into the per-target blend state.
///
/// Blending is disabled for [`BlendMode::NONE`]; all channels are always written.
pub fn blend_state(mode: BlendMode) -> ColorTargetBlendState {
    ColorTargetBlendState {
        enable_blend: mode != BlendMode::NONE,
        src_color_factor: blend_factor(mode.factor(BlendComponent::SrcColor)),
        dst_color_factor: blend_factor(mode.factor(BlendComponent::DstColor)),
        color_op: blend_operation(mode.op(BlendComponent::ColorOp)),
        src_alpha_factor: blend_factor(mode.factor(BlendComponent::SrcAlpha)),
        dst_alpha_factor: blend_factor(mode.factor(BlendComponent::DstAlpha)),
        alpha_op: blend_operation(mode.op(BlendComponent::AlphaOp)),
        write_mask: ColorWriteMask::ALL,
    }
}

/// Maps a vertex attribute to a device vertex element format.
///
/// Returns `None` for combinations the device cannot fetch, such as 3-component
/// byte vectors or integer data converted to float without normalization.
pub fn vertex_element_format(spec: VertexAttribSpec) -> Option<VertexElementFormat> {
    use VertexAttribConversion as C;
    use VertexAttribType as T;
    use VertexElementFormat as V;

    Some(match (spec.ty, spec.conversion, spec.elements) {
        (T::Byte, C::Int, 2) => V::Byte2,
        (T::Byte, C::Int, 4) => V::Byte4,
        (T::Byte, C::FloatNormalized, 2) => V::Byte2Norm,
        (T::Byte, C::FloatNormalized, 4) => V::Byte4Norm,
        (T::Ubyte, C::Int, 2) => V::Ubyte2,
        (T::Ubyte, C::Int, 4) => V::Ubyte4,
        (T::Ubyte, C::FloatNormalized, 2) => V::Ubyte2Norm,
        (T::Ubyte, C::FloatNormalized, 4) => V::Ubyte4Norm,
        (T::Short, C::Int, 2) => V::Short2,
        (T::Short, C::Int, 4) => V::Short4,
        (T::Short, C::FloatNormalized, 2) => V::Short2Norm,
        (T::Short, C::FloatNormalized, 4) => V::Short4Norm,
        (T::Ushort, C::Int, 2) => V::Ushort2,
        (T::Ushort, C::Int, 4) => V::Ushort4,
        (T::Ushort, C::FloatNormalized, 2) => V::Ushort2Norm,
        (T::Ushort, C::FloatNormalized, 4) => V::Ushort4Norm,
        (T::Int, C::Int, 1) => V::Int,
        (T::Int, C::Int, 2) => V::Int2,
        (T::Int, C::Int, 3) => V::Int3,
        (T::Int, C::Int, 4) => V::Int4,
        (T::Uint, C::Int, 1) => V::Uint,
        (T::Uint, C::Int, 2) => V::Uint2,
        (T::Uint, C::Int, 3) => V::Uint3,
        (T::Uint, C::Int, 4) => V::Uint4,
        (T::Float, C::Float | C::FloatNormalized, 1) => V::Float,
        (T::Float, C::Float | C::FloatNormalized, 2) => V::Float2,
        (T::Float, C::Float | C::FloatNormalized, 3) => V::Float3,
        (T::Float, C::Float | C::FloatNormalized, 4) => V::Float4,
        (T::Half, C::Float | C::FloatNormalized, 2) => V::Half2,
        (T::Half, C::Float | C::FloatNormalized, 4) => V::Half4,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [TextureType; 30] = [
        TextureType::Rgba8,
        TextureType::Rgb8,
        TextureType::Rg8,
        TextureType::R8,
        TextureType::Rgba16,
        TextureType::Rgb16,
        TextureType::Rg16,
        TextureType::R16,
        TextureType::Rgba16Float,
        TextureType::Rgb16Float,
        TextureType::Rg16Float,
        TextureType::R16Float,
        TextureType::Rgba32Float,
        TextureType::Rgb32Float,
        TextureType::Rg32Float,
        TextureType::R32Float,
        TextureType::Depth8,
        TextureType::Depth16,
        TextureType::Depth24,
        TextureType::Depth32,
        TextureType::Depth16Float,
        TextureType::Depth32Float,
        TextureType::CompressedEtc1Rgb,
        TextureType::CompressedEtc2Rgba,
        TextureType::CompressedBc1Rgb,
        TextureType::CompressedBc3Rgba,
        TextureType::CompressedBc4R,
        TextureType::CompressedBc5Rg,
        TextureType::CompressedBc7Rgba,
        TextureType::CompressedAstc4x4Rgba,
    ];

    #[test]
    fn test_remapped_types_have_formats() {
        for ty in ALL_TYPES {
            let remapped = remap_texture_type(ty);
            if remapped != ty {
                assert!(
                    texture_type_to_format(remapped).is_some(),
                    "{} remaps to unsupported {}",
                    ty.name(),
                    remapped.name()
                );
            }
        }
    }

    #[test]
    fn test_rgb16f_remaps_to_rgba16f() {
        assert_eq!(
            remap_texture_type(TextureType::Rgb16Float),
            TextureType::Rgba16Float
        );
        assert_eq!(remap_texture_type(TextureType::R16), TextureType::Rg16);
        assert_eq!(remap_texture_type(TextureType::Rgba8), TextureType::Rgba8);
    }

    #[test]
    fn test_unsupported_compressed_types() {
        assert_eq!(texture_type_to_format(TextureType::CompressedEtc1Rgb), None);
        assert_eq!(
            texture_type_to_format(remap_texture_type(TextureType::CompressedBc4R)),
            None
        );
    }

    #[test]
    fn test_srgb_variants() {
        assert_eq!(
            format_to_srgb(TextureFormat::Rgba8Unorm),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(format_to_srgb(TextureFormat::Rgba16Float), None);
        for format in TextureFormat::ALL {
            if let Some(srgb) = format_to_srgb(format) {
                assert!(srgb.is_srgb());
                assert_eq!(format_to_pixmap_format(srgb), format_to_pixmap_format(format));
            }
        }
    }

    #[test]
    fn test_pixmap_formats_match_texel_size() {
        for format in TextureFormat::ALL {
            if let Some(pixmap) = format_to_pixmap_format(format) {
                assert_eq!(
                    pixmap.data_size(8, 8) as u64,
                    format.data_size(8, 8),
                    "{format:?} vs {pixmap:?}"
                );
            }
        }
        assert_eq!(
            format_to_pixmap_format(TextureFormat::Rgba32Float),
            Some(PixmapFormat::Rgba32F)
        );
        assert_eq!(format_to_pixmap_format(TextureFormat::D24Unorm), None);
    }

    #[test]
    fn test_blend_state_for_none_disables_blending() {
        assert!(!blend_state(BlendMode::NONE).enable_blend);
        let alpha = blend_state(BlendMode::ALPHA);
        assert!(alpha.enable_blend);
        assert_eq!(alpha.src_color_factor, BlendFactor::SrcAlpha);
        assert_eq!(alpha.dst_color_factor, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(alpha.write_mask, ColorWriteMask::ALL);
    }

    #[test]
    fn test_vertex_formats() {
        let spec = |elements, ty, conversion| VertexAttribSpec {
            elements,
            ty,
            conversion,
        };
        assert_eq!(
            vertex_element_format(spec(3, VertexAttribType::Float, VertexAttribConversion::Float)),
            Some(VertexElementFormat::Float3)
        );
        assert_eq!(
            vertex_element_format(spec(
                4,
                VertexAttribType::Ubyte,
                VertexAttribConversion::FloatNormalized
            )),
            Some(VertexElementFormat::Ubyte4Norm)
        );
        assert_eq!(
            vertex_element_format(spec(3, VertexAttribType::Ubyte, VertexAttribConversion::Int)),
            None
        );
        assert_eq!(
            vertex_element_format(spec(2, VertexAttribType::Short, VertexAttribConversion::Float)),
            None
        );
    }

    #[test]
    fn test_min_filter_splits_mipmap_mode() {
        assert_eq!(
            filter_mode(TextureFilterMode::NearestMipmapLinear),
            (FilterMode::Nearest, MipmapMode::Linear)
        );
        assert_eq!(
            filter_mode(TextureFilterMode::Linear),
            (FilterMode::Linear, MipmapMode::Nearest)
        );
        assert_eq!(cull_mode(CullFaceMode::Both), CullMode::None);
    }
}
