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

use taisei_render_core::math::Color;
use taisei_render_core::renderer::gpu::{
    AddressMode, BlendFactor, BlendOperation, BufferUsage, ColorWriteMask, CompareFunction,
    CullMode, FillMode, FilterMode, FrontFace, IndexFormat, MipmapMode, PrimitiveTopology,
    ShaderStage, StoreOp, TextureFormat, TextureKind, TextureUsage, VertexElementFormat,
    VertexInputRate,
};

/// A local extension trait to convert our engine's types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Texture formats ---

/// Returns the wgpu equivalent of a texture format, if wgpu has one.
///
/// The packed 16-bit formats and the alpha-only format have none.
pub fn to_wgpu_texture_format(format: TextureFormat) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as W;
    Some(match format {
        TextureFormat::R8Unorm => W::R8Unorm,
        TextureFormat::Rg8Snorm => W::Rg8Snorm,
        TextureFormat::Rgba8Unorm => W::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => W::Rgba8UnormSrgb,
        TextureFormat::Rgba8Snorm => W::Rgba8Snorm,
        TextureFormat::Bgra8Unorm => W::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => W::Bgra8UnormSrgb,
        TextureFormat::R8Uint => W::R8Uint,
        TextureFormat::Rg8Uint => W::Rg8Uint,
        TextureFormat::Rgba8Uint => W::Rgba8Uint,
        TextureFormat::Rg16Unorm => W::Rg16Unorm,
        TextureFormat::Rgba16Unorm => W::Rgba16Unorm,
        TextureFormat::R16Uint => W::R16Uint,
        TextureFormat::Rg16Uint => W::Rg16Uint,
        TextureFormat::Rgba16Uint => W::Rgba16Uint,
        TextureFormat::R16Float => W::R16Float,
        TextureFormat::Rg16Float => W::Rg16Float,
        TextureFormat::Rgba16Float => W::Rgba16Float,
        TextureFormat::R32Float => W::R32Float,
        TextureFormat::Rg32Float => W::Rg32Float,
        TextureFormat::Rgba32Float => W::Rgba32Float,
        TextureFormat::Rgb10a2Unorm => W::Rgb10a2Unorm,
        TextureFormat::Bc1 => W::Bc1RgbaUnorm,
        TextureFormat::Bc2 => W::Bc2RgbaUnorm,
        TextureFormat::Bc3 => W::Bc3RgbaUnorm,
        TextureFormat::Bc3Srgb => W::Bc3RgbaUnormSrgb,
        TextureFormat::Bc7 => W::Bc7RgbaUnorm,
        TextureFormat::Bc7Srgb => W::Bc7RgbaUnormSrgb,
        TextureFormat::D16Unorm => W::Depth16Unorm,
        TextureFormat::D24Unorm => W::Depth24Plus,
        TextureFormat::D32Float => W::Depth32Float,
        TextureFormat::D24UnormS8Uint => W::Depth24PlusStencil8,
        TextureFormat::D32FloatS8Uint => W::Depth32FloatStencil8,
        TextureFormat::A8Unorm
        | TextureFormat::B5g6r5Unorm
        | TextureFormat::B5g5r5a1Unorm
        | TextureFormat::B4g4r4a4Unorm => return None,
    })
}

/// Maps a wgpu texture format back to ours, e.g. for the surface format.
pub fn from_wgpu_texture_format(format: wgpu::TextureFormat) -> Option<TextureFormat> {
    TextureFormat::ALL
        .into_iter()
        .find(|&f| to_wgpu_texture_format(f) == Some(format))
}

impl IntoWgpu<wgpu::TextureViewDimension> for TextureKind {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureKind::D2 => wgpu::TextureViewDimension::D2,
            TextureKind::Cube => wgpu::TextureViewDimension::Cube,
        }
    }
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        // Every texture is a copy source and destination: uploads, dumps and readbacks.
        let mut usages = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
        if self.contains(TextureUsage::SAMPLER) {
            usages |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if self.intersects(TextureUsage::COLOR_TARGET | TextureUsage::DEPTH_STENCIL_TARGET) {
            usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        usages
    }
}

// --- Samplers ---

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for MipmapMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            MipmapMode::Nearest => wgpu::FilterMode::Nearest,
            MipmapMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

// --- Buffers ---

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::COPY_DST;
        if self.contains(BufferUsage::VERTEX) {
            usages |= wgpu::BufferUsages::VERTEX;
        }
        if self.contains(BufferUsage::INDEX) {
            usages |= wgpu::BufferUsages::INDEX;
        }
        if self.contains(BufferUsage::INDIRECT) {
            usages |= wgpu::BufferUsages::INDIRECT;
        }
        usages
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FrontFace {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FrontFace::CounterClockwise => wgpu::FrontFace::Ccw,
            FrontFace::Clockwise => wgpu::FrontFace::Cw,
        }
    }
}

impl IntoWgpu<wgpu::PolygonMode> for FillMode {
    fn into_wgpu(self) -> wgpu::PolygonMode {
        match self {
            FillMode::Fill => wgpu::PolygonMode::Fill,
            FillMode::Line => wgpu::PolygonMode::Line,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<wgpu::BlendOperation> for BlendOperation {
    fn into_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOperation::Add => wgpu::BlendOperation::Add,
            BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
            BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOperation::Min => wgpu::BlendOperation::Min,
            BlendOperation::Max => wgpu::BlendOperation::Max,
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::DstColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        }
    }
}

impl IntoWgpu<wgpu::ColorWrites> for ColorWriteMask {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        // Same bit order as wgpu: R, G, B, A from the lowest bit up.
        wgpu::ColorWrites::from_bits_truncate(u32::from(self.bits()))
    }
}

impl IntoWgpu<wgpu::VertexFormat> for VertexElementFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        use wgpu::VertexFormat as W;
        match self {
            VertexElementFormat::Byte2 => W::Sint8x2,
            VertexElementFormat::Byte4 => W::Sint8x4,
            VertexElementFormat::Byte2Norm => W::Snorm8x2,
            VertexElementFormat::Byte4Norm => W::Snorm8x4,
            VertexElementFormat::Ubyte2 => W::Uint8x2,
            VertexElementFormat::Ubyte4 => W::Uint8x4,
            VertexElementFormat::Ubyte2Norm => W::Unorm8x2,
            VertexElementFormat::Ubyte4Norm => W::Unorm8x4,
            VertexElementFormat::Short2 => W::Sint16x2,
            VertexElementFormat::Short4 => W::Sint16x4,
            VertexElementFormat::Short2Norm => W::Snorm16x2,
            VertexElementFormat::Short4Norm => W::Snorm16x4,
            VertexElementFormat::Ushort2 => W::Uint16x2,
            VertexElementFormat::Ushort4 => W::Uint16x4,
            VertexElementFormat::Ushort2Norm => W::Unorm16x2,
            VertexElementFormat::Ushort4Norm => W::Unorm16x4,
            VertexElementFormat::Int => W::Sint32,
            VertexElementFormat::Int2 => W::Sint32x2,
            VertexElementFormat::Int3 => W::Sint32x3,
            VertexElementFormat::Int4 => W::Sint32x4,
            VertexElementFormat::Uint => W::Uint32,
            VertexElementFormat::Uint2 => W::Uint32x2,
            VertexElementFormat::Uint3 => W::Uint32x3,
            VertexElementFormat::Uint4 => W::Uint32x4,
            VertexElementFormat::Float => W::Float32,
            VertexElementFormat::Float2 => W::Float32x2,
            VertexElementFormat::Float3 => W::Float32x3,
            VertexElementFormat::Float4 => W::Float32x4,
            VertexElementFormat::Half2 => W::Float16x2,
            VertexElementFormat::Half4 => W::Float16x4,
        }
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for VertexInputRate {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            VertexInputRate::Vertex => wgpu::VertexStepMode::Vertex,
            VertexInputRate::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl IntoWgpu<wgpu::ShaderStages> for ShaderStage {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        match self {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        }
    }
}

// --- Render passes ---

impl IntoWgpu<wgpu::StoreOp> for StoreOp {
    fn into_wgpu(self) -> wgpu::StoreOp {
        match self {
            StoreOp::Store => wgpu::StoreOp::Store,
            StoreOp::DontCare => wgpu::StoreOp::Discard,
        }
    }
}

impl IntoWgpu<wgpu::Color> for Color {
    fn into_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.r),
            g: f64::from(self.g),
            b: f64::from(self.b),
            a: f64::from(self.a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_formats_map_back() {
        for format in TextureFormat::ALL {
            if let Some(wgpu_format) = to_wgpu_texture_format(format) {
                assert_eq!(from_wgpu_texture_format(wgpu_format), Some(format));
            }
        }
    }

    #[test]
    fn test_unrepresentable_formats() {
        assert_eq!(to_wgpu_texture_format(TextureFormat::A8Unorm), None);
        assert_eq!(to_wgpu_texture_format(TextureFormat::B5g6r5Unorm), None);
        assert_eq!(
            to_wgpu_texture_format(TextureFormat::D24Unorm),
            Some(wgpu::TextureFormat::Depth24Plus)
        );
    }

    #[test]
    fn test_write_mask_bits_line_up() {
        let mask: wgpu::ColorWrites = (ColorWriteMask::R | ColorWriteMask::A).into_wgpu();
        assert_eq!(mask, wgpu::ColorWrites::RED | wgpu::ColorWrites::ALPHA);
        let all: wgpu::ColorWrites = ColorWriteMask::ALL.into_wgpu();
        assert_eq!(all, wgpu::ColorWrites::ALL);
    }

    #[test]
    fn test_every_texture_is_copyable() {
        let usages: wgpu::TextureUsages = TextureUsage::SAMPLER.into_wgpu();
        assert!(usages.contains(wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST));
        assert!(!usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
    }
}
