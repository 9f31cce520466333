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

//! Defines the fixed-function state and descriptor of a device graphics pipeline.

use super::shader::ShaderId;
use super::texture::TextureFormat;
use crate::render_bitflags;
use std::borrow::Cow;

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Every vertex is a point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Consecutive vertices form a connected line.
    LineStrip,
    /// Every three vertices form a triangle.
    TriangleList,
    /// Consecutive vertices form a strip of triangles.
    TriangleStrip,
}

/// Which faces are discarded by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// No culling.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
}

/// The winding order of front-facing triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    /// Counter-clockwise.
    CounterClockwise,
    /// Clockwise.
    Clockwise,
}

/// How triangles are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Fill the interior.
    Fill,
    /// Draw edges only.
    Line,
}

/// A depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the new value is less.
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less or equal.
    LessEqual,
    /// Passes if the new value is greater.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the new value is greater or equal.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// The operation combining source and destination in blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// `src + dst`
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// A multiplier applied to a blending operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source color.
    SrcColor,
    /// 1 - source color.
    OneMinusSrcColor,
    /// Destination color.
    DstColor,
    /// 1 - destination color.
    OneMinusDstColor,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    OneMinusSrcAlpha,
    /// Destination alpha.
    DstAlpha,
    /// 1 - destination alpha.
    OneMinusDstAlpha,
}

render_bitflags! {
    /// The channels written to a color target.
    pub struct ColorWriteMask: u8 {
        /// Red.
        const R = 1 << 0;
        /// Green.
        const G = 1 << 1;
        /// Blue.
        const B = 1 << 2;
        /// Alpha.
        const A = 1 << 3;
    }
}

/// The blend equation of one color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetBlendState {
    /// Whether blending is enabled at all.
    pub enable_blend: bool,
    /// Source color factor.
    pub src_color_factor: BlendFactor,
    /// Destination color factor.
    pub dst_color_factor: BlendFactor,
    /// Color operation.
    pub color_op: BlendOperation,
    /// Source alpha factor.
    pub src_alpha_factor: BlendFactor,
    /// Destination alpha factor.
    pub dst_alpha_factor: BlendFactor,
    /// Alpha operation.
    pub alpha_op: BlendOperation,
    /// Written channels.
    pub write_mask: ColorWriteMask,
}

/// The format and blending of one color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetDescription {
    /// The attachment format.
    pub format: TextureFormat,
    /// The blend state.
    pub blend_state: ColorTargetBlendState,
}

/// Rasterizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizerState {
    /// Polygon fill mode.
    pub fill_mode: FillMode,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Front face winding.
    pub front_face: FrontFace,
}

/// Multisampling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultisampleState {
    /// Samples per pixel.
    pub sample_count: u32,
    /// Coverage mask.
    pub sample_mask: u32,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            sample_count: 1,
            sample_mask: 0xFFFF,
        }
    }
}

/// Depth and stencil testing configuration. Stencil is never enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// The depth comparison.
    pub compare_op: CompareFunction,
    /// Whether the depth test runs.
    pub enable_depth_test: bool,
    /// Whether passing fragments write depth.
    pub enable_depth_write: bool,
}

/// The layout of one vertex attribute in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementFormat {
    /// Two signed bytes.
    Byte2,
    /// Four signed bytes.
    Byte4,
    /// Two signed normalized bytes.
    Byte2Norm,
    /// Four signed normalized bytes.
    Byte4Norm,
    /// Two unsigned bytes.
    Ubyte2,
    /// Four unsigned bytes.
    Ubyte4,
    /// Two unsigned normalized bytes.
    Ubyte2Norm,
    /// Four unsigned normalized bytes.
    Ubyte4Norm,
    /// Two signed shorts.
    Short2,
    /// Four signed shorts.
    Short4,
    /// Two signed normalized shorts.
    Short2Norm,
    /// Four signed normalized shorts.
    Short4Norm,
    /// Two unsigned shorts.
    Ushort2,
    /// Four unsigned shorts.
    Ushort4,
    /// Two unsigned normalized shorts.
    Ushort2Norm,
    /// Four unsigned normalized shorts.
    Ushort4Norm,
    /// One signed int.
    Int,
    /// Two signed ints.
    Int2,
    /// Three signed ints.
    Int3,
    /// Four signed ints.
    Int4,
    /// One unsigned int.
    Uint,
    /// Two unsigned ints.
    Uint2,
    /// Three unsigned ints.
    Uint3,
    /// Four unsigned ints.
    Uint4,
    /// One float.
    Float,
    /// Two floats.
    Float2,
    /// Three floats.
    Float3,
    /// Four floats.
    Float4,
    /// Two half floats.
    Half2,
    /// Four half floats.
    Half4,
}

impl VertexElementFormat {
    /// Returns the size of the element in bytes.
    pub const fn size(self) -> u32 {
        use VertexElementFormat::*;
        match self {
            Byte2 | Byte2Norm | Ubyte2 | Ubyte2Norm => 2,
            Byte4 | Byte4Norm | Ubyte4 | Ubyte4Norm => 4,
            Short2 | Short2Norm | Ushort2 | Ushort2Norm | Half2 => 4,
            Short4 | Short4Norm | Ushort4 | Ushort4Norm | Half4 => 8,
            Int | Uint | Float => 4,
            Int2 | Uint2 | Float2 => 8,
            Int3 | Uint3 | Float3 => 12,
            Int4 | Uint4 | Float4 => 16,
        }
    }
}

/// Whether a vertex buffer advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    /// Advance per vertex.
    Vertex,
    /// Advance per instance.
    Instance,
}

/// One vertex buffer slot of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferDescription {
    /// The binding slot.
    pub slot: u32,
    /// Byte distance between consecutive elements.
    pub pitch: u32,
    /// Step rate.
    pub input_rate: VertexInputRate,
}

/// One vertex attribute of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// The vertex buffer slot read from.
    pub buffer_slot: u32,
    /// Memory format.
    pub format: VertexElementFormat,
    /// Byte offset inside an element.
    pub offset: u32,
}

/// The complete vertex input layout of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexInputState {
    /// The vertex buffer slots.
    pub buffers: Vec<VertexBufferDescription>,
    /// The attributes.
    pub attributes: Vec<VertexAttribute>,
}

/// A descriptor used to create a graphics pipeline.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The vertex shader.
    pub vertex_shader: ShaderId,
    /// The fragment shader.
    pub fragment_shader: ShaderId,
    /// Vertex input layout.
    pub vertex_input: VertexInputState,
    /// Primitive topology.
    pub primitive_type: PrimitiveTopology,
    /// Rasterizer configuration.
    pub rasterizer: RasterizerState,
    /// Multisampling configuration.
    pub multisample: MultisampleState,
    /// Depth testing configuration.
    pub depth_stencil: DepthStencilState,
    /// One entry per color output.
    pub color_targets: Vec<ColorTargetDescription>,
    /// The depth attachment format, if the pipeline renders with depth.
    pub depth_stencil_format: Option<TextureFormat>,
}

/// An opaque handle to a graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(pub usize);
