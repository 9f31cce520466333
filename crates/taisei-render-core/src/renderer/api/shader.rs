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

//! Shader sources and the reflection data describing their interface.

use super::uniform::UniformType;
use crate::renderer::gpu::ShaderStage;
use std::fmt;

/// The SPIR-V environment a module was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpirvTarget {
    /// Vulkan 1.0.
    Vulkan10,
    /// Vulkan 1.1.
    Vulkan11,
    /// OpenGL.
    OpenGl,
}

/// A shading language and its dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderLanguage {
    /// GLSL source.
    Glsl {
        /// The `#version` number.
        version: u32,
        /// Whether this is GLSL ES.
        es: bool,
    },
    /// HLSL source.
    Hlsl {
        /// The shader model, e.g. 50 for 5.0.
        shader_model: u32,
    },
    /// SPIR-V binary.
    Spirv {
        /// The target environment.
        target: SpirvTarget,
    },
}

impl fmt::Display for ShaderLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderLanguage::Glsl { version, es } => {
                write!(f, "GLSL {version}{}", if *es { " es" } else { "" })
            }
            ShaderLanguage::Hlsl { shader_model } => write!(f, "HLSL SM{shader_model}"),
            ShaderLanguage::Spirv { target } => write!(f, "SPIR-V ({target:?})"),
        }
    }
}

/// The scalar type of a reflected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderBaseType {
    /// 32-bit float.
    Float,
    /// 32-bit signed integer.
    Int,
    /// 32-bit unsigned integer.
    Uint,
    /// Boolean.
    Bool,
    /// Anything else (structs, doubles, ...).
    Other,
}

/// The type and memory layout of a reflected uniform block field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderDataType {
    /// Scalar type.
    pub base: ShaderBaseType,
    /// Rows of a matrix, or components of a vector.
    pub vector_size: u32,
    /// Columns of a matrix; 1 for scalars and vectors.
    pub matrix_columns: u32,
    /// Byte distance between matrix columns.
    pub matrix_stride: u32,
    /// Number of array elements; 0 if not an array.
    pub array_size: u32,
    /// Byte distance between array elements.
    pub array_stride: u32,
}

impl ShaderDataType {
    /// A non-array scalar or vector.
    pub const fn vector(base: ShaderBaseType, vector_size: u32) -> Self {
        Self {
            base,
            vector_size,
            matrix_columns: 1,
            matrix_stride: 0,
            array_size: 0,
            array_stride: 0,
        }
    }

    /// A non-array square float matrix with std140 column stride.
    pub const fn matrix(size: u32) -> Self {
        Self {
            base: ShaderBaseType::Float,
            vector_size: size,
            matrix_columns: size,
            matrix_stride: 16,
            array_size: 0,
            array_stride: 0,
        }
    }

    /// Turns the type into an array with the given element count and stride.
    pub const fn array(self, array_size: u32, array_stride: u32) -> Self {
        Self {
            array_size,
            array_stride,
            ..self
        }
    }

    /// Returns `true` if the type is an array.
    pub const fn is_array(&self) -> bool {
        self.array_size > 0
    }

    const fn column_bytes(&self) -> usize {
        self.vector_size as usize * 4
    }

    const fn column_stride(&self) -> usize {
        if self.matrix_columns > 1 {
            self.matrix_stride as usize
        } else {
            self.column_bytes()
        }
    }

    /// Returns the size of one (non-array) element in the block.
    pub const fn element_size(&self) -> usize {
        (self.matrix_columns as usize).saturating_sub(1) * self.column_stride() + self.column_bytes()
    }

    /// Returns the size of the whole field in the block.
    pub const fn size(&self) -> usize {
        if self.is_array() {
            self.array_stride as usize * self.array_size as usize
        } else {
            self.element_size()
        }
    }

    /// Maps the layout to the engine-visible uniform type, if there is one.
    pub fn to_uniform_type(&self) -> Option<UniformType> {
        match (self.base, self.matrix_columns, self.vector_size) {
            (ShaderBaseType::Float, 1, 1) => Some(UniformType::Float),
            (ShaderBaseType::Float, 1, 2) => Some(UniformType::Vec2),
            (ShaderBaseType::Float, 1, 3) => Some(UniformType::Vec3),
            (ShaderBaseType::Float, 1, 4) => Some(UniformType::Vec4),
            (ShaderBaseType::Float, 3, 3) => Some(UniformType::Mat3),
            (ShaderBaseType::Float, 4, 4) => Some(UniformType::Mat4),
            (ShaderBaseType::Int, 1, 1) => Some(UniformType::Int),
            (ShaderBaseType::Int, 1, 2) => Some(UniformType::IVec2),
            (ShaderBaseType::Int, 1, 3) => Some(UniformType::IVec3),
            (ShaderBaseType::Int, 1, 4) => Some(UniformType::IVec4),
            _ => None,
        }
    }

    /// Scatters tightly packed values from `src` into the block layout at `dst`.
    ///
    /// Each value in `src` is `matrix_columns * vector_size` scalars. Values are
    /// placed `array_stride` apart and matrix columns `matrix_stride` apart. Returns
    /// the number of values copied, which stops early when `dst` is exhausted.
    pub fn unpack_from_bytes(&self, src: &[u8], dst: &mut [u8]) -> usize {
        let column_bytes = self.column_bytes();
        let packed = column_bytes * self.matrix_columns as usize;
        if packed == 0 {
            return 0;
        }

        let element_stride = if self.is_array() {
            self.array_stride as usize
        } else {
            self.element_size()
        };

        let mut copied = 0;
        for (i, value) in src.chunks_exact(packed).enumerate() {
            let base = i * element_stride;
            if base + self.element_size() > dst.len() {
                break;
            }

            for (c, column) in value.chunks_exact(column_bytes).enumerate() {
                let at = base + c * self.column_stride();
                dst[at..at + column_bytes].copy_from_slice(column);
            }

            copied += 1;
        }

        copied
    }
}

/// A field of a reflected uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStructField {
    /// Field name.
    pub name: String,
    /// Byte offset inside the block.
    pub offset: u32,
    /// Type and layout.
    pub ty: ShaderDataType,
}

/// A reflected uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderUniformBuffer {
    /// Block name.
    pub name: String,
    /// Descriptor set.
    pub set: u32,
    /// Binding inside the set.
    pub binding: u32,
    /// Size of the block in bytes.
    pub size: u32,
    /// The block members.
    pub fields: Vec<ShaderStructField>,
}

/// The dimensionality of a reflected sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    /// 1D.
    D1,
    /// 2D.
    D2,
    /// 3D.
    D3,
    /// Cube.
    Cube,
}

/// The full type of a reflected sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderSamplerType {
    /// Dimensionality.
    pub dim: SamplerDim,
    /// Whether it is an array texture.
    pub is_arrayed: bool,
    /// Whether it is a depth comparison sampler.
    pub is_depth: bool,
    /// Whether it is multisampled.
    pub is_multisampled: bool,
}

impl ShaderSamplerType {
    /// A plain sampler of the given dimensionality.
    pub const fn plain(dim: SamplerDim) -> Self {
        Self {
            dim,
            is_arrayed: false,
            is_depth: false,
            is_multisampled: false,
        }
    }

    /// Returns the uniform type of supported samplers: plain 2D and cube.
    pub fn to_uniform_type(&self) -> Option<UniformType> {
        if self.is_arrayed || self.is_depth || self.is_multisampled {
            return None;
        }

        match self.dim {
            SamplerDim::D2 => Some(UniformType::Sampler2D),
            SamplerDim::Cube => Some(UniformType::SamplerCube),
            _ => None,
        }
    }
}

/// A reflected combined image sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSampler {
    /// Uniform name.
    pub name: String,
    /// Descriptor set.
    pub set: u32,
    /// Binding slot.
    pub binding: u32,
    /// Array length; 0 if not an array.
    pub array_size: u32,
    /// Sampler type.
    pub ty: ShaderSamplerType,
}

/// The interface of a compiled shader stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    /// Uniform blocks.
    pub uniform_buffers: Vec<ShaderUniformBuffer>,
    /// Combined image samplers.
    pub samplers: Vec<ShaderSampler>,
}

/// Compiled shader code of one stage plus its reflection data.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    /// Pipeline stage.
    pub stage: ShaderStage,
    /// Language of `code`.
    pub language: ShaderLanguage,
    /// The code.
    pub code: Vec<u8>,
    /// Reflection data produced alongside the code.
    pub reflection: Option<ShaderReflection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn test_unpack_vec3_array_uses_stride() {
        let ty = ShaderDataType::vector(ShaderBaseType::Float, 3).array(2, 16);
        let src = floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut dst = vec![0u8; ty.size()];
        assert_eq!(ty.unpack_from_bytes(&src, &mut dst), 2);
        assert_eq!(&dst[0..12], &src[0..12]);
        assert_eq!(&dst[12..16], &[0; 4]);
        assert_eq!(&dst[16..28], &src[12..24]);
    }

    #[test]
    fn test_unpack_mat3_pads_columns() {
        let ty = ShaderDataType::matrix(3);
        assert_eq!(ty.size(), 44);
        let src = floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let mut dst = vec![0u8; 48];
        assert_eq!(ty.unpack_from_bytes(&src, &mut dst), 1);
        assert_eq!(&dst[16..28], &src[12..24]);
        assert_eq!(&dst[32..44], &src[24..36]);
    }

    #[test]
    fn test_unpack_stops_at_destination_end() {
        let ty = ShaderDataType::vector(ShaderBaseType::Float, 4).array(4, 16);
        let src = floats(&[0.0; 16]);
        let mut dst = vec![0u8; 32];
        assert_eq!(ty.unpack_from_bytes(&src, &mut dst), 2);
    }

    #[test]
    fn test_uniform_type_mapping() {
        assert_eq!(
            ShaderDataType::matrix(4).to_uniform_type(),
            Some(UniformType::Mat4)
        );
        assert_eq!(
            ShaderDataType::vector(ShaderBaseType::Bool, 1).to_uniform_type(),
            None
        );
        let depth = ShaderSamplerType {
            is_depth: true,
            ..ShaderSamplerType::plain(SamplerDim::D2)
        };
        assert_eq!(depth.to_uniform_type(), None);
        assert_eq!(
            ShaderSamplerType::plain(SamplerDim::Cube).to_uniform_type(),
            Some(UniformType::SamplerCube)
        );
    }
}
