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

//! Uniform types and the uniforms filled from render state.

/// The engine-visible type of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `int`
    Int,
    /// `ivec2`
    IVec2,
    /// `ivec3`
    IVec3,
    /// `ivec4`
    IVec4,
    /// `sampler2D`
    Sampler2D,
    /// `samplerCube`
    SamplerCube,
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
}

/// How many scalars a uniform value has and how big each is, as supplied by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformTypeInfo {
    /// Scalars per value.
    pub elements: u32,
    /// Bytes per scalar.
    pub element_size: u32,
}

impl UniformType {
    /// Returns `true` for sampler types.
    pub const fn is_sampler(self) -> bool {
        matches!(self, UniformType::Sampler2D | UniformType::SamplerCube)
    }

    /// Returns the layout of one tightly packed value of this type.
    pub const fn info(self) -> UniformTypeInfo {
        let (elements, element_size) = match self {
            UniformType::Float | UniformType::Int => (1, 4),
            UniformType::Vec2 | UniformType::IVec2 => (2, 4),
            UniformType::Vec3 | UniformType::IVec3 => (3, 4),
            UniformType::Vec4 | UniformType::IVec4 => (4, 4),
            UniformType::Mat3 => (9, 4),
            UniformType::Mat4 => (16, 4),
            UniformType::Sampler2D | UniformType::SamplerCube => (1, 0),
        };
        UniformTypeInfo {
            elements,
            element_size,
        }
    }

    /// Returns the GLSL spelling of the type.
    pub const fn name(self) -> &'static str {
        match self {
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
            UniformType::Int => "int",
            UniformType::IVec2 => "ivec2",
            UniformType::IVec3 => "ivec3",
            UniformType::IVec4 => "ivec4",
            UniformType::Sampler2D => "sampler2D",
            UniformType::SamplerCube => "samplerCube",
            UniformType::Mat3 => "mat3",
            UniformType::Mat4 => "mat4",
        }
    }
}

/// A uniform the backend fills from render state before every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagicUniform {
    /// `r_modelViewMatrix`
    ModelViewMatrix,
    /// `r_projectionMatrix`
    ProjectionMatrix,
    /// `r_textureMatrix`
    TextureMatrix,
    /// `r_color`
    Color,
    /// `r_viewport`
    Viewport,
}

impl MagicUniform {
    /// Every magic uniform.
    pub const ALL: [MagicUniform; 5] = [
        MagicUniform::ModelViewMatrix,
        MagicUniform::ProjectionMatrix,
        MagicUniform::TextureMatrix,
        MagicUniform::Color,
        MagicUniform::Viewport,
    ];

    /// Returns the uniform name shaders declare.
    pub const fn name(self) -> &'static str {
        match self {
            MagicUniform::ModelViewMatrix => "r_modelViewMatrix",
            MagicUniform::ProjectionMatrix => "r_projectionMatrix",
            MagicUniform::TextureMatrix => "r_textureMatrix",
            MagicUniform::Color => "r_color",
            MagicUniform::Viewport => "r_viewport",
        }
    }

    /// Returns the type shaders must declare it with.
    pub const fn ty(self) -> UniformType {
        match self {
            MagicUniform::ModelViewMatrix
            | MagicUniform::ProjectionMatrix
            | MagicUniform::TextureMatrix => UniformType::Mat4,
            MagicUniform::Color | MagicUniform::Viewport => UniformType::Vec4,
        }
    }

    /// Returns the position in [`MagicUniform::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks a magic uniform up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_lookup() {
        assert_eq!(MagicUniform::from_name("r_color"), Some(MagicUniform::Color));
        assert_eq!(MagicUniform::from_name("color"), None);
        for (i, m) in MagicUniform::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
        }
    }
}
