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

//! Vertex attribute layouts.

/// The storage type of a vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribType {
    /// Signed byte.
    Byte,
    /// Unsigned byte.
    Ubyte,
    /// Signed short.
    Short,
    /// Unsigned short.
    Ushort,
    /// Signed int.
    Int,
    /// Unsigned int.
    Uint,
    /// Half float.
    Half,
    /// Float.
    Float,
}

impl VertexAttribType {
    /// Returns the size of one component in bytes.
    pub const fn size(self) -> u32 {
        match self {
            VertexAttribType::Byte | VertexAttribType::Ubyte => 1,
            VertexAttribType::Short | VertexAttribType::Ushort | VertexAttribType::Half => 2,
            VertexAttribType::Int | VertexAttribType::Uint | VertexAttribType::Float => 4,
        }
    }
}

/// How the shader sees an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribConversion {
    /// Converted to float as is.
    Float,
    /// Converted to float and normalized to `[0, 1]` or `[-1, 1]`.
    FloatNormalized,
    /// Kept as an integer.
    Int,
}

/// The component layout of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribSpec {
    /// Component count, 1 to 4.
    pub elements: u8,
    /// Component storage type.
    pub ty: VertexAttribType,
    /// Shader-side conversion.
    pub conversion: VertexAttribConversion,
}

/// The placement of one attribute inside a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribFormat {
    /// Component layout.
    pub spec: VertexAttribSpec,
    /// Byte distance between consecutive vertices.
    pub stride: u32,
    /// Byte offset inside a vertex.
    pub offset: u32,
    /// The vertex array attachment slot holding the buffer.
    pub attachment: u32,
}

impl VertexAttribFormat {
    /// Builds interleaved formats for `specs`, all read from `attachment`.
    pub fn interleaved(specs: &[VertexAttribSpec], attachment: u32) -> Vec<VertexAttribFormat> {
        let stride = specs
            .iter()
            .map(|s| s.elements as u32 * s.ty.size())
            .sum();
        let mut offset = 0;
        specs
            .iter()
            .map(|&spec| {
                let format = VertexAttribFormat {
                    spec,
                    stride,
                    offset,
                    attachment,
                };
                offset += spec.elements as u32 * spec.ty.size();
                format
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_offsets() {
        let pos = VertexAttribSpec {
            elements: 3,
            ty: VertexAttribType::Float,
            conversion: VertexAttribConversion::Float,
        };
        let color = VertexAttribSpec {
            elements: 4,
            ty: VertexAttribType::Ubyte,
            conversion: VertexAttribConversion::FloatNormalized,
        };
        let formats = VertexAttribFormat::interleaved(&[pos, color], 0);
        assert_eq!(formats[0].stride, 16);
        assert_eq!(formats[1].offset, 12);
    }
}
