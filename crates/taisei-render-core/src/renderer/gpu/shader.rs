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

//! Defines data structures related to device shader modules.

use super::texture::TextureKind;
use std::borrow::Cow;

/// The programmable stage a shader module runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The fragment stage.
    Fragment,
}

impl ShaderStage {
    /// Both stages, in pipeline order.
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Returns the stage name as used in log messages.
    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    /// Returns the descriptor set holding the stage's uniform block.
    ///
    /// Sets 0 and 2 hold the vertex and fragment samplers, sets 1 and 3 their uniforms.
    pub const fn uniform_set(self) -> u32 {
        match self {
            ShaderStage::Vertex => 1,
            ShaderStage::Fragment => 3,
        }
    }

    /// Returns the descriptor set holding the stage's samplers.
    pub const fn sampler_set(self) -> u32 {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Fragment => 2,
        }
    }
}

/// The bytecode format of a shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderFormat {
    /// SPIR-V binary, as 32-bit little-endian words.
    SpirV,
}

/// A descriptor used to create a shader module.
#[derive(Debug, Clone)]
pub struct ShaderDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The stage of the module.
    pub stage: ShaderStage,
    /// The bytecode format.
    pub format: ShaderFormat,
    /// The bytecode.
    pub code: Cow<'a, [u8]>,
    /// The entry point function.
    pub entry_point: Cow<'a, str>,
    /// The kind of texture expected at each sampler binding slot.
    pub sampler_kinds: Vec<TextureKind>,
    /// The number of uniform buffers the module reads (0 or 1).
    pub num_uniform_buffers: u32,
}

/// An opaque handle to a shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub usize);
