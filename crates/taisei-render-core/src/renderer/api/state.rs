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

//! Fixed-function render state enums.

use crate::render_bitflags;

render_bitflags! {
    /// Fixed-function features that can be toggled at runtime.
    pub struct Capabilities: u32 {
        /// Depth testing.
        const DEPTH_TEST = 1 << 0;
        /// Depth writes.
        const DEPTH_WRITE = 1 << 1;
        /// Face culling.
        const CULL_FACE = 1 << 2;
    }
}

render_bitflags! {
    /// The buffers of a framebuffer a clear affects.
    pub struct BufferKind: u32 {
        /// The color outputs.
        const COLOR = 1 << 0;
        /// The depth attachment.
        const DEPTH = 1 << 1;
    }
}

/// Which faces are culled when [`Capabilities::CULL_FACE`] is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFaceMode {
    /// Cull back faces.
    #[default]
    Back,
    /// Cull front faces.
    Front,
    /// Cull both. Treated as no culling by the device.
    Both,
}

impl CullFaceMode {
    /// Returns the non-zero id used in pipeline keys, where 0 means culling is disabled.
    pub const fn key_id(self) -> u8 {
        match self {
            CullFaceMode::Front => 1,
            CullFaceMode::Back => 2,
            CullFaceMode::Both => 3,
        }
    }
}

/// The depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DepthTestFunc {
    /// Never passes.
    Never = 0,
    /// Always passes.
    Always,
    /// Passes if equal.
    Equal,
    /// Passes if not equal.
    NotEqual,
    /// Passes if less.
    #[default]
    Less,
    /// Passes if less or equal.
    LEqual,
    /// Passes if greater.
    Greater,
    /// Passes if greater or equal.
    GEqual,
}

/// The matrices fed to the matrix magic uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixMode {
    /// `r_modelViewMatrix`
    ModelView,
    /// `r_projectionMatrix`
    Projection,
    /// `r_textureMatrix`
    Texture,
}

impl MatrixMode {
    /// Returns the index of the mode.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A column-major 4x4 matrix.
pub type Mat4 = [f32; 16];

/// The identity matrix.
pub const MAT4_IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// The primitive topology of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Primitive {
    /// Points.
    Points = 0,
    /// A connected line.
    LineStrip,
    /// Independent lines.
    Lines,
    /// A strip of triangles.
    TriangleStrip,
    /// Independent triangles.
    Triangles,
}
