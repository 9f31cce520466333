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

//! The machinery translating the engine-facing API into device commands.
//!
//! [`RenderContext`] owns every backend object and the render state. The other modules
//! each cover one concern and are usable on their own against any [`GpuDevice`]:
//!
//! - [`pipeline_cache`]: render state to compiled pipeline, with invalidation.
//! - [`cached_buffer`] and [`common_buffer`]: CPU shadow copies of device buffers.
//! - [`texture`]: device textures, samplers and uploads.
//! - [`readback`]: asynchronous texture downloads.
//! - [`frame`]: the per-frame command stream.
//!
//! [`GpuDevice`]: crate::renderer::GpuDevice

pub mod arena;
pub mod cached_buffer;
pub mod common_buffer;
pub mod context;
pub mod format;
pub mod frame;
pub mod framebuffer;
pub mod ids;
pub mod pipeline_cache;
pub mod readback;
pub mod shader_object;
pub mod shader_program;
pub mod texture;
pub mod vertex_array;

#[cfg(test)]
pub(crate) mod mock;

pub use self::context::{RenderContext, RenderState};

use self::arena::Handle;

/// A handle to a texture owned by a [`RenderContext`].
pub type TextureHandle = Handle<texture::Texture>;
/// A handle to a framebuffer owned by a [`RenderContext`].
pub type FramebufferHandle = Handle<framebuffer::Framebuffer>;
/// A handle to a shader object owned by a [`RenderContext`].
pub type ShaderObjectHandle = Handle<shader_object::ShaderObject>;
/// A handle to a shader program owned by a [`RenderContext`].
pub type ShaderProgramHandle = Handle<shader_program::ShaderProgram>;
/// A handle to a vertex buffer owned by a [`RenderContext`].
pub type VertexBufferHandle = Handle<common_buffer::VertexBuffer>;
/// A handle to an index buffer owned by a [`RenderContext`].
pub type IndexBufferHandle = Handle<common_buffer::IndexBuffer>;
/// A handle to a vertex array owned by a [`RenderContext`].
pub type VertexArrayHandle = Handle<vertex_array::VertexArray>;
