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

//! Vertex buffers, index buffers and vertex arrays of the rendering context.

use super::RenderContext;
use crate::renderer::api::VertexAttribFormat;
use crate::renderer::backend::common_buffer::{IndexBuffer, VertexBuffer};
use crate::renderer::backend::vertex_array::VertexArray;
use crate::renderer::backend::{IndexBufferHandle, VertexArrayHandle, VertexBufferHandle};
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::gpu::IndexFormat;

impl RenderContext {
    fn vertex_buffer_mut(
        &mut self,
        handle: VertexBufferHandle,
    ) -> Result<&mut VertexBuffer, ResourceError> {
        self.vertex_buffers
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)
    }

    fn index_buffer_mut(
        &mut self,
        handle: IndexBufferHandle,
    ) -> Result<&mut IndexBuffer, ResourceError> {
        self.index_buffers
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)
    }

    fn vertex_array_mut(
        &mut self,
        handle: VertexArrayHandle,
    ) -> Result<&mut VertexArray, ResourceError> {
        self.vertex_arrays
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)
    }

    // --- Vertex buffers ---

    /// Creates a vertex buffer of `capacity` bytes, optionally with initial contents.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `data` is larger than `capacity`.
    pub fn vertex_buffer_create(
        &mut self,
        capacity: usize,
        data: Option<&[u8]>,
        label: &str,
    ) -> Result<VertexBufferHandle, RenderError> {
        let mut vbo = VertexBuffer::new(capacity, label);
        if let Some(data) = data {
            vbo.buffer.cached_mut().write(0, data)?;
        }
        Ok(self.vertex_buffers.insert(vbo))
    }

    /// Overwrites bytes of a vertex buffer.
    pub fn vertex_buffer_write(
        &mut self,
        handle: VertexBufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<(), RenderError> {
        self.vertex_buffer_mut(handle)?
            .buffer
            .cached_mut()
            .write(offset, data)?;
        Ok(())
    }

    /// Appends bytes at the stream offset, growing the buffer if needed.
    ///
    /// Returns the byte offset the data was written at.
    pub fn vertex_buffer_append(
        &mut self,
        handle: VertexBufferHandle,
        data: &[u8],
    ) -> Result<usize, RenderError> {
        Ok(self.vertex_buffer_mut(handle)?.buffer.cached_mut().stream(data))
    }

    /// Returns the stream offset.
    pub fn vertex_buffer_stream_offset(&self, handle: VertexBufferHandle) -> Option<usize> {
        self.vertex_buffers
            .get(handle)
            .map(|vbo| vbo.buffer.cached().stream_offset())
    }

    /// Rewinds the stream offset to the start. The contents are kept.
    pub fn vertex_buffer_invalidate(&mut self, handle: VertexBufferHandle) -> Result<(), RenderError> {
        self.vertex_buffer_mut(handle)?.buffer.cached_mut().invalidate();
        Ok(())
    }

    /// Changes the size of a vertex buffer. The device buffer follows at the next draw.
    pub fn vertex_buffer_resize(
        &mut self,
        handle: VertexBufferHandle,
        size: usize,
    ) -> Result<(), RenderError> {
        self.vertex_buffer_mut(handle)?.buffer.cached_mut().resize(size);
        Ok(())
    }

    /// Returns the debug label.
    pub fn vertex_buffer_label(&self, handle: VertexBufferHandle) -> Option<&str> {
        self.vertex_buffers.get(handle).map(|vbo| vbo.buffer.label())
    }

    /// Sets the debug label.
    pub fn vertex_buffer_set_label(&mut self, handle: VertexBufferHandle, label: &str) {
        if let Some(vbo) = self.vertex_buffers.get_mut(handle) {
            vbo.buffer.set_label(label);
        }
    }

    /// Destroys a vertex buffer.
    pub fn vertex_buffer_destroy(&mut self, handle: VertexBufferHandle) {
        if let Some(vbo) = self.vertex_buffers.take(handle) {
            vbo.buffer.destroy(&*self.device);
        }
    }

    // --- Index buffers ---

    /// Creates an index buffer with room for `max_elements` indices.
    pub fn index_buffer_create(
        &mut self,
        format: IndexFormat,
        max_elements: usize,
        label: &str,
    ) -> IndexBufferHandle {
        self.index_buffers
            .insert(IndexBuffer::new(format, max_elements, label))
    }

    /// Appends indices at the stream offset.
    ///
    /// Returns the index of the first element written.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If an index does not fit a 16-bit buffer.
    pub fn index_buffer_add_indices(
        &mut self,
        handle: IndexBufferHandle,
        indices: &[u32],
    ) -> Result<usize, RenderError> {
        Ok(self.index_buffer_mut(handle)?.add_indices(indices)?)
    }

    /// Rewinds the stream offset to the start.
    pub fn index_buffer_invalidate(&mut self, handle: IndexBufferHandle) -> Result<(), RenderError> {
        self.index_buffer_mut(handle)?.buffer.cached_mut().invalidate();
        Ok(())
    }

    /// Returns the index format.
    pub fn index_buffer_format(&self, handle: IndexBufferHandle) -> Option<IndexFormat> {
        self.index_buffers.get(handle).map(|ibo| ibo.format)
    }

    /// Returns the debug label.
    pub fn index_buffer_label(&self, handle: IndexBufferHandle) -> Option<&str> {
        self.index_buffers.get(handle).map(|ibo| ibo.buffer.label())
    }

    /// Sets the debug label.
    pub fn index_buffer_set_label(&mut self, handle: IndexBufferHandle, label: &str) {
        if let Some(ibo) = self.index_buffers.get_mut(handle) {
            ibo.buffer.set_label(label);
        }
    }

    /// Destroys an index buffer.
    pub fn index_buffer_destroy(&mut self, handle: IndexBufferHandle) {
        if let Some(ibo) = self.index_buffers.take(handle) {
            ibo.buffer.destroy(&*self.device);
        }
    }

    // --- Vertex arrays ---

    /// Creates a vertex array with no attachments and an empty layout.
    ///
    /// ## Errors
    /// * `ResourceError::Exhausted` - If every vertex layout id is in use.
    pub fn vertex_array_create(&mut self, label: &str) -> Result<VertexArrayHandle, RenderError> {
        let layout_id = self
            .layout_ids
            .alloc()
            .ok_or(ResourceError::Exhausted {
                what: "vertex layout",
            })?;
        Ok(self.vertex_arrays.insert(VertexArray::new(layout_id, label)))
    }

    /// Attaches a vertex buffer to an attachment slot.
    pub fn vertex_array_attach_vertex_buffer(
        &mut self,
        handle: VertexArrayHandle,
        buffer: VertexBufferHandle,
        attachment: u32,
    ) -> Result<(), RenderError> {
        if !self.vertex_buffers.contains(buffer) {
            return Err(ResourceError::InvalidHandle.into());
        }
        self.vertex_array_mut(handle)?
            .attach_vertex_buffer(buffer, attachment);
        Ok(())
    }

    /// Attaches the index buffer, or detaches it with `None`.
    pub fn vertex_array_attach_index_buffer(
        &mut self,
        handle: VertexArrayHandle,
        buffer: Option<IndexBufferHandle>,
    ) -> Result<(), RenderError> {
        if buffer.is_some_and(|b| !self.index_buffers.contains(b)) {
            return Err(ResourceError::InvalidHandle.into());
        }
        self.vertex_array_mut(handle)?.attach_index_buffer(buffer);
        Ok(())
    }

    /// Returns the vertex buffer at an attachment slot.
    pub fn vertex_array_vertex_buffer(
        &self,
        handle: VertexArrayHandle,
        attachment: u32,
    ) -> Option<VertexBufferHandle> {
        self.vertex_arrays.get(handle)?.vertex_buffer(attachment)
    }

    /// Returns the index buffer.
    pub fn vertex_array_index_buffer(&self, handle: VertexArrayHandle) -> Option<IndexBufferHandle> {
        self.vertex_arrays.get(handle)?.index_buffer()
    }

    /// Replaces the attribute layout.
    ///
    /// A changed layout evicts the pipelines built for the old one.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidVertexLayout` - If the layout cannot be expressed as
    ///   device vertex input. The previous layout is kept.
    pub fn vertex_array_layout(
        &mut self,
        handle: VertexArrayHandle,
        attribs: &[VertexAttribFormat],
    ) -> Result<(), RenderError> {
        let vao = self.vertex_array_mut(handle)?;
        if vao.set_layout(attribs)? {
            let layout_id = vao.layout_id;
            self.pipelines
                .invalidate_by_vertex_layout(&*self.device, layout_id);
        }
        Ok(())
    }

    /// Returns the attribute layout.
    pub fn vertex_array_attribs(&self, handle: VertexArrayHandle) -> Option<&[VertexAttribFormat]> {
        self.vertex_arrays.get(handle).map(VertexArray::attribs)
    }

    /// Returns the debug label.
    pub fn vertex_array_label(&self, handle: VertexArrayHandle) -> Option<&str> {
        self.vertex_arrays.get(handle).map(VertexArray::label)
    }

    /// Sets the debug label.
    pub fn vertex_array_set_label(&mut self, handle: VertexArrayHandle, label: &str) {
        if let Some(vao) = self.vertex_arrays.get_mut(handle) {
            vao.set_label(label);
        }
    }

    /// Destroys a vertex array, evicting its pipelines and freeing its layout id.
    ///
    /// The attached buffers are left alone.
    pub fn vertex_array_destroy(&mut self, handle: VertexArrayHandle) {
        let Some(vao) = self.vertex_arrays.take(handle) else {
            log::warn!("RenderContext: destroying a stale vertex array handle");
            return;
        };

        self.pipelines
            .invalidate_by_vertex_layout(&*self.device, vao.layout_id);
        self.layout_ids.release(vao.layout_id);
    }
}
