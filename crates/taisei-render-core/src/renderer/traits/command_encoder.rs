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

use crate::renderer::gpu::*;
use std::ops::Range;

/// Records copy and render commands into a command buffer.
///
/// At most one pass is open at a time. Copy commands are only valid inside a copy
/// pass and draw commands only inside a render pass.
pub trait CommandEncoder {
    /// Opens a copy pass.
    fn begin_copy_pass(&mut self);

    /// Closes the open copy pass.
    fn end_copy_pass(&mut self);

    /// Copies `destination.size` bytes from an upload transfer buffer into a device buffer.
    fn upload_to_buffer(&mut self, source: &TransferBufferLocation, destination: &BufferRegion);

    /// Copies texels from an upload transfer buffer into a texture region.
    fn upload_to_texture(&mut self, source: &TextureTransferInfo, destination: &TextureRegion);

    /// Copies a texture region into a download transfer buffer, rows tightly packed.
    fn download_from_texture(&mut self, source: &TextureRegion, destination: &TextureTransferInfo);

    /// Regenerates every mip level of `texture` from level 0. Must be called outside passes.
    fn generate_mipmaps(&mut self, texture: TextureId);

    /// Opens a render pass over the given attachments.
    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor);

    /// Closes the open render pass.
    fn end_render_pass(&mut self);

    /// Sets the pipeline used by subsequent draws.
    fn bind_graphics_pipeline(&mut self, pipeline: PipelineId);

    /// Sets the viewport transform.
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Sets the scissor rectangle.
    fn set_scissor(&mut self, x: u32, y: u32, w: u32, h: u32);

    /// Binds vertex buffers starting at `first_slot`.
    fn bind_vertex_buffers(&mut self, first_slot: u32, bindings: &[BufferBinding]);

    /// Binds the index buffer.
    fn bind_index_buffer(&mut self, binding: &BufferBinding, format: IndexFormat);

    /// Binds textures and samplers of `stage` starting at `first_slot`.
    fn bind_samplers(&mut self, stage: ShaderStage, first_slot: u32, bindings: &[TextureSamplerBinding]);

    /// Provides the contents of the uniform buffer `slot` of `stage` for subsequent draws.
    fn push_uniform_data(&mut self, stage: ShaderStage, slot: u32, data: &[u8]);

    /// Records a non-indexed draw.
    fn draw_primitives(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Records an indexed draw.
    fn draw_indexed_primitives(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    /// Finishes recording. The returned id is passed to
    /// [`GpuDevice::submit_command_buffer`](crate::renderer::GpuDevice::submit_command_buffer).
    fn finish(self: Box<Self>) -> CommandBufferId;
}
