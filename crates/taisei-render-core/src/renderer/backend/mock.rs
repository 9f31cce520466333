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

//! A recording device used by the unit tests of the backend.

use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::gpu::*;
use crate::renderer::traits::{CommandEncoder, GpuDevice};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

/// A command recorded by [`MockEncoder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    BeginCopyPass,
    EndCopyPass,
    UploadToBuffer {
        buffer: BufferId,
        offset: u64,
        data: Vec<u8>,
    },
    UploadToTexture {
        region: TextureRegion,
        data: Vec<u8>,
    },
    DownloadFromTexture {
        region: TextureRegion,
        transfer_buffer: TransferBufferId,
        offset: u64,
    },
    GenerateMipmaps(TextureId),
    BeginRenderPass {
        colors: Vec<ColorAttachmentInfo>,
        depth: Option<DepthStencilAttachmentInfo>,
    },
    EndRenderPass,
    BindPipeline(PipelineId),
    SetViewport(Viewport),
    SetScissor(u32, u32, u32, u32),
    BindVertexBuffers(u32, Vec<BufferBinding>),
    BindIndexBuffer(BufferBinding, IndexFormat),
    BindSamplers(ShaderStage, u32, Vec<TextureSamplerBinding>),
    PushUniforms(ShaderStage, u32, Vec<u8>),
    Draw(Range<u32>, Range<u32>),
    DrawIndexed(Range<u32>, i32, Range<u32>),
}

#[derive(Debug, Clone)]
pub struct MockTexture {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub usage: TextureUsage,
}

#[derive(Debug, Clone)]
pub struct MockPipeline {
    pub vertex_shader: ShaderId,
    pub fragment_shader: ShaderId,
    pub primitive_type: PrimitiveTopology,
    pub rasterizer: RasterizerState,
    pub depth_stencil: DepthStencilState,
    pub color_targets: Vec<ColorTargetDescription>,
    pub depth_stencil_format: Option<TextureFormat>,
    pub vertex_input: VertexInputState,
}

#[derive(Debug, Default)]
pub struct MockState {
    next_id: usize,
    pub buffers: HashMap<usize, u64>,
    pub transfer_buffers: HashMap<usize, Vec<u8>>,
    pub textures: HashMap<usize, MockTexture>,
    pub samplers: HashMap<usize, SamplerDescriptor>,
    pub shaders: HashMap<usize, ShaderStage>,
    pub pipelines: HashMap<usize, MockPipeline>,
    pub pipelines_created: usize,
    pub pipelines_destroyed: usize,
    pub samplers_created: usize,
    pending: HashMap<u64, Vec<Recorded>>,
    pub submitted: Vec<Vec<Recorded>>,
    pub fences: HashMap<usize, bool>,
    pub waits: usize,
    pub released_fences: usize,
    pub swapchain: Option<SwapchainTexture>,
    pub presents: usize,
    pub fail_pipelines: bool,
}

impl MockState {
    fn alloc(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    /// Every command of every submitted command buffer, in order.
    pub fn all_commands(&self) -> Vec<Recorded> {
        self.submitted.iter().flatten().cloned().collect()
    }

    pub fn in_flight_fences(&self) -> usize {
        self.fences.values().filter(|signaled| !**signaled).count()
    }

    fn execute(&mut self, commands: &[Recorded]) {
        for command in commands {
            if let Recorded::DownloadFromTexture {
                region,
                transfer_buffer,
                offset,
            } = command
            {
                let Some(texture) = self.textures.get(&region.texture.0) else {
                    continue;
                };
                let size = texture.format.data_size(region.w, region.h) as usize;
                let fill = region.texture.0 as u8;
                if let Some(data) = self.transfer_buffers.get_mut(&transfer_buffer.0) {
                    let start = *offset as usize;
                    let end = (start + size).min(data.len());
                    data[start..end].fill(fill);
                }
            }
        }
    }
}

/// A [`GpuDevice`] that records everything and never touches a GPU.
///
/// Submitted work is "executed" at submission; fences stay unsignaled until waited on
/// or signaled explicitly, which lets tests drive the CPU/GPU race by hand.
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

pub const SWAPCHAIN_TEXTURE: TextureId = TextureId(0);

impl MockDevice {
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.textures.insert(
            SWAPCHAIN_TEXTURE.0,
            MockTexture {
                format: TextureFormat::Bgra8Unorm,
                width: 640,
                height: 480,
                mip_levels: 1,
                usage: TextureUsage::COLOR_TARGET,
            },
        );
        state.swapchain = Some(SwapchainTexture {
            texture: SWAPCHAIN_TEXTURE,
            format: TextureFormat::Bgra8Unorm,
            width: 640,
            height: 480,
        });
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn signal_all(&self) {
        for signaled in self.state().fences.values_mut() {
            *signaled = true;
        }
    }
}

impl GpuDevice for MockDevice {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "mock".to_string(),
            backend: "mock".to_string(),
            max_texture_dimension: 8192,
            max_anisotropy: 16,
        }
    }

    fn supports_texture_format(&self, _format: TextureFormat, _usage: TextureUsage) -> bool {
        true
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state();
        let id = state.alloc();
        state.buffers.insert(id, descriptor.size);
        Ok(BufferId(id))
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.state()
            .buffers
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_transfer_buffer(
        &self,
        descriptor: &TransferBufferDescriptor,
    ) -> Result<TransferBufferId, ResourceError> {
        let mut state = self.state();
        let id = state.alloc();
        state
            .transfer_buffers
            .insert(id, vec![0; descriptor.size as usize]);
        Ok(TransferBufferId(id))
    }

    fn destroy_transfer_buffer(&self, id: TransferBufferId) -> Result<(), ResourceError> {
        self.state()
            .transfer_buffers
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_transfer_buffer(
        &self,
        id: TransferBufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        let buffer = state
            .transfer_buffers
            .get_mut(&id.0)
            .ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_transfer_buffer(
        &self,
        id: TransferBufferId,
        size: u64,
        reader: &mut dyn FnMut(&[u8]),
    ) -> Result<(), ResourceError> {
        let state = self.state();
        let buffer = state
            .transfer_buffers
            .get(&id.0)
            .ok_or(ResourceError::NotFound)?;
        let data = buffer.get(..size as usize).ok_or(ResourceError::OutOfBounds)?;
        reader(data);
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let mut state = self.state();
        let id = state.alloc();
        state.textures.insert(
            id,
            MockTexture {
                format: descriptor.format,
                width: descriptor.width,
                height: descriptor.height,
                mip_levels: descriptor.mip_levels,
                usage: descriptor.usage,
            },
        );
        Ok(TextureId(id))
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.state()
            .textures
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let mut state = self.state();
        let id = state.alloc();
        state.samplers.insert(id, descriptor.clone());
        state.samplers_created += 1;
        Ok(SamplerId(id))
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.state()
            .samplers
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<ShaderId, ResourceError> {
        let mut state = self.state();
        let id = state.alloc();
        state.shaders.insert(id, descriptor.stage);
        Ok(ShaderId(id))
    }

    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError> {
        self.state()
            .shaders
            .remove(&id.0)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, ResourceError> {
        let mut state = self.state();
        if state.fail_pipelines {
            return Err(ResourceError::BackendError("pipeline rejected".to_string()));
        }
        let id = state.alloc();
        state.pipelines.insert(
            id,
            MockPipeline {
                vertex_shader: descriptor.vertex_shader,
                fragment_shader: descriptor.fragment_shader,
                primitive_type: descriptor.primitive_type,
                rasterizer: descriptor.rasterizer,
                depth_stencil: descriptor.depth_stencil,
                color_targets: descriptor.color_targets.clone(),
                depth_stencil_format: descriptor.depth_stencil_format,
                vertex_input: descriptor.vertex_input.clone(),
            },
        );
        state.pipelines_created += 1;
        Ok(PipelineId(id))
    }

    fn destroy_graphics_pipeline(&self, id: PipelineId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state
            .pipelines
            .remove(&id.0)
            .ok_or(ResourceError::NotFound)?;
        state.pipelines_destroyed += 1;
        Ok(())
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(MockEncoder {
            state: self.state.clone(),
            commands: Vec::new(),
        })
    }

    fn submit_command_buffer(&self, id: CommandBufferId) -> Result<FenceId, ResourceError> {
        let mut state = self.state();
        let commands = state.pending.remove(&id.0).ok_or(ResourceError::NotFound)?;
        state.execute(&commands);
        state.submitted.push(commands);
        let fence = state.alloc();
        state.fences.insert(fence, false);
        Ok(FenceId(fence))
    }

    fn query_fence(&self, fence: FenceId) -> bool {
        self.state().fences.get(&fence.0).copied().unwrap_or(false)
    }

    fn wait_for_fences(&self, fences: &[FenceId], wait_all: bool) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.waits += 1;
        let mut pending: Vec<usize> = fences
            .iter()
            .map(|f| f.0)
            .filter(|f| state.fences.get(f) == Some(&false))
            .collect();
        pending.sort_unstable();
        if !wait_all {
            pending.truncate(1);
        }
        for fence in pending {
            state.fences.insert(fence, true);
        }
        Ok(())
    }

    fn release_fence(&self, fence: FenceId) {
        let mut state = self.state();
        if state.fences.remove(&fence.0).is_some() {
            state.released_fences += 1;
        }
    }

    fn acquire_swapchain_texture(&self) -> Result<Option<SwapchainTexture>, RenderError> {
        Ok(self.state().swapchain)
    }

    fn present(&self) -> Result<(), RenderError> {
        self.state().presents += 1;
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8Unorm
    }
}

#[derive(Debug)]
pub struct MockEncoder {
    state: Arc<Mutex<MockState>>,
    commands: Vec<Recorded>,
}

impl CommandEncoder for MockEncoder {
    fn begin_copy_pass(&mut self) {
        self.commands.push(Recorded::BeginCopyPass);
    }

    fn end_copy_pass(&mut self) {
        self.commands.push(Recorded::EndCopyPass);
    }

    fn upload_to_buffer(&mut self, source: &TransferBufferLocation, destination: &BufferRegion) {
        let state = self.state.lock().unwrap();
        let start = source.offset as usize;
        let data = state.transfer_buffers[&source.transfer_buffer.0]
            [start..start + destination.size as usize]
            .to_vec();
        drop(state);
        self.commands.push(Recorded::UploadToBuffer {
            buffer: destination.buffer,
            offset: destination.offset,
            data,
        });
    }

    fn upload_to_texture(&mut self, source: &TextureTransferInfo, destination: &TextureRegion) {
        let data = self.state.lock().unwrap().transfer_buffers[&source.transfer_buffer.0]
            [source.offset as usize..]
            .to_vec();
        self.commands.push(Recorded::UploadToTexture {
            region: *destination,
            data,
        });
    }

    fn download_from_texture(&mut self, source: &TextureRegion, destination: &TextureTransferInfo) {
        self.commands.push(Recorded::DownloadFromTexture {
            region: *source,
            transfer_buffer: destination.transfer_buffer,
            offset: destination.offset,
        });
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        self.commands.push(Recorded::GenerateMipmaps(texture));
    }

    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor) {
        self.commands.push(Recorded::BeginRenderPass {
            colors: descriptor.color_attachments.clone(),
            depth: descriptor.depth_stencil_attachment,
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(Recorded::EndRenderPass);
    }

    fn bind_graphics_pipeline(&mut self, pipeline: PipelineId) {
        self.commands.push(Recorded::BindPipeline(pipeline));
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.commands.push(Recorded::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, x: u32, y: u32, w: u32, h: u32) {
        self.commands.push(Recorded::SetScissor(x, y, w, h));
    }

    fn bind_vertex_buffers(&mut self, first_slot: u32, bindings: &[BufferBinding]) {
        self.commands
            .push(Recorded::BindVertexBuffers(first_slot, bindings.to_vec()));
    }

    fn bind_index_buffer(&mut self, binding: &BufferBinding, format: IndexFormat) {
        self.commands.push(Recorded::BindIndexBuffer(*binding, format));
    }

    fn bind_samplers(
        &mut self,
        stage: ShaderStage,
        first_slot: u32,
        bindings: &[TextureSamplerBinding],
    ) {
        self.commands
            .push(Recorded::BindSamplers(stage, first_slot, bindings.to_vec()));
    }

    fn push_uniform_data(&mut self, stage: ShaderStage, slot: u32, data: &[u8]) {
        self.commands
            .push(Recorded::PushUniforms(stage, slot, data.to_vec()));
    }

    fn draw_primitives(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.commands.push(Recorded::Draw(vertices, instances));
    }

    fn draw_indexed_primitives(
        &mut self,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) {
        self.commands
            .push(Recorded::DrawIndexed(indices, base_vertex, instances));
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let mut state = self.state.lock().unwrap();
        let id = state.alloc() as u64;
        state.pending.insert(id, self.commands);
        CommandBufferId(id)
    }
}
