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

use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::gpu::*;
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// An explicit GPU device: resource factory, command submission queue and swapchain.
///
/// All resources are referenced through opaque ids. Destroying an unknown id is
/// reported as [`ResourceError::NotFound`].
pub trait GpuDevice: Send + Sync + Debug + 'static {
    /// Returns static information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Returns `true` if textures of `format` can be created with `usage`.
    fn supports_texture_format(&self, format: TextureFormat, usage: TextureUsage) -> bool;

    /// Creates a device-local buffer.
    /// ## Arguments
    /// * `descriptor` - The size and binding usage of the buffer.
    /// ## Returns
    /// The id of the new buffer.
    /// ## Errors
    /// * `ResourceError` - If the backend fails to allocate the buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a device-local buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Creates a CPU-visible transfer buffer.
    /// ## Arguments
    /// * `descriptor` - The size and direction of the transfer buffer.
    /// ## Returns
    /// The id of the new transfer buffer.
    /// ## Errors
    /// * `ResourceError` - If the backend fails to allocate the buffer.
    fn create_transfer_buffer(
        &self,
        descriptor: &TransferBufferDescriptor,
    ) -> Result<TransferBufferId, ResourceError>;

    /// Destroys a transfer buffer.
    fn destroy_transfer_buffer(&self, id: TransferBufferId) -> Result<(), ResourceError>;

    /// Copies `data` into an upload transfer buffer at `offset`.
    ///
    /// Upload commands read the transfer buffer as it was when they were recorded, so
    /// the same range may be rewritten for the next upload without waiting.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write exceeds the buffer.
    fn write_transfer_buffer(
        &self,
        id: TransferBufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Maps the first `size` bytes of a download transfer buffer and hands them to `reader`.
    ///
    /// The contents are only meaningful once the fence of the download that filled
    /// the buffer has signalled.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `size` exceeds the buffer.
    fn read_transfer_buffer(
        &self,
        id: TransferBufferId,
        size: u64,
        reader: &mut dyn FnMut(&[u8]),
    ) -> Result<(), ResourceError>;

    /// Creates a texture.
    /// ## Errors
    /// * `ResourceError` - If the format, usage or dimensions are not supported.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a shader module from bytecode.
    /// ## Errors
    /// * `ResourceError::Shader` - If the bytecode is rejected.
    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<ShaderId, ResourceError>;

    /// Destroys a shader module.
    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError>;

    /// Compiles a graphics pipeline. This is slow.
    /// ## Errors
    /// * `ResourceError::Pipeline` - If the backend rejects the pipeline state.
    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, ResourceError>;

    /// Destroys a graphics pipeline.
    fn destroy_graphics_pipeline(&self, id: PipelineId) -> Result<(), ResourceError>;

    /// Starts recording a new command buffer.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits a finished command buffer and returns a fence signalled on completion.
    /// ## Errors
    /// * `ResourceError::NotFound` - If the command buffer was already submitted.
    fn submit_command_buffer(&self, id: CommandBufferId) -> Result<FenceId, ResourceError>;

    /// Returns `true` if the fence has signalled. Never blocks.
    fn query_fence(&self, fence: FenceId) -> bool;

    /// Blocks until all (or, with `wait_all == false`, any) of `fences` have signalled.
    fn wait_for_fences(&self, fences: &[FenceId], wait_all: bool) -> Result<(), ResourceError>;

    /// Releases a fence. The id must not be used afterwards.
    fn release_fence(&self, fence: FenceId);

    /// Acquires the swapchain texture for the next frame.
    ///
    /// Returns `Ok(None)` when there is nothing to present to, e.g. a minimized window.
    /// ## Errors
    /// * `RenderError::SurfaceAcquisitionFailed` - If the swapchain is lost.
    fn acquire_swapchain_texture(&self) -> Result<Option<SwapchainTexture>, RenderError>;

    /// Presents the texture previously acquired with [`Self::acquire_swapchain_texture`].
    fn present(&self) -> Result<(), RenderError>;

    /// Returns the format of the swapchain textures.
    fn swapchain_format(&self) -> TextureFormat;
}
