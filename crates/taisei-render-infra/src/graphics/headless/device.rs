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

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use taisei_render_core::renderer::gpu::{
    BufferDescriptor, BufferId, CommandBufferId, DeviceInfo, FenceId, GraphicsPipelineDescriptor,
    PipelineId, SamplerDescriptor, SamplerId, ShaderDescriptor, ShaderId, ShaderStage,
    SwapchainTexture, TextureDescriptor, TextureFormat, TextureId, TextureUsage,
    TransferBufferDescriptor, TransferBufferId, TransferBufferUsage,
};
use taisei_render_core::renderer::traits::CommandEncoder;
use taisei_render_core::renderer::{
    GpuDevice, PipelineError, RenderError, ResourceError, ShaderError,
};

use super::command::HeadlessCommandEncoder;

/// The largest texture edge the device accepts.
pub const MAX_TEXTURE_DIMENSION: u32 = 16384;

const SPIRV_MAGIC: u32 = 0x0723_0203;

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

/// A texture kept in host memory, one tightly packed image per layer and mip level.
#[derive(Debug, Clone)]
pub(crate) struct HeadlessTexture {
    pub(crate) format: TextureFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) layers: u32,
    pub(crate) mip_levels: u32,
    /// Indexed by `layer * mip_levels + level`.
    pub(crate) images: Vec<Vec<u8>>,
}

impl HeadlessTexture {
    /// Returns the size of a mip level in texels.
    pub(crate) fn level_size(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }

    pub(crate) fn image_mut(&mut self, level: u32, layer: u32) -> Option<&mut Vec<u8>> {
        if level >= self.mip_levels || layer >= self.layers {
            return None;
        }
        self.images.get_mut((layer * self.mip_levels + level) as usize)
    }

    pub(crate) fn image(&self, level: u32, layer: u32) -> Option<&[u8]> {
        if level >= self.mip_levels || layer >= self.layers {
            return None;
        }
        self.images
            .get((layer * self.mip_levels + level) as usize)
            .map(Vec::as_slice)
    }
}

#[derive(Debug)]
pub(crate) struct HeadlessTransferBuffer {
    pub(crate) usage: TransferBufferUsage,
    pub(crate) data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct HeadlessShader {
    stage: ShaderStage,
}

/// Counters describing what the device has been asked to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    /// Graphics pipelines created over the device's lifetime.
    pub pipelines_created: usize,
    /// Graphics pipelines currently alive.
    pub live_pipelines: usize,
    /// Textures currently alive.
    pub live_textures: usize,
    /// Render passes recorded.
    pub render_passes: u64,
    /// Draw calls recorded.
    pub draws: u64,
    /// Command buffers submitted.
    pub submissions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct HeadlessDeviceInternal {
    pub(crate) buffers: Mutex<HashMap<BufferId, Vec<u8>>>,
    pub(crate) transfer_buffers: Mutex<HashMap<TransferBufferId, HeadlessTransferBuffer>>,
    pub(crate) textures: Mutex<HashMap<TextureId, HeadlessTexture>>,
    samplers: Mutex<HashMap<SamplerId, SamplerDescriptor>>,
    shaders: Mutex<HashMap<ShaderId, HeadlessShader>>,
    pub(crate) pipelines: Mutex<HashSet<PipelineId>>,
    pending_command_buffers: Mutex<HashSet<CommandBufferId>>,
    fences: Mutex<HashSet<FenceId>>,

    next_buffer_id: AtomicUsize,
    next_transfer_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_sampler_id: AtomicUsize,
    next_shader_id: AtomicUsize,
    next_pipeline_id: AtomicUsize,
    next_fence_id: AtomicUsize,
    command_buffer_id_counter: AtomicU64,

    pub(crate) render_passes: AtomicU64,
    pub(crate) draws: AtomicU64,
    submissions: AtomicU64,
}

/// A device that keeps every resource in host memory and has no swapchain.
///
/// Commands execute while they are recorded: copies move bytes, render passes apply
/// their clear load ops and mip chains are downsampled on the CPU. Draws are validated
/// and counted but rasterize nothing. Fences are signalled on submission.
#[derive(Clone, Debug, Default)]
pub struct HeadlessDevice {
    pub(crate) internal: Arc<HeadlessDeviceInternal>,
}

impl HeadlessDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        log::info!("HeadlessDevice: Created CPU device");
        Self::default()
    }

    /// Returns a snapshot of the device counters.
    pub fn stats(&self) -> HeadlessStats {
        let len = |n: Result<usize, ResourceError>| n.unwrap_or_default();
        HeadlessStats {
            pipelines_created: self.internal.next_pipeline_id.load(Ordering::Relaxed),
            live_pipelines: len(lock(&self.internal.pipelines, "pipelines").map(|p| p.len())),
            live_textures: len(lock(&self.internal.textures, "textures").map(|t| t.len())),
            render_passes: self.internal.render_passes.load(Ordering::Relaxed),
            draws: self.internal.draws.load(Ordering::Relaxed),
            submissions: self.internal.submissions.load(Ordering::Relaxed),
        }
    }

    /// Returns a copy of one mip level and layer of a texture.
    pub fn texture_image(&self, id: TextureId, level: u32, layer: u32) -> Option<Vec<u8>> {
        let textures = self.internal.textures.lock().ok()?;
        textures.get(&id)?.image(level, layer).map(<[u8]>::to_vec)
    }

    /// Returns a copy of a device buffer's contents.
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        let buffers = self.internal.buffers.lock().ok()?;
        buffers.get(&id).cloned()
    }

    pub(crate) fn register_command_buffer(&self) -> CommandBufferId {
        let id = CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        match self.internal.pending_command_buffers.lock() {
            Ok(mut pending) => {
                pending.insert(id);
            }
            Err(e) => log::error!("HeadlessDevice: Mutex poisoned (pending_command_buffers): {e}"),
        }
        id
    }

    pub(crate) fn has_pipeline(&self, id: PipelineId) -> bool {
        self.internal
            .pipelines
            .lock()
            .is_ok_and(|pipelines| pipelines.contains(&id))
    }
}

fn check_texture_usage(format: TextureFormat, usage: TextureUsage) -> Result<(), String> {
    if usage.contains(TextureUsage::COLOR_TARGET) && (format.is_depth() || format.is_compressed()) {
        return Err(format!("{format:?} can't be a color target"));
    }
    if usage.contains(TextureUsage::DEPTH_STENCIL_TARGET) && !format.is_depth() {
        return Err(format!("{format:?} can't be a depth target"));
    }
    Ok(())
}

impl GpuDevice for HeadlessDevice {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Headless".to_string(),
            backend: "Cpu".to_string(),
            max_texture_dimension: MAX_TEXTURE_DIMENSION,
            max_anisotropy: 16,
        }
    }

    fn supports_texture_format(&self, format: TextureFormat, usage: TextureUsage) -> bool {
        check_texture_usage(format, usage).is_ok()
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let size = usize::try_from(descriptor.size).map_err(|_| ResourceError::OutOfBounds)?;
        let id = BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.buffers, "buffers")?.insert(id, vec![0; size]);
        log::debug!(
            "HeadlessDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        lock(&self.internal.buffers, "buffers")?
            .remove(&id)
            .map(drop)
            .ok_or(ResourceError::NotFound)
    }

    fn create_transfer_buffer(
        &self,
        descriptor: &TransferBufferDescriptor,
    ) -> Result<TransferBufferId, ResourceError> {
        let size = usize::try_from(descriptor.size).map_err(|_| ResourceError::OutOfBounds)?;
        let id = TransferBufferId(
            self.internal
                .next_transfer_buffer_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.transfer_buffers, "transfer_buffers")?.insert(
            id,
            HeadlessTransferBuffer {
                usage: descriptor.usage,
                data: vec![0; size],
            },
        );
        log::debug!(
            "HeadlessDevice: Created {:?} transfer buffer with ID: {:?}, size: {} bytes",
            descriptor.usage,
            id,
            size
        );
        Ok(id)
    }

    fn destroy_transfer_buffer(&self, id: TransferBufferId) -> Result<(), ResourceError> {
        lock(&self.internal.transfer_buffers, "transfer_buffers")?
            .remove(&id)
            .map(drop)
            .ok_or(ResourceError::NotFound)
    }

    fn write_transfer_buffer(
        &self,
        id: TransferBufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.internal.transfer_buffers, "transfer_buffers")?;
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if buffer.usage != TransferBufferUsage::Upload {
            log::warn!("HeadlessDevice: Writing into download transfer buffer {id:?}");
        }
        let start = usize::try_from(offset).map_err(|_| ResourceError::OutOfBounds)?;
        buffer
            .data
            .get_mut(start..start + data.len())
            .ok_or(ResourceError::OutOfBounds)?
            .copy_from_slice(data);
        Ok(())
    }

    fn read_transfer_buffer(
        &self,
        id: TransferBufferId,
        size: u64,
        reader: &mut dyn FnMut(&[u8]),
    ) -> Result<(), ResourceError> {
        let buffers = lock(&self.internal.transfer_buffers, "transfer_buffers")?;
        let buffer = buffers.get(&id).ok_or(ResourceError::NotFound)?;
        let size = usize::try_from(size).map_err(|_| ResourceError::OutOfBounds)?;
        reader(buffer.data.get(..size).ok_or(ResourceError::OutOfBounds)?);
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let (width, height) = (descriptor.width, descriptor.height);
        let (layers, mip_levels) = (descriptor.layers.max(1), descriptor.mip_levels.max(1));
        if width == 0
            || height == 0
            || width > MAX_TEXTURE_DIMENSION
            || height > MAX_TEXTURE_DIMENSION
        {
            return Err(ResourceError::BackendError(format!(
                "Invalid texture size {width}x{height}"
            )));
        }
        check_texture_usage(descriptor.format, descriptor.usage).map_err(ResourceError::BackendError)?;

        let format = descriptor.format;
        let images = (0..layers)
            .flat_map(|_| 0..mip_levels)
            .map(|level| {
                let (w, h) = ((width >> level).max(1), (height >> level).max(1));
                vec![0u8; format.data_size(w, h) as usize]
            })
            .collect();

        let id = TextureId(self.internal.next_texture_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.textures, "textures")?.insert(
            id,
            HeadlessTexture {
                format,
                width,
                height,
                layers,
                mip_levels,
                images,
            },
        );
        log::debug!(
            "HeadlessDevice: Created texture '{}' with ID: {:?}, {}x{} {:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            width,
            height,
            format
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        lock(&self.internal.textures, "textures")?
            .remove(&id)
            .map(drop)
            .ok_or(ResourceError::NotFound)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let id = SamplerId(self.internal.next_sampler_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.samplers, "samplers")?.insert(id, descriptor.clone());
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        lock(&self.internal.samplers, "samplers")?
            .remove(&id)
            .map(drop)
            .ok_or(ResourceError::NotFound)
    }

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<ShaderId, ResourceError> {
        let code = &descriptor.code;
        let magic = code
            .get(..4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        if code.len() % 4 != 0 || magic != Some(SPIRV_MAGIC) {
            return Err(ShaderError::CompilationError {
                label: descriptor.label.as_deref().unwrap_or_default().to_string(),
                details: "not a SPIR-V module".to_string(),
            }
            .into());
        }

        let id = ShaderId(self.internal.next_shader_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.shaders, "shaders")?.insert(
            id,
            HeadlessShader {
                stage: descriptor.stage,
            },
        );
        log::debug!("HeadlessDevice: Created {} shader with ID: {id:?}", descriptor.stage.name());
        Ok(id)
    }

    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError> {
        lock(&self.internal.shaders, "shaders")?
            .remove(&id)
            .map(drop)
            .ok_or_else(|| ShaderError::NotFound { id }.into())
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, ResourceError> {
        let label = descriptor.label.as_deref().map(String::from);
        {
            let shaders = lock(&self.internal.shaders, "shaders")?;
            for (id, stage) in [
                (descriptor.vertex_shader, ShaderStage::Vertex),
                (descriptor.fragment_shader, ShaderStage::Fragment),
            ] {
                let shader = shaders.get(&id).ok_or(ShaderError::NotFound { id })?;
                if shader.stage != stage {
                    return Err(PipelineError::CompilationFailed {
                        label,
                        details: format!("shader {id:?} is not a {} shader", stage.name()),
                    }
                    .into());
                }
            }
        }

        if let Some(format) = descriptor.depth_stencil_format.filter(|f| !f.is_depth()) {
            return Err(PipelineError::InvalidDepthFormat(format).into());
        }
        if let Some(target) = descriptor
            .color_targets
            .iter()
            .find(|t| t.format.is_depth() || t.format.is_compressed())
        {
            return Err(PipelineError::CompilationFailed {
                label,
                details: format!("{:?} can't be rendered to", target.format),
            }
            .into());
        }

        let id = PipelineId(self.internal.next_pipeline_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.pipelines, "pipelines")?.insert(id);
        log::debug!(
            "HeadlessDevice: Created render pipeline '{}' with ID: {:?}",
            label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_graphics_pipeline(&self, id: PipelineId) -> Result<(), ResourceError> {
        if lock(&self.internal.pipelines, "pipelines")?.remove(&id) {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(HeadlessCommandEncoder::new(self.clone()))
    }

    fn submit_command_buffer(&self, id: CommandBufferId) -> Result<FenceId, ResourceError> {
        if !lock(&self.internal.pending_command_buffers, "pending_command_buffers")?.remove(&id) {
            log::error!("HeadlessDevice: Attempted to submit a CommandBufferId ({id:?}) that does not exist.");
            return Err(ResourceError::NotFound);
        }
        self.internal.submissions.fetch_add(1, Ordering::Relaxed);

        // The commands already ran while they were recorded.
        let fence = FenceId(self.internal.next_fence_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.fences, "fences")?.insert(fence);
        Ok(fence)
    }

    fn query_fence(&self, _fence: FenceId) -> bool {
        true
    }

    fn wait_for_fences(&self, _fences: &[FenceId], _wait_all: bool) -> Result<(), ResourceError> {
        Ok(())
    }

    fn release_fence(&self, fence: FenceId) {
        if let Ok(mut fences) = self.internal.fences.lock() {
            fences.remove(&fence);
        }
    }

    fn acquire_swapchain_texture(&self) -> Result<Option<SwapchainTexture>, RenderError> {
        Ok(None)
    }

    fn present(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8Unorm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use taisei_render_core::renderer::gpu::{ShaderFormat, TextureKind};

    fn texture_descriptor(format: TextureFormat, usage: TextureUsage) -> TextureDescriptor<'static> {
        TextureDescriptor {
            label: Some(Cow::Borrowed("test")),
            kind: TextureKind::D2,
            format,
            width: 8,
            height: 4,
            layers: 1,
            mip_levels: 3,
            usage,
        }
    }

    fn shader(stage: ShaderStage, code: Vec<u8>) -> ShaderDescriptor<'static> {
        ShaderDescriptor {
            label: None,
            stage,
            format: ShaderFormat::SpirV,
            code: Cow::Owned(code),
            entry_point: Cow::Borrowed("main"),
            sampler_kinds: Vec::new(),
            num_uniform_buffers: 0,
        }
    }

    #[test]
    fn test_texture_levels_are_allocated() {
        let device = HeadlessDevice::new();
        let id = device
            .create_texture(&texture_descriptor(TextureFormat::Rgba8Unorm, TextureUsage::SAMPLER))
            .unwrap();
        assert_eq!(device.texture_image(id, 0, 0).map(|i| i.len()), Some(8 * 4 * 4));
        assert_eq!(device.texture_image(id, 2, 0).map(|i| i.len()), Some(2 * 4));
        assert_eq!(device.texture_image(id, 3, 0), None);
    }

    #[test]
    fn test_compressed_color_targets_are_rejected() {
        let device = HeadlessDevice::new();
        assert!(!device.supports_texture_format(TextureFormat::Bc7, TextureUsage::COLOR_TARGET));
        assert!(device.supports_texture_format(TextureFormat::Bc7, TextureUsage::SAMPLER));
        assert!(device
            .create_texture(&texture_descriptor(TextureFormat::D16Unorm, TextureUsage::COLOR_TARGET))
            .is_err());
    }

    #[test]
    fn test_transfer_buffer_bounds() {
        let device = HeadlessDevice::new();
        let id = device
            .create_transfer_buffer(&TransferBufferDescriptor {
                label: None,
                size: 4,
                usage: TransferBufferUsage::Upload,
            })
            .unwrap();
        device.write_transfer_buffer(id, 1, &[7, 8, 9]).unwrap();
        assert!(matches!(
            device.write_transfer_buffer(id, 2, &[1, 2, 3]),
            Err(ResourceError::OutOfBounds)
        ));

        let mut seen = Vec::new();
        device
            .read_transfer_buffer(id, 4, &mut |bytes| seen.extend_from_slice(bytes))
            .unwrap();
        assert_eq!(seen, vec![0, 7, 8, 9]);
    }

    #[test]
    fn test_shader_bytecode_is_checked() {
        let device = HeadlessDevice::new();
        let err = device
            .create_shader(&shader(ShaderStage::Vertex, b"#version 330".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ResourceError::Shader(ShaderError::CompilationError { .. })));
        assert!(device
            .create_shader(&shader(ShaderStage::Vertex, vec![0x03, 0x02, 0x23, 0x07]))
            .is_ok());
    }

    #[test]
    fn test_submitting_twice_fails() {
        let device = HeadlessDevice::new();
        let id = device.create_command_encoder(None).finish();
        let fence = device.submit_command_buffer(id).unwrap();
        assert!(device.query_fence(fence));
        assert!(matches!(
            device.submit_command_buffer(id),
            Err(ResourceError::NotFound)
        ));
        assert_eq!(device.stats().submissions, 1);
    }
}
