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

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Poll, Waker};

use taisei_render_core::renderer::gpu::{
    BufferDescriptor, BufferId, CommandBufferId, DeviceInfo, FenceId, GraphicsPipelineDescriptor,
    PipelineId, SamplerDescriptor, SamplerId, ShaderDescriptor, ShaderId, ShaderStage,
    SwapchainTexture, TextureDescriptor, TextureFormat, TextureId, TextureKind, TextureUsage,
    TransferBufferDescriptor, TransferBufferId, TransferBufferUsage,
};
use taisei_render_core::renderer::traits::CommandEncoder;
use taisei_render_core::renderer::{
    GpuDevice, PipelineError, RenderError, ResourceError, ShaderError,
};

use super::command::WgpuCommandEncoder;
use super::context::WgpuGraphicsContext;
use super::conversions::{from_wgpu_texture_format, to_wgpu_texture_format, IntoWgpu};
use super::mipmaps::MipmapGenerator;

/// The first word of every SPIR-V module.
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Locks `mutex`, turning poisoning into a backend error.
pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    what: &str,
) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

/// Index of a stage in the per-stage arrays of a pipeline entry.
pub(crate) const fn stage_index(stage: ShaderStage) -> usize {
    match stage {
        ShaderStage::Vertex => 0,
        ShaderStage::Fragment => 1,
    }
}

struct MapAsyncFutureState {
    result: Mutex<Option<Result<(), ResourceError>>>,
    // The Waker to wake up the Future when the result is ready
    waker: Mutex<Option<Waker>>,
}

// Custom Future implementation to wrap the MapAsyncFutureState
struct MapAsyncOperationFuture {
    state: Arc<MapAsyncFutureState>,
}

impl Future for MapAsyncOperationFuture {
    type Output = Result<(), ResourceError>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let mut result_guard = match lock(&self.state.result, "map_async result") {
            Ok(guard) => guard,
            Err(e) => return Poll::Ready(Err(e)),
        };
        if let Some(res) = result_guard.take() {
            Poll::Ready(res)
        } else {
            // Store the waker so the callback can wake this Future later
            if let Ok(mut waker_guard) = self.state.waker.lock() {
                *waker_guard = Some(cx.waker().clone());
            }
            Poll::Pending
        }
    }
}

#[derive(Debug)]
struct WgpuShaderModuleEntry {
    wgpu_module: Arc<wgpu::ShaderModule>,
    stage: ShaderStage,
    entry_point: String,
    sampler_kinds: Vec<TextureKind>,
    num_uniform_buffers: u32,
}

#[derive(Debug)]
pub(crate) struct WgpuRenderPipelineEntry {
    pub(crate) wgpu_pipeline: Arc<wgpu::RenderPipeline>,
    /// Indexed by descriptor set: vertex samplers, vertex uniforms, fragment samplers,
    /// fragment uniforms.
    pub(crate) bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    /// Vertex buffer slot of the descriptor to wgpu buffer index.
    pub(crate) slot_map: HashMap<u32, u32>,
    pub(crate) sampler_counts: [usize; 2],
    pub(crate) uniform_buffers: [bool; 2],
}

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub(crate) wgpu_buffer: Arc<wgpu::Buffer>,
    pub(crate) size: u64,
}

/// A texture download waiting for its rows to be copied into the transfer buffer.
#[derive(Debug)]
pub(crate) struct PendingDownload {
    pub(crate) staging: wgpu::Buffer,
    pub(crate) offset: u64,
    pub(crate) padded_bytes_per_row: u32,
    pub(crate) bytes_per_row: u32,
    pub(crate) rows: u32,
}

/// Transfer buffers live in host memory. Uploads snapshot their range into a staging
/// buffer when recorded; downloads land in a mappable buffer and are unpacked into the
/// host copy on the first read.
#[derive(Debug)]
pub(crate) struct WgpuTransferBufferEntry {
    pub(crate) usage: TransferBufferUsage,
    pub(crate) data: Vec<u8>,
    pub(crate) pending: Vec<PendingDownload>,
}

#[derive(Debug)]
pub(crate) struct WgpuTextureEntry {
    pub(crate) wgpu_texture: Arc<wgpu::Texture>,
    pub(crate) sample_view: Option<Arc<wgpu::TextureView>>,
    pub(crate) format: TextureFormat,
}

#[derive(Debug)]
pub(crate) struct WgpuSamplerEntry {
    pub(crate) wgpu_sampler: Arc<wgpu::Sampler>,
}

#[derive(Debug)]
struct FenceEntry {
    submission: wgpu::SubmissionIndex,
    signalled: Arc<AtomicBool>,
}

#[derive(Debug)]
struct SwapchainFrame {
    texture: TextureId,
    surface_texture: wgpu::SurfaceTexture,
}

/// The internal, non-clonable state of the WgpuDevice.
/// This struct holds all the GPU resources and state, protected by an Arc.
#[derive(Debug)]
pub struct WgpuDeviceInternal {
    context: Arc<Mutex<WgpuGraphicsContext>>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    mipmaps: MipmapGenerator,

    shader_modules: Mutex<HashMap<ShaderId, WgpuShaderModuleEntry>>,
    pipelines: Mutex<HashMap<PipelineId, Arc<WgpuRenderPipelineEntry>>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    transfer_buffers: Mutex<HashMap<TransferBufferId, WgpuTransferBufferEntry>>,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,
    samplers: Mutex<HashMap<SamplerId, WgpuSamplerEntry>>,
    fences: Mutex<HashMap<FenceId, FenceEntry>>,
    swapchain_frame: Mutex<Option<SwapchainFrame>>,

    next_shader_id: AtomicUsize,
    next_pipeline_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_transfer_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_sampler_id: AtomicUsize,
    next_fence_id: AtomicUsize,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    /// A thread-safe counter to generate unique command buffer IDs.
    command_buffer_id_counter: AtomicU64,
}

/// A clonable, thread-safe handle to the WGPU graphics device.
/// It wraps the actual device state (`WgpuDeviceInternal`) in an Arc,
/// allowing it to be shared across threads and with command encoders.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

impl WgpuDevice {
    /// Wraps an initialized graphics context.
    pub fn new(context: Arc<Mutex<WgpuGraphicsContext>>) -> Result<Self, ResourceError> {
        let (device, queue) = {
            let guard = lock(&context, "context")?;
            (guard.device.clone(), guard.queue.clone())
        };
        let mipmaps = MipmapGenerator::new(&device);

        Ok(Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                device,
                queue,
                mipmaps,
                shader_modules: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                transfer_buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                fences: Mutex::new(HashMap::new()),
                swapchain_frame: Mutex::new(None),
                next_shader_id: AtomicUsize::new(0),
                next_pipeline_id: AtomicUsize::new(0),
                next_buffer_id: AtomicUsize::new(0),
                next_transfer_buffer_id: AtomicUsize::new(0),
                next_texture_id: AtomicUsize::new(0),
                next_sampler_id: AtomicUsize::new(0),
                next_fence_id: AtomicUsize::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        })
    }

    // --- ID Generation Helpers ---

    fn generate_texture_id(&self) -> TextureId {
        TextureId(
            self.internal
                .next_texture_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    /// Helper function to execute an operation with the graphics context locked.
    fn with_context<F, R>(&self, operation: F) -> Result<R, ResourceError>
    where
        F: FnOnce(&WgpuGraphicsContext) -> Result<R, ResourceError>,
    {
        let context_guard = lock(&self.internal.context, "context")?;
        operation(&context_guard)
    }

    /// Runs `operation` inside a validation error scope and reports what it caught.
    fn validated<R>(&self, operation: impl FnOnce(&wgpu::Device) -> R) -> Result<R, String> {
        let device = &self.internal.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = operation(device);
        match pollster::block_on(device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(result),
        }
    }

    pub(crate) fn wgpu_device(&self) -> &wgpu::Device {
        &self.internal.device
    }

    pub(crate) fn mipmaps(&self) -> &MipmapGenerator {
        &self.internal.mipmaps
    }

    /// Retrieves the pipeline entry. Returns `None` if the ID is invalid.
    pub(crate) fn get_pipeline(&self, id: PipelineId) -> Option<Arc<WgpuRenderPipelineEntry>> {
        let pipelines = self.internal.pipelines.lock().ok()?;
        pipelines.get(&id).map(Arc::clone)
    }

    /// Retrieves a reference-counted pointer to the internal WGPU buffer.
    /// Returns `None` if the ID is invalid.
    pub(crate) fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = self.internal.buffers.lock().ok()?;
        buffers.get(&id).map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    /// Retrieves the texture and its format. Returns `None` if the ID is invalid.
    pub(crate) fn get_wgpu_texture(&self, id: TextureId) -> Option<(Arc<wgpu::Texture>, TextureFormat)> {
        let textures = self.internal.textures.lock().ok()?;
        textures
            .get(&id)
            .map(|entry| (Arc::clone(&entry.wgpu_texture), entry.format))
    }

    /// Retrieves the view a texture is sampled through.
    pub(crate) fn get_sample_view(&self, id: TextureId) -> Option<Arc<wgpu::TextureView>> {
        let textures = self.internal.textures.lock().ok()?;
        textures.get(&id)?.sample_view.clone()
    }

    pub(crate) fn get_wgpu_sampler(&self, id: SamplerId) -> Option<Arc<wgpu::Sampler>> {
        let samplers = self.internal.samplers.lock().ok()?;
        samplers.get(&id).map(|entry| Arc::clone(&entry.wgpu_sampler))
    }

    /// Copies `len` bytes of an upload transfer buffer starting at `offset`.
    ///
    /// Bytes past the end of the buffer read as zero.
    pub(crate) fn snapshot_transfer_buffer(
        &self,
        id: TransferBufferId,
        offset: i64,
        len: usize,
    ) -> Option<Vec<u8>> {
        let buffers = self.internal.transfer_buffers.lock().ok()?;
        let entry = buffers.get(&id)?;
        Some(
            (0..len as i64)
                .map(|i| {
                    usize::try_from(offset + i)
                        .ok()
                        .and_then(|at| entry.data.get(at).copied())
                        .unwrap_or(0)
                })
                .collect(),
        )
    }

    /// Queues a download whose rows are copied into the transfer buffer on the next read.
    pub(crate) fn register_download(&self, id: TransferBufferId, download: PendingDownload) {
        match self.internal.transfer_buffers.lock() {
            Ok(mut buffers) => match buffers.get_mut(&id) {
                Some(entry) => entry.pending.push(download),
                None => log::warn!("WgpuDevice: Download into unknown transfer buffer {id:?}"),
            },
            Err(e) => log::error!("WgpuDevice: Mutex poisoned (transfer_buffers): {e}"),
        }
    }

    /// Polls the underlying wgpu::Device in a blocking manner.
    /// This waits for the queue to be empty and for all callbacks to be processed.
    pub fn poll_device_blocking(&self) {
        if let Err(e) = self.internal.device.poll(wgpu::PollType::Wait) {
            log::warn!("WgpuDevice: Failed to poll device: {:?}", e);
        }
    }

    /// Polls the underlying wgpu::Device in a non-blocking manner.
    /// This processes `on_submitted_work_done` and `map_async` callbacks of completed work.
    pub fn poll_device_non_blocking(&self) {
        if let Err(e) = self.internal.device.poll(wgpu::PollType::Poll) {
            log::warn!("WgpuDevice: Failed to poll device (non-blocking): {:?}", e);
        }
    }

    /// Reconfigures the swapchain for a new window size.
    pub fn resize(&self, width: u32, height: u32) {
        match self.internal.context.lock() {
            Ok(mut context) => context.resize(width, height),
            Err(e) => log::error!("WgpuDevice: Mutex poisoned (context) on resize: {e}"),
        }
    }

    /// (crate-internal) Registers a finished wgpu::CommandBuffer, storing it
    /// in a map and returning an abstract ID for it.
    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let new_id_raw = self
            .internal
            .command_buffer_id_counter
            .fetch_add(1, Ordering::SeqCst);
        let new_id = CommandBufferId(new_id_raw);

        match self.internal.pending_command_buffers.lock() {
            Ok(mut guard) => {
                guard.insert(new_id, buffer);
            }
            Err(e) => log::error!("WgpuDevice: Mutex poisoned (pending_command_buffers): {e}"),
        }

        new_id
    }

    /// Maps the staging buffer of a finished download and copies its rows, dropping the
    /// row padding, into `data`.
    fn resolve_download(&self, data: &mut [u8], download: PendingDownload) -> Result<(), ResourceError> {
        let state = Arc::new(MapAsyncFutureState {
            result: Mutex::new(None),
            waker: Mutex::new(None),
        });
        let callback_state = Arc::clone(&state);

        let slice = download.staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let result = result.map_err(|e| ResourceError::BackendError(format!("map_async failed: {e}")));
            if let Ok(mut guard) = callback_state.result.lock() {
                *guard = Some(result);
            }
            if let Some(waker) = callback_state.waker.lock().ok().and_then(|mut w| w.take()) {
                waker.wake();
            }
        });

        self.poll_device_blocking();
        pollster::block_on(MapAsyncOperationFuture { state })?;

        {
            let mapped = slice.get_mapped_range();
            let row_len = download.bytes_per_row as usize;
            for row in 0..download.rows as usize {
                let src = row * download.padded_bytes_per_row as usize;
                let dst = download.offset as usize + row * row_len;
                let (Some(target), Some(source)) = (
                    data.get_mut(dst..dst + row_len),
                    mapped.get(src..src + row_len),
                ) else {
                    return Err(ResourceError::OutOfBounds);
                };
                target.copy_from_slice(source);
            }
        }
        download.staging.unmap();
        Ok(())
    }

    fn bind_group_layout(
        device: &wgpu::Device,
        stage: ShaderStage,
        module: &WgpuShaderModuleEntry,
        uniforms: bool,
    ) -> wgpu::BindGroupLayout {
        let visibility: wgpu::ShaderStages = stage.into_wgpu();

        let entries: Vec<wgpu::BindGroupLayoutEntry> = if uniforms {
            if module.num_uniform_buffers == 0 {
                Vec::new()
            } else {
                vec![wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }]
            }
        } else {
            // Each sampler slot is a texture at binding 2n and its sampler at 2n + 1.
            module
                .sampler_kinds
                .iter()
                .enumerate()
                .flat_map(|(slot, kind)| {
                    let binding = slot as u32 * 2;
                    [
                        wgpu::BindGroupLayoutEntry {
                            binding,
                            visibility,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: (*kind).into_wgpu(),
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: binding + 1,
                            visibility,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ]
                })
                .collect()
        };

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(if uniforms { "Uniforms" } else { "Samplers" }),
            entries: &entries,
        })
    }
}

impl GpuDevice for WgpuDevice {
    fn device_info(&self) -> DeviceInfo {
        self.with_context(|context| {
            Ok(DeviceInfo {
                name: context.adapter_name.clone(),
                backend: format!("{:?}", context.adapter_backend),
                max_texture_dimension: context.device_limits.max_texture_dimension_2d,
                max_anisotropy: 16,
            })
        })
        .unwrap_or_default()
    }

    fn supports_texture_format(&self, format: TextureFormat, usage: TextureUsage) -> bool {
        let Some(wgpu_format) = to_wgpu_texture_format(format) else {
            return false;
        };
        if !self
            .internal
            .device
            .features()
            .contains(wgpu_format.required_features())
        {
            return false;
        }

        let needed: wgpu::TextureUsages = usage.into_wgpu();
        let needed = needed - (wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST);
        self.with_context(|context| {
            Ok(context
                .adapter
                .get_texture_format_features(wgpu_format)
                .allowed_usages
                .contains(needed))
        })
        .unwrap_or(false)
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        // Copies move whole 4-byte words.
        let size = descriptor.size.max(1).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let wgpu_buffer = self.internal.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size,
            usage: descriptor.usage.into_wgpu(),
            mapped_at_creation: false,
        });

        let id = BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size,
            },
        );

        log::debug!(
            "WgpuDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let entry = lock(&self.internal.buffers, "buffers")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        entry.wgpu_buffer.destroy();
        log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?} ({} bytes)", entry.size);
        Ok(())
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
            WgpuTransferBufferEntry {
                usage: descriptor.usage,
                data: vec![0; size],
                pending: Vec::new(),
            },
        );

        log::debug!(
            "WgpuDevice: Created {:?} transfer buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.usage,
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            size
        );
        Ok(id)
    }

    fn destroy_transfer_buffer(&self, id: TransferBufferId) -> Result<(), ResourceError> {
        let entry = lock(&self.internal.transfer_buffers, "transfer_buffers")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        for download in entry.pending {
            download.staging.destroy();
        }
        log::debug!("WgpuDevice: Destroyed transfer buffer with ID: {id:?}");
        Ok(())
    }

    fn write_transfer_buffer(
        &self,
        id: TransferBufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.internal.transfer_buffers, "transfer_buffers")?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if entry.usage != TransferBufferUsage::Upload {
            log::warn!("WgpuDevice: Writing into download transfer buffer {id:?}");
        }

        let start = usize::try_from(offset).map_err(|_| ResourceError::OutOfBounds)?;
        entry
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
        let mut buffers = lock(&self.internal.transfer_buffers, "transfer_buffers")?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let size = usize::try_from(size).map_err(|_| ResourceError::OutOfBounds)?;
        if size > entry.data.len() {
            return Err(ResourceError::OutOfBounds);
        }

        for download in std::mem::take(&mut entry.pending) {
            self.resolve_download(&mut entry.data, download)?;
        }

        reader(&entry.data[..size]);
        Ok(())
    }

    // --- Texture Operations ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or_default();
        let format = to_wgpu_texture_format(descriptor.format).ok_or_else(|| {
            ResourceError::BackendError(format!("{:?} has no wgpu equivalent", descriptor.format))
        })?;

        let allowed = self.with_context(|context| {
            Ok(context
                .adapter
                .get_texture_format_features(format)
                .allowed_usages)
        })?;
        let copies = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
        let requested: wgpu::TextureUsages = descriptor.usage.into_wgpu();
        if !allowed.contains(requested - copies) {
            return Err(ResourceError::BackendError(format!(
                "{format:?} does not support {:?}",
                requested - copies
            )));
        }
        // Depth24Plus and friends cannot be copied at all.
        let usage = (requested - copies) | (copies & allowed);

        let wgpu_texture = self.internal.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: descriptor.layers.max(1),
            },
            mip_level_count: descriptor.mip_levels.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let sample_view = usage
            .contains(wgpu::TextureUsages::TEXTURE_BINDING)
            .then(|| {
                Arc::new(wgpu_texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(label),
                    dimension: Some(descriptor.kind.into_wgpu()),
                    aspect: if format.is_depth_stencil_format() {
                        wgpu::TextureAspect::DepthOnly
                    } else {
                        wgpu::TextureAspect::All
                    },
                    ..Default::default()
                }))
            });

        let id = self.generate_texture_id();
        lock(&self.internal.textures, "textures")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
                sample_view,
                format: descriptor.format,
            },
        );

        log::debug!(
            "WgpuDevice: Created texture '{}' with ID: {:?}, {}x{} {:?}, {} levels",
            label,
            id,
            descriptor.width,
            descriptor.height,
            descriptor.format,
            descriptor.mip_levels
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let entry = lock(&self.internal.textures, "textures")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        entry.wgpu_texture.destroy();
        log::debug!("WgpuDevice: Destroyed texture with ID: {id:?}");
        Ok(())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let min_filter: wgpu::FilterMode = descriptor.min_filter.into_wgpu();
        let mag_filter: wgpu::FilterMode = descriptor.mag_filter.into_wgpu();
        let mipmap_filter: wgpu::FilterMode = descriptor.mipmap_mode.into_wgpu();

        // wgpu only filters anisotropically when every filter is linear.
        let all_linear = [min_filter, mag_filter, mipmap_filter]
            .iter()
            .all(|&f| f == wgpu::FilterMode::Linear);
        let anisotropy_clamp = match descriptor.max_anisotropy {
            Some(max) if all_linear => max.clamp(1, 16) as u16,
            _ => 1,
        };

        let lod_min_clamp = descriptor.min_lod.max(0.0);
        let wgpu_sampler = self.internal.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture sampler"),
            address_mode_u: descriptor.address_mode_u.into_wgpu(),
            address_mode_v: descriptor.address_mode_v.into_wgpu(),
            address_mode_w: descriptor.address_mode_w.into_wgpu(),
            mag_filter,
            min_filter,
            mipmap_filter,
            lod_min_clamp,
            lod_max_clamp: descriptor.max_lod.clamp(lod_min_clamp, 32.0),
            compare: None,
            anisotropy_clamp,
            border_color: None,
        });

        let id = SamplerId(self.internal.next_sampler_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.samplers, "samplers")?.insert(
            id,
            WgpuSamplerEntry {
                wgpu_sampler: Arc::new(wgpu_sampler),
            },
        );
        log::debug!("WgpuDevice: Created sampler with ID: {id:?}");
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        lock(&self.internal.samplers, "samplers")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        log::debug!("WgpuDevice: Destroyed sampler with ID: {id:?}");
        Ok(())
    }

    // --- Shader Module Operations ---

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<ShaderId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();

        let code = &descriptor.code;
        let magic = code
            .get(..4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        if code.len() % 4 != 0 || magic != Some(SPIRV_MAGIC) {
            return Err(ShaderError::CompilationError {
                label,
                details: "not a SPIR-V module".to_string(),
            }
            .into());
        }

        log::debug!("WgpuDevice: Creating wgpu::ShaderModule with label: {label:?}");
        let module = self
            .validated(|device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&label),
                    source: wgpu::util::make_spirv(code),
                })
            })
            .map_err(|details| ShaderError::CompilationError {
                label: label.clone(),
                details,
            })?;

        let id = ShaderId(self.internal.next_shader_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.shader_modules, "shader_modules")?.insert(
            id,
            WgpuShaderModuleEntry {
                wgpu_module: Arc::new(module),
                stage: descriptor.stage,
                entry_point: descriptor.entry_point.to_string(),
                sampler_kinds: descriptor.sampler_kinds.clone(),
                num_uniform_buffers: descriptor.num_uniform_buffers,
            },
        );

        log::info!("WgpuDevice: Successfully created shader module '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError> {
        let mut modules_guard = lock(&self.internal.shader_modules, "shader_modules")?;

        if modules_guard.remove(&id).is_some() {
            log::debug!("WgpuDevice: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // -- Render Pipeline Operations ---

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, ResourceError> {
        let label = descriptor.label.as_deref().map(String::from);
        let failed = |details: String| {
            ResourceError::Pipeline(PipelineError::CompilationFailed {
                label: label.clone(),
                details,
            })
        };
        log::debug!("WgpuDevice: Creating render pipeline with label: {label:?}");
        let device = &self.internal.device;

        // 1. Get the shader modules
        let modules = lock(&self.internal.shader_modules, "shader_modules")?;
        let vs = modules
            .get(&descriptor.vertex_shader)
            .ok_or(ShaderError::NotFound {
                id: descriptor.vertex_shader,
            })?;
        let fs = modules
            .get(&descriptor.fragment_shader)
            .ok_or(ShaderError::NotFound {
                id: descriptor.fragment_shader,
            })?;
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err(failed("shader stages do not match their slots".to_string()));
        }

        // 2. Bind group layouts, in descriptor set order
        let bind_group_layouts = vec![
            Self::bind_group_layout(device, ShaderStage::Vertex, vs, false),
            Self::bind_group_layout(device, ShaderStage::Vertex, vs, true),
            Self::bind_group_layout(device, ShaderStage::Fragment, fs, false),
            Self::bind_group_layout(device, ShaderStage::Fragment, fs, true),
        ];

        // 3. Convert vertex buffers layout. Slots are compacted to consecutive indices.
        let mut buffers = descriptor.vertex_input.buffers.clone();
        buffers.sort_by_key(|b| b.slot);
        let slot_map: HashMap<u32, u32> = buffers
            .iter()
            .enumerate()
            .map(|(index, b)| (b.slot, index as u32))
            .collect();

        let wgpu_vertex_attributes_storage: Vec<Vec<wgpu::VertexAttribute>> = buffers
            .iter()
            .map(|b| {
                descriptor
                    .vertex_input
                    .attributes
                    .iter()
                    .filter(|a| a.buffer_slot == b.slot)
                    .map(|a| wgpu::VertexAttribute {
                        format: a.format.into_wgpu(),
                        offset: u64::from(a.offset),
                        shader_location: a.location,
                    })
                    .collect()
            })
            .collect();

        let wgpu_vertex_buffers_layouts: Vec<wgpu::VertexBufferLayout> = buffers
            .iter()
            .zip(wgpu_vertex_attributes_storage.iter())
            .map(|(b, attributes)| wgpu::VertexBufferLayout {
                array_stride: u64::from(b.pitch),
                step_mode: b.input_rate.into_wgpu(),
                attributes,
            })
            .collect();

        // 4. Converts primitive state
        let mut polygon_mode: wgpu::PolygonMode = descriptor.rasterizer.fill_mode.into_wgpu();
        if polygon_mode == wgpu::PolygonMode::Line
            && !device.features().contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            log::warn!("WgpuDevice: Line fill mode is not supported, filling polygons");
            polygon_mode = wgpu::PolygonMode::Fill;
        }
        let primitive_state = wgpu::PrimitiveState {
            topology: descriptor.primitive_type.into_wgpu(),
            strip_index_format: None,
            front_face: descriptor.rasterizer.front_face.into_wgpu(),
            cull_mode: descriptor.rasterizer.cull_mode.into_wgpu(),
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        };

        // 5. Convert depth state. Without the depth test nothing is written either.
        let depth_stencil_state = match descriptor.depth_stencil_format {
            Some(format) => {
                let test = descriptor.depth_stencil.enable_depth_test;
                Some(wgpu::DepthStencilState {
                    format: to_wgpu_texture_format(format)
                        .filter(|f| f.is_depth_stencil_format())
                        .ok_or(PipelineError::InvalidDepthFormat(format))?,
                    depth_write_enabled: test && descriptor.depth_stencil.enable_depth_write,
                    depth_compare: if test {
                        descriptor.depth_stencil.compare_op.into_wgpu()
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                })
            }
            None => None,
        };

        // 6. Convert color target states. Formats that can't blend get no blend state.
        let color_target_states = descriptor
            .color_targets
            .iter()
            .map(|target| {
                let format = to_wgpu_texture_format(target.format)
                    .ok_or_else(|| failed(format!("{:?} can't be rendered to", target.format)))?;
                let b = target.blend_state;
                let blendable = format
                    .guaranteed_format_features(device.features())
                    .flags
                    .contains(wgpu::TextureFormatFeatureFlags::BLENDABLE);
                Ok(Some(wgpu::ColorTargetState {
                    format,
                    blend: (b.enable_blend && blendable).then(|| wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: b.src_color_factor.into_wgpu(),
                            dst_factor: b.dst_color_factor.into_wgpu(),
                            operation: b.color_op.into_wgpu(),
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: b.src_alpha_factor.into_wgpu(),
                            dst_factor: b.dst_alpha_factor.into_wgpu(),
                            operation: b.alpha_op.into_wgpu(),
                        },
                    }),
                    write_mask: b.write_mask.into_wgpu(),
                }))
            })
            .collect::<Result<Vec<_>, ResourceError>>()?;

        // 7. Convert multisample state
        let multisample_state = wgpu::MultisampleState {
            count: descriptor.multisample.sample_count.max(1),
            mask: u64::from(descriptor.multisample.sample_mask),
            alpha_to_coverage_enabled: false,
        };

        // 8. Create pipeline layout and render pipeline
        let pipeline = self
            .validated(|device| {
                let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
                let pipeline_layout_label = label.as_deref().map(|s| format!("{s}_Layout"));
                let wgpu_pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: pipeline_layout_label.as_deref(),
                        bind_group_layouts: &layout_refs,
                        push_constant_ranges: &[],
                    });

                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: label.as_deref(),
                    layout: Some(&wgpu_pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &vs.wgpu_module,
                        entry_point: Some(&vs.entry_point),
                        buffers: &wgpu_vertex_buffers_layouts,
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &fs.wgpu_module,
                        entry_point: Some(&fs.entry_point),
                        targets: &color_target_states,
                        compilation_options: Default::default(),
                    }),
                    primitive: primitive_state,
                    depth_stencil: depth_stencil_state,
                    multisample: multisample_state,
                    multiview: None,
                    cache: None,
                })
            })
            .map_err(failed)?;

        let entry = WgpuRenderPipelineEntry {
            wgpu_pipeline: Arc::new(pipeline),
            bind_group_layouts,
            slot_map,
            sampler_counts: [vs.sampler_kinds.len(), fs.sampler_kinds.len()],
            uniform_buffers: [vs.num_uniform_buffers > 0, fs.num_uniform_buffers > 0],
        };
        drop(modules);

        let id = PipelineId(self.internal.next_pipeline_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.pipelines, "pipelines")?.insert(id, Arc::new(entry));

        log::info!(
            "WgpuDevice: Successfully created render pipeline '{}' with ID: {:?}",
            label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_graphics_pipeline(&self, id: PipelineId) -> Result<(), ResourceError> {
        let mut pipelines_guard = lock(&self.internal.pipelines, "pipelines")?;

        if pipelines_guard.remove(&id).is_some() {
            log::debug!("WgpuDevice: Destroyed render pipeline with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    // --- Commands and synchronization ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let descriptor = wgpu::CommandEncoderDescriptor { label };
        let encoder = self.internal.device.create_command_encoder(&descriptor);
        Box::new(WgpuCommandEncoder::new(encoder, self.clone()))
    }

    fn submit_command_buffer(&self, id: CommandBufferId) -> Result<FenceId, ResourceError> {
        let buffer = lock(&self.internal.pending_command_buffers, "pending_command_buffers")?
            .remove(&id)
            .ok_or_else(|| {
                log::error!("WgpuDevice: Attempted to submit a CommandBufferId ({id:?}) that does not exist.");
                ResourceError::NotFound
            })?;

        let submission = self.internal.queue.submit(std::iter::once(buffer));
        let signalled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&signalled);
        self.internal
            .queue
            .on_submitted_work_done(move || flag.store(true, Ordering::Release));

        let fence = FenceId(self.internal.next_fence_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.fences, "fences")?.insert(
            fence,
            FenceEntry {
                submission,
                signalled,
            },
        );
        Ok(fence)
    }

    fn query_fence(&self, fence: FenceId) -> bool {
        self.poll_device_non_blocking();
        match self.internal.fences.lock() {
            Ok(fences) => fences
                .get(&fence)
                .is_none_or(|entry| entry.signalled.load(Ordering::Acquire)),
            Err(_) => true,
        }
    }

    fn wait_for_fences(&self, fences: &[FenceId], wait_all: bool) -> Result<(), ResourceError> {
        let mut pending: Vec<(FenceId, wgpu::SubmissionIndex)> = {
            let entries = lock(&self.internal.fences, "fences")?;
            fences
                .iter()
                .filter_map(|id| entries.get(id).map(|e| (*id, e)))
                .filter(|(_, e)| !e.signalled.load(Ordering::Acquire))
                .map(|(id, e)| (id, e.submission.clone()))
                .collect()
        };
        if pending.is_empty() || (!wait_all && pending.len() < fences.len()) {
            return Ok(());
        }

        // The queue completes in submission order: the newest fence covers all of
        // them and the oldest is the first to signal.
        pending.sort_by_key(|(id, _)| id.0);
        let target = if wait_all { pending.pop() } else { pending.into_iter().next() };

        if let Some((_, submission)) = target {
            self.internal
                .device
                .poll(wgpu::PollType::WaitForSubmissionIndex(submission))
                .map_err(|e| ResourceError::BackendError(format!("Fence wait failed: {e}")))?;
        }
        Ok(())
    }

    fn release_fence(&self, fence: FenceId) {
        if let Ok(mut fences) = self.internal.fences.lock() {
            fences.remove(&fence);
        }
    }

    // --- Swapchain ---

    fn acquire_swapchain_texture(&self) -> Result<Option<SwapchainTexture>, RenderError> {
        let context = lock(&self.internal.context, "context")?;
        let Some(surface) = &context.surface else {
            return Ok(None);
        };

        let surface_texture = match surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("WgpuDevice: Timed out acquiring the swapchain texture");
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::warn!("WgpuDevice: Swapchain outdated, reconfiguring");
                context.reconfigure();
                return Ok(None);
            }
            Err(e) => return Err(RenderError::SurfaceAcquisitionFailed(e.to_string())),
        };

        let wgpu_texture = surface_texture.texture.clone();
        let (width, height) = (wgpu_texture.width(), wgpu_texture.height());
        let format = from_wgpu_texture_format(wgpu_texture.format())
            .unwrap_or(TextureFormat::Bgra8Unorm);

        let id = self.generate_texture_id();
        lock(&self.internal.textures, "textures")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
                sample_view: None,
                format,
            },
        );

        let previous = lock(&self.internal.swapchain_frame, "swapchain_frame")?.replace(SwapchainFrame {
            texture: id,
            surface_texture,
        });
        if let Some(previous) = previous {
            log::warn!("WgpuDevice: Dropping a swapchain texture that was never presented");
            lock(&self.internal.textures, "textures")?.remove(&previous.texture);
        }

        Ok(Some(SwapchainTexture {
            texture: id,
            format,
            width,
            height,
        }))
    }

    fn present(&self) -> Result<(), RenderError> {
        let frame = lock(&self.internal.swapchain_frame, "swapchain_frame")?.take();
        let Some(frame) = frame else {
            log::trace!("WgpuDevice: Nothing to present");
            return Ok(());
        };

        lock(&self.internal.textures, "textures")?.remove(&frame.texture);
        frame.surface_texture.present();
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        self.with_context(|context| Ok(from_wgpu_texture_format(context.surface_config.format)))
            .ok()
            .flatten()
            .unwrap_or(TextureFormat::Bgra8Unorm)
    }
}
