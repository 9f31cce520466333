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

//! The rendering context: render state plus every backend object, driven frame by frame.
//!
//! All recording goes into one command stream that is created on demand and submitted
//! at the end of the frame, or earlier when a readback needs the work done so far.
//! Uploads, mipmap generation and clears are ordered with draws by that stream alone.

mod buffers;
mod draw;
mod framebuffers;
mod shaders;
mod state;
mod textures;


pub use self::state::RenderState;

use super::arena::Arena;
use super::common_buffer::{IndexBuffer, VertexBuffer};
use super::frame::FrameCommands;
use super::framebuffer::{DefaultFramebufferState, Framebuffer, RenderTarget};
use super::ids::IdAllocator;
use super::pipeline_cache::PipelineCache;
use super::readback::ReadbackRing;
use super::shader_object::ShaderObject;
use super::shader_program::ShaderProgram;
use super::texture::Texture;
use super::vertex_array::VertexArray;
use super::TextureHandle;
use crate::renderer::api::{Pixmap, PixmapFormat, PixmapOrigin, TextureClass, TextureParams, TextureType};
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::gpu::{FenceId, SwapchainTexture};
use crate::renderer::settings::RenderSettings;
use crate::renderer::GpuDevice;
use std::fmt;
use std::sync::Arc;

/// Returns the frame's command stream, opening it if nothing has been recorded yet.
pub(super) fn frame_commands<'a>(
    frame: &'a mut Option<FrameCommands>,
    device: &dyn GpuDevice,
) -> &'a mut FrameCommands {
    frame.get_or_insert_with(|| FrameCommands::new(device.create_command_encoder(Some("Frame"))))
}

fn create_null_texture(
    device: &dyn GpuDevice,
    textures: &mut Arena<Texture>,
    frame: &mut Option<FrameCommands>,
    class: TextureClass,
) -> Result<TextureHandle, ResourceError> {
    let (layers, label) = match class {
        TextureClass::D2 => (1, "Null texture (2D)"),
        TextureClass::Cubemap => (6, "Null texture (cube)"),
    };

    let params = TextureParams {
        class,
        layers,
        ..TextureParams::new_2d(1, 1, TextureType::Rgba8)
    };

    let mut texture = Texture::create(device, &params, label, 1)?;
    let texel = [0xFFu8; 4];
    let white = Pixmap::new(1, 1, PixmapFormat::Rgba8, PixmapOrigin::TopLeft, &texel[..]);

    let commands = frame_commands(frame, device);
    for layer in 0..layers {
        if let Err(e) = texture.fill_region(device, commands, 0, layer, 0, 0, &white) {
            texture.destroy(device);
            return Err(e);
        }
    }

    Ok(textures.insert(texture))
}

/// Owns the render state and every object created through it.
///
/// Objects are addressed by generational handles. Textures and shader objects are
/// reference counted because framebuffers, sampler bindings and programs share them;
/// the `*_destroy` methods drop the caller's reference.
pub struct RenderContext {
    device: Arc<dyn GpuDevice>,
    settings: RenderSettings,
    state: RenderState,

    // --- Frame ---
    frame: Option<FrameCommands>,
    frame_active: bool,
    swapchain: Option<SwapchainTexture>,
    last_frame_fence: Option<FenceId>,
    frame_count: u64,

    // --- Resources ---
    pipelines: PipelineCache,
    textures: Arena<Texture>,
    null_textures: [TextureHandle; 2],
    shader_objects: Arena<ShaderObject>,
    programs: Arena<ShaderProgram>,
    program_ids: IdAllocator,
    vertex_buffers: Arena<VertexBuffer>,
    index_buffers: Arena<IndexBuffer>,
    vertex_arrays: Arena<VertexArray>,
    layout_ids: IdAllocator,
    framebuffers: Arena<Framebuffer>,
    default_framebuffer: DefaultFramebufferState,
    readback: ReadbackRing,

    shut_down: bool,
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("device", &self.device)
            .field("frame_active", &self.frame_active)
            .field("frame_count", &self.frame_count)
            .field("pipelines", &self.pipelines.len())
            .field("textures", &self.textures.len())
            .field("programs", &self.programs.len())
            .field("readback", &self.readback)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Creates a context on top of a device.
    ///
    /// The null textures bound to unassigned sampler slots are created and filled here;
    /// their uploads are recorded into the first frame.
    ///
    /// ## Errors
    /// * `RenderError::ResourceError` - If the device fails to create the null textures.
    pub fn new(device: Arc<dyn GpuDevice>, settings: RenderSettings) -> Result<Self, RenderError> {
        let info = device.device_info();
        log::info!(
            "RenderContext: using '{}' ({}), readback ring of {}",
            info.name,
            info.backend,
            settings.readback_ring_size
        );

        let mut textures = Arena::new();
        let mut frame = None;
        let null_textures = [
            create_null_texture(&*device, &mut textures, &mut frame, TextureClass::D2)?,
            create_null_texture(&*device, &mut textures, &mut frame, TextureClass::Cubemap)?,
        ];

        Ok(Self {
            readback: ReadbackRing::new(settings.readback_ring_size),
            device,
            settings,
            state: RenderState::default(),
            frame,
            frame_active: false,
            swapchain: None,
            last_frame_fence: None,
            frame_count: 0,
            pipelines: PipelineCache::new(),
            textures,
            null_textures,
            shader_objects: Arena::new(),
            programs: Arena::new(),
            program_ids: IdAllocator::new(),
            vertex_buffers: Arena::new(),
            index_buffers: Arena::new(),
            vertex_arrays: Arena::new(),
            layout_ids: IdAllocator::new(),
            framebuffers: Arena::new(),
            default_framebuffer: DefaultFramebufferState::default(),
            shut_down: false,
        })
    }

    /// Returns the device.
    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    /// Returns the settings the context was created with.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Returns the pipeline cache.
    pub fn pipeline_cache(&self) -> &PipelineCache {
        &self.pipelines
    }

    /// Returns the number of completed frames.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns `true` between [`RenderContext::begin_frame`] and [`RenderContext::end_frame`].
    pub fn is_frame_active(&self) -> bool {
        self.frame_active
    }

    /// Returns the number of readbacks whose download has not completed yet.
    pub fn pending_readbacks(&self) -> usize {
        self.readback.in_flight()
    }

    /// Starts recording a frame.
    ///
    /// Waits for the previous frame if the settings ask for it, then acquires the
    /// swapchain texture. While the window is minimized there is none, and draws to
    /// the default framebuffer are skipped.
    ///
    /// ## Errors
    /// * `RenderError::FrameInProgress` - If a frame is already being recorded.
    /// * `RenderError::SurfaceAcquisitionFailed` - If the swapchain cannot be acquired.
    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.frame_active {
            return Err(RenderError::FrameInProgress);
        }

        if let Some(fence) = self.last_frame_fence.take() {
            if self.settings.wait_for_previous_frame {
                self.device.wait_for_fences(&[fence], true)?;
            }
            self.device.release_fence(fence);
        }

        self.swapchain = self.device.acquire_swapchain_texture()?;
        if self.swapchain.is_none() {
            log::debug!("RenderContext: no swapchain texture for frame {}", self.frame_count);
        }

        frame_commands(&mut self.frame, &*self.device);
        self.frame_active = true;
        Ok(())
    }

    /// Finishes the frame: executes pending clears, submits, presents and completes
    /// finished readbacks.
    ///
    /// ## Errors
    /// * `RenderError::NoActiveFrame` - If no frame is being recorded.
    /// * Any error of [`GpuDevice::submit_command_buffer`] or [`GpuDevice::present`].
    pub fn end_frame(&mut self) -> Result<(), RenderError> {
        if !self.frame_active {
            return Err(RenderError::NoActiveFrame);
        }

        self.frame_active = false;
        self.flush_pending_clears();

        let fence = self.submit_pending()?;
        if let Some(previous) = std::mem::replace(&mut self.last_frame_fence, fence) {
            self.device.release_fence(previous);
        }

        if self.swapchain.take().is_some() {
            self.device.present()?;
        }

        self.readback.process(&*self.device);
        self.frame_count += 1;
        Ok(())
    }

    /// Submits everything recorded so far and blocks until the device has executed it.
    pub fn flush_sync(&mut self) -> Result<(), RenderError> {
        self.flush_pending_clears();

        if let Some(fence) = self.submit_pending()? {
            let waited = self.device.wait_for_fences(&[fence], true);
            self.device.release_fence(fence);
            waited?;
        }

        Ok(())
    }

    /// Completes every readback whose download has finished. Never blocks.
    pub fn process_read_requests(&mut self) {
        self.readback.process(&*self.device);
    }

    /// Blocks until every readback has completed and releases the readback buffers.
    pub fn finalize_read_requests(&mut self) {
        self.readback.finalize(&*self.device);
    }

    fn submit_pending(&mut self) -> Result<Option<FenceId>, ResourceError> {
        let Some(commands) = self.frame.take() else {
            return Ok(None);
        };

        let fence = self.device.submit_command_buffer(commands.finish())?;
        Ok(Some(fence))
    }

    /// Submits the recorded work without waiting for it.
    ///
    /// Later submissions still execute after it.
    fn submit_and_release(&mut self) -> Result<(), ResourceError> {
        if let Some(fence) = self.submit_pending()? {
            self.device.release_fence(fence);
        }
        Ok(())
    }

    /// Records a render pass for every target with a clear waiting for it.
    fn flush_pending_clears(&mut self) {
        let Self {
            device,
            frame,
            framebuffers,
            textures,
            default_framebuffer,
            swapchain,
            ..
        } = self;
        let device: &dyn GpuDevice = &**device;

        if default_framebuffer.has_pending_clear() {
            let outputs = default_framebuffer.setup_outputs(swapchain.as_ref());
            if !outputs.color_attachments.is_empty() {
                frame_commands(frame, device).begin_render_pass(
                    RenderTarget::Default,
                    &outputs,
                    Some("Clear"),
                );
            }
        }

        for (handle, fb) in framebuffers.iter_mut() {
            if !fb.has_pending_clear() {
                continue;
            }

            let outputs = fb.setup_outputs(textures);
            if outputs.color_attachments.is_empty() && outputs.depth_stencil_attachment.is_none() {
                continue;
            }

            frame_commands(frame, device).begin_render_pass(
                RenderTarget::Framebuffer(handle),
                &outputs,
                Some(fb.label()),
            );
            fb.taint(textures);
        }

        if let Some(frame) = frame {
            frame.end_pass();
        }
    }

    /// Closes the open render pass if it draws into `target`.
    fn end_pass_on(&mut self, target: RenderTarget) {
        if let Some(frame) = &mut self.frame {
            if frame.render_target() == Some(target) {
                frame.end_pass();
            }
        }
    }

    /// Waits for all outstanding work and releases every object.
    ///
    /// Called by `Drop`; calling it again is a no-op.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        log::info!("RenderContext: shutting down after {} frames", self.frame_count);

        let device = Arc::clone(&self.device);
        let device: &dyn GpuDevice = &*device;

        self.readback.finalize(device);
        self.frame_active = false;
        self.swapchain = None;

        let mut fences: Vec<FenceId> = self.last_frame_fence.take().into_iter().collect();
        match self.submit_pending() {
            Ok(fence) => fences.extend(fence),
            Err(e) => log::error!("RenderContext: failed to submit final commands: {e}"),
        }

        if !fences.is_empty() {
            if let Err(e) = device.wait_for_fences(&fences, true) {
                log::error!("RenderContext: failed to wait for the device: {e}");
            }
            for fence in fences {
                device.release_fence(fence);
            }
        }

        self.pipelines.wipe(device);

        for (_, program) in self.programs.drain() {
            self.program_ids.release(program.id);
        }

        for (_, object) in self.shader_objects.drain() {
            object.destroy(device, &mut self.textures);
        }

        for (_, vao) in self.vertex_arrays.drain() {
            self.layout_ids.release(vao.layout_id);
        }

        for (_, vbo) in self.vertex_buffers.drain() {
            vbo.buffer.destroy(device);
        }

        for (_, ibo) in self.index_buffers.drain() {
            ibo.buffer.destroy(device);
        }

        self.framebuffers.drain();

        for (_, texture) in self.textures.drain() {
            texture.destroy(device);
        }

        self.state = RenderState::default();
        self.default_framebuffer = DefaultFramebufferState::default();
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
