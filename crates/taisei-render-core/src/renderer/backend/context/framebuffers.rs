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

//! Framebuffer operations of the rendering context, including clears and readback.

use super::RenderContext;
use crate::math::{Color, Extent2D, FloatRect, IntRect};
use crate::renderer::api::{BufferKind, FramebufferAttachment, OutputMapping};
use crate::renderer::backend::framebuffer::{Framebuffer, RenderTarget};
use crate::renderer::backend::readback::ReadbackCallback;
use crate::renderer::backend::{FramebufferHandle, TextureHandle};
use crate::renderer::error::{RenderError, ResourceError, TextureError};
use crate::renderer::gpu::TextureRegion;
use std::sync::Arc;

/// Resolves a readback rectangle against the size of the attachment being read.
fn readback_region(rect: IntRect, width: u32, height: u32) -> Option<(u32, u32)> {
    let x = u32::try_from(rect.x).ok()?;
    let y = u32::try_from(rect.y).ok()?;
    let fits = !rect.is_empty()
        && x.checked_add(rect.w).is_some_and(|r| r <= width)
        && y.checked_add(rect.h).is_some_and(|b| b <= height);
    fits.then_some((x, y))
}

impl RenderContext {
    fn framebuffer_mut(
        &mut self,
        handle: FramebufferHandle,
    ) -> Result<&mut Framebuffer, ResourceError> {
        self.framebuffers
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)
    }

    /// Creates a framebuffer with nothing attached.
    pub fn framebuffer_create(&mut self, label: &str) -> FramebufferHandle {
        self.framebuffers.insert(Framebuffer::new(label))
    }

    /// Binds a texture mip level to an attachment point, or detaches it with `None`.
    ///
    /// The framebuffer takes a reference to the texture and drops the one it held
    /// on the previous texture.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If either handle is stale.
    /// * `TextureError::RegionOutOfBounds` - If the texture has no such mip level.
    pub fn framebuffer_attach(
        &mut self,
        handle: FramebufferHandle,
        texture: Option<TextureHandle>,
        mip_level: u32,
        attachment: FramebufferAttachment,
    ) -> Result<(), RenderError> {
        if !self.framebuffers.contains(handle) {
            return Err(ResourceError::InvalidHandle.into());
        }

        if let Some(texture) = texture {
            let t = self
                .textures
                .get(texture)
                .ok_or(ResourceError::InvalidHandle)?;
            if mip_level >= t.params.mipmaps {
                return Err(TextureError::RegionOutOfBounds.into());
            }
            if t.format.is_depth() == attachment.is_color() {
                log::warn!(
                    "RenderContext: attaching '{}' ({:?}) to {attachment:?}",
                    t.label,
                    t.format
                );
            }
            self.textures.retain(texture);
        }

        self.end_pass_on(RenderTarget::Framebuffer(handle));

        let previous = self.framebuffer_mut(handle)?.attach(texture, mip_level, attachment);
        if let Some(previous) = previous {
            if let Some(t) = self.textures.release(previous) {
                t.destroy(&*self.device);
            }
        }

        Ok(())
    }

    /// Returns the texture bound to an attachment point.
    pub fn framebuffer_attachment(
        &self,
        handle: FramebufferHandle,
        attachment: FramebufferAttachment,
    ) -> Option<TextureHandle> {
        self.framebuffers.get(handle)?.attachment(attachment).texture
    }

    /// Returns the mip level bound to an attachment point.
    pub fn framebuffer_attachment_mip_level(
        &self,
        handle: FramebufferHandle,
        attachment: FramebufferAttachment,
    ) -> Option<u32> {
        let data = self.framebuffers.get(handle)?.attachment(attachment);
        data.texture.map(|_| data.mip_level)
    }

    /// Returns which attachment each fragment output writes to.
    pub fn framebuffer_outputs(&self, handle: FramebufferHandle) -> Option<OutputMapping> {
        self.framebuffers.get(handle).map(|fb| *fb.output_mapping())
    }

    /// Remaps the fragment outputs whose bit is set in `write_mask`.
    pub fn framebuffer_set_outputs(
        &mut self,
        handle: FramebufferHandle,
        config: &OutputMapping,
        write_mask: u8,
    ) -> Result<(), RenderError> {
        self.end_pass_on(RenderTarget::Framebuffer(handle));
        self.framebuffer_mut(handle)?.set_outputs(config, write_mask);
        Ok(())
    }

    /// Returns the viewport of a framebuffer, or of the swapchain for `None`.
    ///
    /// An empty viewport covers the whole target.
    pub fn framebuffer_viewport(&self, handle: Option<FramebufferHandle>) -> FloatRect {
        match handle {
            Some(handle) => self
                .framebuffers
                .get(handle)
                .map(Framebuffer::viewport)
                .unwrap_or_default(),
            None => self.default_framebuffer.viewport,
        }
    }

    /// Sets the viewport of a framebuffer, or of the swapchain for `None`.
    pub fn framebuffer_set_viewport(
        &mut self,
        handle: Option<FramebufferHandle>,
        viewport: FloatRect,
    ) -> Result<(), RenderError> {
        match handle {
            Some(handle) => self.framebuffer_mut(handle)?.set_viewport(viewport),
            None => self.default_framebuffer.viewport = viewport,
        }
        Ok(())
    }

    /// Returns the size of a framebuffer, or of the acquired swapchain texture for `None`.
    pub fn framebuffer_size(&self, handle: Option<FramebufferHandle>) -> Option<Extent2D> {
        match handle {
            Some(handle) => self.framebuffers.get(handle)?.size(&self.textures),
            None => self
                .swapchain
                .map(|s| Extent2D::new(s.width, s.height)),
        }
    }

    /// Returns the debug label.
    pub fn framebuffer_label(&self, handle: FramebufferHandle) -> Option<&str> {
        self.framebuffers.get(handle).map(Framebuffer::label)
    }

    /// Sets the debug label.
    pub fn framebuffer_set_label(&mut self, handle: FramebufferHandle, label: &str) {
        if let Some(fb) = self.framebuffers.get_mut(handle) {
            fb.set_label(label);
        }
    }

    /// Destroys a framebuffer and drops its references to the attached textures.
    ///
    /// If it is the current framebuffer, draws go to the swapchain afterwards.
    pub fn framebuffer_destroy(&mut self, handle: FramebufferHandle) {
        self.end_pass_on(RenderTarget::Framebuffer(handle));

        let Some(mut fb) = self.framebuffers.take(handle) else {
            log::warn!("RenderContext: destroying a stale framebuffer handle");
            return;
        };

        if self.state.framebuffer == Some(handle) {
            self.state.framebuffer = None;
        }

        for texture in fb.detach_all() {
            if let Some(t) = self.textures.release(texture) {
                t.destroy(&*self.device);
            }
        }
    }

    /// Schedules a clear of the current framebuffer.
    ///
    /// The clear is executed by the next render pass on the framebuffer, or at the
    /// latest when the frame ends.
    pub fn clear(&mut self, flags: BufferKind, color: Color, depth: f32) {
        match self.state.framebuffer {
            Some(handle) => {
                self.end_pass_on(RenderTarget::Framebuffer(handle));
                if let Some(fb) = self.framebuffers.get_mut(handle) {
                    fb.clear(flags, color, depth);
                }
            }
            None => {
                self.end_pass_on(RenderTarget::Default);
                self.default_framebuffer.clear(flags, color, depth);
            }
        }
    }

    /// Reads a rectangle of a framebuffer attachment back to the CPU.
    ///
    /// Everything recorded so far, pending clears included, is submitted first so the
    /// download sees it. `callback` runs exactly once: with the pixmap (bottom-left
    /// origin) once the download completes, or with `None` if the read cannot be done.
    /// The swapchain cannot be read back.
    pub fn framebuffer_read_async(
        &mut self,
        handle: Option<FramebufferHandle>,
        attachment: FramebufferAttachment,
        rect: IntRect,
        callback: ReadbackCallback,
    ) {
        let Some(handle) = handle else {
            log::error!("{}", TextureError::SwapchainReadback);
            callback(None);
            return;
        };

        let Some(fb) = self.framebuffers.get(handle) else {
            log::error!("RenderContext: read from a stale framebuffer handle");
            callback(None);
            return;
        };

        let data = fb.attachment(attachment);
        let Some(texture) = data.texture.and_then(|t| self.textures.get(t)) else {
            log::error!("{} to {attachment:?} of '{}'", TextureError::NoAttachment, fb.label());
            callback(None);
            return;
        };

        let (width, height) = texture.size(data.mip_level);
        let Some((x, y)) = readback_region(rect, width, height) else {
            log::error!(
                "{}: {rect:?} in a {width}x{height} attachment",
                TextureError::RegionOutOfBounds
            );
            callback(None);
            return;
        };

        let source = TextureRegion {
            texture: texture.gpu_texture,
            mip_level: data.mip_level,
            layer: 0,
            x,
            y,
            w: rect.w,
            h: rect.h,
        };
        let format = texture.format;
        let label = texture.label.clone();

        self.flush_pending_clears();
        if let Err(e) = self.submit_and_release() {
            log::error!("RenderContext: failed to submit work before readback: {e}");
            callback(None);
            return;
        }

        let device = Arc::clone(&self.device);
        self.readback
            .read_async(&*device, &source, format, &label, callback);
    }
}
