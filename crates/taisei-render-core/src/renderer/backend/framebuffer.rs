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

//! Framebuffers and the attachments of the render passes drawing into them.

use super::arena::Arena;
use super::texture::Texture;
use super::{FramebufferHandle, TextureHandle};
use crate::math::{Color, Extent2D, FloatRect};
use crate::renderer::api::{
    BufferKind, FramebufferAttachment, OutputMapping, FRAMEBUFFER_MAX_ATTACHMENTS,
    FRAMEBUFFER_MAX_OUTPUTS, IDENTITY_OUTPUT_MAPPING,
};
use crate::renderer::gpu::{
    ColorAttachmentInfo, DepthStencilAttachmentInfo, LoadOp, RenderPassDescriptor, StoreOp,
    SwapchainTexture, TextureFormat,
};
use std::borrow::Cow;

/// What the next render pass does with an attachment's previous contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentLoadState {
    /// The load operation.
    pub op: LoadOp,
    /// The color written by a clear of a color attachment.
    pub clear_color: Color,
    /// The depth written by a clear of a depth attachment.
    pub clear_depth: f32,
}

impl Default for AttachmentLoadState {
    fn default() -> Self {
        Self {
            op: LoadOp::Load,
            clear_color: Color::TRANSPARENT,
            clear_depth: 1.0,
        }
    }
}

impl AttachmentLoadState {
    fn clear_to_color(&mut self, color: Color) {
        self.op = LoadOp::Clear;
        self.clear_color = color;
    }

    fn clear_to_depth(&mut self, depth: f32) {
        self.op = LoadOp::Clear;
        self.clear_depth = depth;
    }

    fn is_clear(&self) -> bool {
        self.op == LoadOp::Clear
    }

    /// Returns the current state and resets the load op to `Load`.
    fn consume(&mut self) -> Self {
        let state = *self;
        self.op = LoadOp::Load;
        state
    }
}

/// A texture mip level bound to an attachment point.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramebufferAttachmentData {
    /// The attached texture.
    pub texture: Option<TextureHandle>,
    /// The attached mip level.
    pub mip_level: u32,
    /// The pending load state.
    pub load: AttachmentLoadState,
}

/// Where a render pass draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The swapchain.
    Default,
    /// A user framebuffer.
    Framebuffer(FramebufferHandle),
    /// A texture cleared outside of any framebuffer.
    Texture(TextureHandle),
}

/// The attachments of a render pass together with the formats pipelines must match.
#[derive(Debug, Clone, Default)]
pub struct RenderPassOutputs {
    /// Color attachments, one per contiguous output.
    pub color_attachments: Vec<ColorAttachmentInfo>,
    /// The formats of `color_attachments`.
    pub color_formats: Vec<TextureFormat>,
    /// The depth attachment.
    pub depth_stencil_attachment: Option<DepthStencilAttachmentInfo>,
    /// The format of the depth attachment.
    pub depth_format: Option<TextureFormat>,
    /// The size of the attachments.
    pub extent: Extent2D,
}

impl RenderPassOutputs {
    /// Builds the device render pass descriptor.
    pub fn descriptor<'a>(&self, label: Option<&'a str>) -> RenderPassDescriptor<'a> {
        RenderPassDescriptor {
            label: label.map(Cow::Borrowed),
            color_attachments: self.color_attachments.clone(),
            depth_stencil_attachment: self.depth_stencil_attachment,
        }
    }
}

/// A set of attachments plus the mapping from fragment outputs to color attachments.
#[derive(Debug)]
pub struct Framebuffer {
    attachments: [FramebufferAttachmentData; FRAMEBUFFER_MAX_ATTACHMENTS],
    output_mapping: OutputMapping,
    viewport: FloatRect,
    label: String,
}

impl Framebuffer {
    /// Creates a framebuffer with nothing attached and the identity output mapping.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            attachments: [FramebufferAttachmentData::default(); FRAMEBUFFER_MAX_ATTACHMENTS],
            output_mapping: IDENTITY_OUTPUT_MAPPING,
            viewport: FloatRect::default(),
            label: label.into(),
        }
    }

    /// Returns what is bound to an attachment point.
    pub fn attachment(&self, attachment: FramebufferAttachment) -> &FramebufferAttachmentData {
        &self.attachments[attachment.index()]
    }

    /// Binds a texture mip level to an attachment point and resets its load op.
    ///
    /// Returns the previously attached texture so its reference can be dropped.
    pub fn attach(
        &mut self,
        texture: Option<TextureHandle>,
        mip_level: u32,
        attachment: FramebufferAttachment,
    ) -> Option<TextureHandle> {
        let slot = &mut self.attachments[attachment.index()];
        let previous = slot.texture;
        *slot = FramebufferAttachmentData {
            texture,
            mip_level,
            load: AttachmentLoadState::default(),
        };
        previous
    }

    /// Detaches every texture, returning them.
    pub fn detach_all(&mut self) -> Vec<TextureHandle> {
        self.attachments
            .iter_mut()
            .filter_map(|a| a.texture.take())
            .collect()
    }

    /// Returns the fragment output mapping.
    pub fn output_mapping(&self) -> &OutputMapping {
        &self.output_mapping
    }

    /// Remaps the fragment outputs whose bit is set in `write_mask`.
    pub fn set_outputs(&mut self, config: &OutputMapping, write_mask: u8) {
        for (i, target) in config.iter().enumerate() {
            if write_mask & (1 << i) == 0 {
                continue;
            }

            debug_assert!(target.is_none_or(|t| t.is_color()));
            self.output_mapping[i] = target.filter(|t| t.is_color());
        }
    }

    /// Schedules a clear of the depth attachment and/or every mapped color attachment.
    ///
    /// The clear happens when the next render pass on this framebuffer begins.
    pub fn clear(&mut self, flags: BufferKind, color: Color, depth: f32) {
        if flags.contains(BufferKind::DEPTH) {
            let a = &mut self.attachments[FramebufferAttachment::Depth.index()];
            if a.texture.is_some() {
                a.load.clear_to_depth(depth);
            }
        }

        if flags.contains(BufferKind::COLOR) {
            for target in self.output_mapping.iter().flatten() {
                self.attachments[target.index()]
                    .load
                    .clear_to_color(color);
            }
        }
    }

    /// Returns `true` if a clear is waiting for the next render pass.
    pub fn has_pending_clear(&self) -> bool {
        self.attachments
            .iter()
            .any(|a| a.texture.is_some() && a.load.is_clear())
    }

    /// Returns the viewport.
    pub fn viewport(&self) -> FloatRect {
        self.viewport
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, viewport: FloatRect) {
        self.viewport = viewport;
    }

    /// Returns the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sets the debug label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Returns the attached textures.
    pub fn attached_textures(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.attachments.iter().filter_map(|a| a.texture)
    }

    /// Returns the size of the first attached color target, or of the depth target.
    pub fn size(&self, textures: &Arena<Texture>) -> Option<Extent2D> {
        let color = self.output_mapping.iter().flatten().copied();
        color
            .chain(std::iter::once(FramebufferAttachment::Depth))
            .find_map(|a| {
                let data = self.attachment(a);
                let texture = textures.get(data.texture?)?;
                let (w, h) = texture.size(data.mip_level);
                Some(Extent2D::new(w, h))
            })
    }

    /// Builds the attachments of a render pass and resets every load op to `Load`.
    ///
    /// Color outputs are packed in output order and stop at the first output with no
    /// texture behind it.
    pub fn setup_outputs(&mut self, textures: &Arena<Texture>) -> RenderPassOutputs {
        let mut outputs = RenderPassOutputs::default();

        for i in 0..FRAMEBUFFER_MAX_OUTPUTS {
            let Some(target) = self.output_mapping[i] else {
                break;
            };
            let data = &self.attachments[target.index()];
            let Some(texture) = data.texture.and_then(|h| textures.get(h)) else {
                break;
            };

            let load = data.load;
            outputs.color_attachments.push(ColorAttachmentInfo {
                texture: texture.gpu_texture,
                mip_level: data.mip_level,
                layer: 0,
                load_op: load.op,
                store_op: StoreOp::Store,
                clear_color: load.clear_color,
            });
            outputs.color_formats.push(texture.format);

            if outputs.extent == Extent2D::default() {
                let (w, h) = texture.size(data.mip_level);
                outputs.extent = Extent2D::new(w, h);
            }
        }

        let mapped = outputs.color_attachments.len();
        let orphaned = self.output_mapping[mapped..]
            .iter()
            .flatten()
            .any(|t| self.attachments[t.index()].texture.is_some());
        if orphaned {
            log::warn!(
                "Framebuffer: '{}' has outputs past a gap at output {mapped}; ignoring them",
                self.label
            );
        }

        let depth = &self.attachments[FramebufferAttachment::Depth.index()];
        if let Some(texture) = depth.texture.and_then(|h| textures.get(h)) {
            outputs.depth_stencil_attachment = Some(DepthStencilAttachmentInfo {
                texture: texture.gpu_texture,
                load_op: depth.load.op,
                store_op: StoreOp::Store,
                clear_depth: depth.load.clear_depth,
            });
            outputs.depth_format = Some(texture.format);

            if outputs.extent == Extent2D::default() {
                let (w, h) = texture.size(depth.mip_level);
                outputs.extent = Extent2D::new(w, h);
            }
        }

        for a in &mut self.attachments {
            a.load.consume();
        }

        outputs
    }

    /// Marks every attached texture as modified so auto mipmaps are rebuilt before
    /// the texture is next sampled.
    pub fn taint(&self, textures: &mut Arena<Texture>) {
        for data in &self.attachments {
            if let Some(texture) = data.texture.and_then(|h| textures.get_mut(h)) {
                texture.taint();
            }
        }
    }
}

/// The clear and viewport state of the swapchain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFramebufferState {
    /// The color load state.
    pub color: AttachmentLoadState,
    /// The depth load state. The swapchain has no depth buffer; the state is kept for
    /// symmetry with user framebuffers.
    pub depth: AttachmentLoadState,
    /// The viewport.
    pub viewport: FloatRect,
}

impl DefaultFramebufferState {
    /// Schedules a clear of the swapchain.
    pub fn clear(&mut self, flags: BufferKind, color: Color, depth: f32) {
        if flags.contains(BufferKind::DEPTH) {
            self.depth.clear_to_depth(depth);
        }

        if flags.contains(BufferKind::COLOR) {
            self.color.clear_to_color(color);
        }
    }

    /// Returns `true` if a color clear is waiting for the next render pass.
    pub fn has_pending_clear(&self) -> bool {
        self.color.is_clear()
    }

    /// Builds the attachments of a swapchain render pass and resets the load ops.
    ///
    /// With no swapchain texture (a minimized window) the pass has no attachments.
    pub fn setup_outputs(&mut self, swapchain: Option<&SwapchainTexture>) -> RenderPassOutputs {
        let color = self.color.consume();
        self.depth.consume();

        let Some(swapchain) = swapchain else {
            return RenderPassOutputs::default();
        };

        RenderPassOutputs {
            color_attachments: vec![ColorAttachmentInfo {
                texture: swapchain.texture,
                mip_level: 0,
                layer: 0,
                load_op: color.op,
                store_op: StoreOp::Store,
                clear_color: color.clear_color,
            }],
            color_formats: vec![swapchain.format],
            depth_stencil_attachment: None,
            depth_format: None,
            extent: Extent2D::new(swapchain.width, swapchain.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::gpu::TextureId;

    #[test]
    fn test_clear_marks_mapped_outputs_only_and_is_consumed() {
        let mut fb = Framebuffer::new("test");
        fb.clear(BufferKind::COLOR | BufferKind::DEPTH, Color::WHITE, 0.5);

        // No depth texture: the depth clear is dropped.
        assert_eq!(
            fb.attachment(FramebufferAttachment::Depth).load.op,
            LoadOp::Load
        );
        assert_eq!(
            fb.attachment(FramebufferAttachment::Color2).load.op,
            LoadOp::Clear
        );
        assert!(!fb.has_pending_clear());

        let textures = Arena::new();
        let outputs = fb.setup_outputs(&textures);
        assert!(outputs.color_attachments.is_empty());
        assert_eq!(
            fb.attachment(FramebufferAttachment::Color0).load.op,
            LoadOp::Load
        );
    }

    #[test]
    fn test_set_outputs_respects_write_mask() {
        let mut fb = Framebuffer::new("test");
        let config = [None, Some(FramebufferAttachment::Color3), None, None];
        fb.set_outputs(&config, 0b0010);
        assert_eq!(fb.output_mapping()[0], Some(FramebufferAttachment::Color0));
        assert_eq!(fb.output_mapping()[1], Some(FramebufferAttachment::Color3));
        assert_eq!(fb.output_mapping()[2], Some(FramebufferAttachment::Color2));
    }

    #[test]
    fn test_default_outputs_reset_load_ops() {
        let mut state = DefaultFramebufferState::default();
        state.clear(BufferKind::COLOR, Color::BLACK, 1.0);
        assert!(state.has_pending_clear());

        let swapchain = SwapchainTexture {
            texture: TextureId(7),
            format: TextureFormat::Bgra8Unorm,
            width: 320,
            height: 240,
        };
        let outputs = state.setup_outputs(Some(&swapchain));
        assert_eq!(outputs.color_attachments[0].load_op, LoadOp::Clear);
        assert_eq!(outputs.color_attachments[0].store_op, StoreOp::Store);
        assert_eq!(outputs.color_formats, vec![TextureFormat::Bgra8Unorm]);
        assert!(!state.has_pending_clear());

        let outputs = state.setup_outputs(None);
        assert!(outputs.color_attachments.is_empty());
    }
}
