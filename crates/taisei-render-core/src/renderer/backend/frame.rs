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

//! The command stream of one frame and the pass it is currently recording.

use super::framebuffer::{RenderPassOutputs, RenderTarget};
use crate::math::Extent2D;
use crate::renderer::gpu::{CommandBufferId, TextureFormat};
use crate::renderer::traits::CommandEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    None,
    Copy,
    Render,
}

/// The formats and size of the open render pass.
#[derive(Debug, Clone, Default)]
struct RenderPassInfo {
    target: Option<RenderTarget>,
    color_formats: Vec<TextureFormat>,
    depth_format: Option<TextureFormat>,
    extent: Extent2D,
}

/// Wraps the frame's command encoder and keeps at most one pass open.
///
/// Copies and draws share one command stream, so an upload recorded before a draw is
/// executed before it. Opening a copy pass closes an open render pass; the next draw
/// reopens a render pass with `Load` ops.
pub struct FrameCommands {
    encoder: Box<dyn CommandEncoder>,
    pass: Pass,
    render_pass: RenderPassInfo,
}

impl std::fmt::Debug for FrameCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCommands")
            .field("pass", &self.pass)
            .field("target", &self.render_pass.target)
            .finish_non_exhaustive()
    }
}

impl FrameCommands {
    /// Wraps an encoder with no pass open.
    pub fn new(encoder: Box<dyn CommandEncoder>) -> Self {
        Self {
            encoder,
            pass: Pass::None,
            render_pass: RenderPassInfo::default(),
        }
    }

    /// Returns the encoder inside a copy pass, opening one if needed.
    pub fn copy_pass(&mut self) -> &mut dyn CommandEncoder {
        if self.pass != Pass::Copy {
            self.end_pass();
            self.encoder.begin_copy_pass();
            self.pass = Pass::Copy;
        }
        &mut *self.encoder
    }

    /// Returns the encoder outside of any pass.
    pub fn outside_pass(&mut self) -> &mut dyn CommandEncoder {
        self.end_pass();
        &mut *self.encoder
    }

    /// Closes any open pass and opens a render pass on `target`.
    pub fn begin_render_pass(
        &mut self,
        target: RenderTarget,
        outputs: &RenderPassOutputs,
        label: Option<&str>,
    ) -> &mut dyn CommandEncoder {
        self.end_pass();
        self.encoder.begin_render_pass(&outputs.descriptor(label));
        self.pass = Pass::Render;
        self.render_pass = RenderPassInfo {
            target: Some(target),
            color_formats: outputs.color_formats.clone(),
            depth_format: outputs.depth_format,
            extent: outputs.extent,
        };
        &mut *self.encoder
    }

    /// Returns the encoder if a render pass on `target` is open.
    pub fn render_pass(&mut self, target: RenderTarget) -> Option<&mut dyn CommandEncoder> {
        if self.render_target() == Some(target) {
            Some(&mut *self.encoder)
        } else {
            None
        }
    }

    /// Returns the target of the open render pass.
    pub fn render_target(&self) -> Option<RenderTarget> {
        match self.pass {
            Pass::Render => self.render_pass.target,
            _ => None,
        }
    }

    /// Returns the color formats of the open render pass.
    pub fn color_formats(&self) -> &[TextureFormat] {
        &self.render_pass.color_formats
    }

    /// Returns the depth format of the open render pass.
    pub fn depth_format(&self) -> Option<TextureFormat> {
        self.render_pass.depth_format
    }

    /// Returns the size of the attachments of the open render pass.
    pub fn extent(&self) -> Extent2D {
        self.render_pass.extent
    }

    /// Closes the open pass, if any.
    pub fn end_pass(&mut self) {
        match self.pass {
            Pass::None => {}
            Pass::Copy => self.encoder.end_copy_pass(),
            Pass::Render => {
                self.encoder.end_render_pass();
                self.render_pass = RenderPassInfo::default();
            }
        }
        self.pass = Pass::None;
    }

    /// Closes the open pass and finalizes the command buffer.
    pub fn finish(mut self) -> CommandBufferId {
        self.end_pass();
        self.encoder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::mock::{MockDevice, Recorded};
    use crate::renderer::gpu::TextureId;
    use crate::renderer::GpuDevice;

    #[test]
    fn test_passes_never_nest() {
        let device = MockDevice::new();
        let mut commands = FrameCommands::new(device.create_command_encoder(None));

        commands.copy_pass();
        commands.copy_pass();
        commands.begin_render_pass(RenderTarget::Default, &RenderPassOutputs::default(), None);
        assert_eq!(commands.render_target(), Some(RenderTarget::Default));
        commands.copy_pass();
        assert_eq!(commands.render_target(), None);
        commands.outside_pass().generate_mipmaps(TextureId(3));

        let id = commands.finish();
        device.submit_command_buffer(id).unwrap();

        assert_eq!(
            device.state().all_commands(),
            vec![
                Recorded::BeginCopyPass,
                Recorded::EndCopyPass,
                Recorded::BeginRenderPass {
                    colors: vec![],
                    depth: None
                },
                Recorded::EndRenderPass,
                Recorded::BeginCopyPass,
                Recorded::EndCopyPass,
                Recorded::GenerateMipmaps(TextureId(3)),
            ]
        );
    }

    #[test]
    fn test_finish_closes_render_pass() {
        let device = MockDevice::new();
        let mut commands = FrameCommands::new(device.create_command_encoder(None));
        commands.begin_render_pass(RenderTarget::Default, &RenderPassOutputs::default(), None);
        assert!(commands.render_pass(RenderTarget::Default).is_some());

        let id = commands.finish();
        device.submit_command_buffer(id).unwrap();
        assert_eq!(
            device.state().all_commands().last(),
            Some(&Recorded::EndRenderPass)
        );
    }
}
