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

use std::ops::Range;
use std::sync::atomic::Ordering;

use taisei_render_core::renderer::gpu::{
    BufferBinding, BufferRegion, CommandBufferId, IndexFormat, LoadOp, PipelineId,
    RenderPassDescriptor, ShaderStage, TextureId, TextureRegion, TextureSamplerBinding,
    TextureTransferInfo, TransferBufferLocation, Viewport,
};
use taisei_render_core::renderer::traits::CommandEncoder;

use super::device::{HeadlessDevice, HeadlessTexture};
use super::texels;

/// Where the rows of a texture region sit inside a tightly packed mip level image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RegionLayout {
    first: usize,
    pitch: usize,
    row_len: usize,
    rows: usize,
}

fn region_layout(texture: &HeadlessTexture, region: &TextureRegion) -> Option<RegionLayout> {
    let (width, height) = texture.level_size(region.mip_level);
    if region.x.checked_add(region.w)? > width || region.y.checked_add(region.h)? > height {
        return None;
    }

    let format = texture.format;
    let dim = format.block_dim();
    let pitch = format.bytes_per_row(width) as usize;
    Some(RegionLayout {
        first: (region.y / dim) as usize * pitch + ((region.x / dim) * format.block_bytes()) as usize,
        pitch,
        row_len: format.bytes_per_row(region.w) as usize,
        rows: region.h.div_ceil(dim) as usize,
    })
}

/// Executes commands on the host as they are recorded.
pub struct HeadlessCommandEncoder {
    device: HeadlessDevice,
    in_copy_pass: bool,
    in_render_pass: bool,
    pipeline: Option<PipelineId>,
}

impl HeadlessCommandEncoder {
    pub(crate) fn new(device: HeadlessDevice) -> Self {
        Self {
            device,
            in_copy_pass: false,
            in_render_pass: false,
            pipeline: None,
        }
    }

    fn expect_copy_pass(&self, what: &str) {
        if !self.in_copy_pass {
            log::warn!("HeadlessCommandEncoder: {what} outside of a copy pass");
        }
    }

    fn clear_texture(&self, texture: TextureId, level: u32, layer: u32, clear: impl FnOnce(&HeadlessTexture) -> Option<Vec<u8>>) {
        let Ok(mut textures) = self.device.internal.textures.lock() else {
            log::error!("HeadlessCommandEncoder: Mutex poisoned (textures)");
            return;
        };
        let Some(target) = textures.get_mut(&texture) else {
            log::warn!("HeadlessCommandEncoder: Attachment {texture:?} not found.");
            return;
        };
        let Some(texel) = clear(target) else {
            log::trace!(
                "HeadlessCommandEncoder: Can't clear {:?} attachments on the CPU",
                target.format
            );
            return;
        };
        if let Some(image) = target.image_mut(level, layer) {
            for chunk in image.chunks_exact_mut(texel.len()) {
                chunk.copy_from_slice(&texel);
            }
        }
    }

    fn draw(&mut self) {
        if !self.in_render_pass {
            log::warn!("HeadlessCommandEncoder: Draw outside of a render pass");
            return;
        }
        match self.pipeline {
            Some(pipeline) if self.device.has_pipeline(pipeline) => {
                self.device.internal.draws.fetch_add(1, Ordering::Relaxed);
            }
            _ => log::warn!("HeadlessCommandEncoder: Draw without a valid pipeline"),
        }
    }
}

impl CommandEncoder for HeadlessCommandEncoder {
    fn begin_copy_pass(&mut self) {
        if self.in_render_pass {
            log::warn!("HeadlessCommandEncoder: Copy pass opened inside a render pass");
        }
        self.in_copy_pass = true;
    }

    fn end_copy_pass(&mut self) {
        self.in_copy_pass = false;
    }

    fn upload_to_buffer(&mut self, source: &TransferBufferLocation, destination: &BufferRegion) {
        self.expect_copy_pass("Buffer upload");
        let (Ok(transfer_buffers), Ok(mut buffers)) = (
            self.device.internal.transfer_buffers.lock(),
            self.device.internal.buffers.lock(),
        ) else {
            log::error!("HeadlessCommandEncoder: Mutex poisoned (buffers)");
            return;
        };

        let (src, dst, size) = (
            source.offset as usize,
            destination.offset as usize,
            destination.size as usize,
        );
        let bytes = transfer_buffers
            .get(&source.transfer_buffer)
            .and_then(|t| t.data.get(src..src + size));
        let target = buffers
            .get_mut(&destination.buffer)
            .and_then(|b| b.get_mut(dst..dst + size));
        match (bytes, target) {
            (Some(bytes), Some(target)) => target.copy_from_slice(bytes),
            _ => log::warn!(
                "HeadlessCommandEncoder: Invalid buffer upload {source:?} -> {destination:?}"
            ),
        }
    }

    fn upload_to_texture(&mut self, source: &TextureTransferInfo, destination: &TextureRegion) {
        self.expect_copy_pass("Texture upload");
        let (Ok(transfer_buffers), Ok(mut textures)) = (
            self.device.internal.transfer_buffers.lock(),
            self.device.internal.textures.lock(),
        ) else {
            log::error!("HeadlessCommandEncoder: Mutex poisoned (textures)");
            return;
        };

        let Some(texture) = textures.get_mut(&destination.texture) else {
            log::warn!("HeadlessCommandEncoder: TextureId {:?} not found.", destination.texture);
            return;
        };
        let Some(layout) = region_layout(texture, destination) else {
            log::warn!("HeadlessCommandEncoder: Upload region {destination:?} out of bounds");
            return;
        };
        let pixels_per_row = if source.pixels_per_row == 0 {
            destination.w
        } else {
            source.pixels_per_row
        };
        let source_pitch = texture.format.bytes_per_row(pixels_per_row) as usize;

        let Some(transfer) = transfer_buffers.get(&source.transfer_buffer) else {
            log::warn!(
                "HeadlessCommandEncoder: TransferBufferId {:?} not found.",
                source.transfer_buffer
            );
            return;
        };
        let Some(image) = texture.image_mut(destination.mip_level, destination.layer) else {
            log::warn!("HeadlessCommandEncoder: Upload region {destination:?} out of bounds");
            return;
        };

        for row in 0..layout.rows {
            let src = source.offset as usize + row * source_pitch;
            let dst = layout.first + row * layout.pitch;
            match (
                transfer.data.get(src..src + layout.row_len),
                image.get_mut(dst..dst + layout.row_len),
            ) {
                (Some(bytes), Some(target)) => target.copy_from_slice(bytes),
                _ => {
                    log::warn!("HeadlessCommandEncoder: Texture upload exceeds its transfer buffer");
                    return;
                }
            }
        }
    }

    fn download_from_texture(&mut self, source: &TextureRegion, destination: &TextureTransferInfo) {
        self.expect_copy_pass("Texture download");
        let (Ok(mut transfer_buffers), Ok(textures)) = (
            self.device.internal.transfer_buffers.lock(),
            self.device.internal.textures.lock(),
        ) else {
            log::error!("HeadlessCommandEncoder: Mutex poisoned (textures)");
            return;
        };

        let Some(texture) = textures.get(&source.texture) else {
            log::warn!("HeadlessCommandEncoder: TextureId {:?} not found.", source.texture);
            return;
        };
        let (Some(layout), Some(image)) = (
            region_layout(texture, source),
            texture.image(source.mip_level, source.layer),
        ) else {
            log::warn!("HeadlessCommandEncoder: Download region {source:?} out of bounds");
            return;
        };
        let pixels_per_row = if destination.pixels_per_row == 0 {
            source.w
        } else {
            destination.pixels_per_row
        };
        let destination_pitch = texture.format.bytes_per_row(pixels_per_row) as usize;

        let Some(transfer) = transfer_buffers.get_mut(&destination.transfer_buffer) else {
            log::warn!(
                "HeadlessCommandEncoder: TransferBufferId {:?} not found.",
                destination.transfer_buffer
            );
            return;
        };

        for row in 0..layout.rows {
            let src = layout.first + row * layout.pitch;
            let dst = destination.offset as usize + row * destination_pitch;
            match (
                image.get(src..src + layout.row_len),
                transfer.data.get_mut(dst..dst + layout.row_len),
            ) {
                (Some(bytes), Some(target)) => target.copy_from_slice(bytes),
                _ => {
                    log::warn!("HeadlessCommandEncoder: Texture download exceeds its transfer buffer");
                    return;
                }
            }
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        if self.in_copy_pass || self.in_render_pass {
            log::warn!("HeadlessCommandEncoder: Mipmaps generated inside a pass");
        }
        let Ok(mut textures) = self.device.internal.textures.lock() else {
            log::error!("HeadlessCommandEncoder: Mutex poisoned (textures)");
            return;
        };
        let Some(target) = textures.get_mut(&texture) else {
            log::warn!("HeadlessCommandEncoder: TextureId {texture:?} not found.");
            return;
        };

        for layer in 0..target.layers {
            for level in 1..target.mip_levels {
                let (width, height) = target.level_size(level - 1);
                let Some(next) = target
                    .image(level - 1, layer)
                    .and_then(|src| texels::downsample(target.format, src, width, height))
                else {
                    log::warn!(
                        "HeadlessCommandEncoder: Can't generate mipmaps for {:?} textures",
                        target.format
                    );
                    return;
                };
                if let Some(image) = target.image_mut(level, layer) {
                    if image.len() == next.len() {
                        *image = next;
                    }
                }
            }
        }
    }

    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor) {
        if self.in_copy_pass || self.in_render_pass {
            log::warn!("HeadlessCommandEncoder: Render pass opened inside another pass");
        }
        self.in_render_pass = true;
        self.pipeline = None;
        self.device
            .internal
            .render_passes
            .fetch_add(1, Ordering::Relaxed);

        for attachment in &descriptor.color_attachments {
            if attachment.load_op == LoadOp::Clear {
                self.clear_texture(attachment.texture, attachment.mip_level, attachment.layer, |t| {
                    texels::encode_color(t.format, attachment.clear_color)
                });
            }
        }
        if let Some(attachment) = &descriptor.depth_stencil_attachment {
            if attachment.load_op == LoadOp::Clear {
                self.clear_texture(attachment.texture, 0, 0, |t| {
                    texels::encode_depth(t.format, attachment.clear_depth)
                });
            }
        }
    }

    fn end_render_pass(&mut self) {
        self.in_render_pass = false;
    }

    fn bind_graphics_pipeline(&mut self, pipeline: PipelineId) {
        self.pipeline = Some(pipeline);
    }

    fn set_viewport(&mut self, _viewport: &Viewport) {}

    fn set_scissor(&mut self, _x: u32, _y: u32, _w: u32, _h: u32) {}

    fn bind_vertex_buffers(&mut self, _first_slot: u32, _bindings: &[BufferBinding]) {}

    fn bind_index_buffer(&mut self, _binding: &BufferBinding, _format: IndexFormat) {}

    fn bind_samplers(&mut self, _stage: ShaderStage, _first_slot: u32, _bindings: &[TextureSamplerBinding]) {}

    fn push_uniform_data(&mut self, _stage: ShaderStage, _slot: u32, _data: &[u8]) {}

    fn draw_primitives(&mut self, _vertices: Range<u32>, _instances: Range<u32>) {
        self.draw();
    }

    fn draw_indexed_primitives(&mut self, _indices: Range<u32>, _base_vertex: i32, _instances: Range<u32>) {
        self.draw();
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        if self.in_copy_pass || self.in_render_pass {
            log::warn!("HeadlessCommandEncoder: Finished with a pass still open");
        }
        self.device.register_command_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use taisei_render_core::math::Color;
    use taisei_render_core::renderer::gpu::{
        BufferDescriptor, BufferUsage, ColorAttachmentInfo, StoreOp, TextureDescriptor,
        TextureFormat, TextureKind, TextureUsage, TransferBufferDescriptor, TransferBufferId,
        TransferBufferUsage,
    };
    use taisei_render_core::renderer::GpuDevice;

    fn texture(device: &HeadlessDevice, width: u32, height: u32, mip_levels: u32) -> TextureId {
        device
            .create_texture(&TextureDescriptor {
                label: Some(Cow::Borrowed("test")),
                kind: TextureKind::D2,
                format: TextureFormat::Rgba8Unorm,
                width,
                height,
                layers: 1,
                mip_levels,
                usage: TextureUsage::SAMPLER | TextureUsage::COLOR_TARGET,
            })
            .unwrap()
    }

    fn transfer(device: &HeadlessDevice, size: u64, usage: TransferBufferUsage) -> TransferBufferId {
        device
            .create_transfer_buffer(&TransferBufferDescriptor {
                label: None,
                size,
                usage,
            })
            .unwrap()
    }

    #[test]
    fn test_buffer_upload_copies_range() {
        let device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 6,
                usage: BufferUsage::VERTEX,
            })
            .unwrap();
        let staging = transfer(&device, 6, TransferBufferUsage::Upload);
        device.write_transfer_buffer(staging, 0, &[1, 2, 3, 4, 5, 6]).unwrap();

        let mut encoder = device.create_command_encoder(None);
        encoder.begin_copy_pass();
        encoder.upload_to_buffer(
            &TransferBufferLocation {
                transfer_buffer: staging,
                offset: 1,
            },
            &BufferRegion {
                buffer,
                offset: 1,
                size: 3,
            },
        );
        encoder.end_copy_pass();
        encoder.finish();

        assert_eq!(device.buffer_contents(buffer), Some(vec![0, 2, 3, 4, 0, 0]));
    }

    #[test]
    fn test_subregion_upload_and_download() {
        let device = HeadlessDevice::new();
        let id = texture(&device, 4, 4, 1);
        let upload = transfer(&device, 16, TransferBufferUsage::Upload);
        let texels: Vec<u8> = (0..16).collect();
        device.write_transfer_buffer(upload, 0, &texels).unwrap();

        let region = TextureRegion {
            texture: id,
            mip_level: 0,
            layer: 0,
            x: 1,
            y: 2,
            w: 2,
            h: 2,
        };
        let download = transfer(&device, 16, TransferBufferUsage::Download);

        let mut encoder = device.create_command_encoder(None);
        encoder.begin_copy_pass();
        encoder.upload_to_texture(
            &TextureTransferInfo {
                transfer_buffer: upload,
                offset: 0,
                pixels_per_row: 2,
                rows_per_layer: 2,
            },
            &region,
        );
        encoder.download_from_texture(
            &region,
            &TextureTransferInfo {
                transfer_buffer: download,
                offset: 0,
                pixels_per_row: 2,
                rows_per_layer: 2,
            },
        );
        encoder.end_copy_pass();
        encoder.finish();

        let mut seen = Vec::new();
        device
            .read_transfer_buffer(download, 16, &mut |bytes| seen.extend_from_slice(bytes))
            .unwrap();
        assert_eq!(seen, texels);

        let image = device.texture_image(id, 0, 0).unwrap();
        // Row 2, texel 1 holds the first uploaded texel.
        assert_eq!(&image[2 * 16 + 4..2 * 16 + 8], &[0, 1, 2, 3]);
        assert_eq!(&image[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_clear_load_op_fills_attachment() {
        let device = HeadlessDevice::new();
        let id = texture(&device, 2, 2, 1);

        let mut encoder = device.create_command_encoder(None);
        encoder.begin_render_pass(&RenderPassDescriptor {
            label: None,
            color_attachments: vec![ColorAttachmentInfo {
                texture: id,
                mip_level: 0,
                layer: 0,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear_color: Color::new(1.0, 0.0, 0.0, 1.0),
            }],
            depth_stencil_attachment: None,
        });
        encoder.draw_primitives(0..3, 0..1);
        encoder.end_render_pass();
        encoder.finish();

        assert_eq!(device.texture_image(id, 0, 0), Some([255, 0, 0, 255].repeat(4)));
        // No pipeline was bound.
        assert_eq!(device.stats().draws, 0);
        assert_eq!(device.stats().render_passes, 1);
    }

    #[test]
    fn test_generate_mipmaps_averages_levels() {
        let device = HeadlessDevice::new();
        let id = texture(&device, 2, 2, 2);
        let upload = transfer(&device, 16, TransferBufferUsage::Upload);
        device
            .write_transfer_buffer(upload, 0, &[0, 0, 0, 255, 255, 255, 255, 255, 0, 0, 0, 255, 255, 255, 255, 255])
            .unwrap();

        let mut encoder = device.create_command_encoder(None);
        encoder.begin_copy_pass();
        encoder.upload_to_texture(
            &TextureTransferInfo {
                transfer_buffer: upload,
                offset: 0,
                pixels_per_row: 2,
                rows_per_layer: 2,
            },
            &TextureRegion {
                texture: id,
                mip_level: 0,
                layer: 0,
                x: 0,
                y: 0,
                w: 2,
                h: 2,
            },
        );
        encoder.end_copy_pass();
        encoder.generate_mipmaps(id);
        encoder.finish();

        assert_eq!(device.texture_image(id, 1, 0), Some(vec![128, 128, 128, 255]));
    }

    #[test]
    fn test_region_layout_rejects_out_of_bounds() {
        let device = HeadlessDevice::new();
        let id = texture(&device, 4, 4, 1);
        let region = TextureRegion {
            texture: id,
            mip_level: 0,
            layer: 0,
            x: 3,
            y: 0,
            w: 2,
            h: 1,
        };
        let textures = device.internal.textures.lock().unwrap();
        assert_eq!(region_layout(&textures[&id], &region), None);
    }
}
