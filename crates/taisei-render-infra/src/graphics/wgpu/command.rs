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
use std::sync::Arc;

use taisei_render_core::renderer::gpu::{
    BufferBinding, BufferRegion, CommandBufferId, IndexFormat, LoadOp, PipelineId,
    RenderPassDescriptor, ShaderStage, TextureId, TextureRegion, TextureSamplerBinding,
    TextureTransferInfo, TransferBufferLocation, Viewport,
};
use taisei_render_core::renderer::traits::CommandEncoder;
use wgpu::util::DeviceExt;

use super::conversions::IntoWgpu;
use super::device::{stage_index, PendingDownload, WgpuDevice, WgpuRenderPipelineEntry};
use super::mipmaps::MipmapGenerator;

/// Size of the zeroed uniform buffer bound when nothing was pushed for a stage.
const EMPTY_UNIFORM_SIZE: usize = 256;

#[derive(Debug, Clone)]
struct SamplerBinding {
    view: Arc<wgpu::TextureView>,
    sampler: Arc<wgpu::Sampler>,
}

/// Resources the draws of the current pass read, rebound lazily before each draw.
#[derive(Debug, Default)]
struct DrawBindings {
    pipeline: Option<Arc<WgpuRenderPipelineEntry>>,
    samplers: [Vec<Option<SamplerBinding>>; 2],
    uniforms: [Option<Vec<u8>>; 2],
    /// Indexed by descriptor set.
    dirty: [bool; 4],
}

impl DrawBindings {
    fn invalidate(&mut self) {
        self.dirty = [true; 4];
    }
}

/// Records commands straight into a `wgpu::CommandEncoder`.
///
/// The open render pass is kept with its lifetime detached from the encoder so the
/// core can drive it through separate `begin`/`draw`/`end` calls.
pub struct WgpuCommandEncoder {
    pub(crate) encoder: Option<wgpu::CommandEncoder>,
    pub(crate) device: WgpuDevice,
    pass: Option<wgpu::RenderPass<'static>>,
    /// Width and height of the attachments of the open pass.
    target_size: (u32, u32),
    viewport_empty: bool,
    bindings: DrawBindings,
}

impl WgpuCommandEncoder {
    pub(crate) fn new(encoder: wgpu::CommandEncoder, device: WgpuDevice) -> Self {
        Self {
            encoder: Some(encoder),
            device,
            pass: None,
            target_size: (0, 0),
            viewport_empty: false,
            bindings: DrawBindings::default(),
        }
    }

    /// Provides mutable access to the underlying `wgpu::CommandEncoder`, closing any open
    /// render pass first.
    /// Returns `None` if the encoder has already been consumed by `finish()`.
    pub fn wgpu_encoder_mut(&mut self) -> Option<&mut wgpu::CommandEncoder> {
        self.close_pass();
        self.encoder.as_mut()
    }

    fn close_pass(&mut self) {
        if self.pass.take().is_some() {
            log::trace!("WgpuCommandEncoder: Closing render pass");
        }
    }

    fn pass_mut(&mut self, what: &str) -> Option<&mut wgpu::RenderPass<'static>> {
        if self.pass.is_none() {
            log::warn!("WgpuCommandEncoder: {what} outside of a render pass");
        }
        self.pass.as_mut()
    }

    /// Creates the bind groups of every dirty descriptor set of the bound pipeline.
    ///
    /// Returns `None` if a sampler slot the pipeline reads has nothing bound.
    fn dirty_bind_groups(&self, pipeline: &WgpuRenderPipelineEntry) -> Option<Vec<(u32, wgpu::BindGroup)>> {
        let device = self.device.wgpu_device();
        let mut groups = Vec::new();

        for stage in ShaderStage::ALL {
            let s = stage_index(stage);

            let set = stage.sampler_set();
            if self.bindings.dirty[set as usize] {
                let layout = pipeline.bind_group_layouts.get(set as usize)?;
                let mut bound = Vec::with_capacity(pipeline.sampler_counts[s]);
                for slot in 0..pipeline.sampler_counts[s] {
                    match self.bindings.samplers[s].get(slot) {
                        Some(Some(binding)) => bound.push(binding),
                        _ => {
                            log::warn!(
                                "WgpuCommandEncoder: No texture bound to {} sampler {slot}, skipping draw",
                                stage.name()
                            );
                            return None;
                        }
                    }
                }

                let entries: Vec<wgpu::BindGroupEntry> = bound
                    .iter()
                    .enumerate()
                    .flat_map(|(slot, binding)| {
                        let index = slot as u32 * 2;
                        [
                            wgpu::BindGroupEntry {
                                binding: index,
                                resource: wgpu::BindingResource::TextureView(&binding.view),
                            },
                            wgpu::BindGroupEntry {
                                binding: index + 1,
                                resource: wgpu::BindingResource::Sampler(&binding.sampler),
                            },
                        ]
                    })
                    .collect();
                let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Samplers"),
                    layout,
                    entries: &entries,
                });
                groups.push((set, group));
            }

            let set = stage.uniform_set();
            if self.bindings.dirty[set as usize] {
                let layout = pipeline.bind_group_layouts.get(set as usize)?;
                let group = if pipeline.uniform_buffers[s] {
                    let mut contents = self.bindings.uniforms[s]
                        .clone()
                        .unwrap_or_else(|| vec![0; EMPTY_UNIFORM_SIZE]);
                    contents.resize(contents.len().max(16).next_multiple_of(16), 0);

                    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Uniforms"),
                        contents: &contents,
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("Uniforms"),
                        layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        }],
                    })
                } else {
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("Uniforms"),
                        layout,
                        entries: &[],
                    })
                };
                groups.push((set, group));
            }
        }

        Some(groups)
    }

    /// Brings the pass up to date with the bindings. Returns `false` if the draw must
    /// be skipped.
    fn prepare_draw(&mut self) -> bool {
        if self.pass.is_none() {
            log::warn!("WgpuCommandEncoder: Draw outside of a render pass");
            return false;
        }
        let Some(pipeline) = self.bindings.pipeline.clone() else {
            log::warn!("WgpuCommandEncoder: Draw without a pipeline");
            return false;
        };
        if self.viewport_empty {
            return false;
        }

        let Some(groups) = self.dirty_bind_groups(&pipeline) else {
            return false;
        };
        if let Some(pass) = self.pass.as_mut() {
            for (set, group) in &groups {
                pass.set_bind_group(*set, group, &[]);
            }
        }
        self.bindings.dirty = [false; 4];
        true
    }

    fn staging_buffer(&self, label: &str, contents: &[u8]) -> wgpu::Buffer {
        self.device
            .wgpu_device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::COPY_SRC,
            })
    }
}

fn texture_aspect(format: wgpu::TextureFormat) -> wgpu::TextureAspect {
    if format.has_depth_aspect() && format.has_stencil_aspect() {
        wgpu::TextureAspect::DepthOnly
    } else {
        wgpu::TextureAspect::All
    }
}

fn padded_bytes_per_row(bytes_per_row: u32) -> u32 {
    bytes_per_row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_copy_pass(&mut self) {
        // wgpu copies are recorded on the encoder itself.
        self.close_pass();
    }

    fn end_copy_pass(&mut self) {}

    fn upload_to_buffer(&mut self, source: &TransferBufferLocation, destination: &BufferRegion) {
        self.close_pass();
        let Some(buffer) = self.device.get_wgpu_buffer(destination.buffer) else {
            log::warn!("WgpuCommandEncoder: BufferId {:?} not found.", destination.buffer);
            return;
        };

        // Copies move whole words: widen the range with the neighbouring transfer bytes,
        // which mirror the destination at the same offsets.
        let align = wgpu::COPY_BUFFER_ALIGNMENT;
        let start = destination.offset - destination.offset % align;
        let end = (destination.offset + destination.size)
            .next_multiple_of(align)
            .min(buffer.size());
        if end <= start {
            return;
        }
        let lead = (destination.offset - start) as i64;

        let Some(contents) = self.device.snapshot_transfer_buffer(
            source.transfer_buffer,
            source.offset as i64 - lead,
            (end - start) as usize,
        ) else {
            log::warn!(
                "WgpuCommandEncoder: TransferBufferId {:?} not found.",
                source.transfer_buffer
            );
            return;
        };

        let staging = self.staging_buffer("Buffer upload", &contents);
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.copy_buffer_to_buffer(&staging, 0, &buffer, start, end - start);
        }
    }

    fn upload_to_texture(&mut self, source: &TextureTransferInfo, destination: &TextureRegion) {
        self.close_pass();
        let Some((texture, format)) = self.device.get_wgpu_texture(destination.texture) else {
            log::warn!("WgpuCommandEncoder: TextureId {:?} not found.", destination.texture);
            return;
        };

        let dim = format.block_dim();
        let pixels_per_row = if source.pixels_per_row == 0 {
            destination.w
        } else {
            source.pixels_per_row
        };
        let source_bpr = format.bytes_per_row(pixels_per_row);
        let bpr = format.bytes_per_row(destination.w);
        let rows = destination.h.div_ceil(dim);
        let padded = padded_bytes_per_row(bpr);

        let Some(packed) = self.device.snapshot_transfer_buffer(
            source.transfer_buffer,
            source.offset as i64,
            (source_bpr * rows) as usize,
        ) else {
            log::warn!(
                "WgpuCommandEncoder: TransferBufferId {:?} not found.",
                source.transfer_buffer
            );
            return;
        };

        let mut contents = vec![0u8; (padded * rows) as usize];
        for (target, row) in contents
            .chunks_exact_mut(padded as usize)
            .zip(packed.chunks_exact(source_bpr as usize))
        {
            target[..bpr as usize].copy_from_slice(&row[..bpr as usize]);
        }

        let staging = self.staging_buffer("Texture upload", &contents);
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.copy_buffer_to_texture(
                wgpu::TexelCopyBufferInfo {
                    buffer: &staging,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded),
                        rows_per_image: Some(rows),
                    },
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: destination.mip_level,
                    origin: wgpu::Origin3d {
                        x: destination.x,
                        y: destination.y,
                        z: destination.layer,
                    },
                    aspect: texture_aspect(texture.format()),
                },
                wgpu::Extent3d {
                    width: destination.w.next_multiple_of(dim),
                    height: rows * dim,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn download_from_texture(&mut self, source: &TextureRegion, destination: &TextureTransferInfo) {
        self.close_pass();
        let Some((texture, format)) = self.device.get_wgpu_texture(source.texture) else {
            log::warn!("WgpuCommandEncoder: TextureId {:?} not found.", source.texture);
            return;
        };

        let bytes_per_row = format.bytes_per_row(source.w);
        let padded = padded_bytes_per_row(bytes_per_row);
        let rows = source.h.div_ceil(format.block_dim());

        let staging = self.device.wgpu_device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Texture download"),
            size: u64::from(padded) * u64::from(rows),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let Some(encoder) = self.encoder.as_mut() else {
            return;
        };
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: source.mip_level,
                origin: wgpu::Origin3d {
                    x: source.x,
                    y: source.y,
                    z: source.layer,
                },
                aspect: texture_aspect(texture.format()),
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(rows),
                },
            },
            wgpu::Extent3d {
                width: source.w,
                height: source.h,
                depth_or_array_layers: 1,
            },
        );

        self.device.register_download(
            destination.transfer_buffer,
            PendingDownload {
                staging,
                offset: destination.offset,
                padded_bytes_per_row: padded,
                bytes_per_row,
                rows,
            },
        );
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        self.close_pass();
        let Some((wgpu_texture, _)) = self.device.get_wgpu_texture(texture) else {
            log::warn!("WgpuCommandEncoder: TextureId {texture:?} not found.");
            return;
        };
        if wgpu_texture.mip_level_count() <= 1 {
            return;
        }

        let device = self.device.wgpu_device();
        let needed = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if !wgpu_texture.usage().contains(needed)
            || !MipmapGenerator::supports(device, wgpu_texture.format())
        {
            log::warn!(
                "WgpuCommandEncoder: Can't generate mipmaps for {:?} textures",
                wgpu_texture.format()
            );
            return;
        }

        if let Some(encoder) = self.encoder.as_mut() {
            self.device.mipmaps().generate(device, encoder, &wgpu_texture);
        }
    }

    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor) {
        self.close_pass();
        self.bindings.pipeline = None;
        self.bindings.invalidate();
        self.viewport_empty = false;

        let attachment_view = |texture: &wgpu::Texture, mip_level: u32, layer: u32| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: descriptor.label.as_deref(),
                dimension: Some(wgpu::TextureViewDimension::D2),
                aspect: wgpu::TextureAspect::All,
                base_mip_level: mip_level,
                mip_level_count: Some(1),
                base_array_layer: layer,
                array_layer_count: Some(1),
                ..Default::default()
            })
        };

        let mut target_size = None;
        let mut level_size = |texture: &wgpu::Texture, mip_level: u32| {
            target_size.get_or_insert((
                (texture.width() >> mip_level).max(1),
                (texture.height() >> mip_level).max(1),
            ));
        };

        let mut color_views = Vec::with_capacity(descriptor.color_attachments.len());
        for attachment in &descriptor.color_attachments {
            let Some((texture, _)) = self.device.get_wgpu_texture(attachment.texture) else {
                log::warn!(
                    "WgpuCommandEncoder: Color attachment {:?} not found.",
                    attachment.texture
                );
                continue;
            };
            level_size(&texture, attachment.mip_level);
            color_views.push((
                attachment_view(&texture, attachment.mip_level, attachment.layer),
                attachment,
            ));
        }

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|(view, attachment)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match attachment.load_op {
                            LoadOp::Load => wgpu::LoadOp::Load,
                            LoadOp::Clear => wgpu::LoadOp::Clear(attachment.clear_color.into_wgpu()),
                            LoadOp::DontCare => wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        },
                        store: attachment.store_op.into_wgpu(),
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth = descriptor.depth_stencil_attachment.as_ref().and_then(|attachment| {
            match self.device.get_wgpu_texture(attachment.texture) {
                Some((texture, _)) => {
                    level_size(&texture, 0);
                    Some((attachment_view(&texture, 0, 0), texture.format(), attachment))
                }
                None => {
                    log::warn!(
                        "WgpuCommandEncoder: Depth attachment {:?} not found.",
                        attachment.texture
                    );
                    None
                }
            }
        });

        let depth_stencil_attachment =
            depth
                .as_ref()
                .map(|(view, format, attachment)| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: match attachment.load_op {
                            LoadOp::Load => wgpu::LoadOp::Load,
                            LoadOp::Clear | LoadOp::DontCare => {
                                wgpu::LoadOp::Clear(attachment.clear_depth)
                            }
                        },
                        store: attachment.store_op.into_wgpu(),
                    }),
                    stencil_ops: format.has_stencil_aspect().then_some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                });

        self.target_size = target_size.unwrap_or((1, 1));

        let Some(encoder) = self.encoder.as_mut() else {
            return;
        };
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: descriptor.label.as_deref(),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        self.pass = Some(pass);
    }

    fn end_render_pass(&mut self) {
        self.close_pass();
    }

    fn bind_graphics_pipeline(&mut self, pipeline: PipelineId) {
        let Some(entry) = self.device.get_pipeline(pipeline) else {
            log::warn!("WgpuCommandEncoder: PipelineId {pipeline:?} not found.");
            return;
        };
        if self
            .bindings
            .pipeline
            .as_ref()
            .is_some_and(|bound| Arc::ptr_eq(bound, &entry))
        {
            return;
        }

        if let Some(pass) = self.pass_mut("Pipeline bind") {
            pass.set_pipeline(&entry.wgpu_pipeline);
        }
        self.bindings.pipeline = Some(entry);
        self.bindings.invalidate();
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        // wgpu rejects viewports reaching outside the attachments.
        let (width, height) = (self.target_size.0 as f32, self.target_size.1 as f32);
        let x = viewport.x.clamp(0.0, width);
        let y = viewport.y.clamp(0.0, height);
        let w = (viewport.x + viewport.w).min(width) - x;
        let h = (viewport.y + viewport.h).min(height) - y;

        self.viewport_empty = w <= 0.0 || h <= 0.0;
        if self.viewport_empty {
            log::trace!("WgpuCommandEncoder: Viewport {viewport:?} lies outside the target");
            return;
        }
        if let Some(pass) = self.pass_mut("Viewport") {
            pass.set_viewport(x, y, w, h, viewport.min_depth, viewport.max_depth);
        }
    }

    fn set_scissor(&mut self, x: u32, y: u32, w: u32, h: u32) {
        let (width, height) = self.target_size;
        let x = x.min(width);
        let y = y.min(height);
        let w = w.min(width - x);
        let h = h.min(height - y);
        if let Some(pass) = self.pass_mut("Scissor") {
            pass.set_scissor_rect(x, y, w, h);
        }
    }

    fn bind_vertex_buffers(&mut self, first_slot: u32, bindings: &[BufferBinding]) {
        let Some(pipeline) = self.bindings.pipeline.clone() else {
            log::warn!("WgpuCommandEncoder: Vertex buffers bound without a pipeline");
            return;
        };

        for (slot, binding) in (first_slot..).zip(bindings) {
            let Some(&index) = pipeline.slot_map.get(&slot) else {
                log::trace!("WgpuCommandEncoder: Pipeline reads no vertex buffer in slot {slot}");
                continue;
            };
            let Some(buffer) = self.device.get_wgpu_buffer(binding.buffer) else {
                log::warn!("WgpuCommandEncoder: Vertex BufferId {:?} not found.", binding.buffer);
                continue;
            };
            if let Some(pass) = self.pass_mut("Vertex buffer bind") {
                pass.set_vertex_buffer(index, buffer.slice(binding.offset..));
            }
        }
    }

    fn bind_index_buffer(&mut self, binding: &BufferBinding, format: IndexFormat) {
        let Some(buffer) = self.device.get_wgpu_buffer(binding.buffer) else {
            log::warn!("WgpuCommandEncoder: Index BufferId {:?} not found.", binding.buffer);
            return;
        };
        if let Some(pass) = self.pass_mut("Index buffer bind") {
            pass.set_index_buffer(buffer.slice(binding.offset..), format.into_wgpu());
        }
    }

    fn bind_samplers(&mut self, stage: ShaderStage, first_slot: u32, bindings: &[TextureSamplerBinding]) {
        let slots = &mut self.bindings.samplers[stage_index(stage)];
        let end = first_slot as usize + bindings.len();
        if slots.len() < end {
            slots.resize(end, None);
        }

        for (slot, binding) in slots[first_slot as usize..end].iter_mut().zip(bindings) {
            let view = self.device.get_sample_view(binding.texture);
            let sampler = self.device.get_wgpu_sampler(binding.sampler);
            *slot = match (view, sampler) {
                (Some(view), Some(sampler)) => Some(SamplerBinding { view, sampler }),
                _ => {
                    log::warn!("WgpuCommandEncoder: Can't sample {binding:?}");
                    None
                }
            };
        }
        self.bindings.dirty[stage.sampler_set() as usize] = true;
    }

    fn push_uniform_data(&mut self, stage: ShaderStage, slot: u32, data: &[u8]) {
        if slot != 0 {
            log::warn!("WgpuCommandEncoder: Only uniform buffer slot 0 is supported, got {slot}");
            return;
        }
        self.bindings.uniforms[stage_index(stage)] = Some(data.to_vec());
        self.bindings.dirty[stage.uniform_set() as usize] = true;
    }

    fn draw_primitives(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        if self.prepare_draw() {
            if let Some(pass) = self.pass.as_mut() {
                pass.draw(vertices, instances);
            }
        }
    }

    fn draw_indexed_primitives(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        if self.prepare_draw() {
            if let Some(pass) = self.pass.as_mut() {
                pass.draw_indexed(indices, base_vertex, instances);
            }
        }
    }

    fn finish(mut self: Box<Self>) -> CommandBufferId {
        self.close_pass();
        let command_buffer = match self.encoder.take() {
            Some(encoder) => encoder.finish(),
            None => self
                .device
                .wgpu_device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor::default())
                .finish(),
        };
        self.device.register_command_buffer(command_buffer)
    }
}
