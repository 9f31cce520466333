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

//! Draw calls: resolves render state into a pipeline and records the draw.

use super::{frame_commands, RenderContext, RenderState};
use crate::math::{Extent2D, FloatRect, IntRect};
use crate::renderer::api::{MagicUniform, MatrixMode, Primitive};
use crate::renderer::backend::framebuffer::{Framebuffer, RenderTarget};
use crate::renderer::backend::pipeline_cache::PipelineDescription;
use crate::renderer::backend::shader_object::ShaderObject;
use crate::renderer::backend::VertexArrayHandle;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::gpu::{BufferBinding, ShaderStage, TextureSamplerBinding, Viewport};
use crate::renderer::GpuDevice;
use std::ops::Range;

#[derive(Debug, Clone, Copy)]
enum DrawRange {
    Vertices { first: u32, count: u32 },
    Indices { first: u32, count: u32 },
}

/// Clamps the scissor to the render target; `None` covers all of it.
fn scissor_rect(scissor: Option<IntRect>, extent: Extent2D) -> (u32, u32, u32, u32) {
    let Some(rect) = scissor else {
        return (0, 0, extent.width, extent.height);
    };

    let (w, h) = (i64::from(extent.width), i64::from(extent.height));
    let x0 = i64::from(rect.x).clamp(0, w);
    let y0 = i64::from(rect.y).clamp(0, h);
    let x1 = (i64::from(rect.x) + i64::from(rect.w)).clamp(0, w);
    let y1 = (i64::from(rect.y) + i64::from(rect.h)).clamp(0, h);

    (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
}

fn write_magic_uniforms(
    object: &mut ShaderObject,
    state: &RenderState,
    viewport: FloatRect,
) -> Result<(), ResourceError> {
    let viewport = viewport.to_array();

    for magic in MagicUniform::ALL {
        let Some(index) = object.interface().magic(magic) else {
            continue;
        };

        let data: &[u8] = match magic {
            MagicUniform::ModelViewMatrix => {
                bytemuck::cast_slice(&state.matrices[MatrixMode::ModelView.index()][..])
            }
            MagicUniform::ProjectionMatrix => {
                bytemuck::cast_slice(&state.matrices[MatrixMode::Projection.index()][..])
            }
            MagicUniform::TextureMatrix => {
                bytemuck::cast_slice(&state.matrices[MatrixMode::Texture.index()][..])
            }
            MagicUniform::Color => bytemuck::bytes_of(&state.color),
            MagicUniform::Viewport => bytemuck::cast_slice(&viewport[..]),
        };

        object.set_uniform_data(index, 0, 1, data)?;
    }

    Ok(())
}

impl RenderContext {
    /// Draws `count` vertices starting at `first` with the current render state.
    ///
    /// ## Arguments
    /// * `instances` - The number of instances; 0 is treated as 1.
    /// * `base_instance` - The index of the first instance.
    ///
    /// ## Errors
    /// * `RenderError::MissingState` - If no program is set or a vertex buffer the
    ///   layout reads from is not attached.
    /// * `ResourceError::InvalidHandle` - If a handle is stale.
    /// * `PipelineError` - If the pipeline cannot be built.
    pub fn draw(
        &mut self,
        vertex_array: VertexArrayHandle,
        primitive: Primitive,
        first: u32,
        count: u32,
        instances: u32,
        base_instance: u32,
    ) -> Result<(), RenderError> {
        self.draw_internal(
            vertex_array,
            primitive,
            DrawRange::Vertices { first, count },
            instances,
            base_instance,
        )
    }

    /// Draws `count` indices of the attached index buffer starting at `first_index`.
    ///
    /// ## Errors
    /// Those of [`RenderContext::draw`], plus `RenderError::MissingState` if the
    /// vertex array has no index buffer.
    pub fn draw_indexed(
        &mut self,
        vertex_array: VertexArrayHandle,
        primitive: Primitive,
        first_index: u32,
        count: u32,
        instances: u32,
        base_instance: u32,
    ) -> Result<(), RenderError> {
        self.draw_internal(
            vertex_array,
            primitive,
            DrawRange::Indices {
                first: first_index,
                count,
            },
            instances,
            base_instance,
        )
    }

    fn draw_internal(
        &mut self,
        vertex_array: VertexArrayHandle,
        primitive: Primitive,
        range: DrawRange,
        instances: u32,
        base_instance: u32,
    ) -> Result<(), RenderError> {
        let program = self
            .state
            .program
            .ok_or(RenderError::MissingState("a shader program"))?;

        let (first, count) = match range {
            DrawRange::Vertices { first, count } | DrawRange::Indices { first, count } => {
                (first, count)
            }
        };
        let elements = draw_range(first, count)?;
        let instances = draw_range(base_instance, instances.max(1))?;

        let Self {
            device,
            state,
            frame,
            swapchain,
            pipelines,
            textures,
            shader_objects,
            programs,
            vertex_buffers,
            index_buffers,
            vertex_arrays,
            framebuffers,
            default_framebuffer,
            ..
        } = self;
        let device: &dyn GpuDevice = &**device;

        let program = programs.get(program).ok_or(ResourceError::InvalidHandle)?;
        let vao = vertex_arrays
            .get(vertex_array)
            .ok_or(ResourceError::InvalidHandle)?;
        let commands = frame_commands(frame, device);

        // --- Uploads ---
        // Copies close the render pass, so everything is flushed before it is opened.

        let mut vertex_bindings = Vec::with_capacity(vao.input_state().buffers.len());
        for desc in &vao.input_state().buffers {
            let vbo = vao
                .vertex_buffer(desc.slot)
                .and_then(|h| vertex_buffers.get_mut(h))
                .ok_or(RenderError::MissingState("a vertex buffer"))?;
            vbo.buffer.flush(device, commands)?;

            let Some(buffer) = vbo.buffer.gpu_buffer() else {
                log::trace!(
                    "RenderContext: skipping draw from empty vertex buffer '{}'",
                    vbo.buffer.label()
                );
                return Ok(());
            };
            vertex_bindings.push((desc.slot, BufferBinding { buffer, offset: 0 }));
        }

        let index_binding = match range {
            DrawRange::Vertices { .. } => None,
            DrawRange::Indices { .. } => {
                let ibo = vao
                    .index_buffer()
                    .and_then(|h| index_buffers.get_mut(h))
                    .ok_or(RenderError::MissingState("an index buffer"))?;
                ibo.buffer.flush(device, commands)?;

                let Some(buffer) = ibo.buffer.gpu_buffer() else {
                    log::trace!(
                        "RenderContext: skipping draw from empty index buffer '{}'",
                        ibo.buffer.label()
                    );
                    return Ok(());
                };
                Some((BufferBinding { buffer, offset: 0 }, ibo.format))
            }
        };

        let mut samplers: [Vec<TextureSamplerBinding>; 2] = Default::default();
        for (bindings, stage) in samplers.iter_mut().zip(ShaderStage::ALL) {
            let object = shader_objects
                .get(program.stage(stage))
                .ok_or(ResourceError::InvalidHandle)?;
            for &handle in object.sampler_bindings() {
                let texture = textures
                    .get_mut(handle)
                    .ok_or(ResourceError::InvalidHandle)?;
                texture.prepare(commands);
                let sampler = texture.ensure_sampler(device)?;
                bindings.push(TextureSamplerBinding {
                    texture: texture.gpu_texture,
                    sampler,
                });
            }
        }

        // --- Render pass ---

        let target = match state.framebuffer {
            Some(handle) => RenderTarget::Framebuffer(handle),
            None => RenderTarget::Default,
        };

        if commands.render_target() != Some(target) {
            match state.framebuffer {
                None => {
                    if swapchain.is_none() {
                        log::trace!("RenderContext: no swapchain texture, skipping draw");
                        return Ok(());
                    }
                    let outputs = default_framebuffer.setup_outputs(swapchain.as_ref());
                    commands.begin_render_pass(target, &outputs, None);
                }
                Some(handle) => {
                    let fb = framebuffers
                        .get_mut(handle)
                        .ok_or(ResourceError::InvalidHandle)?;
                    let outputs = fb.setup_outputs(textures);
                    if outputs.color_attachments.is_empty()
                        && outputs.depth_stencil_attachment.is_none()
                    {
                        log::warn!(
                            "RenderContext: framebuffer '{}' has no outputs, skipping draw",
                            fb.label()
                        );
                        return Ok(());
                    }
                    commands.begin_render_pass(target, &outputs, Some(fb.label()));
                }
            }
        }

        let extent = commands.extent();
        let mut viewport = match state.framebuffer {
            Some(handle) => framebuffers
                .get(handle)
                .map(Framebuffer::viewport)
                .unwrap_or_default(),
            None => default_framebuffer.viewport,
        };
        if viewport.is_empty() {
            viewport = FloatRect::new(0.0, 0.0, extent.width as f32, extent.height as f32);
        }

        // --- Pipeline ---

        let [vertex_shader, fragment_shader] = program.stages().map(|h| {
            shader_objects
                .get(h)
                .map(|object| object.gpu_shader)
                .ok_or(ResourceError::InvalidHandle)
        });

        let outputs = commands.color_formats().to_vec();
        let pipeline = pipelines.get(
            device,
            &PipelineDescription {
                shader_program: program.id,
                vertex_shader: vertex_shader?,
                fragment_shader: fragment_shader?,
                vertex_layout: vao.layout_id,
                vertex_input: vao.input_state(),
                cull_mode: state.cull_mode,
                depth_func: state.depth_func,
                blend_mode: state.blend_mode,
                primitive,
                capabilities: state.capabilities,
                front_face: state.front_face,
                outputs: &outputs,
                depth_format: commands.depth_format(),
            },
        )?;

        for stage in program.stages() {
            let object = shader_objects
                .get_mut(stage)
                .ok_or(ResourceError::InvalidHandle)?;
            write_magic_uniforms(object, state, viewport)?;
        }

        // --- Recording ---

        let encoder = commands
            .render_pass(target)
            .ok_or_else(|| RenderError::Internal("render pass closed during draw".to_string()))?;

        encoder.bind_graphics_pipeline(pipeline);
        encoder.set_viewport(&Viewport {
            x: viewport.x,
            y: viewport.y,
            w: viewport.w,
            h: viewport.h,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        let (x, y, w, h) = scissor_rect(state.scissor, extent);
        encoder.set_scissor(x, y, w, h);

        for (slot, binding) in &vertex_bindings {
            encoder.bind_vertex_buffers(*slot, std::slice::from_ref(binding));
        }
        if let Some((binding, format)) = &index_binding {
            encoder.bind_index_buffer(binding, *format);
        }

        for (bindings, stage) in samplers.iter().zip(ShaderStage::ALL) {
            if !bindings.is_empty() {
                encoder.bind_samplers(stage, 0, bindings);
            }

            let object = shader_objects
                .get(program.stage(stage))
                .ok_or(ResourceError::InvalidHandle)?;
            if !object.uniform_data().is_empty() {
                encoder.push_uniform_data(stage, 0, object.uniform_data());
            }
        }

        match range {
            DrawRange::Vertices { .. } => encoder.draw_primitives(elements, instances),
            DrawRange::Indices { .. } => encoder.draw_indexed_primitives(elements, 0, instances),
        }

        if let Some(handle) = state.framebuffer {
            if let Some(fb) = framebuffers.get(handle) {
                fb.taint(textures);
            }
        }

        Ok(())
    }
}

/// Builds `start..start + len`, rejecting ranges past `u32::MAX`.
fn draw_range(start: u32, len: u32) -> Result<Range<u32>, RenderError> {
    let end = start
        .checked_add(len)
        .ok_or(RenderError::DrawRangeOverflow { start, len })?;
    Ok(start..end)
}
