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

//! Drives a `RenderContext` over the CPU device, so every upload, clear and readback
//! goes through real copies.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use taisei_render_core::math::{Color, IntRect};
use taisei_render_core::renderer::api::{
    BlendMode, BufferKind, FramebufferAttachment, Pixmap, PixmapFormat, PixmapOrigin, Primitive,
    SamplerDim, ShaderBaseType, ShaderDataType, ShaderLanguage, ShaderReflection, ShaderSampler,
    ShaderSamplerType, ShaderSource, ShaderStructField, ShaderUniformBuffer, SpirvTarget,
    TextureParams, TextureType, VertexAttribConversion, VertexAttribFormat, VertexAttribSpec,
    VertexAttribType,
};
use taisei_render_core::renderer::backend::shader_object::UNIFORM_BLOCK_NAME;
use taisei_render_core::renderer::backend::{
    FramebufferHandle, ShaderProgramHandle, TextureHandle, VertexArrayHandle,
};
use taisei_render_core::renderer::gpu::ShaderStage;
use taisei_render_core::{RenderContext, RenderSettings};
use taisei_render_infra::HeadlessDevice;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn context() -> (HeadlessDevice, RenderContext) {
    init_logger();
    let device = HeadlessDevice::new();
    let ctx = RenderContext::new(Arc::new(device.clone()), RenderSettings::default()).unwrap();
    (device, ctx)
}

fn field(name: &str, offset: u32, ty: ShaderDataType) -> ShaderStructField {
    ShaderStructField {
        name: name.to_string(),
        offset,
        ty,
    }
}

fn spirv(stage: ShaderStage, reflection: ShaderReflection) -> ShaderSource {
    ShaderSource {
        stage,
        language: ShaderLanguage::Spirv {
            target: SpirvTarget::Vulkan10,
        },
        code: vec![0x03, 0x02, 0x23, 0x07],
        reflection: Some(reflection),
    }
}

fn program(ctx: &mut RenderContext) -> ShaderProgramHandle {
    let vertex = spirv(
        ShaderStage::Vertex,
        ShaderReflection {
            uniform_buffers: vec![ShaderUniformBuffer {
                name: UNIFORM_BLOCK_NAME.to_string(),
                set: 1,
                binding: 0,
                size: 80,
                fields: vec![
                    field("r_modelViewMatrix", 0, ShaderDataType::matrix(4)),
                    field("r_color", 64, ShaderDataType::vector(ShaderBaseType::Float, 4)),
                ],
            }],
            samplers: vec![],
        },
    );
    let fragment = spirv(
        ShaderStage::Fragment,
        ShaderReflection {
            uniform_buffers: vec![],
            samplers: vec![ShaderSampler {
                name: "tex".to_string(),
                set: 2,
                binding: 0,
                array_size: 0,
                ty: ShaderSamplerType::plain(SamplerDim::D2),
            }],
        },
    );

    let vs = ctx.shader_object_compile(&vertex, "vs").unwrap();
    let fs = ctx.shader_object_compile(&fragment, "fs").unwrap();
    let program = ctx.shader_program_link(&[vs, fs], "program").unwrap();
    ctx.shader_object_destroy(vs);
    ctx.shader_object_destroy(fs);
    program
}

fn triangle(ctx: &mut RenderContext) -> VertexArrayHandle {
    let vertices: Vec<u8> = [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let vbo = ctx
        .vertex_buffer_create(64, Some(&vertices), "triangle")
        .unwrap();
    let vao = ctx.vertex_array_create("triangle").unwrap();
    let layout = VertexAttribFormat::interleaved(
        &[VertexAttribSpec {
            elements: 2,
            ty: VertexAttribType::Float,
            conversion: VertexAttribConversion::Float,
        }],
        0,
    );
    ctx.vertex_array_layout(vao, &layout).unwrap();
    ctx.vertex_array_attach_vertex_buffer(vao, vbo, 0).unwrap();
    vao
}

fn color_framebuffer(ctx: &mut RenderContext, w: u32, h: u32) -> (FramebufferHandle, TextureHandle) {
    let texture = ctx
        .texture_create(&TextureParams::new_2d(w, h, TextureType::Rgba8), "color")
        .unwrap();
    let fb = ctx.framebuffer_create("fb");
    ctx.framebuffer_attach(fb, Some(texture), 0, FramebufferAttachment::Color0)
        .unwrap();
    (fb, texture)
}

fn gradient(w: u32, h: u32) -> Vec<u8> {
    (0..w * h)
        .flat_map(|i| [i as u8, (i * 3) as u8, 255 - i as u8, 255])
        .collect()
}

#[test]
fn test_texture_fill_then_dump_round_trips() {
    let (_device, mut ctx) = context();
    let texture = ctx
        .texture_create(&TextureParams::new_2d(4, 3, TextureType::Rgba8), "gradient")
        .unwrap();

    let data = gradient(4, 3);
    let pixmap = Pixmap::new(4, 3, PixmapFormat::Rgba8, PixmapOrigin::TopLeft, &data[..]);
    ctx.texture_fill(texture, 0, 0, &pixmap).unwrap();

    let dump = ctx.texture_dump(texture, 0, 0).unwrap();
    assert_eq!((dump.width, dump.height), (4, 3));
    assert_eq!(dump.format, PixmapFormat::Rgba8);
    assert_eq!(dump.origin, PixmapOrigin::TopLeft);
    assert_eq!(&dump.data[..], &data[..]);
}

#[test]
fn test_bottom_left_upload_is_flipped_on_the_way_in() {
    let (_device, mut ctx) = context();
    let texture = ctx
        .texture_create(&TextureParams::new_2d(1, 2, TextureType::Rgba8), "rows")
        .unwrap();

    // Bottom row first.
    let data = [0u8, 0, 255, 255, 255, 0, 0, 255];
    let pixmap = Pixmap::new(1, 2, PixmapFormat::Rgba8, PixmapOrigin::BottomLeft, &data[..]);
    ctx.texture_fill(texture, 0, 0, &pixmap).unwrap();

    let dump = ctx.texture_dump(texture, 0, 0).unwrap();
    assert_eq!(&dump.data[..], &[255, 0, 0, 255, 0, 0, 255, 255]);
}

#[test]
fn test_texture_fill_region_only_touches_the_region() {
    let (_device, mut ctx) = context();
    let texture = ctx
        .texture_create(&TextureParams::new_2d(4, 4, TextureType::Rgba8), "atlas")
        .unwrap();
    ctx.texture_clear(texture, Color::new(0.0, 0.0, 0.0, 1.0)).unwrap();

    let patch = [255u8; 2 * 2 * 4];
    let pixmap = Pixmap::new(2, 2, PixmapFormat::Rgba8, PixmapOrigin::TopLeft, &patch[..]);
    ctx.texture_fill_region(texture, 0, 0, 1, 1, &pixmap).unwrap();

    let dump = ctx.texture_dump(texture, 0, 0).unwrap();
    for y in 0..4usize {
        for x in 0..4usize {
            let texel = &dump.data[(y * 4 + x) * 4..][..4];
            let inside = (1..3).contains(&x) && (1..3).contains(&y);
            let expected: &[u8] = if inside { &[255; 4] } else { &[0, 0, 0, 255] };
            assert_eq!(texel, expected, "texel ({x}, {y})");
        }
    }
}

#[test]
fn test_texture_clear_then_dump() {
    let (_device, mut ctx) = context();
    let texture = ctx
        .texture_create(&TextureParams::new_2d(3, 3, TextureType::Rgba8), "cleared")
        .unwrap();

    ctx.texture_clear(texture, Color::new(1.0, 0.0, 1.0, 1.0)).unwrap();

    let dump = ctx.texture_dump(texture, 0, 0).unwrap();
    assert!(dump.data.chunks(4).all(|t| t == [255, 0, 255, 255]));
}

#[test]
fn test_framebuffer_clear_is_visible_to_readback() {
    let (_device, mut ctx) = context();
    let (fb, _texture) = color_framebuffer(&mut ctx, 8, 8);

    let result: Rc<RefCell<Option<Vec<u8>>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&result);

    ctx.begin_frame().unwrap();
    ctx.set_framebuffer(Some(fb)).unwrap();
    ctx.clear(BufferKind::COLOR, Color::new(0.0, 1.0, 0.0, 1.0), 1.0);
    ctx.framebuffer_read_async(
        Some(fb),
        FramebufferAttachment::Color0,
        IntRect::new(2, 2, 4, 4),
        Box::new(move |pixmap| {
            let pixmap = pixmap.expect("readback failed");
            assert_eq!((pixmap.width, pixmap.height), (4, 4));
            assert_eq!(pixmap.origin, PixmapOrigin::BottomLeft);
            *sink.borrow_mut() = Some(pixmap.data.to_vec());
        }),
    );
    ctx.end_frame().unwrap();
    ctx.finalize_read_requests();

    let data = result.borrow_mut().take().expect("callback never ran");
    assert_eq!(data.len(), 4 * 4 * 4);
    assert!(data.chunks(4).all(|t| t == [0, 255, 0, 255]));
}

#[test]
fn test_readback_of_missing_attachment_reports_none() {
    let (_device, mut ctx) = context();
    let fb = ctx.framebuffer_create("empty");

    let called = Rc::new(RefCell::new(false));
    let sink = Rc::clone(&called);
    ctx.framebuffer_read_async(
        Some(fb),
        FramebufferAttachment::Color0,
        IntRect::new(0, 0, 1, 1),
        Box::new(move |pixmap| {
            assert!(pixmap.is_none());
            *sink.borrow_mut() = true;
        }),
    );

    assert!(*called.borrow());
}

#[test]
fn test_readbacks_beyond_the_ring_size_all_complete() {
    let (_device, mut ctx) = context();
    let (fb, texture) = color_framebuffer(&mut ctx, 4, 4);
    ctx.texture_clear(texture, Color::new(1.0, 1.0, 1.0, 1.0)).unwrap();

    let completed = Rc::new(RefCell::new(0usize));
    let requests = RenderSettings::default().readback_ring_size + 1;

    for _ in 0..requests {
        let sink = Rc::clone(&completed);
        ctx.framebuffer_read_async(
            Some(fb),
            FramebufferAttachment::Color0,
            IntRect::new(0, 0, 4, 4),
            Box::new(move |pixmap| {
                let pixmap = pixmap.expect("readback failed");
                assert!(pixmap.data.iter().all(|&b| b == 255));
                *sink.borrow_mut() += 1;
            }),
        );
    }
    ctx.finalize_read_requests();

    assert_eq!(*completed.borrow(), requests);
    assert_eq!(ctx.pending_readbacks(), 0);
}

#[test]
fn test_pipelines_are_cached_across_draws() {
    let (device, mut ctx) = context();
    let program = program(&mut ctx);
    let vao = triangle(&mut ctx);
    let (fb, _texture) = color_framebuffer(&mut ctx, 16, 16);

    ctx.begin_frame().unwrap();
    ctx.set_framebuffer(Some(fb)).unwrap();
    ctx.set_program(Some(program)).unwrap();

    ctx.draw(vao, Primitive::Triangles, 0, 3, 1, 0).unwrap();
    ctx.draw(vao, Primitive::Triangles, 0, 3, 1, 0).unwrap();
    assert_eq!(ctx.pipeline_cache().len(), 1);

    ctx.set_blend_mode(BlendMode::ADD);
    ctx.draw(vao, Primitive::Triangles, 0, 3, 1, 0).unwrap();
    ctx.end_frame().unwrap();

    // A later frame with the same state reuses what the first one built.
    ctx.begin_frame().unwrap();
    ctx.set_framebuffer(Some(fb)).unwrap();
    ctx.draw(vao, Primitive::Triangles, 0, 3, 1, 0).unwrap();
    ctx.end_frame().unwrap();

    let stats = device.stats();
    assert_eq!(ctx.pipeline_cache().len(), 2);
    assert_eq!(stats.pipelines_created, 2);
    assert_eq!(stats.live_pipelines, 2);
    assert_eq!(stats.draws, 4);
}

#[test]
fn test_destroying_the_program_evicts_its_pipelines() {
    let (device, mut ctx) = context();
    let program = program(&mut ctx);
    let vao = triangle(&mut ctx);
    let (fb, _texture) = color_framebuffer(&mut ctx, 4, 4);

    ctx.begin_frame().unwrap();
    ctx.set_framebuffer(Some(fb)).unwrap();
    ctx.set_program(Some(program)).unwrap();
    ctx.draw(vao, Primitive::Triangles, 0, 3, 1, 0).unwrap();
    ctx.end_frame().unwrap();
    assert_eq!(device.stats().live_pipelines, 1);

    ctx.set_program(None).unwrap();
    ctx.shader_program_destroy(program);

    assert!(ctx.pipeline_cache().is_empty());
    assert_eq!(device.stats().live_pipelines, 0);
}

#[test]
fn test_shutdown_releases_device_resources() {
    let (device, mut ctx) = context();
    let program = program(&mut ctx);
    let vao = triangle(&mut ctx);
    let (fb, _texture) = color_framebuffer(&mut ctx, 4, 4);

    ctx.begin_frame().unwrap();
    ctx.set_framebuffer(Some(fb)).unwrap();
    ctx.set_program(Some(program)).unwrap();
    ctx.draw(vao, Primitive::Triangles, 0, 3, 1, 0).unwrap();
    ctx.end_frame().unwrap();
    assert!(device.stats().live_textures > 0);

    ctx.shutdown();

    let stats = device.stats();
    assert_eq!(stats.live_pipelines, 0);
    assert_eq!(stats.live_textures, 0);
    assert!(ctx.pipeline_cache().is_empty());
}
