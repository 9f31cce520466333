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

use std::borrow::Cow;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use taisei_render_core::renderer::api::{
    BlendMode, Capabilities, CullFaceMode, DepthTestFunc, Primitive,
};
use taisei_render_core::renderer::backend::pipeline_cache::{
    PipelineCache, PipelineCacheKey, PipelineDescription,
};
use taisei_render_core::renderer::gpu::{
    FrontFace, ShaderDescriptor, ShaderFormat, ShaderId, ShaderStage, TextureFormat,
    VertexInputState,
};
use taisei_render_core::renderer::GpuDevice;
use taisei_render_infra::HeadlessDevice;

const OUTPUTS: [TextureFormat; 1] = [TextureFormat::Rgba8Unorm];

fn shader(device: &HeadlessDevice, stage: ShaderStage) -> ShaderId {
    device
        .create_shader(&ShaderDescriptor {
            label: None,
            stage,
            format: ShaderFormat::SpirV,
            code: Cow::Owned(vec![0x03, 0x02, 0x23, 0x07]),
            entry_point: Cow::Borrowed("main"),
            sampler_kinds: Vec::new(),
            num_uniform_buffers: 0,
        })
        .expect("Failed to create shader")
}

fn description<'a>(
    vertex_shader: ShaderId,
    fragment_shader: ShaderId,
    vertex_input: &'a VertexInputState,
    blend_mode: BlendMode,
) -> PipelineDescription<'a> {
    PipelineDescription {
        shader_program: 1,
        vertex_shader,
        fragment_shader,
        vertex_layout: 1,
        vertex_input,
        cull_mode: CullFaceMode::Back,
        depth_func: DepthTestFunc::LEqual,
        blend_mode,
        primitive: Primitive::TriangleStrip,
        capabilities: Capabilities::DEPTH_TEST | Capabilities::CULL_FACE,
        front_face: FrontFace::CounterClockwise,
        outputs: &OUTPUTS,
        depth_format: Some(TextureFormat::D24UnormS8Uint),
    }
}

fn bench_key_derivation(c: &mut Criterion) {
    let input = VertexInputState::default();
    let desc = description(ShaderId(1), ShaderId(2), &input, BlendMode::ALPHA);

    c.bench_function("pipeline_key_derive", |b| {
        b.iter(|| PipelineCacheKey::derive(black_box(&desc)))
    });
}

fn bench_cache_hits(c: &mut Criterion) {
    let device = HeadlessDevice::new();
    let vs = shader(&device, ShaderStage::Vertex);
    let fs = shader(&device, ShaderStage::Fragment);
    let input = VertexInputState::default();

    let modes = [BlendMode::ALPHA, BlendMode::ADD, BlendMode::NONE];
    let descriptions: Vec<_> = modes
        .iter()
        .map(|&mode| description(vs, fs, &input, mode))
        .collect();

    let mut cache = PipelineCache::new();
    for desc in &descriptions {
        cache.get(&device, desc).expect("Failed to build pipeline");
    }

    let mut group = c.benchmark_group("pipeline_cache");
    group.bench_function("hit", |b| {
        b.iter(|| cache.get(&device, black_box(&descriptions[0])))
    });
    group.bench_function("hit_alternating_blend", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % descriptions.len();
            cache.get(&device, black_box(&descriptions[i]))
        })
    });
    group.finish();

    cache.wipe(&device);
}

criterion_group!(benches, bench_key_derivation, bench_cache_hits);
criterion_main!(benches);
