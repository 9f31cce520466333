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

//! Memoization of graphics pipelines keyed by the render state they bake in.
//!
//! A draw describes its fixed-function state with a [`PipelineDescription`]. The
//! description is packed into a [`PipelineCacheKey`], two `u64` words with every field
//! at a fixed bit position, and the key is looked up in a hash table. Pipelines are
//! compiled on the first miss of a key and live until the shader program or vertex
//! layout they reference is destroyed, or until the cache is wiped.
//!
//! Fields that have no effect on the compiled pipeline are normalized before packing:
//! the cull mode reads as "disabled" unless face culling is enabled and the depth
//! function reads as `Always` unless depth testing is enabled. Two descriptions that
//! only differ in such fields therefore share a pipeline.

use super::format;
use crate::renderer::api::{BlendMode, Capabilities, CullFaceMode, DepthTestFunc, Primitive};
use crate::renderer::error::{PipelineError, ResourceError};
use crate::renderer::gpu::{
    ColorTargetDescription, CompareFunction, CullMode, DepthStencilState, FillMode, FrontFace,
    GraphicsPipelineDescriptor, MultisampleState, PipelineId, RasterizerState, ShaderId,
    TextureFormat, VertexInputState,
};
use crate::renderer::GpuDevice;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The maximum number of color outputs a pipeline can write.
pub const MAX_OUTPUTS: usize = 4;

/// The 6-bit format value marking an unused output or a missing depth attachment.
pub const FORMAT_NONE: u8 = 0x3F;

/// Bit layout of the key: `(word, shift, width)`.
mod layout {
    pub const BLEND: (usize, u32, u32) = (0, 0, 28);
    pub const OUTPUT_FORMATS: (usize, u32, u32) = (0, 28, 24);
    pub const PRIMITIVE: (usize, u32, u32) = (0, 52, 4);
    pub const CULL: (usize, u32, u32) = (0, 56, 2);
    pub const DEPTH_TEST: (usize, u32, u32) = (0, 58, 1);
    pub const DEPTH_WRITE: (usize, u32, u32) = (0, 59, 1);
    pub const FRONT_FACE_CCW: (usize, u32, u32) = (0, 60, 1);
    pub const SHADER_PROGRAM: (usize, u32, u32) = (1, 0, 16);
    pub const VERTEX_LAYOUT: (usize, u32, u32) = (1, 16, 16);
    pub const DEPTH_FUNC: (usize, u32, u32) = (1, 32, 7);
    pub const DEPTH_FORMAT: (usize, u32, u32) = (1, 39, 6);

    pub const FORMAT_BITS: u32 = 6;
}

/// Everything a draw needs from a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDescription<'a> {
    /// The id of the linked shader program.
    pub shader_program: u16,
    /// The vertex stage of the program.
    pub vertex_shader: ShaderId,
    /// The fragment stage of the program.
    pub fragment_shader: ShaderId,
    /// The layout id of the vertex array.
    pub vertex_layout: u16,
    /// The vertex input state of the vertex array.
    pub vertex_input: &'a VertexInputState,
    /// The faces culled when [`Capabilities::CULL_FACE`] is enabled.
    pub cull_mode: CullFaceMode,
    /// The depth test when [`Capabilities::DEPTH_TEST`] is enabled.
    pub depth_func: DepthTestFunc,
    /// The blend mode.
    pub blend_mode: BlendMode,
    /// The primitive.
    pub primitive: Primitive,
    /// The enabled fixed-function features.
    pub capabilities: Capabilities,
    /// The winding of front faces.
    pub front_face: FrontFace,
    /// The formats of the color attachments, in output order.
    pub outputs: &'a [TextureFormat],
    /// The format of the depth attachment.
    pub depth_format: Option<TextureFormat>,
}

/// The packed identity of a pipeline.
///
/// Equality is word-wise. The hash mixes both words, so it does not depend on the
/// memory layout of the key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PipelineCacheKey([u64; 2]);

fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

impl PipelineCacheKey {
    fn put(&mut self, (word, shift, width): (usize, u32, u32), value: u64) {
        debug_assert!(value < 1 << width);
        self.0[word] |= value << shift;
    }

    fn get(&self, (word, shift, width): (usize, u32, u32)) -> u64 {
        (self.0[word] >> shift) & ((1 << width) - 1)
    }

    /// Packs a description into a key.
    ///
    /// ## Errors
    /// * `PipelineError::MalformedOutputs` - If more than [`MAX_OUTPUTS`] outputs are given.
    /// * `PipelineError::KeyFieldOutOfRange` - If a format id does not fit in its field.
    /// * `PipelineError::InvalidDepthFormat` - If the depth format is not a depth format.
    pub fn derive(desc: &PipelineDescription<'_>) -> Result<Self, PipelineError> {
        if desc.outputs.len() > MAX_OUTPUTS {
            return Err(PipelineError::MalformedOutputs {
                num_outputs: desc.outputs.len(),
            });
        }

        let mut key = Self([0; 2]);
        key.put(layout::BLEND, desc.blend_mode.bits() as u64);

        let mut formats = 0u64;
        for i in 0..MAX_OUTPUTS {
            let id = match desc.outputs.get(i) {
                Some(format) => format_id("output_format", *format)?,
                None => FORMAT_NONE,
            };
            formats |= (id as u64) << (i as u32 * layout::FORMAT_BITS);
        }
        key.put(layout::OUTPUT_FORMATS, formats);

        key.put(layout::PRIMITIVE, desc.primitive as u64);

        let caps = desc.capabilities;
        if caps.contains(Capabilities::CULL_FACE) {
            key.put(layout::CULL, desc.cull_mode.key_id() as u64);
        }

        let depth_test = caps.contains(Capabilities::DEPTH_TEST);
        let depth_func = if depth_test {
            desc.depth_func
        } else {
            DepthTestFunc::Always
        };
        key.put(layout::DEPTH_TEST, depth_test as u64);
        key.put(
            layout::DEPTH_WRITE,
            caps.contains(Capabilities::DEPTH_WRITE) as u64,
        );
        key.put(
            layout::FRONT_FACE_CCW,
            (desc.front_face == FrontFace::CounterClockwise) as u64,
        );

        key.put(layout::SHADER_PROGRAM, desc.shader_program as u64);
        key.put(layout::VERTEX_LAYOUT, desc.vertex_layout as u64);
        key.put(layout::DEPTH_FUNC, depth_func as u64);

        let depth_format = match desc.depth_format {
            Some(format) if !format.is_depth() => {
                return Err(PipelineError::InvalidDepthFormat(format))
            }
            Some(format) => format_id("depth_format", format)?,
            None => FORMAT_NONE,
        };
        key.put(layout::DEPTH_FORMAT, depth_format as u64);

        Ok(key)
    }

    /// Returns the raw words.
    pub fn words(&self) -> [u64; 2] {
        self.0
    }

    /// Returns the mixed 64-bit hash of the key.
    pub fn hash64(&self) -> u64 {
        mix64(self.0[0]) ^ mix64(self.0[1] ^ 0x9E37_79B9_7F4A_7C15)
    }

    /// Returns the shader program id.
    pub fn shader_program(&self) -> u16 {
        self.get(layout::SHADER_PROGRAM) as u16
    }

    /// Returns the vertex layout id.
    pub fn vertex_layout(&self) -> u16 {
        self.get(layout::VERTEX_LAYOUT) as u16
    }

    /// Returns the raw blend mode bits.
    pub fn blend_bits(&self) -> u32 {
        self.get(layout::BLEND) as u32
    }

    /// Returns the format id of an output, or `None` for an unused output.
    pub fn output_format_id(&self, output: usize) -> Option<u8> {
        let formats = self.get(layout::OUTPUT_FORMATS);
        let id = ((formats >> (output as u32 * layout::FORMAT_BITS)) & 0x3F) as u8;
        (output < MAX_OUTPUTS && id != FORMAT_NONE).then_some(id)
    }

    /// Returns the depth format id, or `None` without a depth attachment.
    pub fn depth_format_id(&self) -> Option<u8> {
        let id = self.get(layout::DEPTH_FORMAT) as u8;
        (id != FORMAT_NONE).then_some(id)
    }

    /// Returns the packed cull mode; 0 when culling is disabled.
    pub fn cull_bits(&self) -> u8 {
        self.get(layout::CULL) as u8
    }

    /// Returns the packed depth function.
    pub fn depth_func_bits(&self) -> u8 {
        self.get(layout::DEPTH_FUNC) as u8
    }

    /// Returns the packed primitive.
    pub fn primitive_bits(&self) -> u8 {
        self.get(layout::PRIMITIVE) as u8
    }

    /// Returns `(depth_test, depth_write, front_face_ccw)`.
    pub fn flags(&self) -> (bool, bool, bool) {
        (
            self.get(layout::DEPTH_TEST) != 0,
            self.get(layout::DEPTH_WRITE) != 0,
            self.get(layout::FRONT_FACE_CCW) != 0,
        )
    }
}

fn format_id(field: &'static str, format: TextureFormat) -> Result<u8, PipelineError> {
    let id = format.id();
    if id >= FORMAT_NONE {
        return Err(PipelineError::KeyFieldOutOfRange {
            field,
            value: id as u32,
        });
    }
    Ok(id)
}

impl Hash for PipelineCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash64());
    }
}

impl fmt::Display for PipelineCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.0[1], self.0[0])
    }
}

impl fmt::Debug for PipelineCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineCacheKey({self})")
    }
}

/// Builds the device pipeline descriptor for a description.
pub fn pipeline_descriptor<'a>(
    desc: &PipelineDescription<'_>,
    label: Option<Cow<'a, str>>,
) -> GraphicsPipelineDescriptor<'a> {
    let caps = desc.capabilities;
    let depth_test = caps.contains(Capabilities::DEPTH_TEST);
    let blend_state = format::blend_state(desc.blend_mode);

    GraphicsPipelineDescriptor {
        label,
        vertex_shader: desc.vertex_shader,
        fragment_shader: desc.fragment_shader,
        vertex_input: desc.vertex_input.clone(),
        primitive_type: format::primitive_topology(desc.primitive),
        rasterizer: RasterizerState {
            fill_mode: FillMode::Fill,
            cull_mode: if caps.contains(Capabilities::CULL_FACE) {
                format::cull_mode(desc.cull_mode)
            } else {
                CullMode::None
            },
            front_face: desc.front_face,
        },
        multisample: MultisampleState::default(),
        depth_stencil: DepthStencilState {
            compare_op: if depth_test {
                format::compare_function(desc.depth_func)
            } else {
                CompareFunction::Always
            },
            enable_depth_test: depth_test,
            enable_depth_write: caps.contains(Capabilities::DEPTH_WRITE),
        },
        color_targets: desc
            .outputs
            .iter()
            .map(|&format| ColorTargetDescription {
                format,
                blend_state,
            })
            .collect(),
        depth_stencil_format: desc.depth_format,
    }
}

/// A table from [`PipelineCacheKey`] to compiled pipelines.
#[derive(Debug, Default)]
pub struct PipelineCache {
    pipelines: HashMap<PipelineCacheKey, PipelineId>,
}

impl PipelineCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pipeline for a description, compiling it on the first request.
    ///
    /// ## Errors
    /// * `ResourceError::Pipeline` - If the description cannot be packed into a key.
    /// * Any error of [`GpuDevice::create_graphics_pipeline`].
    pub fn get(
        &mut self,
        device: &dyn GpuDevice,
        desc: &PipelineDescription<'_>,
    ) -> Result<PipelineId, ResourceError> {
        let key = PipelineCacheKey::derive(desc)?;

        if let Some(&pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline);
        }

        let label = format!("Pipeline {key}");
        let pipeline = device
            .create_graphics_pipeline(&pipeline_descriptor(desc, Some(Cow::Borrowed(&label))))
            .inspect_err(|e| log::error!("PipelineCache: failed to create {label}: {e}"))?;

        self.pipelines.insert(key, pipeline);
        log::debug!(
            "PipelineCache: created pipeline {key} ({} total pipelines cached)",
            self.pipelines.len()
        );

        Ok(pipeline)
    }

    /// Destroys every pipeline built from a shader program. Returns how many were removed.
    pub fn invalidate_by_shader_program(&mut self, device: &dyn GpuDevice, program: u16) -> usize {
        self.remove_matching(device, |key| key.shader_program() == program)
    }

    /// Destroys every pipeline built from a vertex layout. Returns how many were removed.
    pub fn invalidate_by_vertex_layout(&mut self, device: &dyn GpuDevice, layout: u16) -> usize {
        self.remove_matching(device, |key| key.vertex_layout() == layout)
    }

    fn remove_matching(
        &mut self,
        device: &dyn GpuDevice,
        matches: impl Fn(&PipelineCacheKey) -> bool,
    ) -> usize {
        let doomed: Vec<PipelineCacheKey> =
            self.pipelines.keys().filter(|k| matches(k)).copied().collect();

        for key in &doomed {
            if let Some(pipeline) = self.pipelines.remove(key) {
                destroy(device, key, pipeline);
            }
        }

        if !doomed.is_empty() {
            log::debug!(
                "PipelineCache: evicted {} pipelines ({} remain)",
                doomed.len(),
                self.pipelines.len()
            );
        }

        doomed.len()
    }

    /// Destroys every pipeline.
    pub fn wipe(&mut self, device: &dyn GpuDevice) {
        for (key, pipeline) in self.pipelines.drain() {
            destroy(device, &key, pipeline);
        }
    }

    /// Returns the number of cached pipelines.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

fn destroy(device: &dyn GpuDevice, key: &PipelineCacheKey, pipeline: PipelineId) {
    if let Err(e) = device.destroy_graphics_pipeline(pipeline) {
        log::warn!("PipelineCache: failed to destroy pipeline {key}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::mock::MockDevice;

    static VERTEX_INPUT: VertexInputState = VertexInputState {
        buffers: Vec::new(),
        attributes: Vec::new(),
    };

    const OUTPUTS: [TextureFormat; 1] = [TextureFormat::Rgba8Unorm];

    fn description() -> PipelineDescription<'static> {
        PipelineDescription {
            shader_program: 1,
            vertex_shader: ShaderId(10),
            fragment_shader: ShaderId(11),
            vertex_layout: 1,
            vertex_input: &VERTEX_INPUT,
            cull_mode: CullFaceMode::Back,
            depth_func: DepthTestFunc::Less,
            blend_mode: BlendMode::ALPHA,
            primitive: Primitive::Triangles,
            capabilities: Capabilities::EMPTY,
            front_face: FrontFace::CounterClockwise,
            outputs: &OUTPUTS,
            depth_format: None,
        }
    }

    fn key(desc: &PipelineDescription<'_>) -> PipelineCacheKey {
        PipelineCacheKey::derive(desc).unwrap()
    }

    #[test]
    fn test_identical_descriptions_share_a_key() {
        assert_eq!(key(&description()), key(&description()));
        assert_eq!(key(&description()).hash64(), key(&description()).hash64());
    }

    #[test]
    fn test_every_relevant_field_changes_the_key() {
        let base = description();
        let mut all_caps = base;
        all_caps.capabilities =
            Capabilities::CULL_FACE | Capabilities::DEPTH_TEST | Capabilities::DEPTH_WRITE;

        let outputs2 = [TextureFormat::Rgba8Unorm, TextureFormat::R8Unorm];
        let outputs_other = [TextureFormat::Rgba16Float];

        let variants: Vec<PipelineDescription<'_>> = vec![
            PipelineDescription {
                blend_mode: BlendMode::ADD,
                ..base
            },
            PipelineDescription {
                outputs: &outputs2,
                ..base
            },
            PipelineDescription {
                outputs: &outputs_other,
                ..base
            },
            PipelineDescription {
                outputs: &[],
                ..base
            },
            PipelineDescription {
                shader_program: 2,
                ..base
            },
            PipelineDescription {
                vertex_layout: 2,
                ..base
            },
            PipelineDescription {
                primitive: Primitive::TriangleStrip,
                ..base
            },
            PipelineDescription {
                front_face: FrontFace::Clockwise,
                ..base
            },
            PipelineDescription {
                depth_format: Some(TextureFormat::D24Unorm),
                ..base
            },
            PipelineDescription {
                capabilities: Capabilities::DEPTH_WRITE,
                ..base
            },
            all_caps,
            PipelineDescription {
                cull_mode: CullFaceMode::Front,
                ..all_caps
            },
            PipelineDescription {
                depth_func: DepthTestFunc::GEqual,
                ..all_caps
            },
        ];

        let mut keys = vec![key(&base)];
        for variant in &variants {
            let k = key(variant);
            assert!(!keys.contains(&k), "{variant:?} collides");
            keys.push(k);
        }
    }

    #[test]
    fn test_disabled_features_are_normalized() {
        let base = description();
        let culled_front = PipelineDescription {
            cull_mode: CullFaceMode::Front,
            depth_func: DepthTestFunc::Never,
            ..base
        };
        assert_eq!(key(&base), key(&culled_front));
        assert_eq!(key(&base).cull_bits(), 0);
        assert_eq!(key(&base).depth_func_bits(), DepthTestFunc::Always as u8);
    }

    #[test]
    fn test_key_fields_unpack() {
        let desc = PipelineDescription {
            shader_program: 0xBEEF,
            vertex_layout: 0x1234,
            depth_format: Some(TextureFormat::D32Float),
            capabilities: Capabilities::DEPTH_TEST | Capabilities::CULL_FACE,
            ..description()
        };
        let key = key(&desc);
        assert_eq!(key.shader_program(), 0xBEEF);
        assert_eq!(key.vertex_layout(), 0x1234);
        assert_eq!(key.blend_bits(), BlendMode::ALPHA.bits());
        assert_eq!(key.output_format_id(0), Some(TextureFormat::Rgba8Unorm.id()));
        assert_eq!(key.output_format_id(1), None);
        assert_eq!(key.depth_format_id(), Some(TextureFormat::D32Float.id()));
        assert_eq!(key.cull_bits(), CullFaceMode::Back.key_id());
        assert_eq!(key.depth_func_bits(), DepthTestFunc::Less as u8);
        assert_eq!(key.primitive_bits(), Primitive::Triangles as u8);
        assert_eq!(key.flags(), (true, false, true));
    }

    #[test]
    fn test_malformed_descriptions_are_rejected() {
        let five = [TextureFormat::Rgba8Unorm; 5];
        let desc = PipelineDescription {
            outputs: &five,
            ..description()
        };
        assert!(matches!(
            PipelineCacheKey::derive(&desc),
            Err(PipelineError::MalformedOutputs { num_outputs: 5 })
        ));

        let desc = PipelineDescription {
            depth_format: Some(TextureFormat::Rgba8Unorm),
            ..description()
        };
        assert!(matches!(
            PipelineCacheKey::derive(&desc),
            Err(PipelineError::InvalidDepthFormat(TextureFormat::Rgba8Unorm))
        ));
    }

    #[test]
    fn test_get_memoizes() {
        let device = MockDevice::new();
        let mut cache = PipelineCache::new();
        let a = cache.get(&device, &description()).unwrap();
        let b = cache.get(&device, &description()).unwrap();
        assert_eq!(a, b);
        assert_eq!(device.state().pipelines_created, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_blend_none_and_alpha_get_distinct_pipelines() {
        let device = MockDevice::new();
        let mut cache = PipelineCache::new();
        let none = PipelineDescription {
            blend_mode: BlendMode::NONE,
            ..description()
        };
        let alpha = PipelineDescription {
            blend_mode: BlendMode::ALPHA,
            ..description()
        };

        let a = cache.get(&device, &none).unwrap();
        let b = cache.get(&device, &alpha).unwrap();
        assert_ne!(a, b);

        let state = device.state();
        assert_eq!(state.pipelines_created, 2);
        assert!(!state.pipelines[&a.0].color_targets[0].blend_state.enable_blend);
        assert!(state.pipelines[&b.0].color_targets[0].blend_state.enable_blend);
    }

    #[test]
    fn test_descriptor_follows_state() {
        let desc = PipelineDescription {
            capabilities: Capabilities::CULL_FACE | Capabilities::DEPTH_TEST,
            cull_mode: CullFaceMode::Front,
            depth_func: DepthTestFunc::LEqual,
            depth_format: Some(TextureFormat::D16Unorm),
            ..description()
        };
        let pd = pipeline_descriptor(&desc, None);
        assert_eq!(pd.rasterizer.cull_mode, CullMode::Front);
        assert_eq!(pd.rasterizer.fill_mode, FillMode::Fill);
        assert_eq!(pd.depth_stencil.compare_op, CompareFunction::LessEqual);
        assert!(!pd.depth_stencil.enable_depth_write);
        assert_eq!(pd.multisample.sample_mask, 0xFFFF);
        assert_eq!(pd.depth_stencil_format, Some(TextureFormat::D16Unorm));

        let pd = pipeline_descriptor(&description(), None);
        assert_eq!(pd.rasterizer.cull_mode, CullMode::None);
        assert_eq!(pd.depth_stencil.compare_op, CompareFunction::Always);
    }

    #[test]
    fn test_invalidation_is_complete_and_selective() {
        let device = MockDevice::new();
        let mut cache = PipelineCache::new();

        let mut handles = Vec::new();
        for program in 1..=3u16 {
            for layout in 1..=2u16 {
                let desc = PipelineDescription {
                    shader_program: program,
                    vertex_layout: layout,
                    ..description()
                };
                handles.push((program, layout, cache.get(&device, &desc).unwrap()));
            }
        }
        assert_eq!(cache.len(), 6);

        assert_eq!(cache.invalidate_by_shader_program(&device, 2), 2);
        assert_eq!(cache.invalidate_by_vertex_layout(&device, 1), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(device.state().pipelines_destroyed, 4);

        for (program, layout, handle) in handles {
            let desc = PipelineDescription {
                shader_program: program,
                vertex_layout: layout,
                ..description()
            };
            let survived = program != 2 && layout != 1;
            let before = device.state().pipelines_created;
            let again = cache.get(&device, &desc).unwrap();
            if survived {
                assert_eq!(again, handle);
                assert_eq!(device.state().pipelines_created, before);
            } else {
                assert_eq!(device.state().pipelines_created, before + 1);
            }
        }
    }

    #[test]
    fn test_wipe_destroys_everything() {
        let device = MockDevice::new();
        let mut cache = PipelineCache::new();
        cache.get(&device, &description()).unwrap();
        cache
            .get(
                &device,
                &PipelineDescription {
                    primitive: Primitive::Lines,
                    ..description()
                },
            )
            .unwrap();
        cache.wipe(&device);
        assert!(cache.is_empty());
        assert!(device.state().pipelines.is_empty());
    }

    #[test]
    fn test_creation_failure_is_not_cached() {
        let device = MockDevice::new();
        let mut cache = PipelineCache::new();
        device.state().fail_pipelines = true;
        assert!(cache.get(&device, &description()).is_err());
        assert!(cache.is_empty());
        device.state().fail_pipelines = false;
        assert!(cache.get(&device, &description()).is_ok());
    }
}
