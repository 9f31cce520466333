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

//! Compiled shader stages and the uniforms they expose.
//!
//! Every stage reads its plain uniforms from one uniform block named
//! [`UNIFORM_BLOCK_NAME`], in descriptor set 1 (vertex) or 3 (fragment), and its
//! textures from combined image samplers in set 0 or 2. The CPU keeps a copy of the
//! block which is pushed to the device before every draw. Sampler slots always hold a
//! texture; slots no uniform has been pointed at hold the null texture of their class.

use super::arena::Arena;
use super::format;
use super::texture::Texture;
use super::TextureHandle;
use crate::renderer::api::{
    MagicUniform, ShaderDataType, ShaderLanguage, ShaderReflection, ShaderSource, SpirvTarget,
    TextureClass, UniformType,
};
use crate::renderer::error::{ResourceError, ShaderError};
use crate::renderer::gpu::{ShaderDescriptor, ShaderFormat, ShaderId, ShaderStage};
use crate::renderer::GpuDevice;
use std::borrow::Cow;
use std::collections::HashMap;

/// The name of the uniform block holding a stage's non-sampler uniforms.
pub const UNIFORM_BLOCK_NAME: &str = "gl_DefaultUniformBlock";

/// Returns `Ok` if shaders written in `language` can be compiled, or the language
/// they should be translated to otherwise.
pub fn shader_language_supported(language: &ShaderLanguage) -> Result<(), ShaderLanguage> {
    match language {
        ShaderLanguage::Spirv { .. } => Ok(()),
        _ => Err(ShaderLanguage::Spirv {
            target: SpirvTarget::Vulkan10,
        }),
    }
}

/// Where the value of a uniform lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformStorage {
    /// A field of the stage's uniform block.
    Buffer {
        /// Byte offset of the field in the block.
        offset: u32,
        /// The layout of the field.
        layout: ShaderDataType,
    },
    /// A sampler binding slot.
    Sampler {
        /// The binding slot in the stage's sampler set.
        binding: u32,
    },
}

/// A uniform of one shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderObjectUniform {
    /// The uniform name.
    pub name: String,
    /// The engine-visible type.
    pub ty: UniformType,
    /// Where the value lives.
    pub storage: UniformStorage,
}

impl ShaderObjectUniform {
    /// Returns `true` if one value can be written to both uniforms.
    ///
    /// Samplers only need to agree on their type; buffer-backed uniforms also need the
    /// same memory layout.
    pub fn compatible_with(&self, other: &ShaderObjectUniform) -> bool {
        if self.ty != other.ty {
            return false;
        }

        match (self.storage, other.storage) {
            (UniformStorage::Sampler { .. }, UniformStorage::Sampler { .. }) => true,
            (
                UniformStorage::Buffer { layout: a, .. },
                UniformStorage::Buffer { layout: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

/// The reflected uniform interface of one stage.
#[derive(Debug, Clone, Default)]
pub struct ShaderInterface {
    uniforms: Vec<ShaderObjectUniform>,
    index: HashMap<String, usize>,
    uniform_block_size: u32,
    sampler_classes: Vec<TextureClass>,
    magic: [Option<usize>; MagicUniform::ALL.len()],
}

impl ShaderInterface {
    /// Builds the interface of a `stage` from its reflection data.
    ///
    /// Unsupported uniforms and samplers are skipped with a warning.
    ///
    /// ## Errors
    /// * `ShaderError::DuplicateUniform` - If two uniforms share a name.
    pub fn reflect(stage: ShaderStage, reflection: &ShaderReflection) -> Result<Self, ShaderError> {
        let mut interface = Self::default();
        let target_set = stage.uniform_set();

        for ubo in &reflection.uniform_buffers {
            if ubo.set != target_set {
                log::debug!(
                    "Uniform block {} (set={}, binding={}) ignored (wrong descriptor set, need {target_set})",
                    ubo.name,
                    ubo.set,
                    ubo.binding
                );
                continue;
            }

            if ubo.name != UNIFORM_BLOCK_NAME {
                log::debug!(
                    "Uniform block {} (set={}, binding={}) ignored (wrong name, need {UNIFORM_BLOCK_NAME})",
                    ubo.name,
                    ubo.set,
                    ubo.binding
                );
                continue;
            }

            log::debug!(
                "Found {UNIFORM_BLOCK_NAME} (set={}, binding={}), {} bytes",
                ubo.set,
                ubo.binding,
                ubo.size
            );
            interface.uniform_block_size = ubo.size;

            for field in &ubo.fields {
                let Some(ty) = field.ty.to_uniform_type() else {
                    log::warn!("Uniform {} has an unsupported type, ignoring", field.name);
                    continue;
                };

                interface.add(ShaderObjectUniform {
                    name: field.name.clone(),
                    ty,
                    storage: UniformStorage::Buffer {
                        offset: field.offset,
                        layout: field.ty,
                    },
                })?;
            }
        }

        for sampler in &reflection.samplers {
            let Some(ty) = sampler.ty.to_uniform_type() else {
                log::warn!("Sampler {} has an unsupported type, ignoring", sampler.name);
                continue;
            };

            if sampler.array_size > 0 {
                log::warn!(
                    "Sampler {} is an array; this is not supported, ignoring",
                    sampler.name
                );
                continue;
            }

            let class = match ty {
                UniformType::SamplerCube => TextureClass::Cubemap,
                _ => TextureClass::D2,
            };

            let slot = sampler.binding as usize;
            if interface.sampler_classes.len() <= slot {
                interface.sampler_classes.resize(slot + 1, class);
            }
            interface.sampler_classes[slot] = class;

            interface.add(ShaderObjectUniform {
                name: sampler.name.clone(),
                ty,
                storage: UniformStorage::Sampler {
                    binding: sampler.binding,
                },
            })?;
        }

        Ok(interface)
    }

    fn add(&mut self, uniform: ShaderObjectUniform) -> Result<(), ShaderError> {
        if self.index.contains_key(&uniform.name) {
            log::error!("Uniform {} is declared more than once", uniform.name);
            return Err(ShaderError::DuplicateUniform { name: uniform.name });
        }

        let idx = self.uniforms.len();

        if let Some(magic) = MagicUniform::from_name(&uniform.name) {
            if uniform.ty == magic.ty() {
                log::debug!("Found magic uniform #{} {}", magic.index(), uniform.name);
                self.magic[magic.index()] = Some(idx);
            } else {
                log::warn!(
                    "Magic uniform {} has wrong type; expected {}",
                    uniform.name,
                    magic.ty().name()
                );
            }
        }

        log::debug!("Added {}", uniform.name);
        self.index.insert(uniform.name.clone(), idx);
        self.uniforms.push(uniform);
        Ok(())
    }

    /// Returns every uniform in declaration order.
    pub fn uniforms(&self) -> &[ShaderObjectUniform] {
        &self.uniforms
    }

    /// Looks a uniform up by name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the uniform at `index`.
    pub fn uniform(&self, index: usize) -> Option<&ShaderObjectUniform> {
        self.uniforms.get(index)
    }

    /// Returns the index of a magic uniform the stage declares with the right type.
    pub fn magic(&self, magic: MagicUniform) -> Option<usize> {
        self.magic[magic.index()]
    }

    /// Returns the size of the uniform block; 0 if the stage has none.
    pub fn uniform_block_size(&self) -> u32 {
        self.uniform_block_size
    }

    /// Returns the texture class of every sampler slot.
    pub fn sampler_classes(&self) -> &[TextureClass] {
        &self.sampler_classes
    }
}

/// A compiled shader stage with its uniform values and sampler bindings.
#[derive(Debug)]
pub struct ShaderObject {
    pub(crate) gpu_shader: ShaderId,
    stage: ShaderStage,
    interface: ShaderInterface,
    uniform_data: Vec<u8>,
    sampler_bindings: Vec<TextureHandle>,
    label: String,
}

impl ShaderObject {
    /// Compiles a stage and binds the null texture of its class to every sampler slot.
    ///
    /// ## Arguments
    /// * `null_textures` - The null textures, indexed by [`TextureClass::index`]. Each
    ///   slot takes a reference.
    ///
    /// ## Errors
    /// * `ShaderError::UnsupportedLanguage` - If the source is not SPIR-V.
    /// * `ShaderError::DuplicateUniform` - If the reflection declares a name twice.
    /// * Any error of [`GpuDevice::create_shader`].
    pub fn compile(
        device: &dyn GpuDevice,
        textures: &mut Arena<Texture>,
        null_textures: &[TextureHandle; 2],
        source: &ShaderSource,
        label: &str,
    ) -> Result<Self, ResourceError> {
        if shader_language_supported(&source.language).is_err() {
            log::error!("Shading language not supported: {}", source.language);
            return Err(ShaderError::UnsupportedLanguage {
                language: source.language.to_string(),
            }
            .into());
        }

        let Some(reflection) = &source.reflection else {
            log::error!("Shader reflection failed for '{label}'");
            return Err(ShaderError::CompilationError {
                label: label.to_owned(),
                details: "no reflection data".to_string(),
            }
            .into());
        };

        let interface = ShaderInterface::reflect(source.stage, reflection)?;

        let gpu_shader = device.create_shader(&ShaderDescriptor {
            label: Some(Cow::Borrowed(label)),
            stage: source.stage,
            format: ShaderFormat::SpirV,
            code: Cow::Borrowed(&source.code),
            entry_point: Cow::Borrowed("main"),
            sampler_kinds: interface
                .sampler_classes()
                .iter()
                .map(|&class| format::texture_kind(class))
                .collect(),
            num_uniform_buffers: u32::from(interface.uniform_block_size() > 0),
        })?;

        let sampler_bindings = interface
            .sampler_classes()
            .iter()
            .map(|class| {
                let null = null_textures[class.index()];
                textures.retain(null);
                null
            })
            .collect();

        Ok(Self {
            gpu_shader,
            stage: source.stage,
            uniform_data: vec![0; interface.uniform_block_size() as usize],
            interface,
            sampler_bindings,
            label: label.to_owned(),
        })
    }

    /// Returns the stage.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Returns the reflected interface.
    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }

    /// Returns the CPU copy of the uniform block.
    pub fn uniform_data(&self) -> &[u8] {
        &self.uniform_data
    }

    /// Returns the texture bound to every sampler slot.
    pub fn sampler_bindings(&self) -> &[TextureHandle] {
        &self.sampler_bindings
    }

    /// Returns the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sets the debug label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Writes `count` tightly packed values into a buffer-backed uniform, starting at
    /// array element `offset`.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the uniform does not exist or is a sampler.
    /// * `ResourceError::OutOfBounds` - If `data` is too short or `offset` is past the
    ///   end of the field.
    pub fn set_uniform_data(
        &mut self,
        uniform: usize,
        offset: usize,
        count: usize,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let entry = self
            .interface
            .uniform(uniform)
            .ok_or(ResourceError::InvalidHandle)?;
        let UniformStorage::Buffer {
            offset: field_offset,
            layout,
        } = entry.storage
        else {
            return Err(ResourceError::InvalidHandle);
        };

        let info = entry.ty.info();
        let src_size = (info.elements * info.element_size) as usize * count;
        let src = data.get(..src_size).ok_or(ResourceError::OutOfBounds)?;

        let in_field_offset = if layout.is_array() {
            layout.array_stride as usize * offset
        } else if offset == 0 {
            0
        } else {
            return Err(ResourceError::OutOfBounds);
        };

        let field_size = layout
            .size()
            .checked_sub(in_field_offset)
            .ok_or(ResourceError::OutOfBounds)?;
        let start = field_offset as usize + in_field_offset;
        let dst = self
            .uniform_data
            .get_mut(start..start + field_size)
            .ok_or(ResourceError::OutOfBounds)?;

        let copied = layout.unpack_from_bytes(src, dst);
        if copied < count {
            log::warn!(
                "ShaderObject: '{}' uniform {} truncated to {copied} of {count} values",
                self.label,
                entry.name
            );
        }

        Ok(())
    }

    /// Points a sampler uniform at `texture`, moving the slot's reference to it.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the uniform is not a sampler or the texture
    ///   handle is stale.
    pub fn set_sampler(
        &mut self,
        device: &dyn GpuDevice,
        textures: &mut Arena<Texture>,
        uniform: usize,
        texture: TextureHandle,
    ) -> Result<(), ResourceError> {
        let Some(UniformStorage::Sampler { binding }) =
            self.interface.uniform(uniform).map(|u| u.storage)
        else {
            return Err(ResourceError::InvalidHandle);
        };

        let slot = self
            .sampler_bindings
            .get_mut(binding as usize)
            .ok_or(ResourceError::InvalidHandle)?;

        if *slot == texture {
            return Ok(());
        }

        if !textures.retain(texture) {
            return Err(ResourceError::InvalidHandle);
        }

        let previous = std::mem::replace(slot, texture);
        if let Some(texture) = textures.release(previous) {
            texture.destroy(device);
        }

        Ok(())
    }

    /// Releases the sampler bindings and the device shader.
    pub fn destroy(self, device: &dyn GpuDevice, textures: &mut Arena<Texture>) {
        for binding in self.sampler_bindings {
            if let Some(texture) = textures.release(binding) {
                texture.destroy(device);
            }
        }

        if let Err(e) = device.destroy_shader(self.gpu_shader) {
            log::warn!("ShaderObject: failed to destroy '{}': {e}", self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{
        ShaderBaseType, ShaderSampler, ShaderSamplerType, ShaderStructField, ShaderUniformBuffer,
        SamplerDim, TextureParams, TextureType,
    };
    use crate::renderer::backend::mock::MockDevice;

    fn field(name: &str, offset: u32, ty: ShaderDataType) -> ShaderStructField {
        ShaderStructField {
            name: name.to_string(),
            offset,
            ty,
        }
    }

    fn block(set: u32, name: &str, size: u32, fields: Vec<ShaderStructField>) -> ShaderUniformBuffer {
        ShaderUniformBuffer {
            name: name.to_string(),
            set,
            binding: 0,
            size,
            fields,
        }
    }

    fn sampler(name: &str, binding: u32, dim: SamplerDim) -> ShaderSampler {
        ShaderSampler {
            name: name.to_string(),
            set: 2,
            binding,
            array_size: 0,
            ty: ShaderSamplerType::plain(dim),
        }
    }

    fn fragment_reflection() -> ShaderReflection {
        ShaderReflection {
            uniform_buffers: vec![
                block(
                    3,
                    UNIFORM_BLOCK_NAME,
                    96,
                    vec![
                        field("r_color", 0, ShaderDataType::vector(ShaderBaseType::Float, 4)),
                        field(
                            "offsets",
                            16,
                            ShaderDataType::vector(ShaderBaseType::Float, 3).array(4, 16),
                        ),
                        field("flag", 80, ShaderDataType::vector(ShaderBaseType::Bool, 1)),
                    ],
                ),
                block(1, UNIFORM_BLOCK_NAME, 64, vec![field("ignored", 0, ShaderDataType::matrix(4))]),
                block(3, "Lights", 16, vec![field("light", 0, ShaderDataType::vector(ShaderBaseType::Float, 4))]),
            ],
            samplers: vec![
                sampler("tex", 0, SamplerDim::D2),
                sampler("sky", 2, SamplerDim::Cube),
                ShaderSampler {
                    array_size: 4,
                    ..sampler("tiles", 3, SamplerDim::D2)
                },
                sampler("volume", 4, SamplerDim::D3),
            ],
        }
    }

    #[test]
    fn test_language_support() {
        let spirv = ShaderLanguage::Spirv {
            target: SpirvTarget::Vulkan11,
        };
        assert!(shader_language_supported(&spirv).is_ok());
        assert_eq!(
            shader_language_supported(&ShaderLanguage::Glsl {
                version: 330,
                es: false
            }),
            Err(ShaderLanguage::Spirv {
                target: SpirvTarget::Vulkan10
            })
        );
    }

    #[test]
    fn test_reflect_keeps_only_supported_uniforms() {
        let interface =
            ShaderInterface::reflect(ShaderStage::Fragment, &fragment_reflection()).unwrap();

        let names: Vec<&str> = interface.uniforms().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["r_color", "offsets", "tex", "sky"]);
        assert_eq!(interface.uniform_block_size(), 96);
        assert_eq!(
            interface.sampler_classes(),
            [TextureClass::D2, TextureClass::Cubemap, TextureClass::Cubemap]
        );
        assert_eq!(interface.magic(MagicUniform::Color), interface.find("r_color"));
        assert_eq!(interface.magic(MagicUniform::Viewport), None);
    }

    #[test]
    fn test_vertex_stage_reads_set_one() {
        let interface =
            ShaderInterface::reflect(ShaderStage::Vertex, &fragment_reflection()).unwrap();
        assert_eq!(interface.uniform_block_size(), 64);
        assert!(interface.find("ignored").is_some());
        assert!(interface.find("r_color").is_none());
    }

    #[test]
    fn test_magic_uniform_with_wrong_type_is_not_magic() {
        let reflection = ShaderReflection {
            uniform_buffers: vec![block(
                3,
                UNIFORM_BLOCK_NAME,
                16,
                vec![field("r_color", 0, ShaderDataType::vector(ShaderBaseType::Float, 3))],
            )],
            samplers: Vec::new(),
        };
        let interface = ShaderInterface::reflect(ShaderStage::Fragment, &reflection).unwrap();
        assert!(interface.find("r_color").is_some());
        assert_eq!(interface.magic(MagicUniform::Color), None);
    }

    #[test]
    fn test_duplicate_uniform_is_rejected() {
        let reflection = ShaderReflection {
            uniform_buffers: vec![block(
                3,
                UNIFORM_BLOCK_NAME,
                16,
                vec![field("tex", 0, ShaderDataType::vector(ShaderBaseType::Float, 1))],
            )],
            samplers: vec![sampler("tex", 0, SamplerDim::D2)],
        };
        assert!(matches!(
            ShaderInterface::reflect(ShaderStage::Fragment, &reflection),
            Err(ShaderError::DuplicateUniform { name }) if name == "tex"
        ));
    }

    #[test]
    fn test_uniform_compatibility() {
        let a = ShaderObjectUniform {
            name: "v".to_string(),
            ty: UniformType::Vec3,
            storage: UniformStorage::Buffer {
                offset: 0,
                layout: ShaderDataType::vector(ShaderBaseType::Float, 3),
            },
        };
        let moved = ShaderObjectUniform {
            storage: UniformStorage::Buffer {
                offset: 32,
                layout: ShaderDataType::vector(ShaderBaseType::Float, 3),
            },
            ..a.clone()
        };
        let array = ShaderObjectUniform {
            storage: UniformStorage::Buffer {
                offset: 0,
                layout: ShaderDataType::vector(ShaderBaseType::Float, 3).array(2, 16),
            },
            ..a.clone()
        };
        assert!(a.compatible_with(&moved));
        assert!(!a.compatible_with(&array));
    }

    struct Fixture {
        device: MockDevice,
        textures: Arena<Texture>,
        nulls: [TextureHandle; 2],
    }

    fn fixture() -> Fixture {
        let device = MockDevice::new();
        let mut textures = Arena::new();
        let mut null = |class| {
            let params = TextureParams {
                class,
                layers: if class == TextureClass::Cubemap { 6 } else { 1 },
                ..TextureParams::new_2d(1, 1, TextureType::Rgba8)
            };
            textures.insert(Texture::create(&device, &params, "null", 1).unwrap())
        };
        let nulls = [null(TextureClass::D2), null(TextureClass::Cubemap)];
        Fixture {
            device,
            textures,
            nulls,
        }
    }

    fn fragment_source() -> ShaderSource {
        ShaderSource {
            stage: ShaderStage::Fragment,
            language: ShaderLanguage::Spirv {
                target: SpirvTarget::Vulkan10,
            },
            code: vec![0x03, 0x02, 0x23, 0x07],
            reflection: Some(fragment_reflection()),
        }
    }

    #[test]
    fn test_compile_binds_null_textures() {
        let mut f = fixture();
        let shader = ShaderObject::compile(
            &f.device,
            &mut f.textures,
            &f.nulls,
            &fragment_source(),
            "frag",
        )
        .unwrap();

        assert_eq!(
            shader.sampler_bindings(),
            [f.nulls[0], f.nulls[1], f.nulls[1]]
        );
        assert_eq!(f.textures.refs(f.nulls[0]), Some(2));
        assert_eq!(f.textures.refs(f.nulls[1]), Some(3));
        assert_eq!(shader.uniform_data().len(), 96);
        assert_eq!(
            f.device.state().shaders.get(&shader.gpu_shader.0),
            Some(&ShaderStage::Fragment)
        );

        shader.destroy(&f.device, &mut f.textures);
        assert_eq!(f.textures.refs(f.nulls[0]), Some(1));
        assert_eq!(f.textures.refs(f.nulls[1]), Some(1));
        assert!(f.device.state().shaders.is_empty());
    }

    #[test]
    fn test_compile_rejects_other_languages() {
        let mut f = fixture();
        let source = ShaderSource {
            language: ShaderLanguage::Glsl {
                version: 330,
                es: false,
            },
            ..fragment_source()
        };
        assert!(matches!(
            ShaderObject::compile(&f.device, &mut f.textures, &f.nulls, &source, "frag"),
            Err(ResourceError::Shader(ShaderError::UnsupportedLanguage { .. }))
        ));
        assert!(f.device.state().shaders.is_empty());
    }

    #[test]
    fn test_set_uniform_data_honours_array_stride() {
        let mut f = fixture();
        let mut shader = ShaderObject::compile(
            &f.device,
            &mut f.textures,
            &f.nulls,
            &fragment_source(),
            "frag",
        )
        .unwrap();
        let offsets = shader.interface().find("offsets").unwrap();

        let values: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        shader.set_uniform_data(offsets, 1, 2, &values).unwrap();

        let data = shader.uniform_data();
        assert_eq!(&data[16..32], &[0; 16]);
        assert_eq!(&data[32..44], &values[0..12]);
        assert_eq!(&data[48..60], &values[12..24]);

        assert!(matches!(
            shader.set_uniform_data(offsets, 5, 1, &values),
            Err(ResourceError::OutOfBounds)
        ));
        assert!(matches!(
            shader.set_uniform_data(offsets, 0, 3, &values),
            Err(ResourceError::OutOfBounds)
        ));

        let tex = shader.interface().find("tex").unwrap();
        assert!(matches!(
            shader.set_uniform_data(tex, 0, 1, &values),
            Err(ResourceError::InvalidHandle)
        ));
    }

    #[test]
    fn test_set_sampler_moves_references() {
        let mut f = fixture();
        let mut shader = ShaderObject::compile(
            &f.device,
            &mut f.textures,
            &f.nulls,
            &fragment_source(),
            "frag",
        )
        .unwrap();
        let user = f.textures.insert(
            Texture::create(
                &f.device,
                &TextureParams::new_2d(4, 4, TextureType::Rgba8),
                "user",
                1,
            )
            .unwrap(),
        );
        let tex = shader.interface().find("tex").unwrap();

        shader
            .set_sampler(&f.device, &mut f.textures, tex, user)
            .unwrap();
        assert_eq!(shader.sampler_bindings()[0], user);
        assert_eq!(f.textures.refs(user), Some(2));
        assert_eq!(f.textures.refs(f.nulls[0]), Some(1));

        let gpu = f.textures.get(user).unwrap().gpu_texture();
        assert!(f.textures.release(user).is_none());
        assert!(f.device.state().textures.contains_key(&gpu.0));

        shader.destroy(&f.device, &mut f.textures);
        assert!(!f.textures.contains(user));
        assert!(!f.device.state().textures.contains_key(&gpu.0));
    }
}
