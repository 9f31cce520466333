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

//! Linked pairs of vertex and fragment shader objects.

use super::shader_object::ShaderObject;
use super::ShaderObjectHandle;
use crate::renderer::api::UniformType;
use crate::renderer::error::ShaderError;
use crate::renderer::gpu::ShaderStage;
use std::collections::HashMap;

fn stage_index(stage: ShaderStage) -> usize {
    match stage {
        ShaderStage::Vertex => 0,
        ShaderStage::Fragment => 1,
    }
}

/// A program-level uniform, resolving to a uniform of one or both stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramUniform {
    /// The uniform name.
    pub name: String,
    /// The engine-visible type.
    pub ty: UniformType,
    stages: [Option<usize>; 2],
}

impl ProgramUniform {
    /// Returns the index of the uniform inside the given stage's shader object.
    pub fn stage_uniform(&self, stage: ShaderStage) -> Option<usize> {
        self.stages[stage_index(stage)]
    }
}

/// An index into the uniforms of a [`ShaderProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformId(pub usize);

/// A vertex and a fragment stage linked into a program.
#[derive(Debug)]
pub struct ShaderProgram {
    pub(crate) id: u16,
    stages: [ShaderObjectHandle; 2],
    uniforms: Vec<ProgramUniform>,
    index: HashMap<String, usize>,
    label: String,
}

impl ShaderProgram {
    /// Links shader objects into a program identified by `id` in pipeline keys.
    ///
    /// The caller is responsible for taking a reference to each object.
    ///
    /// ## Errors
    /// * `ShaderError::MultipleObjectsPerStage` - If two objects share a stage.
    /// * `ShaderError::MissingStage` - If the vertex or fragment stage is missing.
    /// * `ShaderError::IncompatibleUniform` - If both stages declare a uniform with
    ///   different types.
    pub fn link(
        id: u16,
        objects: &[(ShaderObjectHandle, &ShaderObject)],
        label: &str,
    ) -> Result<Self, ShaderError> {
        let mut stages: [Option<(ShaderObjectHandle, &ShaderObject)>; 2] = [None, None];

        for &(handle, object) in objects {
            let target = &mut stages[stage_index(object.stage())];
            if target.is_some() {
                log::error!("{}", ShaderError::MultipleObjectsPerStage);
                return Err(ShaderError::MultipleObjectsPerStage);
            }

            log::debug!("Link stage {}: {}", object.stage().name(), object.label());
            *target = Some((handle, object));
        }

        let [Some(vertex), Some(fragment)] = stages else {
            let stage = if stages[0].is_none() {
                ShaderStage::Vertex
            } else {
                ShaderStage::Fragment
            };
            let err = ShaderError::MissingStage {
                stage: stage.name(),
            };
            log::error!("{err}");
            return Err(err);
        };

        let mut program = Self {
            id,
            stages: [vertex.0, fragment.0],
            uniforms: Vec::new(),
            index: HashMap::new(),
            label: label.to_owned(),
        };

        program.merge_uniforms(vertex.1, None)?;
        program.merge_uniforms(fragment.1, Some(vertex.1))?;

        Ok(program)
    }

    fn merge_uniforms(
        &mut self,
        object: &ShaderObject,
        other_stage: Option<&ShaderObject>,
    ) -> Result<(), ShaderError> {
        let slot = stage_index(object.stage());

        for (i, uniform) in object.interface().uniforms().iter().enumerate() {
            match self.index.get(&uniform.name) {
                Some(&existing) => {
                    let compatible = other_stage
                        .and_then(|other| {
                            let j = self.uniforms[existing].stage_uniform(other.stage())?;
                            other.interface().uniform(j)
                        })
                        .is_some_and(|other| other.compatible_with(uniform));

                    if !compatible {
                        log::error!(
                            "Uniform {} has incompatible types across stages",
                            uniform.name
                        );
                        return Err(ShaderError::IncompatibleUniform {
                            name: uniform.name.clone(),
                        });
                    }

                    self.uniforms[existing].stages[slot] = Some(i);
                }
                None => {
                    let mut stages = [None; 2];
                    stages[slot] = Some(i);
                    self.index.insert(uniform.name.clone(), self.uniforms.len());
                    self.uniforms.push(ProgramUniform {
                        name: uniform.name.clone(),
                        ty: uniform.ty,
                        stages,
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns the id used in pipeline keys.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Returns the shader object of a stage.
    pub fn stage(&self, stage: ShaderStage) -> ShaderObjectHandle {
        self.stages[stage_index(stage)]
    }

    /// Returns both stages, vertex first.
    pub fn stages(&self) -> [ShaderObjectHandle; 2] {
        self.stages
    }

    /// Looks a uniform up by name.
    pub fn uniform(&self, name: &str) -> Option<UniformId> {
        self.index.get(name).map(|&i| UniformId(i))
    }

    /// Returns the program-level description of a uniform.
    pub fn uniform_info(&self, uniform: UniformId) -> Option<&ProgramUniform> {
        self.uniforms.get(uniform.0)
    }

    /// Returns every uniform of both stages.
    pub fn uniforms(&self) -> &[ProgramUniform] {
        &self.uniforms
    }

    /// Returns the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sets the debug label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{
        ShaderBaseType, ShaderDataType, ShaderLanguage, ShaderReflection, ShaderSource,
        ShaderStructField, ShaderUniformBuffer, SpirvTarget, TextureClass, TextureParams,
        TextureType,
    };
    use crate::renderer::backend::arena::Arena;
    use crate::renderer::backend::mock::MockDevice;
    use crate::renderer::backend::shader_object::UNIFORM_BLOCK_NAME;
    use crate::renderer::backend::texture::Texture;

    struct Objects {
        arena: Arena<ShaderObject>,
        vertex: ShaderObjectHandle,
        fragment: ShaderObjectHandle,
        fragment_vec3: ShaderObjectHandle,
    }

    fn object(
        device: &MockDevice,
        textures: &mut Arena<Texture>,
        stage: ShaderStage,
        fields: &[(&str, ShaderDataType)],
    ) -> ShaderObject {
        let null = textures.insert(
            Texture::create(device, &TextureParams::new_2d(1, 1, TextureType::Rgba8), "null", 1)
                .unwrap(),
        );
        let cube = TextureParams {
            class: TextureClass::Cubemap,
            layers: 6,
            ..TextureParams::new_2d(1, 1, TextureType::Rgba8)
        };
        let null_cube = textures.insert(Texture::create(device, &cube, "null", 1).unwrap());

        let source = ShaderSource {
            stage,
            language: ShaderLanguage::Spirv {
                target: SpirvTarget::Vulkan10,
            },
            code: Vec::new(),
            reflection: Some(ShaderReflection {
                uniform_buffers: vec![ShaderUniformBuffer {
                    name: UNIFORM_BLOCK_NAME.to_string(),
                    set: stage.uniform_set(),
                    binding: 0,
                    size: 64 * fields.len() as u32,
                    fields: fields
                        .iter()
                        .enumerate()
                        .map(|(i, (name, ty))| ShaderStructField {
                            name: name.to_string(),
                            offset: 64 * i as u32,
                            ty: *ty,
                        })
                        .collect(),
                }],
                samplers: Vec::new(),
            }),
        };
        ShaderObject::compile(device, textures, &[null, null_cube], &source, stage.name()).unwrap()
    }

    fn objects() -> Objects {
        let device = MockDevice::new();
        let mut textures = Arena::new();
        let vec4 = ShaderDataType::vector(ShaderBaseType::Float, 4);
        let vec3 = ShaderDataType::vector(ShaderBaseType::Float, 3);
        let mat4 = ShaderDataType::matrix(4);

        let mut arena = Arena::new();
        let vertex = arena.insert(object(
            &device,
            &mut textures,
            ShaderStage::Vertex,
            &[("r_modelViewMatrix", mat4), ("tint", vec4)],
        ));
        let fragment = arena.insert(object(
            &device,
            &mut textures,
            ShaderStage::Fragment,
            &[("tint", vec4), ("gamma", ShaderDataType::vector(ShaderBaseType::Float, 1))],
        ));
        let fragment_vec3 = arena.insert(object(
            &device,
            &mut textures,
            ShaderStage::Fragment,
            &[("tint", vec3)],
        ));

        Objects {
            arena,
            vertex,
            fragment,
            fragment_vec3,
        }
    }

    fn pair(o: &Objects, a: ShaderObjectHandle, b: ShaderObjectHandle) -> Vec<(ShaderObjectHandle, &ShaderObject)> {
        vec![(a, o.arena.get(a).unwrap()), (b, o.arena.get(b).unwrap())]
    }

    #[test]
    fn test_link_merges_uniforms() {
        let o = objects();
        let program = ShaderProgram::link(7, &pair(&o, o.fragment, o.vertex), "prog").unwrap();

        assert_eq!(program.id(), 7);
        assert_eq!(program.stages(), [o.vertex, o.fragment]);

        let names: Vec<&str> = program.uniforms().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["r_modelViewMatrix", "tint", "gamma"]);

        let tint = program.uniform_info(program.uniform("tint").unwrap()).unwrap();
        assert_eq!(tint.stage_uniform(ShaderStage::Vertex), Some(1));
        assert_eq!(tint.stage_uniform(ShaderStage::Fragment), Some(0));

        let gamma = program.uniform_info(program.uniform("gamma").unwrap()).unwrap();
        assert_eq!(gamma.stage_uniform(ShaderStage::Vertex), None);
        assert_eq!(gamma.ty, UniformType::Float);
        assert!(program.uniform("missing").is_none());
    }

    #[test]
    fn test_link_rejects_bad_stage_sets() {
        let o = objects();
        assert!(matches!(
            ShaderProgram::link(1, &pair(&o, o.fragment, o.fragment_vec3), "prog"),
            Err(ShaderError::MultipleObjectsPerStage)
        ));

        let only_vertex = [(o.vertex, o.arena.get(o.vertex).unwrap())];
        assert!(matches!(
            ShaderProgram::link(1, &only_vertex, "prog"),
            Err(ShaderError::MissingStage { stage: "fragment" })
        ));

        let only_fragment = [(o.fragment, o.arena.get(o.fragment).unwrap())];
        assert!(matches!(
            ShaderProgram::link(1, &only_fragment, "prog"),
            Err(ShaderError::MissingStage { stage: "vertex" })
        ));
    }

    #[test]
    fn test_link_rejects_incompatible_uniforms() {
        let o = objects();
        assert!(matches!(
            ShaderProgram::link(1, &pair(&o, o.vertex, o.fragment_vec3), "prog"),
            Err(ShaderError::IncompatibleUniform { name }) if name == "tint"
        ));
    }
}
