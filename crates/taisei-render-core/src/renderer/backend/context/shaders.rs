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

//! Shader objects, shader programs and uniforms of the rendering context.

use super::RenderContext;
use crate::renderer::api::{ShaderSource, UniformType};
use crate::renderer::backend::shader_object::ShaderObject;
use crate::renderer::backend::shader_program::{ShaderProgram, UniformId};
use crate::renderer::backend::texture;
use crate::renderer::backend::{ShaderObjectHandle, ShaderProgramHandle, TextureHandle};
use crate::renderer::error::{RenderError, ResourceError, ShaderError};
use crate::renderer::gpu::ShaderStage;
use std::sync::Arc;

impl RenderContext {
    /// Compiles one shader stage.
    ///
    /// ## Errors
    /// * `ShaderError::UnsupportedLanguage` - If the source is not SPIR-V.
    /// * `ShaderError::CompilationError` - If the source has no reflection data or
    ///   the device rejects it.
    /// * `ShaderError::DuplicateUniform` - If the reflection declares a name twice.
    pub fn shader_object_compile(
        &mut self,
        source: &ShaderSource,
        label: &str,
    ) -> Result<ShaderObjectHandle, RenderError> {
        let object = ShaderObject::compile(
            &*self.device,
            &mut self.textures,
            &self.null_textures,
            source,
            label,
        )?;

        log::debug!(
            "RenderContext: compiled {} shader '{label}' with {} uniforms",
            object.stage().name(),
            object.interface().uniforms().len()
        );

        Ok(self.shader_objects.insert(object))
    }

    /// Returns the stage of a shader object.
    pub fn shader_object_stage(&self, handle: ShaderObjectHandle) -> Option<ShaderStage> {
        self.shader_objects.get(handle).map(ShaderObject::stage)
    }

    /// Returns the debug label.
    pub fn shader_object_label(&self, handle: ShaderObjectHandle) -> Option<&str> {
        self.shader_objects.get(handle).map(ShaderObject::label)
    }

    /// Sets the debug label.
    pub fn shader_object_set_label(&mut self, handle: ShaderObjectHandle, label: &str) {
        if let Some(object) = self.shader_objects.get_mut(handle) {
            object.set_label(label);
        }
    }

    /// Drops the caller's reference to a shader object.
    ///
    /// Programs linked from it keep it alive.
    pub fn shader_object_destroy(&mut self, handle: ShaderObjectHandle) {
        if let Some(object) = self.shader_objects.release(handle) {
            object.destroy(&*self.device, &mut self.textures);
        }
    }

    /// Links a vertex and a fragment shader object into a program.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If a handle is stale.
    /// * `ResourceError::Exhausted` - If every program id is in use.
    /// * `ShaderError` - See [`ShaderProgram::link`].
    pub fn shader_program_link(
        &mut self,
        objects: &[ShaderObjectHandle],
        label: &str,
    ) -> Result<ShaderProgramHandle, RenderError> {
        let resolved = objects
            .iter()
            .map(|&h| self.shader_objects.get(h).map(|object| (h, object)))
            .collect::<Option<Vec<_>>>()
            .ok_or(ResourceError::InvalidHandle)?;

        let id = self
            .program_ids
            .alloc()
            .ok_or(ResourceError::Exhausted {
                what: "shader program",
            })?;

        let program = match ShaderProgram::link(id, &resolved, label) {
            Ok(program) => program,
            Err(e) => {
                self.program_ids.release(id);
                return Err(e.into());
            }
        };

        for stage in program.stages() {
            self.shader_objects.retain(stage);
        }

        log::debug!(
            "RenderContext: linked program '{label}' (id {id}, {} uniforms)",
            program.uniforms().len()
        );

        Ok(self.programs.insert(program))
    }

    /// Returns the debug label.
    pub fn shader_program_label(&self, handle: ShaderProgramHandle) -> Option<&str> {
        self.programs.get(handle).map(ShaderProgram::label)
    }

    /// Sets the debug label.
    pub fn shader_program_set_label(&mut self, handle: ShaderProgramHandle, label: &str) {
        if let Some(program) = self.programs.get_mut(handle) {
            program.set_label(label);
        }
    }

    /// Destroys a program.
    ///
    /// Its pipelines are evicted before its id is recycled. Both stages lose the
    /// reference the program held on them.
    pub fn shader_program_destroy(&mut self, handle: ShaderProgramHandle) {
        let Some(program) = self.programs.release(handle) else {
            return;
        };

        let device = Arc::clone(&self.device);
        let evicted = self
            .pipelines
            .invalidate_by_shader_program(&*device, program.id);
        self.program_ids.release(program.id);

        log::debug!(
            "RenderContext: destroyed program '{}', evicting {evicted} pipelines",
            program.label()
        );

        for stage in program.stages() {
            if let Some(object) = self.shader_objects.release(stage) {
                object.destroy(&*device, &mut self.textures);
            }
        }

        if self.state.program == Some(handle) {
            self.state.program = None;
        }
    }

    /// Looks a uniform of a program up by name.
    pub fn uniform(&self, program: ShaderProgramHandle, name: &str) -> Option<UniformId> {
        self.programs.get(program)?.uniform(name)
    }

    /// Returns the type of a uniform.
    pub fn uniform_type(&self, program: ShaderProgramHandle, uniform: UniformId) -> Option<UniformType> {
        self.programs
            .get(program)?
            .uniform_info(uniform)
            .map(|u| u.ty)
    }

    /// Writes `count` tightly packed values into a uniform, starting at array element
    /// `offset`. The value is written to every stage declaring the uniform.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the program or uniform does not exist,
    ///   or the uniform is a sampler.
    /// * `ResourceError::OutOfBounds` - If `data` is too short or `offset` too large.
    pub fn uniform_set_data(
        &mut self,
        program: ShaderProgramHandle,
        uniform: UniformId,
        offset: usize,
        count: usize,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let program = self
            .programs
            .get(program)
            .ok_or(ResourceError::InvalidHandle)?;
        let info = program
            .uniform_info(uniform)
            .ok_or(ResourceError::InvalidHandle)?;

        for stage in ShaderStage::ALL {
            let Some(index) = info.stage_uniform(stage) else {
                continue;
            };
            self.shader_objects
                .get_mut(program.stage(stage))
                .ok_or(ResourceError::InvalidHandle)?
                .set_uniform_data(index, offset, count, data)?;
        }

        Ok(())
    }

    /// Points a sampler uniform at a texture in every stage declaring it.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If a handle is stale or the uniform is not
    ///   a sampler.
    /// * `ShaderError::IncompatibleUniform` - If the texture class does not match the
    ///   sampler type.
    pub fn uniform_set_texture(
        &mut self,
        program: ShaderProgramHandle,
        uniform: UniformId,
        texture: TextureHandle,
    ) -> Result<(), RenderError> {
        let program = self
            .programs
            .get(program)
            .ok_or(ResourceError::InvalidHandle)?;
        let info = program
            .uniform_info(uniform)
            .ok_or(ResourceError::InvalidHandle)?;

        let class = self
            .textures
            .get(texture)
            .ok_or(ResourceError::InvalidHandle)?
            .params
            .class;
        if !texture::sampler_compatible(class, info.ty) {
            log::error!(
                "RenderContext: {class:?} texture bound to {} uniform {}",
                info.ty.name(),
                info.name
            );
            return Err(ShaderError::IncompatibleUniform {
                name: info.name.clone(),
            }
            .into());
        }

        for stage in ShaderStage::ALL {
            let Some(index) = info.stage_uniform(stage) else {
                continue;
            };
            self.shader_objects
                .get_mut(program.stage(stage))
                .ok_or(ResourceError::InvalidHandle)?
                .set_sampler(&*self.device, &mut self.textures, index, texture)?;
        }

        Ok(())
    }
}
