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

//! The render state read by draws and the setters mutating it.

use super::RenderContext;
use crate::math::{Color, IntRect};
use crate::renderer::api::{
    BlendMode, Capabilities, CullFaceMode, DepthTestFunc, Mat4, MatrixMode, MAT4_IDENTITY,
};
use crate::renderer::backend::{FramebufferHandle, ShaderProgramHandle};
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::gpu::FrontFace;

/// Everything a draw reads besides its vertex array and primitive.
#[derive(Debug, Clone)]
pub struct RenderState {
    /// The program draws use.
    pub program: Option<ShaderProgramHandle>,
    /// The framebuffer draws render into; `None` is the swapchain.
    pub framebuffer: Option<FramebufferHandle>,
    /// The enabled fixed-function features.
    pub capabilities: Capabilities,
    /// The value of `r_color`.
    pub color: Color,
    /// The blend mode of every color output.
    pub blend_mode: BlendMode,
    /// The faces culled when [`Capabilities::CULL_FACE`] is enabled.
    pub cull_mode: CullFaceMode,
    /// The depth test when [`Capabilities::DEPTH_TEST`] is enabled.
    pub depth_func: DepthTestFunc,
    /// The scissor rectangle; `None` covers the whole target.
    pub scissor: Option<IntRect>,
    /// The winding of front faces.
    pub front_face: FrontFace,
    /// The matrices fed to the matrix uniforms, indexed by [`MatrixMode::index`].
    pub matrices: [Mat4; 3],
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            program: None,
            framebuffer: None,
            capabilities: Capabilities::DEPTH_WRITE,
            color: Color::WHITE,
            blend_mode: BlendMode::PREMUL_ALPHA,
            cull_mode: CullFaceMode::Back,
            depth_func: DepthTestFunc::Less,
            scissor: None,
            front_face: FrontFace::CounterClockwise,
            matrices: [MAT4_IDENTITY; 3],
        }
    }
}

impl RenderContext {
    /// Returns the render state.
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Returns the enabled capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.state.capabilities
    }

    /// Replaces the enabled capabilities.
    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.state.capabilities = capabilities;
    }

    /// Enables or disables some capabilities, leaving the others alone.
    pub fn capability(&mut self, capability: Capabilities, enabled: bool) {
        self.state.capabilities.set(capability, enabled);
    }

    /// Returns the value of `r_color`.
    pub fn color(&self) -> Color {
        self.state.color
    }

    /// Sets the value of `r_color`.
    pub fn set_color(&mut self, color: Color) {
        self.state.color = color;
    }

    /// Returns the blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        self.state.blend_mode
    }

    /// Sets the blend mode.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend_mode = mode;
    }

    /// Returns the cull mode.
    pub fn cull_mode(&self) -> CullFaceMode {
        self.state.cull_mode
    }

    /// Sets the cull mode.
    pub fn set_cull_mode(&mut self, mode: CullFaceMode) {
        self.state.cull_mode = mode;
    }

    /// Returns the depth function.
    pub fn depth_func(&self) -> DepthTestFunc {
        self.state.depth_func
    }

    /// Sets the depth function.
    pub fn set_depth_func(&mut self, func: DepthTestFunc) {
        self.state.depth_func = func;
    }

    /// Returns the front face winding.
    pub fn front_face(&self) -> FrontFace {
        self.state.front_face
    }

    /// Sets the front face winding.
    pub fn set_front_face(&mut self, front_face: FrontFace) {
        self.state.front_face = front_face;
    }

    /// Returns the scissor rectangle.
    pub fn scissor(&self) -> Option<IntRect> {
        self.state.scissor
    }

    /// Sets the scissor rectangle. It is clamped to the target at draw time.
    pub fn set_scissor(&mut self, scissor: Option<IntRect>) {
        self.state.scissor = scissor;
    }

    /// Returns one of the uniform matrices.
    pub fn matrix(&self, mode: MatrixMode) -> &Mat4 {
        &self.state.matrices[mode.index()]
    }

    /// Sets one of the uniform matrices.
    pub fn set_matrix(&mut self, mode: MatrixMode, matrix: Mat4) {
        self.state.matrices[mode.index()] = matrix;
    }

    /// Returns the program draws use.
    pub fn program(&self) -> Option<ShaderProgramHandle> {
        self.state.program
    }

    /// Selects the program draws use.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the handle is stale.
    pub fn set_program(&mut self, program: Option<ShaderProgramHandle>) -> Result<(), RenderError> {
        if program.is_some_and(|p| !self.programs.contains(p)) {
            return Err(ResourceError::InvalidHandle.into());
        }

        self.state.program = program;
        Ok(())
    }

    /// Returns the framebuffer draws render into.
    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.state.framebuffer
    }

    /// Selects the framebuffer draws render into; `None` is the swapchain.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the handle is stale.
    pub fn set_framebuffer(
        &mut self,
        framebuffer: Option<FramebufferHandle>,
    ) -> Result<(), RenderError> {
        if framebuffer.is_some_and(|fb| !self.framebuffers.contains(fb)) {
            return Err(ResourceError::InvalidHandle.into());
        }

        self.state.framebuffer = framebuffer;
        Ok(())
    }
}
