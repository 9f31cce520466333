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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::gpu::{ShaderId, TextureFormat};
use std::fmt;

/// An error related to compiling shader objects or linking shader programs.
#[derive(Debug)]
pub enum ShaderError {
    /// The shading language cannot be consumed by the backend.
    UnsupportedLanguage {
        /// A printable description of the rejected language.
        language: String,
    },
    /// The device rejected the shader bytecode.
    CompilationError {
        /// A descriptive label for the shader, if available.
        label: String,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// Two uniforms of one shader object share a name.
    DuplicateUniform {
        /// The uniform name.
        name: String,
    },
    /// A uniform appears in both stages with different types.
    IncompatibleUniform {
        /// The uniform name.
        name: String,
    },
    /// More than one shader object was supplied for one stage.
    MultipleObjectsPerStage,
    /// A required stage has no shader object.
    MissingStage {
        /// The stage name.
        stage: &'static str,
    },
    /// The requested shader module could not be found.
    NotFound {
        /// The ID of the shader module that was not found.
        id: ShaderId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::UnsupportedLanguage { language } => {
                write!(f, "Shading language not supported: {language}")
            }
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ShaderError::DuplicateUniform { name } => {
                write!(f, "Uniform '{name}' is declared more than once")
            }
            ShaderError::IncompatibleUniform { name } => {
                write!(f, "Uniform '{name}' has incompatible types across stages")
            }
            ShaderError::MultipleObjectsPerStage => write!(
                f,
                "Linking more than one shader object per stage is not supported"
            ),
            ShaderError::MissingStage { stage } => {
                write!(f, "Missing shader for the {stage} stage")
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to deriving a pipeline cache key or compiling a pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// A field does not fit the bits reserved for it in the cache key.
    KeyFieldOutOfRange {
        /// The name of the key field.
        field: &'static str,
        /// The rejected value.
        value: u32,
    },
    /// Used outputs must be contiguous and unused ones must carry no format.
    MalformedOutputs {
        /// The number of outputs the description claims.
        num_outputs: usize,
    },
    /// The depth attachment format is not a depth format.
    InvalidDepthFormat(TextureFormat),
    /// The graphics backend failed to compile the pipeline state object.
    CompilationFailed {
        /// A descriptive label for the pipeline, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::KeyFieldOutOfRange { field, value } => {
                write!(f, "Pipeline key field '{field}' out of range: {value}")
            }
            PipelineError::MalformedOutputs { num_outputs } => {
                write!(f, "Malformed output formats for {num_outputs} outputs")
            }
            PipelineError::InvalidDepthFormat(format) => {
                write!(f, "{format:?} is not a depth format")
            }
            PipelineError::CompilationFailed { label, details } => {
                write!(
                    f,
                    "Pipeline compilation failed for '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to creating, filling or reading textures.
#[derive(Debug)]
pub enum TextureError {
    /// The texture type has no device format, even after remapping.
    UnsupportedType {
        /// The name of the texture type.
        ty: &'static str,
    },
    /// The texture type has no sRGB variant.
    NoSrgbSupport {
        /// The name of the texture type.
        ty: &'static str,
        /// The linear device format.
        format: TextureFormat,
    },
    /// Only identity swizzles are supported.
    UnsupportedSwizzle,
    /// The dimensions or layer count do not match the texture class.
    InvalidDimensions {
        /// Width of mip level 0.
        width: u32,
        /// Height of mip level 0.
        height: u32,
        /// Requested layer count.
        layers: u32,
    },
    /// The pixmap does not match the texture format.
    PixmapMismatch(String),
    /// A region lies outside the texture.
    RegionOutOfBounds,
    /// The default framebuffer cannot be read back.
    SwapchainReadback,
    /// No texture is attached to the requested framebuffer attachment.
    NoAttachment,
    /// The texture format has no pixmap equivalent.
    NotDownloadable {
        /// The debug label of the texture.
        label: String,
        /// The device format.
        format: TextureFormat,
    },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::UnsupportedType { ty } => {
                write!(f, "Requested unsupported texture type {ty}")
            }
            TextureError::NoSrgbSupport { ty, format } => write!(
                f,
                "No sRGB support for texture type {ty} (internal format {format:?})"
            ),
            TextureError::UnsupportedSwizzle => write!(f, "Swizzle masks are not supported"),
            TextureError::InvalidDimensions {
                width,
                height,
                layers,
            } => write!(f, "Invalid texture dimensions {width}x{height} with {layers} layers"),
            TextureError::PixmapMismatch(msg) => write!(f, "Pixmap mismatch: {msg}"),
            TextureError::RegionOutOfBounds => write!(f, "Texture region out of bounds"),
            TextureError::SwapchainReadback => write!(f, "Swapchain readback is not supported"),
            TextureError::NoAttachment => write!(f, "No texture attached"),
            TextureError::NotDownloadable { label, format } => {
                write!(f, "Can't download texture {label} (format {format:?})")
            }
        }
    }
}

impl std::error::Error for TextureError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A texture-specific error occurred.
    Texture(TextureError),
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
    /// Every id of a recyclable id space is in use.
    Exhausted {
        /// The kind of id.
        what: &'static str,
    },
    /// A vertex attribute layout cannot be expressed as device vertex input.
    InvalidVertexLayout(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::Texture(err) => write!(f, "Texture resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::Exhausted { what } => write!(f, "Ran out of {what} ids."),
            ResourceError::InvalidVertexLayout(msg) => {
                write!(f, "Invalid vertex layout: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            ResourceError::Texture(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

impl From<TextureError> for ResourceError {
    fn from(err: TextureError) -> Self {
        ResourceError::Texture(err)
    }
}

/// A high-level error of the rendering context or graphics device.
#[derive(Debug)]
pub enum RenderError {
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// Failed to acquire the next texture from the swapchain.
    SurfaceAcquisitionFailed(String),
    /// A frame operation was attempted outside `begin_frame`/`end_frame`.
    NoActiveFrame,
    /// `begin_frame` was called while a frame was already being recorded.
    FrameInProgress,
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// A draw was issued without a required piece of state.
    MissingState(&'static str),
    /// A vertex, index or instance range of a draw ends past `u32::MAX`.
    DrawRangeOverflow {
        /// The first element of the range.
        start: u32,
        /// The number of elements.
        len: u32,
    },
    /// The graphics device was lost.
    DeviceLost,
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface for rendering: {msg}")
            }
            RenderError::NoActiveFrame => write!(f, "No frame is being recorded."),
            RenderError::FrameInProgress => write!(f, "A frame is already being recorded."),
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::MissingState(what) => write!(f, "Cannot draw without {what}."),
            RenderError::DrawRangeOverflow { start, len } => {
                write!(f, "Draw range of {len} elements starting at {start} overflows.")
            }
            RenderError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(err.into())
    }
}

impl From<PipelineError> for RenderError {
    fn from(err: PipelineError) -> Self {
        RenderError::ResourceError(err.into())
    }
}

impl From<TextureError> for RenderError {
    fn from(err: TextureError) -> Self {
        RenderError::ResourceError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        assert_eq!(
            format!("{}", ShaderError::MultipleObjectsPerStage),
            "Linking more than one shader object per stage is not supported"
        );
        assert_eq!(
            format!("{}", ShaderError::MissingStage { stage: "fragment" }),
            "Missing shader for the fragment stage"
        );
    }

    #[test]
    fn texture_error_display() {
        let err = TextureError::NotDownloadable {
            label: "Texture #3".to_string(),
            format: TextureFormat::D24Unorm,
        };
        assert_eq!(
            format!("{err}"),
            "Can't download texture Texture #3 (format D24Unorm)"
        );
        assert_eq!(
            format!("{}", TextureError::SwapchainReadback),
            "Swapchain readback is not supported"
        );
    }

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::KeyFieldOutOfRange {
            field: "shader_program",
            value: 70000,
        };
        assert_eq!(
            format!("{err}"),
            "Pipeline key field 'shader_program' out of range: 70000"
        );
    }

    #[test]
    fn resource_error_display() {
        assert_eq!(
            format!(
                "{}",
                ResourceError::Exhausted {
                    what: "shader program"
                }
            ),
            "Ran out of shader program ids."
        );
        assert_eq!(
            format!("{}", RenderError::MissingState("a shader program")),
            "Cannot draw without a shader program."
        );
        assert_eq!(
            format!(
                "{}",
                RenderError::DrawRangeOverflow {
                    start: u32::MAX,
                    len: 3
                }
            ),
            "Draw range of 3 elements starting at 4294967295 overflows."
        );
    }

    #[test]
    fn render_error_display_wrapping_shader_error() {
        let shader_err = ShaderError::NotFound { id: ShaderId(101) };
        let render_err: RenderError = shader_err.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Shader resource error: Shader module not found for ID: ShaderId(101)"
        );
        assert!(render_err.source().is_some());
        assert!(render_err.source().unwrap().source().is_some());
    }
}
