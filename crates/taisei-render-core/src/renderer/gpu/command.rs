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

//! Defines the arguments of render passes, submissions and fences.

use super::texture::{SamplerId, TextureFormat, TextureId};
use crate::math::Color;
use std::borrow::Cow;

/// What happens to an attachment's contents when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Keep the existing contents.
    Load,
    /// Clear to the attachment's clear value.
    Clear,
    /// The contents are undefined.
    DontCare,
}

/// What happens to an attachment's contents when a render pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Write the results back.
    Store,
    /// The results may be discarded.
    DontCare,
}

/// A color attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachmentInfo {
    /// The target texture.
    pub texture: TextureId,
    /// The target mip level.
    pub mip_level: u32,
    /// The target layer.
    pub layer: u32,
    /// Load operation.
    pub load_op: LoadOp,
    /// Store operation.
    pub store_op: StoreOp,
    /// Clear value used with [`LoadOp::Clear`].
    pub clear_color: Color,
}

/// The depth attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachmentInfo {
    /// The target texture.
    pub texture: TextureId,
    /// Load operation.
    pub load_op: LoadOp,
    /// Store operation.
    pub store_op: StoreOp,
    /// Clear value used with [`LoadOp::Clear`].
    pub clear_depth: f32,
}

/// A descriptor for beginning a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The color attachments, in output order.
    pub color_attachments: Vec<ColorAttachmentInfo>,
    /// The depth attachment, if any.
    pub depth_stencil_attachment: Option<DepthStencilAttachmentInfo>,
}

/// A viewport transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
    /// Near depth.
    pub min_depth: f32,
    /// Far depth.
    pub max_depth: f32,
}

/// A texture and the sampler it is read through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSamplerBinding {
    /// The texture.
    pub texture: TextureId,
    /// The sampler.
    pub sampler: SamplerId,
}

/// A handle to a recorded, not yet submitted, command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);

/// A handle to a fence signalled when a submitted command buffer completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub usize);

/// The texture acquired from the swapchain for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainTexture {
    /// Handle usable as a render pass attachment until the next present.
    pub texture: TextureId,
    /// The format of the swapchain.
    pub format: TextureFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Static information about a device.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// The adapter or device name.
    pub name: String,
    /// The name of the driver backend.
    pub backend: String,
    /// The largest supported 2D texture dimension.
    pub max_texture_dimension: u32,
    /// The largest supported sampler anisotropy.
    pub max_anisotropy: u32,
}
