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

//! Framebuffer attachment points.

/// The number of color outputs a fragment shader can write.
pub const FRAMEBUFFER_MAX_OUTPUTS: usize = 4;

/// The number of color attachments of a framebuffer.
pub const FRAMEBUFFER_MAX_COLOR_ATTACHMENTS: usize = 4;

/// The number of attachment points, depth included.
pub const FRAMEBUFFER_MAX_ATTACHMENTS: usize = FRAMEBUFFER_MAX_COLOR_ATTACHMENTS + 1;

/// An attachment point of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferAttachment {
    /// The depth attachment.
    Depth,
    /// Color attachment 0.
    Color0,
    /// Color attachment 1.
    Color1,
    /// Color attachment 2.
    Color2,
    /// Color attachment 3.
    Color3,
}

impl FramebufferAttachment {
    /// Returns the attachment index; depth is 0.
    pub const fn index(self) -> usize {
        match self {
            FramebufferAttachment::Depth => 0,
            FramebufferAttachment::Color0 => 1,
            FramebufferAttachment::Color1 => 2,
            FramebufferAttachment::Color2 => 3,
            FramebufferAttachment::Color3 => 4,
        }
    }

    /// Returns the color attachment `n`, if it exists.
    pub const fn color(n: usize) -> Option<Self> {
        match n {
            0 => Some(FramebufferAttachment::Color0),
            1 => Some(FramebufferAttachment::Color1),
            2 => Some(FramebufferAttachment::Color2),
            3 => Some(FramebufferAttachment::Color3),
            _ => None,
        }
    }

    /// Returns `true` for color attachments.
    pub const fn is_color(self) -> bool {
        !matches!(self, FramebufferAttachment::Depth)
    }
}

/// Which attachment each fragment output writes to; `None` discards the output.
pub type OutputMapping = [Option<FramebufferAttachment>; FRAMEBUFFER_MAX_OUTPUTS];

/// The mapping of a new framebuffer: output `i` writes color attachment `i`.
pub const IDENTITY_OUTPUT_MAPPING: OutputMapping = [
    Some(FramebufferAttachment::Color0),
    Some(FramebufferAttachment::Color1),
    Some(FramebufferAttachment::Color2),
    Some(FramebufferAttachment::Color3),
];
