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

//! Defines data structures related to GPU buffers and transfer buffers.

use crate::render_bitflags;
use std::borrow::Cow;

render_bitflags! {
    /// A set of flags describing how a device buffer will be bound.
    pub struct BufferUsage: u32 {
        /// The buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 0;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 1;
        /// The buffer can be used for indirect draws.
        const INDIRECT = 1 << 2;
    }
}

/// A descriptor used to create a device buffer.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The size of the buffer in bytes.
    pub size: u64,
    /// How the buffer will be bound.
    pub usage: BufferUsage,
}

/// An opaque handle to a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// The direction of data moved through a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferBufferUsage {
    /// CPU writes, GPU reads (uploads to buffers and textures).
    Upload,
    /// GPU writes, CPU reads (texture downloads).
    Download,
}

/// A descriptor used to create a CPU-mappable transfer buffer.
#[derive(Debug, Clone)]
pub struct TransferBufferDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The size of the buffer in bytes.
    pub size: u64,
    /// The transfer direction.
    pub usage: TransferBufferUsage,
}

/// An opaque handle to a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferBufferId(pub usize);

/// A byte offset inside a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferBufferLocation {
    /// The transfer buffer.
    pub transfer_buffer: TransferBufferId,
    /// Byte offset into the transfer buffer.
    pub offset: u64,
}

/// A byte range inside a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRegion {
    /// The device buffer.
    pub buffer: BufferId,
    /// Byte offset of the region.
    pub offset: u64,
    /// Size of the region in bytes.
    pub size: u64,
}

/// Layout of texel data inside a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureTransferInfo {
    /// The transfer buffer holding the texels.
    pub transfer_buffer: TransferBufferId,
    /// Byte offset of the first texel.
    pub offset: u64,
    /// Texels per row; `0` means tightly packed rows of the region's width.
    pub pixels_per_row: u32,
    /// Rows per layer; `0` means the region's height.
    pub rows_per_layer: u32,
}

/// A vertex or index buffer bound at an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    /// The device buffer.
    pub buffer: BufferId,
    /// Byte offset of the first element.
    pub offset: u64,
}

/// The element size of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    Uint16,
    /// 32-bit unsigned indices.
    Uint32,
}

impl IndexFormat {
    /// Returns the size of one index in bytes.
    pub const fn size(self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}
