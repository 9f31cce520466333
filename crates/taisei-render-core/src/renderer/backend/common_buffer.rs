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

//! Device buffers fed from a [`CachedBuffer`] through a reusable upload transfer buffer.

use super::cached_buffer::CachedBuffer;
use super::frame::FrameCommands;
use crate::renderer::error::ResourceError;
use crate::renderer::gpu::{
    BufferDescriptor, BufferId, BufferRegion, BufferUsage, IndexFormat, TransferBufferDescriptor,
    TransferBufferId, TransferBufferLocation, TransferBufferUsage,
};
use crate::renderer::GpuDevice;
use std::borrow::Cow;

/// A device buffer and the CPU copy of its contents.
///
/// The device allocation always has the logical size of the cached buffer as of the
/// last flush (the "committed" size). When the logical size changes, the next flush
/// recreates the device and transfer buffers and uploads everything.
#[derive(Debug)]
pub struct CommonBuffer {
    cached: CachedBuffer,
    usage: BufferUsage,
    gpu_buffer: Option<BufferId>,
    transfer_buffer: Option<TransferBufferId>,
    committed_size: usize,
    label: String,
}

impl CommonBuffer {
    /// Creates a zero-filled buffer. No device memory is allocated until the first flush.
    pub fn new(usage: BufferUsage, size: usize, label: impl Into<String>) -> Self {
        Self {
            cached: CachedBuffer::with_size(size),
            usage,
            gpu_buffer: None,
            transfer_buffer: None,
            committed_size: 0,
            label: label.into(),
        }
    }

    /// Returns the CPU copy.
    pub fn cached(&self) -> &CachedBuffer {
        &self.cached
    }

    /// Returns the CPU copy for writing.
    pub fn cached_mut(&mut self) -> &mut CachedBuffer {
        &mut self.cached
    }

    /// Returns the device buffer as of the last flush.
    pub fn gpu_buffer(&self) -> Option<BufferId> {
        self.gpu_buffer
    }

    /// Returns the size of the current device allocation.
    pub fn committed_size(&self) -> usize {
        self.committed_size
    }

    /// Returns the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sets the debug label. It is applied to device buffers created after the call.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Uploads pending changes, recording the copy in the frame's copy pass.
    ///
    /// An empty buffer is left unallocated.
    pub fn flush(
        &mut self,
        device: &dyn GpuDevice,
        commands: &mut FrameCommands,
    ) -> Result<(), ResourceError> {
        let size = self.cached.size();
        if size == 0 {
            return Ok(());
        }

        let reallocated = self.gpu_buffer.is_none() || self.committed_size != size;
        if reallocated {
            self.reallocate(device, size)?;
        }

        let range = {
            let update = self.cached.flush();
            if reallocated {
                0..size
            } else {
                update.offset..update.offset + update.size()
            }
        };

        if range.is_empty() {
            return Ok(());
        }

        let (Some(buffer), Some(transfer_buffer)) = (self.gpu_buffer, self.transfer_buffer) else {
            return Err(ResourceError::InvalidHandle);
        };

        device.write_transfer_buffer(
            transfer_buffer,
            range.start as u64,
            &self.cached.data()[range.clone()],
        )?;

        commands.copy_pass().upload_to_buffer(
            &TransferBufferLocation {
                transfer_buffer,
                offset: range.start as u64,
            },
            &BufferRegion {
                buffer,
                offset: range.start as u64,
                size: range.len() as u64,
            },
        );

        Ok(())
    }

    fn reallocate(&mut self, device: &dyn GpuDevice, size: usize) -> Result<(), ResourceError> {
        self.release(device);

        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed(&self.label)),
            size: size as u64,
            usage: self.usage,
        })?;

        let transfer_buffer = match device.create_transfer_buffer(&TransferBufferDescriptor {
            label: Some(Cow::Owned(format!("{} (transfer)", self.label))),
            size: size as u64,
            usage: TransferBufferUsage::Upload,
        }) {
            Ok(id) => id,
            Err(e) => {
                let _ = device.destroy_buffer(buffer);
                return Err(e);
            }
        };

        log::debug!(
            "CommonBuffer: allocated {size} bytes for '{}' (was {})",
            self.label,
            self.committed_size
        );

        self.gpu_buffer = Some(buffer);
        self.transfer_buffer = Some(transfer_buffer);
        self.committed_size = size;
        Ok(())
    }

    fn release(&mut self, device: &dyn GpuDevice) {
        if let Some(buffer) = self.gpu_buffer.take() {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("CommonBuffer: failed to destroy '{}': {e}", self.label);
            }
        }

        if let Some(transfer_buffer) = self.transfer_buffer.take() {
            if let Err(e) = device.destroy_transfer_buffer(transfer_buffer) {
                log::warn!(
                    "CommonBuffer: failed to destroy transfer buffer of '{}': {e}",
                    self.label
                );
            }
        }

        self.committed_size = 0;
    }

    /// Releases the device resources.
    pub fn destroy(mut self, device: &dyn GpuDevice) {
        self.release(device);
    }
}

/// A buffer of vertex data.
#[derive(Debug)]
pub struct VertexBuffer {
    pub(crate) buffer: CommonBuffer,
}

impl VertexBuffer {
    /// Creates a vertex buffer of `capacity` bytes.
    pub fn new(capacity: usize, label: impl Into<String>) -> Self {
        Self {
            buffer: CommonBuffer::new(BufferUsage::VERTEX, capacity, label),
        }
    }
}

/// A buffer of 16 or 32-bit indices.
#[derive(Debug)]
pub struct IndexBuffer {
    pub(crate) buffer: CommonBuffer,
    pub(crate) format: IndexFormat,
}

impl IndexBuffer {
    /// Creates an index buffer with room for `max_elements` indices.
    pub fn new(format: IndexFormat, max_elements: usize, label: impl Into<String>) -> Self {
        Self {
            buffer: CommonBuffer::new(
                BufferUsage::INDEX,
                max_elements * format.size() as usize,
                label,
            ),
            format,
        }
    }

    /// Appends indices at the stream offset, narrowing them to the buffer's format.
    ///
    /// Returns the element offset of the first index written.
    pub fn add_indices(&mut self, indices: &[u32]) -> Result<usize, ResourceError> {
        let bytes: Vec<u8> = match self.format {
            IndexFormat::Uint32 => bytemuck::cast_slice(indices).to_vec(),
            IndexFormat::Uint16 => {
                let narrowed = indices
                    .iter()
                    .map(|&i| u16::try_from(i).map_err(|_| ResourceError::OutOfBounds))
                    .collect::<Result<Vec<u16>, _>>()?;
                bytemuck::cast_slice(&narrowed).to_vec()
            }
        };

        let offset = self.buffer.cached_mut().stream(&bytes);
        Ok(offset / self.format.size() as usize)
    }
}
