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

//! A CPU mirror of a GPU buffer with dirty range tracking.

use crate::renderer::error::ResourceError;
use std::ops::Range;

/// A contiguous span of a [`CachedBuffer`] that must be uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedBufferUpdate<'a> {
    /// Byte offset of the span in the buffer.
    pub offset: usize,
    /// The bytes to upload.
    pub data: &'a [u8],
}

impl CachedBufferUpdate<'_> {
    /// Returns the size of the span.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing needs uploading.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The logical contents of a buffer plus the byte range changed since the last flush.
///
/// Separate writes are merged into the smallest range covering all of them.
#[derive(Debug, Default)]
pub struct CachedBuffer {
    cache: Vec<u8>,
    dirty: Option<Range<usize>>,
    stream_offset: usize,
}

impl CachedBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a zero-filled buffer of `size` bytes.
    pub fn with_size(size: usize) -> Self {
        Self {
            cache: vec![0; size],
            ..Self::default()
        }
    }

    /// Returns the logical size.
    pub fn size(&self) -> usize {
        self.cache.len()
    }

    /// Returns the logical contents.
    pub fn data(&self) -> &[u8] {
        &self.cache
    }

    /// Returns the dirty range, if any.
    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Returns the offset the next [`CachedBuffer::stream`] writes at.
    pub fn stream_offset(&self) -> usize {
        self.stream_offset
    }

    /// Grows or shrinks the buffer. New bytes are zero; the dirty range is clipped.
    pub fn resize(&mut self, new_size: usize) {
        self.cache.resize(new_size, 0);
        self.stream_offset = self.stream_offset.min(new_size);

        if let Some(range) = self.dirty.take() {
            let clipped = range.start.min(new_size)..range.end.min(new_size);
            if !clipped.is_empty() {
                self.dirty = Some(clipped);
            }
        }
    }

    fn mark_dirty(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }

        self.dirty = Some(match self.dirty.take() {
            Some(d) => d.start.min(range.start)..d.end.max(range.end),
            None => range,
        });
    }

    /// Overwrites bytes at `offset`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write extends past the end of the buffer.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), ResourceError> {
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= self.cache.len())
            .ok_or(ResourceError::OutOfBounds)?;

        self.cache[offset..end].copy_from_slice(data);
        self.mark_dirty(offset..end);
        Ok(())
    }

    /// Appends bytes at the stream offset, growing the buffer as needed.
    ///
    /// Returns the offset the data was written at.
    pub fn stream(&mut self, data: &[u8]) -> usize {
        let offset = self.stream_offset;
        let end = offset + data.len();

        if end > self.cache.len() {
            let grown = end.max(self.cache.len() * 2);
            self.resize(grown);
        }

        self.cache[offset..end].copy_from_slice(data);
        self.mark_dirty(offset..end);
        self.stream_offset = end;
        offset
    }

    /// Moves the stream offset, clamped to the buffer size.
    pub fn set_stream_offset(&mut self, offset: usize) {
        self.stream_offset = offset.min(self.cache.len());
    }

    /// Rewinds the stream offset without touching the contents or the dirty range.
    pub fn invalidate(&mut self) {
        self.stream_offset = 0;
    }

    /// Returns the dirty span and marks the buffer clean.
    pub fn flush(&mut self) -> CachedBufferUpdate<'_> {
        match self.dirty.take() {
            Some(range) => CachedBufferUpdate {
                offset: range.start,
                data: &self.cache[range],
            },
            None => CachedBufferUpdate {
                offset: 0,
                data: &[],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_covers_hull_of_writes() {
        let mut buf = CachedBuffer::with_size(64);
        buf.write(8, &[1; 4]).unwrap();
        buf.write(32, &[2; 8]).unwrap();
        buf.write(10, &[3; 2]).unwrap();

        let update = buf.flush();
        assert_eq!(update.offset, 8);
        assert_eq!(update.size(), 32);
        assert_eq!(update.data[0], 1);
        assert_eq!(update.data[2], 3);
    }

    #[test]
    fn test_second_flush_is_empty() {
        let mut buf = CachedBuffer::with_size(16);
        buf.write(0, &[9; 16]).unwrap();
        assert_eq!(buf.flush().size(), 16);
        assert!(buf.flush().is_empty());
    }

    #[test]
    fn test_out_of_bounds_write_is_rejected() {
        let mut buf = CachedBuffer::with_size(4);
        assert!(matches!(
            buf.write(2, &[0; 4]),
            Err(ResourceError::OutOfBounds)
        ));
        assert!(buf.dirty_range().is_none());
    }

    #[test]
    fn test_shrink_clips_dirty_range() {
        let mut buf = CachedBuffer::with_size(32);
        buf.write(20, &[1; 8]).unwrap();
        buf.resize(24);
        assert_eq!(buf.dirty_range(), Some(20..24));
        buf.resize(10);
        assert_eq!(buf.dirty_range(), None);
    }

    #[test]
    fn test_stream_appends_and_grows() {
        let mut buf = CachedBuffer::with_size(4);
        assert_eq!(buf.stream(&[1, 2, 3]), 0);
        assert_eq!(buf.stream(&[4, 5, 6]), 3);
        assert!(buf.size() >= 6);
        assert_eq!(&buf.data()[..6], &[1, 2, 3, 4, 5, 6]);
        buf.invalidate();
        assert_eq!(buf.stream_offset(), 0);
        assert_eq!(buf.flush().offset, 0);
    }
}
