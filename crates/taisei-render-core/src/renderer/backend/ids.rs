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

//! Small recyclable integer ids.
//!
//! Shader programs and vertex layouts are identified in pipeline cache keys by a
//! 16-bit id rather than by address, so keys stay plain data.

/// Hands out `u16` ids, reusing released ones first. Id 0 is never issued.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
    free: Vec<u16>,
}

impl IdAllocator {
    /// Creates an allocator with no ids issued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues an id, or `None` if all 65535 are live.
    pub fn alloc(&mut self) -> Option<u16> {
        if let Some(id) = self.free.pop() {
            return Some(id);
        }

        if self.next >= u16::MAX as u32 {
            return None;
        }

        self.next += 1;
        Some(self.next as u16)
    }

    /// Returns an id for reuse.
    pub fn release(&mut self, id: u16) {
        debug_assert!(id != 0 && (id as u32) <= self.next);
        debug_assert!(!self.free.contains(&id));
        self.free.push(id);
    }

    /// Returns the number of live ids.
    pub fn live(&self) -> usize {
        self.next as usize - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_recycled() {
        let mut ids = IdAllocator::new();
        let a = ids.alloc().unwrap();
        let b = ids.alloc().unwrap();
        assert_eq!((a, b), (1, 2));
        ids.release(a);
        assert_eq!(ids.alloc(), Some(a));
        assert_eq!(ids.live(), 2);
    }

    #[test]
    fn test_exhaustion() {
        let mut ids = IdAllocator::new();
        for _ in 0..u16::MAX {
            assert!(ids.alloc().is_some());
        }
        assert_eq!(ids.alloc(), None);
    }
}
