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

//! Integer and floating-point rectangles and extents.
//!
//! Rectangles follow the engine's convention: `x`/`y` locate the corner and `w`/`h`
//! are the size. A rectangle with a zero-sized axis is empty.

use serde::{Deserialize, Serialize};

/// A two-dimensional extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An integer rectangle, used for scissor regions and readback regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntRect {
    /// Left edge.
    pub x: i32,
    /// Bottom or top edge, depending on the consumer's origin convention.
    pub y: i32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
}

impl IntRect {
    /// Creates a new rectangle.
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Returns `true` if the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// A floating-point rectangle, used for viewports.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloatRect {
    /// Left edge.
    pub x: f32,
    /// Bottom or top edge, depending on the consumer's origin convention.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl FloatRect {
    /// Creates a new rectangle.
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Returns `true` if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Returns the rectangle as `[x, y, w, h]`, the layout of the `r_viewport` uniform.
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_rect_empty_when_any_axis_is_zero() {
        assert!(IntRect::new(4, 4, 0, 10).is_empty());
        assert!(IntRect::new(4, 4, 10, 0).is_empty());
        assert!(!IntRect::new(-2, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_float_rect_to_array_order() {
        let vp = FloatRect::new(1.0, 2.0, 640.0, 480.0);
        assert_eq!(vp.to_array(), [1.0, 2.0, 640.0, 480.0]);
        assert!(FloatRect::default().is_empty());
    }
}
