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

//! CPU-side images exchanged with textures.

use std::borrow::Cow;

/// The texel layout of a [`Pixmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixmapFormat {
    /// 8-bit R.
    R8,
    /// 8-bit RG.
    Rg8,
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RGBA.
    Rgba8,
    /// 16-bit R.
    R16,
    /// 16-bit RG.
    Rg16,
    /// 16-bit RGB.
    Rgb16,
    /// 16-bit RGBA.
    Rgba16,
    /// Half float R.
    R16F,
    /// Half float RG.
    Rg16F,
    /// Half float RGB.
    Rgb16F,
    /// Half float RGBA.
    Rgba16F,
    /// Float R.
    R32F,
    /// Float RG.
    Rg32F,
    /// Float RGB.
    Rgb32F,
    /// Float RGBA.
    Rgba32F,
    /// BC1 compressed RGB.
    Bc1Rgb,
    /// BC3 compressed RGBA.
    Bc3Rgba,
    /// BC7 compressed RGBA.
    Bc7Rgba,
}

impl PixmapFormat {
    /// Returns `true` for block-compressed formats.
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Bc1Rgb | Self::Bc3Rgba | Self::Bc7Rgba)
    }

    /// Returns the number of channels.
    pub const fn channels(self) -> u32 {
        match self {
            Self::R8 | Self::R16 | Self::R16F | Self::R32F => 1,
            Self::Rg8 | Self::Rg16 | Self::Rg16F | Self::Rg32F => 2,
            Self::Rgb8 | Self::Rgb16 | Self::Rgb16F | Self::Rgb32F | Self::Bc1Rgb => 3,
            Self::Rgba8 | Self::Rgba16 | Self::Rgba16F | Self::Rgba32F => 4,
            Self::Bc3Rgba | Self::Bc7Rgba => 4,
        }
    }

    /// Returns the size of one texel, or of one 4x4 block for compressed formats.
    pub const fn block_bytes(self) -> u32 {
        match self {
            Self::R8 | Self::Rg8 | Self::Rgb8 | Self::Rgba8 => self.channels(),
            Self::R16 | Self::Rg16 | Self::Rgb16 | Self::Rgba16 => self.channels() * 2,
            Self::R16F | Self::Rg16F | Self::Rgb16F | Self::Rgba16F => self.channels() * 2,
            Self::R32F | Self::Rg32F | Self::Rgb32F | Self::Rgba32F => self.channels() * 4,
            Self::Bc1Rgb => 8,
            Self::Bc3Rgba | Self::Bc7Rgba => 16,
        }
    }

    /// Returns the byte size of one row of texels (or blocks).
    pub const fn row_size(self, width: u32) -> usize {
        if self.is_compressed() {
            width.div_ceil(4) as usize * self.block_bytes() as usize
        } else {
            width as usize * self.block_bytes() as usize
        }
    }

    /// Returns the number of rows (or block rows) of an image `height` texels tall.
    pub const fn row_count(self, height: u32) -> usize {
        if self.is_compressed() {
            height.div_ceil(4) as usize
        } else {
            height as usize
        }
    }

    /// Returns the byte size of a `width` x `height` image.
    pub const fn data_size(self, width: u32, height: u32) -> usize {
        self.row_size(width) * self.row_count(height)
    }
}

/// Which corner of the image the first row of texel data belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixmapOrigin {
    /// Rows are stored top to bottom.
    #[default]
    TopLeft,
    /// Rows are stored bottom to top.
    BottomLeft,
}

/// An image in CPU memory, borrowed or owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap<'a> {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel layout.
    pub format: PixmapFormat,
    /// Row order.
    pub origin: PixmapOrigin,
    /// Texel data, exactly [`Pixmap::data_size`] bytes.
    pub data: Cow<'a, [u8]>,
}

impl<'a> Pixmap<'a> {
    /// Wraps existing texel data.
    pub fn new(
        width: u32,
        height: u32,
        format: PixmapFormat,
        origin: PixmapOrigin,
        data: impl Into<Cow<'a, [u8]>>,
    ) -> Self {
        Self {
            width,
            height,
            format,
            origin,
            data: data.into(),
        }
    }

    /// Returns the size the data must have.
    pub fn data_size(&self) -> usize {
        self.format.data_size(self.width, self.height)
    }

    /// Detaches the pixmap from borrowed data.
    pub fn into_owned(self) -> Pixmap<'static> {
        Pixmap {
            width: self.width,
            height: self.height,
            format: self.format,
            origin: self.origin,
            data: Cow::Owned(self.data.into_owned()),
        }
    }

    /// Returns the pixmap with rows in `origin` order, flipping only when needed.
    ///
    /// Compressed pixmaps cannot be flipped and are returned unchanged.
    pub fn with_origin(self, origin: PixmapOrigin) -> Pixmap<'a> {
        if self.origin == origin || self.format.is_compressed() {
            return self;
        }

        let row = self.format.row_size(self.width);
        let mut flipped = Vec::with_capacity(self.data.len());
        if row > 0 {
            for chunk in self.data.chunks_exact(row).rev() {
                flipped.extend_from_slice(chunk);
            }
        }

        Pixmap {
            origin,
            data: Cow::Owned(flipped),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_size() {
        assert_eq!(PixmapFormat::Rgba8.data_size(3, 2), 24);
        assert_eq!(PixmapFormat::Rgb32F.data_size(1, 1), 12);
        assert_eq!(PixmapFormat::Bc1Rgb.data_size(6, 6), 32);
    }

    #[test]
    fn test_with_origin_flips_rows() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let pixmap = Pixmap::new(1, 3, PixmapFormat::Rg8, PixmapOrigin::BottomLeft, &data[..]);
        let flipped = pixmap.with_origin(PixmapOrigin::TopLeft);
        assert_eq!(flipped.origin, PixmapOrigin::TopLeft);
        assert_eq!(&flipped.data[..], &[5, 6, 3, 4, 1, 2]);
    }

    #[test]
    fn test_with_same_origin_borrows() {
        let data = [0u8; 4];
        let pixmap = Pixmap::new(1, 1, PixmapFormat::Rgba8, PixmapOrigin::TopLeft, &data[..]);
        let same = pixmap.with_origin(PixmapOrigin::TopLeft);
        assert!(matches!(same.data, Cow::Borrowed(_)));
    }
}
