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

//! CPU encodings of clear values and mip level downsampling.

use taisei_render_core::math::Color;
use taisei_render_core::renderer::gpu::TextureFormat;

fn unorm8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn unorm16(c: f32) -> [u8; 2] {
    ((c.clamp(0.0, 1.0) * 65535.0).round() as u16).to_le_bytes()
}

fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Encodes `color` as one texel of `format`.
///
/// Returns `None` for formats the CPU device can't write: packed 16-bit, half float,
/// integer and block-compressed formats.
pub(crate) fn encode_color(format: TextureFormat, color: Color) -> Option<Vec<u8>> {
    let Color { r, g, b, a } = color;
    let texel = match format {
        TextureFormat::R8Unorm => vec![unorm8(r)],
        TextureFormat::A8Unorm => vec![unorm8(a)],
        TextureFormat::Rgba8Unorm => vec![unorm8(r), unorm8(g), unorm8(b), unorm8(a)],
        TextureFormat::Bgra8Unorm => vec![unorm8(b), unorm8(g), unorm8(r), unorm8(a)],
        TextureFormat::Rgba8UnormSrgb => vec![
            unorm8(linear_to_srgb(r)),
            unorm8(linear_to_srgb(g)),
            unorm8(linear_to_srgb(b)),
            unorm8(a),
        ],
        TextureFormat::Bgra8UnormSrgb => vec![
            unorm8(linear_to_srgb(b)),
            unorm8(linear_to_srgb(g)),
            unorm8(linear_to_srgb(r)),
            unorm8(a),
        ],
        TextureFormat::Rg16Unorm => [unorm16(r), unorm16(g)].concat(),
        TextureFormat::Rgba16Unorm => [unorm16(r), unorm16(g), unorm16(b), unorm16(a)].concat(),
        TextureFormat::R32Float => bytemuck::cast_slice::<f32, u8>(&[r]).to_vec(),
        TextureFormat::Rg32Float => bytemuck::cast_slice::<f32, u8>(&[r, g]).to_vec(),
        TextureFormat::Rgba32Float => bytemuck::cast_slice::<f32, u8>(&[r, g, b, a]).to_vec(),
        _ => return None,
    };
    Some(texel)
}

/// Encodes a depth clear value as one texel of `format`.
pub(crate) fn encode_depth(format: TextureFormat, depth: f32) -> Option<Vec<u8>> {
    match format {
        TextureFormat::D16Unorm => Some(unorm16(depth).to_vec()),
        TextureFormat::D32Float => Some(bytemuck::cast_slice::<f32, u8>(&[depth]).to_vec()),
        _ => None,
    }
}

/// Formats whose channels are all one unsigned normalized byte, averaged per byte.
fn is_byte_unorm(format: TextureFormat) -> bool {
    matches!(
        format,
        TextureFormat::R8Unorm
            | TextureFormat::A8Unorm
            | TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
    )
}

/// Halves a `width`x`height` image of `format`.
///
/// Byte unorm formats are box filtered, everything else is point sampled. Returns
/// `None` for block-compressed formats.
pub(crate) fn downsample(format: TextureFormat, src: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    if format.is_compressed() {
        return None;
    }

    let texel = format.block_bytes() as usize;
    let (w, h) = ((width / 2).max(1), (height / 2).max(1));
    let src_pitch = width as usize * texel;
    let at = |x: u32, y: u32| {
        let x = x.min(width - 1) as usize;
        let y = y.min(height - 1) as usize;
        y * src_pitch + x * texel
    };

    let mut dst = Vec::with_capacity(w as usize * h as usize * texel);
    for y in 0..h {
        for x in 0..w {
            let (sx, sy) = (x * 2, y * 2);
            if is_byte_unorm(format) {
                let corners = [at(sx, sy), at(sx + 1, sy), at(sx, sy + 1), at(sx + 1, sy + 1)];
                for channel in 0..texel {
                    let sum: u32 = corners
                        .iter()
                        .map(|&offset| u32::from(src.get(offset + channel).copied().unwrap_or(0)))
                        .sum();
                    dst.push(((sum + 2) / 4) as u8);
                }
            } else {
                let offset = at(sx, sy);
                dst.extend_from_slice(src.get(offset..offset + texel)?);
            }
        }
    }
    Some(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_bgra_swaps_red_and_blue() {
        let texel = encode_color(TextureFormat::Bgra8Unorm, Color::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(texel, Some(vec![0, 128, 255, 255]));
    }

    #[test]
    fn test_encode_float_and_depth() {
        let texel = encode_color(TextureFormat::R32Float, Color::rgb(0.25, 0.0, 0.0));
        assert_eq!(texel, Some(0.25f32.to_le_bytes().to_vec()));
        assert_eq!(
            encode_depth(TextureFormat::D16Unorm, 1.0),
            Some(vec![0xFF, 0xFF])
        );
        assert_eq!(encode_depth(TextureFormat::D24Unorm, 1.0), None);
    }

    #[test]
    fn test_unsupported_formats_are_not_encoded() {
        assert_eq!(encode_color(TextureFormat::Bc1, Color::WHITE), None);
        assert_eq!(encode_color(TextureFormat::R16Float, Color::WHITE), None);
    }

    #[test]
    fn test_srgb_encoding_brightens_midtones() {
        let texel = encode_color(TextureFormat::Rgba8UnormSrgb, Color::rgb(0.5, 0.5, 0.5));
        assert_eq!(texel, Some(vec![188, 188, 188, 255]));
    }

    #[test]
    fn test_downsample_box_filters_bytes() {
        let src = [0, 100, 200, 255];
        let dst = downsample(TextureFormat::R8Unorm, &src, 2, 2);
        assert_eq!(dst, Some(vec![139]));
    }

    #[test]
    fn test_downsample_point_samples_floats() {
        let src: Vec<u8> = bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0, 4.0]).to_vec();
        let dst = downsample(TextureFormat::R32Float, &src, 4, 1);
        assert_eq!(dst, Some(bytemuck::cast_slice::<f32, u8>(&[1.0, 3.0]).to_vec()));
    }

    #[test]
    fn test_downsample_odd_sizes_clamp_to_one() {
        let src = [10, 20, 30];
        let dst = downsample(TextureFormat::R8Unorm, &src, 3, 1);
        assert_eq!(dst, Some(vec![15]));
    }
}
