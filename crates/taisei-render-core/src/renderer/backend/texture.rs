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

//! Device textures created from engine texture parameters.

use super::format;
use super::frame::FrameCommands;
use crate::renderer::api::{
    max_num_miplevels, Pixmap, PixmapFormat, PixmapOrigin, TextureClass, TextureFilterMode, TextureFlags,
    TextureMipmapMode, TextureParams, TextureType, TextureTypeQueryResult, TextureWrapMode,
    UniformType,
};
use crate::renderer::error::{ResourceError, TextureError};
use crate::renderer::gpu::{
    AddressMode, SamplerDescriptor, SamplerId, TextureDescriptor, TextureFormat, TextureId,
    TextureRegion, TextureTransferInfo, TextureUsage, TransferBufferDescriptor,
    TransferBufferUsage,
};
use crate::renderer::GpuDevice;
use std::borrow::Cow;

/// Resolves the device format of a texture type, remapping it first if needed.
///
/// Returns the remapped type along with the format.
pub fn resolve_format(
    ty: TextureType,
    flags: TextureFlags,
) -> Result<(TextureType, TextureFormat), TextureError> {
    let ty = format::remap_texture_type(ty);
    let linear =
        format::texture_type_to_format(ty).ok_or(TextureError::UnsupportedType { ty: ty.name() })?;

    if !flags.contains(TextureFlags::SRGB) {
        return Ok((ty, linear));
    }

    format::format_to_srgb(linear)
        .map(|srgb| (ty, srgb))
        .ok_or(TextureError::NoSrgbSupport {
            ty: ty.name(),
            format: linear,
        })
}

/// Validates texture parameters and fills in the values left for the backend to pick.
///
/// The returned parameters carry the remapped type, a concrete mip level count and a
/// concrete anisotropy.
pub fn normalize_params(
    params: &TextureParams,
    default_anisotropy: u32,
) -> Result<(TextureParams, TextureFormat), TextureError> {
    let mut p = *params;
    let (ty, format) = resolve_format(p.ty, p.flags)?;
    p.ty = ty;

    if !p.swizzle.is_identity() {
        return Err(TextureError::UnsupportedSwizzle);
    }

    let invalid = TextureError::InvalidDimensions {
        width: p.width,
        height: p.height,
        layers: p.layers,
    };

    if p.width == 0 || p.height == 0 {
        return Err(invalid);
    }

    match p.class {
        TextureClass::Cubemap => {
            if p.width != p.height || p.layers != 6 {
                return Err(invalid);
            }
        }
        TextureClass::D2 => {
            if p.layers == 0 {
                p.layers = 1;
            }
            if p.layers != 1 {
                return Err(invalid);
            }
        }
    }

    let max_mipmaps = max_num_miplevels(p.width, p.height);

    if p.mipmaps == 0 {
        p.mipmaps = match p.mipmap_mode {
            TextureMipmapMode::Auto => TextureParams::MIPMAPS_MAX,
            TextureMipmapMode::Manual => 1,
        };
    }

    if p.mipmaps == TextureParams::MIPMAPS_MAX || p.mipmaps > max_mipmaps {
        p.mipmaps = max_mipmaps;
    }

    if p.anisotropy == 0 {
        p.anisotropy = default_anisotropy.max(1);
    }

    Ok((p, format))
}

/// Builds the sampler matching the filter, wrap and mip parameters of a texture.
pub fn sampler_descriptor(params: &TextureParams) -> SamplerDescriptor {
    let (min_filter, mipmap_mode) = format::filter_mode(params.filter.min);
    let (mag_filter, _) = format::filter_mode(params.filter.mag);

    SamplerDescriptor {
        min_filter,
        mag_filter,
        mipmap_mode,
        address_mode_u: format::address_mode(params.wrap.s),
        address_mode_v: format::address_mode(params.wrap.t),
        address_mode_w: AddressMode::Repeat,
        mip_lod_bias: 0.0,
        max_anisotropy: (params.anisotropy > 1).then_some(params.anisotropy),
        min_lod: 0.0,
        max_lod: params.mipmaps as f32,
    }
}

/// Answers whether a texture of the given type can exchange pixmaps of the given layout.
///
/// Returns `None` if the type cannot be created or has no pixmap equivalent at all.
pub fn type_query(
    ty: TextureType,
    flags: TextureFlags,
    pixmap_format: PixmapFormat,
    pixmap_origin: PixmapOrigin,
) -> Option<TextureTypeQueryResult> {
    let (_, format) = resolve_format(ty, flags).ok()?;
    let optimal_format = format::format_to_pixmap_format(format)?;
    let optimal_origin = PixmapOrigin::TopLeft;

    Some(TextureTypeQueryResult {
        optimal_pixmap_format: optimal_format,
        optimal_pixmap_origin: optimal_origin,
        supplied_pixmap_format_supported: pixmap_format == optimal_format,
        supplied_pixmap_origin_supported: pixmap_origin == optimal_origin,
    })
}

/// Returns `true` if a texture of `class` may be bound to a sampler uniform of `sampler_type`.
pub fn sampler_compatible(class: TextureClass, sampler_type: UniformType) -> bool {
    match class {
        TextureClass::D2 => sampler_type == UniformType::Sampler2D,
        TextureClass::Cubemap => sampler_type == UniformType::SamplerCube,
    }
}

/// A device texture together with its lazily created sampler.
#[derive(Debug)]
pub struct Texture {
    pub(crate) gpu_texture: TextureId,
    pub(crate) sampler: Option<SamplerId>,
    pub(crate) sampler_outdated: bool,
    pub(crate) params: TextureParams,
    pub(crate) format: TextureFormat,
    pub(crate) label: String,
    pub(crate) tainted: bool,
}

impl Texture {
    /// Creates the device texture for `params`.
    ///
    /// ## Errors
    /// * `TextureError` - If the parameters are invalid or the format is unsupported.
    /// * `ResourceError::BackendError` - If the device fails to create the texture.
    pub fn create(
        device: &dyn GpuDevice,
        params: &TextureParams,
        label: &str,
        default_anisotropy: u32,
    ) -> Result<Self, ResourceError> {
        let (params, format) = normalize_params(params, default_anisotropy)?;

        let mut usage = TextureUsage::SAMPLER;
        if format.is_depth() {
            usage |= TextureUsage::DEPTH_STENCIL_TARGET;
        } else if !format.is_compressed() {
            usage |= TextureUsage::COLOR_TARGET;
        }

        if !device.supports_texture_format(format, usage) {
            log::error!(
                "Texture: device lacks support for {format:?} (type {})",
                params.ty.name()
            );
            return Err(TextureError::UnsupportedType {
                ty: params.ty.name(),
            }
            .into());
        }

        let gpu_texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed(label)),
            kind: format::texture_kind(params.class),
            format,
            width: params.width,
            height: params.height,
            layers: params.layers,
            mip_levels: params.mipmaps,
            usage,
        })?;

        log::debug!(
            "Texture: created '{label}' {}x{} {format:?} with {} mip levels",
            params.width,
            params.height,
            params.mipmaps
        );

        Ok(Self {
            gpu_texture,
            sampler: None,
            sampler_outdated: true,
            params,
            format,
            label: label.to_owned(),
            tainted: false,
        })
    }

    /// Returns the parameters the texture was created with, after normalization.
    pub fn params(&self) -> &TextureParams {
        &self.params
    }

    /// Returns the device format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Returns the device texture.
    pub fn gpu_texture(&self) -> TextureId {
        self.gpu_texture
    }

    /// Returns the size of a mip level. Levels past the last one are clamped.
    pub fn size(&self, mip_level: u32) -> (u32, u32) {
        let mip = mip_level.min(self.params.mipmaps.saturating_sub(1)).min(31);
        (
            (self.params.width >> mip).max(1),
            (self.params.height >> mip).max(1),
        )
    }

    /// Changes the filters; the sampler is recreated on next use.
    pub fn set_filter(&mut self, min: TextureFilterMode, mag: TextureFilterMode) {
        if self.params.filter.min != min || self.params.filter.mag != mag {
            self.params.filter.min = min;
            self.params.filter.mag = mag;
            self.sampler_outdated = true;
        }
    }

    /// Changes the wrap modes; the sampler is recreated on next use.
    pub fn set_wrap(&mut self, s: TextureWrapMode, t: TextureWrapMode) {
        if self.params.wrap.s != s || self.params.wrap.t != t {
            self.params.wrap.s = s;
            self.params.wrap.t = t;
            self.sampler_outdated = true;
        }
    }

    /// Returns the sampler, (re)creating it if it is missing or outdated.
    pub fn ensure_sampler(&mut self, device: &dyn GpuDevice) -> Result<SamplerId, ResourceError> {
        if let (Some(sampler), false) = (self.sampler, self.sampler_outdated) {
            return Ok(sampler);
        }

        if let Some(old) = self.sampler.take() {
            device.destroy_sampler(old)?;
        }

        let sampler = device.create_sampler(&sampler_descriptor(&self.params))?;
        self.sampler = Some(sampler);
        self.sampler_outdated = false;
        Ok(sampler)
    }

    /// Marks the mip chain as stale after the base level changed.
    pub fn taint(&mut self) {
        self.tainted = true;
    }

    /// Regenerates auto mipmaps if the base level changed since the last call.
    pub fn prepare(&mut self, commands: &mut FrameCommands) {
        if !self.tainted {
            return;
        }

        self.tainted = false;

        if self.params.mipmap_mode == TextureMipmapMode::Auto && self.params.mipmaps > 1 {
            log::trace!("Texture: regenerating mipmaps of '{}'", self.label);
            commands.outside_pass().generate_mipmaps(self.gpu_texture);
        }
    }

    /// Uploads a pixmap into a region of one mip level and layer.
    ///
    /// The pixmap is staged through a transient transfer buffer and the copy is recorded
    /// in the frame's copy pass.
    ///
    /// ## Errors
    /// * `TextureError::PixmapMismatch` - If the pixmap layout differs from the texture's.
    /// * `TextureError::RegionOutOfBounds` - If the region lies outside the mip level.
    pub fn fill_region(
        &mut self,
        device: &dyn GpuDevice,
        commands: &mut FrameCommands,
        mip_level: u32,
        layer: u32,
        x: u32,
        y: u32,
        pixmap: &Pixmap<'_>,
    ) -> Result<(), ResourceError> {
        let expected = format::format_to_pixmap_format(self.format).ok_or_else(|| {
            TextureError::PixmapMismatch(format!(
                "texture '{}' format {:?} cannot be uploaded from pixmaps",
                self.label, self.format
            ))
        })?;

        if pixmap.format != expected {
            return Err(TextureError::PixmapMismatch(format!(
                "expected {expected:?}, got {:?}",
                pixmap.format
            ))
            .into());
        }

        let data_size = pixmap.data_size();
        if pixmap.data.len() < data_size {
            return Err(TextureError::PixmapMismatch(format!(
                "{} bytes supplied, {data_size} required",
                pixmap.data.len()
            ))
            .into());
        }

        let (mip_w, mip_h) = self.size(mip_level);
        let fits = mip_level < self.params.mipmaps
            && layer < self.params.layers
            && x.checked_add(pixmap.width).is_some_and(|r| r <= mip_w)
            && y.checked_add(pixmap.height).is_some_and(|b| b <= mip_h);
        if !fits {
            return Err(TextureError::RegionOutOfBounds.into());
        }

        if data_size == 0 {
            return Ok(());
        }

        let pixmap = pixmap.clone().with_origin(PixmapOrigin::TopLeft);

        let transfer_buffer = device.create_transfer_buffer(&TransferBufferDescriptor {
            label: None,
            size: data_size as u64,
            usage: TransferBufferUsage::Upload,
        })?;

        let staged = device.write_transfer_buffer(transfer_buffer, 0, &pixmap.data[..data_size]);
        if staged.is_ok() {
            commands.copy_pass().upload_to_texture(
                &TextureTransferInfo {
                    transfer_buffer,
                    offset: 0,
                    pixels_per_row: 0,
                    rows_per_layer: 0,
                },
                &TextureRegion {
                    texture: self.gpu_texture,
                    mip_level,
                    layer,
                    x,
                    y,
                    w: pixmap.width,
                    h: pixmap.height,
                },
            );
        }

        device.destroy_transfer_buffer(transfer_buffer)?;
        staged?;

        if mip_level == 0 {
            self.taint();
        }

        Ok(())
    }

    /// Releases the device texture and sampler.
    pub fn destroy(self, device: &dyn GpuDevice) {
        if let Some(sampler) = self.sampler {
            if let Err(e) = device.destroy_sampler(sampler) {
                log::warn!("Texture: failed to destroy sampler of '{}': {e}", self.label);
            }
        }

        if let Err(e) = device.destroy_texture(self.gpu_texture) {
            log::warn!("Texture: failed to destroy '{}': {e}", self.label);
        }
    }

    /// Returns the region covering a whole mip level of one layer.
    pub(crate) fn full_region(&self, mip_level: u32, layer: u32) -> TextureRegion {
        let (w, h) = self.size(mip_level);
        TextureRegion {
            texture: self.gpu_texture,
            mip_level,
            layer,
            x: 0,
            y: 0,
            w,
            h,
        }
    }
}
