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

//! Texture operations of the rendering context.

use super::{frame_commands, RenderContext};
use crate::math::{Color, Extent2D};
use crate::renderer::api::{
    Pixmap, PixmapFormat, PixmapOrigin, TextureFilterMode, TextureFlags, TextureParams,
    TextureType, TextureTypeQueryResult, TextureWrapMode, UniformType,
};
use crate::renderer::backend::format;
use crate::renderer::backend::framebuffer::{RenderPassOutputs, RenderTarget};
use crate::renderer::backend::texture::{self, Texture};
use crate::renderer::backend::TextureHandle;
use crate::renderer::error::{RenderError, ResourceError, TextureError};
use crate::renderer::gpu::{
    ColorAttachmentInfo, DepthStencilAttachmentInfo, LoadOp, StoreOp, TextureFormat,
    TextureRegion, TextureTransferInfo, TransferBufferDescriptor, TransferBufferId,
    TransferBufferUsage,
};
use crate::renderer::GpuDevice;
use std::borrow::Cow;
use std::sync::Arc;

/// Copies a texture region into a transfer buffer and waits for the copy.
fn download_blocking(
    device: &dyn GpuDevice,
    region: &TextureRegion,
    transfer_buffer: TransferBufferId,
    size: usize,
) -> Result<Vec<u8>, ResourceError> {
    let mut encoder = device.create_command_encoder(Some("Texture dump"));
    encoder.begin_copy_pass();
    encoder.download_from_texture(
        region,
        &TextureTransferInfo {
            transfer_buffer,
            offset: 0,
            pixels_per_row: region.w,
            rows_per_layer: region.h,
        },
    );
    encoder.end_copy_pass();

    let fence = device.submit_command_buffer(encoder.finish())?;
    let waited = device.wait_for_fences(&[fence], true);
    device.release_fence(fence);
    waited?;

    let mut data = Vec::with_capacity(size);
    device.read_transfer_buffer(transfer_buffer, size as u64, &mut |bytes| {
        data.extend_from_slice(bytes)
    })?;
    Ok(data)
}

impl RenderContext {
    fn texture_mut(&mut self, handle: TextureHandle) -> Result<&mut Texture, ResourceError> {
        self.textures
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)
    }

    /// Creates a texture.
    ///
    /// ## Errors
    /// * `TextureError` - If the parameters are invalid or the type has no usable
    ///   device format.
    /// * `ResourceError::BackendError` - If the device fails to create it.
    pub fn texture_create(
        &mut self,
        params: &TextureParams,
        label: &str,
    ) -> Result<TextureHandle, RenderError> {
        let texture = Texture::create(
            &*self.device,
            params,
            label,
            self.settings.default_anisotropy,
        )?;
        Ok(self.textures.insert(texture))
    }

    /// Returns the normalized parameters of a texture.
    pub fn texture_params(&self, handle: TextureHandle) -> Option<&TextureParams> {
        self.textures.get(handle).map(Texture::params)
    }

    /// Returns the device format of a texture.
    pub fn texture_format(&self, handle: TextureHandle) -> Option<TextureFormat> {
        self.textures.get(handle).map(Texture::format)
    }

    /// Returns the size of a mip level.
    pub fn texture_size(&self, handle: TextureHandle, mip_level: u32) -> Option<Extent2D> {
        let (w, h) = self.textures.get(handle)?.size(mip_level);
        Some(Extent2D::new(w, h))
    }

    /// Returns the debug label.
    pub fn texture_label(&self, handle: TextureHandle) -> Option<&str> {
        self.textures.get(handle).map(|t| t.label.as_str())
    }

    /// Sets the debug label.
    pub fn texture_set_label(&mut self, handle: TextureHandle, label: &str) {
        if let Some(texture) = self.textures.get_mut(handle) {
            texture.label = label.to_owned();
        }
    }

    /// Changes the minification and magnification filters.
    pub fn texture_set_filter(
        &mut self,
        handle: TextureHandle,
        min: TextureFilterMode,
        mag: TextureFilterMode,
    ) -> Result<(), RenderError> {
        self.texture_mut(handle)?.set_filter(min, mag);
        Ok(())
    }

    /// Changes the wrap modes.
    pub fn texture_set_wrap(
        &mut self,
        handle: TextureHandle,
        s: TextureWrapMode,
        t: TextureWrapMode,
    ) -> Result<(), RenderError> {
        self.texture_mut(handle)?.set_wrap(s, t);
        Ok(())
    }

    /// Replaces a whole mip level of one layer.
    ///
    /// ## Errors
    /// * `TextureError::PixmapMismatch` - If the pixmap size differs from the mip size
    ///   or its format from the texture's.
    pub fn texture_fill(
        &mut self,
        handle: TextureHandle,
        mip_level: u32,
        layer: u32,
        pixmap: &Pixmap<'_>,
    ) -> Result<(), RenderError> {
        let (w, h) = self.texture_mut(handle)?.size(mip_level);
        if (pixmap.width, pixmap.height) != (w, h) {
            return Err(TextureError::PixmapMismatch(format!(
                "{}x{} pixmap for a {w}x{h} mip level",
                pixmap.width, pixmap.height
            ))
            .into());
        }

        self.texture_fill_region(handle, mip_level, layer, 0, 0, pixmap)
    }

    /// Replaces a region of one mip level and layer.
    ///
    /// The upload is recorded into the frame and executes before any later draw.
    pub fn texture_fill_region(
        &mut self,
        handle: TextureHandle,
        mip_level: u32,
        layer: u32,
        x: u32,
        y: u32,
        pixmap: &Pixmap<'_>,
    ) -> Result<(), RenderError> {
        let device = Arc::clone(&self.device);
        let texture = self
            .textures
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)?;
        let commands = frame_commands(&mut self.frame, &*device);
        texture.fill_region(&*device, commands, mip_level, layer, x, y, pixmap)?;
        Ok(())
    }

    /// Clears the base level of every layer to `color`.
    ///
    /// Depth textures are cleared to `color.r`.
    ///
    /// ## Errors
    /// * `TextureError::UnsupportedType` - If the texture is compressed.
    pub fn texture_clear(&mut self, handle: TextureHandle, color: Color) -> Result<(), RenderError> {
        let device = Arc::clone(&self.device);
        let texture = self
            .textures
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)?;

        if texture.format.is_compressed() {
            log::error!("RenderContext: can't clear compressed texture '{}'", texture.label);
            return Err(TextureError::UnsupportedType {
                ty: texture.params.ty.name(),
            }
            .into());
        }

        let (w, h) = texture.size(0);
        let extent = Extent2D::new(w, h);
        let commands = frame_commands(&mut self.frame, &*device);

        for layer in 0..texture.params.layers {
            let outputs = if texture.format.is_depth() {
                RenderPassOutputs {
                    depth_stencil_attachment: Some(DepthStencilAttachmentInfo {
                        texture: texture.gpu_texture,
                        load_op: LoadOp::Clear,
                        store_op: StoreOp::Store,
                        clear_depth: color.r,
                    }),
                    depth_format: Some(texture.format),
                    extent,
                    ..Default::default()
                }
            } else {
                RenderPassOutputs {
                    color_attachments: vec![ColorAttachmentInfo {
                        texture: texture.gpu_texture,
                        mip_level: 0,
                        layer,
                        load_op: LoadOp::Clear,
                        store_op: StoreOp::Store,
                        clear_color: color,
                    }],
                    color_formats: vec![texture.format],
                    extent,
                    ..Default::default()
                }
            };

            commands.begin_render_pass(RenderTarget::Texture(handle), &outputs, Some(&texture.label));
            commands.end_pass();

            if texture.format.is_depth() {
                break;
            }
        }

        texture.taint();
        Ok(())
    }

    /// Downloads one mip level of one layer, blocking until the copy is done.
    ///
    /// Work recorded so far is submitted first. The pixmap has a top-left origin.
    ///
    /// ## Errors
    /// * `TextureError::NotDownloadable` - If the format has no pixmap equivalent.
    /// * `TextureError::RegionOutOfBounds` - If the mip level or layer does not exist.
    pub fn texture_dump(
        &mut self,
        handle: TextureHandle,
        mip_level: u32,
        layer: u32,
    ) -> Result<Pixmap<'static>, RenderError> {
        let device = Arc::clone(&self.device);
        let device: &dyn GpuDevice = &*device;

        let texture = self
            .textures
            .get_mut(handle)
            .ok_or(ResourceError::InvalidHandle)?;

        let pixmap_format: PixmapFormat = format::format_to_pixmap_format(texture.format)
            .ok_or_else(|| TextureError::NotDownloadable {
                label: texture.label.clone(),
                format: texture.format,
            })?;

        if mip_level >= texture.params.mipmaps || layer >= texture.params.layers {
            return Err(TextureError::RegionOutOfBounds.into());
        }

        let region = texture.full_region(mip_level, layer);
        if mip_level > 0 {
            texture.prepare(frame_commands(&mut self.frame, device));
        }

        self.flush_pending_clears();
        self.submit_and_release()?;

        let size = pixmap_format.data_size(region.w, region.h);
        let transfer_buffer = device.create_transfer_buffer(&TransferBufferDescriptor {
            label: Some(Cow::Borrowed("Texture dump")),
            size: size as u64,
            usage: TransferBufferUsage::Download,
        })?;

        let data = download_blocking(device, &region, transfer_buffer, size);
        if let Err(e) = device.destroy_transfer_buffer(transfer_buffer) {
            log::warn!("RenderContext: failed to destroy dump buffer: {e}");
        }

        Ok(Pixmap::new(
            region.w,
            region.h,
            pixmap_format,
            PixmapOrigin::TopLeft,
            data?,
        ))
    }

    /// Drops the caller's reference to a texture.
    ///
    /// The device texture goes away once no framebuffer or sampler slot uses it.
    pub fn texture_destroy(&mut self, handle: TextureHandle) {
        if self.null_textures.contains(&handle) {
            log::warn!("RenderContext: refusing to destroy a null texture");
            return;
        }

        if let Some(texture) = self.textures.release(handle) {
            texture.destroy(&*self.device);
        }
    }

    /// Answers whether textures of a type can exchange pixmaps of a given layout.
    pub fn texture_type_query(
        &self,
        ty: TextureType,
        flags: TextureFlags,
        pixmap_format: PixmapFormat,
        pixmap_origin: PixmapOrigin,
    ) -> Option<TextureTypeQueryResult> {
        texture::type_query(ty, flags, pixmap_format, pixmap_origin)
    }

    /// Returns `true` if the texture may be bound to a sampler uniform of `sampler_type`.
    pub fn texture_sampler_compatible(&self, handle: TextureHandle, sampler_type: UniformType) -> bool {
        self.textures
            .get(handle)
            .is_some_and(|t| texture::sampler_compatible(t.params.class, sampler_type))
    }
}
