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

use anyhow::anyhow;
use anyhow::Result;
use taisei_render_core::renderer::settings::{PowerPreference, PresentMode};
use taisei_render_core::RenderSettings;
use wgpu::{Features, Instance};

use crate::graphics::WindowTarget;

/// Optional features the device is created with when the adapter has them.
const WANTED_FEATURES: Features = Features::TEXTURE_COMPRESSION_BC
    .union(Features::TEXTURE_FORMAT_16BIT_NORM)
    .union(Features::POLYGON_MODE_LINE)
    .union(Features::DEPTH32FLOAT_STENCIL8);

/// Holds the core WGPU state objects required for rendering.
///
/// The surface is optional: without a window the device renders offscreen only and
/// never hands out a swapchain texture.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    pub surface: Option<wgpu::Surface<'static>>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    // Configuration for the surface's swapchain behavior
    pub surface_config: wgpu::SurfaceConfiguration,

    // Store info for easy access
    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,
    pub active_device_features: wgpu::Features,
    pub device_limits: wgpu::Limits,
}

fn present_mode(mode: PresentMode) -> wgpu::PresentMode {
    match mode {
        PresentMode::Fifo => wgpu::PresentMode::Fifo,
        PresentMode::Mailbox => wgpu::PresentMode::Mailbox,
        PresentMode::Immediate => wgpu::PresentMode::Immediate,
    }
}

impl WgpuGraphicsContext {
    /// Asynchronously creates the instance, adapter, device and (with a window) surface.
    ///
    /// ## Arguments
    /// * `settings` - Supplies the power preference and the present mode.
    /// * `window` - The window to present to, or `None` for an offscreen device.
    ///
    /// ## Returns
    /// * `Result<Self>` - A result containing the initialized `WgpuGraphicsContext` or an error.
    pub async fn new(settings: &RenderSettings, window: Option<&WindowTarget>) -> Result<Self> {
        log::info!("Initializing WGPU Graphics Context...");

        let instance = Instance::new(&wgpu::InstanceDescriptor::default());

        // --- 1. Create Surface ---
        let surface = match window {
            Some(target) => {
                let surface = instance
                    .create_surface(target.window.clone())
                    .map_err(|e| anyhow!("Failed to create surface: {}", e))?;
                log::debug!("WGPU surface created for the window.");
                Some(surface)
            }
            None => None,
        };

        // --- 2. Select Adapter ---
        let power_preference = match settings.power_preference {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find a suitable adapter: {}", e))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // --- 3. Create Logical Device and Command Queue from Adapter ---
        let features_to_enable = adapter.features() & WANTED_FEATURES;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Taisei Render Device"),
                required_features: features_to_enable,
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let active_device_features = device.features();
        let device_limits = device.limits();
        log::info!("Active device features: {active_device_features:?}");
        log::debug!("Device limits: {device_limits:?}");

        // --- 4. Configure Surface ---
        let (width, height) = window.map_or((1, 1), |w| (w.width.max(1), w.height.max(1)));
        let mut surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Bgra8Unorm,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        if let Some(surface) = &surface {
            let surface_caps = surface.get_capabilities(&adapter);
            // The renderer blends in gamma space, so a linear swapchain format is preferred.
            if let Some(format) = surface_caps
                .formats
                .iter()
                .copied()
                .find(|f| !f.is_srgb())
                .or_else(|| surface_caps.formats.first().copied())
            {
                surface_config.format = format;
            }

            let wanted = present_mode(settings.present_mode);
            surface_config.present_mode = if surface_caps.present_modes.contains(&wanted) {
                wanted
            } else {
                log::warn!("{wanted:?} presentation is not supported, falling back to Fifo");
                wgpu::PresentMode::Fifo // Fifo is guaranteed to be supported
            };
            if let Some(&alpha_mode) = surface_caps.alpha_modes.first() {
                surface_config.alpha_mode = alpha_mode;
            }

            surface.configure(&device, &surface_config);
            log::info!(
                "Surface configured: {}x{} {:?} ({:?})",
                width,
                height,
                surface_config.format,
                surface_config.present_mode
            );
        }

        Ok(WgpuGraphicsContext {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            active_device_features,
            device_limits,
        })
    }

    /// Reconfigures the underlying surface (swapchain) when the window is resized.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            log::info!(
                "WgpuGraphicsContext: Resizing surface configuration to {new_width}x{new_height}"
            );
            self.surface_config.width = new_width;
            self.surface_config.height = new_height;
            self.reconfigure();
        } else {
            log::warn!(
                "WgpuGraphicsContext: Ignoring resize request to zero dimensions: {new_width}x{new_height}"
            );
        }
    }

    /// Applies the current surface configuration again, e.g. after the surface was lost.
    pub fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.surface_config);
        }
    }

    /// Returns the size of the swapchain surface used for rendering.
    pub fn get_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}
