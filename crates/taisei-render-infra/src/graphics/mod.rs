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

//! Concrete GPU devices and the factory choosing between them.

pub mod headless;
pub mod wgpu;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use taisei_render_core::renderer::settings::BackendPreference;
use taisei_render_core::renderer::GpuDevice;
use taisei_render_core::RenderSettings;

use self::headless::HeadlessDevice;
use self::wgpu::{WgpuDevice, WgpuGraphicsContext};

/// A window a swapchain can be created for.
pub trait SurfaceWindow: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T: HasWindowHandle + HasDisplayHandle + Send + Sync> SurfaceWindow for T {}

/// The window to present to and its size in physical pixels.
#[derive(Clone)]
pub struct WindowTarget {
    /// The window handle, shared with the surface for its whole lifetime.
    pub window: Arc<dyn SurfaceWindow>,
    /// Width of the drawable area.
    pub width: u32,
    /// Height of the drawable area.
    pub height: u32,
}

impl std::fmt::Debug for WindowTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowTarget")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Creates the device `settings.backend` asks for.
///
/// A wgpu device created without a window renders offscreen and never acquires a
/// swapchain texture. The headless device ignores the window.
///
/// ## Errors
/// Fails if no suitable adapter is found or the surface can't be created.
pub fn create_device(
    settings: &RenderSettings,
    window: Option<&WindowTarget>,
) -> Result<Arc<dyn GpuDevice>> {
    match settings.backend {
        BackendPreference::Headless => {
            if window.is_some() {
                log::warn!("The headless device can't present to a window");
            }
            Ok(Arc::new(HeadlessDevice::new()))
        }
        BackendPreference::Wgpu => {
            let context = pollster::block_on(WgpuGraphicsContext::new(settings, window))
                .context("Failed to initialize the wgpu graphics context")?;
            let device = WgpuDevice::new(Arc::new(Mutex::new(context)))
                .map_err(|e| anyhow!("Failed to create the wgpu device: {e}"))?;
            Ok(Arc::new(device))
        }
    }
}
