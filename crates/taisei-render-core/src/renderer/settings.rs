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

//! Global settings for the rendering backend.

use serde::{Deserialize, Serialize};

/// Which device implementation to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendPreference {
    /// A hardware device through wgpu.
    #[default]
    Wgpu,
    /// The CPU device without a swapchain.
    Headless,
}

/// Which adapter to prefer when several are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerPreference {
    /// Prefer an integrated, low power adapter.
    LowPower,
    /// Prefer a discrete, high performance adapter.
    #[default]
    HighPerformance,
}

/// How the swapchain presents frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PresentMode {
    /// Wait for vertical blank; never tears.
    Fifo,
    /// Replace the queued frame; never tears.
    #[default]
    Mailbox,
    /// Present immediately; may tear.
    Immediate,
}

/// A collection of settings read when the rendering context is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// The device implementation to create.
    pub backend: BackendPreference,
    /// The adapter preference.
    pub power_preference: PowerPreference,
    /// The swapchain present mode.
    pub present_mode: PresentMode,
    /// The number of framebuffer readbacks that may be in flight at once.
    pub readback_ring_size: usize,
    /// The anisotropy applied to textures that request the default.
    pub default_anisotropy: u32,
    /// If `true`, debug labels are forwarded to the device.
    pub debug_labels: bool,
    /// If `true`, `begin_frame` waits for the previous frame to complete.
    pub wait_for_previous_frame: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Wgpu,
            power_preference: PowerPreference::HighPerformance,
            present_mode: PresentMode::Mailbox,
            readback_ring_size: 4,
            default_anisotropy: 1,
            debug_labels: cfg!(debug_assertions),
            wait_for_previous_frame: true,
        }
    }
}

impl RenderSettings {
    /// Parses settings from RON. Missing fields take their default values.
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Serializes the settings to pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let settings =
            RenderSettings::from_ron_str("(backend: Headless, readback_ring_size: 2)").unwrap();
        assert_eq!(settings.backend, BackendPreference::Headless);
        assert_eq!(settings.readback_ring_size, 2);
        assert_eq!(settings.default_anisotropy, 1);
        assert_eq!(settings.present_mode, PresentMode::Mailbox);
    }

    #[test]
    fn test_ron_round_trip() {
        let settings = RenderSettings {
            present_mode: PresentMode::Fifo,
            ..Default::default()
        };
        let text = settings.to_ron_string().unwrap();
        assert_eq!(RenderSettings::from_ron_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_invalid_ron_is_rejected() {
        assert!(RenderSettings::from_ron_str("(backend: Vulkan)").is_err());
    }
}
