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

//! The wgpu implementation of [`GpuDevice`](taisei_render_core::GpuDevice).
//!
//! SPIR-V modules are bound with the descriptor set layout the core compiles for:
//! vertex samplers in set 0, vertex uniforms in set 1, fragment samplers in set 2 and
//! fragment uniforms in set 3. Sampler slot `n` is a texture at binding `2n` and its
//! sampler at binding `2n + 1`.

mod command;
mod context;
mod conversions;
mod device;
mod mipmaps;

pub use self::command::WgpuCommandEncoder;
pub use self::context::WgpuGraphicsContext;
pub use self::conversions::{from_wgpu_texture_format, to_wgpu_texture_format, IntoWgpu};
pub use self::device::WgpuDevice;
