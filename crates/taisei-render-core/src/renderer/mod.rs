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

//! The rendering subsystem.
//!
//! - **[`api`]**: the engine-facing vocabulary (blend modes, texture types, pixmaps,
//!   shader reflection, vertex attributes).
//! - **[`gpu`]**: the device-level vocabulary consumed by a concrete GPU backend.
//! - **[`traits`]**: the [`GpuDevice`] and [`CommandEncoder`] contracts.
//! - **[`backend`]**: the machinery translating the former into the latter, rooted at
//!   [`RenderContext`](backend::RenderContext).

pub mod api;
pub mod backend;
pub mod error;
pub mod gpu;
pub mod settings;
pub mod traits;

pub use self::error::{
    PipelineError, RenderError, ResourceError, ShaderError, TextureError,
};
pub use self::traits::{CommandEncoder, GpuDevice};
