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

//! Engine-facing rendering vocabulary.
//!
//! These are the enums and descriptions the game engine speaks: blend modes, texture
//! types, pixmaps, uniforms, vertex attributes and framebuffer attachments. The
//! backend translates them into the device vocabulary of [`crate::renderer::gpu`].

pub mod blend;
pub mod framebuffer;
pub mod pixmap;
pub mod shader;
pub mod state;
pub mod texture;
pub mod uniform;
pub mod vertex;

pub use self::blend::*;
pub use self::framebuffer::*;
pub use self::pixmap::*;
pub use self::shader::*;
pub use self::state::*;
pub use self::texture::*;
pub use self::uniform::*;
pub use self::vertex::*;
