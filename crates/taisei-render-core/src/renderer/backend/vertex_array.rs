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

//! Vertex arrays: buffer attachments plus the attribute layout reading them.

use super::format;
use super::{IndexBufferHandle, VertexBufferHandle};
use crate::renderer::api::VertexAttribFormat;
use crate::renderer::error::ResourceError;
use crate::renderer::gpu::{
    VertexAttribute, VertexBufferDescription, VertexInputRate, VertexInputState,
};

/// Builds the device vertex input of an attribute layout.
///
/// Attribute `i` is read by shader location `i`. Every attachment becomes one vertex
/// buffer slot, so all attributes of an attachment must agree on the stride.
///
/// ## Errors
/// * `ResourceError::InvalidVertexLayout` - If an attribute format has no device
///   equivalent or an attachment is read with two different strides.
pub fn build_input_state(attribs: &[VertexAttribFormat]) -> Result<VertexInputState, ResourceError> {
    let mut state = VertexInputState::default();

    for (location, attrib) in attribs.iter().enumerate() {
        let format = format::vertex_element_format(attrib.spec).ok_or_else(|| {
            ResourceError::InvalidVertexLayout(format!(
                "attribute {location} has unsupported format {:?}",
                attrib.spec
            ))
        })?;

        match state.buffers.iter().find(|b| b.slot == attrib.attachment) {
            Some(buffer) if buffer.pitch != attrib.stride => {
                return Err(ResourceError::InvalidVertexLayout(format!(
                    "attachment {} is read with strides {} and {}",
                    attrib.attachment, buffer.pitch, attrib.stride
                )));
            }
            Some(_) => {}
            None => state.buffers.push(VertexBufferDescription {
                slot: attrib.attachment,
                pitch: attrib.stride,
                input_rate: VertexInputRate::Vertex,
            }),
        }

        state.attributes.push(VertexAttribute {
            location: location as u32,
            buffer_slot: attrib.attachment,
            format,
            offset: attrib.offset,
        });
    }

    state.buffers.sort_by_key(|b| b.slot);
    Ok(state)
}

/// Binds vertex buffers to attachment slots and describes how to read them.
#[derive(Debug)]
pub struct VertexArray {
    pub(crate) layout_id: u16,
    attachments: Vec<Option<VertexBufferHandle>>,
    index_attachment: Option<IndexBufferHandle>,
    attribs: Vec<VertexAttribFormat>,
    input_state: VertexInputState,
    label: String,
}

impl VertexArray {
    /// Creates an empty vertex array identified by `layout_id` in pipeline keys.
    pub fn new(layout_id: u16, label: impl Into<String>) -> Self {
        Self {
            layout_id,
            attachments: Vec::new(),
            index_attachment: None,
            attribs: Vec::new(),
            input_state: VertexInputState::default(),
            label: label.into(),
        }
    }

    /// Returns the id used in pipeline keys.
    pub fn layout_id(&self) -> u16 {
        self.layout_id
    }

    /// Attaches a vertex buffer and returns the one it replaces.
    pub fn attach_vertex_buffer(
        &mut self,
        buffer: VertexBufferHandle,
        attachment: u32,
    ) -> Option<VertexBufferHandle> {
        let slot = attachment as usize;
        if self.attachments.len() <= slot {
            self.attachments.resize(slot + 1, None);
        }
        self.attachments[slot].replace(buffer)
    }

    /// Returns the vertex buffer at an attachment slot.
    pub fn vertex_buffer(&self, attachment: u32) -> Option<VertexBufferHandle> {
        self.attachments.get(attachment as usize).copied().flatten()
    }

    /// Attaches (or with `None`, detaches) the index buffer and returns the previous one.
    pub fn attach_index_buffer(
        &mut self,
        buffer: Option<IndexBufferHandle>,
    ) -> Option<IndexBufferHandle> {
        std::mem::replace(&mut self.index_attachment, buffer)
    }

    /// Returns the index buffer.
    pub fn index_buffer(&self) -> Option<IndexBufferHandle> {
        self.index_attachment
    }

    /// Replaces the attribute layout.
    ///
    /// Returns `true` if the layout changed, in which case pipelines built for this
    /// array's layout id are stale.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidVertexLayout` - See [`build_input_state`]. The previous
    ///   layout is kept.
    pub fn set_layout(&mut self, attribs: &[VertexAttribFormat]) -> Result<bool, ResourceError> {
        if self.attribs == attribs {
            return Ok(false);
        }

        self.input_state = build_input_state(attribs)?;
        self.attribs = attribs.to_vec();
        Ok(true)
    }

    /// Returns the attribute layout.
    pub fn attribs(&self) -> &[VertexAttribFormat] {
        &self.attribs
    }

    /// Returns the device vertex input of the layout.
    pub fn input_state(&self) -> &VertexInputState {
        &self.input_state
    }

    /// Returns the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sets the debug label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{VertexAttribConversion, VertexAttribSpec, VertexAttribType};
    use crate::renderer::backend::arena::Arena;
    use crate::renderer::backend::common_buffer::VertexBuffer;
    use crate::renderer::gpu::VertexElementFormat;

    const POSITION: VertexAttribSpec = VertexAttribSpec {
        elements: 3,
        ty: VertexAttribType::Float,
        conversion: VertexAttribConversion::Float,
    };

    const COLOR: VertexAttribSpec = VertexAttribSpec {
        elements: 4,
        ty: VertexAttribType::Ubyte,
        conversion: VertexAttribConversion::FloatNormalized,
    };

    #[test]
    fn test_interleaved_layout() {
        let mut attribs = VertexAttribFormat::interleaved(&[POSITION, COLOR], 0);
        attribs.push(VertexAttribFormat {
            spec: POSITION,
            stride: 12,
            offset: 0,
            attachment: 1,
        });
        let state = build_input_state(&attribs).unwrap();

        assert_eq!(
            state.buffers,
            [
                VertexBufferDescription {
                    slot: 0,
                    pitch: 16,
                    input_rate: VertexInputRate::Vertex
                },
                VertexBufferDescription {
                    slot: 1,
                    pitch: 12,
                    input_rate: VertexInputRate::Vertex
                },
            ]
        );
        assert_eq!(state.attributes[1].format, VertexElementFormat::Ubyte4Norm);
        assert_eq!(state.attributes[1].offset, 12);
        assert_eq!(state.attributes[2].location, 2);
        assert_eq!(state.attributes[2].buffer_slot, 1);
    }

    #[test]
    fn test_inconsistent_stride_is_rejected() {
        let attribs = [
            VertexAttribFormat {
                spec: POSITION,
                stride: 16,
                offset: 0,
                attachment: 0,
            },
            VertexAttribFormat {
                spec: COLOR,
                stride: 20,
                offset: 12,
                attachment: 0,
            },
        ];
        assert!(matches!(
            build_input_state(&attribs),
            Err(ResourceError::InvalidVertexLayout(_))
        ));
    }

    #[test]
    fn test_set_layout_reports_changes_and_keeps_old_layout_on_error() {
        let mut vao = VertexArray::new(3, "quad");
        let layout = VertexAttribFormat::interleaved(&[POSITION], 0);
        assert!(vao.set_layout(&layout).unwrap());
        assert!(!vao.set_layout(&layout).unwrap());

        let half3 = VertexAttribSpec {
            elements: 3,
            ty: VertexAttribType::Half,
            conversion: VertexAttribConversion::Float,
        };
        assert!(vao
            .set_layout(&VertexAttribFormat::interleaved(&[half3], 0))
            .is_err());
        assert_eq!(vao.attribs(), layout.as_slice());
        assert_eq!(vao.input_state().attributes.len(), 1);
    }

    #[test]
    fn test_attachments_return_previous() {
        let mut buffers = Arena::new();
        let a = buffers.insert(VertexBuffer::new(64, "a"));
        let b = buffers.insert(VertexBuffer::new(64, "b"));

        let mut vao = VertexArray::new(1, "vao");
        assert_eq!(vao.attach_vertex_buffer(a, 2), None);
        assert_eq!(vao.attach_vertex_buffer(b, 2), Some(a));
        assert_eq!(vao.vertex_buffer(2), Some(b));
        assert_eq!(vao.vertex_buffer(0), None);
        assert_eq!(vao.vertex_buffer(9), None);
        assert_eq!(vao.attach_index_buffer(None), None);
    }
}
