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

//! Asynchronous texture readback through a fixed ring of fence-gated requests.
//!
//! Each request owns a download transfer buffer that only ever grows. A request is
//! busy while its fence is pending; once the fence signals, its callback receives a
//! view of the downloaded texels and the slot becomes free again. Requests complete
//! lazily: when a new request looks for a free slot, when the frame loop calls
//! [`ReadbackRing::process`], or in [`ReadbackRing::finalize`].

use super::format;
use crate::renderer::api::{Pixmap, PixmapFormat, PixmapOrigin};
use crate::renderer::error::{ResourceError, TextureError};
use crate::renderer::gpu::{
    FenceId, TextureFormat, TextureRegion, TextureTransferInfo, TransferBufferDescriptor,
    TransferBufferId, TransferBufferUsage,
};
use crate::renderer::GpuDevice;
use std::borrow::Cow;

/// Receives the result of a readback exactly once; `None` if the readback failed.
pub type ReadbackCallback = Box<dyn FnOnce(Option<&Pixmap<'_>>)>;

#[derive(Default)]
struct ReadRequest {
    fence: Option<FenceId>,
    callback: Option<ReadbackCallback>,
    buffer: Option<TransferBufferId>,
    buffer_size: usize,
    width: u32,
    height: u32,
    format: Option<PixmapFormat>,
}

impl ReadRequest {
    /// Completes the request if its fence has signalled. Returns `true` if the slot is free.
    fn ping(&mut self, device: &dyn GpuDevice) -> bool {
        let Some(fence) = self.fence else {
            return true;
        };

        if !device.query_fence(fence) {
            return false;
        }

        self.complete(device, fence);
        true
    }

    fn complete(&mut self, device: &dyn GpuDevice, fence: FenceId) {
        self.fence = None;
        device.release_fence(fence);

        let Some(callback) = self.callback.take() else {
            return;
        };

        let (Some(buffer), Some(format)) = (self.buffer, self.format) else {
            callback(None);
            return;
        };

        let (width, height) = (self.width, self.height);
        let size = format.data_size(width, height);
        let mut callback = Some(callback);

        let read = device.read_transfer_buffer(buffer, size as u64, &mut |data| {
            if let Some(callback) = callback.take() {
                let pixmap = Pixmap::new(
                    width,
                    height,
                    format,
                    PixmapOrigin::BottomLeft,
                    Cow::Borrowed(data),
                );
                callback(Some(&pixmap));
            }
        });

        if let Err(e) = read {
            log::error!("Readback: failed to map transfer buffer: {e}");
        }

        if let Some(callback) = callback {
            callback(None);
        }
    }

    fn ensure_buffer(&mut self, device: &dyn GpuDevice, size: usize) -> Result<TransferBufferId, ResourceError> {
        if let Some(buffer) = self.buffer.filter(|_| self.buffer_size >= size) {
            return Ok(buffer);
        }

        self.release_buffer(device);

        let buffer = device.create_transfer_buffer(&TransferBufferDescriptor {
            label: Some(Cow::Borrowed("Readback buffer")),
            size: size as u64,
            usage: TransferBufferUsage::Download,
        })?;

        self.buffer = Some(buffer);
        self.buffer_size = size;
        Ok(buffer)
    }

    fn release_buffer(&mut self, device: &dyn GpuDevice) {
        if let Some(buffer) = self.buffer.take() {
            if let Err(e) = device.destroy_transfer_buffer(buffer) {
                log::warn!("Readback: failed to destroy transfer buffer: {e}");
            }
        }
        self.buffer_size = 0;
    }
}

/// A fixed number of in-flight texture downloads.
pub struct ReadbackRing {
    requests: Vec<ReadRequest>,
}

impl std::fmt::Debug for ReadbackRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadbackRing")
            .field("slots", &self.requests.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl ReadbackRing {
    /// Creates a ring of `size` slots (at least one).
    pub fn new(size: usize) -> Self {
        Self {
            requests: (0..size.max(1)).map(|_| ReadRequest::default()).collect(),
        }
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.requests.len()
    }

    /// Returns the number of requests whose fence is pending.
    pub fn in_flight(&self) -> usize {
        self.requests.iter().filter(|r| r.fence.is_some()).count()
    }

    fn acquire(&mut self, device: &dyn GpuDevice) -> Option<usize> {
        self.requests.iter_mut().position(|rq| rq.ping(device))
    }

    /// Downloads a texture region and hands it to `callback` once the GPU is done.
    ///
    /// Work recorded before this call must already be submitted for the download to
    /// observe it. If every slot is busy this blocks until one completes. Failures are
    /// logged and reported through the callback.
    pub fn read_async(
        &mut self,
        device: &dyn GpuDevice,
        source: &TextureRegion,
        format: TextureFormat,
        label: &str,
        callback: ReadbackCallback,
    ) {
        let Some(pixmap_format) = format::format_to_pixmap_format(format) else {
            log::error!(
                "{}",
                TextureError::NotDownloadable {
                    label: label.to_owned(),
                    format,
                }
            );
            callback(None);
            return;
        };

        let slot = loop {
            if let Some(slot) = self.acquire(device) {
                break slot;
            }

            log::warn!("Queue is full, forcing synchronization");
            let fences: Vec<FenceId> = self.requests.iter().filter_map(|r| r.fence).collect();
            if let Err(e) = device.wait_for_fences(&fences, false) {
                log::error!("Readback: failed to wait for a free slot: {e}");
                callback(None);
                return;
            }
        };

        let rq = &mut self.requests[slot];
        rq.width = source.w;
        rq.height = source.h;
        rq.format = Some(pixmap_format);

        let size = pixmap_format.data_size(source.w, source.h);
        let submitted = rq.ensure_buffer(device, size).and_then(|buffer| {
            let mut encoder = device.create_command_encoder(Some("Readback"));
            encoder.begin_copy_pass();
            encoder.download_from_texture(
                source,
                &TextureTransferInfo {
                    transfer_buffer: buffer,
                    offset: 0,
                    pixels_per_row: source.w,
                    rows_per_layer: source.h,
                },
            );
            encoder.end_copy_pass();
            device.submit_command_buffer(encoder.finish())
        });

        match submitted {
            Ok(fence) => {
                rq.fence = Some(fence);
                rq.callback = Some(callback);
            }
            Err(e) => {
                log::error!("Readback: failed to download '{label}': {e}");
                callback(None);
            }
        }
    }

    /// Completes every request whose fence has signalled. Never blocks.
    pub fn process(&mut self, device: &dyn GpuDevice) {
        for rq in &mut self.requests {
            rq.ping(device);
        }
    }

    /// Waits for every pending request, completes it and releases all transfer buffers.
    pub fn finalize(&mut self, device: &dyn GpuDevice) {
        let fences: Vec<FenceId> = self.requests.iter().filter_map(|r| r.fence).collect();
        if !fences.is_empty() {
            if let Err(e) = device.wait_for_fences(&fences, true) {
                log::error!("Readback: failed to wait for pending requests: {e}");
            }
        }

        for rq in &mut self.requests {
            if let Some(fence) = rq.fence {
                rq.complete(device, fence);
            }
            rq.release_buffer(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::mock::{MockDevice, Recorded};
    use crate::renderer::gpu::{TextureDescriptor, TextureId, TextureKind, TextureUsage};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Results = Rc<RefCell<Vec<Option<Pixmap<'static>>>>>;

    fn recorder(results: &Results) -> ReadbackCallback {
        let results = results.clone();
        Box::new(move |pixmap| {
            results
                .borrow_mut()
                .push(pixmap.map(|p| p.clone().into_owned()))
        })
    }

    fn texture(device: &MockDevice, format: TextureFormat) -> TextureId {
        device
            .create_texture(&TextureDescriptor {
                label: None,
                kind: TextureKind::D2,
                format,
                width: 64,
                height: 64,
                layers: 1,
                mip_levels: 1,
                usage: TextureUsage::COLOR_TARGET,
            })
            .unwrap()
    }

    fn region(texture: TextureId, w: u32, h: u32) -> TextureRegion {
        TextureRegion {
            texture,
            mip_level: 0,
            layer: 0,
            x: 0,
            y: 0,
            w,
            h,
        }
    }

    #[test]
    fn test_callback_fires_once_after_fence() {
        let device = MockDevice::new();
        let tex = texture(&device, TextureFormat::Rgba8Unorm);
        let results = Results::default();
        let mut ring = ReadbackRing::new(4);

        ring.read_async(
            &device,
            &region(tex, 2, 3),
            TextureFormat::Rgba8Unorm,
            "fb",
            recorder(&results),
        );
        assert_eq!(ring.in_flight(), 1);

        ring.process(&device);
        assert!(results.borrow().is_empty());

        device.signal_all();
        ring.process(&device);
        ring.process(&device);

        let results = results.borrow();
        assert_eq!(results.len(), 1);
        let pixmap = results[0].as_ref().unwrap();
        assert_eq!((pixmap.width, pixmap.height), (2, 3));
        assert_eq!(pixmap.format, PixmapFormat::Rgba8);
        assert_eq!(pixmap.origin, PixmapOrigin::BottomLeft);
        assert_eq!(pixmap.data.len(), 24);
        assert!(pixmap.data.iter().all(|&b| b == tex.0 as u8));
        assert_eq!(ring.in_flight(), 0);
        assert_eq!(device.state().released_fences, 1);
    }

    #[test]
    fn test_download_runs_in_its_own_copy_pass() {
        let device = MockDevice::new();
        let tex = texture(&device, TextureFormat::Rgba8Unorm);
        let mut ring = ReadbackRing::new(1);
        ring.read_async(
            &device,
            &region(tex, 4, 4),
            TextureFormat::Rgba8Unorm,
            "fb",
            Box::new(|_| {}),
        );

        let state = device.state();
        assert_eq!(state.submitted.len(), 1);
        assert!(matches!(
            state.submitted[0].as_slice(),
            [
                Recorded::BeginCopyPass,
                Recorded::DownloadFromTexture { .. },
                Recorded::EndCopyPass
            ]
        ));
    }

    #[test]
    fn test_undownloadable_format_fails_immediately() {
        let device = MockDevice::new();
        let tex = texture(&device, TextureFormat::D24Unorm);
        let results = Results::default();
        let mut ring = ReadbackRing::new(4);

        ring.read_async(
            &device,
            &region(tex, 4, 4),
            TextureFormat::D24Unorm,
            "depth",
            recorder(&results),
        );

        assert_eq!(*results.borrow(), vec![None]);
        assert_eq!(ring.in_flight(), 0);
        assert!(device.state().submitted.is_empty());
    }

    #[test]
    fn test_full_ring_forces_one_synchronization() {
        let device = MockDevice::new();
        let tex = texture(&device, TextureFormat::Rgba8Unorm);
        let results = Results::default();
        let mut ring = ReadbackRing::new(4);

        for _ in 0..5 {
            ring.read_async(
                &device,
                &region(tex, 8, 8),
                TextureFormat::Rgba8Unorm,
                "fb",
                recorder(&results),
            );
        }

        assert_eq!(device.state().waits, 1);
        assert_eq!(results.borrow().len(), 1);
        assert_eq!(ring.in_flight(), 4);

        ring.finalize(&device);
        let results = results.borrow();
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(Option::is_some));
        assert_eq!(device.state().in_flight_fences(), 0);
        assert!(device.state().fences.is_empty());
    }

    #[test]
    fn test_buffers_grow_and_are_released() {
        let device = MockDevice::new();
        let tex = texture(&device, TextureFormat::Rgba8Unorm);
        let mut ring = ReadbackRing::new(1);

        let read = |ring: &mut ReadbackRing, w, h| {
            ring.read_async(
                &device,
                &region(tex, w, h),
                TextureFormat::Rgba8Unorm,
                "fb",
                Box::new(|_| {}),
            );
            device.signal_all();
            ring.process(&device);
        };

        read(&mut ring, 4, 4);
        let first: Vec<usize> = device.state().transfer_buffers.keys().copied().collect();
        read(&mut ring, 2, 2);
        let second: Vec<usize> = device.state().transfer_buffers.keys().copied().collect();
        assert_eq!(first, second);

        read(&mut ring, 16, 16);
        let state = device.state();
        assert_eq!(state.transfer_buffers.len(), 1);
        assert_eq!(state.transfer_buffers.values().next().unwrap().len(), 1024);
        drop(state);

        ring.finalize(&device);
        assert!(device.state().transfer_buffers.is_empty());
    }
}
