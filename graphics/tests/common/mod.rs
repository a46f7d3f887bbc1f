//! Common utilities for integration tests.
//!
//! Every test runs against both queue modes: [`QueueMode::Immediate`] executes
//! work during submit, [`QueueMode::Manual`] leaves it pending until the test
//! flushes the queue.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use bindless_graphics::{
    BufferDescriptor, BufferUsage, DeviceConfig, GraphicsDevice, ImageDescriptor, ImageFormat, ImageUsage,
    MutBuffer, MutImage, PendingExecution, QueueMode,
};

/// Generate a recognizable byte pattern.
pub fn generate_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Poll `condition` until it holds or five seconds pass.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    true
}

/// Test context holding a device in one queue mode.
pub struct TestContext {
    pub device: Arc<GraphicsDevice>,
    pub mode: QueueMode,
}

impl TestContext {
    pub fn new(mode: QueueMode) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = GraphicsDevice::new(
            DeviceConfig::default()
                .with_name(format!("test device ({mode:?})"))
                .with_queue_mode(mode)
                .with_poll_interval(Duration::from_millis(1)),
        );
        Self { device, mode }
    }

    /// Buffer filled with `data` that can be copied from.
    pub fn create_staging_buffer(&self, data: &[u8]) -> MutBuffer {
        self.device
            .create_buffer_with_data(
                &BufferDescriptor::new(data.len() as u64, BufferUsage::TRANSFER_SRC | BufferUsage::MAP_WRITE)
                    .with_label("staging"),
                data,
            )
            .expect("Failed to create staging buffer")
    }

    /// Device buffer usable as copy source and destination.
    pub fn create_gpu_buffer(&self, size: u64, usage: BufferUsage) -> MutBuffer {
        self.device
            .create_buffer(
                &BufferDescriptor::new(size, usage | BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST)
                    .with_label("gpu"),
            )
            .expect("Failed to create GPU buffer")
    }

    /// Host-readable buffer to copy results into.
    pub fn create_readback_buffer(&self, size: u64) -> MutBuffer {
        self.device
            .create_buffer(
                &BufferDescriptor::new(size, BufferUsage::TRANSFER_DST | BufferUsage::MAP_READ).with_label("readback"),
            )
            .expect("Failed to create readback buffer")
    }

    pub fn create_image(&self, width: u32, height: u32, format: ImageFormat) -> MutImage {
        self.device
            .create_image(
                &ImageDescriptor::new_2d(
                    width,
                    height,
                    format,
                    ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
                )
                .with_label("image"),
            )
            .expect("Failed to create image")
    }

    /// Render target of `format`, sampleable once rendering is done.
    pub fn create_attachment(&self, width: u32, height: u32, format: ImageFormat) -> MutImage {
        let usage = if format.is_depth() {
            ImageUsage::DEPTH_STENCIL_ATTACHMENT
        } else {
            ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED
        };
        self.device
            .create_image(&ImageDescriptor::new_2d(width, height, format, usage).with_label(format!("{format:?} target")))
            .expect("Failed to create attachment")
    }

    /// Let the queue run if it is manual, then wait for `pending`.
    pub fn finish(&self, pending: &PendingExecution) {
        if self.mode == QueueMode::Manual {
            self.device.queue().process_pending();
        }
        assert!(
            pending.wait_timeout(Duration::from_secs(5)),
            "execution did not complete"
        );
    }
}
