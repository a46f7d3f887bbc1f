//! # Bindless Graphics
//!
//! Typed resource access and GPU execution tracking for a bindless renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsDevice`] - Creates buffers, images and pipelines
//! - [`Recording`] - Records copies and dispatches on resources locked in a typed access state
//! - [`Rendering`] - Records draws into attachments checked against a [`RenderPassFormat`]
//! - [`PendingExecution`] - Waitable and awaitable handle of submitted work
//! - [`FrameManager`] - Frames in flight that never overlap with their own index
//! - [`UploadInFlight`] - One host-written buffer per frame in flight
//!
//! The queue runs on the host: copies execute on CPU memory while dispatches and
//! draws are only logged. Submissions signal timeline semaphores, which makes
//! synchronization observable in tests.
//!
//! ## Example
//!
//! ```
//! use bindless_graphics::*;
//!
//! let device = GraphicsDevice::new(DeviceConfig::default());
//! let staging = device
//!     .create_buffer_with_data(
//!         &BufferDescriptor::new(4, BufferUsage::TRANSFER_SRC),
//!         &[1, 2, 3, 4],
//!     )
//!     .unwrap();
//! let target = device
//!     .create_buffer(&BufferDescriptor::new(4, BufferUsage::TRANSFER_DST | BufferUsage::MAP_READ))
//!     .unwrap();
//!
//! let (target, pending) = device
//!     .execute(|rec| {
//!         let src = staging.access::<TransferRead>(rec)?;
//!         let dst = unsafe { target.access_undefined_contents::<TransferWrite>(rec)? };
//!         rec.copy_buffer_to_buffer(&src, &dst)?;
//!         Ok(dst.into_shared())
//!     })
//!     .unwrap();
//!
//! pending.wait();
//! assert_eq!(target.host_read().unwrap(), vec![1, 2, 3, 4]);
//! ```

pub mod access;
pub mod barriers;
pub mod device;
pub mod error;
pub mod execution;
#[cfg(feature = "vulkan-backend")]
pub mod features;
pub mod frame_manager;
pub mod pipeline;
pub mod queue;
pub mod recording;
pub mod rendering;
pub mod resources;
pub mod sync;
pub mod types;
pub mod upload;

// Re-export main types for convenience
pub use access::*;
pub use barriers::{BarrierBatch, BufferBarrier, ImageBarrier};
pub use device::{DeviceCapabilities, DeviceConfig, GraphicsDevice};
pub use error::{AccessError, CopyError, GraphicsError, GraphicsResult, RecordingError, RenderingError};
pub use execution::{ExecutionManager, PendingExecution};
pub use frame_manager::{Frame, FrameManager};
pub use pipeline::{ComputePipeline, GraphicsPipeline};
pub use queue::{DispatchRecord, DrawRecord, DummyQueue, QueueMode, QueueStats, WORK_LOG_CAPACITY};
pub use recording::{MAX_PARAM_SIZE, MutBufferAccess, MutImageAccess, MutOrSharedBuffer, MutOrSharedImage, Recording};
pub use rendering::{
    ClearValue, LoadOp, RenderPassFormat, Rendering, RenderingAttachment, Scissor, StoreOp, Viewport,
};
pub use resources::{MutBuffer, MutImage, ResourceId, SharedBuffer, SharedImage, WeakBuffer, WeakImage};
pub use upload::UploadInFlight;
pub use types::{
    BufferDescriptor, BufferUsage, DispatchIndirectArgs, DrawIndexedIndirectArgs, DrawIndirectArgs, Extent3d,
    ImageDescriptor, ImageFormat, ImageUsage, IndexFormat,
};

pub use bindless_core::{AccessLockError, FrameInFlight, IndexRangeSet, ResourceInFlight, SeedInFlight};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
pub fn init() {
    bindless_core::init();
    log::info!("Bindless Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_device() {
        let device = GraphicsDevice::new(DeviceConfig::default());
        assert_eq!(device.queue().mode(), QueueMode::Immediate);
        assert_eq!(device.live_buffer_count(), 0);
    }
}
