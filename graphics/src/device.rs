//! Graphics device.
//!
//! The [`GraphicsDevice`] creates tracked resources and pipelines, and
//! submits recordings to its queue through [`GraphicsDevice::execute`].

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use bindless_core::AccessLock;

use crate::access::{BufferAccess, ImageAccess};
use crate::error::{GraphicsError, GraphicsResult, RecordingError};
use crate::execution::{ExecutionManager, PendingExecution};
use crate::pipeline::{ComputePipeline, GraphicsPipeline};
use crate::queue::{DummyQueue, QueueMode, Submission};
use crate::recording::{Recording, ResourceContext};
use crate::rendering::RenderPassFormat;
use crate::resources::{BufferSlot, ImageSlot, MutBuffer, MutImage, ResourceId, SharedBuffer};
use crate::types::{BufferDescriptor, ImageDescriptor};

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(0);

/// Limits of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum buffer size in bytes.
    pub max_buffer_size: u64,
    /// Maximum image width, height or depth.
    pub max_image_dimension: u32,
    /// Maximum size in bytes of a tightly packed image.
    pub max_image_bytes: u64,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_buffer_size: 1 << 30, // 1 GB
            max_image_dimension: 16384,
            max_image_bytes: 1 << 30,
        }
    }
}

/// Configuration for [`GraphicsDevice::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: String,
    pub capabilities: DeviceCapabilities,
    pub queue_mode: QueueMode,
    /// Upper bound on how long the wait thread sleeps between checks.
    pub poll_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "Dummy Device".to_string(),
            capabilities: DeviceCapabilities::default(),
            queue_mode: QueueMode::Immediate,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl DeviceConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_queue_mode(mut self, queue_mode: QueueMode) -> Self {
        self.queue_mode = queue_mode;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// A graphics device creating tracked resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync`. Recordings may run on several threads at
/// once, a resource can only be locked by one of them at a time.
///
/// # Example
///
/// ```
/// use bindless_graphics::{BufferDescriptor, BufferUsage, DeviceConfig, GraphicsDevice};
///
/// let device = GraphicsDevice::new(DeviceConfig::default());
/// let buffer = device
///     .create_buffer(&BufferDescriptor::new(1024, BufferUsage::STORAGE_BUFFER))
///     .unwrap();
/// assert_eq!(buffer.size(), 1024);
/// assert_eq!(device.live_buffer_count(), 1);
/// ```
pub struct GraphicsDevice {
    id: u64,
    name: String,
    capabilities: DeviceCapabilities,
    queue: DummyQueue,
    executions: ExecutionManager,
    next_resource_id: AtomicU32,
    // Track allocated resources (weak references for counting)
    buffers: RwLock<Vec<Weak<BufferSlot>>>,
    images: RwLock<Vec<Weak<ImageSlot>>>,
}

impl GraphicsDevice {
    pub fn new(config: DeviceConfig) -> Arc<Self> {
        let id = NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "GraphicsDevice: creating \"{}\" (id {}, {:?} queue)",
            config.name,
            id,
            config.queue_mode
        );
        Arc::new(Self {
            id,
            name: config.name,
            capabilities: config.capabilities,
            queue: DummyQueue::new(config.queue_mode),
            executions: ExecutionManager::new(config.poll_interval),
            next_resource_id: AtomicU32::new(0),
            buffers: RwLock::new(Vec::new()),
            images: RwLock::new(Vec::new()),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Limits enforced when creating resources.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn queue(&self) -> &DummyQueue {
        &self.queue
    }

    pub fn execution_manager(&self) -> &ExecutionManager {
        &self.executions
    }

    fn next_resource_id(&self) -> ResourceId {
        ResourceId::new(self.next_resource_id.fetch_add(1, Ordering::Relaxed))
    }

    fn validate_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<()> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer \"{}\" size cannot be zero",
                descriptor.name()
            )));
        }
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::LimitExceeded(format!(
                "buffer \"{}\" size {} exceeds maximum {}",
                descriptor.name(),
                descriptor.size,
                self.capabilities.max_buffer_size
            )));
        }
        Ok(())
    }

    fn new_buffer_slot(
        &self,
        descriptor: &BufferDescriptor,
        lock: AccessLock<BufferAccess>,
    ) -> GraphicsResult<Arc<BufferSlot>> {
        self.validate_buffer(descriptor)?;
        let slot = Arc::new(BufferSlot::new(self.next_resource_id(), descriptor, lock));

        // Track it, dropping entries of freed buffers
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.retain(|w| w.strong_count() > 0);
            buffers.push(Arc::downgrade(&slot));
        }

        log::trace!(
            "GraphicsDevice: created buffer {} \"{}\", size={}",
            slot.id,
            slot.name,
            slot.size
        );
        Ok(slot)
    }

    fn validate_image_bytes(&self, descriptor: &ImageDescriptor) -> GraphicsResult<usize> {
        let max_bytes = self.capabilities.max_image_bytes;
        descriptor
            .checked_byte_size()
            .filter(|&size| size <= max_bytes)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| {
                let extent = descriptor.extent;
                GraphicsError::LimitExceeded(format!(
                    "image \"{}\" of {}x{}x{} {:?} texels exceeds maximum of {max_bytes} bytes",
                    descriptor.name(),
                    extent.width,
                    extent.height,
                    extent.depth,
                    descriptor.format
                ))
            })
    }

    /// Create a buffer with undefined contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or exceeds device limits.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<MutBuffer> {
        let slot = self.new_buffer_slot(descriptor, AccessLock::new(BufferAccess::Undefined))?;
        Ok(MutBuffer::from_slot(slot))
    }

    /// Create a buffer initialized with `data`, which must fill it exactly.
    pub fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> GraphicsResult<MutBuffer> {
        if data.len() as u64 != descriptor.size {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} bytes of data for buffer \"{}\" of size {}",
                data.len(),
                descriptor.name(),
                descriptor.size
            )));
        }
        let slot = self.new_buffer_slot(descriptor, AccessLock::new(BufferAccess::General))?;
        slot.write(0, data)?;
        Ok(MutBuffer::from_slot(slot))
    }

    /// Create a buffer that is read-only on the device from the start.
    ///
    /// With [`BufferUsage::MAP_WRITE`](crate::BufferUsage::MAP_WRITE) the host
    /// may still fill it, which is how per-frame uploads work.
    pub fn create_shared_buffer(&self, descriptor: &BufferDescriptor) -> GraphicsResult<SharedBuffer> {
        let slot = self.new_buffer_slot(descriptor, AccessLock::new_shared())?;
        Ok(SharedBuffer::from_slot(slot))
    }

    /// Create an image with undefined contents.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or exceeds device limits.
    pub fn create_image(&self, descriptor: &ImageDescriptor) -> GraphicsResult<MutImage> {
        if descriptor.extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "image \"{}\" dimensions cannot be zero",
                descriptor.name()
            )));
        }
        let max_dim = self.capabilities.max_image_dimension;
        if descriptor.extent.max_dimension() > max_dim {
            return Err(GraphicsError::LimitExceeded(format!(
                "image \"{}\" dimension exceeds maximum {max_dim}",
                descriptor.name()
            )));
        }
        let byte_size = self.validate_image_bytes(descriptor)?;

        let slot = Arc::new(ImageSlot::new(
            self.next_resource_id(),
            descriptor,
            byte_size,
            AccessLock::new(ImageAccess::Undefined),
        ));

        // Track it, dropping entries of freed images
        if let Ok(mut images) = self.images.write() {
            images.retain(|w| w.strong_count() > 0);
            images.push(Arc::downgrade(&slot));
        }

        log::trace!(
            "GraphicsDevice: created image {} \"{}\", size={}x{}x{}",
            slot.id,
            slot.name,
            slot.extent.width,
            slot.extent.height,
            slot.extent.depth
        );
        Ok(MutImage::from_slot(slot))
    }

    /// Create a compute pipeline that can only be dispatched on this device.
    pub fn create_compute_pipeline(&self, name: impl Into<String>) -> ComputePipeline {
        let pipeline = ComputePipeline::new(name, self.id);
        log::trace!("GraphicsDevice: created compute pipeline \"{}\"", pipeline.name());
        pipeline
    }

    /// Create a graphics pipeline drawing into attachments of `format`.
    pub fn create_graphics_pipeline(&self, name: impl Into<String>, format: RenderPassFormat) -> GraphicsPipeline {
        let pipeline = GraphicsPipeline::new(name, self.id, format);
        log::trace!(
            "GraphicsDevice: created graphics pipeline \"{}\" for {:?}",
            pipeline.name(),
            pipeline.format()
        );
        pipeline
    }

    /// Record commands with `f` and submit them.
    ///
    /// Nothing is submitted if `f` fails. Resources accessed before the
    /// failure stay locked.
    ///
    /// # Errors
    ///
    /// Returns the first error of `f`, or [`RecordingError::DeviceLost`] after
    /// [`shutdown`](Self::shutdown).
    pub fn execute<R>(
        &self,
        f: impl FnOnce(&mut Recording<'_>) -> Result<R, RecordingError>,
    ) -> Result<(R, PendingExecution), RecordingError> {
        if self.executions.is_shut_down() {
            return Err(RecordingError::DeviceLost);
        }

        let context = ResourceContext::new();
        let mut recording = Recording::new(self, &context);
        let result = f(&mut recording)?;
        let commands = recording.finish();
        let keep_alive = context.into_keep_alive();

        let execution = self.executions.new_execution(keep_alive);
        let (semaphore, value) = execution.semaphore();
        let submission = Submission {
            commands,
            semaphore: Arc::clone(semaphore),
            value,
        };
        self.queue.submit(submission);
        let pending = PendingExecution::new(&execution);
        self.executions.submit_for_waiting(execution);
        Ok((result, pending))
    }

    /// Buffers of this device that still have an owner.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers
            .read()
            .map(|b| b.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Get the number of live images created by this device.
    pub fn live_image_count(&self) -> usize {
        self.images
            .read()
            .map(|t| t.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Forget tracking entries of resources that were dropped.
    pub fn cleanup_dead_resources(&self) {
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.retain(|w| w.strong_count() > 0);
        }
        if let Ok(mut images) = self.images.write() {
            images.retain(|w| w.strong_count() > 0);
        }
    }

    /// Finish all submitted work and stop the wait thread.
    ///
    /// Later calls to [`execute`](Self::execute) fail with
    /// [`RecordingError::DeviceLost`].
    pub fn shutdown(&self) {
        if self.executions.is_shut_down() {
            return;
        }
        let flushed = self.queue.process_pending();
        log::debug!(
            "GraphicsDevice: shutting down \"{}\", flushed {} pending submissions",
            self.name,
            flushed
        );
        self.executions.graceful_shutdown();
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("queue", &self.queue.mode())
            .finish()
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Shared across recording threads and the wait thread
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, Extent3d, ImageFormat, ImageUsage};

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(DeviceConfig::default())
    }

    #[test]
    fn test_device_name() {
        let device = GraphicsDevice::new(DeviceConfig::default().with_name("Test Adapter"));
        assert_eq!(device.name(), "Test Adapter");
    }

    #[test]
    fn test_create_buffer() {
        let device = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX_BUFFER))
            .unwrap();
        assert_eq!(buffer.size(), 1024);
        assert_eq!(buffer.access_state(), Some(BufferAccess::Undefined));
        assert_eq!(device.live_buffer_count(), 1);
    }

    #[test]
    fn test_create_buffer_zero_size() {
        let device = create_test_device();
        let result = device.create_buffer(&BufferDescriptor::new(0, BufferUsage::VERTEX_BUFFER));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_create_buffer_over_limit() {
        let device = GraphicsDevice::new(DeviceConfig::default().with_capabilities(DeviceCapabilities {
            max_buffer_size: 64,
            ..DeviceCapabilities::default()
        }));
        let result = device.create_buffer(&BufferDescriptor::new(65, BufferUsage::STORAGE_BUFFER));
        assert!(matches!(result, Err(GraphicsError::LimitExceeded(_))));
    }

    #[test]
    fn test_create_buffer_with_data() {
        let device = create_test_device();
        let buffer = device
            .create_buffer_with_data(&BufferDescriptor::new(4, BufferUsage::MAP_READ), &[1, 2, 3, 4])
            .unwrap();
        assert_eq!(buffer.host_read().unwrap(), vec![1, 2, 3, 4]);

        let result = device.create_buffer_with_data(&BufferDescriptor::new(8, BufferUsage::MAP_READ), &[1]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_resource_ids_are_unique() {
        let device = create_test_device();
        let desc = BufferDescriptor::new(4, BufferUsage::STORAGE_BUFFER);
        let a = device.create_buffer(&desc).unwrap();
        let b = device.create_shared_buffer(&desc).unwrap();
        let c = device
            .create_image(&ImageDescriptor::new_2d(1, 1, ImageFormat::R8Unorm, ImageUsage::SAMPLED))
            .unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c.id());
    }

    #[test]
    fn test_create_image() {
        let device = create_test_device();
        let image = device
            .create_image(&ImageDescriptor::new_2d(
                512,
                512,
                ImageFormat::Rgba8Unorm,
                ImageUsage::SAMPLED,
            ))
            .unwrap();
        assert_eq!(image.extent().width, 512);
        assert_eq!(image.extent().height, 512);
        assert_eq!(device.live_image_count(), 1);
    }

    #[test]
    fn test_create_image_invalid_extent() {
        let device = create_test_device();
        let zero = device.create_image(&ImageDescriptor::new_2d(
            0,
            512,
            ImageFormat::Rgba8Unorm,
            ImageUsage::SAMPLED,
        ));
        assert!(matches!(zero, Err(GraphicsError::InvalidParameter(_))));

        let huge = device.create_image(&ImageDescriptor::new_2d(
            1 << 15,
            1,
            ImageFormat::Rgba8Unorm,
            ImageUsage::SAMPLED,
        ));
        assert!(matches!(huge, Err(GraphicsError::LimitExceeded(_))));
    }

    #[test]
    fn test_create_image_over_byte_limit() {
        let device = create_test_device();
        let volume = device.create_image(&ImageDescriptor {
            extent: Extent3d::new_3d(16384, 16384, 16384),
            ..ImageDescriptor::new_2d(1, 1, ImageFormat::Rgba8Unorm, ImageUsage::STORAGE)
        });
        assert!(matches!(volume, Err(GraphicsError::LimitExceeded(_))));
        assert_eq!(device.live_image_count(), 0);

        let small = GraphicsDevice::new(DeviceConfig::default().with_capabilities(DeviceCapabilities {
            max_image_bytes: 64,
            ..DeviceCapabilities::default()
        }));
        assert!(small
            .create_image(&ImageDescriptor::new_2d(4, 4, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED))
            .is_ok());
        assert!(matches!(
            small.create_image(&ImageDescriptor::new_2d(4, 5, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED)),
            Err(GraphicsError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_resource_cleanup() {
        let device = create_test_device();
        {
            let _buffer = device
                .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX_BUFFER))
                .unwrap();
            assert_eq!(device.live_buffer_count(), 1);
        }
        // Buffer dropped
        device.cleanup_dead_resources();
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn test_tracking_drops_freed_resources() {
        let device = create_test_device();
        for _ in 0..100 {
            let buffer = device.create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX_BUFFER));
            let image = device.create_image(&ImageDescriptor::new_2d(4, 4, ImageFormat::R8Unorm, ImageUsage::SAMPLED));
            drop((buffer, image));
        }
        let _kept = device
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX_BUFFER))
            .unwrap();
        assert_eq!(device.buffers.read().unwrap().len(), 1);
        assert_eq!(device.images.read().unwrap().len(), 1);
        assert_eq!(device.live_buffer_count(), 1);
    }

    #[test]
    fn test_graphics_pipeline_keeps_format() {
        let device = create_test_device();
        let format = RenderPassFormat::new(&[ImageFormat::Bgra8Unorm], None);
        let pipeline = device.create_graphics_pipeline("present", format.clone());
        assert_eq!(pipeline.name(), "present");
        assert_eq!(pipeline.format(), &format);
        assert_eq!(pipeline.device_id(), device.id());
    }

    #[test]
    fn test_execute_after_shutdown() {
        let device = create_test_device();
        device.shutdown();
        let result = device.execute(|_rec| Ok(()));
        assert_eq!(result.unwrap_err(), RecordingError::DeviceLost);
    }

    #[test]
    fn test_empty_recording_completes() {
        let device = create_test_device();
        let ((), pending) = device.execute(|_rec| Ok(())).unwrap();
        pending.wait();
        assert!(pending.completed());
        assert_eq!(device.queue().stats().submissions, 1);
    }
}
