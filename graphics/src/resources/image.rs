//! Tracked images.

use std::sync::{Arc, Weak};

use bindless_core::AccessLock;
use parking_lot::Mutex;

use super::ResourceId;
use crate::access::ImageAccess;
use crate::error::AccessError;
use crate::types::{Extent3d, ImageDescriptor, ImageFormat, ImageUsage};

/// Shared state of an image.
pub struct ImageSlot {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) usage: ImageUsage,
    pub(crate) extent: Extent3d,
    pub(crate) format: ImageFormat,
    pub(crate) lock: AccessLock<ImageAccess>,
    texels: Mutex<Vec<u8>>,
}

impl ImageSlot {
    /// `byte_size` must be the validated packed size of `desc`.
    pub(crate) fn new(
        id: ResourceId,
        desc: &ImageDescriptor,
        byte_size: usize,
        lock: AccessLock<ImageAccess>,
    ) -> Self {
        Self {
            id,
            name: desc.name().to_string(),
            usage: desc.usage,
            extent: desc.extent,
            format: desc.format,
            lock,
            texels: Mutex::new(vec![0; byte_size]),
        }
    }

    pub(crate) fn has_required_usage(&self, required: ImageUsage) -> Result<(), AccessError> {
        if self.usage.contains(required) {
            Ok(())
        } else {
            Err(AccessError::MissingImageUsage {
                name: self.name.clone(),
                usage: self.usage,
                missing_usage: required.difference(self.usage),
            })
        }
    }

    /// Size in bytes of the tightly packed texels.
    pub(crate) fn byte_size(&self) -> u64 {
        self.texels.lock().len() as u64
    }

    pub(crate) fn with_texels<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.texels.lock())
    }
}

impl std::fmt::Debug for ImageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("extent", &self.extent)
            .field("format", &self.format)
            .field("usage", &self.usage)
            .field("state", &self.lock)
            .finish()
    }
}

/// Unique handle to an image that can be accessed mutably.
#[derive(Debug)]
pub struct MutImage {
    slot: Arc<ImageSlot>,
}

impl MutImage {
    pub(crate) fn from_slot(slot: Arc<ImageSlot>) -> Self {
        Self { slot }
    }

    pub(crate) fn into_slot(self) -> Arc<ImageSlot> {
        self.slot
    }

    pub fn id(&self) -> ResourceId {
        self.slot.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn usage(&self) -> ImageUsage {
        self.slot.usage
    }

    pub fn extent(&self) -> Extent3d {
        self.slot.extent
    }

    pub fn format(&self) -> ImageFormat {
        self.slot.format
    }

    /// Access state the image was left in by its last recording.
    pub fn access_state(&self) -> Option<ImageAccess> {
        self.slot.lock.peek()
    }

    pub fn downgrade(&self) -> WeakImage {
        WeakImage(Arc::downgrade(&self.slot))
    }
}

/// Cloneable read-only handle to an image in general read access.
#[derive(Debug, Clone)]
pub struct SharedImage {
    slot: Arc<ImageSlot>,
}

impl SharedImage {
    pub(crate) fn from_slot(slot: Arc<ImageSlot>) -> Self {
        debug_assert!(slot.lock.is_shared());
        Self { slot }
    }

    pub(crate) fn slot(&self) -> &Arc<ImageSlot> {
        &self.slot
    }

    pub fn id(&self) -> ResourceId {
        self.slot.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn usage(&self) -> ImageUsage {
        self.slot.usage
    }

    pub fn extent(&self) -> Extent3d {
        self.slot.extent
    }

    pub fn format(&self) -> ImageFormat {
        self.slot.format
    }

    pub fn downgrade(&self) -> WeakImage {
        WeakImage(Arc::downgrade(&self.slot))
    }
}

impl PartialEq for SharedImage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Eq for SharedImage {}

/// Weak reference to an image.
#[derive(Debug, Clone)]
pub struct WeakImage(Weak<ImageSlot>);

impl WeakImage {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

static_assertions::assert_impl_all!(MutImage: Send, Sync);
static_assertions::assert_impl_all!(SharedImage: Send, Sync);
