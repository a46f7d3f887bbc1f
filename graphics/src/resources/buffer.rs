//! Tracked buffers.

use std::sync::{Arc, Weak};

use bindless_core::{AccessLock, AccessLockError};
use bytemuck::Pod;
use parking_lot::Mutex;

use super::ResourceId;
use crate::access::BufferAccess;
use crate::error::AccessError;
use crate::types::{BufferDescriptor, BufferUsage};

/// Shared state of a buffer.
pub struct BufferSlot {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) usage: BufferUsage,
    pub(crate) size: u64,
    pub(crate) lock: AccessLock<BufferAccess>,
    memory: Mutex<Vec<u8>>,
}

impl BufferSlot {
    pub(crate) fn new(id: ResourceId, desc: &BufferDescriptor, lock: AccessLock<BufferAccess>) -> Self {
        Self {
            id,
            name: desc.name().to_string(),
            usage: desc.usage,
            size: desc.size,
            lock,
            memory: Mutex::new(vec![0; desc.size as usize]),
        }
    }

    pub(crate) fn has_required_usage(&self, required: BufferUsage) -> Result<(), AccessError> {
        if self.usage.contains(required) {
            Ok(())
        } else {
            Err(AccessError::MissingBufferUsage {
                name: self.name.clone(),
                usage: self.usage,
                missing_usage: required.difference(self.usage),
            })
        }
    }

    pub(crate) fn write(&self, offset: u64, data: &[u8]) -> Result<(), AccessError> {
        self.check_bounds(offset, data.len() as u64)?;
        let start = offset as usize;
        self.memory.lock()[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub(crate) fn read(&self) -> Vec<u8> {
        self.memory.lock().clone()
    }

    /// Run `f` on the backing memory.
    pub(crate) fn with_memory<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.memory.lock())
    }

    fn check_bounds(&self, offset: u64, len: u64) -> Result<(), AccessError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(AccessError::OutOfBounds {
                name: self.name.clone(),
                offset,
                len,
                size: self.size,
            }),
        }
    }
}

impl std::fmt::Debug for BufferSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("usage", &self.usage)
            .field("state", &self.lock)
            .finish()
    }
}

/// Unique handle to a buffer that can be accessed mutably.
///
/// Host access through [`host_write`](Self::host_write) and
/// [`host_read`](Self::host_read) does not wait for pending executions. Wait on
/// the [`PendingExecution`](crate::PendingExecution) of the last recording that
/// used the buffer first.
#[derive(Debug)]
pub struct MutBuffer {
    slot: Arc<BufferSlot>,
}

impl MutBuffer {
    pub(crate) fn from_slot(slot: Arc<BufferSlot>) -> Self {
        Self { slot }
    }

    pub(crate) fn into_slot(self) -> Arc<BufferSlot> {
        self.slot
    }

    pub fn id(&self) -> ResourceId {
        self.slot.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn usage(&self) -> BufferUsage {
        self.slot.usage
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.slot.size
    }

    /// Access state the buffer was left in by its last recording.
    pub fn access_state(&self) -> Option<BufferAccess> {
        self.slot.lock.peek()
    }

    /// Write `data` at `offset`. Requires [`BufferUsage::MAP_WRITE`].
    pub fn host_write(&mut self, offset: u64, data: &[u8]) -> Result<(), AccessError> {
        self.slot.has_required_usage(BufferUsage::MAP_WRITE)?;
        self.check_unlocked()?;
        self.slot.write(offset, data)
    }

    /// Write a slice of plain values at `offset`.
    pub fn host_write_slice<T: Pod>(&mut self, offset: u64, data: &[T]) -> Result<(), AccessError> {
        self.host_write(offset, bytemuck::cast_slice(data))
    }

    /// Read the whole buffer. Requires [`BufferUsage::MAP_READ`].
    pub fn host_read(&self) -> Result<Vec<u8>, AccessError> {
        self.slot.has_required_usage(BufferUsage::MAP_READ)?;
        self.check_unlocked()?;
        Ok(self.slot.read())
    }

    /// Read the whole buffer as plain values.
    pub fn host_read_vec<T: Pod>(&self) -> Result<Vec<T>, AccessError> {
        Ok(bytemuck::pod_collect_to_vec(&self.host_read()?))
    }

    pub fn downgrade(&self) -> WeakBuffer {
        WeakBuffer(Arc::downgrade(&self.slot))
    }

    fn check_unlocked(&self) -> Result<(), AccessError> {
        if self.slot.lock.is_locked() {
            Err(AccessLockError::Locked.into())
        } else {
            Ok(())
        }
    }
}

/// Cloneable read-only handle to a buffer in general read access.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    slot: Arc<BufferSlot>,
}

impl SharedBuffer {
    pub(crate) fn from_slot(slot: Arc<BufferSlot>) -> Self {
        debug_assert!(slot.lock.is_shared());
        Self { slot }
    }

    pub(crate) fn slot(&self) -> &Arc<BufferSlot> {
        &self.slot
    }

    /// Host write bypassing the shared state, used for per-frame uploads.
    pub(crate) fn host_write_unchecked(&self, offset: u64, data: &[u8]) -> Result<(), AccessError> {
        self.slot.has_required_usage(BufferUsage::MAP_WRITE)?;
        self.slot.write(offset, data)
    }

    pub fn id(&self) -> ResourceId {
        self.slot.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn usage(&self) -> BufferUsage {
        self.slot.usage
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.slot.size
    }

    /// Read the whole buffer. Requires [`BufferUsage::MAP_READ`].
    pub fn host_read(&self) -> Result<Vec<u8>, AccessError> {
        self.slot.has_required_usage(BufferUsage::MAP_READ)?;
        Ok(self.slot.read())
    }

    /// Read the whole buffer as plain values.
    pub fn host_read_vec<T: Pod>(&self) -> Result<Vec<T>, AccessError> {
        Ok(bytemuck::pod_collect_to_vec(&self.host_read()?))
    }

    pub fn downgrade(&self) -> WeakBuffer {
        WeakBuffer(Arc::downgrade(&self.slot))
    }
}

impl PartialEq for SharedBuffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Eq for SharedBuffer {}

/// Weak reference to a buffer, for observing when it is freed.
#[derive(Debug, Clone)]
pub struct WeakBuffer(Weak<BufferSlot>);

impl WeakBuffer {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

static_assertions::assert_impl_all!(MutBuffer: Send, Sync);
static_assertions::assert_impl_all!(SharedBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(size: u64, usage: BufferUsage) -> Arc<BufferSlot> {
        let desc = BufferDescriptor::new(size, usage).with_label("test");
        Arc::new(BufferSlot::new(
            ResourceId::new(1),
            &desc,
            AccessLock::new(BufferAccess::Undefined),
        ))
    }

    #[test]
    fn test_host_write_and_read() {
        let mut buffer = MutBuffer::from_slot(slot(8, BufferUsage::MAP_WRITE | BufferUsage::MAP_READ));
        buffer.host_write_slice(0, &[1u32, 2]).unwrap();
        assert_eq!(buffer.host_read_vec::<u32>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_host_write_requires_usage() {
        let mut buffer = MutBuffer::from_slot(slot(8, BufferUsage::MAP_READ));
        let err = buffer.host_write(0, &[1]).unwrap_err();
        assert_eq!(
            err,
            AccessError::MissingBufferUsage {
                name: "test".to_string(),
                usage: BufferUsage::MAP_READ,
                missing_usage: BufferUsage::MAP_WRITE,
            }
        );
    }

    #[test]
    fn test_host_write_out_of_bounds() {
        let mut buffer = MutBuffer::from_slot(slot(4, BufferUsage::MAP_WRITE));
        let err = buffer.host_write(2, &[0; 4]).unwrap_err();
        assert!(matches!(err, AccessError::OutOfBounds { offset: 2, len: 4, size: 4, .. }));
        assert!(buffer.host_write(u64::MAX, &[0]).is_err());
    }

    #[test]
    fn test_host_access_fails_while_locked() {
        let slot = slot(4, BufferUsage::MAP_WRITE | BufferUsage::MAP_READ);
        let mut buffer = MutBuffer::from_slot(Arc::clone(&slot));
        slot.lock.try_lock().unwrap();
        assert_eq!(
            buffer.host_write(0, &[1]).unwrap_err(),
            AccessError::AccessLockError(AccessLockError::Locked)
        );
        assert!(buffer.host_read().is_err());
        slot.lock.unlock(BufferAccess::HostAccess);
        assert!(buffer.host_write(0, &[1]).is_ok());
    }

    #[test]
    fn test_weak_buffer() {
        let buffer = MutBuffer::from_slot(slot(4, BufferUsage::empty()));
        let weak = buffer.downgrade();
        assert!(weak.is_alive());
        drop(buffer);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_buffer_debug() {
        let buffer = MutBuffer::from_slot(slot(1024, BufferUsage::STORAGE_BUFFER));
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("1024"));
        assert!(debug.contains("Undefined"));
    }
}
