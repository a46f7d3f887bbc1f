//! Free lists for reusable per-submission state.
//!
//! Creating GPU-side synchronization objects is comparatively expensive, and a
//! renderer submits work every frame. [`FreePool`] keeps released objects
//! around so the next submission can reuse them after a [`Poolable::reset`].
//!
//! # Example
//!
//! ```
//! use bindless_core::pool::{FreePool, Poolable};
//!
//! #[derive(Debug, Default)]
//! struct Scratch {
//!     data: Vec<u8>,
//! }
//!
//! impl Poolable for Scratch {
//!     fn reset(&mut self) {
//!         self.data.clear();
//!     }
//! }
//!
//! let pool = FreePool::new();
//! let mut scratch = pool.pop_or_else(Scratch::default);
//! scratch.data.extend_from_slice(&[1, 2, 3]);
//! pool.push(scratch);
//!
//! // Reused, cleared, capacity kept
//! let scratch = pool.pop_or_else(Scratch::default);
//! assert!(scratch.data.is_empty());
//! assert!(scratch.data.capacity() >= 3);
//! assert_eq!(pool.created(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Types that can be returned to a [`FreePool`] and reused.
pub trait Poolable {
    /// Prepare the value for reuse, keeping allocations.
    fn reset(&mut self);
}

/// Thread-safe free list.
#[derive(Debug)]
pub struct FreePool<T: Poolable> {
    free: Mutex<Vec<T>>,
    created: AtomicUsize,
}

impl<T: Poolable> FreePool<T> {
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Take a released value, or create a new one with `create`.
    pub fn pop_or_else(&self, create: impl FnOnce() -> T) -> T {
        if let Some(value) = self.free.lock().pop() {
            return value;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        create()
    }

    /// Like [`pop_or_else`](Self::pop_or_else) for fallible creation.
    pub fn try_pop_or_else<E>(&self, create: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if let Some(value) = self.free.lock().pop() {
            return Ok(value);
        }
        let value = create()?;
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    /// Reset `value` and make it available again.
    pub fn push(&self, mut value: T) {
        value.reset();
        self.free.lock().push(value);
    }

    /// Number of values waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Total number of values this pool had to create.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Remove all free values.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.free.lock())
    }
}

impl<T: Poolable> Default for FreePool<T> {
    fn default() -> Self {
        Self::new()
    }
}
