//! GPU synchronization primitives.
//!
//! [`TimelineSemaphore`] models a Vulkan timeline semaphore: a monotonically
//! increasing `u64` the queue signals when work completes and the CPU can wait
//! on. Several semaphores may share a [`WaitNotify`] so one thread can sleep
//! until any of them advances.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Wakes a waiter whenever any attached semaphore is signaled.
#[derive(Debug, Default)]
pub struct WaitNotify {
    generation: Mutex<u64>,
    condvar: Condvar,
}

impl WaitNotify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation, to be passed to [`wait_for`](Self::wait_for).
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Bump the generation and wake all waiters.
    pub fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.condvar.notify_all();
    }

    /// Sleep until the generation differs from `seen` or `timeout` elapses.
    ///
    /// Returns `true` if a notification arrived.
    pub fn wait_for(&self, seen: u64, timeout: Duration) -> bool {
        let mut generation = self.generation.lock();
        wait_until(&self.condvar, &mut generation, timeout, |generation| *generation != seen)
    }
}

/// Block on `condvar` until `done` holds or `timeout` elapses.
///
/// A timeout past the range of [`Instant`], such as [`Duration::MAX`], waits
/// without limit. Returns the final value of `done`.
pub(crate) fn wait_until<T>(
    condvar: &Condvar,
    guard: &mut MutexGuard<'_, T>,
    timeout: Duration,
    mut done: impl FnMut(&T) -> bool,
) -> bool {
    let deadline = Instant::now().checked_add(timeout);
    while !done(guard) {
        match deadline {
            Some(deadline) => {
                if condvar.wait_until(guard, deadline).timed_out() {
                    return done(guard);
                }
            }
            None => condvar.wait(guard),
        }
    }
    true
}

/// CPU side model of a timeline semaphore.
#[derive(Debug)]
pub struct TimelineSemaphore {
    /// Unique identifier for debugging.
    id: u64,
    value: Mutex<u64>,
    condvar: Condvar,
    notify: Option<Arc<WaitNotify>>,
}

impl TimelineSemaphore {
    /// Create a semaphore starting at 0.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            value: Mutex::new(0),
            condvar: Condvar::new(),
            notify: None,
        }
    }

    /// Create a semaphore that also notifies `notify` on every signal.
    pub fn with_notify(id: u64, notify: Arc<WaitNotify>) -> Self {
        Self {
            notify: Some(notify),
            ..Self::new(id)
        }
    }

    /// Get the semaphore's unique ID (for debugging).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current counter value.
    pub fn value(&self) -> u64 {
        *self.value.lock()
    }

    /// Check whether the counter reached `value` (non-blocking).
    pub fn is_reached(&self, value: u64) -> bool {
        self.value() >= value
    }

    /// Advance the counter to `value` and wake waiters.
    ///
    /// # Panics
    ///
    /// Panics if `value` is lower than the current value.
    pub fn signal(&self, value: u64) {
        {
            let mut current = self.value.lock();
            assert!(
                value >= *current,
                "timeline semaphore {} signaled backwards from {} to {}",
                self.id,
                *current,
                value
            );
            *current = value;
            self.condvar.notify_all();
        }
        if let Some(notify) = &self.notify {
            notify.notify();
        }
    }

    /// Wait for the counter to reach `value`.
    ///
    /// Returns `true` if reached, `false` if `timeout` elapsed.
    pub fn wait(&self, value: u64, timeout: Duration) -> bool {
        let mut current = self.value.lock();
        wait_until(&self.condvar, &mut current, timeout, |current| *current >= value)
    }
}
