//! Lock word guarding the access state of a GPU resource.
//!
//! Every mutable resource stores its current access state (for example
//! "transfer write" or "shader read") in one [`AccessLock`]. Recording a
//! command that uses the resource locks it, and finishing the recording writes
//! back the final state. A resource can also be unlocked into a permanent
//! shared read-only state, after which it can never be locked again.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

/// Access state that can be stored in an [`AccessLock`].
///
/// The raw values `!0` and `!1` are reserved by the lock.
pub trait AccessState: Copy + fmt::Debug {
    fn to_raw(self) -> u32;
    fn from_raw(raw: u32) -> Option<Self>;
}

/// Why a resource could not be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessLockError {
    #[error("resource is locked by another ongoing recording")]
    Locked,
    #[error("resource is in shared read-only access and cannot be used mutably again")]
    Shared,
}

/// Atomic access state with exclusive locking.
pub struct AccessLock<A: AccessState> {
    state: AtomicU32,
    _access: PhantomData<A>,
}

impl<A: AccessState> AccessLock<A> {
    const LOCKED: u32 = !0;
    const SHARED: u32 = !1;

    /// Create an unlocked lock holding `access`.
    pub fn new(access: A) -> Self {
        Self {
            state: AtomicU32::new(Self::encode(access)),
            _access: PhantomData,
        }
    }

    /// Create a lock that is already held.
    pub fn new_locked() -> Self {
        Self {
            state: AtomicU32::new(Self::LOCKED),
            _access: PhantomData,
        }
    }

    /// Create a lock that is permanently shared.
    pub fn new_shared() -> Self {
        Self {
            state: AtomicU32::new(Self::SHARED),
            _access: PhantomData,
        }
    }

    /// Lock and return the state the resource was left in.
    pub fn try_lock(&self) -> Result<A, AccessLockError> {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            match current {
                Self::LOCKED => return Err(AccessLockError::Locked),
                Self::SHARED => return Err(AccessLockError::Shared),
                raw => match self.state.compare_exchange_weak(
                    raw,
                    Self::LOCKED,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Ok(Self::decode(raw)),
                    Err(actual) => current = actual,
                },
            }
        }
    }

    /// Release the lock, leaving the resource in `access`.
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held.
    pub fn unlock(&self, access: A) {
        self.release(Self::encode(access));
    }

    /// Release the lock into the shared read-only state.
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held.
    pub fn unlock_to_shared(&self) {
        self.release(Self::SHARED);
    }

    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) == Self::LOCKED
    }

    pub fn is_shared(&self) -> bool {
        self.state.load(Ordering::Relaxed) == Self::SHARED
    }

    /// Current state if the lock is neither held nor shared.
    pub fn peek(&self) -> Option<A> {
        match self.state.load(Ordering::Acquire) {
            Self::LOCKED | Self::SHARED => None,
            raw => Some(Self::decode(raw)),
        }
    }

    fn release(&self, raw: u32) {
        if self
            .state
            .compare_exchange(Self::LOCKED, raw, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            panic!("double unlock of access lock");
        }
    }

    fn encode(access: A) -> u32 {
        let raw = access.to_raw();
        assert!(
            raw != Self::LOCKED && raw != Self::SHARED,
            "access state {:?} overlaps the locked or shared marker",
            access
        );
        raw
    }

    fn decode(raw: u32) -> A {
        match A::from_raw(raw) {
            Some(access) => access,
            None => panic!("access lock holds invalid state {}", raw),
        }
    }
}

impl<A: AccessState> fmt::Debug for AccessLock<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.load(Ordering::Relaxed) {
            Self::LOCKED => f.write_str("AccessLock(locked)"),
            Self::SHARED => f.write_str("AccessLock(shared)"),
            raw => write!(f, "AccessLock({:?})", A::from_raw(raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestAccess {
        Idle,
        Busy,
    }

    impl AccessState for TestAccess {
        fn to_raw(self) -> u32 {
            self as u32
        }

        fn from_raw(raw: u32) -> Option<Self> {
            match raw {
                0 => Some(Self::Idle),
                1 => Some(Self::Busy),
                _ => None,
            }
        }
    }

    #[test]
    fn test_lock_returns_previous_state() {
        let lock = AccessLock::new(TestAccess::Busy);
        assert_eq!(lock.try_lock(), Ok(TestAccess::Busy));
        assert!(lock.is_locked());
        assert_eq!(lock.try_lock(), Err(AccessLockError::Locked));

        lock.unlock(TestAccess::Idle);
        assert_eq!(lock.peek(), Some(TestAccess::Idle));
        assert_eq!(lock.try_lock(), Ok(TestAccess::Idle));
    }

    #[test]
    fn test_shared_is_permanent() {
        let lock = AccessLock::new(TestAccess::Idle);
        lock.try_lock().unwrap();
        lock.unlock_to_shared();

        assert!(lock.is_shared());
        assert_eq!(lock.peek(), None);
        assert_eq!(lock.try_lock(), Err(AccessLockError::Shared));
        assert_eq!(lock.try_lock(), Err(AccessLockError::Shared));
    }

    #[test]
    fn test_constructors() {
        assert!(AccessLock::<TestAccess>::new_locked().is_locked());
        assert!(AccessLock::<TestAccess>::new_shared().is_shared());
    }

    #[test]
    #[should_panic(expected = "double unlock")]
    fn test_double_unlock() {
        let lock = AccessLock::new(TestAccess::Idle);
        lock.try_lock().unwrap();
        lock.unlock(TestAccess::Idle);
        lock.unlock(TestAccess::Busy);
    }

    #[test]
    #[should_panic(expected = "double unlock")]
    fn test_unlock_shared() {
        let lock = AccessLock::<TestAccess>::new_shared();
        lock.unlock_to_shared();
    }

    #[test]
    fn test_contended_lock_single_winner() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicUsize;

        let lock = Arc::new(AccessLock::new(TestAccess::Idle));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if lock.try_lock().is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
