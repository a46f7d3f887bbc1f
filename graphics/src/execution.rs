//! Tracking of submitted work.
//!
//! Every submission gets an [`Execution`]: a timeline semaphore value the queue
//! signals on completion, plus everything the submission must keep alive
//! until then. The [`ExecutionManager`] runs a background thread that sleeps
//! until any semaphore advances, completes the matching executions and wakes
//! whoever waits on them.
//!
//! ```text
//!   execute()            queue                 wait thread
//!   ─────────            ─────                 ───────────
//!   new_execution ──┐
//!   submit ─────────┼──> run commands
//!   submit_for_wait ┘         │
//!                             └─ signal(v) ──> check_completion
//!                                                ├─ drop kept-alive resources
//!                                                └─ wake wakers / waiters
//! ```
//!
//! A [`PendingExecution`] only holds a weak reference. Once an execution
//! completes and nobody waits on it, its semaphore returns to a free pool.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::Duration;

use bindless_core::IndexRangeSet;
use bindless_core::pool::{FreePool, Poolable};
use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;

use crate::resources::{BufferSlot, ImageSlot};
use crate::sync::{self, TimelineSemaphore, WaitNotify};

/// Name of the thread completing executions.
pub const WAIT_THREAD_NAME: &str = "BindlessWaitSemaphoreThread";

/// Semaphore and target value reused across executions.
#[derive(Debug)]
pub(crate) struct ExecutionResource {
    pub(crate) semaphore: Arc<TimelineSemaphore>,
    pub(crate) timeline_value: u64,
}

impl Poolable for ExecutionResource {
    fn reset(&mut self) {
        self.timeline_value += 1;
    }
}

/// Resources a submission uses, released once it completes.
#[derive(Debug, Default)]
pub(crate) struct KeepAlive {
    buffers: Vec<Arc<BufferSlot>>,
    images: Vec<Arc<ImageSlot>>,
    touched: IndexRangeSet,
}

impl KeepAlive {
    pub(crate) fn buffer(&mut self, slot: &Arc<BufferSlot>) {
        let id = slot.id.as_u32();
        if !self.touched.contains(id) {
            self.touched.insert(id);
            self.buffers.push(Arc::clone(slot));
        }
    }

    pub(crate) fn image(&mut self, slot: &Arc<ImageSlot>) {
        let id = slot.id.as_u32();
        if !self.touched.contains(id) {
            self.touched.insert(id);
            self.images.push(Arc::clone(slot));
        }
    }

    pub(crate) fn touched(&self) -> &IndexRangeSet {
        &self.touched
    }

    pub(crate) fn len(&self) -> usize {
        self.buffers.len() + self.images.len()
    }
}

struct ExecutionState {
    keep_alive: Option<KeepAlive>,
    wakers: SmallVec<[Waker; 1]>,
}

/// A submission to the queue.
pub struct Execution {
    manager: Weak<ManagerShared>,
    resource: Option<ExecutionResource>,
    touched: IndexRangeSet,
    /// Only written while `state` is locked, so a check under the lock is consistent.
    completed: AtomicBool,
    state: Mutex<ExecutionState>,
    done: Condvar,
}

impl Execution {
    fn new(manager: Weak<ManagerShared>, resource: ExecutionResource, keep_alive: KeepAlive) -> Self {
        Self {
            manager,
            resource: Some(resource),
            touched: keep_alive.touched().clone(),
            completed: AtomicBool::new(false),
            state: Mutex::new(ExecutionState {
                keep_alive: Some(keep_alive),
                wakers: SmallVec::new(),
            }),
            done: Condvar::new(),
        }
    }

    pub(crate) fn semaphore(&self) -> (&Arc<TimelineSemaphore>, u64) {
        match &self.resource {
            Some(resource) => (&resource.semaphore, resource.timeline_value),
            None => unreachable!("execution resource is only taken on drop"),
        }
    }

    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Ids of every resource this execution uses.
    pub fn touched_resources(&self) -> &IndexRangeSet {
        &self.touched
    }

    /// Number of resources kept alive until completion.
    pub fn kept_alive(&self) -> usize {
        self.state.lock().keep_alive.as_ref().map_or(0, KeepAlive::len)
    }

    fn check_completion(&self) -> bool {
        let (semaphore, value) = self.semaphore();
        if !semaphore.is_reached(value) {
            return false;
        }

        let (keep_alive, wakers) = {
            let mut state = self.state.lock();
            self.completed.store(true, Ordering::Release);
            self.done.notify_all();
            (state.keep_alive.take(), std::mem::take(&mut state.wakers))
        };
        drop(keep_alive);
        for waker in wakers {
            waker.wake();
        }
        log::trace!("Execution on semaphore {} value {} completed", semaphore.id(), value);
        true
    }

    fn wait(&self) {
        if self.completed() {
            return;
        }
        let mut state = self.state.lock();
        while !self.completed() {
            self.done.wait(&mut state);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.completed() {
            return true;
        }
        let mut state = self.state.lock();
        sync::wait_until(&self.done, &mut state, timeout, |_| self.completed())
    }

    fn poll(&self, cx: &mut Context<'_>) -> Poll<()> {
        if self.completed() {
            return Poll::Ready(());
        }
        let mut state = self.state.lock();
        if self.completed() {
            Poll::Ready(())
        } else {
            state.wakers.push(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Execution")
            .field(if self.completed() { &"completed" } else { &"pending" })
            .finish()
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        if let (Some(resource), Some(manager)) = (self.resource.take(), self.manager.upgrade()) {
            manager.free_pool.push(resource);
        }
    }
}

struct ManagerShared {
    free_pool: FreePool<ExecutionResource>,
    submitted: Mutex<Vec<Arc<Execution>>>,
    notify: Arc<WaitNotify>,
    wait_thread: Mutex<(Option<thread::ThreadId>, Option<thread::JoinHandle<()>>)>,
    shutdown: AtomicBool,
    in_flight: AtomicUsize,
    next_semaphore_id: AtomicU64,
    poll_interval: Duration,
}

impl ManagerShared {
    fn wait_thread_main(self: Arc<Self>) {
        log::debug!("{} started", WAIT_THREAD_NAME);
        let mut pending: Vec<Arc<Execution>> = Vec::with_capacity(64);
        loop {
            // Read before collecting so a submit or signal after this point wakes us.
            let seen = self.notify.generation();
            pending.extend(self.submitted.lock().drain(..));

            let before = pending.len();
            pending.retain(|execution| !execution.check_completion());
            self.in_flight.fetch_sub(before - pending.len(), Ordering::AcqRel);

            if pending.is_empty()
                && self.shutdown.load(Ordering::Acquire)
                && self.submitted.lock().is_empty()
            {
                break;
            }
            self.notify.wait_for(seen, self.poll_interval);
        }
        log::debug!("{} stopped", WAIT_THREAD_NAME);
    }
}

/// Owns the free pool and the thread completing executions.
pub struct ExecutionManager {
    shared: Arc<ManagerShared>,
}

impl ExecutionManager {
    /// Create a manager whose wait thread wakes at least every `poll_interval`.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                free_pool: FreePool::new(),
                submitted: Mutex::new(Vec::new()),
                notify: Arc::new(WaitNotify::new()),
                wait_thread: Mutex::new((None, None)),
                shutdown: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                next_semaphore_id: AtomicU64::new(0),
                poll_interval,
            }),
        }
    }

    /// Create an execution keeping `keep_alive` until it completes.
    pub(crate) fn new_execution(&self, keep_alive: KeepAlive) -> Arc<Execution> {
        self.assert_not_in_shutdown();
        let shared = &self.shared;
        let resource = shared.free_pool.pop_or_else(|| {
            let id = shared.next_semaphore_id.fetch_add(1, Ordering::Relaxed);
            ExecutionResource {
                semaphore: Arc::new(TimelineSemaphore::with_notify(id, Arc::clone(&shared.notify))),
                timeline_value: 1,
            }
        });
        Arc::new(Execution::new(Arc::downgrade(shared), resource, keep_alive))
    }

    /// Hand a submitted execution to the wait thread.
    ///
    /// # Panics
    ///
    /// Panics after [`graceful_shutdown`](Self::graceful_shutdown).
    pub(crate) fn submit_for_waiting(&self, execution: Arc<Execution>) {
        self.assert_not_in_shutdown();
        self.start_wait_thread();
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        self.shared.submitted.lock().push(execution);
        self.shared.notify.notify();
    }

    fn start_wait_thread(&self) {
        let mut guard = self.shared.wait_thread.lock();
        if guard.0.is_none() {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(WAIT_THREAD_NAME.to_string())
                .spawn(move || shared.wait_thread_main());
            match spawned {
                Ok(handle) => *guard = (Some(handle.thread().id()), Some(handle)),
                Err(err) => panic!("failed to spawn {}: {}", WAIT_THREAD_NAME, err),
            }
        }
    }

    /// Number of executions submitted but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Number of semaphores waiting for reuse.
    pub fn free_pool_len(&self) -> usize {
        self.shared.free_pool.free_count()
    }

    /// Number of semaphores ever created.
    pub fn semaphores_created(&self) -> usize {
        self.shared.free_pool.created()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    fn assert_not_in_shutdown(&self) {
        if self.is_shut_down() {
            panic!("execution manager is shut down");
        }
    }

    /// Wait for every submitted execution to complete and stop the wait thread.
    ///
    /// # Panics
    ///
    /// Panics if called on the wait thread itself.
    pub fn graceful_shutdown(&self) {
        let mut guard = self.shared.wait_thread.lock();
        if let Some(thread_id) = guard.0
            && thread_id == thread::current().id()
        {
            panic!("graceful_shutdown() must not be called in {}", WAIT_THREAD_NAME);
        }
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(handle) = guard.1.take() {
            self.shared.notify.notify();
            if handle.join().is_err() {
                log::error!("{} panicked", WAIT_THREAD_NAME);
            }
        }
    }
}

impl fmt::Debug for ExecutionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionManager")
            .field("in_flight", &self.in_flight())
            .field("free_pool", &self.free_pool_len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl Drop for ExecutionManager {
    fn drop(&mut self) {
        self.graceful_shutdown();
    }
}

/// Handle to a submitted execution.
///
/// Cheap to clone, and does not keep the execution alive. Await it, poll
/// [`completed`](Self::completed) or block on [`wait`](Self::wait).
#[derive(Clone, Default)]
pub struct PendingExecution {
    execution: Option<Weak<Execution>>,
}

impl PendingExecution {
    pub(crate) fn new(execution: &Arc<Execution>) -> Self {
        Self {
            execution: Some(Arc::downgrade(execution)),
        }
    }

    /// A handle that is already complete.
    pub fn new_completed() -> Self {
        Self { execution: None }
    }

    fn upgrade(&self) -> Option<Arc<Execution>> {
        self.execution.as_ref().and_then(Weak::upgrade)
    }

    pub fn completed(&self) -> bool {
        self.upgrade().is_none_or(|execution| execution.completed())
    }

    /// Block until the execution completes.
    ///
    /// With a manual queue, this blocks until someone processes the queue.
    pub fn wait(&self) {
        if let Some(execution) = self.upgrade() {
            execution.wait();
        }
    }

    /// Block until the execution completes or `timeout` elapses.
    ///
    /// Returns `true` if completed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.upgrade()
            .is_none_or(|execution| execution.wait_timeout(timeout))
    }

    /// Ids of the resources the execution uses, empty once it was released.
    pub fn touched_resources(&self) -> IndexRangeSet {
        self.upgrade()
            .map(|execution| execution.touched_resources().clone())
            .unwrap_or_default()
    }

    /// Number of resources still kept alive by the execution.
    pub fn kept_alive(&self) -> usize {
        self.upgrade().map_or(0, |execution| execution.kept_alive())
    }
}

impl fmt::Debug for PendingExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PendingExecution")
            .field(if self.completed() { &"completed" } else { &"pending" })
            .finish()
    }
}

impl Future for PendingExecution {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.upgrade() {
            Some(execution) => execution.poll(cx),
            None => Poll::Ready(()),
        }
    }
}

static_assertions::assert_impl_all!(ExecutionManager: Send, Sync);
static_assertions::assert_impl_all!(PendingExecution: Send, Sync);

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn manager() -> ExecutionManager {
        ExecutionManager::new(Duration::from_millis(5))
    }

    fn submit(manager: &ExecutionManager) -> (Arc<TimelineSemaphore>, u64, PendingExecution) {
        let execution = manager.new_execution(KeepAlive::default());
        let (semaphore, value) = execution.semaphore();
        let (semaphore, value) = (Arc::clone(semaphore), value);
        let pending = PendingExecution::new(&execution);
        manager.submit_for_waiting(execution);
        (semaphore, value, pending)
    }

    #[test]
    fn test_new_completed() {
        let pending = PendingExecution::new_completed();
        assert!(pending.completed());
        assert!(pending.wait_timeout(Duration::ZERO));
        pending.wait();
    }

    #[test]
    fn test_completes_after_signal() {
        let manager = manager();
        let (semaphore, value, pending) = submit(&manager);

        assert!(!pending.completed());
        assert!(!pending.wait_timeout(Duration::from_millis(10)));

        semaphore.signal(value);
        pending.wait();
        assert!(pending.completed());
    }

    #[test]
    fn test_resource_returns_to_pool() {
        let manager = manager();
        let (semaphore, value, pending) = submit(&manager);
        semaphore.signal(value);
        pending.wait();

        // The waiter's temporary strong reference may still be dropping.
        let deadline = Instant::now() + Duration::from_secs(5);
        while manager.free_pool_len() == 0 && Instant::now() < deadline {
            thread::yield_now();
        }
        assert_eq!(manager.free_pool_len(), 1);

        let (semaphore2, value2, _pending) = submit(&manager);
        assert_eq!(semaphore2.id(), semaphore.id());
        assert_eq!(value2, value + 1);
        assert_eq!(manager.semaphores_created(), 1);
        semaphore2.signal(value2);
    }

    #[test]
    fn test_in_flight_count() {
        let manager = manager();
        let (a, a_value, a_pending) = submit(&manager);
        let (b, b_value, b_pending) = submit(&manager);
        assert_eq!(manager.in_flight(), 2);

        b.signal(b_value);
        b_pending.wait();
        assert!(!a_pending.completed());

        a.signal(a_value);
        a_pending.wait();
        manager.graceful_shutdown();
        assert_eq!(manager.in_flight(), 0);
    }

    #[test]
    fn test_future_resolves() {
        use std::task::Wake;

        struct Flag(AtomicBool);
        impl Wake for Flag {
            fn wake(self: Arc<Self>) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let manager = manager();
        let (semaphore, value, mut pending) = submit(&manager);

        let flag = Arc::new(Flag(AtomicBool::new(false)));
        let waker = Waker::from(Arc::clone(&flag));
        let mut cx = Context::from_waker(&waker);
        assert!(Pin::new(&mut pending).poll(&mut cx).is_pending());

        semaphore.signal(value);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !flag.0.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(flag.0.load(Ordering::SeqCst));
        assert!(Pin::new(&mut pending).poll(&mut cx).is_ready());
    }

    #[test]
    fn test_wait_timeout_without_limit() {
        let manager = manager();
        let (semaphore, value, pending) = submit(&manager);

        let signaler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            semaphore.signal(value);
        });
        assert!(pending.wait_timeout(Duration::MAX));
        assert!(pending.completed());
        signaler.join().unwrap();
    }

    #[test]
    fn test_shutdown_waits_for_pending() {
        let manager = manager();
        let (semaphore, value, pending) = submit(&manager);

        let signaler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            semaphore.signal(value);
        });
        manager.graceful_shutdown();
        assert!(pending.completed());
        signaler.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "shut down")]
    fn test_submit_after_shutdown_panics() {
        let manager = manager();
        manager.graceful_shutdown();
        let _ = manager.new_execution(KeepAlive::default());
    }
}
