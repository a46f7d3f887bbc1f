//! Frames in flight.
//!
//! [`FrameManager`] hands out a [`FrameInFlight`] index per frame and makes
//! sure two frames with the same index never overlap on the GPU, so per-frame
//! resources like upload buffers can be rewritten safely.
//!
//! ```text
//! frames_in_flight = 2
//!
//! Slot 0: [Frame 0] ──► [Frame 2] ──► [Frame 4] ──►
//! Slot 1: [Frame 1] ──► [Frame 3] ──► [Frame 5] ──►
//! ```
//!
//! Starting frame 2 waits for the execution frame 0 returned, but not for
//! frame 1. The CPU records frame N+1 while the GPU still runs frame N.
//!
//! # Example
//!
//! ```
//! use bindless_graphics::{DeviceConfig, FrameManager, GraphicsDevice};
//!
//! let device = GraphicsDevice::new(DeviceConfig::default());
//! let mut frames = FrameManager::new(device, 2);
//!
//! for _ in 0..4 {
//!     frames.new_frame(|frame| {
//!         let ((), pending) = frame.device.execute(|_rec| Ok(())).ok()?;
//!         Some(pending)
//!     });
//! }
//!
//! frames.wait_idle();
//! assert_eq!(frames.frame_count(), 4);
//! ```

use std::sync::Arc;
use std::time::Duration;

use bindless_core::{FrameInFlight, ResourceInFlight, SeedInFlight};

use crate::device::GraphicsDevice;
use crate::execution::PendingExecution;

/// The frame being recorded.
pub struct Frame<'a> {
    pub fif: FrameInFlight<'a>,
    /// Number of frames started before this one.
    pub frame_number: u64,
    pub device: &'a Arc<GraphicsDevice>,
}

impl std::fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("fif", &self.fif)
            .field("frame_number", &self.frame_number)
            .finish()
    }
}

/// Manages multiple frames in flight for CPU-GPU parallelism.
///
/// Owned by a single thread, typically the render thread.
#[derive(Debug)]
pub struct FrameManager {
    device: Arc<GraphicsDevice>,
    frame_id_mod: u32,
    frame_count: u64,
    last_frames: ResourceInFlight<Option<PendingExecution>>,
}

impl FrameManager {
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is 0 or above [`FRAMES_LIMIT`](bindless_core::FRAMES_LIMIT).
    pub fn new(device: Arc<GraphicsDevice>, frames_in_flight: u32) -> Self {
        let seed = SeedInFlight::new(frames_in_flight);
        Self {
            device,
            frame_id_mod: seed.frames_in_flight() - 1,
            frame_count: 0,
            last_frames: ResourceInFlight::new(seed, |_| None),
        }
    }

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    #[inline]
    pub fn seed(&self) -> SeedInFlight {
        self.last_frames.seed()
    }

    /// Total frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn next_frame_id(&self) -> u32 {
        (self.frame_id_mod + 1) % self.seed().frames_in_flight()
    }

    /// Start a new frame.
    ///
    /// Blocks until the last frame with the same frame-in-flight index has
    /// finished, then calls `f`. The execution `f` returns is what the next
    /// frame with this index waits on. Return `None` when nothing was
    /// submitted.
    pub fn new_frame<F>(&mut self, f: F)
    where
        F: FnOnce(&Frame<'_>) -> Option<PendingExecution>,
    {
        let frame_id = self.next_frame_id();
        // SAFETY: the wait below guarantees the last use of this index is done
        let fif = unsafe { FrameInFlight::new(self.seed(), frame_id) };
        if let Some(last) = self.last_frames.index_mut(fif).take() {
            log::trace!("Waiting for last frame in slot {}", frame_id);
            last.wait();
        }
        self.run_frame(frame_id, f);
    }

    /// Like [`new_frame`](Self::new_frame), but gives up after `timeout`.
    ///
    /// Returns `false` without calling `f` or advancing if the slot is still
    /// busy.
    pub fn new_frame_timeout<F>(&mut self, timeout: Duration, f: F) -> bool
    where
        F: FnOnce(&Frame<'_>) -> Option<PendingExecution>,
    {
        let frame_id = self.next_frame_id();
        // SAFETY: the slot is only reused after its last execution completed
        let fif = unsafe { FrameInFlight::new(self.seed(), frame_id) };
        if let Some(last) = self.last_frames.index(fif)
            && !last.wait_timeout(timeout)
        {
            return false;
        }
        self.run_frame(frame_id, f);
        true
    }

    fn run_frame<F>(&mut self, frame_id: u32, f: F)
    where
        F: FnOnce(&Frame<'_>) -> Option<PendingExecution>,
    {
        self.frame_id_mod = frame_id;
        let frame_number = self.frame_count;
        self.frame_count += 1;
        log::trace!("Begin frame {} (slot {})", frame_number, frame_id);

        // SAFETY: the caller waited for the last frame in this slot
        let fif = unsafe { FrameInFlight::new(self.seed(), frame_id) };
        let frame = Frame {
            fif,
            frame_number,
            device: &self.device,
        };
        let pending = f(&frame);
        *self.last_frames.index_mut(fif) = pending;
    }

    /// Block until every frame in flight finished.
    pub fn wait_idle(&self) {
        log::trace!("Waiting for GPU idle ({} slots)", self.seed().frames_in_flight());
        for pending in self.last_frames.iter().flatten() {
            pending.wait();
        }
    }
}

impl From<&FrameManager> for SeedInFlight {
    fn from(value: &FrameManager) -> Self {
        value.seed()
    }
}
