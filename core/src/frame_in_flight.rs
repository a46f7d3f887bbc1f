//! Frames in flight.
//!
//! Three types cooperate to let the CPU prepare frame N+1 while the GPU is
//! still executing frame N:
//!
//! - [`SeedInFlight`]: the configuration of one frame-in-flight system. It
//!   records how many frames may be in flight (at most [`FRAMES_LIMIT`]) and a
//!   process-unique seed so that indices of different systems never mix.
//! - [`FrameInFlight`]: the index of the frame currently being recorded. It
//!   carries a lifetime so it cannot escape the scope that created it.
//! - [`ResourceInFlight`]: one resource per frame in flight, stored inline and
//!   indexed by a [`FrameInFlight`] of the same seed.
//!
//! ```text
//!  u16 value layout
//!  ┌──────────────┬──────────────┬──────────────┐
//!  │ 15 ..... 8   │ 7 ...... 4   │ 3 ...... 0   │
//!  │ seed         │ frames - 1   │ frame index  │
//!  └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! Because every [`FrameInFlight`] is checked against its seed on creation,
//! indexing a [`ResourceInFlight`] only needs to compare seeds.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};

use smallvec::SmallVec;

/// Maximum number of frames that may be in flight at the same time.
pub const FRAMES_LIMIT: u32 = 3;

const FRAMES_INLINE: usize = FRAMES_LIMIT as usize;

static SEED_COUNTER: AtomicU8 = AtomicU8::new(42);

/// Configuration of a frame-in-flight system.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct SeedInFlight(u16);

impl SeedInFlight {
    /// Create a new seed for `frames_in_flight` frames.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is 0 or larger than [`FRAMES_LIMIT`].
    #[must_use]
    pub fn new(frames_in_flight: u32) -> Self {
        let seed = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);
        // SAFETY: the global counter hands out each seed once per wrap-around
        unsafe { Self::assemble(seed, frames_in_flight) }
    }

    /// Assemble a seed from its parts.
    ///
    /// # Safety
    ///
    /// The seed must be unique among all live frame-in-flight systems.
    /// [`SeedInFlight::new`] guarantees that.
    #[must_use]
    pub unsafe fn assemble(seed: u8, frames_in_flight: u32) -> Self {
        assert!(frames_in_flight != 0, "frames_in_flight must not be 0");
        assert!(
            frames_in_flight <= FRAMES_LIMIT,
            "frames_in_flight of {} is over FRAMES_LIMIT {}",
            frames_in_flight,
            FRAMES_LIMIT
        );
        let mut value = (seed as u16) << 8;
        value |= (((frames_in_flight - 1) as u16) & 0xF) << 4;
        Self(value)
    }

    /// Number of frames that may be in flight.
    #[inline]
    pub fn frames_in_flight(&self) -> u32 {
        ((self.0 >> 4) & 0xF) as u32 + 1
    }

    #[inline]
    fn seed_u8(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Iterate over every frame index of this seed.
    ///
    /// # Safety
    ///
    /// The yielded frames can index resources that may currently be in use
    /// by the GPU.
    pub unsafe fn iter(&self) -> impl Iterator<Item = FrameInFlight<'static>> {
        let seed = *self;
        // SAFETY: forwarded to the caller
        (0..self.frames_in_flight()).map(move |index| unsafe { FrameInFlight::new(seed, index) })
    }
}

impl fmt::Debug for SeedInFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedInFlight")
            .field("seed", &self.seed_u8())
            .field("frames_in_flight", &self.frames_in_flight())
            .finish()
    }
}

/// Index of a frame that is in flight.
///
/// The lifetime ties the index to the scope that is allowed to use it, usually
/// the closure passed to a frame manager.
#[derive(Copy, Clone)]
pub struct FrameInFlight<'a> {
    value: u16,
    _scope: PhantomData<&'a ()>,
}

impl<'a> FrameInFlight<'a> {
    /// Create the frame index `frame_index` of `seed`.
    ///
    /// # Safety
    ///
    /// Resources indexed with the returned value must not be in use by the
    /// GPU. Two frames with the same index must never execute concurrently.
    #[inline]
    pub unsafe fn new(seed: impl Into<SeedInFlight>, frame_index: u32) -> Self {
        let seed = seed.into();
        assert!(
            frame_index < seed.frames_in_flight(),
            "frame index {} out of range for {} frames in flight",
            frame_index,
            seed.frames_in_flight()
        );
        Self {
            value: seed.0 | (frame_index as u16 & 0xF),
            _scope: PhantomData,
        }
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        (self.value & 0xF) as usize
    }

    #[inline]
    pub fn seed(&self) -> SeedInFlight {
        SeedInFlight(self.value & 0xFFF0)
    }
}

impl fmt::Debug for FrameInFlight<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameInFlight")
            .field("seed", &self.seed().seed_u8())
            .field("frames_in_flight", &self.seed().frames_in_flight())
            .field("frame_index", &self.frame_index())
            .finish()
    }
}

impl From<FrameInFlight<'_>> for usize {
    fn from(value: FrameInFlight<'_>) -> Self {
        value.frame_index()
    }
}

impl From<FrameInFlight<'_>> for u32 {
    fn from(value: FrameInFlight<'_>) -> Self {
        value.frame_index() as u32
    }
}

impl From<&FrameInFlight<'_>> for SeedInFlight {
    fn from(value: &FrameInFlight<'_>) -> Self {
        value.seed()
    }
}

/// One resource per frame in flight.
///
/// Access goes through [`index`](Self::index) and [`index_mut`](Self::index_mut)
/// rather than the `Index` traits: the returned reference must not outlive the
/// [`FrameInFlight`] used to obtain it, which the trait signatures cannot express.
#[derive(Debug)]
pub struct ResourceInFlight<T> {
    resources: SmallVec<[T; FRAMES_INLINE]>,
    seed: SeedInFlight,
}

impl<T> ResourceInFlight<T> {
    /// Create one resource per frame by calling `f` with each frame index.
    #[must_use]
    pub fn new<F>(seed: impl Into<SeedInFlight>, mut f: F) -> Self
    where
        F: FnMut(FrameInFlight<'_>) -> T,
    {
        let seed = seed.into();
        let resources = (0..seed.frames_in_flight())
            // SAFETY: the resources being created cannot be in use yet
            .map(|index| f(unsafe { FrameInFlight::new(seed, index) }))
            .collect();
        Self { resources, seed }
    }

    /// Like [`new`](Self::new), but stops at the first error of `f`.
    pub fn try_new<E, F>(seed: impl Into<SeedInFlight>, mut f: F) -> Result<Self, E>
    where
        F: FnMut(FrameInFlight<'_>) -> Result<T, E>,
    {
        let seed = seed.into();
        let resources = (0..seed.frames_in_flight())
            // SAFETY: the resources being created cannot be in use yet
            .map(|index| f(unsafe { FrameInFlight::new(seed, index) }))
            .collect::<Result<_, E>>()?;
        Ok(Self { resources, seed })
    }

    /// Create from an array holding exactly one resource per frame.
    ///
    /// # Panics
    ///
    /// Panics if `N` differs from the seed's frame count.
    #[must_use]
    pub fn new_array<const N: usize>(seed: impl Into<SeedInFlight>, resources: [T; N]) -> Self {
        let seed = seed.into();
        assert_eq!(
            seed.frames_in_flight() as usize,
            N,
            "resource count does not match frames in flight"
        );
        Self {
            resources: resources.into_iter().collect(),
            seed,
        }
    }

    #[inline]
    pub fn seed(&self) -> SeedInFlight {
        self.seed
    }

    /// Resource belonging to `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame` belongs to a different seed.
    #[must_use]
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index<'a>(&'a self, frame: FrameInFlight<'a>) -> &'a T {
        assert_eq!(self.seed, frame.seed(), "frame of a different seed");
        &self.resources[frame.frame_index()]
    }

    /// Mutable resource belonging to `frame`.
    #[must_use]
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index_mut<'a>(&'a mut self, frame: FrameInFlight<'a>) -> &'a mut T {
        assert_eq!(self.seed, frame.seed(), "frame of a different seed");
        &mut self.resources[frame.frame_index()]
    }

    /// Iterate all resources regardless of frame.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.resources.iter()
    }
}

impl<T> From<&ResourceInFlight<T>> for SeedInFlight {
    fn from(value: &ResourceInFlight<T>) -> Self {
        value.seed()
    }
}
