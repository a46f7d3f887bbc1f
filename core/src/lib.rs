//! # Bindless Core
//!
//! Platform independent building blocks of the bindless graphics layer:
//!
//! - [`frame_in_flight`]: seeds, frame indices and per-frame resources
//! - [`access_lock`]: a single atomic word guarding the access state of a resource
//! - [`range_set`]: coalescing sets of resource indices
//! - [`pool`]: free lists for reusable per-submission state

pub mod access_lock;
pub mod frame_in_flight;
pub mod pool;
pub mod range_set;

pub use access_lock::{AccessLock, AccessLockError, AccessState};
pub use frame_in_flight::{FRAMES_LIMIT, FrameInFlight, ResourceInFlight, SeedInFlight};
pub use range_set::IndexRangeSet;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the crate version.
pub fn init() {
    log::info!("Bindless Core v{} initialized", VERSION);
}
