//! Tracked GPU resources.
//!
//! Resources are created by [`GraphicsDevice`] and come in two flavors:
//! - [`MutBuffer`] / [`MutImage`]: unique handles that can be accessed
//!   mutably in a recording, moving between access states
//! - [`SharedBuffer`] / [`SharedImage`]: cloneable read-only handles that are
//!   permanently in the general read state
//!
//! Both point at a reference-counted slot that also keeps the resource alive
//! while an execution using it is pending.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice

mod buffer;
mod image;

pub use buffer::{MutBuffer, SharedBuffer, WeakBuffer};
pub use image::{MutImage, SharedImage, WeakImage};

pub(crate) use buffer::BufferSlot;
pub(crate) use image::ImageSlot;

use std::fmt;

/// Device-unique id of a buffer or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u32);

impl ResourceId {
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
