//! Plain data types describing graphics resources.
//!
//! Usage flags, formats and descriptor structs used when creating buffers
//! and images.

mod buffer;
mod common;
mod image;

pub use buffer::{
    BufferDescriptor, BufferUsage, DispatchIndirectArgs, DrawIndexedIndirectArgs, DrawIndirectArgs, IndexFormat,
};
pub use common::Extent3d;
pub use image::{ImageDescriptor, ImageFormat, ImageUsage};
