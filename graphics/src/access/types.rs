//! Zero-sized access types.
//!
//! Recording functions are generic over these types and use the capability
//! traits as bounds, so passing a buffer in the wrong state fails to compile:
//!
//! ```ignore
//! // TransferRead implements TransferReadable, ShaderRead does not
//! rec.copy_buffer_to_buffer(&src_in_transfer_read, &dst_in_transfer_write)?;
//! ```

// Implementing these traits for a type changes what the recording functions
// accept, so they are unsafe to implement.
#![allow(clippy::missing_safety_doc)]

use super::{BufferAccess, ImageAccess};

/// Access type usable with buffers.
pub unsafe trait BufferAccessType {
    const BUFFER_ACCESS: BufferAccess;
}

/// Access type usable with images.
pub unsafe trait ImageAccessType {
    const IMAGE_ACCESS: ImageAccess;
}

/// Shaders may read the buffer or storage image.
pub unsafe trait ShaderReadable {}

/// Shaders may write the buffer or storage image.
pub unsafe trait ShaderWriteable {}

/// Shaders may read and write the buffer or storage image.
pub unsafe trait ShaderReadWriteable: ShaderReadable + ShaderWriteable {}

/// Shaders may sample the image.
pub unsafe trait ShaderSampleable {}

/// Transfer operations may read from it.
pub unsafe trait TransferReadable {}

/// Transfer operations may write to it.
pub unsafe trait TransferWriteable {}

/// May be read as index buffer.
pub unsafe trait IndexReadable {}

/// May be read as indirect command arguments.
pub unsafe trait IndirectCommandReadable {}

macro_rules! access_type {
    (@impl $name:ident: BufferAccess::$access:ident $($rest:tt)*) => {
        unsafe impl BufferAccessType for $name {
            const BUFFER_ACCESS: BufferAccess = BufferAccess::$access;
        }
        access_type!(@impl $name: $($rest)*);
    };
    (@impl $name:ident: ImageAccess::$access:ident $($rest:tt)*) => {
        unsafe impl ImageAccessType for $name {
            const IMAGE_ACCESS: ImageAccess = ImageAccess::$access;
        }
        access_type!(@impl $name: $($rest)*);
    };
    (@impl $name:ident: $capability:ident $($rest:tt)*) => {
        unsafe impl $capability for $name {}
        access_type!(@impl $name: $($rest)*);
    };
    (@impl $name:ident:) => {};
    ($(#[$attr:meta])* $vis:vis $name:ident: $($rest:tt)*) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name;
        access_type!(@impl $name: $($rest)*);
    };
}

// Buffer and image
access_type!(pub Undefined: BufferAccess::Undefined ImageAccess::Undefined);
access_type!(pub General: BufferAccess::General ImageAccess::General ShaderReadable ShaderWriteable
    ShaderReadWriteable ShaderSampleable TransferReadable TransferWriteable IndexReadable
    IndirectCommandReadable);
access_type!(pub GeneralRead: BufferAccess::GeneralRead ImageAccess::GeneralRead ShaderReadable
    ShaderSampleable TransferReadable IndexReadable IndirectCommandReadable);
access_type!(pub GeneralWrite: BufferAccess::GeneralWrite ImageAccess::GeneralWrite ShaderWriteable
    TransferWriteable);
access_type!(pub TransferRead: BufferAccess::TransferRead ImageAccess::TransferRead TransferReadable);
access_type!(pub TransferWrite: BufferAccess::TransferWrite ImageAccess::TransferWrite TransferWriteable);

// Buffer only
access_type!(pub ShaderRead: BufferAccess::ShaderRead ShaderReadable);
access_type! {
    /// Prefer [`ShaderReadWrite`].
    pub ShaderWrite: BufferAccess::ShaderWrite ShaderWriteable
}
access_type!(pub ShaderReadWrite: BufferAccess::ShaderReadWrite ShaderReadable ShaderWriteable
    ShaderReadWriteable);
access_type!(pub HostAccess: BufferAccess::HostAccess);
access_type!(pub IndirectCommandRead: BufferAccess::IndirectCommandRead IndirectCommandReadable);
access_type!(pub IndexRead: BufferAccess::IndexRead IndexReadable);
access_type!(pub VertexAttributeRead: BufferAccess::VertexAttributeRead);

// Image only
access_type! {
    /// Prefer [`SampledRead`] or [`StorageReadWrite`].
    pub StorageRead: ImageAccess::StorageRead ShaderReadable
}
access_type! {
    /// Prefer [`StorageReadWrite`].
    pub StorageWrite: ImageAccess::StorageWrite ShaderWriteable
}
access_type!(pub StorageReadWrite: ImageAccess::StorageReadWrite ShaderReadable ShaderWriteable
    ShaderReadWriteable);
access_type!(pub SampledRead: ImageAccess::SampledRead ShaderSampleable);
access_type!(pub ColorAttachment: ImageAccess::ColorAttachment);
access_type!(pub DepthStencilAttachment: ImageAccess::DepthStencilAttachment);
access_type!(pub Present: ImageAccess::Present);
