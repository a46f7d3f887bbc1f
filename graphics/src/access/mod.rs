//! Access states of buffers and images.
//!
//! Every mutable resource is always in exactly one access state, stored in its
//! [`AccessLock`](bindless_core::AccessLock). Moving between states records a
//! barrier. The state enums live here, the zero-sized access types used as
//! generic parameters live in [`types`].

mod types;
#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

pub use types::*;

use bindless_core::AccessState;

use crate::types::{BufferUsage, ImageUsage};

/// How a buffer is accessed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferAccess {
    /// Contents are undefined and may be discarded.
    Undefined,
    /// Any access, read and write.
    General,
    /// Source of a copy.
    TransferRead,
    /// Destination of a copy.
    TransferWrite,
    /// Read by shaders.
    ShaderRead,
    /// Written by shaders. Prefer [`BufferAccess::ShaderReadWrite`].
    ShaderWrite,
    /// Read and written by shaders.
    ShaderReadWrite,
    /// Any read access.
    GeneralRead,
    /// Any write access.
    GeneralWrite,
    /// Read or written by the host.
    HostAccess,
    /// Read as indirect command arguments.
    IndirectCommandRead,
    /// Read as index buffer.
    IndexRead,
    /// Read as vertex attributes.
    VertexAttributeRead,
}

impl BufferAccess {
    const ALL: [Self; 13] = [
        Self::Undefined,
        Self::General,
        Self::TransferRead,
        Self::TransferWrite,
        Self::ShaderRead,
        Self::ShaderWrite,
        Self::ShaderReadWrite,
        Self::GeneralRead,
        Self::GeneralWrite,
        Self::HostAccess,
        Self::IndirectCommandRead,
        Self::IndexRead,
        Self::VertexAttributeRead,
    ];

    /// Usage flags a buffer needs to be transitioned into this state.
    ///
    /// This only gates the transition. General states need no usage, the
    /// operation consuming the buffer checks its own requirements.
    pub fn required_usage(self) -> BufferUsage {
        match self {
            Self::Undefined
            | Self::General
            | Self::GeneralRead
            | Self::GeneralWrite
            | Self::HostAccess => BufferUsage::empty(),
            Self::TransferRead => BufferUsage::TRANSFER_SRC,
            Self::TransferWrite => BufferUsage::TRANSFER_DST,
            Self::ShaderRead | Self::ShaderWrite | Self::ShaderReadWrite => {
                BufferUsage::STORAGE_BUFFER
            }
            Self::IndirectCommandRead => BufferUsage::INDIRECT_BUFFER,
            Self::IndexRead => BufferUsage::INDEX_BUFFER,
            Self::VertexAttributeRead => BufferUsage::VERTEX_BUFFER,
        }
    }

    /// Check if this state permits reads.
    pub fn is_read(self) -> bool {
        !matches!(
            self,
            Self::Undefined | Self::TransferWrite | Self::ShaderWrite | Self::GeneralWrite
        )
    }

    /// Check if this state permits writes.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::General
                | Self::TransferWrite
                | Self::ShaderWrite
                | Self::ShaderReadWrite
                | Self::GeneralWrite
                | Self::HostAccess
        )
    }

    /// Every access state, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter()
    }
}

impl AccessState for BufferAccess {
    fn to_raw(self) -> u32 {
        self as u32
    }

    fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

/// How an image is accessed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAccess {
    /// Contents are undefined and may be discarded.
    Undefined,
    /// Any access, read and write.
    General,
    /// Source of a copy.
    TransferRead,
    /// Destination of a copy.
    TransferWrite,
    /// Read as storage image. Prefer [`ImageAccess::SampledRead`] or [`ImageAccess::StorageReadWrite`].
    StorageRead,
    /// Written as storage image. Prefer [`ImageAccess::StorageReadWrite`].
    StorageWrite,
    /// Read and written as storage image.
    StorageReadWrite,
    /// Any read access.
    GeneralRead,
    /// Any write access.
    GeneralWrite,
    /// Sampled by shaders.
    SampledRead,
    /// Rendered to as color attachment.
    ColorAttachment,
    /// Rendered to as depth/stencil attachment.
    DepthStencilAttachment,
    /// Ready for presentation.
    Present,
}

impl ImageAccess {
    const ALL: [Self; 13] = [
        Self::Undefined,
        Self::General,
        Self::TransferRead,
        Self::TransferWrite,
        Self::StorageRead,
        Self::StorageWrite,
        Self::StorageReadWrite,
        Self::GeneralRead,
        Self::GeneralWrite,
        Self::SampledRead,
        Self::ColorAttachment,
        Self::DepthStencilAttachment,
        Self::Present,
    ];

    /// Usage flags an image needs to be transitioned into this state.
    pub fn required_usage(self) -> ImageUsage {
        match self {
            Self::Undefined | Self::General | Self::GeneralRead | Self::GeneralWrite => {
                ImageUsage::empty()
            }
            Self::TransferRead => ImageUsage::TRANSFER_SRC,
            Self::TransferWrite => ImageUsage::TRANSFER_DST,
            Self::StorageRead | Self::StorageWrite | Self::StorageReadWrite => ImageUsage::STORAGE,
            Self::SampledRead => ImageUsage::SAMPLED,
            Self::ColorAttachment => ImageUsage::COLOR_ATTACHMENT,
            Self::DepthStencilAttachment => ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            Self::Present => ImageUsage::SWAPCHAIN,
        }
    }

    /// Check if this state permits reads.
    pub fn is_read(self) -> bool {
        !matches!(
            self,
            Self::Undefined | Self::TransferWrite | Self::StorageWrite | Self::GeneralWrite
        )
    }

    /// Check if this state permits writes.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::General
                | Self::TransferWrite
                | Self::StorageWrite
                | Self::StorageReadWrite
                | Self::GeneralWrite
                | Self::ColorAttachment
                | Self::DepthStencilAttachment
        )
    }

    /// Every access state, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter()
    }
}

impl AccessState for ImageAccess {
    fn to_raw(self) -> u32 {
        self as u32
    }

    fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_raw_round_trip_covers_every_state() {
        for access in BufferAccess::all() {
            assert_eq!(BufferAccess::from_raw(access.to_raw()), Some(access));
        }
        for access in ImageAccess::all() {
            assert_eq!(ImageAccess::from_raw(access.to_raw()), Some(access));
        }
        assert_eq!(BufferAccess::from_raw(13), None);
        assert_eq!(ImageAccess::from_raw(u32::MAX), None);
    }

    #[rstest]
    #[case(BufferAccess::TransferRead, BufferUsage::TRANSFER_SRC)]
    #[case(BufferAccess::TransferWrite, BufferUsage::TRANSFER_DST)]
    #[case(BufferAccess::ShaderReadWrite, BufferUsage::STORAGE_BUFFER)]
    #[case(BufferAccess::IndirectCommandRead, BufferUsage::INDIRECT_BUFFER)]
    #[case(BufferAccess::IndexRead, BufferUsage::INDEX_BUFFER)]
    #[case(BufferAccess::VertexAttributeRead, BufferUsage::VERTEX_BUFFER)]
    #[case(BufferAccess::General, BufferUsage::empty())]
    #[case(BufferAccess::HostAccess, BufferUsage::empty())]
    fn test_buffer_required_usage(#[case] access: BufferAccess, #[case] usage: BufferUsage) {
        assert_eq!(access.required_usage(), usage);
    }

    #[rstest]
    #[case(ImageAccess::TransferRead, ImageUsage::TRANSFER_SRC)]
    #[case(ImageAccess::TransferWrite, ImageUsage::TRANSFER_DST)]
    #[case(ImageAccess::StorageRead, ImageUsage::STORAGE)]
    #[case(ImageAccess::SampledRead, ImageUsage::SAMPLED)]
    #[case(ImageAccess::ColorAttachment, ImageUsage::COLOR_ATTACHMENT)]
    #[case(ImageAccess::DepthStencilAttachment, ImageUsage::DEPTH_STENCIL_ATTACHMENT)]
    #[case(ImageAccess::Present, ImageUsage::SWAPCHAIN)]
    #[case(ImageAccess::GeneralRead, ImageUsage::empty())]
    fn test_image_required_usage(#[case] access: ImageAccess, #[case] usage: ImageUsage) {
        assert_eq!(access.required_usage(), usage);
    }

    #[test]
    fn test_read_write_classification() {
        assert!(BufferAccess::ShaderReadWrite.is_read());
        assert!(BufferAccess::ShaderReadWrite.is_write());
        assert!(!BufferAccess::TransferWrite.is_read());
        assert!(!BufferAccess::GeneralRead.is_write());
        assert!(!BufferAccess::Undefined.is_read());

        assert!(ImageAccess::ColorAttachment.is_write());
        assert!(ImageAccess::SampledRead.is_read());
        assert!(!ImageAccess::SampledRead.is_write());
        assert!(!ImageAccess::Present.is_write());
    }
}
