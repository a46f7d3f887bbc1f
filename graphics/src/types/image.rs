//! Image formats, usage flags and creation parameters.

use super::Extent3d;
use bitflags::bitflags;

/// Texel format of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ImageFormat {
    R8Unorm,
    R8Uint,
    R16Float,
    Rg8Unorm,
    R32Float,
    R32Uint,
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    Depth16Unorm,
    Depth32Float,
}

impl ImageFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth16Unorm | Self::Depth32Float)
    }

    /// Size in bytes of a single texel.
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::R8Uint => 1,
            Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// What an image may be used for, fixed at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Image can be copied from.
        const TRANSFER_SRC = 1 << 0;
        /// Image can be copied to.
        const TRANSFER_DST = 1 << 1;
        /// Image can be sampled in a shader.
        const SAMPLED = 1 << 2;
        /// Image can be read and written as a storage image.
        const STORAGE = 1 << 3;
        /// Image can be used as a color attachment.
        const COLOR_ATTACHMENT = 1 << 4;
        /// Image can be used as a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        /// Image belongs to a swapchain and can be presented.
        const SWAPCHAIN = 1 << 6;
    }
}

impl Default for ImageUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parameters of [`GraphicsDevice::create_image`](crate::GraphicsDevice::create_image).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ImageDescriptor {
    pub label: Option<String>,
    pub extent: Extent3d,
    pub format: ImageFormat,
    /// Usage flags.
    pub usage: ImageUsage,
}

impl ImageDescriptor {
    /// Create a new 2D image descriptor.
    pub fn new_2d(width: u32, height: u32, format: ImageFormat, usage: ImageUsage) -> Self {
        Self {
            label: None,
            extent: Extent3d::new_2d(width, height),
            format,
            usage,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label used in errors and logs.
    pub fn name(&self) -> &str {
        self.label.as_deref().unwrap_or("unnamed image")
    }

    /// Size in bytes of the tightly packed image contents.
    ///
    /// Saturates at `u64::MAX`, see [`checked_byte_size`](Self::checked_byte_size).
    pub fn byte_size(&self) -> u64 {
        self.checked_byte_size().unwrap_or(u64::MAX)
    }

    pub fn checked_byte_size(&self) -> Option<u64> {
        self.extent
            .checked_texel_count()?
            .checked_mul(self.format.bytes_per_texel() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sizes() {
        assert_eq!(ImageFormat::R8Unorm.bytes_per_texel(), 1);
        assert_eq!(ImageFormat::Rgba8Unorm.bytes_per_texel(), 4);
        assert_eq!(ImageFormat::Rgba32Float.bytes_per_texel(), 16);
        assert!(ImageFormat::Depth32Float.is_depth());
        assert!(!ImageFormat::Rgba16Float.is_depth());
    }

    #[test]
    fn test_descriptor_byte_size() {
        let desc = ImageDescriptor::new_2d(8, 4, ImageFormat::Rgba16Float, ImageUsage::SAMPLED);
        assert_eq!(desc.byte_size(), 8 * 4 * 8);
    }

    #[test]
    fn test_byte_size_overflow() {
        let desc = ImageDescriptor {
            extent: Extent3d::new_3d(u32::MAX, u32::MAX, u32::MAX),
            ..ImageDescriptor::new_2d(1, 1, ImageFormat::Rgba32Float, ImageUsage::SAMPLED)
        };
        assert_eq!(desc.checked_byte_size(), None);
        assert_eq!(desc.byte_size(), u64::MAX);
    }
}
