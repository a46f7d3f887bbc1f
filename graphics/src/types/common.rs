//! Shared geometry types.

/// Three-dimensional size of an image, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    /// Create a 2D extent with a depth of 1.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    pub fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Total number of texels.
    pub fn texel_count(&self) -> u64 {
        self.checked_texel_count().unwrap_or(u64::MAX)
    }

    /// Total number of texels, `None` if it does not fit a `u64`.
    pub fn checked_texel_count(&self) -> Option<u64> {
        (self.width as u64)
            .checked_mul(self.height as u64)?
            .checked_mul(self.depth as u64)
    }

    /// Largest of the three dimensions.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height).max(self.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.texel_count() == 0
    }
}

impl Default for Extent3d {
    fn default() -> Self {
        Self::new_2d(1, 1)
    }
}
