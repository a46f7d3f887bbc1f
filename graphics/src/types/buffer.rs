//! Buffer usage flags, creation parameters and indirect argument layout.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

bitflags! {
    /// What a buffer may be used for, fixed at creation.
    ///
    /// A buffer may only be transitioned into an access state whose
    /// required usage it was created with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Host can read the buffer memory.
        const MAP_READ = 1 << 0;
        /// Host can write the buffer memory.
        const MAP_WRITE = 1 << 1;
        /// Source of transfer commands.
        const TRANSFER_SRC = 1 << 2;
        /// Destination of transfer commands.
        const TRANSFER_DST = 1 << 3;
        /// Buffer can be read and written by shaders.
        const STORAGE_BUFFER = 1 << 4;
        /// Buffer can be bound as a uniform buffer.
        const UNIFORM_BUFFER = 1 << 5;
        /// Index input of indexed draws.
        const INDEX_BUFFER = 1 << 6;
        /// Vertex attribute input.
        const VERTEX_BUFFER = 1 << 7;
        /// Buffer can hold indirect command arguments.
        const INDIRECT_BUFFER = 1 << 8;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parameters of [`GraphicsDevice::create_buffer`](crate::GraphicsDevice::create_buffer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Shown in logs and errors.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label used in errors and logs.
    pub fn name(&self) -> &str {
        self.label.as_deref().unwrap_or("unnamed buffer")
    }
}

// ============================================================================
// Indirect Dispatch Arguments
// ============================================================================

/// Arguments of an indirect compute dispatch.
///
/// Matches the layout of `VkDispatchIndirectCommand`: three `u32` workgroup
/// counts, 12 bytes in total.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct DispatchIndirectArgs {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchIndirectArgs {
    /// Bytes an indirect buffer must hold from its start.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// Arguments of a non-indexed draw, laid out as `VkDrawIndirectCommand`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// `vertex_count` vertices of a single instance.
    pub fn vertices(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count: 1,
            ..Self::default()
        }
    }
}

/// Arguments of an indexed draw, laid out as `VkDrawIndexedIndirectCommand`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// `index_count` indices of a single instance.
    pub fn indices(index_count: u32) -> Self {
        Self {
            index_count,
            instance_count: 1,
            ..Self::default()
        }
    }
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    U16,
    #[default]
    U32,
}

impl IndexFormat {
    pub fn bytes(self) -> u64 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}
