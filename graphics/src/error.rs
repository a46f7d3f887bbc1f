//! Graphics error types.
//!
//! [`GraphicsError`] covers device level failures such as invalid resource
//! descriptors. Errors raised while recording commands are finer grained:
//! [`AccessError`] for resource state and usage violations, [`CopyError`] for
//! mismatched transfer regions and [`RenderingError`] for attachments and
//! draws. [`RecordingError`] wraps them.

use std::fmt;

use bindless_core::AccessLockError;
use thiserror::Error;

use crate::types::{BufferUsage, Extent3d, ImageFormat, ImageUsage};

/// Failures reported by the device outside of recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// A requested feature is not supported.
    FeatureNotSupported(String),
    /// A resource exceeds the device capabilities.
    LimitExceeded(String),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// A resource was accessed in a way its state or usage forbids.
    Access(AccessError),
    /// The device was shut down.
    DeviceLost,
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::FeatureNotSupported(msg) => write!(f, "feature not supported: {msg}"),
            Self::LimitExceeded(msg) => write!(f, "device limit exceeded: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::Access(err) => write!(f, "access error: {err}"),
            Self::DeviceLost => write!(f, "device was shut down"),
        }
    }
}

impl std::error::Error for GraphicsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccessError> for GraphicsError {
    fn from(err: AccessError) -> Self {
        Self::Access(err)
    }
}

/// A resource was used in a state or with a usage it does not allow.
///
/// These usually indicate a programming error in the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AccessError {
    #[error("{0}")]
    AccessLockError(#[from] AccessLockError),
    #[error("buffer \"{name}\" with usages {usage:?} is missing usage {missing_usage:?} for this operation")]
    MissingBufferUsage {
        name: String,
        usage: BufferUsage,
        missing_usage: BufferUsage,
    },
    #[error("image \"{name}\" with usages {usage:?} is missing usage {missing_usage:?} for this operation")]
    MissingImageUsage {
        name: String,
        usage: ImageUsage,
        missing_usage: ImageUsage,
    },
    #[error("host access to buffer \"{name}\" at offset {offset} with {len} bytes exceeds its size of {size} bytes")]
    OutOfBounds {
        name: String,
        offset: u64,
        len: u64,
        size: u64,
    },
}

/// Transfer regions that do not fit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    #[error("cannot copy {src_size} bytes from \"{src}\" into \"{dst}\" of {dst_size} bytes, sizes must match")]
    SizeMismatch {
        src: String,
        src_size: u64,
        dst: String,
        dst_size: u64,
    },
    #[error("buffer \"{buffer}\" of {buffer_size} bytes cannot hold the {required} bytes of image \"{image}\"")]
    BufferTooSmall {
        buffer: String,
        buffer_size: u64,
        image: String,
        required: u64,
    },
    #[error("region of {size} bytes at offset {offset} is outside buffer \"{buffer}\" of {buffer_size} bytes")]
    RegionOutOfBounds {
        buffer: String,
        offset: u64,
        size: u64,
        buffer_size: u64,
    },
    #[error("copy regions must not be empty")]
    EmptyRegion,
}

/// Attachments or draws that do not match the rendering they are used in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RenderingError {
    #[error("at least one attachment is required to begin rendering")]
    NoAttachments,
    #[error("{count} color attachments given, the render pass format declares {expected}")]
    MismatchedColorAttachmentCount { count: usize, expected: usize },
    #[error("the render pass format declares a depth attachment, but none was given")]
    DepthAttachmentMissing,
    #[error("depth attachment \"{name}\" given, but the render pass format declares none")]
    DepthAttachmentNotExpected { name: String },
    #[error("depth attachment \"{name}\" has format {format:?}, expected {expected:?}")]
    MismatchedDepthAttachmentFormat {
        name: String,
        format: ImageFormat,
        expected: ImageFormat,
    },
    #[error("color attachment {index} \"{name}\" has format {format:?}, expected {expected:?}")]
    MismatchedColorAttachmentFormat {
        index: usize,
        name: String,
        format: ImageFormat,
        expected: ImageFormat,
    },
    #[error("attachment \"{name}\" has extent {extent:?}, expected the common extent {expected:?}")]
    MismatchedAttachmentExtent {
        name: String,
        extent: Extent3d,
        expected: Extent3d,
    },
    #[error("graphics pipeline \"{0}\" was created for a different render pass format")]
    IncompatiblePipeline(String),
    #[error("indices {first}..{end} of {format_bytes} bytes each exceed index buffer \"{name}\" of {size} bytes")]
    IndexRangeOutOfBounds {
        name: String,
        first: u64,
        end: u64,
        format_bytes: u64,
        size: u64,
    },
}

/// Errors raised while recording commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Copy(#[from] CopyError),
    #[error(transparent)]
    Rendering(#[from] RenderingError),
    #[error("indirect buffer \"{name}\" of {size} bytes is smaller than the {required} byte command arguments")]
    IndirectBufferTooSmall { name: String, size: u64, required: u64 },
    #[error("dispatch parameter of {size} bytes exceeds the {max} byte limit")]
    ParamTooLarge { size: usize, max: usize },
    #[error("pipeline \"{0}\" belongs to a different device")]
    ForeignPipeline(String),
    #[error("device was shut down")]
    DeviceLost,
}

impl From<AccessLockError> for RecordingError {
    fn from(err: AccessLockError) -> Self {
        Self::Access(AccessError::from(err))
    }
}

/// Result type for device operations.
pub type GraphicsResult<T> = Result<T, GraphicsError>;
