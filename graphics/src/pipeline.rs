//! Pipeline handles.
//!
//! Shaders are compiled elsewhere. A pipeline here is an opaque named handle
//! bound to the device that created it, and for graphics pipelines the
//! attachment formats it renders to.

use std::fmt;
use std::sync::Arc;

use crate::rendering::RenderPassFormat;

struct PipelineInner {
    name: String,
    device_id: u64,
}

/// Named compute pipeline owned by one device.
///
/// Dispatching it on another device's recording fails with
/// [`RecordingError::ForeignPipeline`](crate::RecordingError::ForeignPipeline).
#[derive(Clone)]
pub struct ComputePipeline {
    inner: Arc<PipelineInner>,
}

impl ComputePipeline {
    pub(crate) fn new(name: impl Into<String>, device_id: u64) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                name: name.into(),
                device_id,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn device_id(&self) -> u64 {
        self.inner.device_id
    }
}

impl fmt::Debug for ComputePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputePipeline")
            .field("name", &self.inner.name)
            .field("device", &self.inner.device_id)
            .finish()
    }
}

impl PartialEq for ComputePipeline {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ComputePipeline {}

/// Named graphics pipeline rendering into one [`RenderPassFormat`].
#[derive(Clone)]
pub struct GraphicsPipeline {
    inner: Arc<PipelineInner>,
    format: Arc<RenderPassFormat>,
}

impl GraphicsPipeline {
    pub(crate) fn new(name: impl Into<String>, device_id: u64, format: RenderPassFormat) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                name: name.into(),
                device_id,
            }),
            format: Arc::new(format),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Attachment formats a rendering must match to draw with this pipeline.
    pub fn format(&self) -> &RenderPassFormat {
        &self.format
    }

    pub(crate) fn device_id(&self) -> u64 {
        self.inner.device_id
    }
}

impl fmt::Debug for GraphicsPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsPipeline")
            .field("name", &self.inner.name)
            .field("device", &self.inner.device_id)
            .field("format", &self.format)
            .finish()
    }
}

impl PartialEq for GraphicsPipeline {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for GraphicsPipeline {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageFormat;

    #[test]
    fn test_pipeline_identity() {
        let a = ComputePipeline::new("cull", 1);
        let b = ComputePipeline::new("cull", 1);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.name(), "cull");
        assert_eq!(a.device_id(), 1);
    }

    #[test]
    fn test_graphics_pipeline_format() {
        let format = RenderPassFormat::new(&[ImageFormat::Rgba8Unorm], Some(ImageFormat::Depth32Float));
        let pipeline = GraphicsPipeline::new("opaque", 2, format.clone());
        assert_eq!(pipeline.format(), &format);
        assert_eq!(pipeline, pipeline.clone());
        assert_ne!(pipeline, GraphicsPipeline::new("opaque", 2, format));
        assert!(format!("{pipeline:?}").contains("Depth32Float"));
    }
}
