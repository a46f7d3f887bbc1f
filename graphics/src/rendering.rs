//! Render passes and draws.
//!
//! [`Recording::begin_rendering`] checks the attachments against a
//! [`RenderPassFormat`] and hands a [`Rendering`] to a closure. Draws are only
//! reachable through it, so they cannot be recorded outside of a render pass.
//!
//! ```ignore
//! rec.begin_rendering(
//!     &format,
//!     &[RenderingAttachment::clear(&color, ClearValue::Color([0.0; 4]))],
//!     None,
//!     |rendering| rendering.draw(&pipeline, DrawIndirectArgs::vertices(3), &()),
//! )?;
//! ```
//!
//! Barriers of transitions made inside the closure are flushed after the
//! render pass ends.

use std::sync::Arc;

use bytemuck::Pod;
use smallvec::SmallVec;

use crate::access::{
    BufferAccessType, ColorAttachment, DepthStencilAttachment, ImageAccessType, IndexReadable,
    IndirectCommandReadable,
};
use crate::error::{RecordingError, RenderingError};
use crate::pipeline::GraphicsPipeline;
use crate::queue::{AttachmentOp, Command, DrawCommand};
use crate::recording::{MutImageAccess, MutOrSharedBuffer, MutOrSharedImage, Recording, check_indirect, param_bytes};
use crate::resources::{BufferSlot, ImageSlot};
use crate::types::{
    BufferUsage, DrawIndexedIndirectArgs, DrawIndirectArgs, Extent3d, ImageFormat, ImageUsage, IndexFormat,
};

/// Formats of the color and depth attachments of a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RenderPassFormat {
    pub color_attachments: SmallVec<[ImageFormat; 4]>,
    pub depth_attachment: Option<ImageFormat>,
}

impl RenderPassFormat {
    pub fn new(color_attachments: &[ImageFormat], depth_attachment: Option<ImageFormat>) -> Self {
        Self {
            color_attachments: SmallVec::from_slice(color_attachments),
            depth_attachment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// What happens to attachment contents when rendering begins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp {
    #[default]
    Load,
    Clear(ClearValue),
    DontCare,
}

/// What happens to attachment contents when rendering ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreOp {
    #[default]
    Store,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering `extent` with the full depth range.
    pub fn from_extent(extent: Extent3d) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scissor {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Scissor {
    pub fn from_extent(extent: Extent3d) -> Self {
        Self {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        }
    }
}

/// An image accessed as attachment, with its load and store operations.
#[derive(Debug)]
pub struct RenderingAttachment<'r, 'a, A: ImageAccessType> {
    pub image: &'r MutImageAccess<'a, A>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

impl<'r, 'a, A: ImageAccessType> RenderingAttachment<'r, 'a, A> {
    /// Load the previous contents and store the result.
    pub fn new(image: &'r MutImageAccess<'a, A>) -> Self {
        Self {
            image,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
        }
    }

    /// Clear to `value` and store the result.
    pub fn clear(image: &'r MutImageAccess<'a, A>, value: ClearValue) -> Self {
        Self {
            load_op: LoadOp::Clear(value),
            ..Self::new(image)
        }
    }

    fn slot(&self) -> &Arc<ImageSlot> {
        self.image.image_slot()
    }

    fn op(&self) -> AttachmentOp {
        AttachmentOp {
            image: Arc::clone(self.slot()),
            load_op: self.load_op,
            store_op: self.store_op,
        }
    }
}

/// Extent shared by all attachments, after checking them against `format`.
fn validate_attachments(
    format: &RenderPassFormat,
    color_attachments: &[RenderingAttachment<'_, '_, ColorAttachment>],
    depth_attachment: Option<&RenderingAttachment<'_, '_, DepthStencilAttachment>>,
) -> Result<Extent3d, RecordingError> {
    let extent = match (format.depth_attachment, depth_attachment) {
        (Some(expected), Some(depth)) => {
            let slot = depth.slot();
            slot.has_required_usage(ImageUsage::DEPTH_STENCIL_ATTACHMENT)?;
            if slot.format != expected {
                return Err(RenderingError::MismatchedDepthAttachmentFormat {
                    name: slot.name.clone(),
                    format: slot.format,
                    expected,
                }
                .into());
            }
            slot.extent
        }
        (Some(_), None) => return Err(RenderingError::DepthAttachmentMissing.into()),
        (None, Some(depth)) => {
            return Err(RenderingError::DepthAttachmentNotExpected {
                name: depth.slot().name.clone(),
            }
            .into());
        }
        (None, None) => match color_attachments.first() {
            Some(first) => first.slot().extent,
            None => return Err(RenderingError::NoAttachments.into()),
        },
    };

    if color_attachments.len() != format.color_attachments.len() {
        return Err(RenderingError::MismatchedColorAttachmentCount {
            count: color_attachments.len(),
            expected: format.color_attachments.len(),
        }
        .into());
    }
    for (index, (attachment, &expected)) in color_attachments
        .iter()
        .zip(&format.color_attachments)
        .enumerate()
    {
        let slot = attachment.slot();
        slot.has_required_usage(ImageUsage::COLOR_ATTACHMENT)?;
        if slot.format != expected {
            return Err(RenderingError::MismatchedColorAttachmentFormat {
                index,
                name: slot.name.clone(),
                format: slot.format,
                expected,
            }
            .into());
        }
        if slot.extent != extent {
            return Err(RenderingError::MismatchedAttachmentExtent {
                name: slot.name.clone(),
                extent: slot.extent,
                expected: extent,
            }
            .into());
        }
    }
    Ok(extent)
}

impl<'a> Recording<'a> {
    /// Render into the given attachments within `f`.
    ///
    /// Viewport and scissor start out covering the attachments.
    pub fn begin_rendering<R>(
        &mut self,
        format: &RenderPassFormat,
        color_attachments: &[RenderingAttachment<'_, 'a, ColorAttachment>],
        depth_attachment: Option<RenderingAttachment<'_, 'a, DepthStencilAttachment>>,
        f: impl FnOnce(&mut Rendering<'_, 'a>) -> Result<R, RecordingError>,
    ) -> Result<R, RecordingError> {
        let extent = validate_attachments(format, color_attachments, depth_attachment.as_ref())?;
        self.push(Command::BeginRendering {
            color: color_attachments.iter().map(RenderingAttachment::op).collect(),
            depth: depth_attachment.as_ref().map(RenderingAttachment::op),
            extent,
        });

        let mut rendering = Rendering {
            recording: self,
            format: format.clone(),
            extent,
        };
        let result = f(&mut rendering)?;
        self.push_in_render_pass(Command::EndRendering);
        Ok(result)
    }
}

/// A render pass being recorded.
pub struct Rendering<'r, 'a> {
    recording: &'r mut Recording<'a>,
    format: RenderPassFormat,
    extent: Extent3d,
}

impl Rendering<'_, '_> {
    pub fn extent(&self) -> Extent3d {
        self.extent
    }

    pub fn format(&self) -> &RenderPassFormat {
        &self.format
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.recording.push_in_render_pass(Command::SetViewport(viewport));
    }

    pub fn set_viewport_to_extent(&mut self) {
        self.set_viewport(Viewport::from_extent(self.extent));
    }

    pub fn set_scissor(&mut self, scissor: Scissor) {
        self.recording.push_in_render_pass(Command::SetScissor(scissor));
    }

    pub fn set_scissor_to_extent(&mut self) {
        self.set_scissor(Scissor::from_extent(self.extent));
    }

    /// Draw `args.vertex_count` vertices without an index buffer.
    pub fn draw<T: Pod>(
        &mut self,
        pipeline: &GraphicsPipeline,
        args: DrawIndirectArgs,
        param: &T,
    ) -> Result<(), RecordingError> {
        self.record_draw(pipeline, DrawCommand::Direct(args), param)
    }

    /// Draw `args.index_count` indices read from `index_buffer`.
    pub fn draw_indexed<A, T>(
        &mut self,
        pipeline: &GraphicsPipeline,
        index_buffer: &impl MutOrSharedBuffer<A>,
        index_format: IndexFormat,
        args: DrawIndexedIndirectArgs,
        param: &T,
    ) -> Result<(), RecordingError>
    where
        A: BufferAccessType + IndexReadable,
        T: Pod,
    {
        let index_buffer = self.index_buffer(index_buffer)?;
        let first = args.first_index as u64;
        let end = first + args.index_count as u64;
        if end * index_format.bytes() > index_buffer.size {
            return Err(RenderingError::IndexRangeOutOfBounds {
                name: index_buffer.name.clone(),
                first,
                end,
                format_bytes: index_format.bytes(),
                size: index_buffer.size,
            }
            .into());
        }
        let draw = DrawCommand::Indexed {
            index_buffer,
            format: index_format,
            args,
        };
        self.record_draw(pipeline, draw, param)
    }

    /// Draw with arguments read from `indirect` when the queue executes.
    pub fn draw_indirect<A, T>(
        &mut self,
        pipeline: &GraphicsPipeline,
        indirect: &impl MutOrSharedBuffer<A>,
        param: &T,
    ) -> Result<(), RecordingError>
    where
        A: BufferAccessType + IndirectCommandReadable,
        T: Pod,
    {
        let indirect = self.indirect_buffer(indirect, DrawIndirectArgs::SIZE)?;
        self.record_draw(pipeline, DrawCommand::Indirect { indirect }, param)
    }

    /// Indexed draw with arguments read from `indirect` when the queue executes.
    pub fn draw_indexed_indirect<AI, AC, T>(
        &mut self,
        pipeline: &GraphicsPipeline,
        index_buffer: &impl MutOrSharedBuffer<AI>,
        index_format: IndexFormat,
        indirect: &impl MutOrSharedBuffer<AC>,
        param: &T,
    ) -> Result<(), RecordingError>
    where
        AI: BufferAccessType + IndexReadable,
        AC: BufferAccessType + IndirectCommandReadable,
        T: Pod,
    {
        let index_buffer = self.index_buffer(index_buffer)?;
        let indirect = self.indirect_buffer(indirect, DrawIndexedIndirectArgs::SIZE)?;
        let draw = DrawCommand::IndexedIndirect {
            index_buffer,
            format: index_format,
            indirect,
        };
        self.record_draw(pipeline, draw, param)
    }

    fn index_buffer<A: BufferAccessType>(
        &self,
        buffer: &impl MutOrSharedBuffer<A>,
    ) -> Result<Arc<BufferSlot>, RecordingError> {
        let slot = buffer.buffer_slot();
        slot.has_required_usage(BufferUsage::INDEX_BUFFER)?;
        self.recording.keep_buffer(slot);
        Ok(Arc::clone(slot))
    }

    fn indirect_buffer<A: BufferAccessType>(
        &self,
        buffer: &impl MutOrSharedBuffer<A>,
        required: u64,
    ) -> Result<Arc<BufferSlot>, RecordingError> {
        let slot = buffer.buffer_slot();
        check_indirect(slot, required)?;
        self.recording.keep_buffer(slot);
        Ok(Arc::clone(slot))
    }

    fn record_draw<T: Pod>(
        &mut self,
        pipeline: &GraphicsPipeline,
        draw: DrawCommand,
        param: &T,
    ) -> Result<(), RecordingError> {
        if pipeline.device_id() != self.recording.device().id() {
            return Err(RecordingError::ForeignPipeline(pipeline.name().to_string()));
        }
        if pipeline.format() != &self.format {
            return Err(RenderingError::IncompatiblePipeline(pipeline.name().to_string()).into());
        }
        let param = param_bytes(param)?;
        self.recording.push_in_render_pass(Command::Draw {
            pipeline: pipeline.name().to_string(),
            draw,
            param,
        });
        Ok(())
    }
}

impl std::fmt::Debug for Rendering<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rendering")
            .field("format", &self.format)
            .field("extent", &self.extent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::access::{ImageAccess, IndexRead, IndirectCommandRead};
    use crate::device::{DeviceConfig, GraphicsDevice};
    use crate::resources::{MutBuffer, MutImage};
    use crate::types::{BufferDescriptor, ImageDescriptor};

    fn device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(DeviceConfig::default().with_name("rendering tests"))
    }

    fn attachment(device: &GraphicsDevice, width: u32, format: ImageFormat, label: &str) -> MutImage {
        let usage = if format.is_depth() {
            ImageUsage::DEPTH_STENCIL_ATTACHMENT
        } else {
            ImageUsage::COLOR_ATTACHMENT
        };
        device
            .create_image(&ImageDescriptor::new_2d(width, 32, format, usage).with_label(label))
            .unwrap()
    }

    fn buffer_with(device: &GraphicsDevice, usage: BufferUsage, data: &[u8]) -> MutBuffer {
        device
            .create_buffer_with_data(&BufferDescriptor::new(data.len() as u64, usage).with_label("draw data"), data)
            .unwrap()
    }

    fn color_format() -> RenderPassFormat {
        RenderPassFormat::new(&[ImageFormat::Rgba8Unorm], None)
    }

    #[test]
    fn test_draws_inside_render_pass() {
        let device = device();
        let format = RenderPassFormat::new(&[ImageFormat::Rgba8Unorm], Some(ImageFormat::Depth32Float));
        let pipeline = device.create_graphics_pipeline("opaque", format.clone());
        let color = attachment(&device, 64, ImageFormat::Rgba8Unorm, "color");
        let depth = attachment(&device, 64, ImageFormat::Depth32Float, "depth");
        let indices = buffer_with(&device, BufferUsage::INDEX_BUFFER, bytemuck::cast_slice(&[0u16, 1, 2, 2, 1, 3]));
        let scissor = Scissor {
            x: 8,
            y: 0,
            width: 16,
            height: 16,
        };

        let ((color, depth, indices), pending) = device
            .execute(|rec| {
                let color = color.access::<ColorAttachment>(rec)?;
                let depth = depth.access::<DepthStencilAttachment>(rec)?;
                let indices = indices.access::<IndexRead>(rec)?;
                let extent = rec.begin_rendering(
                    &format,
                    &[RenderingAttachment::clear(&color, ClearValue::Color([0.0, 0.0, 0.0, 1.0]))],
                    Some(RenderingAttachment::clear(
                        &depth,
                        ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
                    )),
                    |rendering| {
                        rendering.draw(&pipeline, DrawIndirectArgs::vertices(3), &0u32)?;
                        rendering.set_scissor(scissor);
                        rendering.draw_indexed(
                            &pipeline,
                            &indices,
                            IndexFormat::U16,
                            DrawIndexedIndirectArgs::indices(6),
                            &1u32,
                        )?;
                        Ok(rendering.extent())
                    },
                )?;
                assert_eq!(extent, Extent3d::new_2d(64, 32));
                Ok((color.into_mut(), depth.into_mut(), indices.into_mut()))
            })
            .unwrap();
        pending.wait();

        let draws = device.queue().take_draw_log();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].count, 3);
        assert_eq!(draws[0].scissor, Scissor::from_extent(Extent3d::new_2d(64, 32)));
        assert!(draws[1].indexed);
        assert_eq!(draws[1].scissor, scissor);
        assert_eq!(device.queue().stats().render_passes, 1);
        assert_eq!(color.access_state(), Some(ImageAccess::ColorAttachment));
        assert_eq!(depth.access_state(), Some(ImageAccess::DepthStencilAttachment));
        assert!(indices.access_state().is_some());
    }

    #[test]
    fn test_attachment_format_and_count_checked() {
        let device = device();
        let color = attachment(&device, 64, ImageFormat::Bgra8Unorm, "swapchain");

        let err = device
            .execute(|rec| {
                let color = color.access::<ColorAttachment>(rec)?;
                rec.begin_rendering(&color_format(), &[RenderingAttachment::new(&color)], None, |_| Ok(()))
            })
            .unwrap_err();
        assert_eq!(
            err,
            RecordingError::Rendering(RenderingError::MismatchedColorAttachmentFormat {
                index: 0,
                name: "swapchain".to_string(),
                format: ImageFormat::Bgra8Unorm,
                expected: ImageFormat::Rgba8Unorm,
            })
        );

        let err = device
            .execute(|rec| rec.begin_rendering(&color_format(), &[], None, |_| Ok(())))
            .unwrap_err();
        assert_eq!(err, RecordingError::Rendering(RenderingError::NoAttachments));
        assert_eq!(device.queue().stats().submissions, 0);
    }

    #[test]
    fn test_depth_attachment_must_match_format() {
        let device = device();
        let color = attachment(&device, 64, ImageFormat::Rgba8Unorm, "color");
        let depth = attachment(&device, 64, ImageFormat::Depth16Unorm, "depth");

        let err = device
            .execute(|rec| {
                let color = color.access::<ColorAttachment>(rec)?;
                let depth = depth.access::<DepthStencilAttachment>(rec)?;
                rec.begin_rendering(
                    &color_format(),
                    &[RenderingAttachment::new(&color)],
                    Some(RenderingAttachment::new(&depth)),
                    |_| Ok(()),
                )
            })
            .unwrap_err();
        assert_eq!(
            err,
            RecordingError::Rendering(RenderingError::DepthAttachmentNotExpected {
                name: "depth".to_string()
            })
        );

        let depth_format = RenderPassFormat::new(&[], Some(ImageFormat::Depth32Float));
        let depth = attachment(&device, 64, ImageFormat::Depth32Float, "shadow");
        let err = device
            .execute(|rec| rec.begin_rendering(&depth_format, &[], None, |_| Ok(())))
            .unwrap_err();
        assert_eq!(err, RecordingError::Rendering(RenderingError::DepthAttachmentMissing));

        let ((), _pending) = device
            .execute(|rec| {
                let depth = depth.access::<DepthStencilAttachment>(rec)?;
                rec.begin_rendering(&depth_format, &[], Some(RenderingAttachment::new(&depth)), |_| Ok(()))?;
                drop(depth.into_mut());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_attachment_extents_must_match() {
        let device = device();
        let format = RenderPassFormat::new(&[ImageFormat::Rgba8Unorm, ImageFormat::Rgba8Unorm], None);
        let albedo = attachment(&device, 64, ImageFormat::Rgba8Unorm, "albedo");
        let normal = attachment(&device, 32, ImageFormat::Rgba8Unorm, "normal");

        let err = device
            .execute(|rec| {
                let albedo = albedo.access::<ColorAttachment>(rec)?;
                let normal = normal.access::<ColorAttachment>(rec)?;
                rec.begin_rendering(
                    &format,
                    &[RenderingAttachment::new(&albedo), RenderingAttachment::new(&normal)],
                    None,
                    |_| Ok(()),
                )
            })
            .unwrap_err();
        assert!(matches!(
            err,
            RecordingError::Rendering(RenderingError::MismatchedAttachmentExtent { ref name, .. }) if name == "normal"
        ));
    }

    #[test]
    fn test_pipeline_must_match_render_pass() {
        let device = device();
        let pipeline = device.create_graphics_pipeline("hdr", RenderPassFormat::new(&[ImageFormat::Rgba16Float], None));
        let color = attachment(&device, 64, ImageFormat::Rgba8Unorm, "color");

        let err = device
            .execute(|rec| {
                let color = color.access::<ColorAttachment>(rec)?;
                rec.begin_rendering(&color_format(), &[RenderingAttachment::new(&color)], None, |rendering| {
                    rendering.draw(&pipeline, DrawIndirectArgs::vertices(3), &())
                })
            })
            .unwrap_err();
        assert_eq!(
            err,
            RecordingError::Rendering(RenderingError::IncompatiblePipeline("hdr".to_string()))
        );
    }

    #[test]
    fn test_index_range_checked() {
        let device = device();
        let pipeline = device.create_graphics_pipeline("lines", color_format());
        let color = attachment(&device, 64, ImageFormat::Rgba8Unorm, "color");
        let indices = buffer_with(&device, BufferUsage::INDEX_BUFFER, &[0; 8]);

        let err = device
            .execute(|rec| {
                let color = color.access::<ColorAttachment>(rec)?;
                let indices = indices.access::<IndexRead>(rec)?;
                rec.begin_rendering(&color_format(), &[RenderingAttachment::new(&color)], None, |rendering| {
                    let args = DrawIndexedIndirectArgs {
                        first_index: 1,
                        ..DrawIndexedIndirectArgs::indices(2)
                    };
                    rendering.draw_indexed(&pipeline, &indices, IndexFormat::U32, args, &())
                })
            })
            .unwrap_err();
        assert_eq!(
            err,
            RecordingError::Rendering(RenderingError::IndexRangeOutOfBounds {
                name: "draw data".to_string(),
                first: 1,
                end: 3,
                format_bytes: 4,
                size: 8,
            })
        );
    }

    #[test]
    fn test_indirect_draws_read_arguments_at_execution() {
        let device = device();
        let pipeline = device.create_graphics_pipeline("instanced", color_format());
        let color = attachment(&device, 16, ImageFormat::Rgba8Unorm, "color");
        let indices = device
            .create_shared_buffer(&BufferDescriptor::new(24, BufferUsage::INDEX_BUFFER))
            .unwrap();
        let draw_args = DrawIndirectArgs {
            instance_count: 4,
            ..DrawIndirectArgs::vertices(6)
        };
        let indexed_args = DrawIndexedIndirectArgs {
            instance_count: 2,
            ..DrawIndexedIndirectArgs::indices(12)
        };
        let mut bytes = bytemuck::bytes_of(&draw_args).to_vec();
        bytes.extend_from_slice(bytemuck::bytes_of(&indexed_args));
        let draw_buffer = buffer_with(&device, BufferUsage::INDIRECT_BUFFER, &bytes[..16]);
        let indexed_buffer = buffer_with(&device, BufferUsage::INDIRECT_BUFFER, &bytes[16..]);

        let ((), pending) = device
            .execute(|rec| {
                let color = color.access::<ColorAttachment>(rec)?;
                let draw_buffer = draw_buffer.access::<IndirectCommandRead>(rec)?;
                let indexed_buffer = indexed_buffer.access::<IndirectCommandRead>(rec)?;
                rec.begin_rendering(&color_format(), &[RenderingAttachment::new(&color)], None, |rendering| {
                    rendering.draw_indirect(&pipeline, &draw_buffer, &())?;
                    rendering.draw_indexed_indirect(&pipeline, &indices, IndexFormat::U16, &indexed_buffer, &())
                })?;
                drop((color.into_mut(), draw_buffer.into_mut(), indexed_buffer.into_mut()));
                Ok(())
            })
            .unwrap();
        pending.wait();

        let draws = device.queue().take_draw_log();
        assert_eq!(draws.len(), 2);
        assert_eq!((draws[0].count, draws[0].instance_count), (6, 4));
        assert!(draws[0].indirect && !draws[0].indexed);
        assert_eq!((draws[1].count, draws[1].instance_count), (12, 2));
        assert!(draws[1].indirect && draws[1].indexed);
    }

    #[test]
    fn test_indirect_draw_buffer_too_small() {
        let device = device();
        let pipeline = device.create_graphics_pipeline("instanced", color_format());
        let color = attachment(&device, 16, ImageFormat::Rgba8Unorm, "color");
        let short = buffer_with(&device, BufferUsage::INDIRECT_BUFFER, &[0; 12]);

        let err = device
            .execute(|rec| {
                let color = color.access::<ColorAttachment>(rec)?;
                let short = short.access::<IndirectCommandRead>(rec)?;
                rec.begin_rendering(&color_format(), &[RenderingAttachment::new(&color)], None, |rendering| {
                    rendering.draw_indirect(&pipeline, &short, &())
                })
            })
            .unwrap_err();
        assert_eq!(
            err,
            RecordingError::IndirectBufferTooSmall {
                name: "draw data".to_string(),
                size: 12,
                required: DrawIndirectArgs::SIZE,
            }
        );
    }
}
