//! Command recording.
//!
//! A [`Recording`] is only reachable inside [`GraphicsDevice::execute`]. Mutable
//! resources enter it by being accessed in a typed state:
//!
//! ```ignore
//! let (buffer, pending) = device.execute(|rec| {
//!     let src = staging.access::<TransferRead>(rec)?;
//!     let dst = unsafe { buffer.access_undefined_contents::<TransferWrite>(rec)? };
//!     rec.copy_buffer_to_buffer(&src, &dst)?;
//!     drop(src.into_mut());
//!     Ok(dst.into_shared())
//! })?;
//! ```
//!
//! Accessing a resource locks it for the rest of the recording and records the
//! barrier from its previous state. State changes are batched and flushed as a
//! single barrier command right before the next operation that needs them.
//! Converting an access back with `into_mut` or `into_shared` unlocks it. An
//! access that is dropped instead leaves the resource locked.
//!
//! Draws are recorded inside [`Recording::begin_rendering`], see
//! [`rendering`](crate::rendering).

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::Mutex;

use crate::access::{
    BufferAccess, BufferAccessType, GeneralRead, ImageAccess, ImageAccessType, IndirectCommandReadable,
    TransferReadable, TransferWriteable,
};
use crate::barriers::BarrierBatch;
use crate::device::GraphicsDevice;
use crate::error::{AccessError, CopyError, RecordingError};
use crate::execution::KeepAlive;
use crate::pipeline::ComputePipeline;
use crate::queue::Command;
use crate::resources::{BufferSlot, ImageSlot, MutBuffer, MutImage, ResourceId, SharedBuffer, SharedImage};
use crate::types::{BufferUsage, DispatchIndirectArgs, ImageUsage};

/// Largest dispatch parameter in bytes, the guaranteed push constant size.
pub const MAX_PARAM_SIZE: usize = 128;

/// State shared by every access of one recording.
#[derive(Debug, Default)]
pub(crate) struct ResourceContext {
    barriers: Mutex<BarrierBatch>,
    keep_alive: Mutex<KeepAlive>,
}

impl ResourceContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn buffer_barrier(&self, id: ResourceId, src: BufferAccess, dst: BufferAccess) {
        self.barriers.lock().add_buffer_barrier(id, src, dst);
    }

    fn image_barrier(&self, id: ResourceId, src: ImageAccess, dst: ImageAccess) {
        self.barriers.lock().add_image_barrier(id, src, dst);
    }

    fn keep_buffer(&self, slot: &Arc<BufferSlot>) {
        self.keep_alive.lock().buffer(slot);
    }

    fn keep_image(&self, slot: &Arc<ImageSlot>) {
        self.keep_alive.lock().image(slot);
    }

    pub(crate) fn into_keep_alive(self) -> KeepAlive {
        self.keep_alive.into_inner()
    }
}

/// Commands recorded for one submission.
pub struct Recording<'a> {
    device: &'a GraphicsDevice,
    context: &'a ResourceContext,
    commands: Vec<Command>,
}

impl<'a> Recording<'a> {
    pub(crate) fn new(device: &'a GraphicsDevice, context: &'a ResourceContext) -> Self {
        Self {
            device,
            context,
            commands: Vec::new(),
        }
    }

    pub fn device(&self) -> &'a GraphicsDevice {
        self.device
    }

    /// Number of commands recorded so far, barrier commands included.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    fn flush_barriers(&mut self) {
        let batch = self.context.barriers.lock().take();
        if !batch.is_empty() {
            self.commands.push(Command::Barrier(batch));
        }
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.flush_barriers();
        self.commands.push(command);
    }

    /// Push without flushing, barriers cannot be recorded inside a render pass.
    pub(crate) fn push_in_render_pass(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub(crate) fn keep_buffer(&self, slot: &Arc<BufferSlot>) {
        self.context.keep_buffer(slot);
    }

    /// Flush the remaining barriers and hand out the commands.
    pub(crate) fn finish(mut self) -> Vec<Command> {
        self.flush_barriers();
        self.commands
    }

    /// Copy all of `src` into `dst`. Both buffers must have the same size.
    pub fn copy_buffer_to_buffer<SA, DA>(
        &mut self,
        src: &impl MutOrSharedBuffer<SA>,
        dst: &MutBufferAccess<'a, DA>,
    ) -> Result<(), RecordingError>
    where
        SA: BufferAccessType + TransferReadable,
        DA: BufferAccessType + TransferWriteable,
    {
        let src = src.buffer_slot();
        let dst = &dst.slot;
        src.has_required_usage(BufferUsage::TRANSFER_SRC)?;
        dst.has_required_usage(BufferUsage::TRANSFER_DST)?;
        if src.size != dst.size {
            return Err(CopyError::SizeMismatch {
                src: src.name.clone(),
                src_size: src.size,
                dst: dst.name.clone(),
                dst_size: dst.size,
            }
            .into());
        }

        self.context.keep_buffer(src);
        self.push(Command::CopyBuffer {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
        });
        Ok(())
    }

    /// Copy `size` bytes from `src` at `src_offset` into `dst` at `dst_offset`.
    pub fn copy_buffer_to_buffer_region<SA, DA>(
        &mut self,
        src: &impl MutOrSharedBuffer<SA>,
        src_offset: u64,
        dst: &MutBufferAccess<'a, DA>,
        dst_offset: u64,
        size: u64,
    ) -> Result<(), RecordingError>
    where
        SA: BufferAccessType + TransferReadable,
        DA: BufferAccessType + TransferWriteable,
    {
        let src = src.buffer_slot();
        let dst = &dst.slot;
        src.has_required_usage(BufferUsage::TRANSFER_SRC)?;
        dst.has_required_usage(BufferUsage::TRANSFER_DST)?;
        if size == 0 {
            return Err(CopyError::EmptyRegion.into());
        }
        check_region(src, src_offset, size)?;
        check_region(dst, dst_offset, size)?;

        self.context.keep_buffer(src);
        self.push(Command::CopyBufferRegion {
            src: Arc::clone(src),
            src_offset,
            dst: Arc::clone(dst),
            dst_offset,
            size,
        });
        Ok(())
    }

    /// Copy tightly packed texels from `src` into all of `dst`.
    pub fn copy_buffer_to_image<SA, DA>(
        &mut self,
        src: &impl MutOrSharedBuffer<SA>,
        dst: &MutImageAccess<'a, DA>,
    ) -> Result<(), RecordingError>
    where
        SA: BufferAccessType + TransferReadable,
        DA: ImageAccessType + TransferWriteable,
    {
        let src = src.buffer_slot();
        let dst = &dst.slot;
        src.has_required_usage(BufferUsage::TRANSFER_SRC)?;
        dst.has_required_usage(ImageUsage::TRANSFER_DST)?;
        check_buffer_covers_image(src, dst)?;

        self.context.keep_buffer(src);
        self.push(Command::CopyBufferToImage {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
        });
        Ok(())
    }

    /// Copy all texels of `src` tightly packed into `dst`.
    pub fn copy_image_to_buffer<SA, DA>(
        &mut self,
        src: &impl MutOrSharedImage<SA>,
        dst: &MutBufferAccess<'a, DA>,
    ) -> Result<(), RecordingError>
    where
        SA: ImageAccessType + TransferReadable,
        DA: BufferAccessType + TransferWriteable,
    {
        let src = src.image_slot();
        let dst = &dst.slot;
        src.has_required_usage(ImageUsage::TRANSFER_SRC)?;
        dst.has_required_usage(BufferUsage::TRANSFER_DST)?;
        check_buffer_covers_image(dst, src)?;

        self.context.keep_image(src);
        self.push(Command::CopyImageToBuffer {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
        });
        Ok(())
    }

    /// Dispatch `pipeline` with `param` as its push constant.
    pub fn dispatch<T: Pod>(
        &mut self,
        pipeline: &ComputePipeline,
        group_counts: [u32; 3],
        param: &T,
    ) -> Result<(), RecordingError> {
        let param = self.check_dispatch(pipeline, param)?;
        self.push(Command::Dispatch {
            pipeline: pipeline.name().to_string(),
            group_counts,
            param,
        });
        Ok(())
    }

    /// Dispatch `pipeline` with workgroup counts read from `indirect`.
    pub fn dispatch_indirect<A, T>(
        &mut self,
        pipeline: &ComputePipeline,
        indirect: &impl MutOrSharedBuffer<A>,
        param: &T,
    ) -> Result<(), RecordingError>
    where
        A: BufferAccessType + IndirectCommandReadable,
        T: Pod,
    {
        let param = self.check_dispatch(pipeline, param)?;
        let indirect = indirect.buffer_slot();
        check_indirect(indirect, DispatchIndirectArgs::SIZE)?;

        self.context.keep_buffer(indirect);
        self.push(Command::DispatchIndirect {
            pipeline: pipeline.name().to_string(),
            indirect: Arc::clone(indirect),
            param,
        });
        Ok(())
    }

    fn check_dispatch<T: Pod>(&self, pipeline: &ComputePipeline, param: &T) -> Result<Vec<u8>, RecordingError> {
        if pipeline.device_id() != self.device.id() {
            return Err(RecordingError::ForeignPipeline(pipeline.name().to_string()));
        }
        param_bytes(param)
    }
}

pub(crate) fn param_bytes<T: Pod>(param: &T) -> Result<Vec<u8>, RecordingError> {
    let bytes = bytemuck::bytes_of(param);
    if bytes.len() > MAX_PARAM_SIZE {
        return Err(RecordingError::ParamTooLarge {
            size: bytes.len(),
            max: MAX_PARAM_SIZE,
        });
    }
    Ok(bytes.to_vec())
}

/// `buffer` must hold indirect arguments of `required` bytes.
pub(crate) fn check_indirect(buffer: &BufferSlot, required: u64) -> Result<(), RecordingError> {
    buffer.has_required_usage(BufferUsage::INDIRECT_BUFFER)?;
    if buffer.size < required {
        return Err(RecordingError::IndirectBufferTooSmall {
            name: buffer.name.clone(),
            size: buffer.size,
            required,
        });
    }
    Ok(())
}

fn check_region(buffer: &BufferSlot, offset: u64, size: u64) -> Result<(), CopyError> {
    match offset.checked_add(size) {
        Some(end) if end <= buffer.size => Ok(()),
        _ => Err(CopyError::RegionOutOfBounds {
            buffer: buffer.name.clone(),
            offset,
            size,
            buffer_size: buffer.size,
        }),
    }
}

impl std::fmt::Debug for Recording<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recording")
            .field("device", &self.device.name())
            .field("commands", &self.commands.len())
            .finish()
    }
}

fn check_buffer_covers_image(buffer: &BufferSlot, image: &ImageSlot) -> Result<(), CopyError> {
    let required = image.byte_size();
    if buffer.size < required {
        return Err(CopyError::BufferTooSmall {
            buffer: buffer.name.clone(),
            buffer_size: buffer.size,
            image: image.name.clone(),
            required,
        });
    }
    Ok(())
}

mod sealed {
    pub trait Sealed {}
}

/// A buffer readable in access `A`: a [`MutBufferAccess`] in `A`, or a
/// [`SharedBuffer`] when `A` is [`GeneralRead`].
pub trait MutOrSharedBuffer<A: BufferAccessType>: sealed::Sealed {
    #[doc(hidden)]
    fn buffer_slot(&self) -> &Arc<BufferSlot>;
}

/// An image readable in access `A`: a [`MutImageAccess`] in `A`, or a
/// [`SharedImage`] when `A` is [`GeneralRead`].
pub trait MutOrSharedImage<A: ImageAccessType>: sealed::Sealed {
    #[doc(hidden)]
    fn image_slot(&self) -> &Arc<ImageSlot>;
}

impl sealed::Sealed for SharedBuffer {}

impl MutOrSharedBuffer<GeneralRead> for SharedBuffer {
    fn buffer_slot(&self) -> &Arc<BufferSlot> {
        self.slot()
    }
}

impl sealed::Sealed for SharedImage {}

impl MutOrSharedImage<GeneralRead> for SharedImage {
    fn image_slot(&self) -> &Arc<ImageSlot> {
        self.slot()
    }
}

/// A buffer locked by a recording in access `A`.
pub struct MutBufferAccess<'a, A: BufferAccessType> {
    context: &'a ResourceContext,
    slot: Arc<BufferSlot>,
    _access: PhantomData<A>,
}

impl<'a, A: BufferAccessType> MutBufferAccess<'a, A> {
    fn lock(
        context: &'a ResourceContext,
        slot: Arc<BufferSlot>,
        discard_contents: bool,
    ) -> Result<Self, AccessError> {
        let previous = slot.lock.try_lock()?;
        if let Err(err) = slot.has_required_usage(A::BUFFER_ACCESS.required_usage()) {
            slot.lock.unlock(previous);
            return Err(err);
        }
        let previous = if discard_contents {
            BufferAccess::Undefined
        } else {
            previous
        };
        context.keep_buffer(&slot);
        context.buffer_barrier(slot.id, previous, A::BUFFER_ACCESS);
        Ok(Self {
            context,
            slot,
            _access: PhantomData,
        })
    }

    pub fn id(&self) -> ResourceId {
        self.slot.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn size(&self) -> u64 {
        self.slot.size
    }

    /// Move the buffer into access `B`.
    pub fn transition<B: BufferAccessType>(self) -> Result<MutBufferAccess<'a, B>, AccessError> {
        self.slot.has_required_usage(B::BUFFER_ACCESS.required_usage())?;
        self.context
            .buffer_barrier(self.slot.id, A::BUFFER_ACCESS, B::BUFFER_ACCESS);
        Ok(MutBufferAccess {
            context: self.context,
            slot: self.slot,
            _access: PhantomData,
        })
    }

    /// Unlock the buffer, leaving it in access `A`.
    pub fn into_mut(self) -> MutBuffer {
        self.slot.lock.unlock(A::BUFFER_ACCESS);
        MutBuffer::from_slot(self.slot)
    }

    /// Move the buffer into [`GeneralRead`] for good.
    pub fn into_shared(self) -> SharedBuffer {
        self.context
            .buffer_barrier(self.slot.id, A::BUFFER_ACCESS, BufferAccess::GeneralRead);
        self.slot.lock.unlock_to_shared();
        SharedBuffer::from_slot(self.slot)
    }
}

impl<A: BufferAccessType> sealed::Sealed for MutBufferAccess<'_, A> {}

impl<A: BufferAccessType> MutOrSharedBuffer<A> for MutBufferAccess<'_, A> {
    fn buffer_slot(&self) -> &Arc<BufferSlot> {
        &self.slot
    }
}

impl<A: BufferAccessType> std::fmt::Debug for MutBufferAccess<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutBufferAccess")
            .field("buffer", &self.slot.name)
            .field("access", &A::BUFFER_ACCESS)
            .finish()
    }
}

/// An image locked by a recording in access `A`.
pub struct MutImageAccess<'a, A: ImageAccessType> {
    context: &'a ResourceContext,
    slot: Arc<ImageSlot>,
    _access: PhantomData<A>,
}

impl<'a, A: ImageAccessType> MutImageAccess<'a, A> {
    fn lock(
        context: &'a ResourceContext,
        slot: Arc<ImageSlot>,
        discard_contents: bool,
    ) -> Result<Self, AccessError> {
        let previous = slot.lock.try_lock()?;
        if let Err(err) = slot.has_required_usage(A::IMAGE_ACCESS.required_usage()) {
            slot.lock.unlock(previous);
            return Err(err);
        }
        let previous = if discard_contents {
            ImageAccess::Undefined
        } else {
            previous
        };
        context.keep_image(&slot);
        context.image_barrier(slot.id, previous, A::IMAGE_ACCESS);
        Ok(Self {
            context,
            slot,
            _access: PhantomData,
        })
    }

    pub fn id(&self) -> ResourceId {
        self.slot.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// Move the image into access `B`.
    pub fn transition<B: ImageAccessType>(self) -> Result<MutImageAccess<'a, B>, AccessError> {
        self.slot.has_required_usage(B::IMAGE_ACCESS.required_usage())?;
        self.context
            .image_barrier(self.slot.id, A::IMAGE_ACCESS, B::IMAGE_ACCESS);
        Ok(MutImageAccess {
            context: self.context,
            slot: self.slot,
            _access: PhantomData,
        })
    }

    /// Unlock the image, leaving it in access `A`.
    pub fn into_mut(self) -> MutImage {
        self.slot.lock.unlock(A::IMAGE_ACCESS);
        MutImage::from_slot(self.slot)
    }

    /// Move the image into [`GeneralRead`] for good.
    pub fn into_shared(self) -> SharedImage {
        self.context
            .image_barrier(self.slot.id, A::IMAGE_ACCESS, ImageAccess::GeneralRead);
        self.slot.lock.unlock_to_shared();
        SharedImage::from_slot(self.slot)
    }
}

impl<A: ImageAccessType> sealed::Sealed for MutImageAccess<'_, A> {}

impl<A: ImageAccessType> MutOrSharedImage<A> for MutImageAccess<'_, A> {
    fn image_slot(&self) -> &Arc<ImageSlot> {
        &self.slot
    }
}

impl<A: ImageAccessType> std::fmt::Debug for MutImageAccess<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutImageAccess")
            .field("image", &self.slot.name)
            .field("access", &A::IMAGE_ACCESS)
            .finish()
    }
}

impl MutBuffer {
    /// Lock the buffer in `rec` for access `A`.
    pub fn access<'a, A: BufferAccessType>(
        self,
        rec: &Recording<'a>,
    ) -> Result<MutBufferAccess<'a, A>, AccessError> {
        MutBufferAccess::lock(rec.context, self.into_slot(), false)
    }

    /// Lock the buffer in `rec` for access `A`, discarding its contents.
    ///
    /// # Safety
    ///
    /// The previous contents become undefined. Nothing may read them before
    /// they are written again.
    pub unsafe fn access_undefined_contents<'a, A: BufferAccessType>(
        self,
        rec: &Recording<'a>,
    ) -> Result<MutBufferAccess<'a, A>, AccessError> {
        MutBufferAccess::lock(rec.context, self.into_slot(), true)
    }
}

impl MutImage {
    /// Lock the image in `rec` for access `A`.
    pub fn access<'a, A: ImageAccessType>(self, rec: &Recording<'a>) -> Result<MutImageAccess<'a, A>, AccessError> {
        MutImageAccess::lock(rec.context, self.into_slot(), false)
    }

    /// Lock the image in `rec` for access `A`, discarding its contents.
    ///
    /// # Safety
    ///
    /// The previous contents become undefined. Nothing may read them before
    /// they are written again.
    pub unsafe fn access_undefined_contents<'a, A: ImageAccessType>(
        self,
        rec: &Recording<'a>,
    ) -> Result<MutImageAccess<'a, A>, AccessError> {
        MutImageAccess::lock(rec.context, self.into_slot(), true)
    }
}
