//! Barrier batching.
//!
//! Access transitions recorded between two commands are collected into a
//! [`BarrierBatch`] and emitted as a single barrier command before the next
//! operation, keyed by resource so each resource transitions at most once.

use std::collections::BTreeMap;

use crate::access::{BufferAccess, ImageAccess};
use crate::resources::ResourceId;

/// Access transition of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBarrier {
    pub id: ResourceId,
    pub src: BufferAccess,
    pub dst: BufferAccess,
}

/// Access transition of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub id: ResourceId,
    pub src: ImageAccess,
    pub dst: ImageAccess,
}

/// A batch of barriers to submit together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarrierBatch {
    buffers: BTreeMap<ResourceId, (BufferAccess, BufferAccess)>,
    images: BTreeMap<ResourceId, (ImageAccess, ImageAccess)>,
}

impl BarrierBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a buffer transition.
    ///
    /// Transitions where `src == dst` are skipped. A second transition of the
    /// same buffer keeps the first source and replaces the destination.
    pub fn add_buffer_barrier(&mut self, id: ResourceId, src: BufferAccess, dst: BufferAccess) {
        let src = self.buffers.get(&id).map_or(src, |&(first, _)| first);
        if src == dst {
            self.buffers.remove(&id);
        } else {
            self.buffers.insert(id, (src, dst));
        }
    }

    /// Add an image transition, with the same merging as buffers.
    pub fn add_image_barrier(&mut self, id: ResourceId, src: ImageAccess, dst: ImageAccess) {
        let src = self.images.get(&id).map_or(src, |&(first, _)| first);
        if src == dst {
            self.images.remove(&id);
        } else {
            self.images.insert(id, (src, dst));
        }
    }

    pub fn buffer_barriers(&self) -> impl Iterator<Item = BufferBarrier> + '_ {
        self.buffers
            .iter()
            .map(|(&id, &(src, dst))| BufferBarrier { id, src, dst })
    }

    pub fn image_barriers(&self) -> impl Iterator<Item = ImageBarrier> + '_ {
        self.images
            .iter()
            .map(|(&id, &(src, dst))| ImageBarrier { id, src, dst })
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.images.is_empty()
    }

    /// Pending barriers, buffers and images together.
    pub fn len(&self) -> usize {
        self.buffers.len() + self.images.len()
    }

    /// Move all barriers out, leaving the batch empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Drop every pending barrier.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.images.clear();
    }
}

#[cfg(feature = "vulkan-backend")]
mod vulkan {
    use ash::vk;

    use super::BarrierBatch;
    use crate::resources::ResourceId;

    impl BarrierBatch {
        /// Build synchronization2 buffer barriers.
        ///
        /// `resolve` returns the Vulkan buffer of a resource, or `None` to skip it.
        pub fn to_vk_buffer_barriers<'a, F>(&self, resolve: F) -> Vec<vk::BufferMemoryBarrier2<'a>>
        where
            F: Fn(ResourceId) -> Option<vk::Buffer>,
        {
            self.buffer_barriers()
                .filter_map(|barrier| {
                    let buffer = resolve(barrier.id)?;
                    let src = barrier.src.to_vk();
                    let dst = barrier.dst.to_vk();
                    Some(
                        vk::BufferMemoryBarrier2::default()
                            .buffer(buffer)
                            .offset(0)
                            .size(vk::WHOLE_SIZE)
                            .src_stage_mask(src.stage_mask)
                            .src_access_mask(src.access_mask)
                            .dst_stage_mask(dst.stage_mask)
                            .dst_access_mask(dst.access_mask)
                            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED),
                    )
                })
                .collect()
        }

        /// Build synchronization2 image barriers covering every mip and layer.
        ///
        /// `resolve` returns the Vulkan image and its aspect mask, or `None` to skip it.
        pub fn to_vk_image_barriers<'a, F>(&self, resolve: F) -> Vec<vk::ImageMemoryBarrier2<'a>>
        where
            F: Fn(ResourceId) -> Option<(vk::Image, vk::ImageAspectFlags)>,
        {
            self.image_barriers()
                .filter_map(|barrier| {
                    let (image, aspect_mask) = resolve(barrier.id)?;
                    let src = barrier.src.to_vk();
                    let dst = barrier.dst.to_vk();
                    Some(
                        vk::ImageMemoryBarrier2::default()
                            .image(image)
                            .old_layout(src.layout)
                            .new_layout(dst.layout)
                            .src_stage_mask(src.stage_mask)
                            .src_access_mask(src.access_mask)
                            .dst_stage_mask(dst.stage_mask)
                            .dst_access_mask(dst.access_mask)
                            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .subresource_range(vk::ImageSubresourceRange {
                                aspect_mask,
                                base_mip_level: 0,
                                level_count: vk::REMAINING_MIP_LEVELS,
                                base_array_layer: 0,
                                layer_count: vk::REMAINING_ARRAY_LAYERS,
                            }),
                    )
                })
                .collect()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ResourceId {
        ResourceId::new(raw)
    }

    #[test]
    fn test_barrier_batch_empty() {
        let batch = BarrierBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn test_barrier_batch_skip_same_access() {
        let mut batch = BarrierBatch::new();
        batch.add_image_barrier(id(1), ImageAccess::ColorAttachment, ImageAccess::ColorAttachment);
        batch.add_buffer_barrier(id(2), BufferAccess::ShaderRead, BufferAccess::ShaderRead);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_barrier_batch_merges_keeping_first_source() {
        let mut batch = BarrierBatch::new();
        batch.add_image_barrier(id(1), ImageAccess::Undefined, ImageAccess::ColorAttachment);
        batch.add_image_barrier(id(1), ImageAccess::ColorAttachment, ImageAccess::SampledRead);

        assert_eq!(batch.len(), 1);
        let barrier = batch.image_barriers().next().unwrap();
        assert_eq!(barrier.src, ImageAccess::Undefined);
        assert_eq!(barrier.dst, ImageAccess::SampledRead);
    }

    #[test]
    fn test_barrier_batch_round_trip_cancels() {
        let mut batch = BarrierBatch::new();
        batch.add_buffer_barrier(id(1), BufferAccess::ShaderRead, BufferAccess::TransferRead);
        batch.add_buffer_barrier(id(1), BufferAccess::TransferRead, BufferAccess::ShaderRead);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_barrier_batch_multiple_resources_ordered() {
        let mut batch = BarrierBatch::new();
        batch.add_buffer_barrier(id(9), BufferAccess::Undefined, BufferAccess::TransferWrite);
        batch.add_buffer_barrier(id(3), BufferAccess::Undefined, BufferAccess::TransferWrite);
        batch.add_image_barrier(id(4), ImageAccess::Undefined, ImageAccess::General);

        assert_eq!(batch.len(), 3);
        let ids: Vec<_> = batch.buffer_barriers().map(|b| b.id.as_u32()).collect();
        assert_eq!(ids, vec![3, 9]);

        let taken = batch.take();
        assert!(batch.is_empty());
        assert_eq!(taken.len(), 3);
    }
}
