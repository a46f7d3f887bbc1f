//! Synchronization2 masks and layouts for access states.

use ash::vk;

use super::{BufferAccess, ImageAccess};

/// Pipeline stages and memory access of a buffer access state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VkBufferAccess {
    pub stage_mask: vk::PipelineStageFlags2,
    pub access_mask: vk::AccessFlags2,
}

/// Pipeline stages, memory access and layout of an image access state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VkImageAccess {
    pub stage_mask: vk::PipelineStageFlags2,
    pub access_mask: vk::AccessFlags2,
    pub layout: vk::ImageLayout,
}

const SHADER_STAGES: vk::PipelineStageFlags2 = vk::PipelineStageFlags2::from_raw(
    vk::PipelineStageFlags2::ALL_GRAPHICS.as_raw() | vk::PipelineStageFlags2::COMPUTE_SHADER.as_raw(),
);

impl BufferAccess {
    pub fn to_vk(self) -> VkBufferAccess {
        use vk::AccessFlags2 as A;
        use vk::PipelineStageFlags2 as S;

        let (stage_mask, access_mask) = match self {
            Self::Undefined => (S::ALL_COMMANDS, A::NONE),
            Self::General => (S::ALL_COMMANDS, A::MEMORY_READ | A::MEMORY_WRITE),
            Self::GeneralRead => (S::ALL_COMMANDS, A::MEMORY_READ),
            Self::GeneralWrite => (S::ALL_COMMANDS, A::MEMORY_WRITE),
            Self::TransferRead => (S::TRANSFER, A::TRANSFER_READ),
            Self::TransferWrite => (S::TRANSFER, A::TRANSFER_WRITE),
            Self::ShaderRead => (SHADER_STAGES, A::SHADER_STORAGE_READ),
            Self::ShaderWrite => (SHADER_STAGES, A::SHADER_STORAGE_WRITE),
            Self::ShaderReadWrite => (
                SHADER_STAGES,
                A::SHADER_STORAGE_READ | A::SHADER_STORAGE_WRITE,
            ),
            Self::HostAccess => (S::HOST, A::HOST_READ | A::HOST_WRITE),
            Self::IndirectCommandRead => (S::DRAW_INDIRECT, A::INDIRECT_COMMAND_READ),
            Self::IndexRead => (S::INDEX_INPUT, A::INDEX_READ),
            Self::VertexAttributeRead => (S::VERTEX_ATTRIBUTE_INPUT, A::VERTEX_ATTRIBUTE_READ),
        };
        VkBufferAccess {
            stage_mask,
            access_mask,
        }
    }
}

impl ImageAccess {
    pub fn to_vk(self) -> VkImageAccess {
        use vk::AccessFlags2 as A;
        use vk::ImageLayout as L;
        use vk::PipelineStageFlags2 as S;

        let (stage_mask, access_mask, layout) = match self {
            Self::Undefined => (S::ALL_COMMANDS, A::NONE, L::UNDEFINED),
            Self::General => (S::ALL_COMMANDS, A::MEMORY_READ | A::MEMORY_WRITE, L::GENERAL),
            Self::GeneralRead => (S::ALL_COMMANDS, A::MEMORY_READ, L::SHADER_READ_ONLY_OPTIMAL),
            Self::GeneralWrite => (S::ALL_COMMANDS, A::MEMORY_WRITE, L::GENERAL),
            Self::TransferRead => (S::TRANSFER, A::TRANSFER_READ, L::TRANSFER_SRC_OPTIMAL),
            Self::TransferWrite => (S::TRANSFER, A::TRANSFER_WRITE, L::TRANSFER_DST_OPTIMAL),
            Self::StorageRead => (
                SHADER_STAGES,
                A::SHADER_STORAGE_READ,
                L::SHADER_READ_ONLY_OPTIMAL,
            ),
            Self::StorageWrite => (SHADER_STAGES, A::SHADER_STORAGE_WRITE, L::GENERAL),
            Self::StorageReadWrite => (
                SHADER_STAGES,
                A::SHADER_STORAGE_READ | A::SHADER_STORAGE_WRITE,
                L::GENERAL,
            ),
            Self::SampledRead => (
                SHADER_STAGES,
                A::SHADER_SAMPLED_READ,
                L::SHADER_READ_ONLY_OPTIMAL,
            ),
            Self::ColorAttachment => (
                S::COLOR_ATTACHMENT_OUTPUT,
                A::COLOR_ATTACHMENT_READ | A::COLOR_ATTACHMENT_WRITE,
                L::COLOR_ATTACHMENT_OPTIMAL,
            ),
            Self::DepthStencilAttachment => (
                S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
                A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE,
                L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ),
            Self::Present => (S::ALL_COMMANDS, A::NONE, L::PRESENT_SRC_KHR),
        };
        VkImageAccess {
            stage_mask,
            access_mask,
            layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_masks() {
        let access = BufferAccess::TransferWrite.to_vk();
        assert_eq!(access.stage_mask, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(access.access_mask, vk::AccessFlags2::TRANSFER_WRITE);

        let access = ImageAccess::TransferRead.to_vk();
        assert_eq!(access.layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    }

    #[test]
    fn test_shader_stages_cover_compute() {
        let access = BufferAccess::ShaderReadWrite.to_vk();
        assert!(access.stage_mask.contains(vk::PipelineStageFlags2::COMPUTE_SHADER));
        assert!(access.stage_mask.contains(vk::PipelineStageFlags2::ALL_GRAPHICS));
    }

    #[test]
    fn test_write_states_have_write_access() {
        let write_bits = vk::AccessFlags2::MEMORY_WRITE
            | vk::AccessFlags2::TRANSFER_WRITE
            | vk::AccessFlags2::SHADER_STORAGE_WRITE
            | vk::AccessFlags2::HOST_WRITE;
        for access in BufferAccess::all().filter(|a| a.is_write()) {
            assert!(access.to_vk().access_mask.intersects(write_bits), "{access:?}");
        }
    }

    #[test]
    fn test_only_undefined_has_undefined_layout() {
        for access in ImageAccess::all() {
            let undefined = access.to_vk().layout == vk::ImageLayout::UNDEFINED;
            assert_eq!(undefined, access == ImageAccess::Undefined, "{access:?}");
        }
    }
}
