//! Per-frame uploads of small plain data, like uniforms.

use std::marker::PhantomData;

use bindless_core::{FrameInFlight, ResourceInFlight, SeedInFlight};
use bytemuck::Pod;

use crate::device::GraphicsDevice;
use crate::error::GraphicsResult;
use crate::resources::SharedBuffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// One host-writable buffer of `T` per frame in flight.
///
/// Each frame writes its own buffer, so an upload never races with a frame
/// the GPU may still be reading, as long as frames are started through a
/// [`FrameManager`](crate::FrameManager) of the same seed.
#[derive(Debug)]
pub struct UploadInFlight<T: Pod> {
    buffers: ResourceInFlight<SharedBuffer>,
    _data: PhantomData<fn(T)>,
}

impl<T: Pod> UploadInFlight<T> {
    /// Allocate the buffers with `usage` plus [`BufferUsage::MAP_WRITE`].
    pub fn new(
        device: &GraphicsDevice,
        seed: impl Into<SeedInFlight>,
        usage: BufferUsage,
        label: &str,
    ) -> GraphicsResult<Self> {
        let size = std::mem::size_of::<T>() as u64;
        let buffers = ResourceInFlight::try_new(seed, |fif| {
            let descriptor = BufferDescriptor::new(size, usage | BufferUsage::MAP_WRITE)
                .with_label(format!("{label} [frame {}]", fif.frame_index()));
            device.create_shared_buffer(&descriptor)
        })?;
        Ok(Self {
            buffers,
            _data: PhantomData,
        })
    }

    /// Write `data` into the buffer of `fif` and return it.
    ///
    /// Upload before recording the work that reads the buffer.
    pub fn upload<'a>(&'a self, fif: FrameInFlight<'a>, data: &T) -> GraphicsResult<&'a SharedBuffer> {
        let buffer = self.buffers.index(fif);
        buffer.host_write_unchecked(0, bytemuck::bytes_of(data))?;
        Ok(buffer)
    }

    pub fn seed(&self) -> SeedInFlight {
        self.buffers.seed()
    }
}

impl<T: Pod> From<&UploadInFlight<T>> for SeedInFlight {
    fn from(value: &UploadInFlight<T>) -> Self {
        value.seed()
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::{Pod, Zeroable};

    use super::*;
    use crate::device::DeviceConfig;
    use crate::frame_manager::FrameManager;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    struct Uniforms {
        time: f32,
        frame: u32,
    }

    #[test]
    fn test_upload_per_frame() {
        let device = GraphicsDevice::new(DeviceConfig::default());
        let mut frames = FrameManager::new(device.clone(), 2);
        let uploads = UploadInFlight::<Uniforms>::new(
            &device,
            &frames,
            BufferUsage::UNIFORM_BUFFER | BufferUsage::MAP_READ,
            "uniforms",
        )
        .unwrap();

        let mut names = Vec::new();
        for i in 0..4u32 {
            frames.new_frame(|frame| {
                let uniforms = Uniforms {
                    time: i as f32 * 0.5,
                    frame: i,
                };
                let buffer = uploads.upload(frame.fif, &uniforms).unwrap();
                assert_eq!(buffer.host_read_vec::<Uniforms>().unwrap(), vec![uniforms]);
                names.push(buffer.name().to_string());
                None
            });
        }
        assert_eq!(
            names,
            vec![
                "uniforms [frame 0]",
                "uniforms [frame 1]",
                "uniforms [frame 0]",
                "uniforms [frame 1]"
            ]
        );
        assert!(uploads.buffers.iter().all(|b| b.usage().contains(BufferUsage::MAP_WRITE)));
    }

    #[test]
    fn test_upload_rejects_zero_sized() {
        let device = GraphicsDevice::new(DeviceConfig::default());
        let result = UploadInFlight::<()>::new(&device, SeedInFlight::new(1), BufferUsage::UNIFORM_BUFFER, "empty");
        assert!(result.is_err());
    }
}
