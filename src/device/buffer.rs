use super::DEVICE;

/// An allocation living in accelerator memory.
///
/// The contents are only reachable through the kernels and copy routines of
/// [`Device`](super::Device); host code never addresses them directly.
/// Dropping the buffer returns its bytes to the device.
#[derive(Debug)]
pub struct DeviceBuffer {
    pub(super) mem: Box<[f32]>,
}

impl DeviceBuffer {
    pub(super) fn new(mem: Box<[f32]>) -> Self {
        Self { mem }
    }

    /// Number of `f32` elements in the allocation.
    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if let Some(device) = DEVICE.get() {
            device.release(self.mem.len());
        }
    }
}
