use std::num::NonZeroU64;

use super::Slot;

/// Smallest buffer ever allocated. Bindings cannot be zero-sized.
pub const MIN_BUFFER_SIZE: u64 = 16;

/// Capacity after growing from `current` until `required` fits. Doubles.
pub fn grown_capacity(current: u64, required: u64) -> u64 {
    let mut capacity = current.max(MIN_BUFFER_SIZE);
    while capacity < required {
        capacity *= 2;
    }
    capacity
}

/// A device buffer reallocated on demand.
///
/// Contents are rewritten in full every time the buffer is uploaded, so
/// growth drops the old allocation instead of copying it.
#[derive(Debug)]
pub struct DeviceBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: Slot<wgpu::Buffer>,
    capacity: u64,
    /// Bytes written by the last upload.
    len: u64,
}

impl DeviceBuffer {
    pub const fn new(label: &'static str, usage: wgpu::BufferUsages) -> Self {
        Self {
            label,
            usage,
            buffer: Slot::Unallocated,
            capacity: 0,
            len: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.get()
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_allocated()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn allocate(&mut self, device: &wgpu::Device, size: u64) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size,
            usage: self.usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.buffer.set(buffer);
        self.capacity = size;
    }

    /// Makes room for `size` bytes. Returns whether the buffer was
    /// reallocated; the old contents are gone if so.
    pub fn reserve(&mut self, device: &wgpu::Device, size: u64) -> bool {
        if self.buffer.is_allocated() && size <= self.capacity {
            return false;
        }
        let capacity = grown_capacity(self.capacity, size);
        if self.capacity > 0 {
            log::debug!("growing {}: {} -> {} bytes", self.label, self.capacity, capacity);
        }
        self.allocate(device, capacity);
        true
    }

    /// Replaces the buffer with one of exactly `size` bytes (at least
    /// [`MIN_BUFFER_SIZE`]).
    pub fn reallocate_exact(&mut self, device: &wgpu::Device, size: u64) {
        self.allocate(device, size.max(MIN_BUFFER_SIZE));
        self.len = size;
    }

    /// Writes `bytes` at offset 0, growing first if needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) -> bool {
        let grew = self.reserve(device, bytes.len() as u64);
        if let (false, Some(buffer)) = (bytes.is_empty(), self.buffer.get()) {
            queue.write_buffer(buffer, 0, bytes);
        }
        self.len = bytes.len() as u64;
        grew
    }

    /// Binding over the first `size` bytes, or the whole buffer when
    /// `size` is `None`.
    pub fn binding(&self, size: Option<u64>) -> Option<wgpu::BindingResource<'_>> {
        let buffer = self.buffer.get()?;
        Some(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer,
            offset: 0,
            size: size.and_then(NonZeroU64::new),
        }))
    }

    pub fn release(&mut self) -> bool {
        self.capacity = 0;
        self.len = 0;
        self.buffer.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_starts_at_minimum_and_doubles() {
        assert_eq!(grown_capacity(0, 0), 16);
        assert_eq!(grown_capacity(0, 17), 32);
        assert_eq!(grown_capacity(64, 64), 64);
        assert_eq!(grown_capacity(64, 65), 128);
        assert_eq!(grown_capacity(100, 1000), 1600);
    }

    #[test]
    fn release_without_device_is_safe() {
        let mut buffer = DeviceBuffer::new("test", wgpu::BufferUsages::STORAGE);
        assert!(!buffer.release());
        assert!(buffer.binding(None).is_none());
        assert_eq!(buffer.capacity(), 0);
    }
}
