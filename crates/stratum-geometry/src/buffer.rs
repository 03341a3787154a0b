//! Two-phase host staging buffers.
//!
//! A [`BufferWriter`] appends elements and grows by doubling when it runs out
//! of room. [`BufferWriter::finish`] consumes it into a read-only
//! [`BufferView`]; [`BufferView::reset`] hands the same allocation back as an
//! empty writer. Reading while writing is not expressible.

use bytemuck::Pod;

/// Initial capacity (in elements) of a buffer created with [`BufferWriter::new`].
pub const DEFAULT_CAPACITY: usize = 65_536;

/// Write-mode staging buffer.
#[derive(Debug)]
pub struct BufferWriter<T: Pod> {
    storage: Box<[T]>,
    len: usize,
}

/// Read-mode view of a finished [`BufferWriter`].
#[derive(Debug)]
pub struct BufferView<T: Pod> {
    storage: Box<[T]>,
    len: usize,
}

pub type IntBuffer = BufferWriter<i32>;
pub type FloatBuffer = BufferWriter<f32>;

impl<T: Pod> BufferWriter<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![T::zeroed(); capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// A writer with no backing storage. Used as a placeholder while the real
    /// writer is checked out as a view.
    pub fn empty() -> Self {
        Self::with_capacity(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Makes room for `additional` more elements.
    ///
    /// Capacity doubles until the request fits; written elements are copied
    /// over in order. Does nothing when the request already fits.
    pub fn ensure_capacity(&mut self, additional: usize) {
        let required = self.len + additional;
        let mut capacity = self.storage.len();
        if required <= capacity {
            return;
        }

        capacity = capacity.max(1);
        while capacity < required {
            capacity *= 2;
        }

        let mut grown = vec![T::zeroed(); capacity].into_boxed_slice();
        grown[..self.len].copy_from_slice(&self.storage[..self.len]);
        self.storage = grown;
    }

    #[inline]
    pub fn put(&mut self, value: T) {
        self.ensure_capacity(1);
        self.storage[self.len] = value;
        self.len += 1;
    }

    pub fn put_slice(&mut self, values: &[T]) {
        self.ensure_capacity(values.len());
        self.storage[self.len..self.len + values.len()].copy_from_slice(values);
        self.len += values.len();
    }

    /// Elements written so far.
    pub fn written(&self) -> &[T] {
        &self.storage[..self.len]
    }

    /// Drops written elements, keeping the allocation.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Finalizes writes and switches to read mode.
    pub fn finish(self) -> BufferView<T> {
        BufferView {
            storage: self.storage,
            len: self.len,
        }
    }
}

impl<T: Pod> Default for BufferWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> BufferView<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.storage[..self.len]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Returns to write mode with the cursor at zero. The allocation is reused.
    pub fn reset(self) -> BufferWriter<T> {
        BufferWriter {
            storage: self.storage,
            len: 0,
        }
    }
}
