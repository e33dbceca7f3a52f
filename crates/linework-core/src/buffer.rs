//! Growable typed buffers for packed scene data.
//!
//! Scene batches accumulate vertices, indices and per-instance transforms in
//! [`PackedBuffer`]s before they are serialized into the final contiguous
//! regions handed to the GPU front-end.

use bytemuck::Pod;

/// Minimum initial capacity, in elements.
const MIN_CAPACITY: usize = 16;

/// A dynamically grown typed buffer with copy-out into a final region.
///
/// Capacity doubles on overflow, starting from a caller-supplied initial
/// capacity. Elements never move within the buffer on append, so the index
/// returned by [`push`](Self::push) stays valid for the buffer's lifetime.
#[derive(Debug, Clone)]
pub struct PackedBuffer<T: Pod> {
    data: Vec<T>,
}

impl<T: Pod> PackedBuffer<T> {
    /// Create a buffer with the given initial capacity (clamped to at least 16).
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(initial_capacity.max(MIN_CAPACITY)),
        }
    }

    /// Append one element, returning its index.
    #[inline]
    pub fn push(&mut self, value: T) -> usize {
        if self.data.len() == self.data.capacity() {
            // Exact doubling keeps growth deterministic across platforms.
            self.data.reserve_exact(self.data.capacity());
        }
        let index = self.data.len();
        self.data.push(value);
        index
    }

    /// Append a slice of elements, returning the index of the first one.
    pub fn extend_from_slice(&mut self, values: &[T]) -> usize {
        let index = self.data.len();
        let needed = self.data.len() + values.len();
        if needed > self.data.capacity() {
            let mut capacity = self.data.capacity().max(MIN_CAPACITY);
            while capacity < needed {
                capacity *= 2;
            }
            self.data.reserve_exact(capacity - self.data.len());
        }
        self.data.extend_from_slice(values);
        index
    }

    /// Read the element at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.data[index]
    }

    /// Number of elements stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current capacity in elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// View the stored elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Copy all contents into `dst` starting at `dst_offset` (in elements).
    ///
    /// # Panics
    ///
    /// Panics if the destination region is too small.
    pub fn copy_to(&self, dst: &mut [T], dst_offset: usize) {
        dst[dst_offset..dst_offset + self.data.len()].copy_from_slice(&self.data);
    }
}

impl<T: Pod> Default for PackedBuffer<T> {
    fn default() -> Self {
        Self::new(MIN_CAPACITY)
    }
}
