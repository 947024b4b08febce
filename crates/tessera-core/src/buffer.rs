//! Owned, element-sized byte buffers holding one variable's cell data.
//!
//! The patch core never interprets element contents: it moves whole
//! elements of `element_size` bytes. Typed views go through `bytemuck`,
//! which checks size and alignment instead of trusting the caller.

use bytemuck::{NoUninit, Pod};

use crate::error::AllocError;

/// A contiguous run of fixed-size elements stored as raw bytes.
///
/// The byte length is always `len() * element_size()`.
#[derive(Clone, PartialEq, Eq)]
pub struct VarBuffer {
    bytes: Vec<u8>,
    element_size: usize,
}

impl VarBuffer {
    /// Allocate `element_count` zero-filled elements of `element_size` bytes.
    ///
    /// The reservation is fallible: an overflowing size or an allocator
    /// refusal comes back as [`AllocError`] rather than aborting.
    pub fn zeroed(element_count: u64, element_size: usize) -> Result<Self, AllocError> {
        let byte_len = usize::try_from(element_count)
            .ok()
            .and_then(|n| n.checked_mul(element_size))
            .ok_or_else(|| AllocError::overflow(element_count, element_size))?;
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(byte_len).map_err(|e| AllocError {
            requested_bytes: byte_len as u64,
            reason: e.to_string(),
        })?;
        bytes.resize(byte_len, 0);
        Ok(Self {
            bytes,
            element_size,
        })
    }

    /// Copy a typed slice into a new buffer, one element per item.
    pub fn from_elements<T: NoUninit>(items: &[T]) -> Self {
        Self {
            bytes: bytemuck::cast_slice::<T, u8>(items).to_vec(),
            element_size: std::mem::size_of::<T>(),
        }
    }

    /// Wrap raw bytes as elements of `element_size` bytes.
    ///
    /// Returns `None` if `element_size` is zero or does not divide the
    /// byte length.
    pub fn from_bytes(bytes: Vec<u8>, element_size: usize) -> Option<Self> {
        if element_size == 0 || bytes.len() % element_size != 0 {
            return None;
        }
        Some(Self {
            bytes,
            element_size,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.element_size.max(1)
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Total size in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw bytes, mutable.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Consume the buffer, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Copy the contents out as a typed vector.
    ///
    /// Works regardless of the backing allocation's alignment. Trailing
    /// bytes that do not fill a whole `T` are zero-extended.
    pub fn to_vec<T: Pod>(&self) -> Vec<T> {
        bytemuck::pod_collect_to_vec(self.bytes.as_slice())
    }

    /// Borrow the contents as a typed slice.
    ///
    /// Returns `None` if the allocation is not aligned for `T` or the
    /// byte length is not a multiple of `size_of::<T>()`.
    pub fn try_as_slice<T: Pod>(&self) -> Option<&[T]> {
        bytemuck::try_cast_slice(self.bytes.as_slice()).ok()
    }

    /// Mutably borrow the contents as a typed slice.
    ///
    /// Same conditions as [`VarBuffer::try_as_slice`].
    pub fn try_as_slice_mut<T: Pod>(&mut self) -> Option<&mut [T]> {
        bytemuck::try_cast_slice_mut(self.bytes.as_mut_slice()).ok()
    }

    /// Overwrite elements starting at `first` with `items`.
    ///
    /// Returns `false` (and writes nothing) if `T` does not match the
    /// element size or the run would end past the buffer.
    pub fn write_elements<T: NoUninit>(&mut self, first: usize, items: &[T]) -> bool {
        if std::mem::size_of::<T>() != self.element_size {
            return false;
        }
        let src: &[u8] = bytemuck::cast_slice(items);
        let start = first * self.element_size;
        let Some(end) = start.checked_add(src.len()) else {
            return false;
        };
        if end > self.bytes.len() {
            return false;
        }
        self.bytes[start..end].copy_from_slice(src);
        true
    }
}

impl std::fmt::Debug for VarBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarBuffer")
            .field("len", &self.len())
            .field("element_size", &self.element_size)
            .finish()
    }
}
