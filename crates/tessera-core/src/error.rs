//! Allocation error type shared by descriptors and buffers.

use std::error::Error;
use std::fmt;

/// A variable's memory provider could not hand out a buffer.
///
/// Raised either because the requested size does not fit in `usize`
/// or because the allocator refused the reservation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Number of bytes requested, saturated at `u64::MAX` on overflow.
    pub requested_bytes: u64,
    /// What went wrong.
    pub reason: String,
}

impl AllocError {
    /// The element count times element size overflowed.
    pub fn overflow(element_count: u64, element_size: usize) -> Self {
        Self {
            requested_bytes: u64::MAX,
            reason: format!("{element_count} elements of {element_size} bytes overflows usize"),
        }
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocation of {} bytes failed: {}",
            self.requested_bytes, self.reason
        )
    }
}

impl Error for AllocError {}
