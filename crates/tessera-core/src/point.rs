//! Grid index tuples and row-major layout arithmetic.
//!
//! Every layout in Tessera is axis-0-contiguous: axis 0 varies fastest in
//! memory and each subsequent axis multiplies the stride by the extent of
//! the axes before it.

use smallvec::SmallVec;

/// An N-dimensional unsigned grid index or extent.
///
/// Inline storage covers the common 1-D to 4-D cases without touching
/// the heap.
pub type GridPoint = SmallVec<[u32; 4]>;

/// An N-dimensional signed offset, e.g. a distance vector.
pub type GridOffset = SmallVec<[i64; 4]>;

/// Row-major element strides for the given extents (axis 0 fastest).
///
/// `strides(&[4, 3, 2]) == [1, 4, 12]`. The extent of the last axis never
/// enters a stride; strides that do not fit `usize` saturate.
pub fn strides(dims: &[u32]) -> SmallVec<[usize; 4]> {
    let mut out = SmallVec::with_capacity(dims.len());
    let mut stride = 1usize;
    for (axis, &d) in dims.iter().enumerate() {
        out.push(stride);
        if axis + 1 < dims.len() {
            stride = stride.saturating_mul(d as usize);
        }
    }
    out
}

/// Product of the extents, or `None` if it overflows `u64`.
pub fn checked_cell_count(dims: &[u32]) -> Option<u64> {
    dims.iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(u64::from(d)))
}

/// Linear element offset of `coord` under the given strides.
pub fn linear_offset(coord: &[u32], strides: &[usize]) -> usize {
    coord
        .iter()
        .zip(strides)
        .map(|(&k, &s)| k as usize * s)
        .sum()
}
