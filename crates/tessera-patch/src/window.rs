//! Windowed copy-out and copy-in of a sub-box of one variable's data.
//!
//! The window side is always densely packed. The patch side uses the
//! variable's stored strides, which include padding for padded variables.
//! Both directions move whole axis-0 runs, one `copy_from_slice` per row.

use std::sync::Arc;

use smallvec::{smallvec, SmallVec};
use tessera_core::point::strides;
use tessera_core::{GridPoint, VarBuffer};
use tracing::debug;

use crate::data::allocate_checked;
use crate::error::PatchError;
use crate::patch::Patch;

/// Validated window geometry, relative to the patch origin.
struct Window {
    /// Window lower corner minus patch origin.
    start: GridPoint,
    /// Cells along each axis.
    dims: GridPoint,
    /// Total cells.
    count: u64,
}

impl Patch {
    /// Copy the box `lower..=upper` (global indices) of the variable at
    /// `position` into a fresh, densely packed buffer.
    ///
    /// Returns the buffer and its element count. The buffer comes from the
    /// variable's descriptor; hand it back with
    /// [`VarDescriptor::release`](tessera_core::VarDescriptor::release) or
    /// just drop it. Allocates the variable's own data first if needed.
    pub fn extract_window(
        &mut self,
        position: usize,
        lower: &[u32],
        upper: &[u32],
    ) -> Result<(VarBuffer, u64), PatchError> {
        self.check_position(position)?;
        let window = self.window(lower, upper)?;
        let var = Arc::clone(&self.slots[position].var);
        let es = var.size_per_element();
        // Allocate before deriving strides: a layout too large to address
        // fails here as AllocationFailed.
        self.data_handle(position)?;
        let stored_strides = strides(&self.actual_extent(position)?);

        let data = self.data_handle(position)?;
        let mut out = allocate_checked(&var, window.count)?;
        let row_bytes = window.dims[0] as usize * es;
        for_each_row(&window, &stored_strides, |stored, packed| {
            let (s, p) = (stored * es, packed * es);
            out.as_bytes_mut()[p..p + row_bytes]
                .copy_from_slice(&data.as_bytes()[s..s + row_bytes]);
        });
        debug!(
            var = var.name(),
            cells = window.count,
            "extracted window"
        );
        Ok((out, window.count))
    }

    /// Copy a densely packed `source` into the box `lower..=upper` (global
    /// indices) of the variable at `position`.
    ///
    /// `source` must hold at least one element per window cell, each
    /// `size_per_element` bytes; extra trailing bytes are ignored.
    /// Allocates the variable's data first if needed.
    pub fn put_window(
        &mut self,
        position: usize,
        lower: &[u32],
        upper: &[u32],
        source: &[u8],
    ) -> Result<(), PatchError> {
        self.check_position(position)?;
        let window = self.window(lower, upper)?;
        let es = self.slots[position].var.size_per_element();
        let needed = window.count.saturating_mul(es as u64);
        if (source.len() as u64) < needed {
            return Err(PatchError::InvalidArgument {
                reason: format!(
                    "window source has {} bytes, window needs {needed}",
                    source.len()
                ),
            });
        }
        self.data_handle(position)?;
        let stored_strides = strides(&self.actual_extent(position)?);

        let data = self.data_handle(position)?;
        let row_bytes = window.dims[0] as usize * es;
        for_each_row(&window, &stored_strides, |stored, packed| {
            let (s, p) = (stored * es, packed * es);
            data.as_bytes_mut()[s..s + row_bytes]
                .copy_from_slice(&source[p..p + row_bytes]);
        });
        debug!(cells = window.count, position, "put window");
        Ok(())
    }

    /// Validate `lower..=upper` against the patch and convert it to
    /// origin-relative geometry.
    fn window(&self, lower: &[u32], upper: &[u32]) -> Result<Window, PatchError> {
        self.check_ndim("window lower corner", lower.len())?;
        self.check_ndim("window upper corner", upper.len())?;
        let patch_upper = self.upper_index();
        let mut start = GridPoint::with_capacity(self.ndim());
        let mut dims = GridPoint::with_capacity(self.ndim());
        for axis in 0..self.ndim() {
            let (lo, hi) = (lower[axis], upper[axis]);
            let (o, u) = (self.origin()[axis], patch_upper[axis]);
            if lo > hi {
                return Err(PatchError::InvalidBounds {
                    reason: format!("window axis {axis}: lower {lo} > upper {hi}"),
                });
            }
            if lo < o {
                return Err(PatchError::OutOfRange {
                    what: "window lower corner",
                    value: u64::from(lo),
                    bounds: format!("[{o}, {u}] on axis {axis}"),
                });
            }
            if hi > u {
                return Err(PatchError::OutOfRange {
                    what: "window upper corner",
                    value: u64::from(hi),
                    bounds: format!("[{o}, {u}] on axis {axis}"),
                });
            }
            start.push(lo - o);
            dims.push(hi - lo + 1);
        }
        let count = dims.iter().map(|&d| u64::from(d)).product();
        Ok(Window { start, dims, count })
    }
}

/// Call `f(stored_offset, packed_offset)` (in elements) for the first cell
/// of every axis-0 row of the window.
fn for_each_row(window: &Window, stored_strides: &[usize], mut f: impl FnMut(usize, usize)) {
    let n = window.dims.len();
    let row = window.dims[0] as usize;
    let rows: usize = window.dims[1..].iter().map(|&d| d as usize).product();
    let base: usize = window
        .start
        .iter()
        .zip(stored_strides)
        .map(|(&k, &s)| k as usize * s)
        .sum();

    let mut k: SmallVec<[u32; 4]> = smallvec![0; n];
    for r in 0..rows {
        let stored = base
            + (1..n)
                .map(|i| k[i] as usize * stored_strides[i])
                .sum::<usize>();
        f(stored, r * row);
        for i in 1..n {
            k[i] += 1;
            if k[i] < window.dims[i] {
                break;
            }
            k[i] = 0;
        }
    }
}
