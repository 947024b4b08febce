//! Axis transposition for every variable of a patch.
//!
//! One N-dimensional kernel covers every axis pair. It walks the
//! *destination* in memory order and gathers from the source through
//! permuted strides, so stores are sequential and loads are strided. The
//! `transpose_ops` benchmark in `tessera-bench` compares this order with
//! the scatter-store alternative.
//!
//! When axis 0 is not involved the source rows stay contiguous and the
//! kernel copies whole axis-0 runs at once.

use smallvec::{smallvec, SmallVec};
use tessera_core::point::strides;
use tessera_core::VarBuffer;
use tracing::{debug, trace};

use crate::data::allocate_checked;
use crate::error::PatchError;
use crate::patch::{swapped, Patch};

impl Patch {
    /// Exchange axes `a` and `b` for every attached variable and for the
    /// patch geometry.
    ///
    /// All new buffers are built before any is installed, so a failed
    /// allocation leaves the patch exactly as it was. Empty slots stay
    /// empty. `a == b` is a no-op.
    ///
    /// Returns `Err(PatchError::OutOfRange)` if either axis is not a valid
    /// axis index.
    pub fn transpose(&mut self, a: usize, b: usize) -> Result<(), PatchError> {
        self.check_axis(a)?;
        self.check_axis(b)?;
        if a == b {
            return Ok(());
        }
        debug!(axis_a = a, axis_b = b, vars = self.var_count(), "transposing patch");

        let mut staged: Vec<Option<VarBuffer>> = Vec::with_capacity(self.slots.len());
        for position in 0..self.slots.len() {
            match self.transpose_slot(position, a, b) {
                Ok(buf) => staged.push(buf),
                Err(e) => {
                    for (slot, buf) in self.slots.iter().zip(staged) {
                        if let Some(buf) = buf {
                            slot.var.release(buf);
                        }
                    }
                    return Err(e);
                }
            }
        }

        for (slot, new) in self.slots.iter_mut().zip(staged) {
            if let Some(new) = new {
                if let Some(old) = slot.data.replace(new) {
                    slot.var.release(old);
                }
            }
        }
        self.swap_axes(a, b);
        Ok(())
    }

    /// Build the transposed copy of one slot's buffer, if it has one.
    fn transpose_slot(
        &self,
        position: usize,
        a: usize,
        b: usize,
    ) -> Result<Option<VarBuffer>, PatchError> {
        let slot = &self.slots[position];
        let Some(src) = slot.data.as_ref() else {
            return Ok(None);
        };
        let dims = self.actual_extent(position)?;
        let count = self.actual_cell_count(position)?;
        let element_size = slot.var.size_per_element();
        let mut dst = allocate_checked(&slot.var, count)?;

        let slabs = swapped(&dims, a, b)[dims.len() - 1] as usize;
        let workers = self.config.workers_for(src.byte_len(), slabs);
        trace!(
            var = slot.var.name(),
            bytes = src.byte_len(),
            workers,
            "transposing variable"
        );
        transpose_bytes(
            src.as_bytes(),
            dst.as_bytes_mut(),
            element_size,
            &dims,
            a,
            b,
            workers,
        );
        Ok(Some(dst))
    }
}

/// Copy `src`, laid out axis-0-fastest with extents `dims`, into `dst` with axes
/// `a` and `b` exchanged.
///
/// The outermost destination axis is split into slabs; with `workers > 1`
/// contiguous groups of slabs are filled on scoped threads.
///
/// # Panics
///
/// Panics if either buffer is not exactly `product(dims) * element_size`
/// bytes or if `a`/`b` are not axes of `dims`.
pub fn transpose_bytes(
    src: &[u8],
    dst: &mut [u8],
    element_size: usize,
    dims: &[u32],
    a: usize,
    b: usize,
    workers: usize,
) {
    let total: usize = dims.iter().map(|&d| d as usize).product::<usize>() * element_size;
    assert_eq!(src.len(), total, "source buffer does not match extents");
    assert_eq!(dst.len(), total, "destination buffer does not match extents");
    assert!(a < dims.len() && b < dims.len(), "axis out of range");

    if a == b || dims.len() == 1 || total == 0 {
        dst.copy_from_slice(src);
        return;
    }

    let plan = Plan::new(dims, a, b, element_size);
    let slab_bytes = plan.slab_len * element_size;
    let slabs = dst.len() / slab_bytes;

    if workers <= 1 || slabs < 2 {
        for (outer, slab) in dst.chunks_mut(slab_bytes).enumerate() {
            plan.fill_slab(src, slab, outer);
        }
        return;
    }

    let per_worker = slabs.div_ceil(workers.min(slabs));
    std::thread::scope(|scope| {
        for (group, chunk) in dst.chunks_mut(per_worker * slab_bytes).enumerate() {
            let plan = &plan;
            scope.spawn(move || {
                let first = group * per_worker;
                for (i, slab) in chunk.chunks_mut(slab_bytes).enumerate() {
                    plan.fill_slab(src, slab, first + i);
                }
            });
        }
    });
}

/// Precomputed strides for one transposition.
struct Plan {
    /// Destination extents.
    dims_t: SmallVec<[u32; 4]>,
    /// Source element stride for a unit step along each destination axis.
    gather: SmallVec<[usize; 4]>,
    /// Elements per outermost-axis slab of the destination.
    slab_len: usize,
    element_size: usize,
}

impl Plan {
    fn new(dims: &[u32], a: usize, b: usize, element_size: usize) -> Self {
        let dims_t = swapped(dims, a, b);
        let src_strides = strides(dims);
        let gather = swapped(&src_strides, a, b);
        let outer = dims_t.len() - 1;
        let slab_len = dims_t[..outer].iter().map(|&d| d as usize).product();
        Self {
            dims_t,
            gather,
            slab_len,
            element_size,
        }
    }

    /// Fill the destination slab at index `outer` of the outermost axis.
    fn fill_slab(&self, src: &[u8], slab: &mut [u8], outer: usize) {
        let n = self.dims_t.len();
        let es = self.element_size;
        let row = self.dims_t[0] as usize;
        let row_bytes = row * es;
        let contiguous = self.gather[0] == 1;
        let base = outer * self.gather[n - 1];

        // Odometer over the middle axes 1..n-1.
        let mut k: SmallVec<[u32; 4]> = smallvec![0; n];
        for dst_row in slab.chunks_mut(row_bytes) {
            let src_row: usize = base
                + (1..n - 1)
                    .map(|i| k[i] as usize * self.gather[i])
                    .sum::<usize>();
            if contiguous {
                let start = src_row * es;
                dst_row.copy_from_slice(&src[start..start + row_bytes]);
            } else {
                let step = self.gather[0];
                for (j, out) in dst_row.chunks_mut(es).enumerate() {
                    let start = (src_row + j * step) * es;
                    out.copy_from_slice(&src[start..start + es]);
                }
            }
            for i in 1..n - 1 {
                k[i] += 1;
                if k[i] < self.dims_t[i] {
                    break;
                }
                k[i] = 0;
            }
        }
    }
}
