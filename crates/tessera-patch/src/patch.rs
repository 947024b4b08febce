//! The patch registry: geometry plus the attached variables and their slots.
//!
//! Each attached variable occupies one `VarSlot` holding the shared
//! descriptor and an optional buffer, so a buffer always sits at its
//! variable's position.

use std::sync::Arc;

use smallvec::SmallVec;
use tessera_core::point::checked_cell_count;
use tessera_core::{same_var, GridPoint, SharedVar, VarBuffer};
use tracing::{debug, trace};

use crate::config::PatchConfig;
use crate::error::PatchError;

/// One attached variable and its (possibly not yet allocated) data.
#[derive(Debug)]
pub(crate) struct VarSlot {
    pub(crate) var: SharedVar,
    pub(crate) data: Option<VarBuffer>,
}

/// An axis-aligned rectangular block of an N-dimensional regular grid.
///
/// A patch is described by the global index of its lower corner and its
/// extent along every axis. Variables attached to a patch get a position
/// (their index in attachment order); every position-based operation uses
/// that index. Buffers are allocated on first access, not at attachment.
///
/// # Padding
///
/// Variables that require in-place FFT padding store
/// `2 * (extent / 2 + 1)` cells along the padded axis. The padded axis is
/// axis 0 until a transpose moves it; [`Patch::padded_axis`] tracks where
/// it currently lives so the stored layout and the reported actual extents
/// always agree.
///
/// # Examples
///
/// ```
/// use tessera_core::{GridVar, VarType};
/// use tessera_patch::Patch;
///
/// let mut patch = Patch::new(&[0, 0, 0], &[4, 4, 4]).unwrap();
/// let rho = GridVar::new("rho", VarType::Float64, 1).with_fft_padding().into_shared();
/// let pos = patch.attach(&rho);
///
/// assert_eq!(patch.cell_count(), 125);
/// assert_eq!(patch.actual_extent(pos).unwrap().as_slice(), &[6, 5, 5]);
/// assert_eq!(patch.actual_cell_count(pos).unwrap(), 150);
/// ```
#[derive(Debug)]
pub struct Patch {
    origin: GridPoint,
    extent: GridPoint,
    cell_count: u64,
    padded_axis: usize,
    pub(crate) slots: Vec<VarSlot>,
    pub(crate) config: PatchConfig,
}

impl Patch {
    /// Largest extent along any axis. Padding grows an axis by at most two
    /// cells, and the padded extent must still fit in `u32`.
    pub const MAX_EXTENT: u32 = u32::MAX - 2;

    /// Create a patch spanning `lower..=upper` with the default config.
    ///
    /// Returns `Err(PatchError::InvalidBounds)` if the corners differ in
    /// length, have no axes, if `lower[i] > upper[i]` on any axis, or if an
    /// extent exceeds [`Patch::MAX_EXTENT`].
    pub fn new(lower: &[u32], upper: &[u32]) -> Result<Self, PatchError> {
        Self::with_config(lower, upper, PatchConfig::default())
    }

    /// Create a patch spanning `lower..=upper` with an explicit config.
    pub fn with_config(
        lower: &[u32],
        upper: &[u32],
        config: PatchConfig,
    ) -> Result<Self, PatchError> {
        if lower.is_empty() {
            return Err(PatchError::InvalidBounds {
                reason: "a patch needs at least one axis".to_string(),
            });
        }
        if lower.len() != upper.len() {
            return Err(PatchError::InvalidBounds {
                reason: format!(
                    "lower corner has {} axes, upper corner has {}",
                    lower.len(),
                    upper.len()
                ),
            });
        }
        let mut extent = GridPoint::with_capacity(lower.len());
        for (axis, (&lo, &hi)) in lower.iter().zip(upper).enumerate() {
            if lo > hi {
                return Err(PatchError::InvalidBounds {
                    reason: format!("axis {axis}: lower {lo} > upper {hi}"),
                });
            }
            let e = hi - lo;
            if e >= Self::MAX_EXTENT {
                return Err(PatchError::InvalidBounds {
                    reason: format!(
                        "axis {axis}: extent {} exceeds {}",
                        u64::from(e) + 1,
                        Self::MAX_EXTENT
                    ),
                });
            }
            extent.push(e + 1);
        }
        let cell_count = checked_cell_count(&extent).ok_or_else(|| PatchError::InvalidBounds {
            reason: format!("cell count of extent {extent:?} overflows u64"),
        })?;
        debug!(ndim = extent.len(), cell_count, "created patch");
        Ok(Self {
            origin: GridPoint::from_slice(lower),
            extent,
            cell_count,
            padded_axis: 0,
            slots: Vec::new(),
            config,
        })
    }

    // ── Geometry ────────────────────────────────────────────────

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.extent.len()
    }

    /// Global index of the lower corner.
    pub fn origin(&self) -> &[u32] {
        &self.origin
    }

    /// Global index of the upper corner (inclusive).
    pub fn upper_index(&self) -> GridPoint {
        self.origin
            .iter()
            .zip(&self.extent)
            .map(|(&o, &e)| o + (e - 1))
            .collect()
    }

    /// Number of cells along every axis.
    pub fn extent(&self) -> &[u32] {
        &self.extent
    }

    /// Number of cells along one axis.
    pub fn dimension(&self, axis: usize) -> Result<u32, PatchError> {
        self.check_axis(axis)?;
        Ok(self.extent[axis])
    }

    /// Product of the extents.
    pub fn cell_count(&self) -> u64 {
        self.cell_count
    }

    /// The axis that carries FFT padding for padded variables.
    pub fn padded_axis(&self) -> usize {
        self.padded_axis
    }

    /// The kernel scheduling config.
    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Stored extent of one axis for the variable at `position`.
    pub fn actual_dimension(&self, position: usize, axis: usize) -> Result<u32, PatchError> {
        self.check_position(position)?;
        self.check_axis(axis)?;
        Ok(self.stored_dimension(&self.slots[position].var, axis))
    }

    /// Stored extents of every axis for the variable at `position`.
    pub fn actual_extent(&self, position: usize) -> Result<GridPoint, PatchError> {
        self.check_position(position)?;
        let var = &self.slots[position].var;
        Ok((0..self.ndim())
            .map(|axis| self.stored_dimension(var, axis))
            .collect())
    }

    /// Number of stored cells for the variable at `position`.
    ///
    /// Equals [`Patch::cell_count`] unless the variable is padded.
    pub fn actual_cell_count(&self, position: usize) -> Result<u64, PatchError> {
        let dims = self.actual_extent(position)?;
        Ok(dims
            .iter()
            .fold(1u64, |acc, &d| acc.saturating_mul(u64::from(d))))
    }

    fn stored_dimension(&self, var: &SharedVar, axis: usize) -> u32 {
        let e = self.extent[axis];
        if var.is_padding_required() && axis == self.padded_axis {
            2 * (e / 2 + 1)
        } else {
            e
        }
    }

    /// Swap two axes of the geometry. Data is the caller's business.
    pub(crate) fn swap_axes(&mut self, a: usize, b: usize) {
        self.origin.swap(a, b);
        self.extent.swap(a, b);
        if self.padded_axis == a {
            self.padded_axis = b;
        } else if self.padded_axis == b {
            self.padded_axis = a;
        }
    }

    // ── Registry ────────────────────────────────────────────────

    /// Attach a variable, returning its position.
    ///
    /// The patch keeps its own reference to the descriptor; no buffer is
    /// allocated until the data is first accessed.
    pub fn attach(&mut self, var: &SharedVar) -> usize {
        self.slots.push(VarSlot {
            var: Arc::clone(var),
            data: None,
        });
        let position = self.slots.len() - 1;
        debug!(var = var.name(), position, "attached variable");
        position
    }

    /// Detach the variable at `position`, releasing its buffer.
    ///
    /// Later positions shift down by one. The patch's reference to the
    /// descriptor is handed back to the caller.
    pub fn detach(&mut self, position: usize) -> Result<SharedVar, PatchError> {
        self.check_position(position)?;
        let mut slot = self.slots.remove(position);
        if let Some(buf) = slot.data.take() {
            trace!(var = slot.var.name(), bytes = buf.byte_len(), "releasing buffer");
            slot.var.release(buf);
        }
        debug!(var = slot.var.name(), position, "detached variable");
        Ok(slot.var)
    }

    /// Number of attached variables.
    pub fn var_count(&self) -> usize {
        self.slots.len()
    }

    /// The descriptor attached at `position`.
    pub fn var(&self, position: usize) -> Result<&SharedVar, PatchError> {
        self.check_position(position)?;
        Ok(&self.slots[position].var)
    }

    /// Position of `var` (by identity), if attached.
    ///
    /// When the same descriptor is attached more than once, the first
    /// position wins.
    pub fn position_of(&self, var: &SharedVar) -> Option<usize> {
        self.slots.iter().position(|slot| same_var(&slot.var, var))
    }

    /// Iterate over the attached descriptors in position order.
    pub fn vars(&self) -> impl Iterator<Item = &SharedVar> {
        self.slots.iter().map(|slot| &slot.var)
    }

    // ── Validation ──────────────────────────────────────────────

    pub(crate) fn check_position(&self, position: usize) -> Result<(), PatchError> {
        if position < self.slots.len() {
            Ok(())
        } else {
            Err(PatchError::position(position, self.slots.len()))
        }
    }

    pub(crate) fn check_axis(&self, axis: usize) -> Result<(), PatchError> {
        if axis < self.ndim() {
            Ok(())
        } else {
            Err(PatchError::axis(axis, self.ndim()))
        }
    }

    /// Reject point-like arguments whose length does not match the patch.
    pub(crate) fn check_ndim(&self, what: &str, len: usize) -> Result<(), PatchError> {
        if len == self.ndim() {
            Ok(())
        } else {
            Err(PatchError::InvalidArgument {
                reason: format!("{what} has {len} axes, patch has {}", self.ndim()),
            })
        }
    }
}

impl Drop for Patch {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Some(buf) = slot.data.take() {
                trace!(var = slot.var.name(), bytes = buf.byte_len(), "releasing buffer");
                slot.var.release(buf);
            }
        }
    }
}

/// Swap two entries of a small index tuple, returning the result.
pub(crate) fn swapped<T: Copy>(dims: &[T], a: usize, b: usize) -> SmallVec<[T; 4]> {
    let mut out = SmallVec::from_slice(dims);
    out.swap(a, b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{GridVar, VarType};

    fn scalar(name: &str) -> SharedVar {
        GridVar::new(name, VarType::Float64, 1).into_shared()
    }

    fn padded(name: &str) -> SharedVar {
        GridVar::new(name, VarType::Float64, 1)
            .with_fft_padding()
            .into_shared()
    }

    // ── Construction ────────────────────────────────────────────

    #[test]
    fn new_computes_extent_and_cell_count() {
        let p = Patch::new(&[1, 2, 3], &[32, 33, 34]).unwrap();
        assert_eq!(p.ndim(), 3);
        assert_eq!(p.extent(), &[32, 32, 32]);
        assert_eq!(p.origin(), &[1, 2, 3]);
        assert_eq!(p.upper_index().as_slice(), &[32, 33, 34]);
        assert_eq!(p.cell_count(), 32 * 32 * 32);
    }

    #[test]
    fn with_config_keeps_the_config() {
        let p = Patch::with_config(&[0], &[3], PatchConfig::serial()).unwrap();
        assert_eq!(p.config(), &PatchConfig::serial());
        assert_eq!(Patch::new(&[0], &[3]).unwrap().config(), &PatchConfig::new());
    }

    #[test]
    fn single_cell_patch_is_valid() {
        let p = Patch::new(&[7, 7], &[7, 7]).unwrap();
        assert_eq!(p.extent(), &[1, 1]);
        assert_eq!(p.cell_count(), 1);
    }

    #[test]
    fn new_rejects_inverted_axis() {
        let err = Patch::new(&[0, 5], &[3, 4]).unwrap_err();
        assert!(matches!(err, PatchError::InvalidBounds { .. }));
    }

    #[test]
    fn new_rejects_mismatched_and_empty_corners() {
        assert!(matches!(
            Patch::new(&[0, 0], &[1]),
            Err(PatchError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Patch::new(&[], &[]),
            Err(PatchError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn new_rejects_extent_that_cannot_be_padded() {
        assert!(matches!(
            Patch::new(&[0], &[u32::MAX]),
            Err(PatchError::InvalidBounds { .. })
        ));
        assert!(Patch::new(&[0], &[Patch::MAX_EXTENT - 1]).is_ok());
    }

    #[test]
    fn dimension_out_of_range() {
        let p = Patch::new(&[0, 0], &[3, 4]).unwrap();
        assert_eq!(p.dimension(1).unwrap(), 5);
        assert!(matches!(
            p.dimension(2),
            Err(PatchError::OutOfRange { what: "axis", .. })
        ));
    }

    // ── Padding ─────────────────────────────────────────────────

    #[test]
    fn padding_only_touches_axis_zero() {
        let mut p = Patch::new(&[0, 0, 0], &[4, 4, 4]).unwrap();
        let pos = p.attach(&padded("rho"));
        assert_eq!(p.actual_dimension(pos, 0).unwrap(), 6);
        assert_eq!(p.actual_dimension(pos, 1).unwrap(), 5);
        assert_eq!(p.actual_dimension(pos, 2).unwrap(), 5);
        assert_eq!(p.actual_cell_count(pos).unwrap(), 150);
    }

    #[test]
    fn padding_rounds_even_extents_up_by_two() {
        let mut p = Patch::new(&[0, 0], &[15, 3]).unwrap();
        let pos = p.attach(&padded("rho"));
        // 16 -> 2 * (8 + 1) = 18
        assert_eq!(p.actual_extent(pos).unwrap().as_slice(), &[18, 4]);
    }

    #[test]
    fn unpadded_actual_equals_logical() {
        let mut p = Patch::new(&[0, 0], &[9, 2]).unwrap();
        let pos = p.attach(&scalar("t"));
        assert_eq!(p.actual_extent(pos).unwrap().as_slice(), p.extent());
        assert_eq!(p.actual_cell_count(pos).unwrap(), p.cell_count());
    }

    #[test]
    fn actual_queries_reject_bad_position_and_axis() {
        let mut p = Patch::new(&[0, 0], &[1, 1]).unwrap();
        assert!(matches!(
            p.actual_cell_count(0),
            Err(PatchError::OutOfRange { .. })
        ));
        let pos = p.attach(&scalar("t"));
        assert!(matches!(
            p.actual_dimension(pos, 2),
            Err(PatchError::OutOfRange { what: "axis", .. })
        ));
    }

    // ── Registry ────────────────────────────────────────────────

    #[test]
    fn attach_returns_sequential_positions() {
        let mut p = Patch::new(&[0], &[9]).unwrap();
        let a = scalar("a");
        let b = scalar("b");
        assert_eq!(p.attach(&a), 0);
        assert_eq!(p.attach(&b), 1);
        assert_eq!(p.var_count(), 2);
        assert_eq!(p.var(1).unwrap().name(), "b");
    }

    #[test]
    fn attach_shares_the_descriptor() {
        let mut p = Patch::new(&[0], &[9]).unwrap();
        let a = scalar("a");
        p.attach(&a);
        assert_eq!(Arc::strong_count(&a), 2);
        let back = p.detach(0).unwrap();
        assert!(same_var(&a, &back));
        drop(back);
        assert_eq!(Arc::strong_count(&a), 1);
    }

    #[test]
    fn detach_shifts_later_positions_down() {
        let mut p = Patch::new(&[0], &[9]).unwrap();
        let (a, b, c) = (scalar("a"), scalar("b"), scalar("c"));
        p.attach(&a);
        p.attach(&b);
        p.attach(&c);
        p.detach(1).unwrap();
        assert_eq!(p.var_count(), 2);
        assert_eq!(p.position_of(&c), Some(1));
        assert_eq!(p.position_of(&b), None);
    }

    #[test]
    fn detach_on_empty_registry_is_out_of_range() {
        let mut p = Patch::new(&[0], &[9]).unwrap();
        assert!(matches!(
            p.detach(0),
            Err(PatchError::OutOfRange {
                what: "variable position",
                ..
            })
        ));
    }

    #[test]
    fn position_of_uses_identity() {
        let mut p = Patch::new(&[0], &[9]).unwrap();
        let a = scalar("same");
        let twin = scalar("same");
        p.attach(&a);
        assert_eq!(p.position_of(&a), Some(0));
        assert_eq!(p.position_of(&twin), None);
    }

    #[test]
    fn vars_iterates_in_position_order() {
        let mut p = Patch::new(&[0], &[9]).unwrap();
        p.attach(&scalar("x"));
        p.attach(&scalar("y"));
        let names: Vec<_> = p.vars().map(|v| v.name().to_string()).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_box() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
            proptest::collection::vec((0u32..1000, 0u32..64), 1..5).prop_map(|axes| {
                let lo = axes.iter().map(|&(o, _)| o).collect();
                let hi = axes.iter().map(|&(o, len)| o + len).collect();
                (lo, hi)
            })
        }

        proptest! {
            #[test]
            fn extent_and_cell_count_follow_corners((lo, hi) in arb_box()) {
                let p = Patch::new(&lo, &hi).unwrap();
                let mut product = 1u64;
                for axis in 0..lo.len() {
                    let e = hi[axis] - lo[axis] + 1;
                    prop_assert_eq!(p.dimension(axis).unwrap(), e);
                    product *= u64::from(e);
                }
                prop_assert_eq!(p.cell_count(), product);
                let up = p.upper_index();
                prop_assert_eq!(up.as_slice(), hi.as_slice());
            }

            #[test]
            fn padded_axis_zero_follows_formula((lo, hi) in arb_box()) {
                let mut p = Patch::new(&lo, &hi).unwrap();
                let pos = p.attach(&padded("f"));
                let e = p.extent()[0];
                prop_assert_eq!(p.actual_dimension(pos, 0).unwrap(), 2 * (e / 2 + 1));
                for axis in 1..p.ndim() {
                    prop_assert_eq!(p.actual_dimension(pos, axis).unwrap(), p.extent()[axis]);
                }
            }
        }
    }
}
