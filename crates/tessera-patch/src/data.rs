//! Buffer lifecycle: lazy allocation, free, replace and pop.
//!
//! A slot's buffer is exclusively owned by the patch once installed.
//! [`Patch::pop_data`] is the only way ownership leaves the patch without
//! the buffer being released through its descriptor.

use tessera_core::{SharedVar, VarBuffer};
use tracing::{debug, trace};

use crate::error::PatchError;
use crate::patch::Patch;

impl Patch {
    /// The buffer of the variable at `position`, allocating it first if the
    /// slot is empty.
    ///
    /// Fresh buffers come from the descriptor's [`allocate`] and hold
    /// [`Patch::actual_cell_count`] elements.
    ///
    /// [`allocate`]: tessera_core::VarDescriptor::allocate
    pub fn data_handle(&mut self, position: usize) -> Result<&mut VarBuffer, PatchError> {
        self.check_position(position)?;
        let expected = self.actual_cell_count(position)?;
        let slot = &mut self.slots[position];
        let buf = match slot.data.take() {
            Some(buf) => buf,
            None => {
                let buf = allocate_checked(&slot.var, expected)?;
                debug!(
                    var = slot.var.name(),
                    position,
                    bytes = buf.byte_len(),
                    "allocated variable data"
                );
                buf
            }
        };
        Ok(slot.data.insert(buf))
    }

    /// The buffer of the first position holding `var` (by identity).
    ///
    /// Returns `Ok(None)` if `var` is not attached; otherwise behaves like
    /// [`Patch::data_handle`].
    pub fn data_handle_by_var(
        &mut self,
        var: &SharedVar,
    ) -> Result<Option<&mut VarBuffer>, PatchError> {
        match self.position_of(var) {
            Some(position) => self.data_handle(position).map(Some),
            None => Ok(None),
        }
    }

    /// The buffer of the variable at `position`, without allocating.
    pub fn peek_data(&self, position: usize) -> Result<Option<&VarBuffer>, PatchError> {
        self.check_position(position)?;
        Ok(self.slots[position].data.as_ref())
    }

    /// Whether the slot at `position` currently owns a buffer.
    pub fn has_data(&self, position: usize) -> Result<bool, PatchError> {
        Ok(self.peek_data(position)?.is_some())
    }

    /// Release the buffer at `position`, leaving the slot empty.
    ///
    /// Freeing an empty slot is a no-op.
    pub fn free_data(&mut self, position: usize) -> Result<(), PatchError> {
        self.check_position(position)?;
        let slot = &mut self.slots[position];
        if let Some(buf) = slot.data.take() {
            trace!(var = slot.var.name(), bytes = buf.byte_len(), "releasing buffer");
            slot.var.release(buf);
        }
        Ok(())
    }

    /// Install `buffer` at `position`, releasing whatever was there.
    ///
    /// The buffer must be exactly `actual_cell_count * size_per_element`
    /// bytes. A mismatched buffer is released through the descriptor and
    /// `InvalidArgument` is returned; the slot is left untouched.
    pub fn replace_data(&mut self, position: usize, buffer: VarBuffer) -> Result<(), PatchError> {
        self.check_position(position)?;
        let expected = self.actual_cell_count(position)?;
        let slot = &mut self.slots[position];
        let expected_bytes = expected.saturating_mul(slot.var.size_per_element() as u64);
        if buffer.byte_len() as u64 != expected_bytes {
            let got = buffer.byte_len();
            slot.var.release(buffer);
            return Err(PatchError::InvalidArgument {
                reason: format!(
                    "replacement buffer for '{}' has {got} bytes, expected {expected_bytes}",
                    slot.var.name()
                ),
            });
        }
        if let Some(old) = slot.data.replace(buffer) {
            trace!(var = slot.var.name(), bytes = old.byte_len(), "releasing buffer");
            slot.var.release(old);
        }
        Ok(())
    }

    /// Take the buffer at `position` out of the patch without releasing it.
    ///
    /// The slot is left empty; the caller now owns the buffer and must
    /// release it through the descriptor or hand it back with
    /// [`Patch::replace_data`].
    pub fn pop_data(&mut self, position: usize) -> Result<Option<VarBuffer>, PatchError> {
        self.check_position(position)?;
        Ok(self.slots[position].data.take())
    }
}

/// Allocate through the descriptor and verify it honoured the request.
pub(crate) fn allocate_checked(var: &SharedVar, element_count: u64) -> Result<VarBuffer, PatchError> {
    let buf = var.allocate(element_count)?;
    let expected = element_count.saturating_mul(var.size_per_element() as u64);
    if buf.byte_len() as u64 != expected {
        let got = buf.byte_len();
        var.release(buf);
        return Err(PatchError::AllocationFailed(tessera_core::AllocError {
            requested_bytes: expected,
            reason: format!("descriptor '{}' returned {got} bytes", var.name()),
        }));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tessera_core::{AllocError, GridVar, VarDescriptor, VarType};

    fn patch_with(var: &SharedVar) -> Patch {
        let mut p = Patch::new(&[0, 0], &[3, 2]).unwrap();
        p.attach(var);
        p
    }

    fn int_var() -> SharedVar {
        GridVar::new("n", VarType::Int32, 1).into_shared()
    }

    #[derive(Debug)]
    struct Exhausted;

    impl VarDescriptor for Exhausted {
        fn name(&self) -> &str {
            "exhausted"
        }
        fn size_per_element(&self) -> usize {
            4
        }
        fn is_padding_required(&self) -> bool {
            false
        }
        fn allocate(&self, element_count: u64) -> Result<VarBuffer, AllocError> {
            Err(AllocError {
                requested_bytes: element_count * 4,
                reason: "out of memory".into(),
            })
        }
    }

    #[derive(Debug)]
    struct ShortChanged;

    impl VarDescriptor for ShortChanged {
        fn name(&self) -> &str {
            "short"
        }
        fn size_per_element(&self) -> usize {
            4
        }
        fn is_padding_required(&self) -> bool {
            false
        }
        fn allocate(&self, _element_count: u64) -> Result<VarBuffer, AllocError> {
            VarBuffer::zeroed(1, 4)
        }
    }

    #[test]
    fn data_handle_allocates_lazily() {
        let mut p = patch_with(&int_var());
        assert!(!p.has_data(0).unwrap());
        let buf = p.data_handle(0).unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.element_size(), 4);
        assert!(p.has_data(0).unwrap());
    }

    #[test]
    fn data_handle_returns_existing_buffer() {
        let mut p = patch_with(&int_var());
        assert!(p.data_handle(0).unwrap().write_elements(5, &[42i32]));
        assert_eq!(p.data_handle(0).unwrap().to_vec::<i32>()[5], 42);
    }

    #[test]
    fn padded_buffer_is_sized_by_actual_count() {
        let var = GridVar::new("rho", VarType::Float64, 1)
            .with_fft_padding()
            .into_shared();
        let mut p = Patch::new(&[0, 0, 0], &[4, 4, 4]).unwrap();
        p.attach(&var);
        assert_eq!(p.data_handle(0).unwrap().byte_len(), 150 * 8);
    }

    #[test]
    fn free_data_empties_slot_and_is_idempotent() {
        let mut p = patch_with(&int_var());
        p.data_handle(0).unwrap();
        p.free_data(0).unwrap();
        assert!(!p.has_data(0).unwrap());
        p.free_data(0).unwrap();
        assert!(!p.has_data(0).unwrap());
    }

    #[test]
    fn replace_data_installs_new_buffer() {
        let mut p = patch_with(&int_var());
        p.data_handle(0).unwrap();
        let fresh = VarBuffer::from_elements(&[7i32; 12]);
        p.replace_data(0, fresh).unwrap();
        assert_eq!(p.peek_data(0).unwrap().unwrap().to_vec::<i32>(), vec![7; 12]);
    }

    #[test]
    fn replace_data_rejects_wrong_size() {
        let mut p = patch_with(&int_var());
        p.data_handle(0).unwrap().write_elements(0, &[9i32]);
        let err = p
            .replace_data(0, VarBuffer::from_elements(&[1i32; 3]))
            .unwrap_err();
        assert!(matches!(err, PatchError::InvalidArgument { .. }));
        assert_eq!(p.peek_data(0).unwrap().unwrap().to_vec::<i32>()[0], 9);
    }

    #[test]
    fn pop_data_transfers_ownership() {
        let mut p = patch_with(&int_var());
        p.data_handle(0).unwrap().write_elements(3, &[11i32]);
        let popped = p.pop_data(0).unwrap().unwrap();
        assert!(!p.has_data(0).unwrap());
        assert_eq!(popped.to_vec::<i32>()[3], 11);
        assert!(p.pop_data(0).unwrap().is_none());
        p.replace_data(0, popped).unwrap();
        assert_eq!(p.data_handle(0).unwrap().to_vec::<i32>()[3], 11);
    }

    #[test]
    fn data_handle_by_var_finds_attached_only() {
        let a = int_var();
        let stranger = int_var();
        let mut p = patch_with(&a);
        assert!(p.data_handle_by_var(&stranger).unwrap().is_none());
        assert_eq!(p.data_handle_by_var(&a).unwrap().unwrap().len(), 12);
    }

    #[test]
    fn position_ops_reject_out_of_range() {
        let mut p = Patch::new(&[0], &[3]).unwrap();
        assert!(matches!(p.data_handle(0), Err(PatchError::OutOfRange { .. })));
        assert!(matches!(p.free_data(0), Err(PatchError::OutOfRange { .. })));
        assert!(matches!(p.pop_data(0), Err(PatchError::OutOfRange { .. })));
        assert!(matches!(
            p.replace_data(0, VarBuffer::from_elements(&[0i32; 4])),
            Err(PatchError::OutOfRange { .. })
        ));
    }

    #[test]
    fn allocation_failure_propagates() {
        let var: SharedVar = Arc::new(Exhausted);
        let mut p = patch_with(&var);
        let err = p.data_handle(0).unwrap_err();
        assert!(matches!(err, PatchError::AllocationFailed(_)));
        assert!(!p.has_data(0).unwrap());
    }

    #[test]
    fn undersized_allocation_is_rejected() {
        let var: SharedVar = Arc::new(ShortChanged);
        let mut p = patch_with(&var);
        assert!(matches!(
            p.data_handle(0),
            Err(PatchError::AllocationFailed(_))
        ));
    }
}
