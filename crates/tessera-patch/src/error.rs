//! Patch error types.

use std::error::Error;
use std::fmt;

use tessera_core::AllocError;

/// Errors from patch construction and patch operations.
///
/// All variants except [`PatchError::AllocationFailed`] are precondition
/// violations detected at the API boundary before any state changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchError {
    /// A lower corner lies above its upper corner, or the corners do not
    /// describe a usable box.
    InvalidBounds {
        /// What went wrong.
        reason: String,
    },
    /// A variable position, axis index, or window corner lies outside
    /// the patch.
    OutOfRange {
        /// Which kind of index was rejected (`"variable position"`, `"axis"`, ...).
        what: &'static str,
        /// The rejected value.
        value: u64,
        /// Human-readable description of the valid range.
        bounds: String,
    },
    /// An argument is malformed: wrong dimensionality, a point outside its
    /// stated period, or an undersized source buffer.
    InvalidArgument {
        /// What went wrong.
        reason: String,
    },
    /// A variable's memory provider failed to allocate.
    AllocationFailed(AllocError),
}

impl PatchError {
    pub(crate) fn position(position: usize, count: usize) -> Self {
        Self::OutOfRange {
            what: "variable position",
            value: position as u64,
            bounds: format!("[0, {count})"),
        }
    }

    pub(crate) fn axis(axis: usize, ndim: usize) -> Self {
        Self::OutOfRange {
            what: "axis",
            value: axis as u64,
            bounds: format!("[0, {ndim})"),
        }
    }
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBounds { reason } => write!(f, "invalid bounds: {reason}"),
            Self::OutOfRange {
                what,
                value,
                bounds,
            } => write!(f, "{what} {value} out of range: {bounds}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::AllocationFailed(e) => write!(f, "allocation failed: {e}"),
        }
    }
}

impl Error for PatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AllocationFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for PatchError {
    fn from(e: AllocError) -> Self {
        Self::AllocationFailed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_display_names_the_index() {
        let e = PatchError::position(3, 2);
        assert_eq!(e.to_string(), "variable position 3 out of range: [0, 2)");
        let e = PatchError::axis(4, 3);
        assert_eq!(e.to_string(), "axis 4 out of range: [0, 3)");
    }

    #[test]
    fn allocation_failure_exposes_source() {
        let e: PatchError = AllocError::overflow(u64::MAX, 8).into();
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("allocation failed"));
    }
}
