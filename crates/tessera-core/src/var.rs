//! Variable descriptors: what a patch needs to know about the data it stores.
//!
//! A patch never owns a descriptor outright. Descriptors are shared through
//! [`SharedVar`] (an `Arc<dyn VarDescriptor>`), so one variable can be
//! attached to any number of patches and lives as long as the longest-lived
//! of them. Identity, not value, is what distinguishes two descriptors.

use std::fmt;
use std::sync::Arc;

use crate::buffer::VarBuffer;
use crate::error::AllocError;

/// Metadata and memory provider for one kind of per-cell data.
///
/// # Thread Safety
///
/// `Send + Sync` is required because a descriptor may be attached to
/// patches owned by different threads at the same time. Descriptors are
/// never mutated by the patch core.
pub trait VarDescriptor: Send + Sync + fmt::Debug {
    /// Human-readable name, for diagnostics.
    fn name(&self) -> &str;

    /// Bytes occupied by one cell's value (all components).
    fn size_per_element(&self) -> usize;

    /// Whether the fast axis must carry in-place real-to-complex FFT
    /// padding (`2 * (n / 2 + 1)` cells instead of `n`).
    fn is_padding_required(&self) -> bool;

    /// Hand out a buffer of `element_count` zero-filled elements.
    fn allocate(&self, element_count: u64) -> Result<VarBuffer, AllocError> {
        VarBuffer::zeroed(element_count, self.size_per_element())
    }

    /// Take back a buffer previously handed out by [`VarDescriptor::allocate`].
    fn release(&self, buffer: VarBuffer) {
        drop(buffer);
    }
}

/// Shared handle to a variable descriptor.
pub type SharedVar = Arc<dyn VarDescriptor>;

/// Whether two handles refer to the same descriptor instance.
pub fn same_var(a: &SharedVar, b: &SharedVar) -> bool {
    // Compare data pointers only: vtable pointers of the same type may
    // differ across codegen units.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Scalar storage type of a variable's components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarType {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Single-precision float.
    Float32,
    /// Double-precision float.
    Float64,
    /// Single-precision complex (two `f32`).
    Complex32,
    /// Double-precision complex (two `f64`).
    Complex64,
}

impl VarType {
    /// Size of one component in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 | Self::Complex32 => 8,
            Self::Complex64 => 16,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex32 => "complex32",
            Self::Complex64 => "complex64",
        };
        f.write_str(s)
    }
}

/// The stock descriptor: a named variable of `components` values of one
/// [`VarType`] per cell.
///
/// # Examples
///
/// ```
/// use tessera_core::{GridVar, VarDescriptor, VarType};
///
/// let velocity = GridVar::new("velocity", VarType::Float64, 3);
/// assert_eq!(velocity.size_per_element(), 24);
/// assert!(!velocity.is_padding_required());
///
/// let density = GridVar::new("density", VarType::Float64, 1).with_fft_padding();
/// assert!(density.is_padding_required());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridVar {
    name: String,
    var_type: VarType,
    components: u32,
    fft_padded: bool,
}

impl GridVar {
    /// Create an unpadded variable.
    ///
    /// A component count of zero is bumped to one.
    pub fn new(name: impl Into<String>, var_type: VarType, components: u32) -> Self {
        Self {
            name: name.into(),
            var_type,
            components: components.max(1),
            fft_padded: false,
        }
    }

    /// Mark the variable as requiring in-place FFT padding on the fast axis.
    pub fn with_fft_padding(mut self) -> Self {
        self.fft_padded = true;
        self
    }

    /// Component storage type.
    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    /// Number of components per cell.
    pub fn components(&self) -> u32 {
        self.components
    }

    /// Wrap in an `Arc` for attachment to patches.
    pub fn into_shared(self) -> SharedVar {
        Arc::new(self)
    }
}

impl VarDescriptor for GridVar {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_per_element(&self) -> usize {
        self.var_type.size_bytes() * self.components as usize
    }

    fn is_padding_required(&self) -> bool {
        self.fft_padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_per_element_scales_with_components() {
        assert_eq!(GridVar::new("a", VarType::Int32, 1).size_per_element(), 4);
        assert_eq!(GridVar::new("b", VarType::Float32, 3).size_per_element(), 12);
        assert_eq!(GridVar::new("c", VarType::Complex64, 2).size_per_element(), 32);
    }

    #[test]
    fn zero_components_bumped_to_one() {
        let v = GridVar::new("z", VarType::Float64, 0);
        assert_eq!(v.components(), 1);
        assert_eq!(v.var_type(), VarType::Float64);
        assert_eq!(v.size_per_element(), 8);
    }

    #[test]
    fn default_allocate_is_zeroed_and_sized() {
        let v = GridVar::new("t", VarType::Int64, 2);
        let buf = v.allocate(5).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.byte_len(), 80);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
        v.release(buf);
    }

    #[test]
    fn same_var_is_identity_not_equality() {
        let a = GridVar::new("x", VarType::Float32, 1).into_shared();
        let b = GridVar::new("x", VarType::Float32, 1).into_shared();
        let a2 = Arc::clone(&a);
        assert!(same_var(&a, &a2));
        assert!(!same_var(&a, &b));
    }

    #[test]
    fn var_type_display() {
        assert_eq!(VarType::Complex32.to_string(), "complex32");
        assert_eq!(VarType::Int32.to_string(), "int32");
    }
}
