//! Grid patches for Tessera.
//!
//! A [`Patch`] is an axis-aligned box of an N-dimensional integer grid. It
//! keeps a registry of attached variables and, for each, an optional data
//! buffer allocated lazily through the variable's descriptor.
//!
//! On top of the registry a patch offers:
//!
//! - [`Patch::transpose`], exchanging two axes of the geometry and of every
//!   allocated buffer;
//! - [`Patch::extract_window`] and [`Patch::put_window`], copying a sub-box
//!   out to or in from a densely packed buffer;
//! - [`Patch::distance_vector`], the signed per-axis distance to a point,
//!   optionally wrapping on a periodic domain.
//!
//! Padded variables (see
//! [`VarDescriptor::is_padding_required`](tessera_core::VarDescriptor::is_padding_required))
//! store `2 * (n / 2 + 1)` cells along one axis instead of `n`. That axis
//! starts as axis 0 and follows the data through transposes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
mod data;
pub mod distance;
pub mod error;
pub mod patch;
pub mod transpose;
mod window;

pub use config::PatchConfig;
pub use distance::DistanceVector;
pub use error::PatchError;
pub use patch::Patch;
pub use transpose::transpose_bytes;
