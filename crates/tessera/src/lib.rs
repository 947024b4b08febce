//! Tessera: N-dimensional grid patches for block-structured simulation codes.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Tessera sub-crates. For most users, adding `tessera` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! // A 3-D patch covering global cells (0,0,0)..=(7,3,1).
//! let mut patch = Patch::new(&[0, 0, 0], &[7, 3, 1]).unwrap();
//! let rho = GridVar::new("rho", VarType::Float64, 1).into_shared();
//! let pos = patch.attach(&rho);
//!
//! // Buffers are allocated on first access.
//! let values: Vec<f64> = (0..64).map(f64::from).collect();
//! patch.data_handle(pos).unwrap().write_elements(0, &values);
//!
//! // Exchange axes 0 and 2; data and geometry move together.
//! patch.transpose(0, 2).unwrap();
//! assert_eq!(patch.extent(), &[2, 4, 8]);
//!
//! // Cell (x=5, y=1, z=0) of the original is now at (0, 1, 5).
//! let (cell, _) = patch.extract_window(pos, &[0, 1, 5], &[0, 1, 5]).unwrap();
//! assert_eq!(cell.to_vec::<f64>(), vec![13.0]);
//!
//! // Signed distance to a point on a periodic 16³ domain.
//! let d = patch.distance_vector(&[3, 2, 15], Some(&[16, 16, 16][..])).unwrap();
//! assert_eq!(d.offsets.as_slice(), &[-2, 0, 1]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessera-core` | Geometry helpers, `VarBuffer`, variable descriptors |
//! | [`patch`] | `tessera-patch` | `Patch`, transpose, windows, distance vectors |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`tessera-core`).
///
/// Contains [`types::VarDescriptor`], the built-in [`types::GridVar`],
/// [`types::VarBuffer`] and grid geometry helpers in [`types::point`].
pub use tessera_core as types;

/// Grid patches (`tessera-patch`).
///
/// [`patch::Patch`] plus its configuration and error types.
pub use tessera_patch as patch;

/// Common imports for typical Tessera usage.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Variables and buffers
    pub use tessera_core::{GridVar, SharedVar, VarBuffer, VarDescriptor, VarType};

    // Geometry
    pub use tessera_core::{GridOffset, GridPoint};

    // Patches
    pub use tessera_patch::{DistanceVector, Patch, PatchConfig};

    // Errors
    pub use tessera_core::AllocError;
    pub use tessera_patch::PatchError;
}
