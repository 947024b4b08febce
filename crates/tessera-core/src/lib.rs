//! Core types for Tessera grid patches.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! pieces a patch consumes but does not own: grid geometry helpers, the
//! byte-oriented [`VarBuffer`], and the [`VarDescriptor`] trait through
//! which variables describe their element size, padding needs, and memory
//! provider.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod point;
pub mod var;

pub use buffer::VarBuffer;
pub use error::AllocError;
pub use point::{GridOffset, GridPoint};
pub use var::{same_var, GridVar, SharedVar, VarDescriptor, VarType};
