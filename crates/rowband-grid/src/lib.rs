//! Guarded field storage and halo kernels for the rowband pipeline.
//!
//! Every region owns a [`Current`] and an [`Emf`], each built on
//! [`VectorGrid`]: a 2D array of [`Vec3`](rowband_core::Vec3) cells with
//! a guard-cell margin on all four sides. Neighbouring regions exchange
//! their shared boundary band through an [`UpperMirror`] descriptor that
//! points into the guard band of the region below.
//!
//! # Kernels
//!
//! - Row reduction: accumulate the mirror band into the local band, then
//!   copy the sum back ([`Current::reduce_y`]).
//! - Column reduction: the same pattern between a buffer's low columns and
//!   their periodic images ([`Current::reduce_x`]).
//! - Ghost-cell refresh, rows and columns, without accumulation.
//! - Binomial smoothing and divergence correction.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod current;
pub mod emf;
pub mod error;
pub mod grid;
pub mod kernels;
pub mod mirror;
pub mod partition;
pub mod smooth;

pub use current::Current;
pub use emf::Emf;
pub use error::GridError;
pub use grid::{GuardCells, VectorGrid};
pub use mirror::UpperMirror;
pub use partition::{owner_of, partition_rows, row_partition};
pub use smooth::{SmoothKind, Smoothing};
