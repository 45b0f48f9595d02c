//! Core types and errors for the rowband region pipeline.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental vocabulary shared by the grid, task and engine crates:
//! identifiers, the [`Vec3`] cell value, row ranges, particles and their
//! growable storage, and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod particle;
pub mod rows;
pub mod vector;

pub use error::{AllocError, KernelError, StepError};
pub use id::{RegionId, StepId};
pub use particle::{Particle, ParticleVector, PARTICLE_BUFFER_INCREMENT};
pub use rows::RowRange;
pub use vector::Vec3;
