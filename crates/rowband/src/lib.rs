//! Rowband: a region-decomposed particle-in-cell timestep pipeline.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! rowband sub-crates. For most users, adding `rowband` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use rowband::prelude::*;
//!
//! // A pusher that moves nothing and deposits nothing.
//! struct Frozen;
//! impl SpeciesPusher for Frozen {
//!     fn name(&self) -> &str { "frozen" }
//!     fn push(&self, _ctx: PushContext<'_>) -> Result<(), KernelError> { Ok(()) }
//! }
//!
//! // A solver that leaves the field alone.
//! struct Vacuum;
//! impl FieldSolver for Vacuum {
//!     fn name(&self) -> &str { "vacuum" }
//!     fn advance(&self, _emf: &mut Emf, _current: &Current) -> Result<(), KernelError> {
//!         Ok(())
//!     }
//! }
//!
//! // A 32×64 periodic grid split into 4 row bands.
//! let particles = vec![Particle::at(3.5, 15.9), Particle::at(20.0, 40.2)];
//! let config = DomainConfig::new(4, [32, 64], [32.0, 64.0], 0.1)
//!     .with_species(SpeciesTemplate::new("electrons", -1.0, [1, 1]).with_particles(particles));
//! let mut domain = Domain::new(config, Box::new(Frozen), Box::new(Vacuum)).unwrap();
//! let metrics = domain.advance().unwrap();
//! assert_eq!(metrics.task_count, 4 * 5);
//! assert_eq!(domain.step_id(), StepId(1));
//! assert_eq!(domain.particle_count(), 2);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `rowband-core` | IDs, row ranges, particles, error types |
//! | [`grid`] | `rowband-grid` | Guarded grids, current, EM field, partition, smoothing |
//! | [`task`] | `rowband-task` | Stages, footprints, task graph, schedulers |
//! | [`engine`] | `rowband-engine` | Domain, region ring, linker, pipeline driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and errors (`rowband-core`).
///
/// Contains identifiers, [`types::RowRange`], [`types::Particle`] and its
/// fallible [`types::ParticleVector`] storage, and the error taxonomy.
pub use rowband_core as types;

/// Guarded grids and boundary kernels (`rowband-grid`).
///
/// Provides [`grid::VectorGrid`], the region-local [`grid::Current`] and
/// [`grid::Emf`], the row partition and x smoothing.
pub use rowband_grid as grid;

/// Footprint-driven task scheduling (`rowband-task`).
///
/// Build a [`task::TaskGraph`] from footprinted nodes and run it on a
/// [`task::Scheduler`].
pub use rowband_task as task;

/// Region ring and timestep pipeline (`rowband-engine`).
///
/// [`engine::Domain`] is the entry point; collaborators plug in through
/// [`engine::SpeciesPusher`], [`engine::FieldSolver`] and
/// [`engine::FieldSource`].
pub use rowband_engine as engine;

/// Common imports for typical rowband usage.
///
/// ```rust
/// use rowband::prelude::*;
/// ```
///
/// This imports the domain and its configuration, the collaborator traits
/// and the types they exchange, and the error types.
pub mod prelude {
    // Core types
    pub use rowband_core::{Particle, ParticleVector, RegionId, RowRange, StepId, Vec3};

    // Errors
    pub use rowband_core::{AllocError, KernelError, StepError};
    pub use rowband_engine::ConfigError;

    // Grids
    pub use rowband_grid::{Current, Emf, Smoothing, VectorGrid};

    // Scheduling
    pub use rowband_task::{Scheduler, Stage};

    // Engine
    pub use rowband_engine::{
        Domain, DomainConfig, FieldMagnitudes, FieldSolver, FieldSource, PushContext,
        SchedulerConfig, SpeciesPusher, SpeciesTemplate, StepMetrics,
    };
}
