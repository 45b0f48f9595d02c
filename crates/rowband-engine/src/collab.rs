//! Collaborator traits: the numerics the pipeline drives but does not own.
//!
//! The pipeline decides *when* and *on which region* these run and which
//! buffers they may touch; the implementations decide what the physics
//! is. All collaborators are shared across worker threads, so they take
//! `&self` and must be `Send + Sync`.

use rowband_core::{KernelError, Particle, RegionId, RowRange};
use rowband_grid::{Current, Emf};

use crate::species::SpeciesParams;

/// Everything a pusher sees while advancing one species in one region.
pub struct PushContext<'a> {
    /// Region being advanced.
    pub region: RegionId,
    /// Global rows the region owns.
    pub limits_y: RowRange,
    /// Global grid size `[columns, rows]`.
    pub grid: [usize; 2],
    /// Index of the species being advanced.
    pub species: usize,
    /// The species' parameters (charge, cell size, dt, window mode).
    pub params: &'a SpeciesParams,
    /// The species' particles in this region, in global cell coordinates.
    pub particles: &'a mut [Particle],
    /// The region's field, read-only.
    pub emf: &'a Emf,
    /// The region's current. Deposits use region-local rows
    /// (`iy - limits_y.start`) and may land in guard cells.
    pub current: &'a mut Current,
}

/// Advances particles and deposits their current.
///
/// Particles may leave the region's rows; the pipeline routes them to the
/// neighbouring region afterwards. Rows outside the grid are wrapped by
/// the pipeline, columns are the pusher's responsibility.
pub trait SpeciesPusher: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Largest stable timestep, if constrained.
    fn max_dt(&self) -> Option<f32> {
        None
    }

    /// Advance `ctx.particles` by one timestep.
    fn push(&self, ctx: PushContext<'_>) -> Result<(), KernelError>;
}

/// Advances the electromagnetic field of one region.
pub trait FieldSolver: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Largest stable timestep, if constrained.
    fn max_dt(&self) -> Option<f32> {
        None
    }

    /// Advance `emf` by one timestep using the finalized `current`.
    fn advance(&self, emf: &mut Emf, current: &Current) -> Result<(), KernelError>;
}

/// An external field source such as a laser pulse.
pub trait FieldSource {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Add the source to `emf`, whose first owned row is global row
    /// `row_offset`.
    fn apply(&self, emf: &mut Emf, row_offset: usize) -> Result<(), KernelError>;
}
