//! Regions: contiguous row-bands of the grid and everything they own.
//!
//! Every buffer a task can touch sits behind its own lock. When a task
//! needs several, it takes them in a fixed order: current, then EMF,
//! then species main stores, then inboxes, and lower ring index first
//! within each kind.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rowband_core::{RegionId, RowRange};
use rowband_grid::{Current, Emf, GuardCells};

use crate::species::Species;

/// One row-band of the simulation grid.
#[derive(Debug)]
pub struct Region {
    id: RegionId,
    limits_y: RowRange,
    nx: [usize; 2],
    current_gc: GuardCells,
    emf_gc: GuardCells,
    current: Mutex<Current>,
    emf: Mutex<Emf>,
    species: Vec<Species>,
}

impl Region {
    pub(crate) fn new(
        id: RegionId,
        limits_y: RowRange,
        current: Current,
        emf: Emf,
        species: Vec<Species>,
    ) -> Self {
        let nx = current.grid().nx();
        let current_gc = current.grid().gc();
        let emf_gc = emf.e().gc();
        Self {
            id,
            limits_y,
            nx,
            current_gc,
            emf_gc,
            current: Mutex::new(current),
            emf: Mutex::new(emf),
            species,
        }
    }

    /// Region id (its position in the ring).
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Owned global rows.
    pub fn limits_y(&self) -> RowRange {
        self.limits_y
    }

    /// Owned cells `[columns, rows]`.
    pub fn nx(&self) -> [usize; 2] {
        self.nx
    }

    /// Guard cells of the current.
    pub fn current_gc(&self) -> GuardCells {
        self.current_gc
    }

    /// Guard cells of E and B.
    pub fn emf_gc(&self) -> GuardCells {
        self.emf_gc
    }

    /// Number of species.
    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    /// All species, in index order.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Species `s`.
    pub fn species_at(&self, s: usize) -> Option<&Species> {
        self.species.get(s)
    }

    pub(crate) fn species_mut(&mut self) -> &mut [Species] {
        &mut self.species
    }

    /// Lock the current.
    pub fn lock_current(&self) -> MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the EM field.
    pub fn lock_emf(&self) -> MutexGuard<'_, Emf> {
        self.emf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the current without locking.
    pub fn current_mut(&mut self) -> &mut Current {
        self.current
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the EM field without locking.
    pub fn emf_mut(&mut self) -> &mut Emf {
        self.emf.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Particles in the main vectors of every species.
    pub fn particle_count(&self) -> usize {
        self.species.iter().map(Species::len).sum()
    }
}
