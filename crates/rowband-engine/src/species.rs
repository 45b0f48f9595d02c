//! Per-region species containers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rowband_core::{Particle, ParticleVector};

/// Inbox slot receiving particles that left the region below upward.
pub const FROM_BELOW: usize = 0;
/// Inbox slot receiving particles that left the region above downward.
pub const FROM_ABOVE: usize = 1;

/// Region-independent parameters of a species, copied into every region.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesParams {
    /// Species name.
    pub name: String,
    /// Mass-to-charge ratio.
    pub m_q: f32,
    /// Particles per cell along x and y.
    pub ppc: [usize; 2],
    /// Cell size `[dx, dy]`.
    pub dx: [f32; 2],
    /// Timestep.
    pub dt: f32,
    /// Whether the domain runs in moving-window mode.
    pub moving_window: bool,
}

impl SpeciesParams {
    /// Charge carried by one macro-particle in density units.
    pub fn particle_charge(&self) -> f32 {
        let per_cell = (self.ppc[0] * self.ppc[1]).max(1) as f32;
        self.m_q.signum() / per_cell
    }
}

/// Where this region's leavers are sent, as ring indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpeciesRoutes {
    /// Region receiving upward leavers in its [`FROM_BELOW`] inbox (`next`).
    pub up: usize,
    /// Region receiving downward leavers in its [`FROM_ABOVE`] inbox (`prev`).
    pub down: usize,
}

/// The main particle vector plus the indices that left it this timestep.
#[derive(Clone, Debug, Default)]
pub struct SpeciesStore {
    /// Particles owned by the region.
    pub particles: ParticleVector,
    /// Indices of particles already copied to a neighbour's inbox and
    /// awaiting compaction.
    pub departed: Vec<usize>,
}

/// One species inside one region.
///
/// The main store and each inbox sit behind their own lock so that
/// neighbouring regions can deliver migrants while this region works on
/// its own particles.
#[derive(Debug)]
pub struct Species {
    params: SpeciesParams,
    main: Mutex<SpeciesStore>,
    inbox: [Mutex<ParticleVector>; 2],
    routes: Option<SpeciesRoutes>,
}

impl Species {
    /// A species holding `particles`.
    pub fn new(params: SpeciesParams, particles: ParticleVector) -> Self {
        Self {
            params,
            main: Mutex::new(SpeciesStore {
                particles,
                departed: Vec::new(),
            }),
            inbox: [
                Mutex::new(ParticleVector::new()),
                Mutex::new(ParticleVector::new()),
            ],
            routes: None,
        }
    }

    /// Species parameters.
    pub fn params(&self) -> &SpeciesParams {
        &self.params
    }

    /// Outbound routes, once linked.
    pub fn routes(&self) -> Option<SpeciesRoutes> {
        self.routes
    }

    pub(crate) fn set_routes(&mut self, routes: SpeciesRoutes) {
        self.routes = Some(routes);
    }

    pub(crate) fn set_moving_window(&mut self) {
        self.params.moving_window = true;
    }

    /// Lock the main store.
    pub fn lock_main(&self) -> MutexGuard<'_, SpeciesStore> {
        self.main.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock inbox `slot` ([`FROM_BELOW`] or [`FROM_ABOVE`]).
    pub fn lock_inbox(&self, slot: usize) -> MutexGuard<'_, ParticleVector> {
        self.inbox[slot]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of particles in the main vector.
    pub fn len(&self) -> usize {
        self.lock_main().particles.len()
    }

    /// Whether the main vector is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Particles waiting in both inboxes.
    pub fn in_flight(&self) -> usize {
        self.lock_inbox(FROM_BELOW).len() + self.lock_inbox(FROM_ABOVE).len()
    }

    /// Copy of the main vector's particles.
    pub fn particles(&self) -> Vec<Particle> {
        self.lock_main().particles.as_slice().to_vec()
    }
}
