//! Test utilities and reference collaborators for rowband development.
//!
//! Provides seeded particle populations, ready-made domain configurations
//! and the collaborators in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rowband_core::Particle;
use rowband_engine::{Domain, DomainConfig, SchedulerConfig, SpeciesTemplate};

pub use fixtures::{BallisticPusher, FailingPusher, NanPusher, NullSolver, UniformSource};

/// Uniform sample in `[0, 1)` with 24 bits of mantissa.
pub fn unit_f32(rng: &mut ChaCha8Rng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
}

/// `count` particles spread uniformly over `grid`, each with velocity
/// components in `[-max_speed, max_speed)`. Identical for equal seeds.
pub fn seeded_particles(
    seed: u64,
    count: usize,
    grid: [usize; 2],
    max_speed: f32,
) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let col = unit_f32(&mut rng) * grid[0] as f32;
            let row = unit_f32(&mut rng) * grid[1] as f32;
            let mut speed = || (unit_f32(&mut rng) * 2.0 - 1.0) * max_speed;
            let (ux, uy, uz) = (speed(), speed(), speed());
            Particle::at(col.min(grid[0] as f32 - 1e-3), row.min(grid[1] as f32 - 1e-3))
                .with_velocity(ux, uy, uz)
        })
        .collect()
}

/// A domain with unit cells (`box_size == grid`), `dt = 0.5` and the
/// given species.
pub fn unit_config(
    n_regions: usize,
    grid: [usize; 2],
    species: Vec<SpeciesTemplate>,
) -> DomainConfig {
    let mut config = DomainConfig::new(
        n_regions,
        grid,
        [grid[0] as f32, grid[1] as f32],
        0.5,
    );
    for s in species {
        config = config.with_species(s);
    }
    config
}

/// An electron species with `count` seeded particles moving at most one
/// cell per timestep at `dt = 0.5`.
pub fn electrons(seed: u64, count: usize, grid: [usize; 2]) -> SpeciesTemplate {
    SpeciesTemplate::new("electrons", -1.0, [2, 2])
        .with_particles(seeded_particles(seed, count, grid, 1.9))
}

/// A domain driven by [`BallisticPusher`] and [`NullSolver`] on the
/// given scheduler.
pub fn ballistic_domain(config: DomainConfig, scheduler: SchedulerConfig) -> Domain {
    match Domain::new(
        config.with_scheduler(scheduler),
        Box::new(BallisticPusher::new()),
        Box::new(NullSolver::new()),
    ) {
        Ok(domain) => domain,
        Err(e) => panic!("test domain rejected: {e}"),
    }
}
