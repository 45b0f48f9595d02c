//! Benchmark profiles for the rowband region pipeline.
//!
//! Provides pre-built [`DomainConfig`] profiles for benchmarking:
//!
//! - [`reference_profile`]: 128x128 grid, 8 regions, 64K particles
//! - [`stress_profile`]: 512x512 grid, 32 regions, 1M particles
//! - [`reference_domain`]: a profile wired to the ballistic reference pusher

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rowband_engine::{Domain, DomainConfig, SchedulerConfig};
use rowband_grid::Smoothing;
use rowband_test_utils::{electrons, unit_config, BallisticPusher, NullSolver};

/// 128x128 cells in 8 regions, 4 particles per cell, binomial smoothing.
pub fn reference_profile(seed: u64) -> DomainConfig {
    let grid = [128, 128];
    unit_config(8, grid, vec![electrons(seed, 4 * 128 * 128, grid)])
        .with_smoothing(Smoothing::binomial(1))
}

/// 512x512 cells in 32 regions, 4 particles per cell, compensated
/// smoothing.
pub fn stress_profile(seed: u64) -> DomainConfig {
    let grid = [512, 512];
    unit_config(32, grid, vec![electrons(seed, 4 * 512 * 512, grid)])
        .with_smoothing(Smoothing::compensated(2))
}

/// `config` driven by the ballistic pusher and a null solver.
///
/// # Panics
///
/// If `config` is rejected; the profiles above are always valid.
pub fn reference_domain(config: DomainConfig, scheduler: SchedulerConfig) -> Domain {
    Domain::new(
        config.with_scheduler(scheduler),
        Box::new(BallisticPusher::new()),
        Box::new(NullSolver::new()),
    )
    .unwrap_or_else(|e| panic!("benchmark profile rejected: {e}"))
}
