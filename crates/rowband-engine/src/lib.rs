//! Region ring and per-timestep task pipeline for rowband.
//!
//! A [`Domain`] splits a periodic 2D grid into row bands (regions), links
//! each band to its neighbours through mirror bands and particle inboxes,
//! and advances them through a fixed sequence of stages. Every stage runs
//! once per region as a task with a declared buffer footprint; conflicting
//! footprints become dependency edges, and the resulting graph runs on a
//! serial or threaded scheduler with identical results.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collab;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod footprint;
pub mod laser;
pub mod linker;
pub mod metrics;
pub mod region;
pub mod ring;
mod scope;
pub mod species;

pub use collab::{FieldSolver, FieldSource, PushContext, SpeciesPusher};
pub use config::{
    ConfigError, DomainConfig, SchedulerConfig, SpeciesTemplate, DEFAULT_GUARD_CELLS,
};
pub use diagnostics::FieldMagnitudes;
pub use driver::{build_graph, Domain};
pub use footprint::{declare_footprint, GridLayout};
pub use linker::{link_boundaries, RegionLinkage, RingLinkage};
pub use metrics::StepMetrics;
pub use region::Region;
pub use ring::{RegionRing, RingLink, Walk, CANONICAL_START};
pub use species::{
    Species, SpeciesParams, SpeciesRoutes, SpeciesStore, FROM_ABOVE, FROM_BELOW,
};
