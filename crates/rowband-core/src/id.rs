//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a region (row-band sub-domain) within a ring.
///
/// Regions are numbered `0..n_regions` in row order. `RegionId(n)` is
/// also the region's index in the ring's backing array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl RegionId {
    /// The region's position in the ring's backing array.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RegionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing timestep counter.
///
/// Incremented each time the whole ring completes one timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
