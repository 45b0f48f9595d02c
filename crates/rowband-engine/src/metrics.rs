//! Per-timestep performance metrics.
//!
//! [`StepMetrics`] captures timing and scheduling data for a single
//! timestep, for telemetry and profiling.

/// Timing and scheduling metrics collected during a single timestep.
///
/// All durations are in microseconds. The domain populates these after
/// each successful [`advance()`](crate::Domain::advance).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire timestep, in microseconds.
    pub total_us: u64,
    /// Tasks executed.
    pub task_count: usize,
    /// Dependency edges in the task graph.
    pub dependency_count: usize,
    /// Longest dependency chain, in tasks.
    pub critical_path: usize,
    /// Per-stage task time summed over regions: `(label, microseconds)`,
    /// in stage order.
    pub stage_us: Vec<(&'static str, u64)>,
    /// Particles that crossed a region boundary this timestep.
    pub migrated_particles: usize,
}

impl StepMetrics {
    /// Accumulated task time of the stage labelled `label`.
    pub fn stage(&self, label: &str) -> Option<u64> {
        self.stage_us
            .iter()
            .find(|(l, _)| *l == label)
            .map(|&(_, us)| us)
    }
}
