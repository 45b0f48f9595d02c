//! Pipeline stages in their fixed per-timestep order.

use std::fmt;

/// One stage of a timestep. Declaration order is execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Zero the current, push particles, route leavers, reduce columns.
    SpecAdvance,
    /// Compact departed particles and merge the inboxes.
    SpecUpdate,
    /// Accumulate-then-mirror the current across the row boundary.
    CurrentReductionY,
    /// Smooth the current along x.
    CurrentSmoothX,
    /// Refresh current row guard cells after smoothing.
    CurrentUpdateGc,
    /// Advance E and B through the field solver.
    EmfAdvance,
    /// Refresh E and B guard cells.
    EmfUpdateGc,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::SpecAdvance,
        Stage::SpecUpdate,
        Stage::CurrentReductionY,
        Stage::CurrentSmoothX,
        Stage::CurrentUpdateGc,
        Stage::EmfAdvance,
        Stage::EmfUpdateGc,
    ];

    /// Human-readable label used in logs and errors.
    pub const fn label(self) -> &'static str {
        match self {
            Stage::SpecAdvance => "Spec Advance",
            Stage::SpecUpdate => "Spec Update",
            Stage::CurrentReductionY => "Current Reduction Y",
            Stage::CurrentSmoothX => "Current Smooth X",
            Stage::CurrentUpdateGc => "Current Update GC",
            Stage::EmfAdvance => "EMF Advance",
            Stage::EmfUpdateGc => "EMF Update GC",
        }
    }

    /// Position in [`Stage::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether the stage only runs when current smoothing is enabled.
    pub const fn is_smoothing(self) -> bool {
        matches!(self, Stage::CurrentSmoothX | Stage::CurrentUpdateGc)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
