//! Error types for the rowband pipeline.
//!
//! Organized by who raises them: collaborator kernels ([`KernelError`]),
//! the timestep driver ([`StepError`]) and buffer growth ([`AllocError`]).
//! Configuration errors live with the configuration in `rowband-engine`.

use std::error::Error;
use std::fmt;

use crate::id::RegionId;

/// A particle buffer could not grow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Total capacity, in particles, that was requested.
    pub requested: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "particle buffer allocation of {} particles failed",
            self.requested
        )
    }
}

impl Error for AllocError {}

/// Errors from a single unit of work (a collaborator or core kernel).
///
/// Wrapped in [`StepError::StageFailed`] by the driver.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelError {
    /// The kernel failed for a reason it describes itself.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// NaN detected in kernel output.
    NanDetected {
        /// Which buffer held the NaN (e.g. `"current"`).
        buffer: &'static str,
        /// Flat index of the first NaN cell, if known.
        cell_index: Option<usize>,
    },
    /// Particle buffer growth failed.
    Allocation(AllocError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::NanDetected { buffer, cell_index } => {
                write!(f, "NaN detected in {buffer}")?;
                if let Some(idx) = cell_index {
                    write!(f, " at cell {idx}")?;
                }
                Ok(())
            }
            Self::Allocation(e) => write!(f, "{e}"),
        }
    }
}

impl Error for KernelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Allocation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for KernelError {
    fn from(e: AllocError) -> Self {
        Self::Allocation(e)
    }
}

/// Errors from advancing the ring by one timestep.
///
/// Any of these is fatal to the timestep: there is no partial-timestep
/// recovery.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A stage failed for one region.
    StageFailed {
        /// Label of the failing stage (e.g. `"Spec Advance"`).
        stage: &'static str,
        /// The region whose unit of work failed.
        region: RegionId,
        /// The underlying kernel error.
        reason: KernelError,
    },
    /// Advancing is disabled because an earlier timestep failed and the
    /// ring state is no longer consistent.
    Disabled,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageFailed {
                stage,
                region,
                reason,
            } => write!(f, "stage '{stage}' failed in region {region}: {reason}"),
            Self::Disabled => write!(f, "advancing disabled after a failed timestep"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StageFailed { reason, .. } => Some(reason),
            Self::Disabled => None,
        }
    }
}
