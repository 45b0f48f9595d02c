//! Error types for halo operations.

use rowband_core::KernelError;
use std::fmt;

/// Errors raised when a halo kernel cannot address its mirror band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// The buffer has no upper mirror yet; boundaries were never linked.
    Unlinked,
    /// The mirror buffer's row stride differs from the local buffer's.
    StrideMismatch {
        /// Local row stride.
        local: usize,
        /// Mirror row stride.
        mirror: usize,
    },
    /// The mirror band does not fit inside the mirror buffer.
    BandOutOfBounds {
        /// First buffer row of the band.
        band_row: usize,
        /// Band height in rows.
        rows: usize,
        /// Buffer rows available in the mirror buffer.
        available: usize,
    },
    /// A self-mirror band overlaps the local band it pairs with.
    SelfOverlap {
        /// First buffer row of the band.
        band_row: usize,
        /// Band height in rows.
        rows: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlinked => write!(f, "buffer has no upper mirror (boundaries not linked)"),
            Self::StrideMismatch { local, mirror } => {
                write!(f, "mirror row stride {mirror} differs from local stride {local}")
            }
            Self::BandOutOfBounds {
                band_row,
                rows,
                available,
            } => write!(
                f,
                "mirror band rows [{band_row}, {}) exceed {available} buffer rows",
                band_row + rows
            ),
            Self::SelfOverlap { band_row, rows } => write!(
                f,
                "self-mirror band starting at row {band_row} overlaps local band of {rows} rows"
            ),
        }
    }
}

impl std::error::Error for GridError {}

impl From<GridError> for KernelError {
    fn from(e: GridError) -> Self {
        KernelError::ExecutionFailed {
            reason: e.to_string(),
        }
    }
}
