//! Upper-mirror geometry.
//!
//! A region stages its cross-boundary exchange against the top guard
//! band of the region below it (`prev` in the ring). [`UpperMirror`]
//! records where that band lives; the halo kernels in
//! [`kernels`](crate::kernels) pair it cell-for-cell with the local
//! bottom band.

use crate::grid::VectorGrid;

/// Location of the band a region mirrors against.
///
/// The local band is buffer rows `[0, rows)` (grid rows
/// `-gc[1][0]..gc[1][1]`). The mirror band is buffer rows
/// `[band_row, band_row + rows)` of the `neighbour`'s buffer, i.e. grid
/// rows `nx[1] - gc[1][0]..nx[1] + gc[1][1]` of that neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UpperMirror {
    /// Ring index of the region owning the mirrored band.
    pub neighbour: usize,
    /// First buffer row of the band inside the neighbour's buffer.
    pub band_row: usize,
    /// Band height in rows (`gc[1][0] + gc[1][1]`).
    pub rows: usize,
}

impl UpperMirror {
    /// Compute the mirror geometry of `local` against `neighbour`, which
    /// lives at ring index `neighbour_index`.
    pub fn between(local: &VectorGrid, neighbour: &VectorGrid, neighbour_index: usize) -> Self {
        Self {
            neighbour: neighbour_index,
            band_row: neighbour.nx()[1],
            rows: local.band_rows(),
        }
    }

    /// Flat offset of the band inside the neighbour's buffer.
    pub fn offset(&self, nrow: usize) -> usize {
        self.band_row * nrow
    }

    /// Number of cells in the band.
    pub fn len(&self, nrow: usize) -> usize {
        self.rows * nrow
    }

    /// Whether the band is empty (no row guard cells configured).
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_starts_at_neighbour_height() {
        let local = VectorGrid::new([8, 25], [[1, 2], [1, 2]]);
        let below = VectorGrid::new([8, 24], [[1, 2], [1, 2]]);
        let m = UpperMirror::between(&local, &below, 3);
        assert_eq!(m.neighbour, 3);
        assert_eq!(m.band_row, 24);
        assert_eq!(m.rows, 3);
        assert_eq!(m.offset(local.nrow()), 24 * 11);
        assert_eq!(m.len(local.nrow()), 33);
        // The band ends exactly at the last guard row of the neighbour.
        assert_eq!(m.band_row + m.rows, below.buffer_rows());
    }
}
