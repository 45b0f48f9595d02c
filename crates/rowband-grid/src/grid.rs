//! Guarded 2D vector grids.

use rowband_core::Vec3;

/// Guard-cell widths: `gc[dim][0]` is the low margin, `gc[dim][1]` the
/// high margin, with `dim` 0 = x (columns) and 1 = y (rows).
pub type GuardCells = [[usize; 2]; 2];

/// A 2D array of [`Vec3`] cells with a guard-cell margin on all sides.
///
/// Cells are addressed by signed grid coordinates `(i, j)` with the owned
/// interior at `0..nx[0]` × `0..nx[1]`; guard cells extend to
/// `-gc[d][0]` below and `nx[d] + gc[d][1]` above. Storage is row-major
/// with stride [`nrow`](Self::nrow). "Buffer rows" count from the first
/// guard row, so grid row `j` is buffer row `j + gc[1][0]`.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorGrid {
    nx: [usize; 2],
    gc: GuardCells,
    nrow: usize,
    data: Vec<Vec3>,
}

impl VectorGrid {
    /// A zero-filled grid of `nx` owned cells with `gc` guard cells.
    pub fn new(nx: [usize; 2], gc: GuardCells) -> Self {
        let nrow = gc[0][0] + nx[0] + gc[0][1];
        let rows = gc[1][0] + nx[1] + gc[1][1];
        Self {
            nx,
            gc,
            nrow,
            data: vec![Vec3::ZERO; nrow * rows],
        }
    }

    /// Owned cell counts `[columns, rows]`.
    pub fn nx(&self) -> [usize; 2] {
        self.nx
    }

    /// Guard-cell widths.
    pub fn gc(&self) -> GuardCells {
        self.gc
    }

    /// Row stride: `gc[0][0] + nx[0] + gc[0][1]`.
    pub fn nrow(&self) -> usize {
        self.nrow
    }

    /// Number of buffer rows including guard rows.
    pub fn buffer_rows(&self) -> usize {
        self.gc[1][0] + self.nx[1] + self.gc[1][1]
    }

    /// Total cell count including guard cells.
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    /// Guard-band height in rows: `gc[1][0] + gc[1][1]`.
    pub fn band_rows(&self) -> usize {
        self.gc[1][0] + self.gc[1][1]
    }

    /// Cells in the row overlap zone shared with a neighbour's halo.
    pub fn overlap_len(&self) -> usize {
        self.nrow * self.band_rows()
    }

    /// Flat index of grid coordinate `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `(i, j)` lies outside the guarded extent.
    pub fn index(&self, i: isize, j: isize) -> usize {
        let col = i + self.gc[0][0] as isize;
        let row = j + self.gc[1][0] as isize;
        debug_assert!(
            col >= 0 && (col as usize) < self.nrow,
            "column {i} outside guarded extent"
        );
        debug_assert!(
            row >= 0 && (row as usize) < self.buffer_rows(),
            "row {j} outside guarded extent"
        );
        row as usize * self.nrow + col as usize
    }

    /// Cell value at `(i, j)`.
    pub fn get(&self, i: isize, j: isize) -> Vec3 {
        self.data[self.index(i, j)]
    }

    /// Mutable cell at `(i, j)`.
    pub fn get_mut(&mut self, i: isize, j: isize) -> &mut Vec3 {
        let idx = self.index(i, j);
        &mut self.data[idx]
    }

    /// Overwrite the cell at `(i, j)`.
    pub fn set(&mut self, i: isize, j: isize, value: Vec3) {
        let idx = self.index(i, j);
        self.data[idx] = value;
    }

    /// Set every cell, guard cells included.
    pub fn fill(&mut self, value: Vec3) {
        self.data.fill(value);
    }

    /// Raw storage, guard cells included.
    pub fn as_slice(&self) -> &[Vec3] {
        &self.data
    }

    /// Mutable raw storage, guard cells included.
    pub fn as_mut_slice(&mut self) -> &mut [Vec3] {
        &mut self.data
    }

    /// Flat index of the first NaN cell, if any.
    pub fn first_nan(&self) -> Option<usize> {
        self.data.iter().position(|v| v.has_nan())
    }

    /// Sum over the owned interior (guard cells excluded).
    pub fn interior_sum(&self) -> Vec3 {
        let mut total = Vec3::ZERO;
        for j in 0..self.nx[1] as isize {
            for i in 0..self.nx[0] as isize {
                total += self.get(i, j);
            }
        }
        total
    }
}
