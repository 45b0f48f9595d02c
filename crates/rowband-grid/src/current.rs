//! Region-local electric current.

use rowband_core::Vec3;

use crate::error::GridError;
use crate::grid::{GuardCells, VectorGrid};
use crate::kernels;
use crate::mirror::UpperMirror;
use crate::smooth::{SmoothKind, Smoothing};

/// Electric current density of one region, with guard cells and the
/// upper-mirror geometry used to exchange the boundary band.
#[derive(Clone, Debug)]
pub struct Current {
    grid: VectorGrid,
    upper: Option<UpperMirror>,
    smoothing: Smoothing,
    moving_window: bool,
    dx: [f32; 2],
    dt: f32,
    iter: u64,
}

impl Current {
    /// A zeroed current over `nx` cells spanning `box_size`.
    pub fn new(
        nx: [usize; 2],
        gc: GuardCells,
        box_size: [f32; 2],
        dt: f32,
        smoothing: Smoothing,
    ) -> Self {
        Self {
            grid: VectorGrid::new(nx, gc),
            upper: None,
            smoothing,
            moving_window: false,
            dx: [box_size[0] / nx[0] as f32, box_size[1] / nx[1] as f32],
            dt,
            iter: 0,
        }
    }

    /// The underlying grid.
    pub fn grid(&self) -> &VectorGrid {
        &self.grid
    }

    /// Mutable access to the underlying grid.
    pub fn grid_mut(&mut self) -> &mut VectorGrid {
        &mut self.grid
    }

    /// Cell size `[dx, dy]`.
    pub fn dx(&self) -> [f32; 2] {
        self.dx
    }

    /// Timestep.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Number of completed deposits (incremented by [`reduce_x`](Self::reduce_x)).
    pub fn iter(&self) -> u64 {
        self.iter
    }

    /// Smoothing configuration.
    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    /// Mirror geometry against the region below, once linked.
    pub fn upper_mirror(&self) -> Option<UpperMirror> {
        self.upper
    }

    /// Install the mirror geometry. Replaces any previous geometry.
    pub fn set_upper_mirror(&mut self, mirror: UpperMirror) {
        self.upper = Some(mirror);
    }

    /// Whether column wrap-around is disabled.
    pub fn moving_window(&self) -> bool {
        self.moving_window
    }

    /// Disable column wrap-around for reductions and ghost refreshes.
    pub fn set_moving_window(&mut self) {
        self.moving_window = true;
    }

    /// Zero every cell, guard cells included.
    pub fn zero(&mut self) {
        self.grid.fill(Vec3::ZERO);
    }

    /// Add `value` to the cell at grid coordinate `(i, j)`.
    pub fn deposit(&mut self, i: isize, j: isize, value: Vec3) {
        *self.grid.get_mut(i, j) += value;
    }

    /// Column reduction after deposit; then counts the deposit.
    pub fn reduce_x(&mut self) {
        if !self.moving_window {
            kernels::reduce_columns(&mut self.grid);
        }
        self.iter += 1;
    }

    /// Row reduction against the region below.
    ///
    /// `upper` is the current of the region owning the mirror band, or
    /// `None` when that region is this one.
    pub fn reduce_y(&mut self, upper: Option<&mut Current>) -> Result<(), GridError> {
        let mirror = self.upper.ok_or(GridError::Unlinked)?;
        kernels::reduce_rows(&mut self.grid, upper.map(|c| &mut c.grid), &mirror)
    }

    /// Row ghost-cell refresh against the region below.
    pub fn update_gc_y(&mut self, upper: Option<&mut Current>) -> Result<(), GridError> {
        let mirror = self.upper.ok_or(GridError::Unlinked)?;
        kernels::refresh_rows(&mut self.grid, upper.map(|c| &mut c.grid), &mirror)
    }

    /// Column ghost-cell refresh. A no-op in moving-window mode.
    pub fn update_gc_x(&mut self) {
        if !self.moving_window {
            kernels::refresh_columns(&mut self.grid);
        }
    }

    /// Apply the configured smoothing along x to the owned rows.
    pub fn smooth_x(&mut self) {
        if !self.smoothing.is_enabled() {
            return;
        }
        for _ in 0..self.smoothing.level {
            kernels::filter_x(&mut self.grid, 0.25, 0.5);
            self.update_gc_x();
        }
        if self.smoothing.kind == SmoothKind::Compensated {
            let (a, b) = self.smoothing.compensator();
            kernels::filter_x(&mut self.grid, a, b);
            self.update_gc_x();
        }
    }
}
