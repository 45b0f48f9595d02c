//! Region-local electromagnetic field.

use crate::error::GridError;
use crate::grid::{GuardCells, VectorGrid};
use crate::kernels;
use crate::mirror::UpperMirror;

/// Electric and magnetic field of one region.
///
/// E and B share one guard-cell layout and therefore one upper-mirror
/// geometry.
#[derive(Clone, Debug)]
pub struct Emf {
    e: VectorGrid,
    b: VectorGrid,
    upper: Option<UpperMirror>,
    moving_window: bool,
    dx: [f32; 2],
    dt: f32,
    iter: u64,
}

impl Emf {
    /// Zero fields over `nx` cells spanning `box_size`.
    pub fn new(nx: [usize; 2], gc: GuardCells, box_size: [f32; 2], dt: f32) -> Self {
        Self {
            e: VectorGrid::new(nx, gc),
            b: VectorGrid::new(nx, gc),
            upper: None,
            moving_window: false,
            dx: [box_size[0] / nx[0] as f32, box_size[1] / nx[1] as f32],
            dt,
            iter: 0,
        }
    }

    /// Electric field.
    pub fn e(&self) -> &VectorGrid {
        &self.e
    }

    /// Magnetic field.
    pub fn b(&self) -> &VectorGrid {
        &self.b
    }

    /// Mutable electric field.
    pub fn e_mut(&mut self) -> &mut VectorGrid {
        &mut self.e
    }

    /// Mutable magnetic field.
    pub fn b_mut(&mut self) -> &mut VectorGrid {
        &mut self.b
    }

    /// Both fields at once.
    pub fn fields_mut(&mut self) -> (&mut VectorGrid, &mut VectorGrid) {
        (&mut self.e, &mut self.b)
    }

    /// Cell size `[dx, dy]`.
    pub fn dx(&self) -> [f32; 2] {
        self.dx
    }

    /// Timestep.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Number of solver advances recorded with [`count_advance`](Self::count_advance).
    pub fn iter(&self) -> u64 {
        self.iter
    }

    /// Record one solver advance.
    pub fn count_advance(&mut self) {
        self.iter += 1;
    }

    /// Mirror geometry against the region below, once linked.
    pub fn upper_mirror(&self) -> Option<UpperMirror> {
        self.upper
    }

    /// Install the mirror geometry.
    pub fn set_upper_mirror(&mut self, mirror: UpperMirror) {
        self.upper = Some(mirror);
    }

    /// Whether column wrap-around is disabled.
    pub fn moving_window(&self) -> bool {
        self.moving_window
    }

    /// Disable column ghost refreshes.
    pub fn set_moving_window(&mut self) {
        self.moving_window = true;
    }

    /// Row ghost-cell refresh of E and B against the region below.
    pub fn update_gc_y(&mut self, upper: Option<&mut Emf>) -> Result<(), GridError> {
        let mirror = self.upper.ok_or(GridError::Unlinked)?;
        match upper {
            Some(other) => {
                kernels::refresh_rows(&mut self.e, Some(&mut other.e), &mirror)?;
                kernels::refresh_rows(&mut self.b, Some(&mut other.b), &mirror)
            }
            None => {
                kernels::refresh_rows(&mut self.e, None, &mirror)?;
                kernels::refresh_rows(&mut self.b, None, &mirror)
            }
        }
    }

    /// Column ghost-cell refresh of E and B. A no-op in moving-window mode.
    pub fn update_gc_x(&mut self) {
        if !self.moving_window {
            kernels::refresh_columns(&mut self.e);
            kernels::refresh_columns(&mut self.b);
        }
    }

    /// Reconstruct `E.x` and `B.x` on owned cells from the divergence-free
    /// condition, integrating along x from the high edge of each row.
    ///
    /// Reads one guard cell past the high column edge and one guard row on
    /// each side, so those must be current.
    pub fn div_corr_x(&mut self) {
        let [nx0, nx1] = self.e.nx();
        let ratio = f64::from(self.dx[0]) / f64::from(self.dx[1]);
        for j in 0..nx1 as isize {
            let mut ex = 0.0f64;
            let mut bx = 0.0f64;
            for i in (0..nx0 as isize).rev() {
                ex += ratio * f64::from(self.e.get(i + 1, j).y - self.e.get(i + 1, j - 1).y);
                self.e.get_mut(i, j).x = ex as f32;

                bx += ratio * f64::from(self.b.get(i, j + 1).y - self.b.get(i, j).y);
                self.b.get_mut(i, j).x = bx as f32;
            }
        }
    }

    /// Flat index and field name of the first NaN, if any.
    pub fn first_nan(&self) -> Option<(&'static str, usize)> {
        self.e
            .first_nan()
            .map(|idx| ("E", idx))
            .or_else(|| self.b.first_nan().map(|idx| ("B", idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowband_core::Vec3;

    const GC: GuardCells = [[1, 2], [1, 2]];

    #[test]
    fn update_gc_y_moves_both_fields() {
        let mut below = Emf::new([3, 4], GC, [3.0, 4.0], 0.1);
        let mut local = Emf::new([3, 4], GC, [3.0, 4.0], 0.1);
        local.set_upper_mirror(UpperMirror::between(local.e(), below.e(), 0));
        below.e_mut().set(0, 3, Vec3::new(1.0, 0.0, 0.0));
        below.b_mut().set(0, 3, Vec3::new(0.0, 1.0, 0.0));
        local.e_mut().set(0, 0, Vec3::new(5.0, 0.0, 0.0));

        local.update_gc_y(Some(&mut below)).unwrap();

        assert_eq!(local.e().get(0, -1).x, 1.0);
        assert_eq!(local.b().get(0, -1).y, 1.0);
        assert_eq!(below.e().get(0, 4).x, 5.0);
    }

    #[test]
    fn div_corr_x_is_zero_for_uniform_y_fields() {
        let mut emf = Emf::new([4, 3], GC, [4.0, 3.0], 0.1);
        emf.e_mut().fill(Vec3::new(9.0, 2.0, 0.0));
        emf.b_mut().fill(Vec3::new(9.0, 2.0, 0.0));
        emf.div_corr_x();
        for j in 0..3 {
            for i in 0..4 {
                assert_eq!(emf.e().get(i, j).x, 0.0);
                assert_eq!(emf.b().get(i, j).x, 0.0);
            }
        }
        // Guard cells are not touched.
        assert_eq!(emf.e().get(-1, 0).x, 9.0);
    }

    #[test]
    fn div_corr_x_integrates_from_high_edge() {
        let mut emf = Emf::new([2, 1], GC, [2.0, 1.0], 0.1);
        // E.y jumps by 1 between rows -1 and 0 at every column.
        for i in -1..4 {
            emf.e_mut().set(i, 0, Vec3::new(0.0, 1.0, 0.0));
        }
        emf.div_corr_x();
        assert_eq!(emf.e().get(1, 0).x, 1.0);
        assert_eq!(emf.e().get(0, 0).x, 2.0);
    }

    #[test]
    fn first_nan_names_field() {
        let mut emf = Emf::new([2, 2], GC, [2.0, 2.0], 0.1);
        assert_eq!(emf.first_nan(), None);
        emf.b_mut().set(0, 0, Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(emf.first_nan().map(|(f, _)| f), Some("B"));
    }
}
