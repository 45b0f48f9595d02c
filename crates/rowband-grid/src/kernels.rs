//! Halo kernels shared by [`Current`](crate::Current) and
//! [`Emf`](crate::Emf).
//!
//! Row kernels pair the local bottom band (buffer rows `[0, g)`) with the
//! upper-mirror band of the region below. Column kernels pair the low
//! guard columns with the wrap-around columns `nx[0]..` of the same
//! buffer.

use rowband_core::Vec3;

use crate::error::GridError;
use crate::grid::VectorGrid;
use crate::mirror::UpperMirror;

// ── Row (y) band pairing ────────────────────────────────────────

/// Visit every cell pair of the local band and its mirror band.
///
/// `f` receives the grid row `j` of the local cell (in
/// `-gc[1][0]..gc[1][1]`), the local cell and the mirror cell. When
/// `upper` is `None` the mirror band lives in `local` itself (a
/// single-region ring).
pub fn for_each_band_pair<F>(
    local: &mut VectorGrid,
    upper: Option<&mut VectorGrid>,
    mirror: &UpperMirror,
    mut f: F,
) -> Result<(), GridError>
where
    F: FnMut(isize, &mut Vec3, &mut Vec3),
{
    let nrow = local.nrow();
    let rows = mirror.rows;
    let lo = local.gc()[1][0] as isize;
    if rows == 0 {
        return Ok(());
    }
    let band = mirror.len(nrow);
    let offset = mirror.offset(nrow);

    match upper {
        Some(upper) => {
            check_band(nrow, upper, mirror)?;
            let near = &mut local.as_mut_slice()[..band];
            let far = &mut upper.as_mut_slice()[offset..offset + band];
            for (k, (l, m)) in near.iter_mut().zip(far.iter_mut()).enumerate() {
                f((k / nrow) as isize - lo, l, m);
            }
        }
        None => {
            check_band(nrow, local, mirror)?;
            if mirror.band_row < rows {
                return Err(GridError::SelfOverlap {
                    band_row: mirror.band_row,
                    rows,
                });
            }
            let (head, tail) = local.as_mut_slice().split_at_mut(offset);
            let near = &mut head[..band];
            let far = &mut tail[..band];
            for (k, (l, m)) in near.iter_mut().zip(far.iter_mut()).enumerate() {
                f((k / nrow) as isize - lo, l, m);
            }
        }
    }
    Ok(())
}

fn check_band(nrow: usize, target: &VectorGrid, mirror: &UpperMirror) -> Result<(), GridError> {
    if target.nrow() != nrow {
        return Err(GridError::StrideMismatch {
            local: nrow,
            mirror: target.nrow(),
        });
    }
    if mirror.band_row + mirror.rows > target.buffer_rows() {
        return Err(GridError::BandOutOfBounds {
            band_row: mirror.band_row,
            rows: mirror.rows,
            available: target.buffer_rows(),
        });
    }
    Ok(())
}

/// Accumulate the mirror band into the local band, then copy the sum
/// back so both views agree.
pub fn reduce_rows(
    local: &mut VectorGrid,
    upper: Option<&mut VectorGrid>,
    mirror: &UpperMirror,
) -> Result<(), GridError> {
    for_each_band_pair(local, upper, mirror, |_, l, m| {
        *l += *m;
        *m = *l;
    })
}

/// Ghost-cell refresh across the row boundary: rows below zero take the
/// mirror's value, owned rows overwrite the mirror.
pub fn refresh_rows(
    local: &mut VectorGrid,
    upper: Option<&mut VectorGrid>,
    mirror: &UpperMirror,
) -> Result<(), GridError> {
    for_each_band_pair(local, upper, mirror, |j, l, m| {
        if j < 0 {
            *l = *m;
        } else {
            *m = *l;
        }
    })
}

// ── Column (x) wrap-around ──────────────────────────────────────

/// Accumulate-then-mirror between columns `-gc[0][0]..gc[0][1]` and
/// their periodic images `nx[0]` columns to the right, for every buffer
/// row.
pub fn reduce_columns(grid: &mut VectorGrid) {
    let nx0 = grid.nx()[0];
    let gc = grid.gc();
    let nrow = grid.nrow();
    let width = gc[0][0] + gc[0][1];
    let data = grid.as_mut_slice();
    for row in data.chunks_exact_mut(nrow) {
        let (low, high) = row.split_at_mut(nx0);
        for (l, h) in low[..width].iter_mut().zip(high[..width].iter_mut()) {
            *l += *h;
            *h = *l;
        }
    }
}

/// Periodic column ghost refresh: low guard columns copy from
/// `nx[0] + i`, high guard columns copy from `i`.
pub fn refresh_columns(grid: &mut VectorGrid) {
    let nx0 = grid.nx()[0];
    let [lo, hi] = grid.gc()[0];
    let nrow = grid.nrow();
    for row in grid.as_mut_slice().chunks_exact_mut(nrow) {
        // Buffer column c holds grid column c - lo.
        for c in 0..lo {
            row[c] = row[c + nx0];
        }
        for c in lo + nx0..lo + nx0 + hi {
            row[c] = row[c - nx0];
        }
    }
}

/// Apply the three-point stencil `[a, b, a]` along x to every owned row.
///
/// Reads the left and right neighbour of each owned cell, so the column
/// guard cells must be current. Guard cells themselves are left untouched.
pub fn filter_x(grid: &mut VectorGrid, a: f32, b: f32) {
    let nx0 = grid.nx()[0];
    let nx1 = grid.nx()[1];
    let lo = grid.gc()[0][0];
    let lo_rows = grid.gc()[1][0];
    let nrow = grid.nrow();
    let data = grid.as_mut_slice();
    for j in 0..nx1 {
        let row = &mut data[(j + lo_rows) * nrow..(j + lo_rows + 1) * nrow];
        let mut left = row[lo - 1];
        for c in lo..lo + nx0 {
            let centre = row[c];
            row[c] = left * a + centre * b + row[c + 1] * a;
            left = centre;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GC: [[usize; 2]; 2] = [[1, 2], [1, 2]];

    fn seq(grid: &mut VectorGrid, base: f32) {
        for (k, v) in grid.as_mut_slice().iter_mut().enumerate() {
            *v = Vec3::new(base + k as f32, 0.0, 1.0);
        }
    }

    #[test]
    fn reduce_rows_sums_both_sides() {
        let mut upper_region = VectorGrid::new([4, 5], GC);
        let mut lower_region = VectorGrid::new([4, 6], GC);
        seq(&mut upper_region, 0.0);
        seq(&mut lower_region, 1000.0);
        let mirror = UpperMirror::between(&upper_region, &lower_region, 0);
        let before_local = upper_region.get(2, 1);
        let before_mirror = lower_region.get(2, 6 + 1);

        reduce_rows(&mut upper_region, Some(&mut lower_region), &mirror).unwrap();

        let sum = before_local + before_mirror;
        assert_eq!(upper_region.get(2, 1), sum);
        assert_eq!(lower_region.get(2, 7), sum);
    }

    #[test]
    fn reduce_rows_leaves_rows_outside_band_alone() {
        let mut a = VectorGrid::new([4, 5], GC);
        let mut b = VectorGrid::new([4, 5], GC);
        seq(&mut a, 0.0);
        seq(&mut b, 0.0);
        let below_untouched = b.get(0, 3);
        let local_untouched = a.get(0, 2);
        let mirror = UpperMirror::between(&a, &b, 0);
        reduce_rows(&mut a, Some(&mut b), &mirror).unwrap();
        // The band covers rows -1..2 locally and 4..7 below.
        assert_eq!(b.get(0, 3), below_untouched);
        assert_eq!(a.get(0, 2), local_untouched);
    }

    #[test]
    fn refresh_rows_direction_depends_on_row_sign() {
        let mut local = VectorGrid::new([3, 4], GC);
        let mut below = VectorGrid::new([3, 4], GC);
        local.fill(Vec3::new(1.0, 0.0, 0.0));
        below.fill(Vec3::new(2.0, 0.0, 0.0));
        let mirror = UpperMirror::between(&local, &below, 0);
        refresh_rows(&mut local, Some(&mut below), &mirror).unwrap();
        // Guard row of the local region takes the owned row of the one below.
        assert_eq!(local.get(0, -1).x, 2.0);
        // Owned rows of the local region overwrite the guard rows below.
        assert_eq!(below.get(0, 4).x, 1.0);
        assert_eq!(below.get(0, 5).x, 1.0);
        assert_eq!(local.get(0, 0).x, 1.0);
        assert_eq!(below.get(0, 3).x, 2.0);
    }

    #[test]
    fn self_mirror_reduces_within_one_buffer() {
        let mut g = VectorGrid::new([3, 4], GC);
        g.set(1, -1, Vec3::new(1.0, 0.0, 0.0));
        g.set(1, 3, Vec3::new(2.0, 0.0, 0.0));
        let mirror = UpperMirror::between(&g, &g, 0);
        reduce_rows(&mut g, None, &mirror).unwrap();
        assert_eq!(g.get(1, -1).x, 3.0);
        assert_eq!(g.get(1, 3).x, 3.0);
    }

    #[test]
    fn self_mirror_rejects_overlap() {
        let mut g = VectorGrid::new([3, 2], GC);
        let mirror = UpperMirror::between(&g, &g, 0);
        let err = reduce_rows(&mut g, None, &mirror).unwrap_err();
        assert!(matches!(err, GridError::SelfOverlap { .. }));
    }

    #[test]
    fn stride_mismatch_is_reported() {
        let mut a = VectorGrid::new([3, 4], GC);
        let mut b = VectorGrid::new([5, 4], GC);
        let mirror = UpperMirror::between(&a, &b, 0);
        assert!(matches!(
            reduce_rows(&mut a, Some(&mut b), &mirror),
            Err(GridError::StrideMismatch { local: 6, mirror: 8 })
        ));
    }

    #[test]
    fn columns_wrap_periodically() {
        let mut g = VectorGrid::new([4, 2], GC);
        g.set(-1, 0, Vec3::new(1.0, 0.0, 0.0));
        g.set(3, 0, Vec3::new(5.0, 0.0, 0.0));
        g.set(0, 0, Vec3::new(2.0, 0.0, 0.0));
        g.set(4, 0, Vec3::new(7.0, 0.0, 0.0));
        reduce_columns(&mut g);
        assert_eq!(g.get(-1, 0).x, 6.0);
        assert_eq!(g.get(3, 0).x, 6.0);
        assert_eq!(g.get(0, 0).x, 9.0);
        assert_eq!(g.get(4, 0).x, 9.0);
    }

    #[test]
    fn refresh_columns_copies_periodic_images() {
        let mut g = VectorGrid::new([4, 1], GC);
        for i in 0..4 {
            g.set(i, 0, Vec3::new(i as f32, 0.0, 0.0));
        }
        refresh_columns(&mut g);
        assert_eq!(g.get(-1, 0).x, 3.0);
        assert_eq!(g.get(4, 0).x, 0.0);
        assert_eq!(g.get(5, 0).x, 1.0);
    }

    #[test]
    fn binomial_filter_smooths_spike() {
        let mut g = VectorGrid::new([5, 1], GC);
        g.set(2, 0, Vec3::new(4.0, 0.0, 0.0));
        filter_x(&mut g, 0.25, 0.5);
        let xs: Vec<f32> = (0..5).map(|i| g.get(i, 0).x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 1.0, 0.0]);
    }

    proptest! {
        #[test]
        fn row_reduction_agrees_and_conserves(
            values in prop::collection::vec(-100.0f32..100.0, 2 * 7 * 3),
            rows_a in 3usize..8,
            rows_b in 3usize..8,
        ) {
            let mut a = VectorGrid::new([4, rows_a], GC);
            let mut b = VectorGrid::new([4, rows_b], GC);
            let mirror = UpperMirror::between(&a, &b, 0);
            let band = mirror.len(a.nrow());
            let off = mirror.offset(b.nrow());
            for k in 0..band {
                a.as_mut_slice()[k] = Vec3::new(values[k], 0.0, 0.0);
                b.as_mut_slice()[off + k] = Vec3::new(values[band + k], 0.0, 0.0);
            }
            reduce_rows(&mut a, Some(&mut b), &mirror).unwrap();
            for k in 0..band {
                let l = a.as_slice()[k];
                let m = b.as_slice()[off + k];
                prop_assert_eq!(l, m);
                prop_assert_eq!(l.x, values[k] + values[band + k]);
            }
        }
    }
}
