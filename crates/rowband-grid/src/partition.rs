//! Even partition of grid rows across regions.

use rowband_core::RowRange;

/// Row range owned by region `id` out of `n` regions over `rows` rows.
///
/// Boundaries are `floor(id * rows / n)`, evaluated in exact integer
/// arithmetic so adjacent regions always meet.
///
/// # Panics
///
/// Panics in debug builds if `n == 0` or `id >= n`.
pub fn row_partition(id: usize, n: usize, rows: usize) -> RowRange {
    debug_assert!(n > 0 && id < n, "region {id} outside 0..{n}");
    RowRange::new(boundary(id, n, rows), boundary(id + 1, n, rows))
}

/// Row ranges of all `n` regions, in id order.
pub fn partition_rows(n: usize, rows: usize) -> Vec<RowRange> {
    (0..n).map(|id| row_partition(id, n, rows)).collect()
}

/// Index of the range in `ranges` that contains `row`, found by bisection.
///
/// `ranges` must be contiguous and ascending, as produced by
/// [`partition_rows`].
pub fn owner_of(ranges: &[RowRange], row: i32) -> Option<usize> {
    let idx = ranges.partition_point(|r| (r.end as i64) <= i64::from(row));
    ranges.get(idx).filter(|r| r.contains(row)).map(|_| idx)
}

fn boundary(id: usize, n: usize, rows: usize) -> usize {
    ((id as u128 * rows as u128) / n as u128) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn four_regions_over_hundred_rows() {
        let ranges = partition_rows(4, 100);
        let bounds: Vec<(usize, usize)> = ranges.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(bounds, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
        assert_eq!(owner_of(&ranges, 24), Some(0));
        assert_eq!(owner_of(&ranges, 25), Some(1));
        assert_eq!(owner_of(&ranges, 99), Some(3));
        assert_eq!(owner_of(&ranges, 100), None);
        assert_eq!(owner_of(&ranges, -1), None);
    }

    #[test]
    fn uneven_split_floors() {
        let bounds: Vec<usize> = partition_rows(3, 10).iter().map(|r| r.len()).collect();
        assert_eq!(bounds, vec![3, 3, 4]);
    }

    #[test]
    fn huge_grid_does_not_overflow() {
        let r = row_partition(usize::MAX / 2, usize::MAX / 2 + 1, usize::MAX);
        assert_eq!(r.end, usize::MAX);
    }

    proptest! {
        #[test]
        fn partition_is_exact_and_contiguous(n in 1usize..64, extra in 0usize..512) {
            let rows = n + extra;
            let ranges = partition_rows(n, rows);
            prop_assert_eq!(ranges[0].start, 0);
            prop_assert_eq!(ranges[n - 1].end, rows);
            for pair in ranges.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            for r in &ranges {
                prop_assert!(!r.is_empty());
            }
        }

        #[test]
        fn every_row_has_one_owner(n in 1usize..32, extra in 0usize..128) {
            let rows = n + extra;
            let ranges = partition_rows(n, rows);
            for row in 0..rows as i32 {
                let owner = owner_of(&ranges, row);
                prop_assert!(owner.is_some());
                let count = ranges.iter().filter(|r| r.contains(row)).count();
                prop_assert_eq!(count, 1);
            }
        }
    }
}
