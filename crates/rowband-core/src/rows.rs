//! Half-open row ranges.

use std::fmt;

/// A half-open range of global grid rows, `[start, end)`.
///
/// Used as a region's `limits_y`. Unlike `std::ops::Range` this is
/// `Copy`, so it can be handed to collaborators by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowRange {
    /// First owned row (inclusive).
    pub start: usize,
    /// One past the last owned row (exclusive).
    pub end: usize,
}

impl RowRange {
    /// Create a row range. `start <= end` is the caller's responsibility.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of rows in the range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range holds no rows.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether a (possibly negative) global row falls inside the range.
    pub fn contains(&self, row: i32) -> bool {
        row >= 0 && (row as usize) >= self.start && (row as usize) < self.end
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
