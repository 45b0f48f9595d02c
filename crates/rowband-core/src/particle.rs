//! Particles and their growable per-region storage.

use crate::error::AllocError;

/// Number of particles a [`ParticleVector`] grows by when full.
pub const PARTICLE_BUFFER_INCREMENT: usize = 1024;

/// A macro-particle in cell-relative coordinates.
///
/// `ix`/`iy` are global cell indices; `x`/`y` are the offsets within the
/// cell in `[0, 1)`. A particle at row 24.9 has `iy == 24`, `y == 0.9`.
/// The owning region is decided by `iy` alone.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    /// Global column index.
    pub ix: i32,
    /// Global row index.
    pub iy: i32,
    /// Offset within the cell along x, in `[0, 1)`.
    pub x: f32,
    /// Offset within the cell along y, in `[0, 1)`.
    pub y: f32,
    /// Generalized velocity, x component.
    pub ux: f32,
    /// Generalized velocity, y component.
    pub uy: f32,
    /// Generalized velocity, z component.
    pub uz: f32,
}

impl Particle {
    /// A particle at rest at global position `(col, row)` in cell units.
    pub fn at(col: f32, row: f32) -> Self {
        let ix = col.floor();
        let iy = row.floor();
        Self {
            ix: ix as i32,
            iy: iy as i32,
            x: col - ix,
            y: row - iy,
            ..Self::default()
        }
    }

    /// Builder-style velocity setter.
    pub fn with_velocity(mut self, ux: f32, uy: f32, uz: f32) -> Self {
        self.ux = ux;
        self.uy = uy;
        self.uz = uz;
        self
    }

    /// Global row position in cell units (`iy + y`).
    pub fn row_position(&self) -> f32 {
        self.iy as f32 + self.y
    }
}

/// Growable particle storage.
///
/// Capacity grows in fixed steps of [`PARTICLE_BUFFER_INCREMENT`] through
/// fallible reservation, so exhausting memory surfaces as an
/// [`AllocError`] instead of an abort.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleVector {
    data: Vec<Particle>,
}

impl ParticleVector {
    /// An empty vector with no allocation.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Number of stored particles.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no particles are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated capacity, in particles.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Read-only view of the stored particles.
    pub fn as_slice(&self) -> &[Particle] {
        &self.data
    }

    /// Mutable view of the stored particles.
    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.data
    }

    /// Make room for `additional` more particles, rounding the growth up
    /// to a whole number of increments.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let free = self.data.capacity() - self.data.len();
        if additional <= free {
            return Ok(());
        }
        let needed = additional - free;
        let grow = needed.div_ceil(PARTICLE_BUFFER_INCREMENT) * PARTICLE_BUFFER_INCREMENT;
        self.data
            .try_reserve_exact(grow)
            .map_err(|_| AllocError {
                requested: self.data.len() + grow,
            })
    }

    /// Append one particle, growing by one increment if full.
    pub fn push(&mut self, particle: Particle) -> Result<(), AllocError> {
        self.reserve(1)?;
        self.data.push(particle);
        Ok(())
    }

    /// Append every particle of `other`.
    pub fn extend_from_slice(&mut self, other: &[Particle]) -> Result<(), AllocError> {
        self.reserve(other.len())?;
        self.data.extend_from_slice(other);
        Ok(())
    }

    /// Remove the particles at `indices` by swap-removal.
    ///
    /// `indices` is sorted and deduplicated in place and left empty on
    /// return. Indices past the end are ignored.
    pub fn compact(&mut self, indices: &mut Vec<usize>) {
        indices.sort_unstable();
        indices.dedup();
        // Highest first: swap_remove only disturbs positions >= idx.
        for &idx in indices.iter().rev() {
            if idx < self.data.len() {
                self.data.swap_remove(idx);
            }
        }
        indices.clear();
    }

    /// Remove every particle, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Iterate over the stored particles.
    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_at_splits_cell_and_offset() {
        let p = Particle::at(3.25, 24.5);
        assert_eq!((p.ix, p.iy), (3, 24));
        assert_eq!(p.x, 0.25);
        assert_eq!(p.y, 0.5);
        assert_eq!(p.row_position(), 24.5);
    }

    #[test]
    fn growth_is_in_fixed_increments() {
        let mut v = ParticleVector::new();
        assert_eq!(v.capacity(), 0);
        v.push(Particle::default()).unwrap();
        assert!(v.capacity() >= PARTICLE_BUFFER_INCREMENT);
        let cap = v.capacity();
        for _ in 1..cap {
            v.push(Particle::default()).unwrap();
        }
        assert_eq!(v.capacity(), cap);
        v.push(Particle::default()).unwrap();
        assert!(v.capacity() >= cap + PARTICLE_BUFFER_INCREMENT);
    }

    #[test]
    fn compact_removes_requested_indices() {
        let mut v = ParticleVector::new();
        for row in 0..5 {
            v.push(Particle::at(0.0, row as f32)).unwrap();
        }
        let mut departed = vec![3, 1, 3];
        v.compact(&mut departed);
        assert!(departed.is_empty());
        let mut rows: Vec<i32> = v.iter().map(|p| p.iy).collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 2, 4]);
    }

    #[test]
    fn compact_ignores_out_of_range() {
        let mut v = ParticleVector::new();
        v.push(Particle::default()).unwrap();
        let mut departed = vec![7];
        v.compact(&mut departed);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn extend_reserves_once() {
        let mut v = ParticleVector::new();
        let batch = vec![Particle::default(); PARTICLE_BUFFER_INCREMENT + 1];
        v.extend_from_slice(&batch).unwrap();
        assert_eq!(v.len(), PARTICLE_BUFFER_INCREMENT + 1);
        assert!(v.capacity() >= 2 * PARTICLE_BUFFER_INCREMENT);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn compact_removes_exactly_the_listed(
                len in 0usize..200,
                picks in prop::collection::vec(0usize..220, 0..60),
            ) {
                let mut v = ParticleVector::new();
                for row in 0..len {
                    v.push(Particle::at(0.0, row as f32)).unwrap();
                }
                let mut removed: Vec<usize> = picks.iter().copied().filter(|&i| i < len).collect();
                removed.sort_unstable();
                removed.dedup();

                let mut departed = picks.clone();
                v.compact(&mut departed);

                prop_assert!(departed.is_empty());
                prop_assert_eq!(v.len(), len - removed.len());
                let mut rows: Vec<usize> = v.iter().map(|p| p.iy as usize).collect();
                rows.sort_unstable();
                let expected: Vec<usize> = (0..len)
                    .filter(|i| removed.binary_search(i).is_err())
                    .collect();
                prop_assert_eq!(rows, expected);
            }
        }
    }
}
