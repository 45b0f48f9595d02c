//! Read-only reports over the whole ring, taken between timesteps.

use rowband_grid::VectorGrid;

use crate::driver::Domain;
use crate::linker::RingLinkage;
use crate::region::Region;

/// `|E|` and `|B|` per owned cell of the global grid, row-major with
/// `grid[0]` cells per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMagnitudes {
    /// Electric field magnitude.
    pub e: Vec<f32>,
    /// Magnetic field magnitude.
    pub b: Vec<f32>,
}

impl Domain {
    /// Nearest-grid-point charge density of species `species` over the
    /// global grid, row-major with `grid[0]` cells per row.
    ///
    /// A species index no region carries yields all zeros.
    pub fn charge_report(&self, species: usize) -> Vec<f32> {
        let [nx0, nx1] = self.ring.grid();
        let mut rho = vec![0.0f32; nx0 * nx1];
        for region in self.ring.regions() {
            let Some(sp) = region.species_at(species) else {
                continue;
            };
            let q = sp.params().particle_charge();
            let store = sp.lock_main();
            for p in store.particles.iter() {
                // Particle cells are global, so no row offset applies.
                if let (Ok(col), Ok(row)) = (usize::try_from(p.ix), usize::try_from(p.iy)) {
                    if col < nx0 && row < nx1 {
                        rho[row * nx0 + col] += q;
                    }
                }
            }
        }
        rho
    }

    /// Field magnitudes over the global grid.
    pub fn emf_report(&self) -> FieldMagnitudes {
        let [nx0, nx1] = self.ring.grid();
        let mut report = FieldMagnitudes {
            e: vec![0.0; nx0 * nx1],
            b: vec![0.0; nx0 * nx1],
        };
        for region in self.ring.regions() {
            let emf = region.lock_emf();
            let offset = region.limits_y().start;
            place_magnitudes(&mut report.e, emf.e(), offset, nx0);
            place_magnitudes(&mut report.b, emf.b(), offset, nx0);
        }
        report
    }

    /// Particles held in main vectors across all regions and species.
    pub fn particle_count(&self) -> usize {
        self.ring.regions().iter().map(Region::particle_count).sum()
    }

    /// Particles sitting in inboxes. Zero between timesteps.
    pub fn in_flight_count(&self) -> usize {
        self.ring
            .regions()
            .iter()
            .flat_map(|r| r.species())
            .map(|s| s.in_flight())
            .sum()
    }

    /// Particles of species `species` in region `region`, if both exist.
    pub fn species_len(&self, region: usize, species: usize) -> Option<usize> {
        self.ring
            .regions()
            .get(region)?
            .species_at(species)
            .map(|s| s.len())
    }

    /// Region `i`.
    pub fn region(&self, i: usize) -> Option<&Region> {
        self.ring.regions().get(i)
    }
}

fn place_magnitudes(out: &mut [f32], grid: &VectorGrid, row_offset: usize, nx0: usize) {
    let [cols, rows] = grid.nx();
    for j in 0..rows {
        let base = (row_offset + j) * nx0;
        for i in 0..cols.min(nx0) {
            out[base + i] = grid.get(i as isize, j as isize).norm();
        }
    }
}

impl RingLinkage {
    /// Whether every region's linkage points at the ring neighbours of
    /// `domain`.
    pub fn matches(&self, domain: &Domain) -> bool {
        self.regions.len() == domain.ring().len()
            && self.regions.iter().enumerate().all(|(i, r)| {
                r.prev == domain.ring().prev(i) && r.next == domain.ring().next(i)
            })
    }
}
