//! The region ring: construction and topology.
//!
//! Regions live in a `Vec` indexed by id; [`RingLink`]s close them into a
//! cycle. Every per-timestep traversal starts at [`CANONICAL_START`] and
//! follows `next` until it would revisit the start.

use rowband_core::{ParticleVector, RegionId, RowRange};
use rowband_grid::{owner_of, partition_rows, Current, Emf};
use tracing::debug;

use crate::config::{ConfigError, DomainConfig};
use crate::region::Region;
use crate::species::{Species, SpeciesParams};

/// Ring index every traversal starts from.
pub const CANONICAL_START: usize = 0;

/// Neighbour links of one region, as ring indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RingLink {
    /// The region below (owner of the upper-mirror band).
    pub prev: usize,
    /// The region above.
    pub next: usize,
}

/// All regions of a domain, closed into a ring.
#[derive(Debug)]
pub struct RegionRing {
    regions: Vec<Region>,
    links: Vec<RingLink>,
    grid: [usize; 2],
}

impl RegionRing {
    /// Build every region from `config`.
    ///
    /// Validates the configuration, partitions the rows, buckets every
    /// initial particle into the region owning its row, and allocates each
    /// region's current and EM field. Boundaries are not linked yet; see
    /// [`link_boundaries`](crate::link_boundaries).
    pub fn build(config: &DomainConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let n = config.n_regions;
        let [nx0, rows] = config.grid;
        let ranges = partition_rows(n, rows);

        // buckets[region][species]
        let mut buckets: Vec<Vec<ParticleVector>> =
            vec![vec![ParticleVector::new(); config.species.len()]; n];
        for (s, template) in config.species.iter().enumerate() {
            for p in &template.particles {
                let owner =
                    owner_of(&ranges, p.iy).ok_or_else(|| ConfigError::ParticleOutsideGrid {
                        species: template.name.clone(),
                        ix: p.ix,
                        iy: p.iy,
                    })?;
                buckets[owner][s].push(*p)?;
            }
        }

        let dx = [
            config.box_size[0] / nx0 as f32,
            config.box_size[1] / rows as f32,
        ];
        let mut regions = Vec::with_capacity(n);
        let mut links = Vec::with_capacity(n);
        let mut buckets = buckets.into_iter();
        let mut id = CANONICAL_START;
        loop {
            let limits_y = ranges[id];
            let region_rows = limits_y.len();
            let region_box = [
                config.box_size[0],
                config.box_size[1] / rows as f32 * region_rows as f32,
            ];
            let mut current = Current::new(
                [nx0, region_rows],
                config.current_gc,
                region_box,
                config.dt,
                config.smoothing,
            );
            let mut emf = Emf::new([nx0, region_rows], config.emf_gc, region_box, config.dt);
            if config.moving_window {
                current.set_moving_window();
                emf.set_moving_window();
            }
            let species = config
                .species
                .iter()
                .zip(buckets.next().unwrap_or_default())
                .map(|(template, particles)| {
                    let params = SpeciesParams {
                        name: template.name.clone(),
                        m_q: template.m_q,
                        ppc: template.ppc,
                        dx,
                        dt: config.dt,
                        moving_window: config.moving_window,
                    };
                    Species::new(params, particles)
                })
                .collect();

            regions.push(Region::new(
                RegionId(id as u32),
                limits_y,
                current,
                emf,
                species,
            ));
            links.push(RingLink {
                prev: id.saturating_sub(1),
                next: id + 1,
            });
            debug!(region = id, limits = %limits_y, "region built");

            id += 1;
            if id == n {
                break;
            }
        }

        // Close the ring.
        let last = n - 1;
        links[last].next = CANONICAL_START;
        links[CANONICAL_START].prev = last;
        debug!(regions = n, rows, columns = nx0, "ring closed");

        Ok(Self {
            regions,
            links,
            grid: config.grid,
        })
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the ring holds no regions (never true for a built ring).
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Global grid size `[columns, rows]`.
    pub fn grid(&self) -> [usize; 2] {
        self.grid
    }

    /// All regions in id order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Region at ring index `i`.
    pub fn region(&self, i: usize) -> &Region {
        &self.regions[i]
    }

    /// Mutable region at ring index `i`.
    pub fn region_mut(&mut self, i: usize) -> &mut Region {
        &mut self.regions[i]
    }

    /// Links of region `i`.
    pub fn link(&self, i: usize) -> RingLink {
        self.links[i]
    }

    /// The region above `i`.
    pub fn next(&self, i: usize) -> usize {
        self.links[i].next
    }

    /// The region below `i`.
    pub fn prev(&self, i: usize) -> usize {
        self.links[i].prev
    }

    /// Row ranges of all regions in id order.
    pub fn limits(&self) -> Vec<RowRange> {
        self.regions.iter().map(Region::limits_y).collect()
    }

    /// Ring index of the region owning global row `row`.
    pub fn owner_of_row(&self, row: i32) -> Option<usize> {
        owner_of(&self.limits(), row)
    }

    /// Visit every region once, from [`CANONICAL_START`] along `next`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            links: &self.links,
            cursor: (!self.links.is_empty()).then_some(CANONICAL_START),
            remaining: self.links.len(),
        }
    }

    /// Mutable access to region `a` and, if different, region `b`.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> (&mut Region, Option<&mut Region>) {
        use std::cmp::Ordering;
        match a.cmp(&b) {
            Ordering::Equal => (&mut self.regions[a], None),
            Ordering::Less => {
                let (lo, hi) = self.regions.split_at_mut(b);
                (&mut lo[a], Some(&mut hi[0]))
            }
            Ordering::Greater => {
                let (lo, hi) = self.regions.split_at_mut(a);
                (&mut hi[0], Some(&mut lo[b]))
            }
        }
    }
}

/// Iterator returned by [`RegionRing::walk`].
#[derive(Clone, Debug)]
pub struct Walk<'a> {
    links: &'a [RingLink],
    cursor: Option<usize>,
    remaining: usize,
}

impl Iterator for Walk<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let here = self.cursor?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let next = self.links[here].next;
        self.cursor = (next != CANONICAL_START).then_some(next);
        Some(here)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeciesTemplate;
    use proptest::prelude::*;
    use rowband_core::Particle;

    fn config(n: usize, rows: usize) -> DomainConfig {
        DomainConfig::new(n, [8, rows], [8.0, rows as f32], 0.1)
    }

    #[test]
    fn four_regions_partition_hundred_rows() {
        let ring = RegionRing::build(&config(4, 100)).unwrap();
        let limits: Vec<(usize, usize)> =
            ring.limits().iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(limits, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
        assert_eq!(ring.owner_of_row(24), Some(0));
        assert_eq!(ring.owner_of_row(25), Some(1));
        assert_eq!(ring.region(2).nx(), [8, 25]);
    }

    #[test]
    fn ring_closes_on_both_ends() {
        let ring = RegionRing::build(&config(4, 100)).unwrap();
        assert_eq!(ring.next(3), CANONICAL_START);
        assert_eq!(ring.prev(CANONICAL_START), 3);
        assert_eq!(ring.walk().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn single_region_links_to_itself() {
        let ring = RegionRing::build(&config(1, 10)).unwrap();
        assert_eq!(ring.link(0), RingLink { prev: 0, next: 0 });
        assert_eq!(ring.walk().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn particles_bucketed_by_row() {
        let cfg = config(4, 100).with_species(
            SpeciesTemplate::new("e", -1.0, [1, 1]).with_particles(vec![
                Particle::at(1.5, 24.9),
                Particle::at(1.5, 25.0),
                Particle::at(1.5, 99.5),
            ]),
        );
        let ring = RegionRing::build(&cfg).unwrap();
        let counts: Vec<usize> = ring.regions().iter().map(Region::particle_count).collect();
        assert_eq!(counts, vec![1, 1, 0, 1]);
    }

    #[test]
    fn region_box_scales_with_rows() {
        let cfg = DomainConfig::new(3, [4, 10], [2.0, 5.0], 0.1);
        let ring = RegionRing::build(&cfg).unwrap();
        // Rows 3, 3, 4 with dy = 0.5 everywhere.
        for region in ring.regions() {
            assert_eq!(region.lock_current().dx(), [0.5, 0.5]);
        }
    }

    #[test]
    fn degenerate_partition_rejected() {
        assert!(matches!(
            RegionRing::build(&config(5, 4)),
            Err(ConfigError::DegeneratePartition { rows: 4, regions: 5 })
        ));
    }

    #[test]
    fn pair_mut_handles_both_orders() {
        let mut ring = RegionRing::build(&config(3, 12)).unwrap();
        let (a, b) = ring.pair_mut(2, 0);
        assert_eq!(a.id(), RegionId(2));
        assert_eq!(b.map(|r| r.id()), Some(RegionId(0)));
        let (a, b) = ring.pair_mut(1, 1);
        assert_eq!(a.id(), RegionId(1));
        assert!(b.is_none());
    }

    proptest! {
        #[test]
        fn walk_visits_each_region_once(n in 1usize..24, extra in 0usize..40) {
            let rows = 3 * n + extra;
            let ring = RegionRing::build(&config(n, rows)).unwrap();
            let visited: Vec<usize> = ring.walk().collect();
            prop_assert_eq!(visited, (0..n).collect::<Vec<_>>());
            for i in 0..n {
                prop_assert_eq!(ring.next(ring.prev(i)), i);
                prop_assert_eq!(ring.prev(ring.next(i)), i);
                let mut at = i;
                for _ in 0..n {
                    at = ring.next(at);
                }
                prop_assert_eq!(at, i);
            }
        }
    }
}
