//! Boundary linking between adjacent regions.

use rowband_core::RegionId;
use rowband_grid::UpperMirror;
use tracing::debug;

use crate::ring::RegionRing;
use crate::species::SpeciesRoutes;

/// Wire every region to its neighbours.
///
/// For each region this installs the current and EM upper-mirror
/// geometry against `prev`, and the outbound particle routes of every
/// species (up to `next`, down to `prev`). Geometry depends only on the
/// ring layout, so linking twice yields identical linkage.
pub fn link_boundaries(ring: &mut RegionRing) {
    let plans: Vec<(usize, UpperMirror, UpperMirror, SpeciesRoutes)> = ring
        .walk()
        .map(|i| {
            let link = ring.link(i);
            let (current, emf) = {
                let local = ring.region(i);
                let below = ring.region(link.prev);
                if i == link.prev {
                    let c = local.lock_current();
                    let e = local.lock_emf();
                    (
                        UpperMirror::between(c.grid(), c.grid(), i),
                        UpperMirror::between(e.e(), e.e(), i),
                    )
                } else {
                    let (c_lo, c_hi) = (local.lock_current(), below.lock_current());
                    let current = UpperMirror::between(c_lo.grid(), c_hi.grid(), link.prev);
                    drop((c_lo, c_hi));
                    let (e_lo, e_hi) = (local.lock_emf(), below.lock_emf());
                    (current, UpperMirror::between(e_lo.e(), e_hi.e(), link.prev))
                }
            };
            let routes = SpeciesRoutes {
                up: link.next,
                down: link.prev,
            };
            (i, current, emf, routes)
        })
        .collect();

    for (i, current, emf, routes) in plans {
        let region = ring.region_mut(i);
        region.current_mut().set_upper_mirror(current);
        region.emf_mut().set_upper_mirror(emf);
        for species in region.species_mut() {
            species.set_routes(routes);
        }
        debug!(
            region = i,
            prev = routes.down,
            next = routes.up,
            current_band = current.band_row,
            emf_band = emf.band_row,
            "boundary linked"
        );
    }
}

/// Linkage of one region, as captured by [`RingLinkage::capture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionLinkage {
    /// Region id.
    pub id: RegionId,
    /// Ring index of the region below.
    pub prev: usize,
    /// Ring index of the region above.
    pub next: usize,
    /// Current mirror geometry.
    pub current: Option<UpperMirror>,
    /// EM mirror geometry.
    pub emf: Option<UpperMirror>,
    /// Outbound routes of each species.
    pub routes: Vec<Option<SpeciesRoutes>>,
}

/// Snapshot of the whole ring's linkage, comparable for equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingLinkage {
    /// Per-region linkage in walk order.
    pub regions: Vec<RegionLinkage>,
}

impl RingLinkage {
    /// Capture the current linkage of `ring`.
    pub fn capture(ring: &RegionRing) -> Self {
        let regions = ring
            .walk()
            .map(|i| {
                let region = ring.region(i);
                let link = ring.link(i);
                RegionLinkage {
                    id: region.id(),
                    prev: link.prev,
                    next: link.next,
                    current: region.lock_current().upper_mirror(),
                    emf: region.lock_emf().upper_mirror(),
                    routes: region.species().iter().map(|s| s.routes()).collect(),
                }
            })
            .collect();
        Self { regions }
    }

    /// Whether every region has mirrors and routes installed.
    pub fn is_complete(&self) -> bool {
        self.regions.iter().all(|r| {
            r.current.is_some() && r.emf.is_some() && r.routes.iter().all(Option::is_some)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainConfig, SpeciesTemplate};

    fn ring(n: usize, rows: usize) -> RegionRing {
        let cfg = DomainConfig::new(n, [8, rows], [8.0, rows as f32], 0.1)
            .with_species(SpeciesTemplate::new("e", -1.0, [1, 1]))
            .with_species(SpeciesTemplate::new("i", 1.0, [1, 1]));
        RegionRing::build(&cfg).unwrap()
    }

    #[test]
    fn unlinked_ring_is_incomplete() {
        let r = ring(3, 30);
        assert!(!RingLinkage::capture(&r).is_complete());
    }

    #[test]
    fn mirrors_point_into_prev_band() {
        let mut r = ring(3, 31); // rows 10, 10, 11
        link_boundaries(&mut r);
        let linkage = RingLinkage::capture(&r);
        assert!(linkage.is_complete());
        let region0 = &linkage.regions[0];
        let mirror = region0.current.unwrap();
        assert_eq!(mirror.neighbour, 2);
        assert_eq!(mirror.band_row, 11);
        assert_eq!(mirror.rows, 3);
        let region1 = &linkage.regions[1];
        assert_eq!(region1.emf.unwrap().neighbour, 0);
        assert_eq!(region1.emf.unwrap().band_row, 10);
        assert_eq!(
            region1.routes,
            vec![Some(SpeciesRoutes { up: 2, down: 0 }); 2]
        );
    }

    #[test]
    fn linking_is_idempotent() {
        let mut r = ring(4, 100);
        link_boundaries(&mut r);
        let first = RingLinkage::capture(&r);
        link_boundaries(&mut r);
        assert_eq!(RingLinkage::capture(&r), first);
    }

    #[test]
    fn two_regions_share_two_boundaries() {
        let mut r = ring(2, 20);
        link_boundaries(&mut r);
        let linkage = RingLinkage::capture(&r);
        assert_eq!(linkage.regions[0].current.unwrap().neighbour, 1);
        assert_eq!(linkage.regions[1].current.unwrap().neighbour, 0);
        assert_eq!(
            linkage.regions[0].routes[0],
            Some(SpeciesRoutes { up: 1, down: 1 })
        );
    }

    #[test]
    fn single_region_mirrors_itself() {
        let mut r = ring(1, 8);
        link_boundaries(&mut r);
        let linkage = RingLinkage::capture(&r);
        let mirror = linkage.regions[0].current.unwrap();
        assert_eq!(mirror.neighbour, 0);
        assert_eq!(mirror.band_row, 8);
    }
}
