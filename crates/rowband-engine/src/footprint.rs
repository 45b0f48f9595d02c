//! Footprint declaration policy.
//!
//! [`declare_footprint`] states, for each stage and region, exactly which
//! buffer ranges the stage's work touches: the region's own buffers and
//! the neighbour-owned mirror bands. Offsets and lengths are in buffer
//! elements (cells for grids, particles for species buffers).

use rowband_grid::GuardCells;
use rowband_task::{Access, BufferKind, BufferRef, Footprint, Span, SpeciesSlot, Stage};

use crate::ring::RegionRing;

/// Flat layout of a guarded grid, derived without touching its storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    /// Row stride.
    pub nrow: usize,
    /// Total cells including guard cells.
    pub total: usize,
    /// Cells in the row guard band (`nrow * (gc[1][0] + gc[1][1])`).
    pub band: usize,
    /// Owned rows.
    pub rows: usize,
}

impl GridLayout {
    /// Layout of a grid with `nx` owned cells and `gc` guard cells.
    pub fn new(nx: [usize; 2], gc: GuardCells) -> Self {
        let nrow = gc[0][0] + nx[0] + gc[0][1];
        Self {
            nrow,
            total: nrow * (gc[1][0] + nx[1] + gc[1][1]),
            band: nrow * (gc[1][0] + gc[1][1]),
            rows: nx[1],
        }
    }

    /// Offset of the band a region above mirrors against: buffer row
    /// `rows`, i.e. grid rows `rows - gc[1][0]..rows + gc[1][1]`.
    pub fn mirror_offset(&self) -> usize {
        self.rows * self.nrow
    }
}

/// Current layout of region `i`.
pub fn current_layout(ring: &RegionRing, i: usize) -> GridLayout {
    let region = ring.region(i);
    GridLayout::new(region.nx(), region.current_gc())
}

/// E/B layout of region `i`.
pub fn emf_layout(ring: &RegionRing, i: usize) -> GridLayout {
    let region = ring.region(i);
    GridLayout::new(region.nx(), region.emf_gc())
}

fn buffer(ring: &RegionRing, i: usize, kind: BufferKind) -> BufferRef {
    BufferRef::new(ring.region(i).id(), kind)
}

fn species(ring: &RegionRing, i: usize, species: usize, slot: SpeciesSlot) -> BufferRef {
    buffer(ring, i, BufferKind::Species { species, slot })
}

/// Declare the footprint of `stage` applied to region `i`.
pub fn declare_footprint(stage: Stage, i: usize, ring: &RegionRing) -> Footprint {
    let link = ring.link(i);
    let n_species = ring.region(i).n_species();
    let mut fp = Footprint::new();
    match stage {
        Stage::SpecAdvance => {
            fp.push(buffer(ring, i, BufferKind::EmfE), 0, emf_layout(ring, i).total, Access::Read);
            fp.push(buffer(ring, i, BufferKind::EmfB), 0, emf_layout(ring, i).total, Access::Read);
            fp.push(
                buffer(ring, i, BufferKind::Current),
                0,
                current_layout(ring, i).total,
                Access::ReadWrite,
            );
            for s in 0..n_species {
                fp.push(species(ring, i, s, SpeciesSlot::Main), 0, Span::WHOLE, Access::ReadWrite);
                fp.push(
                    species(ring, link.next, s, SpeciesSlot::FromBelow),
                    0,
                    Span::WHOLE,
                    Access::Write,
                );
                fp.push(
                    species(ring, link.prev, s, SpeciesSlot::FromAbove),
                    0,
                    Span::WHOLE,
                    Access::Write,
                );
            }
        }
        Stage::SpecUpdate => {
            for s in 0..n_species {
                for slot in [SpeciesSlot::Main, SpeciesSlot::FromBelow, SpeciesSlot::FromAbove] {
                    fp.push(species(ring, i, s, slot), 0, Span::WHOLE, Access::ReadWrite);
                }
            }
        }
        Stage::CurrentReductionY | Stage::CurrentUpdateGc => {
            let local = current_layout(ring, i);
            let below = current_layout(ring, link.prev);
            fp.push(buffer(ring, i, BufferKind::Current), 0, local.band, Access::ReadWrite);
            fp.push(
                buffer(ring, link.prev, BufferKind::Current),
                below.mirror_offset(),
                local.band,
                Access::ReadWrite,
            );
        }
        Stage::CurrentSmoothX => {
            fp.push(
                buffer(ring, i, BufferKind::Current),
                0,
                current_layout(ring, i).total,
                Access::ReadWrite,
            );
        }
        Stage::EmfAdvance => {
            let emf = emf_layout(ring, i);
            fp.push(
                buffer(ring, i, BufferKind::Current),
                0,
                current_layout(ring, i).total,
                Access::Read,
            );
            fp.push(buffer(ring, i, BufferKind::EmfE), 0, emf.total, Access::ReadWrite);
            fp.push(buffer(ring, i, BufferKind::EmfB), 0, emf.total, Access::ReadWrite);
        }
        Stage::EmfUpdateGc => {
            let local = emf_layout(ring, i);
            let below = emf_layout(ring, link.prev);
            for kind in [BufferKind::EmfE, BufferKind::EmfB] {
                fp.push(buffer(ring, i, kind), 0, local.band, Access::ReadWrite);
                fp.push(
                    buffer(ring, link.prev, kind),
                    below.mirror_offset(),
                    local.band,
                    Access::ReadWrite,
                );
            }
        }
    }
    fp
}
