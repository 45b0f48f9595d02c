//! Footprint-checked buffer access for a running task.
//!
//! Every buffer a task touches is reached through a [`TaskScope`], which
//! asserts (in debug builds) that the access was declared in the task's
//! footprint. Undeclared access would let the scheduler overlap tasks
//! that actually conflict, so it is treated as a protocol violation.

use std::sync::MutexGuard;

use rowband_core::ParticleVector;
use rowband_grid::{Current, Emf};
use rowband_task::{Access, BufferKind, BufferRef, Footprint, Span, SpeciesSlot};

use crate::ring::RegionRing;
use crate::species::{SpeciesStore, FROM_ABOVE};

/// A contiguous range of a buffer, in elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Extent {
    pub offset: usize,
    pub len: usize,
}

impl Extent {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub const fn whole() -> Self {
        Self::new(0, Span::WHOLE)
    }
}

pub(crate) struct TaskScope<'a> {
    ring: &'a RegionRing,
    footprint: &'a Footprint,
}

impl<'a> TaskScope<'a> {
    pub fn new(ring: &'a RegionRing, footprint: &'a Footprint) -> Self {
        Self { ring, footprint }
    }

    /// Assert that `access` to `extent` of region `i`'s `kind` buffer was
    /// declared.
    pub fn check(&self, i: usize, kind: BufferKind, extent: Extent, access: Access) {
        let buffer = BufferRef::new(self.ring.region(i).id(), kind);
        debug_assert!(
            self.footprint
                .permits(buffer, extent.offset, extent.len, access),
            "undeclared {access:?} of {buffer} at [{}, +{})",
            extent.offset,
            extent.len
        );
    }

    pub fn current(&self, i: usize, extent: Extent, access: Access) -> MutexGuard<'a, Current> {
        self.check(i, BufferKind::Current, extent, access);
        self.ring.region(i).lock_current()
    }

    pub fn emf(&self, i: usize, extent: Extent, access: Access) -> MutexGuard<'a, Emf> {
        self.check(i, BufferKind::EmfE, extent, access);
        self.check(i, BufferKind::EmfB, extent, access);
        self.ring.region(i).lock_emf()
    }

    /// Lock the currents of region `i` and of a different region `j`,
    /// lower ring index first. Returns `(i's, j's)`.
    pub fn current_pair(
        &self,
        i: usize,
        own: Extent,
        j: usize,
        other: Extent,
        access: Access,
    ) -> (MutexGuard<'a, Current>, MutexGuard<'a, Current>) {
        debug_assert_ne!(i, j);
        if i < j {
            let a = self.current(i, own, access);
            let b = self.current(j, other, access);
            (a, b)
        } else {
            let b = self.current(j, other, access);
            let a = self.current(i, own, access);
            (a, b)
        }
    }

    /// Lock the EM fields of region `i` and of a different region `j`,
    /// lower ring index first. Returns `(i's, j's)`.
    pub fn emf_pair(
        &self,
        i: usize,
        own: Extent,
        j: usize,
        other: Extent,
        access: Access,
    ) -> (MutexGuard<'a, Emf>, MutexGuard<'a, Emf>) {
        debug_assert_ne!(i, j);
        if i < j {
            let a = self.emf(i, own, access);
            let b = self.emf(j, other, access);
            (a, b)
        } else {
            let b = self.emf(j, other, access);
            let a = self.emf(i, own, access);
            (a, b)
        }
    }

    pub fn main(&self, i: usize, species: usize, access: Access) -> MutexGuard<'a, SpeciesStore> {
        let kind = BufferKind::Species {
            species,
            slot: SpeciesSlot::Main,
        };
        self.check(i, kind, Extent::whole(), access);
        self.ring.region(i).species()[species].lock_main()
    }

    /// Lock inbox `slot` ([`FROM_BELOW`](crate::FROM_BELOW) or
    /// [`FROM_ABOVE`]) of species `species` in region `i`.
    pub fn inbox(
        &self,
        i: usize,
        species: usize,
        slot: usize,
        access: Access,
    ) -> MutexGuard<'a, ParticleVector> {
        let slot_kind = if slot == FROM_ABOVE {
            SpeciesSlot::FromAbove
        } else {
            SpeciesSlot::FromBelow
        };
        let kind = BufferKind::Species {
            species,
            slot: slot_kind,
        };
        self.check(i, kind, Extent::whole(), access);
        self.ring.region(i).species()[species].lock_inbox(slot)
    }
}
