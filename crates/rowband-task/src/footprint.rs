//! Memory footprints of tasks.
//!
//! A [`Footprint`] lists the buffer sub-ranges a task touches and how.
//! Two footprints conflict when they name the same buffer, their ranges
//! overlap, and at least one side writes; the [`TaskGraph`](crate::TaskGraph)
//! orders conflicting tasks and leaves the rest free to overlap.

use rowband_core::RegionId;
use smallvec::SmallVec;
use std::fmt;

/// How a task touches a buffer range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    /// Read only.
    Read,
    /// Write only (previous contents are not observed).
    Write,
    /// Read and write.
    ReadWrite,
}

impl Access {
    /// Whether the access observes existing contents.
    pub const fn reads(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    /// Whether the access modifies contents.
    pub const fn writes(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }

    /// Whether a declaration of `self` permits an access of `other`.
    pub const fn covers(self, other: Access) -> bool {
        (self.reads() || !other.reads()) && (self.writes() || !other.writes())
    }
}

/// Which per-species particle buffer a reference names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpeciesSlot {
    /// The main particle vector.
    Main,
    /// Inbox receiving particles from the region below.
    FromBelow,
    /// Inbox receiving particles from the region above.
    FromAbove,
}

/// Kind of region-owned buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferKind {
    /// The region's current density.
    Current,
    /// The region's electric field.
    EmfE,
    /// The region's magnetic field.
    EmfB,
    /// A particle buffer of one species.
    Species {
        /// Species index.
        species: usize,
        /// Which of the species' buffers.
        slot: SpeciesSlot,
    },
}

/// A buffer owned by a specific region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferRef {
    /// Owning region.
    pub region: RegionId,
    /// Which buffer.
    pub kind: BufferKind,
}

impl BufferRef {
    /// Construct a reference.
    pub const fn new(region: RegionId, kind: BufferKind) -> Self {
        Self { region, kind }
    }
}

impl fmt::Display for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region {} ", self.region)?;
        match self.kind {
            BufferKind::Current => f.write_str("current"),
            BufferKind::EmfE => f.write_str("E"),
            BufferKind::EmfB => f.write_str("B"),
            BufferKind::Species { species, slot } => write!(f, "species {species} {slot:?}"),
        }
    }
}

/// One declared range: `len` cells of `buffer` starting at `offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    /// Target buffer.
    pub buffer: BufferRef,
    /// First element, in buffer elements.
    pub offset: usize,
    /// Element count. [`Span::WHOLE`] covers the buffer regardless of size.
    pub len: usize,
    /// Access mode.
    pub access: Access,
}

impl Span {
    /// Length that covers a buffer of any size (particle buffers grow).
    pub const WHOLE: usize = usize::MAX;

    fn end(&self) -> usize {
        self.offset.saturating_add(self.len)
    }

    fn overlaps(&self, offset: usize, len: usize) -> bool {
        self.offset < offset.saturating_add(len) && offset < self.end()
    }

    fn contains(&self, offset: usize, len: usize) -> bool {
        self.offset <= offset && offset.saturating_add(len) <= self.end()
    }

    /// Whether the two spans order their tasks.
    pub fn conflicts_with(&self, other: &Span) -> bool {
        self.buffer == other.buffer
            && (self.access.writes() || other.access.writes())
            && self.len > 0
            && other.len > 0
            && self.overlaps(other.offset, other.len)
    }
}

/// The set of buffer ranges one task may touch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Footprint {
    spans: SmallVec<[Span; 8]>,
}

impl Footprint {
    /// An empty footprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `len` elements of `buffer` from `offset`.
    pub fn with(mut self, buffer: BufferRef, offset: usize, len: usize, access: Access) -> Self {
        self.push(buffer, offset, len, access);
        self
    }

    /// Declare a whole buffer.
    pub fn with_whole(self, buffer: BufferRef, access: Access) -> Self {
        self.with(buffer, 0, Span::WHOLE, access)
    }

    /// Append a declaration.
    pub fn push(&mut self, buffer: BufferRef, offset: usize, len: usize, access: Access) {
        self.spans.push(Span {
            buffer,
            offset,
            len,
            access,
        });
    }

    /// Declared spans in declaration order.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Number of declared spans.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Whether any span of `self` conflicts with any span of `other`.
    pub fn conflicts_with(&self, other: &Footprint) -> bool {
        self.spans
            .iter()
            .any(|a| other.spans.iter().any(|b| a.conflicts_with(b)))
    }

    /// Whether an access of `access` to `[offset, offset + len)` of
    /// `buffer` was declared.
    ///
    /// A single span must contain the whole range.
    pub fn permits(&self, buffer: BufferRef, offset: usize, len: usize, access: Access) -> bool {
        self.spans.iter().any(|s| {
            s.buffer == buffer && s.access.covers(access) && s.contains(offset, len)
        })
    }

    /// Whether the footprint names `buffer` at all.
    pub fn touches(&self, buffer: BufferRef) -> bool {
        self.spans.iter().any(|s| s.buffer == buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(region: u32) -> BufferRef {
        BufferRef::new(RegionId(region), BufferKind::Current)
    }

    #[test]
    fn access_coverage() {
        assert!(Access::ReadWrite.covers(Access::Read));
        assert!(Access::ReadWrite.covers(Access::Write));
        assert!(!Access::Read.covers(Access::Write));
        assert!(!Access::Write.covers(Access::ReadWrite));
        assert!(Access::Write.covers(Access::Write));
    }

    #[test]
    fn reads_never_conflict() {
        let a = Footprint::new().with(current(0), 0, 10, Access::Read);
        let b = Footprint::new().with(current(0), 5, 10, Access::Read);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn overlapping_write_conflicts() {
        let a = Footprint::new().with(current(0), 0, 10, Access::Read);
        let b = Footprint::new().with(current(0), 9, 10, Access::Write);
        assert!(a.conflicts_with(&b));
        assert!(b.conflicts_with(&a));
    }

    #[test]
    fn adjacent_ranges_do_not_conflict() {
        let a = Footprint::new().with(current(0), 0, 10, Access::ReadWrite);
        let b = Footprint::new().with(current(0), 10, 10, Access::ReadWrite);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn different_regions_do_not_conflict() {
        let a = Footprint::new().with_whole(current(0), Access::Write);
        let b = Footprint::new().with_whole(current(1), Access::Write);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn whole_span_conflicts_with_any_range() {
        let a = Footprint::new().with_whole(current(2), Access::Write);
        let b = Footprint::new().with(current(2), 1_000_000, 1, Access::Read);
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn permits_requires_containment_and_mode() {
        let fp = Footprint::new().with(current(1), 10, 20, Access::ReadWrite);
        assert!(fp.permits(current(1), 10, 20, Access::Write));
        assert!(fp.permits(current(1), 15, 5, Access::Read));
        assert!(!fp.permits(current(1), 5, 10, Access::Read));
        assert!(!fp.permits(current(1), 25, 10, Access::Read));
        assert!(!fp.permits(current(0), 10, 5, Access::Read));

        let ro = Footprint::new().with_whole(current(1), Access::Read);
        assert!(!ro.permits(current(1), 0, 1, Access::Write));
    }
}
