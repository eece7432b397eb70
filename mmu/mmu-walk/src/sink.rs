use crate::descriptor::{Descriptor, DescriptorAnomaly, RawDescriptor};
use crate::enumerate::EnumerationNode;
use crate::error::MemoryReadError;
use crate::root::Root;
use crate::walker::WalkResult;
use mmu_addresses::{Level, PhysicalAddress, TableBase, TableIndex, VirtualAddress};

/// One descriptor that was read and decoded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VisitedEntry {
    pub level: Level,
    pub table_base: TableBase,
    pub index: TableIndex,
    pub entry_address: PhysicalAddress,
    pub descriptor: Descriptor,
}

impl VisitedEntry {
    #[inline]
    #[must_use]
    pub const fn raw(&self) -> RawDescriptor {
        self.descriptor.raw
    }
}

/// Observer of a walk or enumeration.
///
/// Entries arrive in visiting order: levels 0 to 3 along each path, indices
/// ascending within a table, each entry exactly once. All methods default to
/// doing nothing.
pub trait WalkSink {
    /// A single-target walk for `va` resolved its root and is about to read
    /// the level-0 table at `table`.
    fn walk_started(&mut self, _va: VirtualAddress, _root: Root, _table: TableBase) {}

    /// A descriptor was read and decoded; invalid entries of a single-target
    /// walk are reported too.
    fn entry(&mut self, _entry: &VisitedEntry) {}

    /// A visited descriptor uses an encoding that was decoded leniently.
    fn anomaly(&mut self, _entry: &VisitedEntry, _anomaly: DescriptorAnomaly) {}

    /// The descriptor at `entry_address` could not be read.
    fn unreadable(&mut self, _level: Level, _entry_address: PhysicalAddress, _error: &MemoryReadError) {}

    /// A single-target walk for `va` ended.
    fn walk_finished(&mut self, _va: VirtualAddress, _result: &WalkResult) {}

    /// An enumeration ended; `root` is the outermost table enumerated.
    fn enumeration_finished(&mut self, _root: &EnumerationNode) {}
}

/// A sink that ignores everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSink;

impl WalkSink for NoopSink {}

impl<T: WalkSink + ?Sized> WalkSink for &mut T {
    fn walk_started(&mut self, va: VirtualAddress, root: Root, table: TableBase) {
        (**self).walk_started(va, root, table);
    }

    fn entry(&mut self, entry: &VisitedEntry) {
        (**self).entry(entry);
    }

    fn anomaly(&mut self, entry: &VisitedEntry, anomaly: DescriptorAnomaly) {
        (**self).anomaly(entry, anomaly);
    }

    fn unreadable(&mut self, level: Level, entry_address: PhysicalAddress, error: &MemoryReadError) {
        (**self).unreadable(level, entry_address, error);
    }

    fn walk_finished(&mut self, va: VirtualAddress, result: &WalkResult) {
        (**self).walk_finished(va, result);
    }

    fn enumeration_finished(&mut self, root: &EnumerationNode) {
        (**self).enumeration_finished(root);
    }
}
