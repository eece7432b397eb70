#![allow(dead_code)]

use mmu_addresses::{Level, PhysicalAddress, VirtualAddress};
use mmu_walk::{
    DescriptorAnomaly, DescriptorKind, EnumerationNode, MemoryImage, MemoryReadError,
    RawDescriptor, VisitedEntry, WalkResult, WalkSink,
};

pub const L0_TABLE: u64 = 0x1000;
pub const L1_TABLE: u64 = 0x2000;
pub const L2_TABLE: u64 = 0x3000;
pub const L3_TABLE: u64 = 0x4000;

/// 1 MiB of zeroed (all-invalid) memory at physical address 0.
pub fn image() -> MemoryImage {
    MemoryImage::zeroed(PhysicalAddress::new(0), 0x10_0000)
}

pub fn put(image: &mut MemoryImage, table: u64, index: u16, raw: u64) {
    image
        .write_u64(PhysicalAddress::new(table + u64::from(index) * 8), raw)
        .expect("fixture entry lies inside the image");
}

pub const fn table(next: u64) -> u64 {
    next | 0b11
}

/// Page with AF, inner-shareable, read-write at all levels.
pub const fn page(pa: u64) -> u64 {
    pa | 0x743
}

/// Block with AF, inner-shareable, read-write at all levels.
pub const fn block(pa: u64) -> u64 {
    pa | 0x741
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Entry(Level, PhysicalAddress, RawDescriptor, DescriptorKind),
    Anomaly(Level, DescriptorAnomaly),
    Unreadable(Level, PhysicalAddress),
    WalkFinished(VirtualAddress, bool),
    EnumerationFinished(Level, usize),
}

/// Sink recording everything it is told, in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn entries(&self) -> Vec<(Level, PhysicalAddress)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Entry(level, address, ..) => Some((*level, *address)),
                _ => None,
            })
            .collect()
    }
}

impl WalkSink for Recorder {
    fn entry(&mut self, entry: &VisitedEntry) {
        self.events.push(Event::Entry(
            entry.level,
            entry.entry_address,
            entry.raw(),
            entry.descriptor.kind,
        ));
    }

    fn anomaly(&mut self, entry: &VisitedEntry, anomaly: DescriptorAnomaly) {
        self.events.push(Event::Anomaly(entry.level, anomaly));
    }

    fn unreadable(&mut self, level: Level, entry_address: PhysicalAddress, _error: &MemoryReadError) {
        self.events.push(Event::Unreadable(level, entry_address));
    }

    fn walk_finished(&mut self, va: VirtualAddress, result: &WalkResult) {
        self.events.push(Event::WalkFinished(va, result.is_mapped()));
    }

    fn enumeration_finished(&mut self, root: &EnumerationNode) {
        self.events
            .push(Event::EnumerationFinished(root.level, root.total_entries()));
    }
}
