//! # Bounded Enumeration
//!
//! Walks whole tables instead of a single path. Every valid entry of a table
//! is recorded, tables are descended into, and each table stops after
//! [`EnumerationLimits::max_entries_per_table`] recorded entries. The limit is
//! passed down by value, so every table gets its own budget.
//!
//! With a target address only the entry on that address's path is read at
//! each level, and no limit applies.

use crate::descriptor::{Descriptor, DescriptorKind};
use crate::error::{MemoryReadError, RegisterUnavailable};
use crate::reader::MemoryReader;
use crate::root::Root;
use crate::sink::{VisitedEntry, WalkSink};
use crate::walker::TableWalker;
use alloc::boxed::Box;
use alloc::vec::Vec;
use mmu_addresses::{
    ENTRIES_PER_TABLE, Level, PhysicalAddress, TableBase, TableIndex, VirtualAddress,
};

/// How much of each table an enumeration records.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EnumerationLimits {
    /// Entries recorded per table before it is cut off.
    pub max_entries_per_table: usize,
}

impl EnumerationLimits {
    pub const DEFAULT_MAX_ENTRIES_PER_TABLE: usize = 10;

    /// Record every valid entry.
    pub const UNLIMITED: Self = Self::new(512);

    #[must_use]
    pub const fn new(max_entries_per_table: usize) -> Self {
        Self {
            max_entries_per_table,
        }
    }
}

impl Default for EnumerationLimits {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ENTRIES_PER_TABLE)
    }
}

/// Marks a table whose enumeration stopped at the entry limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Truncation {
    /// Entries recorded before stopping.
    pub emitted: usize,
    /// First index that was not examined.
    pub resume_index: TableIndex,
}

/// What was found at an enumerated slot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EntryContent {
    /// The descriptor could not be read.
    Unreadable(MemoryReadError),
    /// A block or page.
    Leaf(Descriptor),
    /// A table descriptor and the enumeration of the table it points to.
    Table {
        descriptor: Descriptor,
        next: Box<EnumerationNode>,
    },
}

/// One recorded slot of an enumerated table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumeratedEntry {
    pub index: TableIndex,
    pub entry_address: PhysicalAddress,
    /// First address covered by this entry; sign-extended if bit 47 is set.
    pub virtual_address: VirtualAddress,
    pub content: EntryContent,
}

impl EnumeratedEntry {
    /// The decoded descriptor, unless the entry was unreadable.
    #[must_use]
    pub const fn descriptor(&self) -> Option<&Descriptor> {
        match &self.content {
            EntryContent::Unreadable(_) => None,
            EntryContent::Leaf(descriptor) | EntryContent::Table { descriptor, .. } => {
                Some(descriptor)
            }
        }
    }

    /// The enumerated next-level table, if this entry is a table.
    #[must_use]
    pub fn next_table(&self) -> Option<&EnumerationNode> {
        match &self.content {
            EntryContent::Table { next, .. } => Some(next),
            _ => None,
        }
    }
}

/// One enumerated table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumerationNode {
    pub level: Level,
    pub table_base: TableBase,
    /// Virtual address bits fixed by the entries above this table.
    pub virtual_prefix: VirtualAddress,
    /// Recorded entries in ascending index order; invalid slots are omitted.
    pub entries: Vec<EnumeratedEntry>,
    pub truncated: Option<Truncation>,
}

impl EnumerationNode {
    /// Entries recorded in this table and every table below it.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| 1 + entry.next_table().map_or(0, Self::total_entries))
            .sum()
    }

    /// Deepest level reached below (and including) this table.
    #[must_use]
    pub fn deepest_level(&self) -> Level {
        self.entries
            .iter()
            .filter_map(EnumeratedEntry::next_table)
            .map(Self::deepest_level)
            .max()
            .unwrap_or(self.level)
    }
}

/// Enumerations of both halves of the address space.
///
/// A half is `None` if its base register could not be read.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AddressSpaceDump {
    pub user: Option<EnumerationNode>,
    pub kernel: Option<EnumerationNode>,
}

impl<R: MemoryReader, S: WalkSink> TableWalker<R, S> {
    /// Enumerate the table at `table_base`, read as a `level` table whose
    /// entries extend `virtual_prefix`.
    ///
    /// With `target`, only the entry on `target`'s path is read at each
    /// level and `limits` is ignored.
    pub fn enumerate(
        &mut self,
        table_base: TableBase,
        virtual_prefix: VirtualAddress,
        level: Level,
        target: Option<VirtualAddress>,
        limits: EnumerationLimits,
    ) -> EnumerationNode {
        let node = self.enumerate_table(table_base, virtual_prefix, level, target, limits);
        self.finish_enumeration(&node);
        node
    }

    /// Enumerate the path of `va` from the reader's base register.
    ///
    /// # Errors
    /// Returns [`RegisterUnavailable`] if the base register for `va` cannot be read.
    pub fn trace(&mut self, va: VirtualAddress) -> Result<EnumerationNode, RegisterUnavailable> {
        let root = Root::of(va);
        let ttbr = self.read_ttbr(root.register())?;
        Ok(self.enumerate(
            ttbr.table_base(),
            root.prefix(),
            Level::L0,
            Some(va),
            EnumerationLimits::UNLIMITED,
        ))
    }

    /// Enumerate the `TTBR0_EL1` tree (prefix 0) and the `TTBR1_EL1` tree
    /// (prefix `0xFFFF_0000_0000_0000`).
    pub fn dump_address_spaces(&mut self, limits: EnumerationLimits) -> AddressSpaceDump {
        AddressSpaceDump {
            user: self.dump_root(Root::Ttbr0, limits),
            kernel: self.dump_root(Root::Ttbr1, limits),
        }
    }

    fn dump_root(&mut self, root: Root, limits: EnumerationLimits) -> Option<EnumerationNode> {
        match self.read_ttbr(root.register()) {
            Ok(ttbr) => Some(self.enumerate(ttbr.table_base(), root.prefix(), Level::L0, None, limits)),
            Err(err) => {
                log::warn!("skipping {} tree: {err}", root.register());
                None
            }
        }
    }

    fn enumerate_table(
        &mut self,
        table_base: TableBase,
        virtual_prefix: VirtualAddress,
        level: Level,
        target: Option<VirtualAddress>,
        limits: EnumerationLimits,
    ) -> EnumerationNode {
        let (first, end) = match target {
            Some(va) => {
                let index = va.index(level).as_u16();
                (index, index + 1)
            }
            None => (0, ENTRIES_PER_TABLE),
        };

        log::debug!(
            "{level}: enumerating {} table at {table_base} for prefix {virtual_prefix}",
            level.table_name()
        );

        let mut entries = Vec::new();
        let mut truncated = None;

        for index in (first..end).map(TableIndex::new) {
            if target.is_none() && entries.len() >= limits.max_entries_per_table {
                log::debug!("{level}: stopping at index {index} after {} entries", entries.len());
                truncated = Some(Truncation {
                    emitted: entries.len(),
                    resume_index: index,
                });
                break;
            }

            let entry_address = table_base.entry_address(index);
            let child_prefix = virtual_prefix.with_index(level, index);
            let virtual_address = child_prefix.sign_extended();

            let descriptor = match self.fetch(level, entry_address) {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    log::warn!("{level}[{index}]: unreadable entry at {entry_address}: {error}");
                    self.report_unreadable(level, entry_address, &error);
                    entries.push(EnumeratedEntry {
                        index,
                        entry_address,
                        virtual_address,
                        content: EntryContent::Unreadable(error),
                    });
                    continue;
                }
            };

            if !descriptor.is_valid() {
                continue;
            }

            self.visit(&VisitedEntry {
                level,
                table_base,
                index,
                entry_address,
                descriptor,
            });

            let content = match (descriptor.kind, level.next()) {
                (DescriptorKind::Table, Some(next_level)) => {
                    let next = self.enumerate_table(
                        TableBase::from_address(descriptor.output_address),
                        child_prefix,
                        next_level,
                        target,
                        limits,
                    );
                    EntryContent::Table {
                        descriptor,
                        next: Box::new(next),
                    }
                }
                _ => EntryContent::Leaf(descriptor),
            };

            entries.push(EnumeratedEntry {
                index,
                entry_address,
                virtual_address,
                content,
            });
        }

        EnumerationNode {
            level,
            table_base,
            virtual_prefix,
            entries,
            truncated,
        }
    }
}
