//! # Single-Target Walk
//!
//! Resolves one virtual address the way the MMU would: select the root from
//! bit 55, then for each level fetch the descriptor at
//! `table + index * 8`, classify it, and either descend, stop at a block or
//! page, or fault.

use crate::descriptor::{Descriptor, DescriptorKind, MappingSize, RawDescriptor};
use crate::enumerate::EnumerationNode;
use crate::error::{FaultReason, MemoryReadError, RegisterUnavailable, TranslationFault, WalkError};
use crate::reader::MemoryReader;
use crate::root::{Root, select_root};
use crate::sink::{NoopSink, VisitedEntry, WalkSink};
use alloc::vec::Vec;
use mmu_addresses::{Level, PhysicalAddress, TableBase, VirtualAddress};
use mmu_registers::{SystemRegister, Ttbr};

/// Outcome of a single-target walk.
///
/// The path holds one entry per level whose descriptor was read, in level
/// order. A fault on an invalid entry includes that entry; a fault on an
/// unreadable entry does not.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalkResult {
    Mapped {
        physical_address: PhysicalAddress,
        size: MappingSize,
        path: Vec<VisitedEntry>,
    },
    Fault {
        fault: TranslationFault,
        path: Vec<VisitedEntry>,
    },
}

impl WalkResult {
    #[must_use]
    pub fn path(&self) -> &[VisitedEntry] {
        match self {
            Self::Mapped { path, .. } | Self::Fault { path, .. } => path,
        }
    }

    #[must_use]
    pub const fn physical_address(&self) -> Option<PhysicalAddress> {
        match self {
            Self::Mapped {
                physical_address, ..
            } => Some(*physical_address),
            Self::Fault { .. } => None,
        }
    }

    #[must_use]
    pub const fn fault(&self) -> Option<&TranslationFault> {
        match self {
            Self::Mapped { .. } => None,
            Self::Fault { fault, .. } => Some(fault),
        }
    }

    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }

    /// The final physical address, or the fault.
    ///
    /// # Errors
    /// Returns the [`TranslationFault`] if the walk did not reach a leaf.
    pub fn into_result(self) -> Result<PhysicalAddress, TranslationFault> {
        match self {
            Self::Mapped {
                physical_address, ..
            } => Ok(physical_address),
            Self::Fault { fault, .. } => Err(fault),
        }
    }
}

/// Stage-1 table walker over a [`MemoryReader`], reporting to a [`WalkSink`].
///
/// The walker holds no state between calls besides its reader and sink.
///
/// ```rust
/// # use mmu_walk::{MemoryImage, TableWalker};
/// # use mmu_addresses::{PhysicalAddress, VirtualAddress};
/// # use mmu_registers::{SystemRegister, Ttbr};
/// // L0 table at 0x1000 pointing to an L1 table at 0x2000 holding a 1 GiB block.
/// let mut image = MemoryImage::zeroed(PhysicalAddress::new(0), 0x3000);
/// image.write_u64(PhysicalAddress::new(0x1000), 0x2003).unwrap();
/// image.write_u64(PhysicalAddress::new(0x2008), 0x4000_0401).unwrap();
///
/// let mut walker = TableWalker::new(&mut image);
/// let ttbr0 = Ttbr::from_bits(0x1000);
/// let result = walker.walk(VirtualAddress::new(0x4123_4567), ttbr0, Ttbr::new());
/// assert_eq!(result.physical_address(), Some(PhysicalAddress::new(0x4123_4567)));
/// assert_eq!(result.path().len(), 2);
/// ```
pub struct TableWalker<R, S = NoopSink> {
    reader: R,
    sink: S,
}

impl<R: MemoryReader> TableWalker<R> {
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            sink: NoopSink,
        }
    }
}

impl<R: MemoryReader, S: WalkSink> TableWalker<R, S> {
    /// Replace the sink.
    #[must_use]
    pub fn with_sink<T: WalkSink>(self, sink: T) -> TableWalker<R, T> {
        TableWalker {
            reader: self.reader,
            sink,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (R, S) {
        (self.reader, self.sink)
    }

    /// Translate `va` using explicit `TTBR0_EL1` / `TTBR1_EL1` values.
    pub fn walk(&mut self, va: VirtualAddress, ttbr0: Ttbr, ttbr1: Ttbr) -> WalkResult {
        self.walk_root(va, select_root(va, ttbr0, ttbr1))
    }

    /// Translate `va` using the translation base register that selects it.
    ///
    /// Only `TTBR0_EL1` is read for user addresses and only `TTBR1_EL1` for
    /// kernel addresses.
    ///
    /// # Errors
    /// Returns [`RegisterUnavailable`] before any memory is read if that
    /// register cannot be read.
    pub fn walk_from_registers(
        &mut self,
        va: VirtualAddress,
    ) -> Result<WalkResult, RegisterUnavailable> {
        let ttbr = self.read_ttbr(Root::of(va).register())?;
        Ok(self.walk_root(va, ttbr.table_base()))
    }

    /// Translate the program counter of the inspected context.
    ///
    /// # Errors
    /// Returns [`RegisterUnavailable`] if `PC` or its base register cannot be read.
    pub fn walk_current_pc(&mut self) -> Result<(VirtualAddress, WalkResult), RegisterUnavailable> {
        let pc = VirtualAddress::new(self.reader.read_register(SystemRegister::Pc)?);
        log::debug!("current PC is {pc}");
        let result = self.walk_from_registers(pc)?;
        Ok((pc, result))
    }

    /// Translate `va` through the reader's registers, collapsing the outcome
    /// into a physical address or an error.
    ///
    /// # Errors
    /// Returns [`WalkError`] if a base register is unavailable or the walk faults.
    pub fn translate(&mut self, va: VirtualAddress) -> Result<PhysicalAddress, WalkError> {
        let result = self.walk_from_registers(va)?;
        Ok(result.into_result()?)
    }

    pub(crate) fn read_ttbr(&mut self, register: SystemRegister) -> Result<Ttbr, RegisterUnavailable> {
        let value = self.reader.read_register(register)?;
        log::trace!("{register} = 0x{value:016X}");
        Ok(Ttbr::from_bits(value))
    }

    /// Read and decode the descriptor at `entry_address`, logging the read.
    pub(crate) fn fetch(
        &mut self,
        level: Level,
        entry_address: PhysicalAddress,
    ) -> Result<Descriptor, MemoryReadError> {
        let raw = RawDescriptor::new(self.reader.read_u64(entry_address)?);
        log::trace!("{level} read {raw} at {entry_address}");
        Ok(Descriptor::decode(raw, level))
    }

    /// Hand a visited entry to the sink, flagging anomalies.
    pub(crate) fn visit(&mut self, entry: &VisitedEntry) {
        self.sink.entry(entry);
        if let Some(anomaly) = entry.descriptor.anomaly {
            log::warn!(
                "{}: {anomaly} (raw {} at {})",
                entry.level,
                entry.raw(),
                entry.entry_address
            );
            self.sink.anomaly(entry, anomaly);
        }
    }

    pub(crate) fn report_unreadable(
        &mut self,
        level: Level,
        entry_address: PhysicalAddress,
        error: &MemoryReadError,
    ) {
        self.sink.unreadable(level, entry_address, error);
    }

    pub(crate) fn finish_enumeration(&mut self, root: &EnumerationNode) {
        self.sink.enumeration_finished(root);
    }

    fn walk_root(&mut self, va: VirtualAddress, table: TableBase) -> WalkResult {
        let root = Root::of(va);
        log::debug!("walking {va} from {} table at {table}", root.register());
        self.sink.walk_started(va, root, table);
        let result = self.walk_table(table, va);
        self.sink.walk_finished(va, &result);
        result
    }

    fn walk_table(&mut self, root: TableBase, va: VirtualAddress) -> WalkResult {
        let indices = va.indices();
        let mut path = Vec::with_capacity(Level::ALL.len());
        let mut table = root;
        let mut level = Level::L0;

        loop {
            let index = indices.at(level);
            let entry_address = table.entry_address(index);

            let descriptor = match self.fetch(level, entry_address) {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    log::debug!("{level}: cannot read entry {index} at {entry_address}: {error}");
                    self.report_unreadable(level, entry_address, &error);
                    let fault = TranslationFault {
                        level,
                        entry_address,
                        reason: FaultReason::UnreadableMemory(error),
                    };
                    return WalkResult::Fault { fault, path };
                }
            };

            let entry = VisitedEntry {
                level,
                table_base: table,
                index,
                entry_address,
                descriptor,
            };
            self.visit(&entry);
            path.push(entry);

            match (descriptor.kind, level.next()) {
                (DescriptorKind::Table, Some(next)) => {
                    log::debug!(
                        "{level}[{index}] -> {} table at {}",
                        next,
                        descriptor.output_address
                    );
                    table = TableBase::from_address(descriptor.output_address);
                    level = next;
                }
                (DescriptorKind::Block | DescriptorKind::Page, _) => {
                    if let (Some(physical_address), Some(size)) =
                        (descriptor.translate(va), descriptor.mapping_size())
                    {
                        log::debug!("{level}[{index}] {size} -> {physical_address}");
                        return WalkResult::Mapped {
                            physical_address,
                            size,
                            path,
                        };
                    }
                    return Self::invalid_entry(level, entry_address, path);
                }
                _ => {
                    log::debug!("{level}[{index}] invalid entry {}", descriptor.raw);
                    return Self::invalid_entry(level, entry_address, path);
                }
            }
        }
    }

    fn invalid_entry(
        level: Level,
        entry_address: PhysicalAddress,
        path: Vec<VisitedEntry>,
    ) -> WalkResult {
        WalkResult::Fault {
            fault: TranslationFault {
                level,
                entry_address,
                reason: FaultReason::InvalidEntry,
            },
            path,
        }
    }
}
