//! Text rendering of walks, enumerations and register snapshots.

use mmu_addresses::{Level, PhysicalAddress, TableBase, VirtualAddress};
use mmu_registers::{MairEl1, SystemRegister};
use mmu_walk::{
    Descriptor, DescriptorAnomaly, DescriptorKind, EntryContent, EnumerationNode, MemoryReadError,
    RegisterSnapshot, Root, VisitedEntry, WalkResult, WalkSink, describe,
};
use std::io::{self, Write};

/// Prints each step of a single-target walk as it happens, then the outcome.
///
/// Write errors are kept and returned by [`WalkReport::finish`].
pub struct WalkReport<W: Write> {
    out: W,
    mair: Option<MairEl1>,
    error: Option<io::Error>,
}

impl<W: Write> WalkReport<W> {
    pub const fn new(out: W, mair: Option<MairEl1>) -> Self {
        Self {
            out,
            mair,
            error: None,
        }
    }

    /// # Errors
    /// Returns the first write error seen while reporting.
    pub fn finish(self) -> io::Result<()> {
        self.error.map_or(Ok(()), Err)
    }

    fn emit(&mut self, f: impl FnOnce(&mut W, Option<MairEl1>) -> io::Result<()>) {
        if self.error.is_none()
            && let Err(err) = f(&mut self.out, self.mair)
        {
            self.error = Some(err);
        }
    }
}

impl<W: Write> WalkSink for WalkReport<W> {
    fn walk_started(&mut self, va: VirtualAddress, root: Root, table: TableBase) {
        self.emit(|out, _| writeln!(out, "{va} via {}, root {table}", root.register()));
    }

    fn entry(&mut self, entry: &VisitedEntry) {
        self.emit(|out, mair| write_step(out, entry, mair));
    }

    fn anomaly(&mut self, _entry: &VisitedEntry, anomaly: DescriptorAnomaly) {
        self.emit(|out, _| writeln!(out, "      ! {anomaly}"));
    }

    fn unreadable(&mut self, level: Level, entry_address: PhysicalAddress, error: &MemoryReadError) {
        self.emit(|out, _| {
            writeln!(
                out,
                "  {level} {} @ {entry_address}: unreadable ({error})",
                level.table_name()
            )
        });
    }

    fn walk_finished(&mut self, va: VirtualAddress, result: &WalkResult) {
        self.emit(|out, _| write_outcome(out, va, result));
    }
}

/// Prints the tree of every finished enumeration.
pub struct TreeReport<W: Write> {
    out: W,
    mair: Option<MairEl1>,
    error: Option<io::Error>,
}

impl<W: Write> TreeReport<W> {
    pub const fn new(out: W, mair: Option<MairEl1>) -> Self {
        Self {
            out,
            mair,
            error: None,
        }
    }

    /// # Errors
    /// Returns the first write error seen while reporting.
    pub fn finish(self) -> io::Result<()> {
        self.error.map_or(Ok(()), Err)
    }
}

impl<W: Write> WalkSink for TreeReport<W> {
    fn enumeration_finished(&mut self, root: &EnumerationNode) {
        if self.error.is_some() {
            return;
        }
        let written = write_title(&mut self.out, root)
            .and_then(|()| write_tree(&mut self.out, root, self.mair));
        if let Err(err) = written {
            self.error = Some(err);
        }
    }
}

/// One line per visited entry, plus a permission line for leaves.
pub fn write_step<W: Write>(
    out: &mut W,
    entry: &VisitedEntry,
    mair: Option<MairEl1>,
) -> io::Result<()> {
    write!(
        out,
        "  {} {}[{:>3}] @ {} = {}  ",
        entry.level,
        entry.level.table_name(),
        entry.index,
        entry.entry_address,
        entry.raw()
    )?;
    write_descriptor(out, &entry.descriptor, "      ", mair)
}

pub fn write_outcome<W: Write>(
    out: &mut W,
    va: VirtualAddress,
    result: &WalkResult,
) -> io::Result<()> {
    match result {
        WalkResult::Mapped {
            physical_address,
            size,
            ..
        } => writeln!(out, "  => {va} maps to {physical_address} ({size})"),
        WalkResult::Fault { fault, .. } => writeln!(out, "  => {va} is not mapped: {fault}"),
    }
}

/// Result of reading a few bytes at the translated address.
pub fn write_verification<W: Write>(
    out: &mut W,
    physical_address: PhysicalAddress,
    read: Result<&[u8], MemoryReadError>,
) -> io::Result<()> {
    match read {
        Ok(bytes) => {
            write!(out, "  verify: {} bytes at {physical_address}:", bytes.len())?;
            for byte in bytes {
                write!(out, " {byte:02x}")?;
            }
            writeln!(out)
        }
        Err(err) => writeln!(out, "  verify: cannot read {physical_address}: {err}"),
    }
}

fn write_title<W: Write>(out: &mut W, root: &EnumerationNode) -> io::Result<()> {
    if root.level != Level::L0 {
        return writeln!(out, "{} table at {}", root.level, root.table_base);
    }
    let (register, half) = if root.virtual_prefix.is_kernel() {
        (Root::Ttbr1.register(), "kernel")
    } else {
        (Root::Ttbr0.register(), "user")
    };
    writeln!(out, "{register} ({half} space), root {}", root.table_base)
}

/// Indented listing of `node` and every table below it.
pub fn write_tree<W: Write>(
    out: &mut W,
    node: &EnumerationNode,
    mair: Option<MairEl1>,
) -> io::Result<()> {
    let indent = "  ".repeat(usize::from(node.level.as_u8()) + 1);
    writeln!(
        out,
        "{indent}{} {} @ {}",
        node.level,
        node.level.table_name(),
        node.table_base
    )?;

    for entry in &node.entries {
        write!(
            out,
            "{indent}  [{:>3}] {} ({})  ",
            entry.index,
            entry.virtual_address,
            node.level.span_label()
        )?;
        match &entry.content {
            EntryContent::Unreadable(err) => {
                writeln!(out, "unreadable at {}: {err}", entry.entry_address)?;
            }
            EntryContent::Leaf(descriptor) => {
                write_descriptor(out, descriptor, &format!("{indent}        "), mair)?;
            }
            EntryContent::Table { descriptor, next } => {
                write_descriptor(out, descriptor, "", mair)?;
                write_tree(out, next, mair)?;
            }
        }
    }

    match node.truncated {
        Some(truncation) => writeln!(
            out,
            "{indent}  ... stopped after {} entries, next index {}",
            truncation.emitted, truncation.resume_index
        ),
        None if node.entries.is_empty() => writeln!(out, "{indent}  (no valid entries)"),
        None => Ok(()),
    }
}

/// Kind and target of a descriptor; leaves get a second line with their
/// permissions, prefixed by `indent`.
fn write_descriptor<W: Write>(
    out: &mut W,
    descriptor: &Descriptor,
    indent: &str,
    mair: Option<MairEl1>,
) -> io::Result<()> {
    match descriptor.kind {
        DescriptorKind::Invalid => writeln!(out, "invalid"),
        DescriptorKind::Table => writeln!(out, "table -> {}", descriptor.output_address),
        DescriptorKind::Block | DescriptorKind::Page => {
            match descriptor.mapping_size() {
                Some(size) => writeln!(out, "{size} -> {}", descriptor.output_address)?,
                None => writeln!(out, "{} -> {}", descriptor.kind, descriptor.output_address)?,
            }
            let summary = describe(descriptor);
            write!(out, "{indent}{summary}")?;
            match mair.and_then(|mair| summary.memory_type(mair)) {
                Some(memory_type) => writeln!(out, " ({memory_type})"),
                None => writeln!(out),
            }
        }
    }
}

/// Register listing with decoded TCR, SCTLR and MAIR fields.
pub fn write_registers<W: Write>(out: &mut W, snapshot: &RegisterSnapshot) -> io::Result<()> {
    for register in SystemRegister::ALL {
        match snapshot.raw(register) {
            Some(value) => writeln!(
                out,
                "{:<10} 0x{value:016X}  {}",
                register.name(),
                register.description()
            )?,
            None => writeln!(
                out,
                "{:<10} unavailable         {}",
                register.name(),
                register.description()
            )?,
        }
    }

    for (name, ttbr) in [("TTBR0", snapshot.ttbr0), ("TTBR1", snapshot.ttbr1)] {
        if let Some(ttbr) = ttbr {
            writeln!(
                out,
                "{name}: root table {}, ASID {}",
                ttbr.table_base(),
                ttbr.asid()
            )?;
        }
    }

    if let Some(tcr) = snapshot.tcr {
        let regions = [
            ("TTBR0", tcr.va_bits0(), tcr.granule0(), tcr.epd0()),
            ("TTBR1", tcr.va_bits1(), tcr.granule1(), tcr.epd1()),
        ];
        for (name, va_bits, granule, walks_disabled) in regions {
            write!(out, "{name} region: {va_bits}-bit VA, ")?;
            match granule {
                Some(granule) => write!(out, "{granule} granule")?,
                None => write!(out, "reserved granule")?,
            }
            if walks_disabled {
                write!(out, ", walks disabled")?;
            }
            writeln!(out)?;
        }
        match tcr.physical_address_bits() {
            Some(bits) => writeln!(out, "physical address size: {bits} bits")?,
            None => writeln!(out, "physical address size: reserved IPS {}", tcr.ips())?,
        }
    }

    if let Some(sctlr) = snapshot.sctlr {
        let on_off = |bit: bool| if bit { "on" } else { "off" };
        writeln!(
            out,
            "MMU {}, D-cache {}, I-cache {}, WXN {}, {}-endian walks",
            if sctlr.mmu_enabled() {
                "enabled"
            } else {
                "disabled"
            },
            on_off(sctlr.data_cache()),
            on_off(sctlr.instruction_cache()),
            on_off(sctlr.write_implies_xn()),
            if sctlr.big_endian() { "big" } else { "little" }
        )?;
    }

    if let Some(el) = snapshot.exception_level() {
        writeln!(out, "running at EL{el}")?;
    }

    if let Some(mair) = snapshot.mair {
        for index in 0..8 {
            if let (Some(attr), Some(memory_type)) =
                (mair.attribute(index), mair.memory_type(index))
            {
                writeln!(out, "Attr{index}: 0x{attr:02X} {memory_type}")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmu_registers::Ttbr;
    use mmu_walk::{EnumerationLimits, MemoryImage, TableWalker};

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    /// L0 @ 0x1000 -> L1 @ 0x2000 -> L2 @ 0x3000 -> L3 @ 0x4000, with the
    /// page for VA 0x0820_195C at PA 0x4100_0000.
    fn image() -> MemoryImage {
        let mut image = MemoryImage::zeroed(PhysicalAddress::new(0), 0x1_0000)
            .with_register(SystemRegister::Ttbr0El1, 0x1000)
            .with_register(SystemRegister::Ttbr1El1, 0x1000);
        image.write_u64(PhysicalAddress::new(0x1000), 0x2003).unwrap();
        image.write_u64(PhysicalAddress::new(0x2000), 0x3003).unwrap();
        image
            .write_u64(PhysicalAddress::new(0x3000 + 65 * 8), 0x4003)
            .unwrap();
        image
            .write_u64(PhysicalAddress::new(0x4000 + 8), 0x0040_0000_4100_0743)
            .unwrap();
        image
    }

    #[test]
    fn walk_report_lists_every_level() {
        let mut image = image();
        let mair = Some(MairEl1::from_bits(0x0000_0000_0000_FF00));
        let mut walker = TableWalker::new(&mut image).with_sink(WalkReport::new(Vec::new(), mair));
        let result = walker
            .walk_from_registers(VirtualAddress::new(0x0820_195C))
            .unwrap();
        assert!(result.is_mapped());

        let (_, report) = walker.into_parts();
        let WalkReport { out, error, .. } = report;
        assert!(error.is_none());
        let out = text(out);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 7, "{out}");
        assert_eq!(
            lines[0],
            "0x000000000820195C via TTBR0_EL1, root 0x0000000000001000"
        );
        assert!(lines[1].starts_with("  L0 PGD[  0] @ 0x0000000000001000"));
        assert!(lines[1].ends_with("table -> 0x0000000000002000"));
        assert!(lines[3].starts_with("  L2 PMD[ 65]"));
        assert!(lines[4].starts_with("  L3 PTE[  1]"));
        assert!(lines[4].ends_with("4 KiB page -> 0x0000000041000000"));
        assert_eq!(
            lines[5],
            "      read-write at all levels, not executable, privileged executable, accessed, inner-shareable, AttrIndx 0 (Device-nGnRnE)"
        );
        assert!(lines[6].contains("maps to 0x000000004100095C (4 KiB page)"));
    }

    #[test]
    fn walk_report_is_silent_without_a_root() {
        let mut image = MemoryImage::zeroed(PhysicalAddress::new(0), 0x1000);
        let mut walker = TableWalker::new(&mut image).with_sink(WalkReport::new(Vec::new(), None));
        let err = walker
            .walk_from_registers(VirtualAddress::new(0xFFFF_0000_0000_1000))
            .unwrap_err();
        assert_eq!(err.register, SystemRegister::Ttbr1El1);

        let (_, report) = walker.into_parts();
        assert!(report.out.is_empty(), "{}", text(report.out));
    }

    #[test]
    fn walk_report_shows_fault() {
        let mut image = image();
        let mut walker = TableWalker::new(&mut image).with_sink(WalkReport::new(Vec::new(), None));
        walker.walk(
            VirtualAddress::new(0x0820_295C),
            Ttbr::from_bits(0x1000),
            Ttbr::new(),
        );
        let (_, report) = walker.into_parts();
        let out = text(report.out);
        assert!(out.lines().last().unwrap().contains("is not mapped"), "{out}");
        assert!(out.contains("invalid"));
    }

    #[test]
    fn tree_report_marks_truncation() {
        let mut image = image();
        for index in 1..4_u64 {
            image
                .write_u64(PhysicalAddress::new(0x2000 + index * 8), 0x4000_0401)
                .unwrap();
        }

        let mut walker = TableWalker::new(&mut image).with_sink(TreeReport::new(Vec::new(), None));
        walker.dump_address_spaces(EnumerationLimits::new(2));
        let (_, report) = walker.into_parts();
        let out = text(report.out);

        assert!(out.starts_with("TTBR0_EL1 (user space), root 0x0000000000001000\n"), "{out}");
        assert!(out.contains("TTBR1_EL1 (kernel space)"));
        assert!(out.contains("[  1] 0x0000000040000000 (1 GiB)  1 GiB block -> 0x0000000040000000"));
        assert!(out.contains("... stopped after 2 entries, next index 2"));
        assert!(out.contains("[  0] 0xFFFF000000000000 (512 GiB)"));
    }

    #[test]
    fn verification_bytes() {
        let mut out = Vec::new();
        write_verification(&mut out, PhysicalAddress::new(0x1000), Ok(&[0xDE, 0xAD, 0xBE, 0xEF][..]))
            .unwrap();
        assert_eq!(
            text(out),
            "  verify: 4 bytes at 0x0000000000001000: de ad be ef\n"
        );
    }

    #[test]
    fn registers_listing() {
        let snapshot = RegisterSnapshot {
            ttbr0: Some(Ttbr::from_bits(0x0001_0000_4008_0000)),
            tcr: Some(mmu_registers::TcrEl1::from_bits(0x0000_0032_B511_3510)),
            sctlr: Some(mmu_registers::SctlrEl1::from_bits(0x3450_1805)),
            mair: Some(MairEl1::from_bits(0x0000_0000_0000_FF00)),
            sp: Some(VirtualAddress::new(0xFFFF_8000_0010_0000)),
            current_el: Some(mmu_registers::CurrentEl::from_bits(0b0100)),
            ..RegisterSnapshot::default()
        };
        let mut out = Vec::new();
        write_registers(&mut out, &snapshot).unwrap();
        let out = text(out);

        assert!(out.contains("PC         unavailable"), "{out}");
        assert!(out.contains("SP         0xFFFF800000100000  stack pointer"));
        assert!(out.contains("CurrentEL  0x0000000000000004  current exception level"));
        assert!(out.contains("running at EL1\n"));
        assert!(out.contains("TTBR0_EL1  0x0001000040080000  user page table base"));
        assert!(out.contains("TTBR0: root table 0x0000000040080000, ASID 1"));
        assert!(out.contains("TTBR0 region: 48-bit VA, 4KB granule\n"));
        assert!(out.contains("TTBR1 region: 47-bit VA, 4KB granule\n"));
        assert!(out.contains("physical address size: 40 bits"));
        assert!(out.contains("MMU enabled, D-cache on, I-cache on, WXN off, little-endian walks"));
        assert!(out.contains("Attr0: 0x00 Device-nGnRnE"));
        assert!(out.contains("Attr1: 0xFF Normal write-back"));
    }
}
