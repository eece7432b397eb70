//! # VMSAv8-64 Stage-1 Descriptors (4 KiB granule)
//!
//! A descriptor is one 64-bit entry of a translation table. Bits `[1:0]`
//! decide what it is; the meaning of bit 1 depends on the lookup level:
//!
//! | Level | `valid=0` | `valid=1, type=0` | `valid=1, type=1` |
//! |:------|:----------|:------------------|:------------------|
//! | 0 | invalid | *reserved*, treated as table (anomaly) | table |
//! | 1 | invalid | 1 GiB block | table |
//! | 2 | invalid | 2 MiB block | table |
//! | 3 | invalid | *reserved*, treated as page (anomaly) | 4 KiB page |
//!
//! The raw layouts are available as [`TableDescriptor`] and
//! [`LeafDescriptor`] bitfield views. [`Descriptor::decode`] combines them
//! with the level into a classified [`Descriptor`].

use bitfield_struct::bitfield;
use core::fmt;
use mmu_addresses::{
    Level, PhysicalAddress, Size1G, Size2M, Size4K, TABLE_ADDRESS_MASK,
    VirtualAddress,
};

/// An undecoded 64-bit translation table entry.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct RawDescriptor(u64);

impl RawDescriptor {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Bit 0.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 & 1 != 0
    }

    /// Bit 1: table/page when set, block (levels 1–2) when clear.
    #[inline]
    #[must_use]
    pub const fn type_bit(self) -> bool {
        self.0 & 0b10 != 0
    }
}

impl fmt::Debug for RawDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawDescriptor(0x{:016X})", self.0)
    }
}

impl fmt::Display for RawDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for RawDescriptor {
    #[inline]
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Table descriptor layout (levels 0–2, `type = 1`).
///
/// Points at the next-level table and carries hierarchical attributes that
/// further restrict everything mapped below it.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct TableDescriptor {
    /// Bit 0: valid.
    pub valid: bool,
    /// Bit 1: must be 1 for a table.
    pub table: bool,
    #[bits(10)]
    __ignored_2_11: u16,
    /// Bits 12–47: next-level table address.
    #[bits(36)]
    next_table_47_12: u64,
    #[bits(4)]
    __res0_48_51: u8,
    #[bits(7)]
    __ignored_52_58: u8,
    /// Bit 59: PXNTable.
    pub pxn_table: bool,
    /// Bit 60: XNTable (UXNTable).
    pub xn_table: bool,
    /// Bits 61–62: APTable.
    #[bits(2)]
    pub ap_table: u8,
    /// Bit 63: NSTable.
    pub ns_table: bool,
}

impl TableDescriptor {
    /// Physical base of the next-level table.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> PhysicalAddress {
        PhysicalAddress::new(self.next_table_47_12() << 12)
    }
}

/// Block and page descriptor layout.
///
/// For blocks the low bits of the output address field are `RES0`
/// (bits `[29:12]` at level 1, `[20:12]` at level 2).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct LeafDescriptor {
    /// Bit 0: valid.
    pub valid: bool,
    /// Bit 1: page at level 3; clear for blocks.
    pub page: bool,
    /// Bits 2–4: `AttrIndx`, index into `MAIR_EL1`.
    #[bits(3)]
    pub attr_index: u8,
    /// Bit 5: NS.
    pub ns: bool,
    /// Bits 6–7: `AP[2:1]`.
    #[bits(2)]
    pub ap: u8,
    /// Bits 8–9: SH.
    #[bits(2)]
    pub sh: u8,
    /// Bit 10: access flag.
    pub af: bool,
    /// Bit 11: not global.
    pub ng: bool,
    #[bits(36)]
    output_47_12: u64,
    #[bits(2)]
    __oa_49_48: u8,
    /// Bit 50: guarded page.
    pub guarded: bool,
    /// Bit 51: dirty bit modifier.
    pub dbm: bool,
    /// Bit 52: contiguous hint.
    pub contiguous: bool,
    /// Bit 53: privileged execute-never.
    pub pxn: bool,
    /// Bit 54: execute-never (UXN at EL1&0).
    pub xn: bool,
    /// Bits 55–58: reserved for software use.
    #[bits(4)]
    pub software: u8,
    #[bits(4)]
    __pbha_59_62: u8,
    #[bits(1)]
    __ignored_63: u8,
}

impl LeafDescriptor {
    /// Output address bits `[47:12]`, before any block alignment.
    #[inline]
    #[must_use]
    pub const fn output_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.output_47_12() << 12)
    }
}

/// Classification of a descriptor at its level.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DescriptorKind {
    Invalid,
    Table,
    Block,
    Page,
}

impl DescriptorKind {
    /// Whether a walk stops at this descriptor with an output address.
    #[inline]
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::Block | Self::Page)
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invalid => "invalid",
            Self::Table => "table",
            Self::Block => "block",
            Self::Page => "page",
        })
    }
}

/// An encoding that is decoded leniently but is not architecturally sound.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DescriptorAnomaly {
    /// Level 0 entry with type bit 0; only table descriptors exist at level 0.
    Level0TypeBitClear,
    /// Level 3 entry with type bit 0; this encoding is reserved.
    Level3TypeBitClear,
}

impl fmt::Display for DescriptorAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Level0TypeBitClear => "level 0 entry has type bit 0, treated as table",
            Self::Level3TypeBitClear => "level 3 entry has reserved type bit 0, treated as page",
        })
    }
}

/// The size of memory a leaf descriptor maps.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MappingSize {
    Block1G,
    Block2M,
    Page4K,
}

impl MappingSize {
    #[must_use]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Block1G => 1 << 30,
            Self::Block2M => 1 << 21,
            Self::Page4K => 1 << 12,
        }
    }

    #[must_use]
    pub const fn level(self) -> Level {
        match self {
            Self::Block1G => Level::L1,
            Self::Block2M => Level::L2,
            Self::Page4K => Level::L3,
        }
    }
}

impl fmt::Display for MappingSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block1G => "1 GiB block",
            Self::Block2M => "2 MiB block",
            Self::Page4K => "4 KiB page",
        })
    }
}

/// Raw permission and attribute fields of a descriptor.
///
/// See [`describe`](crate::describe) for the human-readable interpretation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Permissions {
    /// `AP[2:1]`, bits 7:6.
    pub ap: u8,
    /// Execute-never, bit 54.
    pub xn: bool,
    /// Privileged execute-never, bit 53.
    pub pxn: bool,
    /// Access flag, bit 10.
    pub af: bool,
    /// Shareability, bits 9:8.
    pub sh: u8,
    /// `AttrIndx`, bits 4:2.
    pub attr_index: u8,
}

impl From<LeafDescriptor> for Permissions {
    fn from(leaf: LeafDescriptor) -> Self {
        Self {
            ap: leaf.ap(),
            xn: leaf.xn(),
            pxn: leaf.pxn(),
            af: leaf.af(),
            sh: leaf.sh(),
            attr_index: leaf.attr_index(),
        }
    }
}

/// A descriptor classified for the level it was read at.
///
/// ### Invariants
/// - `kind == Invalid` exactly when bit 0 of `raw` is clear.
/// - A valid level 0 descriptor is a `Table`; a valid level 3 descriptor is a `Page`.
/// - `output_address` is zero for invalid descriptors, masked to bits `[47:12]`
///   for tables and pages, to `[47:30]` for level 1 blocks and to `[47:21]` for
///   level 2 blocks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Descriptor {
    pub raw: RawDescriptor,
    pub level: Level,
    pub kind: DescriptorKind,
    pub output_address: PhysicalAddress,
    pub permissions: Permissions,
    pub anomaly: Option<DescriptorAnomaly>,
}

impl Descriptor {
    /// Classify `raw` as read from a table at `level`.
    ///
    /// ```rust
    /// # use mmu_walk::{Descriptor, DescriptorKind};
    /// # use mmu_addresses::Level;
    /// let d = Descriptor::decode(0x0000_0000_4000_0601_u64.into(), Level::L1);
    /// assert_eq!(d.kind, DescriptorKind::Block);
    /// assert_eq!(d.output_address.as_u64(), 0x4000_0000);
    /// assert!(d.permissions.af);
    /// ```
    #[must_use]
    pub fn decode(raw: RawDescriptor, level: Level) -> Self {
        let permissions = Permissions::from(LeafDescriptor::from_bits(raw.as_u64()));
        let table_address = PhysicalAddress::new(raw.as_u64() & TABLE_ADDRESS_MASK);

        let (kind, output_address, anomaly) = if raw.is_valid() {
            match (level, raw.type_bit()) {
                (Level::L0, type_bit) => (
                    DescriptorKind::Table,
                    TableDescriptor::from_bits(raw.as_u64()).next_table(),
                    (!type_bit).then_some(DescriptorAnomaly::Level0TypeBitClear),
                ),
                (Level::L3, type_bit) => (
                    DescriptorKind::Page,
                    table_address.page::<Size4K>().base(),
                    (!type_bit).then_some(DescriptorAnomaly::Level3TypeBitClear),
                ),
                (Level::L1 | Level::L2, true) => (
                    DescriptorKind::Table,
                    TableDescriptor::from_bits(raw.as_u64()).next_table(),
                    None,
                ),
                (Level::L1, false) => (
                    DescriptorKind::Block,
                    table_address.page::<Size1G>().base(),
                    None,
                ),
                (Level::L2, false) => (
                    DescriptorKind::Block,
                    table_address.page::<Size2M>().base(),
                    None,
                ),
            }
        } else {
            (DescriptorKind::Invalid, PhysicalAddress::new(0), None)
        };

        Self {
            raw,
            level,
            kind,
            output_address,
            permissions,
            anomaly,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.kind, DescriptorKind::Invalid)
    }

    /// The table-descriptor view, if this is a table.
    #[must_use]
    pub const fn as_table(&self) -> Option<TableDescriptor> {
        match self.kind {
            DescriptorKind::Table => Some(TableDescriptor::from_bits(self.raw.as_u64())),
            _ => None,
        }
    }

    /// The block/page view, if this is a leaf.
    #[must_use]
    pub const fn as_leaf(&self) -> Option<LeafDescriptor> {
        match self.kind {
            DescriptorKind::Block | DescriptorKind::Page => {
                Some(LeafDescriptor::from_bits(self.raw.as_u64()))
            }
            _ => None,
        }
    }

    /// How much memory this leaf maps; `None` for tables and invalid entries.
    #[must_use]
    pub const fn mapping_size(&self) -> Option<MappingSize> {
        match (self.kind, self.level) {
            (DescriptorKind::Block, Level::L1) => Some(MappingSize::Block1G),
            (DescriptorKind::Block, Level::L2) => Some(MappingSize::Block2M),
            (DescriptorKind::Page, _) => Some(MappingSize::Page4K),
            _ => None,
        }
    }

    /// Final physical address of `va` if this leaf terminates its walk.
    ///
    /// The bits of `va` below the mapping size pass through unchanged.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let pa = match self.mapping_size()? {
            MappingSize::Block1G => {
                self.output_address.page::<Size1G>().join(va.offset::<Size1G>())
            }
            MappingSize::Block2M => {
                self.output_address.page::<Size2M>().join(va.offset::<Size2M>())
            }
            MappingSize::Page4K => {
                self.output_address.page::<Size4K>().join(va.page_offset())
            }
        };
        Some(pa)
    }
}
