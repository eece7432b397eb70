//! # Translation Levels and Table Indices
//!
//! With the 4 KiB granule and a 48-bit input address, a stage-1 walk visits
//! up to four tables. Each level consumes nine bits of the virtual address:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  L0   |  L1   |  L2   |  L3   | Offset |
//! ```

use crate::{MemoryAddressOffset, Size4K, VirtualAddress};
use core::fmt;

/// Number of descriptors in one translation table.
pub const ENTRIES_PER_TABLE: u16 = 512;

/// One of the four stage-1 lookup levels of the 4 KiB granule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum Level {
    /// Level 0: each entry spans 512 GiB; only table descriptors are legal.
    L0 = 0,
    /// Level 1: each entry spans 1 GiB; table or 1 GiB block.
    L1 = 1,
    /// Level 2: each entry spans 2 MiB; table or 2 MiB block.
    L2 = 2,
    /// Level 3: each entry spans 4 KiB; page descriptors only.
    L3 = 3,
}

impl Level {
    /// All levels in walk order.
    pub const ALL: [Self; 4] = [Self::L0, Self::L1, Self::L2, Self::L3];

    /// Build a level from its number (`0..=3`).
    #[inline]
    #[must_use]
    pub const fn from_u8(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::L0),
            1 => Some(Self::L1),
            2 => Some(Self::L2),
            3 => Some(Self::L3),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Bit position of this level's index field in the virtual address.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Self::L0 => 39,
            Self::L1 => 30,
            Self::L2 => 21,
            Self::L3 => 12,
        }
    }

    /// Bytes of virtual address space covered by one entry at this level.
    #[inline]
    #[must_use]
    pub const fn span(self) -> u64 {
        1 << self.shift()
    }

    /// The next (finer) level, or `None` after level 3.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::L0 => Some(Self::L1),
            Self::L1 => Some(Self::L2),
            Self::L2 => Some(Self::L3),
            Self::L3 => None,
        }
    }

    /// Human-readable span of one entry, e.g. `"2 MiB"`.
    #[must_use]
    pub const fn span_label(self) -> &'static str {
        match self {
            Self::L0 => "512 GiB",
            Self::L1 => "1 GiB",
            Self::L2 => "2 MiB",
            Self::L3 => "4 KiB",
        }
    }

    /// The conventional Linux name of the table at this level.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::L0 => "PGD",
            Self::L1 => "PUD",
            Self::L2 => "PMD",
            Self::L3 => "PTE",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.as_u8())
    }
}

/// Index into one translation table (`0..512`).
///
/// This strongly-typed index constrains the range to `0..512` (checked in
/// debug builds) and is derived from a virtual address for a given [`Level`].
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

impl TableIndex {
    /// Construct from a raw `u16`.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 512` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < ENTRIES_PER_TABLE);
        Self(v & (ENTRIES_PER_TABLE - 1))
    }

    /// Extract the index for `level` from a virtual address.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn of(va: VirtualAddress, level: Level) -> Self {
        Self(((va.as_u64() >> level.shift()) & 0x1FF) as u16)
    }

    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Debug for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableIndex({})", self.0)
    }
}

impl fmt::Display for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A virtual address split into its four table indices and page offset.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AddressIndices {
    pub l0: TableIndex,
    pub l1: TableIndex,
    pub l2: TableIndex,
    pub l3: TableIndex,
    pub offset: MemoryAddressOffset<Size4K>,
}

impl AddressIndices {
    /// Decompose `va` into per-level indices and the page offset.
    ///
    /// The upper 16 bits of `va` are not part of any field.
    #[inline]
    #[must_use]
    pub const fn of(va: VirtualAddress) -> Self {
        Self {
            l0: TableIndex::of(va, Level::L0),
            l1: TableIndex::of(va, Level::L1),
            l2: TableIndex::of(va, Level::L2),
            l3: TableIndex::of(va, Level::L3),
            offset: va.page_offset(),
        }
    }

    /// The index consumed at `level`.
    #[inline]
    #[must_use]
    pub const fn at(&self, level: Level) -> TableIndex {
        match level {
            Level::L0 => self.l0,
            Level::L1 => self.l1,
            Level::L2 => self.l2,
            Level::L3 => self.l3,
        }
    }

    /// Reassemble the low 48 bits of the original address.
    ///
    /// ```rust
    /// # use mmu_addresses::*;
    /// let va = VirtualAddress::new(0xFFFF_8000_0123_4567);
    /// assert_eq!(AddressIndices::of(va).compose(), va.as_u64() & 0xFFFF_FFFF_FFFF);
    /// ```
    #[inline]
    #[must_use]
    pub const fn compose(&self) -> u64 {
        (self.l0.as_u64() << Level::L0.shift())
            | (self.l1.as_u64() << Level::L1.shift())
            | (self.l2.as_u64() << Level::L2.shift())
            | (self.l3.as_u64() << Level::L3.shift())
            | self.offset.as_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_walk_in_order() {
        let mut level = Some(Level::L0);
        let mut seen = 0;
        while let Some(l) = level {
            assert_eq!(l, Level::ALL[seen]);
            seen += 1;
            level = l.next();
        }
        assert_eq!(seen, 4);
    }

    #[test]
    fn spans() {
        assert_eq!(Level::L1.span(), 1 << 30);
        assert_eq!(Level::L3.span_label(), "4 KiB");
        assert_eq!(Level::from_u8(4), None);
    }

    #[test]
    fn index_bounds() {
        assert_eq!(TableIndex::new(511).as_u16(), 511);
        assert_eq!(TableIndex::new(3).as_u64(), 3);
    }

    #[test]
    fn indices_of_known_address() {
        let va = VirtualAddress::new(0xFFFF_8000_08CC_895C);
        let idx = AddressIndices::of(va);
        assert_eq!(idx.l0.as_u16(), 256);
        assert_eq!(idx.l1.as_u16(), 0);
        assert_eq!(idx.l2.as_u16(), 70);
        assert_eq!(idx.l3.as_u16(), 0xC8);
        assert_eq!(idx.offset.as_u64(), 0x95C);
        assert_eq!(idx.at(Level::L2), idx.l2);
    }
}
