use crate::{AddressIndices, Level, MemoryAddress, MemoryAddressOffset, PageSize, Size4K, TableIndex};
use core::fmt;

/// Bits `[63:48]`, the part of a virtual address above the 48-bit input range.
pub const UPPER_VA_MASK: u64 = 0xFFFF_0000_0000_0000;

/// Bits `[47:0]`, the part of a virtual address consumed by a 4-level walk.
pub const LOWER_VA_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Bit that selects `TTBR1_EL1` (kernel space) over `TTBR0_EL1` (user space).
pub const KERNEL_SELECT_BIT: u32 = 55;

/// Virtual memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **virtual** addresses.
/// It does not validate canonicality at runtime; an address with bit 55 set is
/// treated as a kernel address regardless of whether bits `[63:48]` agree.
///
/// ### Semantics
/// - [`VirtualAddress::index`] / [`VirtualAddress::indices`] extract the 9-bit
///   table indices consumed by each level of a stage-1 walk.
/// - [`VirtualAddress::page_offset`] yields bits `[11:0]`.
/// - [`VirtualAddress::offset`] yields the bits below a block or page size, which
///   pass through translation unchanged.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::*;
/// let va = VirtualAddress::new(0xFFFF_8000_0000_1234);
/// assert!(va.is_kernel());
/// assert_eq!(va.index(Level::L0).as_u16(), 256);
/// assert_eq!(va.page_offset().as_u64(), 0x234);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(MemoryAddress);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    /// Whether this address is translated through `TTBR1_EL1`.
    ///
    /// Only bit 55 is consulted; bits `[63:56]` and `[54:48]` are ignored.
    #[inline]
    #[must_use]
    pub const fn is_kernel(self) -> bool {
        self.0.bit(KERNEL_SELECT_BIT)
    }

    /// The table index consumed at `level`.
    #[inline]
    #[must_use]
    pub const fn index(self, level: Level) -> TableIndex {
        TableIndex::of(self, level)
    }

    /// All four table indices plus the page offset.
    #[inline]
    #[must_use]
    pub const fn indices(self) -> AddressIndices {
        AddressIndices::of(self)
    }

    /// Bits `[11:0]`.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> MemoryAddressOffset<Size4K> {
        self.0.offset::<Size4K>()
    }

    /// The bits below the mapping size `S`.
    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> MemoryAddressOffset<S> {
        self.0.offset::<S>()
    }

    /// Bits `[47:0]`.
    #[inline]
    #[must_use]
    pub const fn low_bits(self) -> u64 {
        self.as_u64() & LOWER_VA_MASK
    }

    /// Place `index` into the field of `level`, keeping all other bits.
    ///
    /// Used to build the virtual prefix of an entry while enumerating tables.
    #[inline]
    #[must_use]
    pub const fn with_index(self, level: Level, index: TableIndex) -> Self {
        let shift = level.shift();
        let cleared = self.as_u64() & !(0x1FF << shift);
        Self::new(cleared | (index.as_u64() << shift))
    }

    /// Sign-extend bit 47 into bits `[63:48]`.
    ///
    /// Addresses with bit 47 clear are returned unchanged. This is the
    /// canonical display form of kernel addresses; it does not affect which
    /// root a walk uses.
    ///
    /// ```rust
    /// # use mmu_addresses::VirtualAddress;
    /// let va = VirtualAddress::new(0x0000_8000_0000_0000);
    /// assert_eq!(va.sign_extended().as_u64(), 0xFFFF_8000_0000_0000);
    /// ```
    #[inline]
    #[must_use]
    pub const fn sign_extended(self) -> Self {
        if self.0.bit(47) {
            Self::new(self.as_u64() | UPPER_VA_MASK)
        } else {
            self
        }
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}
