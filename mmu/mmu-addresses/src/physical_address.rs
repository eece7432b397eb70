use crate::{MemoryAddress, MemoryAddressOffset, MemoryPage, PageSize, TableIndex};
use core::fmt;

/// Bits `[47:12]`: the next-level table or page address held in a descriptor.
pub const TABLE_ADDRESS_MASK: u64 = 0x0000_FFFF_FFFF_F000;

/// Size of one translation table descriptor in bytes.
pub const DESCRIPTOR_SIZE: u64 = 8;

/// Physical memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **physical** addresses
/// (RAM or MMIO as seen by the inspected target). Like
/// [`VirtualAddress`](crate::VirtualAddress), this type carries intent and
/// prevents accidental VA↔PA mix-ups.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0000_4123_4567);
/// let block = pa.page::<Size2M>();
/// assert_eq!(block.base().as_u64(), 0x4120_0000);
/// let va = VirtualAddress::new(0x0000_0000_0003_4567);
/// assert_eq!(block.join(va.offset::<Size2M>()), pa);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(MemoryAddress);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> PhysicalPage<S> {
        PhysicalPage::from_addr(self)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

/// Physical base of a page or block of size `S`.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize>(MemoryPage<S>);

impl<S: PageSize> PhysicalPage<S> {
    /// The page of size `S` containing `p` (aligns down).
    #[inline]
    #[must_use]
    pub const fn from_addr(p: PhysicalAddress) -> Self {
        Self(MemoryPage::from_addr(p.0))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress(self.0.base())
    }

    #[inline]
    #[must_use]
    pub const fn join(self, off: MemoryAddressOffset<S>) -> PhysicalAddress {
        PhysicalAddress(self.0.join(off))
    }
}

impl<S: PageSize> fmt::Display for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PhysicalPage<{}>(0x{:016X})",
            S::as_str(),
            self.0.base().as_u64()
        )
    }
}

/// Physical base of a translation table.
///
/// Always masked to bits `[47:12]`: any ASID, CnP or attribute bits carried by
/// the value it was built from are discarded.
///
/// ```rust
/// # use mmu_addresses::TableBase;
/// let base = TableBase::new(0x0001_0000_4000_0001); // ASID 1, CnP set
/// assert_eq!(base.address().as_u64(), 0x4000_0000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableBase(PhysicalAddress);

impl TableBase {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(PhysicalAddress::new(raw & TABLE_ADDRESS_MASK))
    }

    #[inline]
    #[must_use]
    pub const fn from_address(address: PhysicalAddress) -> Self {
        Self::new(address.as_u64())
    }

    #[inline]
    #[must_use]
    pub const fn address(self) -> PhysicalAddress {
        self.0
    }

    /// Physical address of the descriptor at `index` in this table.
    #[inline]
    #[must_use]
    pub const fn entry_address(self, index: TableIndex) -> PhysicalAddress {
        PhysicalAddress::new(self.0.as_u64() + index.as_u64() * DESCRIPTOR_SIZE)
    }
}

impl fmt::Debug for TableBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableBase(0x{:012X})", self.0.as_u64())
    }
}

impl fmt::Display for TableBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
