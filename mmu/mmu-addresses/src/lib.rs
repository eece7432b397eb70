//! # Virtual and Physical Address Types for AArch64 Stage-1 Walks
//!
//! Strongly typed wrappers for raw addresses, translation levels and table
//! indices used when decoding VMSAv8-64 translation tables (4 KiB granule,
//! 48-bit input addresses).
//!
//! ## Overview
//!
//! | Concept | Generic | Description |
//! |----------|----------|-------------|
//! | [`MemoryAddress`] | – | A raw 64-bit address, either physical or virtual. |
//! | [`MemoryPage<S>`] | [`S: PageSize`](PageSize) | An aligned base address of a page or block of size `S`. |
//! | [`MemoryAddressOffset<S>`] | [`S: PageSize`](PageSize) | An offset within a page or block of size `S`. |
//! | [`Level`] / [`TableIndex`] | – | A lookup level and a 9-bit index into one of its tables. |
//! | [`TableBase`] | – | The physical base of a table, masked to bits `[47:12]`. |
//!
//! These are then wrapped to distinguish between virtual and physical spaces:
//!
//! | Wrapper | Meaning |
//! |----------|----------|
//! | [`VirtualAddress`] | An input address of the walk (user or kernel half). |
//! | [`PhysicalAddress`] / [`PhysicalPage<S>`] | Output addresses and descriptor locations. |
//!
//! ## Mapping Sizes
//!
//! - [`Size4K`]: 4 KiB page (level 3)
//! - [`Size2M`]: 2 MiB block (level 2)
//! - [`Size1G`]: 1 GiB block (level 1)
//!
//! ## Typical Usage
//!
//! ```rust
//! # use mmu_addresses::*;
//! let va = VirtualAddress::new(0x0000_0001_2345_6789);
//! let idx = va.indices();
//! assert_eq!(idx.l1.as_u16(), 4);
//! assert_eq!(idx.compose(), va.low_bits());
//!
//! // A 1 GiB block keeps the low 30 bits of the virtual address.
//! let block = PhysicalAddress::new(0x4000_0000).page::<Size1G>();
//! assert_eq!(block.join(va.offset::<Size1G>()).as_u64(), 0x6345_6789);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod level;
mod memory_address;
mod page_size;
mod physical_address;
mod virtual_address;

pub use crate::level::{AddressIndices, ENTRIES_PER_TABLE, Level, TableIndex};
pub use crate::memory_address::{MemoryAddress, MemoryAddressOffset, MemoryPage};
pub use crate::page_size::{PageSize, Size1G, Size2M, Size4K};
pub use crate::physical_address::{
    DESCRIPTOR_SIZE, PhysicalAddress, PhysicalPage, TABLE_ADDRESS_MASK, TableBase,
};
pub use crate::virtual_address::{
    KERNEL_SELECT_BIT, LOWER_VA_MASK, UPPER_VA_MASK, VirtualAddress,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_offset_rejoin_4k() {
        let a = MemoryAddress::new(0x1234_5678_9ABC_DEF0);
        let page = MemoryPage::<Size4K>::from_addr(a);
        let offset = a.offset::<Size4K>();
        assert_eq!(page.base().as_u64() & 0xFFF, 0);
        assert_eq!(offset.as_u64(), a.as_u64() & 0xFFF);
        assert_eq!(page.join(offset), a);
    }

    #[test]
    fn page_and_offset_rejoin_1g() {
        let a = MemoryAddress::new(0x0000_0004_1234_5678);
        let page = MemoryPage::<Size1G>::from_addr(a);
        let offset = a.offset::<Size1G>();
        assert_eq!(page.base().as_u64() & (Size1G::SIZE - 1), 0);
        assert_eq!(offset.as_u64(), a.as_u64() & (Size1G::SIZE - 1));
        assert_eq!(page.join(offset), a);
    }

    #[test]
    fn bit_extraction() {
        let a = MemoryAddress::new(0x0040_0000_0000_0601);
        assert!(a.bit(54));
        assert!(!a.bit(53));
        assert!(a.bit(0));
    }
}
