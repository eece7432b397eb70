//! # Memory Collaborator
//!
//! The walker never touches memory directly. Every descriptor fetch and
//! register lookup goes through a [`MemoryReader`], which may be a debugger
//! transport, a core dump, or the in-memory [`MemoryImage`] shipped here.

use crate::error::{MemoryReadError, RegisterUnavailable};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Range;
use mmu_addresses::PhysicalAddress;
use mmu_registers::SystemRegister;

/// Source of physical memory and system register values for a walk.
///
/// Calls are blocking and complete before the walk proceeds; the walker
/// never retries, caches or writes.
pub trait MemoryReader {
    /// Fill `buf` with the bytes starting at `address`.
    ///
    /// # Errors
    /// Returns [`MemoryReadError`] if any byte of the range cannot be read.
    fn read_physical(
        &mut self,
        address: PhysicalAddress,
        buf: &mut [u8],
    ) -> Result<(), MemoryReadError>;

    /// Raw value of a system register.
    ///
    /// # Errors
    /// Returns [`RegisterUnavailable`] if the register cannot be read.
    fn read_register(&mut self, register: SystemRegister) -> Result<u64, RegisterUnavailable>;

    /// Read one little-endian 64-bit descriptor.
    ///
    /// # Errors
    /// Propagates the failure of [`read_physical`](Self::read_physical).
    fn read_u64(&mut self, address: PhysicalAddress) -> Result<u64, MemoryReadError> {
        let mut buf = [0u8; 8];
        self.read_physical(address, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

impl<R: MemoryReader + ?Sized> MemoryReader for &mut R {
    #[inline]
    fn read_physical(
        &mut self,
        address: PhysicalAddress,
        buf: &mut [u8],
    ) -> Result<(), MemoryReadError> {
        (**self).read_physical(address, buf)
    }

    #[inline]
    fn read_register(&mut self, register: SystemRegister) -> Result<u64, RegisterUnavailable> {
        (**self).read_register(register)
    }
}

/// A contiguous physical memory image plus a register table.
///
/// Bytes outside `base..base + len` are unreadable, as are any ranges marked
/// with [`mark_unreadable`](Self::mark_unreadable). Registers not set are
/// reported as unavailable.
///
/// ```rust
/// # use mmu_walk::{MemoryImage, MemoryReader};
/// # use mmu_addresses::PhysicalAddress;
/// let mut image = MemoryImage::zeroed(PhysicalAddress::new(0x4000_0000), 0x2000);
/// image.write_u64(PhysicalAddress::new(0x4000_1008), 0xDEAD_BEEF).unwrap();
/// assert_eq!(image.read_u64(PhysicalAddress::new(0x4000_1008)), Ok(0xDEAD_BEEF));
/// assert!(image.read_u64(PhysicalAddress::new(0x4000_2000)).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    base: PhysicalAddress,
    bytes: Vec<u8>,
    registers: BTreeMap<SystemRegister, u64>,
    holes: Vec<Range<u64>>,
    reads: usize,
}

impl MemoryImage {
    /// Wrap `bytes` as the memory starting at physical address `base`.
    #[must_use]
    pub fn new(base: PhysicalAddress, bytes: Vec<u8>) -> Self {
        Self {
            base,
            bytes,
            registers: BTreeMap::new(),
            holes: Vec::new(),
            reads: 0,
        }
    }

    /// An all-zero image of `len` bytes at `base`.
    #[must_use]
    pub fn zeroed(base: PhysicalAddress, len: usize) -> Self {
        Self::new(base, alloc::vec![0; len])
    }

    #[must_use]
    pub fn with_register(mut self, register: SystemRegister, value: u64) -> Self {
        self.set_register(register, value);
        self
    }

    pub fn set_register(&mut self, register: SystemRegister, value: u64) {
        self.registers.insert(register, value);
    }

    #[must_use]
    pub fn register(&self, register: SystemRegister) -> Option<u64> {
        self.registers.get(&register).copied()
    }

    /// Make `len` bytes at `address` fail to read as if the transport refused them.
    pub fn mark_unreadable(&mut self, address: PhysicalAddress, len: u64) {
        let start = address.as_u64();
        self.holes.push(start..start.saturating_add(len));
    }

    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of [`read_physical`](MemoryReader::read_physical) calls served so far,
    /// including failed ones.
    #[must_use]
    pub const fn reads(&self) -> usize {
        self.reads
    }

    /// Store a little-endian 64-bit value, e.g. a descriptor fixture.
    ///
    /// # Errors
    /// Returns [`MemoryReadError::OutOfBounds`] if the range is not inside the image.
    pub fn write_u64(&mut self, address: PhysicalAddress, value: u64) -> Result<(), MemoryReadError> {
        let range = self.locate(address, 8)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn locate(&self, address: PhysicalAddress, length: usize) -> Result<Range<usize>, MemoryReadError> {
        let out_of_bounds = MemoryReadError::OutOfBounds { address, length };
        let start = address
            .as_u64()
            .checked_sub(self.base.as_u64())
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or(out_of_bounds)?;
        let end = start.checked_add(length).ok_or(out_of_bounds)?;
        if end > self.bytes.len() {
            return Err(out_of_bounds);
        }
        Ok(start..end)
    }

    fn overlaps_hole(&self, address: PhysicalAddress, length: usize) -> bool {
        let start = address.as_u64();
        let end = start.saturating_add(length as u64);
        self.holes
            .iter()
            .any(|hole| start < hole.end && hole.start < end)
    }
}

impl MemoryReader for MemoryImage {
    fn read_physical(
        &mut self,
        address: PhysicalAddress,
        buf: &mut [u8],
    ) -> Result<(), MemoryReadError> {
        self.reads += 1;
        let length = buf.len();
        if self.overlaps_hole(address, length) {
            return Err(MemoryReadError::Transport { address, length });
        }
        let range = self.locate(address, length)?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn read_register(&mut self, register: SystemRegister) -> Result<u64, RegisterUnavailable> {
        self.register(register)
            .ok_or(RegisterUnavailable::new(register))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_bounded_by_the_image() {
        let mut image = MemoryImage::zeroed(PhysicalAddress::new(0x1000), 0x10);
        image.write_u64(PhysicalAddress::new(0x1008), u64::MAX).unwrap();

        assert_eq!(image.read_u64(PhysicalAddress::new(0x1008)), Ok(u64::MAX));
        assert_eq!(
            image.read_u64(PhysicalAddress::new(0x1009)),
            Err(MemoryReadError::OutOfBounds {
                address: PhysicalAddress::new(0x1009),
                length: 8
            })
        );
        assert!(image.read_u64(PhysicalAddress::new(0x0FF8)).is_err());
        assert_eq!(image.reads(), 3);
    }

    #[test]
    fn holes_fail_as_transport_errors() {
        let mut image = MemoryImage::zeroed(PhysicalAddress::new(0), 0x100);
        image.mark_unreadable(PhysicalAddress::new(0x40), 8);
        assert!(image.read_u64(PhysicalAddress::new(0x38)).is_ok());
        assert!(matches!(
            image.read_u64(PhysicalAddress::new(0x3C)),
            Err(MemoryReadError::Transport { .. })
        ));
        assert!(image.read_u64(PhysicalAddress::new(0x48)).is_ok());
    }

    #[test]
    fn unset_registers_are_unavailable() {
        let mut image = MemoryImage::default().with_register(SystemRegister::Pc, 0x8_0000);
        assert_eq!(image.read_register(SystemRegister::Pc), Ok(0x8_0000));
        assert_eq!(
            image.read_register(SystemRegister::Ttbr0El1),
            Err(RegisterUnavailable::new(SystemRegister::Ttbr0El1))
        );
    }
}
