use bitfield_struct::bitfield;
use mmu_addresses::TableBase;

/// `TTBR0_EL1` / `TTBR1_EL1`: Translation Table Base Register.
///
/// Holds the physical base address of the level-0 table for one half of the
/// address space, tagged with an ASID.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ttbr {
    /// CnP (bit 0): common-not-private; table shared across PEs.
    pub cnp: bool,

    /// BADDR (bits 1–47): table base address.
    ///
    /// With the 4 KiB granule and a 48-bit input range the table is 4 KiB
    /// aligned, so bits `[11:1]` are `RES0` in practice.
    #[bits(47)]
    baddr_47_1: u64,

    /// ASID (bits 48–63): address space identifier.
    #[bits(16)]
    pub asid: u16,
}

impl Ttbr {
    /// The level-0 table base, masked to bits `[47:12]`.
    ///
    /// ```rust
    /// # use mmu_registers::Ttbr;
    /// let ttbr = Ttbr::from_bits(0x002A_0000_4008_0001);
    /// assert_eq!(ttbr.asid(), 0x2A);
    /// assert_eq!(ttbr.table_base().address().as_u64(), 0x4008_0000);
    /// ```
    #[inline]
    #[must_use]
    pub const fn table_base(self) -> TableBase {
        TableBase::new(self.baddr_47_1() << 1)
    }
}
