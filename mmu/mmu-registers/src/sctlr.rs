use bitfield_struct::bitfield;

/// `SCTLR_EL1`: System Control Register (EL1).
///
/// Only the fields relevant to interpreting a stage-1 walk are named; the
/// rest are carried as padding.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct SctlrEl1 {
    /// M (bit 0): stage-1 address translation enabled.
    pub mmu_enabled: bool,
    /// A (bit 1): alignment checking.
    pub alignment_check: bool,
    /// C (bit 2): data cacheability.
    pub data_cache: bool,
    /// SA (bit 3): SP alignment check at EL1.
    pub stack_alignment_check: bool,
    /// SA0 (bit 4): SP alignment check at EL0.
    pub stack_alignment_check_el0: bool,
    #[bits(7)]
    __bits_5_11: u8,
    /// I (bit 12): instruction cacheability.
    pub instruction_cache: bool,
    #[bits(6)]
    __bits_13_18: u8,
    /// WXN (bit 19): writable memory is treated as execute-never.
    pub write_implies_xn: bool,
    #[bits(5)]
    __bits_20_24: u8,
    /// EE (bit 25): big-endian data accesses and table walks at EL1.
    pub big_endian: bool,
    #[bits(38)]
    __bits_26_63: u64,
}
