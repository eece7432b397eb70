use mmu_addresses::{TableBase, UPPER_VA_MASK, VirtualAddress};
use mmu_registers::{SystemRegister, Ttbr};

/// Which translation table base register translates an address.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Root {
    /// `TTBR0_EL1`, the lower (user) half.
    Ttbr0,
    /// `TTBR1_EL1`, the upper (kernel) half.
    Ttbr1,
}

impl Root {
    /// `Ttbr1` when bit 55 of `va` is set.
    ///
    /// No canonical-form check is made on bits `[63:48]`.
    #[inline]
    #[must_use]
    pub const fn of(va: VirtualAddress) -> Self {
        if va.is_kernel() { Self::Ttbr1 } else { Self::Ttbr0 }
    }

    #[must_use]
    pub const fn register(self) -> SystemRegister {
        match self {
            Self::Ttbr0 => SystemRegister::Ttbr0El1,
            Self::Ttbr1 => SystemRegister::Ttbr1El1,
        }
    }

    /// The virtual prefix shared by every address this root translates.
    #[must_use]
    pub const fn prefix(self) -> VirtualAddress {
        match self {
            Self::Ttbr0 => VirtualAddress::zero(),
            Self::Ttbr1 => VirtualAddress::new(UPPER_VA_MASK),
        }
    }
}

/// The level-0 table for `va`: `ttbr1` if bit 55 is set, else `ttbr0`,
/// masked to bits `[47:12]`.
///
/// ```rust
/// # use mmu_walk::select_root;
/// # use mmu_registers::Ttbr;
/// # use mmu_addresses::VirtualAddress;
/// let ttbr0 = Ttbr::from_bits(0x0001_0000_4000_0000);
/// let ttbr1 = Ttbr::from_bits(0x0000_0000_4100_0001);
/// let kernel = VirtualAddress::new(0xFFFF_0000_0000_1000);
/// assert_eq!(select_root(kernel, ttbr0, ttbr1).address().as_u64(), 0x4100_0000);
/// assert_eq!(select_root(VirtualAddress::new(0x1000), ttbr0, ttbr1).address().as_u64(), 0x4000_0000);
/// ```
#[inline]
#[must_use]
pub const fn select_root(va: VirtualAddress, ttbr0: Ttbr, ttbr1: Ttbr) -> TableBase {
    match Root::of(va) {
        Root::Ttbr0 => ttbr0.table_base(),
        Root::Ttbr1 => ttbr1.table_base(),
    }
}
