use bitfield_struct::bitfield;

/// `CurrentEL`: the exception level the inspected context runs at.
///
/// ```rust
/// # use mmu_registers::CurrentEl;
/// assert_eq!(CurrentEl::from_bits(0b0100).el(), 1);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct CurrentEl {
    #[bits(2)]
    __bits_0_1: u8,
    /// EL (bits 2–3): 0 for user code, 1 for the kernel, 2 for a hypervisor,
    /// 3 for secure firmware.
    #[bits(2)]
    pub el: u8,
    #[bits(60)]
    __bits_4_63: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bits_are_ignored() {
        assert_eq!(CurrentEl::from_bits(0x0000_0000_0000_0008).el(), 2);
        assert_eq!(CurrentEl::from_bits(0xFFFF_FFFF_FFFF_FFF3).el(), 0);
        assert_eq!(CurrentEl::from_bits(0b1111).el(), 3);
    }
}
