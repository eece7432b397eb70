use crate::reader::MemoryReader;
use crate::root::Root;
use mmu_addresses::VirtualAddress;
use mmu_registers::{CurrentEl, MairEl1, SctlrEl1, SystemRegister, TcrEl1, Ttbr};

/// Translation-relevant registers of the inspected context.
///
/// Each register is read independently; one that cannot be read is `None`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RegisterSnapshot {
    pub pc: Option<VirtualAddress>,
    pub sp: Option<VirtualAddress>,
    pub current_el: Option<CurrentEl>,
    pub ttbr0: Option<Ttbr>,
    pub ttbr1: Option<Ttbr>,
    pub tcr: Option<TcrEl1>,
    pub sctlr: Option<SctlrEl1>,
    pub mair: Option<MairEl1>,
}

impl RegisterSnapshot {
    /// Read every register in [`SystemRegister::ALL`] through `reader`.
    pub fn capture<R: MemoryReader + ?Sized>(reader: &mut R) -> Self {
        let mut snapshot = Self::default();
        for register in SystemRegister::ALL {
            let value = match reader.read_register(register) {
                Ok(value) => value,
                Err(err) => {
                    log::debug!("{err}");
                    continue;
                }
            };
            match register {
                SystemRegister::Pc => snapshot.pc = Some(VirtualAddress::new(value)),
                SystemRegister::Sp => snapshot.sp = Some(VirtualAddress::new(value)),
                SystemRegister::CurrentEl => snapshot.current_el = Some(CurrentEl::from_bits(value)),
                SystemRegister::Ttbr0El1 => snapshot.ttbr0 = Some(Ttbr::from_bits(value)),
                SystemRegister::Ttbr1El1 => snapshot.ttbr1 = Some(Ttbr::from_bits(value)),
                SystemRegister::TcrEl1 => snapshot.tcr = Some(TcrEl1::from_bits(value)),
                SystemRegister::SctlrEl1 => snapshot.sctlr = Some(SctlrEl1::from_bits(value)),
                SystemRegister::MairEl1 => snapshot.mair = Some(MairEl1::from_bits(value)),
            }
        }
        snapshot
    }

    /// Raw value of `register`, if it was captured.
    #[must_use]
    pub const fn raw(&self, register: SystemRegister) -> Option<u64> {
        match register {
            SystemRegister::Pc => match self.pc {
                Some(pc) => Some(pc.as_u64()),
                None => None,
            },
            SystemRegister::Sp => match self.sp {
                Some(sp) => Some(sp.as_u64()),
                None => None,
            },
            SystemRegister::CurrentEl => match self.current_el {
                Some(r) => Some(r.into_bits()),
                None => None,
            },
            SystemRegister::Ttbr0El1 => match self.ttbr0 {
                Some(r) => Some(r.into_bits()),
                None => None,
            },
            SystemRegister::Ttbr1El1 => match self.ttbr1 {
                Some(r) => Some(r.into_bits()),
                None => None,
            },
            SystemRegister::TcrEl1 => match self.tcr {
                Some(r) => Some(r.into_bits()),
                None => None,
            },
            SystemRegister::SctlrEl1 => match self.sctlr {
                Some(r) => Some(r.into_bits()),
                None => None,
            },
            SystemRegister::MairEl1 => match self.mair {
                Some(r) => Some(r.into_bits()),
                None => None,
            },
        }
    }

    /// `SCTLR_EL1.M`, if `SCTLR_EL1` was captured.
    #[must_use]
    pub const fn mmu_enabled(&self) -> Option<bool> {
        match self.sctlr {
            Some(sctlr) => Some(sctlr.mmu_enabled()),
            None => None,
        }
    }

    /// `CurrentEL.EL`, if `CurrentEL` was captured.
    #[must_use]
    pub const fn exception_level(&self) -> Option<u8> {
        match self.current_el {
            Some(current_el) => Some(current_el.el()),
            None => None,
        }
    }

    /// Whether the base register that translates `va` was captured.
    #[must_use]
    pub const fn can_walk(&self, va: VirtualAddress) -> bool {
        match Root::of(va) {
            Root::Ttbr0 => self.ttbr0.is_some(),
            Root::Ttbr1 => self.ttbr1.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryImage;
    use mmu_registers::Granule;

    #[test]
    fn missing_registers_are_absent_not_fatal() {
        let mut image = MemoryImage::default()
            .with_register(SystemRegister::Ttbr1El1, 0x0000_0000_4008_0000)
            .with_register(SystemRegister::TcrEl1, 0x0000_0032_B511_3510)
            .with_register(SystemRegister::SctlrEl1, 0x30D0_1805);

        let snapshot = RegisterSnapshot::capture(&mut image);
        assert_eq!(snapshot.pc, None);
        assert_eq!(snapshot.ttbr0, None);
        assert!(!snapshot.can_walk(VirtualAddress::new(0x1000)));
        assert!(snapshot.can_walk(VirtualAddress::new(0xFFFF_0000_0000_1000)));
        assert_eq!(snapshot.exception_level(), None);
        assert_eq!(snapshot.mmu_enabled(), Some(true));
        assert_eq!(
            snapshot.tcr.and_then(TcrEl1::granule1),
            Some(Granule::Size4K)
        );
        assert_eq!(snapshot.raw(SystemRegister::Ttbr1El1), Some(0x4008_0000));
        assert_eq!(snapshot.raw(SystemRegister::MairEl1), None);
    }

    #[test]
    fn stack_pointer_and_exception_level() {
        let mut image = MemoryImage::default()
            .with_register(SystemRegister::Sp, 0xFFFF_8000_0010_0000)
            .with_register(SystemRegister::CurrentEl, 0b0100);

        let snapshot = RegisterSnapshot::capture(&mut image);
        assert_eq!(snapshot.sp, Some(VirtualAddress::new(0xFFFF_8000_0010_0000)));
        assert_eq!(snapshot.exception_level(), Some(1));
        assert_eq!(snapshot.raw(SystemRegister::CurrentEl), Some(0b0100));
    }
}
