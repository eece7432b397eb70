use bitfield_struct::bitfield;
use core::fmt;

/// `TCR_EL1`: Translation Control Register.
///
/// Controls the size, granule and walk attributes of the two stage-1 regions
/// (`TTBR0_EL1` for the lower half, `TTBR1_EL1` for the upper half).
///
/// Note that the granule encodings differ between `TG0` and `TG1`; use
/// [`TcrEl1::granule0`] / [`TcrEl1::granule1`] instead of the raw fields.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct TcrEl1 {
    /// T0SZ (bits 0–5): size offset of the `TTBR0_EL1` region (`64 - VA bits`).
    #[bits(6)]
    pub t0sz: u8,
    #[bits(1)]
    __res0_6: u8,
    /// EPD0 (bit 7): walks through `TTBR0_EL1` are disabled.
    pub epd0: bool,
    /// IRGN0 (bits 8–9): inner cacheability of `TTBR0_EL1` walks.
    #[bits(2)]
    pub irgn0: u8,
    /// ORGN0 (bits 10–11): outer cacheability of `TTBR0_EL1` walks.
    #[bits(2)]
    pub orgn0: u8,
    /// SH0 (bits 12–13): shareability of `TTBR0_EL1` walks.
    #[bits(2)]
    pub sh0: u8,
    /// TG0 (bits 14–15): granule of the `TTBR0_EL1` region.
    #[bits(2)]
    pub tg0: u8,

    /// T1SZ (bits 16–21): size offset of the `TTBR1_EL1` region.
    #[bits(6)]
    pub t1sz: u8,
    /// A1 (bit 22): the ASID is taken from `TTBR1_EL1` instead of `TTBR0_EL1`.
    pub a1: bool,
    /// EPD1 (bit 23): walks through `TTBR1_EL1` are disabled.
    pub epd1: bool,
    /// IRGN1 (bits 24–25).
    #[bits(2)]
    pub irgn1: u8,
    /// ORGN1 (bits 26–27).
    #[bits(2)]
    pub orgn1: u8,
    /// SH1 (bits 28–29).
    #[bits(2)]
    pub sh1: u8,
    /// TG1 (bits 30–31): granule of the `TTBR1_EL1` region.
    #[bits(2)]
    pub tg1: u8,

    /// IPS (bits 32–34): intermediate physical address size.
    #[bits(3)]
    pub ips: u8,
    #[bits(1)]
    __res0_35: u8,
    /// AS (bit 36): 16-bit ASIDs.
    pub asid16: bool,
    /// TBI0 (bit 37): top byte ignored for `TTBR0_EL1` addresses.
    pub tbi0: bool,
    /// TBI1 (bit 38): top byte ignored for `TTBR1_EL1` addresses.
    pub tbi1: bool,
    #[bits(25)]
    __rest_39_63: u32,
}

/// Translation granule size.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Granule {
    Size4K,
    Size16K,
    Size64K,
}

impl Granule {
    #[must_use]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Size4K => 4 * 1024,
            Self::Size16K => 16 * 1024,
            Self::Size64K => 64 * 1024,
        }
    }
}

impl fmt::Display for Granule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Size4K => "4KB",
            Self::Size16K => "16KB",
            Self::Size64K => "64KB",
        })
    }
}

impl TcrEl1 {
    /// Granule of the `TTBR0_EL1` region; `None` for the reserved encoding.
    #[must_use]
    pub const fn granule0(self) -> Option<Granule> {
        match self.tg0() {
            0b00 => Some(Granule::Size4K),
            0b01 => Some(Granule::Size64K),
            0b10 => Some(Granule::Size16K),
            _ => None,
        }
    }

    /// Granule of the `TTBR1_EL1` region; `None` for the reserved encoding.
    #[must_use]
    pub const fn granule1(self) -> Option<Granule> {
        match self.tg1() {
            0b01 => Some(Granule::Size16K),
            0b10 => Some(Granule::Size4K),
            0b11 => Some(Granule::Size64K),
            _ => None,
        }
    }

    /// Width of the `TTBR0_EL1` input address range in bits.
    #[must_use]
    pub const fn va_bits0(self) -> u8 {
        64 - self.t0sz()
    }

    /// Width of the `TTBR1_EL1` input address range in bits.
    #[must_use]
    pub const fn va_bits1(self) -> u8 {
        64 - self.t1sz()
    }

    /// Physical address width selected by `IPS`, or `None` if reserved.
    #[must_use]
    pub const fn physical_address_bits(self) -> Option<u8> {
        match self.ips() {
            0b000 => Some(32),
            0b001 => Some(36),
            0b010 => Some(40),
            0b011 => Some(42),
            0b100 => Some(44),
            0b101 => Some(48),
            0b110 => Some(52),
            _ => None,
        }
    }
}
