use bitfield_struct::bitfield;
use core::fmt;

/// `MAIR_EL1`: Memory Attribute Indirection Register.
///
/// Eight one-byte attribute encodings; a leaf descriptor's `AttrIndx` field
/// selects one of them.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct MairEl1 {
    pub attr0: u8,
    pub attr1: u8,
    pub attr2: u8,
    pub attr3: u8,
    pub attr4: u8,
    pub attr5: u8,
    pub attr6: u8,
    pub attr7: u8,
}

impl MairEl1 {
    /// The attribute byte at `index` (`0..8`); `None` for larger indices.
    ///
    /// ```rust
    /// # use mmu_registers::{MairEl1, MemoryType};
    /// let mair = MairEl1::from_bits(0x0000_0000_0044_FF00);
    /// assert_eq!(mair.memory_type(0), Some(MemoryType::DeviceNGnRnE));
    /// assert_eq!(mair.memory_type(1), Some(MemoryType::NormalWriteBack));
    /// assert_eq!(mair.memory_type(2), Some(MemoryType::NormalNonCacheable));
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn attribute(self, index: u8) -> Option<u8> {
        if index < 8 {
            Some((self.into_bits() >> (index * 8)) as u8)
        } else {
            None
        }
    }

    /// Classify the attribute at `index`.
    #[must_use]
    pub const fn memory_type(self, index: u8) -> Option<MemoryType> {
        match self.attribute(index) {
            Some(attr) => Some(MemoryType::from_attribute(attr)),
            None => None,
        }
    }
}

/// Coarse classification of a `MAIR_EL1` attribute byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MemoryType {
    DeviceNGnRnE,
    DeviceNGnRE,
    DeviceNGRE,
    DeviceGRE,
    NormalNonCacheable,
    NormalWriteBack,
    NormalWriteThrough,
    /// Any other encoding, including mixed inner/outer policies.
    Other(u8),
}

impl MemoryType {
    #[must_use]
    pub const fn from_attribute(attr: u8) -> Self {
        match attr {
            0x00 => Self::DeviceNGnRnE,
            0x04 => Self::DeviceNGnRE,
            0x08 => Self::DeviceNGRE,
            0x0C => Self::DeviceGRE,
            0x44 => Self::NormalNonCacheable,
            0xFF => Self::NormalWriteBack,
            0xBB => Self::NormalWriteThrough,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn is_device(self) -> bool {
        matches!(
            self,
            Self::DeviceNGnRnE | Self::DeviceNGnRE | Self::DeviceNGRE | Self::DeviceGRE
        )
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNGnRnE => f.write_str("Device-nGnRnE"),
            Self::DeviceNGnRE => f.write_str("Device-nGnRE"),
            Self::DeviceNGRE => f.write_str("Device-nGRE"),
            Self::DeviceGRE => f.write_str("Device-GRE"),
            Self::NormalNonCacheable => f.write_str("Normal non-cacheable"),
            Self::NormalWriteBack => f.write_str("Normal write-back"),
            Self::NormalWriteThrough => f.write_str("Normal write-through"),
            Self::Other(attr) => write!(f, "attribute 0x{attr:02X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_bytes_follow_index() {
        let mair = MairEl1::new().with_attr3(0x0C).with_attr7(0xBB);
        assert_eq!(mair.attribute(3), Some(0x0C));
        assert_eq!(mair.attribute(7), Some(0xBB));
        assert_eq!(mair.attribute(8), None);
        assert_eq!(mair.memory_type(7), Some(MemoryType::NormalWriteThrough));
        assert!(MemoryType::from_attribute(0x04).is_device());
        assert_eq!(MemoryType::from_attribute(0x4F), MemoryType::Other(0x4F));
    }
}
