//! # Permission Interpretation
//!
//! Turns the raw `AP`, `XN`, `PXN`, `AF`, `SH` and `AttrIndx` fields of a
//! descriptor into closed classifications. Encodings without a meaning keep
//! their raw value in an `Unknown` variant.

use crate::descriptor::{Descriptor, Permissions};
use core::fmt;
use mmu_registers::{MairEl1, MemoryType};

/// Data access permissions from `AP[2:1]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AccessClass {
    /// `AP = 0b00`.
    PrivilegedReadWrite,
    /// `AP = 0b01`.
    ReadWriteAll,
    /// `AP = 0b10`.
    PrivilegedReadOnly,
    /// `AP = 0b11`.
    ReadOnlyAll,
    Unknown(u8),
}

impl AccessClass {
    #[must_use]
    pub const fn from_ap(ap: u8) -> Self {
        match ap {
            0b00 => Self::PrivilegedReadWrite,
            0b01 => Self::ReadWriteAll,
            0b10 => Self::PrivilegedReadOnly,
            0b11 => Self::ReadOnlyAll,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for AccessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivilegedReadWrite => f.write_str("privileged read-write only"),
            Self::ReadWriteAll => f.write_str("read-write at all levels"),
            Self::PrivilegedReadOnly => f.write_str("privileged read-only"),
            Self::ReadOnlyAll => f.write_str("read-only at all levels"),
            Self::Unknown(ap) => write!(f, "unknown access permissions ({ap:#04b})"),
        }
    }
}

/// Shareability from `SH[1:0]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Shareability {
    NonShareable,
    Reserved,
    OuterShareable,
    InnerShareable,
    Unknown(u8),
}

impl Shareability {
    #[must_use]
    pub const fn from_sh(sh: u8) -> Self {
        match sh {
            0b00 => Self::NonShareable,
            0b01 => Self::Reserved,
            0b10 => Self::OuterShareable,
            0b11 => Self::InnerShareable,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for Shareability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonShareable => f.write_str("non-shareable"),
            Self::Reserved => f.write_str("reserved"),
            Self::OuterShareable => f.write_str("outer-shareable"),
            Self::InnerShareable => f.write_str("inner-shareable"),
            Self::Unknown(sh) => write!(f, "unknown shareability ({sh:#04b})"),
        }
    }
}

/// Whether code may be fetched from the mapping at one privilege level.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Executability {
    Executable,
    NotExecutable,
}

impl Executability {
    #[must_use]
    pub const fn from_never_bit(never: bool) -> Self {
        if never {
            Self::NotExecutable
        } else {
            Self::Executable
        }
    }
}

impl fmt::Display for Executability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Executable => "executable",
            Self::NotExecutable => "not executable",
        })
    }
}

/// Human-readable interpretation of a descriptor's permission fields.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PermissionSummary {
    pub access: AccessClass,
    /// From `XN`.
    pub execute: Executability,
    /// From `PXN`.
    pub privileged_execute: Executability,
    /// From `AF`.
    pub accessed: bool,
    pub shareability: Shareability,
    /// `AttrIndx`, an index into `MAIR_EL1`.
    pub memory_type_index: u8,
}

impl PermissionSummary {
    /// Resolve the memory type through `MAIR_EL1`.
    #[must_use]
    pub const fn memory_type(&self, mair: MairEl1) -> Option<MemoryType> {
        mair.memory_type(self.memory_type_index)
    }
}

impl From<Permissions> for PermissionSummary {
    fn from(p: Permissions) -> Self {
        Self {
            access: AccessClass::from_ap(p.ap),
            execute: Executability::from_never_bit(p.xn),
            privileged_execute: Executability::from_never_bit(p.pxn),
            accessed: p.af,
            shareability: Shareability::from_sh(p.sh),
            memory_type_index: p.attr_index,
        }
    }
}

impl fmt::Display for PermissionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, privileged {}, {}, {}, AttrIndx {}",
            self.access,
            self.execute,
            self.privileged_execute,
            if self.accessed {
                "accessed"
            } else {
                "not accessed"
            },
            self.shareability,
            self.memory_type_index
        )
    }
}

/// Interpret the permission fields of `descriptor`.
///
/// ```rust
/// # use mmu_walk::{describe, AccessClass, Descriptor, Executability};
/// # use mmu_addresses::Level;
/// let page = Descriptor::decode(0x0040_0000_4100_04C3_u64.into(), Level::L3);
/// let summary = describe(&page);
/// assert_eq!(summary.access, AccessClass::ReadOnlyAll);
/// assert_eq!(summary.execute, Executability::NotExecutable);
/// assert!(summary.accessed);
/// ```
#[must_use]
pub fn describe(descriptor: &Descriptor) -> PermissionSummary {
    PermissionSummary::from(descriptor.permissions)
}
