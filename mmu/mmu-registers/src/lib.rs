//! # Typed `AArch64` Translation Registers
//!
//! Bit-exact views of the system registers that control stage-1 translation
//! at EL1, plus the closed set of register names a walk may ask its memory
//! collaborator for.
//!
//! None of these types touch hardware: values are obtained from a debugger,
//! a register dump or a test fixture and decoded here.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod current_el;
pub mod mair;
pub mod sctlr;
pub mod tcr;
pub mod ttbr;

use core::fmt;

pub use crate::current_el::CurrentEl;
pub use crate::mair::{MairEl1, MemoryType};
pub use crate::sctlr::SctlrEl1;
pub use crate::tcr::{Granule, TcrEl1};
pub use crate::ttbr::Ttbr;

/// A register a walk or snapshot reads through the memory collaborator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SystemRegister {
    /// Translation table base for the lower (user) half.
    Ttbr0El1,
    /// Translation table base for the upper (kernel) half.
    Ttbr1El1,
    /// Translation control.
    TcrEl1,
    /// System control; bit 0 enables the stage-1 MMU.
    SctlrEl1,
    /// Memory attribute indirection; resolves `AttrIndx` to a memory type.
    MairEl1,
    /// Program counter of the inspected context.
    Pc,
    /// Stack pointer of the inspected context.
    Sp,
    /// Current exception level, in bits `[3:2]`.
    CurrentEl,
}

impl SystemRegister {
    /// Every register, in the order a snapshot reads them.
    pub const ALL: [Self; 8] = [
        Self::Pc,
        Self::Sp,
        Self::Ttbr0El1,
        Self::Ttbr1El1,
        Self::TcrEl1,
        Self::SctlrEl1,
        Self::MairEl1,
        Self::CurrentEl,
    ];

    /// Architectural register name, e.g. `"TTBR1_EL1"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ttbr0El1 => "TTBR0_EL1",
            Self::Ttbr1El1 => "TTBR1_EL1",
            Self::TcrEl1 => "TCR_EL1",
            Self::SctlrEl1 => "SCTLR_EL1",
            Self::MairEl1 => "MAIR_EL1",
            Self::Pc => "PC",
            Self::Sp => "SP",
            Self::CurrentEl => "CurrentEL",
        }
    }

    /// One-line description for register listings.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ttbr0El1 => "user page table base",
            Self::Ttbr1El1 => "kernel page table base",
            Self::TcrEl1 => "translation control",
            Self::SctlrEl1 => "system control",
            Self::MairEl1 => "memory attribute indirection",
            Self::Pc => "program counter",
            Self::Sp => "stack pointer",
            Self::CurrentEl => "current exception level",
        }
    }
}

impl fmt::Display for SystemRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
