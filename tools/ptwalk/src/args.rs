use clap::{Parser, Subcommand, ValueHint};
use mmu_addresses::{PhysicalAddress, VirtualAddress};
use mmu_registers::SystemRegister;
use mmu_walk::EnumerationLimits;
use std::num::ParseIntError;
use std::path::PathBuf;

/// Inspect AArch64 stage-1 translation tables in a physical memory image.
///
/// Numbers are decimal or 0x-prefixed hex; '_' separators are allowed.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Options {
    /// Raw dump of physical memory.
    #[clap(long, env = "PTWALK_IMAGE", value_hint = ValueHint::FilePath)]
    pub image: PathBuf,
    /// Physical address of the first byte of the image.
    #[clap(long, default_value = "0", value_parser = parse_physical_address)]
    pub base: PhysicalAddress,
    #[clap(flatten)]
    pub registers: RegisterValues,
    #[clap(subcommand)]
    pub command: Command,
}

/// Register values of the inspected context; unset ones read as unavailable.
#[derive(Debug, Default, clap::Args)]
pub struct RegisterValues {
    /// `TTBR0_EL1`, the user page table base.
    #[clap(long, value_parser = parse_u64)]
    pub ttbr0: Option<u64>,
    /// `TTBR1_EL1`, the kernel page table base.
    #[clap(long, value_parser = parse_u64)]
    pub ttbr1: Option<u64>,
    /// `TCR_EL1`.
    #[clap(long, value_parser = parse_u64)]
    pub tcr: Option<u64>,
    /// `SCTLR_EL1`.
    #[clap(long, value_parser = parse_u64)]
    pub sctlr: Option<u64>,
    /// `MAIR_EL1`; adds memory types to leaf entries.
    #[clap(long, value_parser = parse_u64)]
    pub mair: Option<u64>,
    #[clap(long, value_parser = parse_u64)]
    pub pc: Option<u64>,
    #[clap(long, value_parser = parse_u64)]
    pub sp: Option<u64>,
    #[clap(long, value_parser = parse_u64)]
    pub current_el: Option<u64>,
}

impl RegisterValues {
    /// The registers given on the command line.
    pub fn iter(&self) -> impl Iterator<Item = (SystemRegister, u64)> {
        [
            (SystemRegister::Ttbr0El1, self.ttbr0),
            (SystemRegister::Ttbr1El1, self.ttbr1),
            (SystemRegister::TcrEl1, self.tcr),
            (SystemRegister::SctlrEl1, self.sctlr),
            (SystemRegister::MairEl1, self.mair),
            (SystemRegister::Pc, self.pc),
            (SystemRegister::Sp, self.sp),
            (SystemRegister::CurrentEl, self.current_el),
        ]
        .into_iter()
        .filter_map(|(register, value)| Some((register, value?)))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Subcommand)]
pub enum Command {
    /// Translate VA and read four bytes at the result.
    Walk {
        #[clap(value_parser = parse_virtual_address)]
        va: VirtualAddress,
    },
    /// Translate the PC register.
    WalkPc,
    /// List every table entry on the path of VA.
    Trace {
        #[clap(value_parser = parse_virtual_address)]
        va: VirtualAddress,
    },
    /// List both translation trees.
    Dump {
        /// Entries listed per table before it is cut short.
        #[clap(long, default_value_t = EnumerationLimits::DEFAULT_MAX_ENTRIES_PER_TABLE)]
        max_entries: usize,
    },
    /// Decode the translation registers.
    Regs,
}

/// Parse a decimal or `0x`-prefixed hexadecimal number.
///
/// ```text
/// "4096" -> 4096, "0x1000" -> 4096, "0xFFFF_0000_0000_0000" -> ...
/// ```
///
/// # Errors
/// Fails on anything else, including an empty or out-of-range value.
pub fn parse_u64(text: &str) -> Result<u64, ParseIntError> {
    let text = text.trim().replace('_', "");
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    }
}

fn parse_virtual_address(text: &str) -> Result<VirtualAddress, ParseIntError> {
    parse_u64(text).map(VirtualAddress::new)
}

fn parse_physical_address(text: &str) -> Result<PhysicalAddress, ParseIntError> {
    parse_u64(text).map(PhysicalAddress::new)
}
