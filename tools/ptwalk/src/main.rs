//! Inspect AArch64 stage-1 translation tables in a physical memory image.
//!
//! The image is a raw dump of physical memory starting at `--base`; register
//! values are given on the command line.

mod args;
mod error;
mod logger;
mod report;

use crate::args::{Command, Options};
use crate::error::CliError;
use crate::report::{TreeReport, WalkReport};
use clap::Parser;
use mmu_registers::{MairEl1, SystemRegister};
use mmu_walk::{
    EnumerationLimits, MemoryImage, MemoryReader, RegisterSnapshot, TableWalker, WalkResult,
};
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

/// Bytes read at a translated address to show that it is backed.
const VERIFY_LEN: usize = 4;

fn main() -> ExitCode {
    let options = Options::parse();
    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ptwalk: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(options: Options) -> Result<(), CliError> {
    logger::init().map_err(CliError::Logger)?;

    let bytes = fs::read(&options.image).map_err(|source| CliError::ReadImage {
        path: options.image.clone(),
        source,
    })?;
    log::info!(
        "loaded {} bytes from {} at {}",
        bytes.len(),
        options.image.display(),
        options.base
    );

    let mut image = MemoryImage::new(options.base, bytes);
    for (register, value) in options.registers.iter() {
        image.set_register(register, value);
    }

    let mut out = io::stdout().lock();
    let mair = image.register(SystemRegister::MairEl1).map(MairEl1::from_bits);

    match options.command {
        Command::Walk { va } => {
            let mut walker = TableWalker::new(&mut image).with_sink(WalkReport::new(&mut out, mair));
            let result = walker.walk_from_registers(va)?;
            let (_, report) = walker.into_parts();
            report.finish()?;
            verify(&mut image, &result, &mut out)?;
        }
        Command::WalkPc => {
            let mut walker = TableWalker::new(&mut image).with_sink(WalkReport::new(&mut out, mair));
            let (pc, result) = walker.walk_current_pc()?;
            let (_, report) = walker.into_parts();
            report.finish()?;
            log::debug!("walked PC {pc}");
            verify(&mut image, &result, &mut out)?;
        }
        Command::Trace { va } => {
            let mut walker = TableWalker::new(&mut image).with_sink(TreeReport::new(&mut out, mair));
            let node = walker.trace(va)?;
            let (_, report) = walker.into_parts();
            report.finish()?;
            log::info!("traced {va} down to {}", node.deepest_level());
        }
        Command::Dump { max_entries } => {
            let mut walker = TableWalker::new(&mut image).with_sink(TreeReport::new(&mut out, mair));
            let dump = walker.dump_address_spaces(EnumerationLimits::new(max_entries));
            let (_, report) = walker.into_parts();
            report.finish()?;
            for (name, tree) in [("user", &dump.user), ("kernel", &dump.kernel)] {
                match tree {
                    Some(tree) => log::info!("{name} tree: {} entries", tree.total_entries()),
                    None => writeln!(out, "{name} tree unavailable")?,
                }
            }
        }
        Command::Regs => {
            let snapshot = RegisterSnapshot::capture(&mut image);
            report::write_registers(&mut out, &snapshot)?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Read a few bytes at the translated address. Failure is reported, not fatal.
fn verify<R: MemoryReader, W: Write>(
    reader: &mut R,
    result: &WalkResult,
    out: &mut W,
) -> Result<(), CliError> {
    let Some(physical_address) = result.physical_address() else {
        return Ok(());
    };
    let mut bytes = [0u8; VERIFY_LEN];
    let read = reader
        .read_physical(physical_address, &mut bytes)
        .map(|()| &bytes[..]);
    report::write_verification(out, physical_address, read)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmu_addresses::{PhysicalAddress, VirtualAddress};

    /// L0 at 0x1000 -> L1 at 0x2000 with a 1 GiB block for VA 0 at PA 0.
    fn image() -> MemoryImage {
        let mut image = MemoryImage::zeroed(PhysicalAddress::new(0), 0x1_0000)
            .with_register(SystemRegister::Ttbr0El1, 0x1000);
        image.write_u64(PhysicalAddress::new(0x1000), 0x2003).unwrap();
        image.write_u64(PhysicalAddress::new(0x2000), 0x0000_0000_0000_0401).unwrap();
        image.write_u64(PhysicalAddress::new(0x8000), 0xEFBE_ADDE).unwrap();
        image
    }

    fn walk_and_verify(image: &mut MemoryImage, va: u64) -> String {
        let result = TableWalker::new(&mut *image)
            .walk_from_registers(VirtualAddress::new(va))
            .unwrap();
        let mut out = Vec::new();
        verify(image, &result, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn verification_reads_the_translated_address() {
        let mut image = image();
        assert_eq!(
            walk_and_verify(&mut image, 0x8000),
            "  verify: 4 bytes at 0x0000000000008000: de ad be ef\n"
        );
    }

    #[test]
    fn unreadable_target_is_reported_not_fatal() {
        let mut image = image();
        image.mark_unreadable(PhysicalAddress::new(0x9000), 0x1000);
        let out = walk_and_verify(&mut image, 0x9004);
        assert!(
            out.starts_with("  verify: cannot read 0x0000000000009004: "),
            "{out}"
        );
    }

    #[test]
    fn faults_are_not_verified() {
        let mut image = image();
        assert!(walk_and_verify(&mut image, 0x4000_0000).is_empty());
    }
}
