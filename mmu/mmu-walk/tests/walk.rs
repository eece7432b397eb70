mod common;

use common::{Event, L0_TABLE, L1_TABLE, L2_TABLE, L3_TABLE, Recorder, block, image, page, put, table};
use mmu_addresses::{Level, PhysicalAddress, VirtualAddress};
use mmu_registers::{SystemRegister, Ttbr};
use mmu_walk::{
    AccessClass, DescriptorAnomaly, DescriptorKind, FaultReason, MappingSize, MemoryImage,
    MemoryReadError, TableWalker, WalkError, WalkResult, describe,
};

/// `0x0820_195C`: L0 0, L1 0, L2 65, L3 1, offset `0x95C`.
const PAGE_VA: u64 = 0x0000_0000_0820_195C;

fn four_level_image() -> MemoryImage {
    let mut image = image();
    put(&mut image, L0_TABLE, 0, table(L1_TABLE));
    put(&mut image, L1_TABLE, 0, table(L2_TABLE));
    put(&mut image, L2_TABLE, 65, table(L3_TABLE));
    put(&mut image, L3_TABLE, 1, page(0x4100_0000));
    image
}

fn ttbr(value: u64) -> Ttbr {
    Ttbr::from_bits(value)
}

#[test_log::test]
fn four_level_walk_ends_at_page() {
    let mut image = four_level_image();
    let result = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(L0_TABLE),
        ttbr(0),
    );

    let WalkResult::Mapped {
        physical_address,
        size,
        path,
    } = result
    else {
        panic!("expected a mapping");
    };
    assert_eq!(physical_address, PhysicalAddress::new(0x4100_095C));
    assert_eq!(size, MappingSize::Page4K);

    let levels: Vec<_> = path.iter().map(|step| step.level).collect();
    assert_eq!(levels, Level::ALL);
    let addresses: Vec<_> = path.iter().map(|step| step.entry_address.as_u64()).collect();
    assert_eq!(addresses, [0x1000, 0x2000, 0x3208, 0x4008]);
    assert_eq!(path[2].index.as_u16(), 65);

    let leaf = path[3].descriptor;
    assert_eq!(leaf.kind, DescriptorKind::Page);
    let summary = describe(&leaf);
    assert_eq!(summary.access, AccessClass::ReadWriteAll);
    assert!(summary.accessed);
}

#[test]
fn level1_block_keeps_low_30_bits() {
    let mut image = image();
    put(&mut image, L0_TABLE, 0, table(L1_TABLE));
    put(&mut image, L1_TABLE, 4, 0x0000_0000_4000_0601);

    let va = VirtualAddress::new(0x1_2345_6789);
    let result = TableWalker::new(&mut image).walk(va, ttbr(L0_TABLE), ttbr(0));

    assert_eq!(
        result.physical_address(),
        Some(PhysicalAddress::new(0x4000_0000 | (0x1_2345_6789 & 0x3FFF_FFFF)))
    );
    assert_eq!(result.path().len(), 2);
    assert_eq!(result.path()[1].descriptor.kind, DescriptorKind::Block);
}

#[test]
fn level2_block_keeps_low_21_bits() {
    let mut image = image();
    put(&mut image, L0_TABLE, 0, table(L1_TABLE));
    put(&mut image, L1_TABLE, 0, table(L2_TABLE));
    put(&mut image, L2_TABLE, 65, block(0x4020_0000));

    let result = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(L0_TABLE),
        ttbr(0),
    );
    assert_eq!(result.physical_address(), Some(PhysicalAddress::new(0x4020_195C)));
    assert!(matches!(
        result,
        WalkResult::Mapped {
            size: MappingSize::Block2M,
            ..
        }
    ));
}

#[test]
fn invalid_level0_entry_faults_with_one_step() {
    let mut image = image();
    let result = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(L0_TABLE),
        ttbr(0),
    );

    let fault = result.fault().copied().expect("walk must fault");
    assert_eq!(fault.level, Level::L0);
    assert_eq!(fault.reason, FaultReason::InvalidEntry);
    assert_eq!(fault.entry_address, PhysicalAddress::new(L0_TABLE));
    assert_eq!(result.path().len(), 1);
    assert_eq!(result.path()[0].descriptor.kind, DescriptorKind::Invalid);
}

#[test]
fn invalid_level3_entry_faults_after_full_path() {
    let mut image = four_level_image();
    put(&mut image, L3_TABLE, 1, 0);

    let result = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(L0_TABLE),
        ttbr(0),
    );
    let fault = result.fault().copied().expect("walk must fault");
    assert_eq!(fault.level, Level::L3);
    assert_eq!(fault.entry_address, PhysicalAddress::new(0x4008));
    assert_eq!(result.path().len(), 4);
}

#[test_log::test]
fn unreadable_level2_table_faults_at_level2() {
    let mut image = image();
    put(&mut image, L0_TABLE, 0, table(L1_TABLE));
    put(&mut image, L1_TABLE, 0, table(0x8000_0000));

    let result = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(L0_TABLE),
        ttbr(0),
    );

    let entry_address = PhysicalAddress::new(0x8000_0000 + 65 * 8);
    let fault = result.fault().copied().expect("walk must fault");
    assert_eq!(fault.level, Level::L2);
    assert_eq!(fault.entry_address, entry_address);
    assert_eq!(
        fault.reason,
        FaultReason::UnreadableMemory(MemoryReadError::OutOfBounds {
            address: entry_address,
            length: 8
        })
    );
    let levels: Vec<_> = result.path().iter().map(|step| step.level).collect();
    assert_eq!(levels, [Level::L0, Level::L1]);
}

#[test]
fn transport_failure_is_unreadable_memory() {
    let mut image = four_level_image();
    image.mark_unreadable(PhysicalAddress::new(0x4008), 8);

    let result = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(L0_TABLE),
        ttbr(0),
    );
    let fault = result.fault().copied().expect("walk must fault");
    assert_eq!(fault.level, Level::L3);
    assert!(matches!(
        fault.reason,
        FaultReason::UnreadableMemory(MemoryReadError::Transport { .. })
    ));
    assert_eq!(result.path().len(), 3);
}

#[test]
fn kernel_addresses_walk_from_ttbr1() {
    let mut image = image();
    put(&mut image, 0x5000, 256, table(0x6000));
    put(&mut image, 0x6000, 0, block(0x4000_0000));

    let va = VirtualAddress::new(0xFFFF_8000_0012_3456);
    let result = TableWalker::new(&mut image).walk(va, ttbr(L0_TABLE), ttbr(0x5000));
    assert_eq!(result.physical_address(), Some(PhysicalAddress::new(0x4012_3456)));
    assert_eq!(result.path()[0].entry_address, PhysicalAddress::new(0x5800));
}

#[test]
fn asid_and_cnp_bits_do_not_move_the_root() {
    let mut image = four_level_image();
    let plain = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(L0_TABLE),
        ttbr(0),
    );
    let tagged = TableWalker::new(&mut image).walk(
        VirtualAddress::new(PAGE_VA),
        ttbr(0x00A5_0000_0000_1001),
        ttbr(0),
    );
    assert_eq!(plain, tagged);
}

#[test]
fn walking_from_registers_needs_only_the_selecting_base() {
    let mut image = four_level_image().with_register(SystemRegister::Ttbr0El1, L0_TABLE);
    let result = TableWalker::new(&mut image)
        .walk_from_registers(VirtualAddress::new(PAGE_VA))
        .expect("TTBR0_EL1 is set");
    assert_eq!(result.physical_address(), Some(PhysicalAddress::new(0x4100_095C)));
}

#[test]
fn missing_base_register_aborts_without_reading_memory() {
    let mut image = four_level_image().with_register(SystemRegister::Ttbr1El1, 0x5000);
    let err = TableWalker::new(&mut image)
        .walk_from_registers(VirtualAddress::new(PAGE_VA))
        .expect_err("TTBR0_EL1 is not set");
    assert_eq!(err.register, SystemRegister::Ttbr0El1);
    assert_eq!(image.reads(), 0);
}

#[test]
fn current_pc_is_walked() {
    let mut image = four_level_image()
        .with_register(SystemRegister::Pc, PAGE_VA)
        .with_register(SystemRegister::Ttbr0El1, L0_TABLE);
    let (pc, result) = TableWalker::new(&mut image)
        .walk_current_pc()
        .expect("registers are set");
    assert_eq!(pc, VirtualAddress::new(PAGE_VA));
    assert!(result.is_mapped());

    let mut bare = four_level_image();
    let err = TableWalker::new(&mut bare).walk_current_pc().unwrap_err();
    assert_eq!(err.register, SystemRegister::Pc);
}

#[test]
fn translate_collapses_outcomes_into_errors() {
    let mut image = four_level_image()
        .with_register(SystemRegister::Ttbr0El1, L0_TABLE)
        .with_register(SystemRegister::Ttbr1El1, 0x5000);
    let mut walker = TableWalker::new(&mut image);

    assert_eq!(
        walker.translate(VirtualAddress::new(PAGE_VA)),
        Ok(PhysicalAddress::new(0x4100_095C))
    );
    assert!(matches!(
        walker.translate(VirtualAddress::new(0x1000_0000)),
        Err(WalkError::Fault(fault)) if fault.level == Level::L2
    ));

    let mut bare = MemoryImage::default();
    assert!(matches!(
        TableWalker::new(&mut bare).translate(VirtualAddress::zero()),
        Err(WalkError::RegisterUnavailable(_))
    ));
}

#[test]
fn sink_sees_each_entry_in_level_order_then_the_result() {
    let mut image = four_level_image();
    let mut recorder = Recorder::default();
    let va = VirtualAddress::new(PAGE_VA);

    TableWalker::new(&mut image)
        .with_sink(&mut recorder)
        .walk(va, ttbr(L0_TABLE), ttbr(0));

    assert_eq!(
        recorder.entries(),
        [
            (Level::L0, PhysicalAddress::new(0x1000)),
            (Level::L1, PhysicalAddress::new(0x2000)),
            (Level::L2, PhysicalAddress::new(0x3208)),
            (Level::L3, PhysicalAddress::new(0x4008)),
        ]
    );
    assert_eq!(recorder.events.last(), Some(&Event::WalkFinished(va, true)));
}

#[test_log::test]
fn level0_type_bit_clear_is_a_table_with_a_warning() {
    let mut image = four_level_image();
    put(&mut image, L0_TABLE, 0, L1_TABLE | 1);
    let mut recorder = Recorder::default();

    let result = TableWalker::new(&mut image)
        .with_sink(&mut recorder)
        .walk(VirtualAddress::new(PAGE_VA), ttbr(L0_TABLE), ttbr(0));

    assert!(result.is_mapped());
    assert_eq!(
        result.path()[0].descriptor.anomaly,
        Some(DescriptorAnomaly::Level0TypeBitClear)
    );
    assert!(
        recorder
            .events
            .contains(&Event::Anomaly(Level::L0, DescriptorAnomaly::Level0TypeBitClear))
    );
}

#[test]
fn unreadable_entry_is_reported_to_the_sink() {
    let mut image = image();
    put(&mut image, L0_TABLE, 0, table(0x8000_0000));
    let mut recorder = Recorder::default();

    TableWalker::new(&mut image)
        .with_sink(&mut recorder)
        .walk(VirtualAddress::new(PAGE_VA), ttbr(L0_TABLE), ttbr(0));

    assert_eq!(
        recorder.events[1..],
        [
            Event::Unreadable(Level::L1, PhysicalAddress::new(0x8000_0000)),
            Event::WalkFinished(VirtualAddress::new(PAGE_VA), false),
        ]
    );
}
