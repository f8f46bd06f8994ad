use super::*;
use crate::cartridge::tests::build_image;

use std::cell::Cell;
use std::rc::Rc;

struct Latch {
    value: u8,
    reads: Rc<Cell<u32>>,
}

impl MemoryDevice for Latch {
    fn read_byte(&mut self, _offset: u32) -> u8 {
        self.reads.set(self.reads.get() + 1);
        self.value
    }

    fn write_byte(&mut self, _offset: u32, value: u8) {
        self.value = value;
    }

    fn peek_byte(&self, _offset: u32) -> u8 {
        self.value
    }

    fn reset(&mut self) {
        self.value = 0;
    }
}

fn lorom_bus() -> Bus {
    let mut bus = Bus::new();
    let ty = bus
        .load_rom_bytes(build_image(0x7FC0, 0x20, "BUS TEST"))
        .unwrap();
    assert_eq!(ty, MapType::LoRom);
    bus
}

#[test]
fn wram_round_trips_all_widths() {
    let mut bus = Bus::new();
    bus.write8(0x7E0100, 0x5A);
    bus.write16(0x7E0200, 0xBEEF);
    bus.write24(0x7E0300, 0x123456);
    assert_eq!(bus.read8(0x7E0100), 0x5A);
    assert_eq!(bus.read16(0x7E0200), 0xBEEF);
    assert_eq!(bus.read24(0x7E0300), 0x123456);
    // little-endian layout
    assert_eq!(bus.read8(0x7E0200), 0xEF);
    assert_eq!(bus.read8(0x7E0302), 0x12);
}

#[test]
fn low_wram_is_mirrored_in_system_banks() {
    let mut bus = Bus::new();
    bus.write8(0x7E0010, 0x42);
    assert_eq!(bus.read8(0x000010), 0x42);
    assert_eq!(bus.read8(0x800010), 0x42);
    bus.write8(0xBF1FFF, 0x99);
    assert_eq!(bus.read8(0x7E1FFF), 0x99);
}

#[test]
fn read24_resolves_each_byte_to_its_owner() {
    let regions = vec![
        Region::new((0x7E, 0x7F), (0x0000, 0xFFFF), DeviceKind::Wram, Translate::Packed),
        Region::new((0x80, 0xFF), (0x0000, 0xFFFF), DeviceKind::Rom, Translate::Packed),
    ];
    let mut bus = Bus::with_memory(MemoryMap::with_regions(regions).unwrap());

    let mut image = vec![0u8; 0x8000];
    image[0] = 0xCC;
    image[1] = 0xDD;
    bus.load_rom_bytes(image).unwrap();

    bus.write8(0x7FFFFF, 0xAA);
    assert_eq!(bus.memory.resolve(0x7FFFFF), Some((DeviceKind::Wram, 0x1FFFF)));
    assert_eq!(bus.memory.resolve(0x800000), Some((DeviceKind::Rom, 0)));
    assert_eq!(bus.read24(0x7FFFFF), 0xDDCCAA);
}

#[test]
fn multi_byte_write_straddles_devices() {
    let mut bus = Bus::new();
    // 7F:FFFF is the last WRAM byte, 80:0000 mirrors the first.
    bus.write16(0x7FFFFF, 0xBEEF);
    assert_eq!(bus.read8(0x7FFFFF), 0xEF);
    assert_eq!(bus.read8(0x7E0000), 0xBE);
}

#[test]
fn unmapped_reads_fill_and_writes_vanish() {
    let mut bus = Bus::new();
    bus.write8(0x002000, 0x77);
    assert_eq!(bus.read8(0x002000), UNMAPPED_READ_VALUE);
    assert_eq!(bus.memory.resolve(0x002000), None);
    // no cartridge: ROM space is unmapped too
    assert_eq!(bus.read16(0x00FFFC), 0x0000);
}

#[test]
fn mmio_attach_and_overlap_rejection() {
    let mut bus = Bus::new();
    let reads = Rc::new(Cell::new(0));
    let index = bus
        .attach_mmio(
            (0x00, 0x3F),
            (0x2100, 0x21FF),
            Box::new(Latch {
                value: 0x11,
                reads: Rc::clone(&reads),
            }),
        )
        .unwrap();
    assert_eq!(index, 0);

    assert_eq!(bus.read8(0x3F2140), 0x11);
    bus.write8(0x002100, 0x22);
    assert_eq!(bus.peek8(0x002180), 0x22);
    assert_eq!(reads.get(), 1, "peek must not count as a read");

    let err = bus
        .attach_mmio(
            (0x00, 0x00),
            (0x0000, 0x0100),
            Box::new(Latch {
                value: 0,
                reads: Rc::new(Cell::new(0)),
            }),
        )
        .unwrap_err();
    assert_eq!(
        err,
        BusError::Overlap {
            start: 0x000000,
            end: 0x000100
        }
    );
}

#[test]
fn mmio_survives_cartridge_load() {
    let mut bus = Bus::new();
    bus.attach_mmio(
        (0x00, 0x3F),
        (0x4200, 0x42FF),
        Box::new(Latch {
            value: 0x5C,
            reads: Rc::new(Cell::new(0)),
        }),
    )
    .unwrap();
    bus.load_rom_bytes(build_image(0x7FC0, 0x20, "MMIO")).unwrap();
    assert_eq!(bus.peek8(0x004210), 0x00, "reset clears the latch");
    bus.write8(0x004210, 0x33);
    assert_eq!(bus.read8(0x004210), 0x33);
}

#[test]
fn custom_overlapping_layout_is_rejected() {
    let regions = vec![
        Region::new((0x00, 0x10), (0x0000, 0xFFFF), DeviceKind::Wram, Translate::Packed),
        Region::new((0x10, 0x20), (0x8000, 0xFFFF), DeviceKind::Rom, Translate::Packed),
    ];
    assert!(matches!(
        MemoryMap::with_regions(regions),
        Err(BusError::Overlap { .. })
    ));
}

#[test]
fn lorom_cartridge_is_mapped_and_reset_uses_its_vector() {
    let bus = lorom_bus();
    assert_eq!(bus.peek8(0x00FFC0), b'B');
    assert_eq!(bus.peek8(0x80FFC0), b'B');
    assert_eq!(bus.peek16(0x00FFFC), 0x8000);
    assert_eq!(bus.cpu.pc, 0x8000);
    assert_eq!(bus.cpu.pbr, 0);
    assert!(bus.cpu.using_emulation_mode());
}

#[test]
fn reset_clears_wram_and_keeps_rom_and_sram() {
    let mut bus = lorom_bus();
    let rom_before = bus.memory.rom().as_slice().to_vec();

    bus.write8(0x7E1234, 0xAB);
    bus.write8(0x700000, 0xCD);
    bus.write8(0x008000, 0xEE); // ROM write is ignored
    bus.cpu.x.force_store_full(0x1234);
    bus.cpu.sp = 0x1FF0;

    bus.reset();

    assert!(bus.memory.wram().as_slice().iter().all(|&b| b == 0));
    assert_eq!(bus.read8(0x700000), 0xCD);
    assert_eq!(bus.memory.rom().as_slice(), &rom_before[..]);
    assert_eq!(bus.cpu.x.force_load_full(), 0);
    assert_eq!(bus.cpu.sp, 0x01FF);
    assert_eq!(bus.cpu.pc, 0x8000);
}

#[test]
fn close_rom_unmaps_cartridge() {
    let mut bus = lorom_bus();
    bus.close_rom();
    assert_eq!(bus.memory.rom().map_type(), MapType::Invalid);
    assert_eq!(bus.read8(0x00FFC0), UNMAPPED_READ_VALUE);
    assert_eq!(bus.memory.sram().len(), 0);
    assert_eq!(bus.cpu.pc, 0x0000);
}

#[test]
fn invalid_rom_does_not_reset() {
    let mut bus = Bus::new();
    bus.cpu.pc = 0x1234;
    let ty = bus.load_rom_bytes(vec![0u8; 0x8000]).unwrap();
    assert_eq!(ty, MapType::Invalid);
    assert_eq!(bus.cpu.pc, 0x1234);
    assert_eq!(bus.read8(0x008000), UNMAPPED_READ_VALUE);
}

#[test]
fn execute_runs_from_wram_through_the_map() {
    let mut bus = Bus::new();
    // LDA #$42 ; STA $10
    for (i, b) in [0xA9, 0x42, 0x85, 0x10].iter().enumerate() {
        bus.write8(0x000200 + i as u32, *b);
    }
    bus.cpu.pc = 0x0200;
    bus.execute();
    bus.execute();
    assert_eq!(bus.read8(0x7E0010), 0x42);
}
