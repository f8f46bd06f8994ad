//! Address map: which device answers at which 24-bit address.
//!
//! A [`Region`] is a rectangle of bank range × in-bank offset range. The bus
//! searches its region list in order and the first region containing the
//! address wins; regions are kept disjoint so the order only matters for
//! speed (hot regions go first).

use crate::bits::{concat24, split24, Address};
use crate::cartridge::MapType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Wram,
    Sram,
    Rom,
    /// Index into the bus's attached peripheral list.
    Mmio(usize),
}

/// How an address inside a region becomes a device-local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translate {
    /// Banks are laid end to end, each contributing only the window's offsets.
    Packed,
    /// Every bank contributes a full 64 KiB and the offset is kept as is.
    Absolute,
    /// Only the position inside the window counts; every bank sees the same bytes.
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub banks: (u8, u8),
    pub offsets: (u16, u16),
    pub device: DeviceKind,
    pub translate: Translate,
    /// Added to the translated offset.
    pub base: u32,
}

impl Region {
    pub const fn new(
        banks: (u8, u8),
        offsets: (u16, u16),
        device: DeviceKind,
        translate: Translate,
    ) -> Self {
        Region {
            banks,
            offsets,
            device,
            translate,
            base: 0,
        }
    }

    pub const fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }

    pub fn start(&self) -> Address {
        concat24(self.banks.0, self.offsets.0)
    }

    pub fn end(&self) -> Address {
        concat24(self.banks.1, self.offsets.1)
    }

    #[inline]
    pub fn contains(&self, address: Address) -> bool {
        let (bank, offset) = split24(address);
        (self.banks.0..=self.banks.1).contains(&bank)
            && (self.offsets.0..=self.offsets.1).contains(&offset)
    }

    /// Device-local offset for an address this region contains.
    #[inline]
    pub fn translate(&self, address: Address) -> u32 {
        let (bank, offset) = split24(address);
        let bank_index = bank.wrapping_sub(self.banks.0) as u32;
        let window_index = offset.wrapping_sub(self.offsets.0) as u32;
        let local = match self.translate {
            Translate::Packed => {
                let window_len = (self.offsets.1 - self.offsets.0) as u32 + 1;
                bank_index * window_len + window_index
            }
            Translate::Absolute => bank_index * 0x10000 + offset as u32,
            Translate::Mirror => window_index,
        };
        self.base.wrapping_add(local)
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.banks.0 <= other.banks.1
            && other.banks.0 <= self.banks.1
            && self.offsets.0 <= other.offsets.1
            && other.offsets.0 <= self.offsets.1
    }
}

const SYSTEM_BANKS: [(u8, u8); 2] = [(0x00, 0x3F), (0x80, 0xBF)];

fn wram_regions(regions: &mut Vec<Region>) {
    regions.push(Region::new(
        (0x7E, 0x7F),
        (0x0000, 0xFFFF),
        DeviceKind::Wram,
        Translate::Packed,
    ));
    for banks in SYSTEM_BANKS {
        regions.push(Region::new(
            banks,
            (0x0000, 0x1FFF),
            DeviceKind::Wram,
            Translate::Mirror,
        ));
    }
}

/// Standard address map for a cartridge layout.
///
/// `$2000-$5FFF` of the system banks stays unmapped so peripheral chips can be
/// attached there. SRAM windows are only mapped when the cartridge has SRAM.
pub fn standard_map(map_type: MapType, has_sram: bool) -> Vec<Region> {
    let mut regions = Vec::with_capacity(12);
    wram_regions(&mut regions);

    match map_type {
        MapType::LoRom => {
            regions.push(Region::new(
                (0x00, 0x7D),
                (0x8000, 0xFFFF),
                DeviceKind::Rom,
                Translate::Packed,
            ));
            regions.push(Region::new(
                (0x80, 0xFF),
                (0x8000, 0xFFFF),
                DeviceKind::Rom,
                Translate::Packed,
            ));
            if has_sram {
                for banks in [(0x70, 0x7D), (0xF0, 0xFF)] {
                    regions.push(Region::new(
                        banks,
                        (0x0000, 0x7FFF),
                        DeviceKind::Sram,
                        Translate::Packed,
                    ));
                }
            }
        }
        MapType::HiRom | MapType::ExHiRom => {
            // ExHiROM puts the first 4 MiB in the upper banks and the
            // remainder in the lower ones.
            let (low_base, high_base) = if map_type == MapType::ExHiRom {
                (0x400000, 0)
            } else {
                (0, 0)
            };
            regions.push(
                Region::new((0x00, 0x3F), (0x8000, 0xFFFF), DeviceKind::Rom, Translate::Absolute)
                    .with_base(low_base),
            );
            regions.push(
                Region::new((0x40, 0x7D), (0x0000, 0xFFFF), DeviceKind::Rom, Translate::Absolute)
                    .with_base(low_base),
            );
            regions.push(
                Region::new((0x80, 0xBF), (0x8000, 0xFFFF), DeviceKind::Rom, Translate::Absolute)
                    .with_base(high_base),
            );
            regions.push(
                Region::new((0xC0, 0xFF), (0x0000, 0xFFFF), DeviceKind::Rom, Translate::Absolute)
                    .with_base(high_base),
            );
            if has_sram {
                for banks in [(0x20, 0x3F), (0xA0, 0xBF)] {
                    regions.push(Region::new(
                        banks,
                        (0x6000, 0x7FFF),
                        DeviceKind::Sram,
                        Translate::Packed,
                    ));
                }
            }
        }
        MapType::Invalid => {}
    }

    regions
}

/// First pair of overlapping regions, if any.
pub fn find_overlap(regions: &[Region]) -> Option<(Region, Region)> {
    for (i, a) in regions.iter().enumerate() {
        for b in &regions[i + 1..] {
            if a.overlaps(b) {
                return Some((*a, *b));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(regions: &[Region], address: Address) -> Option<(DeviceKind, u32)> {
        regions
            .iter()
            .find(|r| r.contains(address))
            .map(|r| (r.device, r.translate(address)))
    }

    #[test]
    fn standard_maps_are_disjoint() {
        for ty in [MapType::LoRom, MapType::HiRom, MapType::ExHiRom, MapType::Invalid] {
            for sram in [false, true] {
                assert_eq!(find_overlap(&standard_map(ty, sram)), None, "{:?}", ty);
            }
        }
    }

    #[test]
    fn lorom_translation() {
        let map = standard_map(MapType::LoRom, true);
        assert_eq!(resolve(&map, 0x008000), Some((DeviceKind::Rom, 0x0000)));
        assert_eq!(resolve(&map, 0x01FFFF), Some((DeviceKind::Rom, 0xFFFF)));
        assert_eq!(resolve(&map, 0x808000), Some((DeviceKind::Rom, 0x0000)));
        assert_eq!(resolve(&map, 0x700010), Some((DeviceKind::Sram, 0x0010)));
        assert_eq!(resolve(&map, 0x002000), None);
    }

    #[test]
    fn hirom_translation() {
        let map = standard_map(MapType::HiRom, false);
        assert_eq!(resolve(&map, 0x00FFC0), Some((DeviceKind::Rom, 0xFFC0)));
        assert_eq!(resolve(&map, 0xC00000), Some((DeviceKind::Rom, 0x0000)));
        assert_eq!(resolve(&map, 0x418000), Some((DeviceKind::Rom, 0x18000)));
        assert_eq!(resolve(&map, 0x206000), None);
    }

    #[test]
    fn exhirom_low_banks_are_offset() {
        let map = standard_map(MapType::ExHiRom, false);
        assert_eq!(resolve(&map, 0x008000), Some((DeviceKind::Rom, 0x408000)));
        assert_eq!(resolve(&map, 0xC00000), Some((DeviceKind::Rom, 0x000000)));
    }

    #[test]
    fn wram_mirror_and_full_window() {
        let map = standard_map(MapType::Invalid, false);
        assert_eq!(resolve(&map, 0x7E0000), Some((DeviceKind::Wram, 0x00000)));
        assert_eq!(resolve(&map, 0x7F0001), Some((DeviceKind::Wram, 0x10001)));
        assert_eq!(resolve(&map, 0x001234), Some((DeviceKind::Wram, 0x1234)));
        assert_eq!(resolve(&map, 0xBF1FFF), Some((DeviceKind::Wram, 0x1FFF)));
        assert_eq!(resolve(&map, 0x008000), None);
    }
}
