//! The system bus: owns the CPU and every addressable device.
//!
//! The CPU cannot borrow the bus that owns it, so the devices live in a
//! separate [`MemoryMap`] and [`Bus::execute`] lends that map to the CPU.

pub mod map;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::bits::Address;
use crate::cartridge::{MapType, Rom};
use crate::cpu::Cpu;
use crate::cpu_bus::CpuBus;
use crate::debug_flags;
use crate::error::{BusError, RomError};
use crate::memory::{MemoryDevice, Ram, WRAM_SIZE};

pub use map::{standard_map, DeviceKind, Region, Translate};

/// Value returned for reads that hit no device.
pub const UNMAPPED_READ_VALUE: u8 = 0x00;

pub const RESET_VECTOR: Address = 0x00FFFC;

struct Peripheral {
    region: Region,
    device: Box<dyn MemoryDevice>,
}

/// Devices plus the region table that routes addresses to them.
pub struct MemoryMap {
    regions: Vec<Region>,
    wram: Ram,
    sram: Ram,
    rom: Rom,
    peripherals: Vec<Peripheral>,
    /// Caller-supplied layout that replaces the standard map on every remap.
    fixed_layout: Option<Vec<Region>>,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMap {
    /// Empty machine: WRAM mapped, no cartridge.
    pub fn new() -> Self {
        MemoryMap {
            regions: standard_map(MapType::Invalid, false),
            wram: Ram::new(WRAM_SIZE),
            sram: Ram::new(0),
            rom: Rom::new(),
            peripherals: Vec::new(),
            fixed_layout: None,
        }
    }

    /// Uses a caller-supplied region table instead of the standard maps.
    /// Loading a cartridge keeps this table.
    pub fn with_regions(regions: Vec<Region>) -> Result<Self, BusError> {
        if let Some((_, b)) = map::find_overlap(&regions) {
            return Err(BusError::Overlap {
                start: b.start(),
                end: b.end(),
            });
        }
        let mut memory = Self::new();
        memory.regions = regions.clone();
        memory.fixed_layout = Some(regions);
        Ok(memory)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Maps a peripheral at `banks` × `offsets`. Every bank in the range sees
    /// the same device offsets. Returns the peripheral's index.
    pub fn attach_mmio(
        &mut self,
        banks: (u8, u8),
        offsets: (u16, u16),
        device: Box<dyn MemoryDevice>,
    ) -> Result<usize, BusError> {
        let index = self.peripherals.len();
        let region = Region::new(banks, offsets, DeviceKind::Mmio(index), Translate::Mirror);
        if self.regions.iter().any(|r| r.overlaps(&region)) {
            return Err(BusError::Overlap {
                start: region.start(),
                end: region.end(),
            });
        }
        log::debug!(
            "MMIO device {} attached at {:06X}-{:06X}",
            index,
            region.start(),
            region.end()
        );
        self.regions.push(region);
        self.peripherals.push(Peripheral { region, device });
        Ok(index)
    }

    /// Resolves an address to its device and device-local offset.
    pub fn resolve(&self, address: Address) -> Option<(DeviceKind, u32)> {
        self.regions
            .iter()
            .find(|r| r.contains(address))
            .map(|r| (r.device, r.translate(address)))
    }

    pub fn wram(&self) -> &Ram {
        &self.wram
    }

    pub fn wram_mut(&mut self) -> &mut Ram {
        &mut self.wram
    }

    pub fn sram(&self) -> &Ram {
        &self.sram
    }

    pub fn sram_mut(&mut self) -> &mut Ram {
        &mut self.sram
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    /// Clears WRAM and resets peripherals. ROM and SRAM keep their contents.
    pub fn reset(&mut self) {
        self.wram.reset();
        for p in &mut self.peripherals {
            p.device.reset();
        }
    }

    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<MapType, RomError> {
        let result = self.rom.load(path);
        self.remap();
        result
    }

    pub fn load_rom_bytes(&mut self, data: Vec<u8>) -> Result<MapType, RomError> {
        let result = self.rom.load_bytes(data);
        self.remap();
        result
    }

    pub fn unload_rom(&mut self) {
        self.rom.unload();
        self.remap();
    }

    /// Rebuilds the region table for the current cartridge. Attached
    /// peripherals keep their windows; a standard region that would overlap
    /// one is dropped.
    fn remap(&mut self) {
        let map_type = self.rom.map_type();
        self.sram.resize(self.rom.sram_size());

        let mut regions = match &self.fixed_layout {
            Some(layout) => layout.clone(),
            None => standard_map(map_type, !self.sram.is_empty()),
        };
        regions.retain(|r| {
            let clash = self.peripherals.iter().any(|p| p.region.overlaps(r));
            if clash {
                log::warn!(
                    "{:?} window {:06X}-{:06X} shadowed by an MMIO device",
                    r.device,
                    r.start(),
                    r.end()
                );
            }
            !clash
        });
        regions.extend(self.peripherals.iter().map(|p| p.region));
        self.regions = regions;

        log::info!(
            "Address map rebuilt for {:?} ({} regions, SRAM {} bytes)",
            map_type,
            self.regions.len(),
            self.sram.len()
        );
    }

    fn unmapped(&self, kind: &str, address: Address) {
        if debug_flags::unmapped() {
            log::debug!("unmapped {} at {:06X}", kind, address);
        }
    }
}

impl CpuBus for MemoryMap {
    fn read_u8(&mut self, addr: Address) -> u8 {
        match self.resolve(addr) {
            Some((DeviceKind::Wram, offset)) => self.wram.read_byte(offset),
            Some((DeviceKind::Sram, offset)) => self.sram.read_byte(offset),
            Some((DeviceKind::Rom, offset)) => self.rom.read_byte(offset),
            Some((DeviceKind::Mmio(i), offset)) => match self.peripherals.get_mut(i) {
                Some(p) => p.device.read_byte(offset),
                None => UNMAPPED_READ_VALUE,
            },
            None => {
                self.unmapped("read", addr);
                UNMAPPED_READ_VALUE
            }
        }
    }

    fn write_u8(&mut self, addr: Address, value: u8) {
        match self.resolve(addr) {
            Some((DeviceKind::Wram, offset)) => self.wram.write_byte(offset, value),
            Some((DeviceKind::Sram, offset)) => self.sram.write_byte(offset, value),
            Some((DeviceKind::Rom, offset)) => self.rom.write_byte(offset, value),
            Some((DeviceKind::Mmio(i), offset)) => {
                if let Some(p) = self.peripherals.get_mut(i) {
                    p.device.write_byte(offset, value);
                }
            }
            None => self.unmapped("write", addr),
        }
    }

    fn peek_u8(&self, addr: Address) -> u8 {
        match self.resolve(addr) {
            Some((DeviceKind::Wram, offset)) => self.wram.peek_byte(offset),
            Some((DeviceKind::Sram, offset)) => self.sram.peek_byte(offset),
            Some((DeviceKind::Rom, offset)) => self.rom.peek_byte(offset),
            Some((DeviceKind::Mmio(i), offset)) => self
                .peripherals
                .get(i)
                .map(|p| p.device.peek_byte(offset))
                .unwrap_or(UNMAPPED_READ_VALUE),
            None => UNMAPPED_READ_VALUE,
        }
    }
}

/// One CPU plus the devices it addresses.
pub struct Bus {
    pub cpu: Cpu,
    pub memory: MemoryMap,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self::with_memory(MemoryMap::new())
    }

    pub fn with_memory(memory: MemoryMap) -> Self {
        Bus {
            cpu: Cpu::new(),
            memory,
        }
    }

    pub fn write8(&mut self, address: Address, value: u8) {
        self.memory.write_u8(address, value);
    }

    pub fn write16(&mut self, address: Address, value: u16) {
        self.memory.write_u16(address, value);
    }

    pub fn write24(&mut self, address: Address, value: u32) {
        self.memory.write_u24(address, value);
    }

    pub fn read8(&mut self, address: Address) -> u8 {
        self.memory.read_u8(address)
    }

    pub fn read16(&mut self, address: Address) -> u16 {
        self.memory.read_u16(address)
    }

    pub fn read24(&mut self, address: Address) -> u32 {
        self.memory.read_u24(address)
    }

    pub fn peek8(&self, address: Address) -> u8 {
        self.memory.peek_u8(address)
    }

    pub fn peek16(&self, address: Address) -> u16 {
        self.memory.peek_u16(address)
    }

    pub fn peek24(&self, address: Address) -> u32 {
        self.memory.peek_u24(address)
    }

    pub fn attach_mmio(
        &mut self,
        banks: (u8, u8),
        offsets: (u16, u16),
        device: Box<dyn MemoryDevice>,
    ) -> Result<usize, BusError> {
        self.memory.attach_mmio(banks, offsets, device)
    }

    /// Power-on reset: WRAM cleared, CPU restarted from the reset vector.
    pub fn reset(&mut self) {
        self.memory.reset();
        let vector = self.memory.read_u16(RESET_VECTOR);
        self.cpu.reset(vector);
        log::info!("Reset: PC=00:{:04X}", vector);
    }

    /// Loads a cartridge image and resets if it was recognised.
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<MapType, RomError> {
        let map_type = self.memory.load_rom(path)?;
        self.after_load(map_type);
        Ok(map_type)
    }

    pub fn load_rom_bytes(&mut self, data: Vec<u8>) -> Result<MapType, RomError> {
        let map_type = self.memory.load_rom_bytes(data)?;
        self.after_load(map_type);
        Ok(map_type)
    }

    fn after_load(&mut self, map_type: MapType) {
        if map_type == MapType::Invalid {
            log::warn!("ROM not recognised; address map has no cartridge");
            return;
        }
        log::info!(
            "Loaded \"{}\" ({:?}, {} KiB)",
            self.memory.rom().name(),
            map_type,
            self.memory.rom().size() / 1024
        );
        self.reset();
    }

    pub fn close_rom(&mut self) {
        self.memory.unload_rom();
        self.reset();
    }

    /// Executes one instruction and returns the cycles it took.
    pub fn execute(&mut self) -> u8 {
        self.cpu.execute(&mut self.memory)
    }

    pub fn nmi(&mut self) -> u8 {
        self.cpu.nmi(&mut self.memory)
    }

    pub fn irq(&mut self) -> u8 {
        self.cpu.irq(&mut self.memory)
    }
}
