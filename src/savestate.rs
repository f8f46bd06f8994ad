use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::bus::Bus;
use crate::cpu::CpuState;
use crate::error::SaveStateError;

/// Snapshot of everything the core mutates: CPU registers, WRAM and
/// cartridge SRAM. ROM is not stored; `rom_checksum` records which image the
/// state belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub cpu: CpuState,
    pub wram: Vec<u8>,
    pub sram: Vec<u8>,
    pub rom_checksum: u16,
}

impl SaveState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn capture(bus: &Bus) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            cpu: bus.cpu.state(),
            wram: bus.memory.wram().as_slice().to_vec(),
            sram: bus.memory.sram().as_slice().to_vec(),
            rom_checksum: bus.memory.rom().checksum(),
        }
    }

    /// Restores the snapshot. Fails without touching the machine if the
    /// version or memory sizes don't match.
    pub fn apply(&self, bus: &mut Bus) -> Result<(), SaveStateError> {
        self.validate(bus)?;
        if !self.validate_rom_checksum(bus.memory.rom().checksum()) {
            log::warn!(
                "Save state was taken with ROM checksum {:04X}, loaded ROM has {:04X}",
                self.rom_checksum,
                bus.memory.rom().checksum()
            );
        }

        bus.memory.wram_mut().copy_from(&self.wram);
        bus.memory.sram_mut().copy_from(&self.sram);
        bus.cpu.restore(&self.cpu);
        log::info!(
            "Restored save state: PC={:06X}",
            bus.cpu.program_counter()
        );
        Ok(())
    }

    fn validate(&self, bus: &Bus) -> Result<(), SaveStateError> {
        if self.version != Self::CURRENT_VERSION {
            return Err(SaveStateError::VersionMismatch {
                found: self.version,
                expected: Self::CURRENT_VERSION,
            });
        }
        let wram = bus.memory.wram().len();
        if self.wram.len() != wram {
            return Err(SaveStateError::SizeMismatch {
                what: "WRAM",
                found: self.wram.len(),
                expected: wram,
            });
        }
        let sram = bus.memory.sram().len();
        if self.sram.len() != sram {
            return Err(SaveStateError::SizeMismatch {
                what: "SRAM",
                found: self.sram.len(),
                expected: sram,
            });
        }
        Ok(())
    }

    pub fn validate_rom_checksum(&self, current_checksum: u16) -> bool {
        self.rom_checksum == current_checksum
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveStateError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SaveStateError> {
        let state: SaveState = bincode::deserialize(data)?;
        if state.version != Self::CURRENT_VERSION {
            return Err(SaveStateError::VersionMismatch {
                found: state.version,
                expected: Self::CURRENT_VERSION,
            });
        }
        Ok(state)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveStateError> {
        let data = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&data)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SaveStateError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::build_image;

    fn loaded_bus() -> Bus {
        let mut bus = Bus::new();
        bus.load_rom_bytes(build_image(0x7FC0, 0x20, "STATE")).unwrap();
        bus
    }

    #[test]
    fn restores_registers_and_memory() {
        let mut bus = loaded_bus();
        bus.write8(0x7E0010, 0x5A);
        bus.write8(0x700004, 0xC3);
        bus.cpu.pc = 0x9000;
        bus.cpu.set_accumulator(0x77);
        let state = SaveState::capture(&bus);

        bus.write8(0x7E0010, 0);
        bus.write8(0x700004, 0);
        bus.reset();
        state.apply(&mut bus).unwrap();

        assert_eq!(bus.read8(0x7E0010), 0x5A);
        assert_eq!(bus.read8(0x700004), 0xC3);
        assert_eq!(bus.cpu.pc, 0x9000);
        assert_eq!(bus.cpu.accumulator(), 0x77);
    }

    #[test]
    fn survives_encoding() {
        let mut bus = loaded_bus();
        bus.write8(0x7F1234, 0x42);
        let state = SaveState::capture(&bus);
        let decoded = SaveState::from_bytes(&state.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn file_round_trip() {
        let bus = loaded_bus();
        let state = SaveState::capture(&bus);
        let path = std::env::temp_dir().join(format!("blaze-state-{}.bin", std::process::id()));
        state.save_to_file(&path).unwrap();
        let loaded = SaveState::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, state);
    }

    #[test]
    fn rejects_other_versions() {
        let bus = loaded_bus();
        let mut state = SaveState::capture(&bus);
        state.version = 7;
        let bytes = state.to_bytes().unwrap();
        assert!(matches!(
            SaveState::from_bytes(&bytes),
            Err(SaveStateError::VersionMismatch { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn rejects_mismatched_sram() {
        let bus = loaded_bus();
        let state = SaveState::capture(&bus);

        let mut other = Bus::new();
        other.write8(0x7E0000, 0x99);
        let err = state.apply(&mut other).unwrap_err();
        assert!(matches!(
            err,
            SaveStateError::SizeMismatch { what: "SRAM", found: 0x2000, expected: 0 }
        ));
        // nothing was restored
        assert_eq!(other.read8(0x7E0000), 0x99);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = SaveState::load_from_file("/nonexistent/blaze/state.bin");
        assert!(matches!(result, Err(SaveStateError::Io(_))));
    }
}
