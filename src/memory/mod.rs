//! Devices that can sit on the bus.
//!
//! RAM and ROM are concrete; peripherals plug in through [`MemoryDevice`].
//! Offsets handed to a device are already device-local; each device wraps
//! offsets that run past its end so smaller chips mirror naturally.

use crate::bits::Byte;

/// Capability every bus device provides.
pub trait MemoryDevice {
    fn read_byte(&mut self, offset: u32) -> Byte;
    fn write_byte(&mut self, offset: u32, value: Byte);
    /// Read without side effects. Used by the disassembler and debug views.
    fn peek_byte(&self, offset: u32) -> Byte;
    fn reset(&mut self) {}
}

pub const WRAM_SIZE: usize = 0x20000;

pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Ram {
            data: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the contents; `bytes` must match the current size.
    pub fn copy_from(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() != self.data.len() {
            return false;
        }
        self.data.copy_from_slice(bytes);
        true
    }

    pub fn resize(&mut self, size: usize) {
        self.data = vec![0; size];
    }

    fn index(&self, offset: u32) -> Option<usize> {
        if self.data.is_empty() {
            None
        } else {
            Some(offset as usize % self.data.len())
        }
    }
}

impl MemoryDevice for Ram {
    fn read_byte(&mut self, offset: u32) -> Byte {
        self.peek_byte(offset)
    }

    fn write_byte(&mut self, offset: u32, value: Byte) {
        if let Some(i) = self.index(offset) {
            self.data[i] = value;
        }
    }

    fn peek_byte(&self, offset: u32) -> Byte {
        self.index(offset).map(|i| self.data[i]).unwrap_or(0)
    }

    fn reset(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_wraps_offsets() {
        let mut ram = Ram::new(0x800);
        ram.write_byte(0x0801, 0x5A);
        assert_eq!(ram.read_byte(0x0001), 0x5A);
        assert_eq!(ram.peek_byte(0x1001), 0x5A);
    }

    #[test]
    fn ram_reset_zeroes() {
        let mut ram = Ram::new(16);
        for i in 0..16 {
            ram.write_byte(i, 0xFF);
        }
        ram.reset();
        assert!(ram.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_ram_reads_zero_and_ignores_writes() {
        let mut ram = Ram::new(0);
        ram.write_byte(3, 0x12);
        assert_eq!(ram.read_byte(3), 0);
    }
}
