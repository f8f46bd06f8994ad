//! Trait representing the minimal bus interface required by the 65C816 core.
//!
//! Multi-byte accesses are little-endian and built from single-byte
//! accesses; each byte goes to the next 24-bit address so a value may
//! straddle two devices or two banks.

use crate::bits::{concat16, concat24_bytes, next_address, split16, split24_bytes, Address};

pub trait CpuBus {
    fn read_u8(&mut self, addr: Address) -> u8;
    fn write_u8(&mut self, addr: Address, value: u8);
    /// Side-effect-free read for disassembly and debug views.
    fn peek_u8(&self, addr: Address) -> u8;

    fn read_u16(&mut self, addr: Address) -> u16 {
        let lo = self.read_u8(addr);
        let hi = self.read_u8(next_address(addr, 1));
        concat16(hi, lo)
    }

    fn read_u24(&mut self, addr: Address) -> Address {
        let lo = self.read_u8(addr);
        let hi = self.read_u8(next_address(addr, 1));
        let bank = self.read_u8(next_address(addr, 2));
        concat24_bytes(bank, hi, lo)
    }

    fn write_u16(&mut self, addr: Address, value: u16) {
        let (hi, lo) = split16(value);
        self.write_u8(addr, lo);
        self.write_u8(next_address(addr, 1), hi);
    }

    fn write_u24(&mut self, addr: Address, value: Address) {
        let (bank, hi, lo) = split24_bytes(value);
        self.write_u8(addr, lo);
        self.write_u8(next_address(addr, 1), hi);
        self.write_u8(next_address(addr, 2), bank);
    }

    fn peek_u16(&self, addr: Address) -> u16 {
        let lo = self.peek_u8(addr);
        let hi = self.peek_u8(next_address(addr, 1));
        concat16(hi, lo)
    }

    fn peek_u24(&self, addr: Address) -> Address {
        let lo = self.peek_u8(addr);
        let hi = self.peek_u8(next_address(addr, 1));
        let bank = self.peek_u8(next_address(addr, 2));
        concat24_bytes(bank, hi, lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16 MiB of plain bytes.
    struct Flat(Vec<u8>);

    impl CpuBus for Flat {
        fn read_u8(&mut self, addr: Address) -> u8 {
            self.0[addr as usize]
        }

        fn write_u8(&mut self, addr: Address, value: u8) {
            self.0[addr as usize] = value;
        }

        fn peek_u8(&self, addr: Address) -> u8 {
            self.0[addr as usize]
        }
    }

    #[test]
    fn multi_byte_accesses_are_little_endian() {
        let mut bus = Flat(vec![0; 0x100_0000]);
        bus.write_u24(0x7E0010, 0xC0FFEE);
        assert_eq!(&bus.0[0x7E0010..0x7E0013], &[0xEE, 0xFF, 0xC0]);
        assert_eq!(bus.read_u24(0x7E0010), 0xC0FFEE);
        assert_eq!(bus.peek_u16(0x7E0011), 0xC0FF);
    }

    #[test]
    fn accesses_straddle_banks_and_wrap_the_address_space() {
        let mut bus = Flat(vec![0; 0x100_0000]);
        bus.write_u16(0x7FFFFF, 0xBEEF);
        assert_eq!(bus.0[0x7FFFFF], 0xEF);
        assert_eq!(bus.0[0x800000], 0xBE);

        bus.write_u24(0xFFFFFE, 0x123456);
        assert_eq!(bus.0[0xFFFFFE], 0x56);
        assert_eq!(bus.0[0xFFFFFF], 0x34);
        assert_eq!(bus.0[0x000000], 0x12);
        assert_eq!(bus.read_u24(0xFFFFFE), 0x123456);
    }
}
