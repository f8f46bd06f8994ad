//! Arithmetic and flag helpers shared by the instruction handlers.

use super::{Cpu, StatusFlags};
use crate::bits::{concat16, lo, msb, split16};

#[inline]
fn bcd_adc8(a: u8, b: u8, carry_in: u8) -> (u8, bool) {
    // Each digit is adjusted before its carry reaches the next one.
    let mut low = (a & 0x0F) as u16 + (b & 0x0F) as u16 + carry_in as u16;
    if low > 0x09 {
        low += 0x06;
    }
    let mut sum = (a & 0xF0) as u16 + (b & 0xF0) as u16 + low;
    if sum > 0x9F {
        sum += 0x60;
    }
    ((sum & 0xFF) as u8, sum > 0xFF)
}

#[inline]
fn bcd_sbc8(a: u8, b: u8, borrow_in: u8) -> (u8, bool) {
    let mut low = (a & 0x0F) as i16 - (b & 0x0F) as i16 - borrow_in as i16;
    let mut borrow = 0i16;
    if low < 0 {
        low += 10;
        borrow = 1;
    }
    let mut high = (a >> 4) as i16 - (b >> 4) as i16 - borrow;
    let mut borrow_high = false;
    if high < 0 {
        high += 10;
        borrow_high = true;
    }
    (((high as u8) << 4) | (low as u8 & 0x0F), !borrow_high)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Shift {
    Asl,
    Lsr,
    Rol,
    Ror,
}

impl Cpu {
    #[inline]
    pub(super) fn set_nz(&mut self, value: u16, eight_bit: bool) {
        self.p.set(StatusFlags::ZERO, lo(value, eight_bit) == 0);
        self.p.set(StatusFlags::NEGATIVE, msb(value, eight_bit));
    }

    pub(super) fn adc(&mut self, operand: u16) {
        let eight = self.memory_and_accumulator_are_8bit();
        let carry_in = self.flag(StatusFlags::CARRY) as u16;
        let a = self.a.get(eight);
        let b = lo(operand, eight);
        let sign = if eight { 0x80 } else { 0x8000 };

        let binary = a as u32 + b as u32 + carry_in as u32;
        let (result, carry) = if self.flag(StatusFlags::DECIMAL) {
            if eight {
                let (r, c) = bcd_adc8(a as u8, b as u8, carry_in as u8);
                (r as u16, c)
            } else {
                let ((a_hi, a_lo), (b_hi, b_lo)) = (split16(a), split16(b));
                let (low, c1) = bcd_adc8(a_lo, b_lo, carry_in as u8);
                let (high, c2) = bcd_adc8(a_hi, b_hi, c1 as u8);
                (concat16(high, low), c2)
            }
        } else {
            let limit = if eight { 0xFF } else { 0xFFFF };
            (lo(binary as u16, eight), binary > limit)
        };

        // V follows the binary sum in both modes.
        let overflow = (!(a ^ b) & (a ^ binary as u16) & sign) != 0;
        self.p.set(StatusFlags::CARRY, carry);
        self.p.set(StatusFlags::OVERFLOW, overflow);
        self.a.set(result, eight);
        self.set_nz(result, eight);
    }

    pub(super) fn sbc(&mut self, operand: u16) {
        let eight = self.memory_and_accumulator_are_8bit();
        let borrow_in = !self.flag(StatusFlags::CARRY) as u16;
        let a = self.a.get(eight);
        let b = lo(operand, eight);
        let sign = if eight { 0x80 } else { 0x8000 };

        let binary = (a as i32) - (b as i32) - (borrow_in as i32);
        let (result, carry) = if self.flag(StatusFlags::DECIMAL) {
            if eight {
                let (r, c) = bcd_sbc8(a as u8, b as u8, borrow_in as u8);
                (r as u16, c)
            } else {
                let ((a_hi, a_lo), (b_hi, b_lo)) = (split16(a), split16(b));
                let (low, c1) = bcd_sbc8(a_lo, b_lo, borrow_in as u8);
                let (high, c2) = bcd_sbc8(a_hi, b_hi, !c1 as u8);
                (concat16(high, low), c2)
            }
        } else {
            (lo(binary as u16, eight), binary >= 0)
        };

        let overflow = ((a ^ b) & (a ^ binary as u16) & sign) != 0;
        self.p.set(StatusFlags::CARRY, carry);
        self.p.set(StatusFlags::OVERFLOW, overflow);
        self.a.set(result, eight);
        self.set_nz(result, eight);
    }

    pub(super) fn compare(&mut self, register: u16, operand: u16, eight_bit: bool) {
        let r = lo(register, eight_bit);
        let v = lo(operand, eight_bit);
        self.p.set(StatusFlags::CARRY, r >= v);
        self.set_nz(r.wrapping_sub(v), eight_bit);
    }

    pub(super) fn bit_test(&mut self, operand: u16, immediate: bool) {
        let eight = self.memory_and_accumulator_are_8bit();
        let v = lo(operand, eight);
        self.p.set(StatusFlags::ZERO, self.a.get(eight) & v == 0);
        // BIT # only touches Z.
        if !immediate {
            let v_bit = if eight { 0x40 } else { 0x4000 };
            self.p.set(StatusFlags::NEGATIVE, msb(v, eight));
            self.p.set(StatusFlags::OVERFLOW, v & v_bit != 0);
        }
    }

    pub(super) fn shift(&mut self, kind: Shift, value: u16, eight_bit: bool) -> u16 {
        let value = lo(value, eight_bit);
        let top = if eight_bit { 0x80 } else { 0x8000 };
        let carry_in = self.flag(StatusFlags::CARRY);
        let (result, carry_out) = match kind {
            Shift::Asl => (value << 1, value & top != 0),
            Shift::Lsr => (value >> 1, value & 1 != 0),
            Shift::Rol => ((value << 1) | carry_in as u16, value & top != 0),
            Shift::Ror => {
                let fill = if carry_in { top } else { 0 };
                ((value >> 1) | fill, value & 1 != 0)
            }
        };
        let result = lo(result, eight_bit);
        self.p.set(StatusFlags::CARRY, carry_out);
        self.set_nz(result, eight_bit);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_add_carries_between_digits() {
        assert_eq!(bcd_adc8(0x09, 0x01, 0), (0x10, false));
        assert_eq!(bcd_adc8(0x58, 0x46, 1), (0x05, true));
        assert_eq!(bcd_adc8(0x99, 0x01, 0), (0x00, true));
    }

    #[test]
    fn bcd_add_adjusts_digit_sums_past_fifteen() {
        assert_eq!(bcd_adc8(0x09, 0x09, 0), (0x18, false));
        assert_eq!(bcd_adc8(0x99, 0x99, 0), (0x98, true));
        assert_eq!(bcd_adc8(0x99, 0x99, 1), (0x99, true));
        assert_eq!(bcd_adc8(0x19, 0x09, 1), (0x29, false));
        assert_eq!(bcd_adc8(0x80, 0x90, 0), (0x70, true));
    }

    #[test]
    fn bcd_subtract_borrows_between_digits() {
        assert_eq!(bcd_sbc8(0x10, 0x01, 0), (0x09, true));
        assert_eq!(bcd_sbc8(0x00, 0x01, 0), (0x99, false));
        assert_eq!(bcd_sbc8(0x46, 0x12, 1), (0x33, true));
    }
}
