//! Packing helpers for the 8/16/24-bit quantities the 65C816 moves around.
//!
//! Addresses are 24 bits wide and carried in a `u32`: the bank lives in bits
//! 16..23 and the in-bank offset in the low 16 bits.

pub type Byte = u8;
pub type Word = u16;
pub type Address = u32;

pub const ADDRESS_MASK: Address = 0x00FF_FFFF;

#[inline]
pub const fn concat16(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 8) | lo as u16
}

#[inline]
pub const fn concat24(bank: u8, offset: u16) -> Address {
    ((bank as u32) << 16) | offset as u32
}

#[inline]
pub const fn concat24_bytes(bank: u8, hi: u8, lo: u8) -> Address {
    concat24(bank, concat16(hi, lo))
}

/// Returns `(hi, lo)`.
#[inline]
pub const fn split16(value: u16) -> (u8, u8) {
    ((value >> 8) as u8, value as u8)
}

/// Returns `(bank, offset)`.
#[inline]
pub const fn split24(value: Address) -> (u8, u16) {
    ((value >> 16) as u8, value as u16)
}

/// Returns `(bank, hi, lo)`.
#[inline]
pub const fn split24_bytes(value: Address) -> (u8, u8, u8) {
    ((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

#[inline]
pub const fn bank(address: Address) -> u8 {
    (address >> 16) as u8
}

#[inline]
pub const fn offset(address: Address) -> u16 {
    address as u16
}

#[inline]
pub const fn msb8(value: u8) -> bool {
    value & 0x80 != 0
}

#[inline]
pub const fn msb16(value: u16) -> bool {
    value & 0x8000 != 0
}

/// MSB of `value` at a width chosen at runtime.
#[inline]
pub const fn msb(value: u16, eight_bit: bool) -> bool {
    if eight_bit {
        msb8(value as u8)
    } else {
        msb16(value)
    }
}

/// Truncates `value` to the selected width.
#[inline]
pub const fn lo(value: u16, eight_bit: bool) -> u16 {
    if eight_bit {
        value & 0x00FF
    } else {
        value
    }
}

/// Next address in 24-bit space, wrapping from `$FFFFFF` to `$000000`.
#[inline]
pub const fn next_address(address: Address, step: u32) -> Address {
    address.wrapping_add(step) & ADDRESS_MASK
}

/// Next address inside the same bank; the offset wraps at `$FFFF`.
#[inline]
pub const fn next_in_bank(address: Address, step: u16) -> Address {
    concat24(bank(address), offset(address).wrapping_add(step))
}

/// `$` followed by zero-padded uppercase hex, as used by the debugger views.
pub fn hex(value: u32, digits: usize) -> String {
    format!("${:0width$X}", value, width = digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_and_split_agree() {
        assert_eq!(concat16(0x12, 0x34), 0x1234);
        assert_eq!(split16(0xBEEF), (0xBE, 0xEF));
        assert_eq!(concat24(0x7E, 0x1234), 0x7E1234);
        assert_eq!(split24(0x7E1234), (0x7E, 0x1234));
        assert_eq!(concat24_bytes(0x01, 0x02, 0x03), 0x010203);
        assert_eq!(split24_bytes(0xC0FFEE), (0xC0, 0xFF, 0xEE));
    }

    #[test]
    fn msb_follows_width() {
        assert!(msb(0x0080, true));
        assert!(!msb(0x0080, false));
        assert!(msb(0x8000, false));
        assert!(!msb(0x8000, true));
    }

    #[test]
    fn address_wrapping() {
        assert_eq!(next_address(0xFFFFFF, 1), 0x000000);
        assert_eq!(next_address(0x7FFFFF, 1), 0x800000);
        assert_eq!(next_in_bank(0x12FFFF, 1), 0x120000);
    }

    #[test]
    fn hex_is_padded() {
        assert_eq!(hex(0x8000, 6), "$008000");
        assert_eq!(hex(0xAB, 2), "$AB");
    }
}
