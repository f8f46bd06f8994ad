use serde::{Deserialize, Serialize};

use crate::bits::split16;

/// 16-bit register whose visible width depends on the CPU mode.
///
/// 8-bit writes replace only the low byte. The high byte stays behind and
/// reappears when the register is next used at 16 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthRegister {
    value: u16,
}

impl WidthRegister {
    pub const fn new(value: u16) -> Self {
        WidthRegister { value }
    }

    #[inline]
    pub fn get(&self, eight_bit: bool) -> u16 {
        if eight_bit {
            self.value & 0x00FF
        } else {
            self.value
        }
    }

    #[inline]
    pub fn set(&mut self, value: u16, eight_bit: bool) {
        if eight_bit {
            self.value = (self.value & 0xFF00) | (value & 0x00FF);
        } else {
            self.value = value;
        }
    }

    /// All 16 bits, whatever the current width.
    #[inline]
    pub fn force_load_full(&self) -> u16 {
        self.value
    }

    #[inline]
    pub fn force_store_full(&mut self, value: u16) {
        self.value = value;
    }

    #[inline]
    pub fn low(&self) -> u8 {
        self.value as u8
    }

    #[inline]
    pub fn high(&self) -> u8 {
        split16(self.value).0
    }

    pub fn clear_high(&mut self) {
        self.value &= 0x00FF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_write_keeps_hidden_byte() {
        let mut r = WidthRegister::new(0x1234);
        r.set(0xFFAB, true);
        assert_eq!(r.get(true), 0x00AB);
        assert_eq!(r.get(false), 0x12AB);
        assert_eq!(r.high(), 0x12);
    }

    #[test]
    fn sixteen_bit_write_replaces_everything() {
        let mut r = WidthRegister::new(0x1234);
        r.set(0xBEEF, false);
        assert_eq!(r.force_load_full(), 0xBEEF);
        r.clear_high();
        assert_eq!(r.force_load_full(), 0x00EF);
    }
}
