//! Instruction decoding: opcode byte to mnemonic, addressing mode, size and
//! base cycle count.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Bra,
    Brk,
    Brl,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cop,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jml,
    Jmp,
    Jsl,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Mvn,
    Mvp,
    Nop,
    Ora,
    Pea,
    Pei,
    Per,
    Pha,
    Phb,
    Phd,
    Phk,
    Php,
    Phx,
    Phy,
    Pla,
    Plb,
    Pld,
    Plp,
    Plx,
    Ply,
    Rep,
    Rol,
    Ror,
    Rti,
    Rtl,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sep,
    Sta,
    Stp,
    Stx,
    Sty,
    Stz,
    Tax,
    Tay,
    Tcd,
    Tcs,
    Tdc,
    Trb,
    Tsb,
    Tsc,
    Tsx,
    Txa,
    Txs,
    Txy,
    Tya,
    Tyx,
    Wai,
    Wdm,
    Xba,
    Xce,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{:?}", self);
        f.write_str(&name.to_ascii_uppercase())
    }
}

impl Opcode {
    /// Subroutine calls; the debugger steps over these.
    pub fn is_call(self) -> bool {
        matches!(self, Opcode::Jsr | Opcode::Jsl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    /// Immediate sized by the accumulator width.
    ImmediateM,
    /// Immediate sized by the index width.
    ImmediateX,
    Immediate8,
    Immediate16,
    Direct,
    DirectX,
    DirectY,
    DirectIndirect,
    DirectIndexedIndirect,
    DirectIndirectIndexed,
    DirectIndirectLong,
    DirectIndirectLongIndexed,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteLong,
    AbsoluteLongX,
    AbsoluteIndirect,
    AbsoluteIndexedIndirect,
    AbsoluteIndirectLong,
    StackRelative,
    StackRelativeIndirectIndexed,
    Relative,
    RelativeLong,
    BlockMove,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub fn operand_len(self, accumulator_is_8bit: bool, index_is_8bit: bool) -> u8 {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 0,
            ImmediateM => 2 - accumulator_is_8bit as u8,
            ImmediateX => 2 - index_is_8bit as u8,
            Immediate8
            | Direct
            | DirectX
            | DirectY
            | DirectIndirect
            | DirectIndexedIndirect
            | DirectIndirectIndexed
            | DirectIndirectLong
            | DirectIndirectLongIndexed
            | StackRelative
            | StackRelativeIndirectIndexed
            | Relative => 1,
            Immediate16
            | Absolute
            | AbsoluteX
            | AbsoluteY
            | AbsoluteIndirect
            | AbsoluteIndexedIndirect
            | AbsoluteIndirectLong
            | RelativeLong
            | BlockMove => 2,
            AbsoluteLong | AbsoluteLongX => 3,
        }
    }

    /// Modes that go through the direct page register.
    pub fn uses_direct_page(self) -> bool {
        use AddressingMode::*;
        matches!(
            self,
            Direct
                | DirectX
                | DirectY
                | DirectIndirect
                | DirectIndexedIndirect
                | DirectIndirectIndexed
                | DirectIndirectLong
                | DirectIndirectLongIndexed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub byte: u8,
    pub opcode: Opcode,
    pub addressing_mode: AddressingMode,
    /// Total length including the opcode byte.
    pub size: u8,
    pub base_cycles: u8,
}

/// Decodes an opcode byte for the given register widths.
pub fn decode_instruction(
    byte: u8,
    accumulator_is_8bit: bool,
    index_is_8bit: bool,
) -> Instruction {
    let (opcode, addressing_mode, base_cycles) = table::TABLE[byte as usize];
    Instruction {
        byte,
        opcode,
        addressing_mode,
        size: 1 + addressing_mode.operand_len(accumulator_is_8bit, index_is_8bit),
        base_cycles,
    }
}

mod table {
    use super::AddressingMode::{self, *};
    use super::Opcode::{self, *};

    type Entry = (Opcode, AddressingMode, u8);

    const fn e(opcode: Opcode, mode: AddressingMode, cycles: u8) -> Entry {
        (opcode, mode, cycles)
    }

    pub(super) const TABLE: [Entry; 256] = [
        e(Brk, Immediate8, 7), // 00
        e(Ora, DirectIndexedIndirect, 6), // 01
        e(Cop, Immediate8, 7), // 02
        e(Ora, StackRelative, 4), // 03
        e(Tsb, Direct, 5), // 04
        e(Ora, Direct, 3), // 05
        e(Asl, Direct, 5), // 06
        e(Ora, DirectIndirectLong, 6), // 07
        e(Php, Implied, 3), // 08
        e(Ora, ImmediateM, 2), // 09
        e(Asl, Accumulator, 2), // 0A
        e(Phd, Implied, 4), // 0B
        e(Tsb, Absolute, 6), // 0C
        e(Ora, Absolute, 4), // 0D
        e(Asl, Absolute, 6), // 0E
        e(Ora, AbsoluteLong, 5), // 0F
        e(Bpl, Relative, 2), // 10
        e(Ora, DirectIndirectIndexed, 5), // 11
        e(Ora, DirectIndirect, 5), // 12
        e(Ora, StackRelativeIndirectIndexed, 7), // 13
        e(Trb, Direct, 5), // 14
        e(Ora, DirectX, 4), // 15
        e(Asl, DirectX, 6), // 16
        e(Ora, DirectIndirectLongIndexed, 6), // 17
        e(Clc, Implied, 2), // 18
        e(Ora, AbsoluteY, 4), // 19
        e(Inc, Accumulator, 2), // 1A
        e(Tcs, Implied, 2), // 1B
        e(Trb, Absolute, 6), // 1C
        e(Ora, AbsoluteX, 4), // 1D
        e(Asl, AbsoluteX, 7), // 1E
        e(Ora, AbsoluteLongX, 5), // 1F
        e(Jsr, Absolute, 6), // 20
        e(And, DirectIndexedIndirect, 6), // 21
        e(Jsl, AbsoluteLong, 8), // 22
        e(And, StackRelative, 4), // 23
        e(Bit, Direct, 3), // 24
        e(And, Direct, 3), // 25
        e(Rol, Direct, 5), // 26
        e(And, DirectIndirectLong, 6), // 27
        e(Plp, Implied, 4), // 28
        e(And, ImmediateM, 2), // 29
        e(Rol, Accumulator, 2), // 2A
        e(Pld, Implied, 5), // 2B
        e(Bit, Absolute, 4), // 2C
        e(And, Absolute, 4), // 2D
        e(Rol, Absolute, 6), // 2E
        e(And, AbsoluteLong, 5), // 2F
        e(Bmi, Relative, 2), // 30
        e(And, DirectIndirectIndexed, 5), // 31
        e(And, DirectIndirect, 5), // 32
        e(And, StackRelativeIndirectIndexed, 7), // 33
        e(Bit, DirectX, 4), // 34
        e(And, DirectX, 4), // 35
        e(Rol, DirectX, 6), // 36
        e(And, DirectIndirectLongIndexed, 6), // 37
        e(Sec, Implied, 2), // 38
        e(And, AbsoluteY, 4), // 39
        e(Dec, Accumulator, 2), // 3A
        e(Tsc, Implied, 2), // 3B
        e(Bit, AbsoluteX, 4), // 3C
        e(And, AbsoluteX, 4), // 3D
        e(Rol, AbsoluteX, 7), // 3E
        e(And, AbsoluteLongX, 5), // 3F
        e(Rti, Implied, 6), // 40
        e(Eor, DirectIndexedIndirect, 6), // 41
        e(Wdm, Immediate8, 2), // 42
        e(Eor, StackRelative, 4), // 43
        e(Mvp, BlockMove, 7), // 44
        e(Eor, Direct, 3), // 45
        e(Lsr, Direct, 5), // 46
        e(Eor, DirectIndirectLong, 6), // 47
        e(Pha, Implied, 3), // 48
        e(Eor, ImmediateM, 2), // 49
        e(Lsr, Accumulator, 2), // 4A
        e(Phk, Implied, 3), // 4B
        e(Jmp, Absolute, 3), // 4C
        e(Eor, Absolute, 4), // 4D
        e(Lsr, Absolute, 6), // 4E
        e(Eor, AbsoluteLong, 5), // 4F
        e(Bvc, Relative, 2), // 50
        e(Eor, DirectIndirectIndexed, 5), // 51
        e(Eor, DirectIndirect, 5), // 52
        e(Eor, StackRelativeIndirectIndexed, 7), // 53
        e(Mvn, BlockMove, 7), // 54
        e(Eor, DirectX, 4), // 55
        e(Lsr, DirectX, 6), // 56
        e(Eor, DirectIndirectLongIndexed, 6), // 57
        e(Cli, Implied, 2), // 58
        e(Eor, AbsoluteY, 4), // 59
        e(Phy, Implied, 3), // 5A
        e(Tcd, Implied, 2), // 5B
        e(Jml, AbsoluteLong, 4), // 5C
        e(Eor, AbsoluteX, 4), // 5D
        e(Lsr, AbsoluteX, 7), // 5E
        e(Eor, AbsoluteLongX, 5), // 5F
        e(Rts, Implied, 6), // 60
        e(Adc, DirectIndexedIndirect, 6), // 61
        e(Per, RelativeLong, 6), // 62
        e(Adc, StackRelative, 4), // 63
        e(Stz, Direct, 3), // 64
        e(Adc, Direct, 3), // 65
        e(Ror, Direct, 5), // 66
        e(Adc, DirectIndirectLong, 6), // 67
        e(Pla, Implied, 4), // 68
        e(Adc, ImmediateM, 2), // 69
        e(Ror, Accumulator, 2), // 6A
        e(Rtl, Implied, 6), // 6B
        e(Jmp, AbsoluteIndirect, 5), // 6C
        e(Adc, Absolute, 4), // 6D
        e(Ror, Absolute, 6), // 6E
        e(Adc, AbsoluteLong, 5), // 6F
        e(Bvs, Relative, 2), // 70
        e(Adc, DirectIndirectIndexed, 5), // 71
        e(Adc, DirectIndirect, 5), // 72
        e(Adc, StackRelativeIndirectIndexed, 7), // 73
        e(Stz, DirectX, 4), // 74
        e(Adc, DirectX, 4), // 75
        e(Ror, DirectX, 6), // 76
        e(Adc, DirectIndirectLongIndexed, 6), // 77
        e(Sei, Implied, 2), // 78
        e(Adc, AbsoluteY, 4), // 79
        e(Ply, Implied, 4), // 7A
        e(Tdc, Implied, 2), // 7B
        e(Jmp, AbsoluteIndexedIndirect, 6), // 7C
        e(Adc, AbsoluteX, 4), // 7D
        e(Ror, AbsoluteX, 7), // 7E
        e(Adc, AbsoluteLongX, 5), // 7F
        e(Bra, Relative, 2), // 80
        e(Sta, DirectIndexedIndirect, 6), // 81
        e(Brl, RelativeLong, 4), // 82
        e(Sta, StackRelative, 4), // 83
        e(Sty, Direct, 3), // 84
        e(Sta, Direct, 3), // 85
        e(Stx, Direct, 3), // 86
        e(Sta, DirectIndirectLong, 6), // 87
        e(Dey, Implied, 2), // 88
        e(Bit, ImmediateM, 2), // 89
        e(Txa, Implied, 2), // 8A
        e(Phb, Implied, 3), // 8B
        e(Sty, Absolute, 4), // 8C
        e(Sta, Absolute, 4), // 8D
        e(Stx, Absolute, 4), // 8E
        e(Sta, AbsoluteLong, 5), // 8F
        e(Bcc, Relative, 2), // 90
        e(Sta, DirectIndirectIndexed, 6), // 91
        e(Sta, DirectIndirect, 5), // 92
        e(Sta, StackRelativeIndirectIndexed, 7), // 93
        e(Sty, DirectX, 4), // 94
        e(Sta, DirectX, 4), // 95
        e(Stx, DirectY, 4), // 96
        e(Sta, DirectIndirectLongIndexed, 6), // 97
        e(Tya, Implied, 2), // 98
        e(Sta, AbsoluteY, 5), // 99
        e(Txs, Implied, 2), // 9A
        e(Txy, Implied, 2), // 9B
        e(Stz, Absolute, 4), // 9C
        e(Sta, AbsoluteX, 5), // 9D
        e(Stz, AbsoluteX, 5), // 9E
        e(Sta, AbsoluteLongX, 5), // 9F
        e(Ldy, ImmediateX, 2), // A0
        e(Lda, DirectIndexedIndirect, 6), // A1
        e(Ldx, ImmediateX, 2), // A2
        e(Lda, StackRelative, 4), // A3
        e(Ldy, Direct, 3), // A4
        e(Lda, Direct, 3), // A5
        e(Ldx, Direct, 3), // A6
        e(Lda, DirectIndirectLong, 6), // A7
        e(Tay, Implied, 2), // A8
        e(Lda, ImmediateM, 2), // A9
        e(Tax, Implied, 2), // AA
        e(Plb, Implied, 4), // AB
        e(Ldy, Absolute, 4), // AC
        e(Lda, Absolute, 4), // AD
        e(Ldx, Absolute, 4), // AE
        e(Lda, AbsoluteLong, 5), // AF
        e(Bcs, Relative, 2), // B0
        e(Lda, DirectIndirectIndexed, 5), // B1
        e(Lda, DirectIndirect, 5), // B2
        e(Lda, StackRelativeIndirectIndexed, 7), // B3
        e(Ldy, DirectX, 4), // B4
        e(Lda, DirectX, 4), // B5
        e(Ldx, DirectY, 4), // B6
        e(Lda, DirectIndirectLongIndexed, 6), // B7
        e(Clv, Implied, 2), // B8
        e(Lda, AbsoluteY, 4), // B9
        e(Tsx, Implied, 2), // BA
        e(Tyx, Implied, 2), // BB
        e(Ldy, AbsoluteX, 4), // BC
        e(Lda, AbsoluteX, 4), // BD
        e(Ldx, AbsoluteY, 4), // BE
        e(Lda, AbsoluteLongX, 5), // BF
        e(Cpy, ImmediateX, 2), // C0
        e(Cmp, DirectIndexedIndirect, 6), // C1
        e(Rep, Immediate8, 3), // C2
        e(Cmp, StackRelative, 4), // C3
        e(Cpy, Direct, 3), // C4
        e(Cmp, Direct, 3), // C5
        e(Dec, Direct, 5), // C6
        e(Cmp, DirectIndirectLong, 6), // C7
        e(Iny, Implied, 2), // C8
        e(Cmp, ImmediateM, 2), // C9
        e(Dex, Implied, 2), // CA
        e(Wai, Implied, 3), // CB
        e(Cpy, Absolute, 4), // CC
        e(Cmp, Absolute, 4), // CD
        e(Dec, Absolute, 6), // CE
        e(Cmp, AbsoluteLong, 5), // CF
        e(Bne, Relative, 2), // D0
        e(Cmp, DirectIndirectIndexed, 5), // D1
        e(Cmp, DirectIndirect, 5), // D2
        e(Cmp, StackRelativeIndirectIndexed, 7), // D3
        e(Pei, DirectIndirect, 6), // D4
        e(Cmp, DirectX, 4), // D5
        e(Dec, DirectX, 6), // D6
        e(Cmp, DirectIndirectLongIndexed, 6), // D7
        e(Cld, Implied, 2), // D8
        e(Cmp, AbsoluteY, 4), // D9
        e(Phx, Implied, 3), // DA
        e(Stp, Implied, 3), // DB
        e(Jml, AbsoluteIndirectLong, 6), // DC
        e(Cmp, AbsoluteX, 4), // DD
        e(Dec, AbsoluteX, 7), // DE
        e(Cmp, AbsoluteLongX, 5), // DF
        e(Cpx, ImmediateX, 2), // E0
        e(Sbc, DirectIndexedIndirect, 6), // E1
        e(Sep, Immediate8, 3), // E2
        e(Sbc, StackRelative, 4), // E3
        e(Cpx, Direct, 3), // E4
        e(Sbc, Direct, 3), // E5
        e(Inc, Direct, 5), // E6
        e(Sbc, DirectIndirectLong, 6), // E7
        e(Inx, Implied, 2), // E8
        e(Sbc, ImmediateM, 2), // E9
        e(Nop, Implied, 2), // EA
        e(Xba, Implied, 3), // EB
        e(Cpx, Absolute, 4), // EC
        e(Sbc, Absolute, 4), // ED
        e(Inc, Absolute, 6), // EE
        e(Sbc, AbsoluteLong, 5), // EF
        e(Beq, Relative, 2), // F0
        e(Sbc, DirectIndirectIndexed, 5), // F1
        e(Sbc, DirectIndirect, 5), // F2
        e(Sbc, StackRelativeIndirectIndexed, 7), // F3
        e(Pea, Immediate16, 5), // F4
        e(Sbc, DirectX, 4), // F5
        e(Inc, DirectX, 6), // F6
        e(Sbc, DirectIndirectLongIndexed, 6), // F7
        e(Sed, Implied, 2), // F8
        e(Sbc, AbsoluteY, 4), // F9
        e(Plx, Implied, 4), // FA
        e(Xce, Implied, 2), // FB
        e(Jsr, AbsoluteIndexedIndirect, 8), // FC
        e(Sbc, AbsoluteX, 4), // FD
        e(Inc, AbsoluteX, 7), // FE
        e(Sbc, AbsoluteLongX, 5), // FF
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_sizes_follow_their_register() {
        assert_eq!(decode_instruction(0xA9, true, true).size, 2);
        assert_eq!(decode_instruction(0xA9, false, true).size, 3);
        // LDX # follows the index width, not the accumulator width
        assert_eq!(decode_instruction(0xA2, false, true).size, 2);
        assert_eq!(decode_instruction(0xA2, true, false).size, 3);
        // REP/SEP are always one operand byte
        assert_eq!(decode_instruction(0xC2, false, false).size, 2);
    }

    #[test]
    fn spot_check_table() {
        let jsl = decode_instruction(0x22, true, true);
        assert_eq!(jsl.opcode, Opcode::Jsl);
        assert_eq!(jsl.addressing_mode, AddressingMode::AbsoluteLong);
        assert_eq!(jsl.size, 4);
        assert_eq!(jsl.base_cycles, 8);

        let mvn = decode_instruction(0x54, true, true);
        assert_eq!((mvn.opcode, mvn.size), (Opcode::Mvn, 3));

        let wdm = decode_instruction(0x42, true, true);
        assert_eq!((wdm.opcode, wdm.size), (Opcode::Wdm, 2));

        assert_eq!(decode_instruction(0xEA, true, true).size, 1);
        assert_eq!(decode_instruction(0xDC, true, true).opcode, Opcode::Jml);
        assert_eq!(decode_instruction(0x82, true, true).size, 3);
    }

    #[test]
    fn every_byte_decodes_to_itself() {
        for byte in 0..=255u8 {
            let i = decode_instruction(byte, true, true);
            assert_eq!(i.byte, byte);
            assert!((1..=4).contains(&i.size));
            assert!(i.base_cycles >= 2);
        }
    }

    #[test]
    fn mnemonic_display_is_uppercase() {
        assert_eq!(Opcode::Lda.to_string(), "LDA");
        assert_eq!(Opcode::Xce.to_string(), "XCE");
    }
}
