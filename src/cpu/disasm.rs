//! Static disassembly in WDC syntax.
//!
//! Reads go through [`CpuBus::peek_u8`], so walking code never disturbs
//! devices or the CPU. Register widths are fixed for the whole walk: a
//! REP/SEP/XCE inside the listing does not change how later operands are
//! sized.

use std::fmt;

use super::opcode::{decode_instruction, AddressingMode, Instruction, Opcode};
use crate::bits::{concat24_bytes, hex, next_in_bank, offset, split16, Address};
use crate::cpu_bus::CpuBus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassembledInstruction {
    pub address: Address,
    pub code: String,
}

impl fmt::Display for DisassembledInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", hex(self.address, 6), self.code)
    }
}

/// Formats one decoded instruction. `raw` holds the operand bytes,
/// little-endian.
pub fn format_instruction(
    instruction: &Instruction,
    address: Address,
    raw: u32,
    emulation_mode: bool,
    carry_flag: bool,
) -> String {
    use AddressingMode::*;

    let name = instruction.opcode;
    let operand_digits = 2 * (instruction.size as usize - 1);
    let byte = raw & 0xFF;
    let word = raw & 0xFFFF;

    let operand = match instruction.addressing_mode {
        Implied => String::new(),
        Accumulator => "A".to_string(),
        // PEA is written without '#'.
        Immediate16 => hex(word, 4),
        ImmediateM | ImmediateX | Immediate8 => format!("#{}", hex(raw, operand_digits)),
        Direct => hex(byte, 2),
        DirectX => format!("{},X", hex(byte, 2)),
        DirectY => format!("{},Y", hex(byte, 2)),
        DirectIndirect => format!("({})", hex(byte, 2)),
        DirectIndexedIndirect => format!("({},X)", hex(byte, 2)),
        DirectIndirectIndexed => format!("({}),Y", hex(byte, 2)),
        DirectIndirectLong => format!("[{}]", hex(byte, 2)),
        DirectIndirectLongIndexed => format!("[{}],Y", hex(byte, 2)),
        Absolute => hex(word, 4),
        AbsoluteX => format!("{},X", hex(word, 4)),
        AbsoluteY => format!("{},Y", hex(word, 4)),
        AbsoluteLong => hex(raw, 6),
        AbsoluteLongX => format!("{},X", hex(raw, 6)),
        AbsoluteIndirect => format!("({})", hex(word, 4)),
        AbsoluteIndexedIndirect => format!("({},X)", hex(word, 4)),
        AbsoluteIndirectLong => format!("[{}]", hex(word, 4)),
        StackRelative => format!("{},S", hex(byte, 2)),
        StackRelativeIndirectIndexed => format!("({},S),Y", hex(byte, 2)),
        Relative => {
            let next = offset(address).wrapping_add(instruction.size as u16);
            let target = next.wrapping_add(byte as u8 as i8 as i16 as u16);
            hex(target as u32, 4)
        }
        RelativeLong => {
            let next = offset(address).wrapping_add(instruction.size as u16);
            hex(next.wrapping_add(word as u16) as u32, 4)
        }
        // Source bank first in assembler order.
        BlockMove => {
            let (source, destination) = split16(word as u16);
            format!("{},{}", hex(source as u32, 2), hex(destination as u32, 2))
        }
    };

    let mut code = if operand.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, operand)
    };

    if name == Opcode::Xce {
        // XCE swaps C and E, so the carry going in is the mode coming out.
        let mode = if carry_flag { "emulation" } else { "native" };
        code.push_str(&format!(" ; -> {}", mode));
    } else if emulation_mode && matches!(name, Opcode::Rep | Opcode::Sep) && raw & 0x30 != 0 {
        code.push_str(" ; m/x ignored in emulation");
    }
    code
}

/// Lazy walk over up to `remaining` instructions.
pub struct Disassembly<'a, B: CpuBus + ?Sized> {
    bus: &'a B,
    next: Address,
    remaining: usize,
    accumulator_is_8bit: bool,
    index_is_8bit: bool,
    emulation_mode: bool,
    carry_flag: bool,
}

impl<B: CpuBus + ?Sized> Clone for Disassembly<'_, B> {
    fn clone(&self) -> Self {
        Disassembly {
            bus: self.bus,
            next: self.next,
            remaining: self.remaining,
            accumulator_is_8bit: self.accumulator_is_8bit,
            index_is_8bit: self.index_is_8bit,
            emulation_mode: self.emulation_mode,
            carry_flag: self.carry_flag,
        }
    }
}

impl<B: CpuBus + ?Sized> Iterator for Disassembly<'_, B> {
    type Item = DisassembledInstruction;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let address = self.next;
        let instruction = decode_instruction(
            self.bus.peek_u8(address),
            self.accumulator_is_8bit,
            self.index_is_8bit,
        );
        let mut operand = [0u8; 3];
        for i in 1..instruction.size {
            operand[i as usize - 1] = self.bus.peek_u8(next_in_bank(address, i as u16));
        }
        let raw = concat24_bytes(operand[2], operand[1], operand[0]);
        self.next = next_in_bank(address, instruction.size as u16);

        Some(DisassembledInstruction {
            address,
            code: format_instruction(
                &instruction,
                address,
                raw,
                self.emulation_mode,
                self.carry_flag,
            ),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Disassembles up to `max_instructions` starting at `start`. Emulation mode
/// forces both widths to 8 bits.
pub fn disassemble<B: CpuBus + ?Sized>(
    bus: &B,
    start: Address,
    max_instructions: usize,
    accumulator_is_8bit: bool,
    index_is_8bit: bool,
    emulation_mode: bool,
    carry_flag: bool,
) -> Disassembly<'_, B> {
    Disassembly {
        bus,
        next: start,
        remaining: max_instructions,
        accumulator_is_8bit: accumulator_is_8bit || emulation_mode,
        index_is_8bit: index_is_8bit || emulation_mode,
        emulation_mode,
        carry_flag,
    }
}
