use super::opcode::{AddressingMode, Instruction, Opcode};
use super::Cpu;
use crate::bits::{concat16, concat24, next_address, split16, Address};
use crate::cpu_bus::CpuBus;

/// Effective operand of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Accumulator,
    Immediate(u16),
    /// 24-bit address; multi-byte accesses carry into the next bank.
    Memory(Address),
    /// Bank-0 address (direct page, stack relative); multi-byte accesses
    /// wrap within bank 0.
    BankZero(u16),
    BlockMove { destination: u8, source: u8 },
}

impl Cpu {
    /// Emulation mode with a page-aligned D keeps direct-page accesses
    /// inside that page.
    fn direct_page_wraps(&self) -> bool {
        self.emulation_mode && self.dr & 0x00FF == 0
    }

    /// Direct-page address. Indexing wraps within the page when
    /// [`direct_page_wraps`](Self::direct_page_wraps) holds.
    pub(super) fn direct_address(&self, offset: u8, index: u16) -> u16 {
        if self.direct_page_wraps() {
            self.dr | ((offset as u16).wrapping_add(index) & 0x00FF)
        } else {
            self.dr.wrapping_add(offset as u16).wrapping_add(index)
        }
    }

    /// 16-bit pointer held in the direct page. The high byte follows the
    /// same page wrap as the index.
    fn direct_pointer<B: CpuBus>(&self, bus: &mut B, address: u16) -> u16 {
        let next = if self.direct_page_wraps() {
            (address & 0xFF00) | (address.wrapping_add(1) & 0x00FF)
        } else {
            address.wrapping_add(1)
        };
        let lo = bus.read_u8(address as Address);
        let hi = bus.read_u8(next as Address);
        concat16(hi, lo)
    }

    pub(super) fn read_bank0_u16<B: CpuBus>(bus: &mut B, address: u16) -> u16 {
        let lo = bus.read_u8(address as Address);
        let hi = bus.read_u8(address.wrapping_add(1) as Address);
        concat16(hi, lo)
    }

    pub(super) fn read_bank0_u24<B: CpuBus>(bus: &mut B, address: u16) -> Address {
        let word = Self::read_bank0_u16(bus, address);
        let bank = bus.read_u8(address.wrapping_add(2) as Address);
        concat24(bank, word)
    }

    fn data_address(&self, offset: u16, index: u16) -> Address {
        next_address(concat24(self.dbr, offset), index as u32)
    }

    /// Computes the operand; indirect modes read their pointers here. PC
    /// already points past the instruction.
    pub(super) fn resolve_operand<B: CpuBus>(
        &mut self,
        bus: &mut B,
        instruction: &Instruction,
        raw: u32,
    ) -> Operand {
        use AddressingMode::*;

        let x = self.index_x();
        let y = self.index_y();
        let byte = raw as u8;
        let word = raw as u16;

        match instruction.addressing_mode {
            Implied => Operand::None,
            Accumulator => Operand::Accumulator,
            ImmediateM | ImmediateX | Immediate8 | Immediate16 => Operand::Immediate(word),

            Direct => Operand::BankZero(self.direct_address(byte, 0)),
            DirectX => Operand::BankZero(self.direct_address(byte, x)),
            DirectY => Operand::BankZero(self.direct_address(byte, y)),
            DirectIndirect => {
                let pointer = self.direct_pointer(bus, self.direct_address(byte, 0));
                Operand::Memory(self.data_address(pointer, 0))
            }
            DirectIndexedIndirect => {
                let pointer = self.direct_pointer(bus, self.direct_address(byte, x));
                Operand::Memory(self.data_address(pointer, 0))
            }
            DirectIndirectIndexed => {
                let pointer = self.direct_pointer(bus, self.direct_address(byte, 0));
                Operand::Memory(self.data_address(pointer, y))
            }
            // [dp] is 65816-only and does not wrap within the page.
            DirectIndirectLong => {
                Operand::Memory(Self::read_bank0_u24(bus, self.direct_address(byte, 0)))
            }
            DirectIndirectLongIndexed => {
                let pointer = Self::read_bank0_u24(bus, self.direct_address(byte, 0));
                Operand::Memory(next_address(pointer, y as u32))
            }

            // Jumps stay in the program bank, data goes through DBR.
            Absolute if matches!(instruction.opcode, Opcode::Jmp | Opcode::Jsr) => {
                Operand::Memory(concat24(self.pbr, word))
            }
            Absolute => Operand::Memory(self.data_address(word, 0)),
            AbsoluteX => Operand::Memory(self.data_address(word, x)),
            AbsoluteY => Operand::Memory(self.data_address(word, y)),
            AbsoluteLong => Operand::Memory(raw),
            AbsoluteLongX => Operand::Memory(next_address(raw, x as u32)),
            AbsoluteIndirect => {
                let target = Self::read_bank0_u16(bus, word);
                Operand::Memory(concat24(self.pbr, target))
            }
            AbsoluteIndexedIndirect => {
                let pointer = word.wrapping_add(x);
                let lo = bus.read_u8(concat24(self.pbr, pointer));
                let hi = bus.read_u8(concat24(self.pbr, pointer.wrapping_add(1)));
                Operand::Memory(concat24(self.pbr, concat16(hi, lo)))
            }
            AbsoluteIndirectLong => Operand::Memory(Self::read_bank0_u24(bus, word)),

            StackRelative => Operand::BankZero(self.sp.wrapping_add(byte as u16)),
            StackRelativeIndirectIndexed => {
                let pointer = Self::read_bank0_u16(bus, self.sp.wrapping_add(byte as u16));
                Operand::Memory(self.data_address(pointer, y))
            }

            Relative => {
                let target = self.pc.wrapping_add(byte as i8 as i16 as u16);
                Operand::Memory(concat24(self.pbr, target))
            }
            RelativeLong => Operand::Memory(concat24(self.pbr, self.pc.wrapping_add(word))),

            // Machine order is destination bank, then source bank.
            BlockMove => {
                let (source, destination) = split16(word);
                Operand::BlockMove {
                    destination,
                    source,
                }
            }
        }
    }
}
