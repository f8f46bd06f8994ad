//! Instruction semantics.

use super::addressing::Operand;
use super::alu::Shift;
use super::opcode::{Instruction, Opcode};
use super::{Cpu, StatusFlags, Vector};
use crate::bits::{bank, concat24, lo, offset, split16, Address};
use crate::cpu_bus::CpuBus;

impl Cpu {
    /// Runs the decoded instruction and returns cycles beyond its base
    /// count. A mnemonic/operand pair with no defined meaning runs as a NOP.
    pub(super) fn dispatch<B: CpuBus>(
        &mut self,
        bus: &mut B,
        instruction: &Instruction,
        operand: Operand,
    ) -> u8 {
        let misaligned_dp =
            instruction.addressing_mode.uses_direct_page() && self.dr & 0x00FF != 0;

        match self.perform(bus, instruction, operand) {
            Some(extra) => extra + misaligned_dp as u8,
            None => {
                log::warn!(
                    "{} {:?} (opcode {:02X}) has no defined operation; executed as NOP",
                    instruction.opcode,
                    instruction.addressing_mode,
                    instruction.byte
                );
                0
            }
        }
    }

    fn load<B: CpuBus>(&mut self, bus: &mut B, operand: Operand, eight_bit: bool) -> Option<u16> {
        match operand {
            Operand::Immediate(value) => Some(lo(value, eight_bit)),
            Operand::Accumulator => Some(self.a.get(eight_bit)),
            Operand::Memory(address) => Some(if eight_bit {
                bus.read_u8(address) as u16
            } else {
                bus.read_u16(address)
            }),
            Operand::BankZero(address) => Some(if eight_bit {
                bus.read_u8(address as Address) as u16
            } else {
                Self::read_bank0_u16(bus, address)
            }),
            Operand::None | Operand::BlockMove { .. } => None,
        }
    }

    fn store<B: CpuBus>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        value: u16,
        eight_bit: bool,
    ) -> Option<()> {
        match operand {
            Operand::Accumulator => self.a.set(value, eight_bit),
            Operand::Memory(address) => {
                if eight_bit {
                    bus.write_u8(address, value as u8);
                } else {
                    bus.write_u16(address, value);
                }
            }
            Operand::BankZero(address) => {
                bus.write_u8(address as Address, value as u8);
                if !eight_bit {
                    let (hi, _) = split16(value);
                    bus.write_u8(address.wrapping_add(1) as Address, hi);
                }
            }
            Operand::None | Operand::Immediate(_) | Operand::BlockMove { .. } => return None,
        }
        Some(())
    }

    /// Read-modify-write at the accumulator width.
    fn modify<B, F>(&mut self, bus: &mut B, operand: Operand, eight_bit: bool, f: F) -> Option<()>
    where
        B: CpuBus,
        F: FnOnce(&mut Cpu, u16) -> u16,
    {
        if matches!(operand, Operand::Immediate(_)) {
            return None;
        }
        let value = self.load(bus, operand, eight_bit)?;
        let result = f(self, value);
        self.store(bus, operand, result, eight_bit)
    }

    fn target(operand: Operand) -> Option<Address> {
        match operand {
            Operand::Memory(address) => Some(address),
            _ => None,
        }
    }

    fn immediate(operand: Operand) -> Option<u16> {
        match operand {
            Operand::Immediate(value) => Some(value),
            _ => None,
        }
    }

    fn branch(&mut self, operand: Operand, condition: bool) -> Option<u8> {
        let destination = offset(Self::target(operand)?);
        if !condition {
            return Some(0);
        }
        let crossed = self.emulation_mode && (destination & 0xFF00) != (self.pc & 0xFF00);
        self.pc = destination;
        Some(1 + crossed as u8)
    }

    fn block_move<B: CpuBus>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        increment: bool,
    ) -> Option<u8> {
        let Operand::BlockMove { destination, source } = operand else {
            return None;
        };
        let eight = self.index_registers_are_8bit();
        let x = self.x.get(eight);
        let y = self.y.get(eight);

        let value = bus.read_u8(concat24(source, x));
        bus.write_u8(concat24(destination, y), value);
        self.dbr = destination;

        let step = if increment { 1 } else { 0xFFFF };
        self.x.set(x.wrapping_add(step), eight);
        self.y.set(y.wrapping_add(step), eight);

        // C counts down to $FFFF; until then the instruction repeats.
        let remaining = self.a.force_load_full().wrapping_sub(1);
        self.a.force_store_full(remaining);
        if remaining != 0xFFFF {
            self.pc = self.pc.wrapping_sub(3);
        }
        Some(0)
    }

    fn push_width<B: CpuBus>(&mut self, bus: &mut B, value: u16, eight_bit: bool) {
        if eight_bit {
            self.push8(bus, value as u8);
        } else {
            self.push16(bus, value);
        }
    }

    fn pull_width<B: CpuBus>(&mut self, bus: &mut B, eight_bit: bool) -> u16 {
        if eight_bit {
            self.pull8(bus) as u16
        } else {
            self.pull16(bus)
        }
    }

    fn perform<B: CpuBus>(
        &mut self,
        bus: &mut B,
        instruction: &Instruction,
        operand: Operand,
    ) -> Option<u8> {
        use Opcode::*;

        let m8 = self.memory_and_accumulator_are_8bit();
        let x8 = self.index_registers_are_8bit();
        let m_extra = !m8 as u8;
        let x_extra = !x8 as u8;
        let native_extra = !self.emulation_mode as u8;

        let extra = match instruction.opcode {
            Lda => {
                let v = self.load(bus, operand, m8)?;
                self.a.set(v, m8);
                self.set_nz(v, m8);
                m_extra
            }
            Ldx => {
                let v = self.load(bus, operand, x8)?;
                self.x.set(v, x8);
                self.set_nz(v, x8);
                x_extra
            }
            Ldy => {
                let v = self.load(bus, operand, x8)?;
                self.y.set(v, x8);
                self.set_nz(v, x8);
                x_extra
            }
            Sta => {
                let v = self.a.get(m8);
                self.store(bus, operand, v, m8)?;
                m_extra
            }
            Stx => {
                let v = self.x.get(x8);
                self.store(bus, operand, v, x8)?;
                x_extra
            }
            Sty => {
                let v = self.y.get(x8);
                self.store(bus, operand, v, x8)?;
                x_extra
            }
            Stz => {
                self.store(bus, operand, 0, m8)?;
                m_extra
            }

            Adc => {
                let v = self.load(bus, operand, m8)?;
                self.adc(v);
                m_extra
            }
            Sbc => {
                let v = self.load(bus, operand, m8)?;
                self.sbc(v);
                m_extra
            }
            And | Ora | Eor => {
                let v = self.load(bus, operand, m8)?;
                let a = self.a.get(m8);
                let result = match instruction.opcode {
                    And => a & v,
                    Ora => a | v,
                    _ => a ^ v,
                };
                self.a.set(result, m8);
                self.set_nz(result, m8);
                m_extra
            }
            Cmp => {
                let v = self.load(bus, operand, m8)?;
                self.compare(self.a.get(m8), v, m8);
                m_extra
            }
            Cpx => {
                let v = self.load(bus, operand, x8)?;
                self.compare(self.x.get(x8), v, x8);
                x_extra
            }
            Cpy => {
                let v = self.load(bus, operand, x8)?;
                self.compare(self.y.get(x8), v, x8);
                x_extra
            }
            Bit => {
                let v = self.load(bus, operand, m8)?;
                self.bit_test(v, matches!(operand, Operand::Immediate(_)));
                m_extra
            }

            Asl | Lsr | Rol | Ror => {
                let kind = match instruction.opcode {
                    Asl => Shift::Asl,
                    Lsr => Shift::Lsr,
                    Rol => Shift::Rol,
                    _ => Shift::Ror,
                };
                self.modify(bus, operand, m8, |cpu, v| cpu.shift(kind, v, m8))?;
                if operand == Operand::Accumulator {
                    0
                } else {
                    2 * m_extra
                }
            }
            Inc | Dec => {
                let step = if instruction.opcode == Inc { 1 } else { 0xFFFF };
                self.modify(bus, operand, m8, |cpu, v| {
                    let r = lo(v.wrapping_add(step), m8);
                    cpu.set_nz(r, m8);
                    r
                })?;
                if operand == Operand::Accumulator {
                    0
                } else {
                    2 * m_extra
                }
            }
            Tsb | Trb => {
                let a = self.a.get(m8);
                let set = instruction.opcode == Tsb;
                self.modify(bus, operand, m8, |cpu, v| {
                    cpu.p.set(StatusFlags::ZERO, a & v == 0);
                    if set {
                        v | a
                    } else {
                        v & !a
                    }
                })?;
                2 * m_extra
            }
            Inx | Dex => {
                let step = if instruction.opcode == Inx { 1 } else { 0xFFFF };
                let r = lo(self.x.get(x8).wrapping_add(step), x8);
                self.x.set(r, x8);
                self.set_nz(r, x8);
                0
            }
            Iny | Dey => {
                let step = if instruction.opcode == Iny { 1 } else { 0xFFFF };
                let r = lo(self.y.get(x8).wrapping_add(step), x8);
                self.y.set(r, x8);
                self.set_nz(r, x8);
                0
            }

            Bpl => self.branch(operand, !self.flag(StatusFlags::NEGATIVE))?,
            Bmi => self.branch(operand, self.flag(StatusFlags::NEGATIVE))?,
            Bvc => self.branch(operand, !self.flag(StatusFlags::OVERFLOW))?,
            Bvs => self.branch(operand, self.flag(StatusFlags::OVERFLOW))?,
            Bcc => self.branch(operand, !self.flag(StatusFlags::CARRY))?,
            Bcs => self.branch(operand, self.flag(StatusFlags::CARRY))?,
            Bne => self.branch(operand, !self.flag(StatusFlags::ZERO))?,
            Beq => self.branch(operand, self.flag(StatusFlags::ZERO))?,
            Bra => self.branch(operand, true)?,
            Brl => {
                self.pc = offset(Self::target(operand)?);
                0
            }

            Jmp => {
                self.pc = offset(Self::target(operand)?);
                0
            }
            Jml => {
                let t = Self::target(operand)?;
                self.pbr = bank(t);
                self.pc = offset(t);
                0
            }
            Jsr => {
                let t = Self::target(operand)?;
                self.push16(bus, self.pc.wrapping_sub(1));
                self.pc = offset(t);
                0
            }
            Jsl => {
                let t = Self::target(operand)?;
                self.push8_linear(bus, self.pbr);
                self.push16_linear(bus, self.pc.wrapping_sub(1));
                self.pin_stack();
                self.pbr = bank(t);
                self.pc = offset(t);
                0
            }
            Rts => {
                self.pc = self.pull16(bus).wrapping_add(1);
                0
            }
            Rtl => {
                self.pc = self.pull16_linear(bus).wrapping_add(1);
                self.pbr = self.pull8_linear(bus);
                self.pin_stack();
                0
            }
            Rti => {
                let p = self.pull8(bus);
                self.set_status(StatusFlags::from_bits_retain(p));
                self.pc = self.pull16(bus);
                if !self.emulation_mode {
                    self.pbr = self.pull8(bus);
                }
                native_extra
            }
            Brk => {
                self.enter_interrupt(bus, Vector::Brk);
                native_extra
            }
            Cop => {
                self.enter_interrupt(bus, Vector::Cop);
                native_extra
            }

            Pha => {
                self.push_width(bus, self.a.get(m8), m8);
                m_extra
            }
            Phx => {
                self.push_width(bus, self.x.get(x8), x8);
                x_extra
            }
            Phy => {
                self.push_width(bus, self.y.get(x8), x8);
                x_extra
            }
            Phb => {
                self.push8(bus, self.dbr);
                0
            }
            Phd => {
                self.push16_linear(bus, self.dr);
                self.pin_stack();
                0
            }
            Phk => {
                self.push8(bus, self.pbr);
                0
            }
            Php => {
                self.push8(bus, self.p.bits());
                0
            }
            Pla => {
                let v = self.pull_width(bus, m8);
                self.a.set(v, m8);
                self.set_nz(v, m8);
                m_extra
            }
            Plx => {
                let v = self.pull_width(bus, x8);
                self.x.set(v, x8);
                self.set_nz(v, x8);
                x_extra
            }
            Ply => {
                let v = self.pull_width(bus, x8);
                self.y.set(v, x8);
                self.set_nz(v, x8);
                x_extra
            }
            Plb => {
                self.dbr = self.pull8(bus);
                self.set_nz(self.dbr as u16, true);
                0
            }
            Pld => {
                self.dr = self.pull16_linear(bus);
                self.pin_stack();
                self.set_nz(self.dr, false);
                0
            }
            Plp => {
                let p = self.pull8(bus);
                self.set_status(StatusFlags::from_bits_retain(p));
                0
            }
            Pea => {
                let v = Self::immediate(operand)?;
                self.push16_linear(bus, v);
                self.pin_stack();
                0
            }
            Pei | Per => {
                let t = Self::target(operand)?;
                self.push16_linear(bus, offset(t));
                self.pin_stack();
                0
            }

            Tax | Tay => {
                let v = self.a.force_load_full();
                let r = if instruction.opcode == Tax { &mut self.x } else { &mut self.y };
                r.set(v, x8);
                self.set_nz(v, x8);
                0
            }
            Txa => {
                let v = self.x.force_load_full();
                self.a.set(v, m8);
                self.set_nz(v, m8);
                0
            }
            Tya => {
                let v = self.y.force_load_full();
                self.a.set(v, m8);
                self.set_nz(v, m8);
                0
            }
            Txy => {
                let v = self.x.force_load_full();
                self.y.set(v, x8);
                self.set_nz(v, x8);
                0
            }
            Tyx => {
                let v = self.y.force_load_full();
                self.x.set(v, x8);
                self.set_nz(v, x8);
                0
            }
            Tsx => {
                let v = self.sp;
                self.x.set(v, x8);
                self.set_nz(v, x8);
                0
            }
            Txs => {
                self.sp = if self.emulation_mode {
                    0x0100 | self.x.low() as u16
                } else {
                    self.x.force_load_full()
                };
                0
            }
            Tcs => {
                self.sp = if self.emulation_mode {
                    0x0100 | self.a.low() as u16
                } else {
                    self.a.force_load_full()
                };
                0
            }
            Tsc => {
                self.a.force_store_full(self.sp);
                self.set_nz(self.sp, false);
                0
            }
            Tcd => {
                self.dr = self.a.force_load_full();
                self.set_nz(self.dr, false);
                0
            }
            Tdc => {
                self.a.force_store_full(self.dr);
                self.set_nz(self.dr, false);
                0
            }
            Xba => {
                let swapped = self.a.force_load_full().rotate_left(8);
                self.a.force_store_full(swapped);
                self.set_nz(swapped, true);
                0
            }

            Clc => self.clear_flag(StatusFlags::CARRY),
            Cld => self.clear_flag(StatusFlags::DECIMAL),
            Cli => self.clear_flag(StatusFlags::IRQ_DISABLE),
            Clv => self.clear_flag(StatusFlags::OVERFLOW),
            Sec => self.set_flag(StatusFlags::CARRY),
            Sed => self.set_flag(StatusFlags::DECIMAL),
            Sei => self.set_flag(StatusFlags::IRQ_DISABLE),
            Rep => {
                let mask = Self::immediate(operand)? as u8;
                self.set_status(StatusFlags::from_bits_retain(self.p.bits() & !mask));
                0
            }
            Sep => {
                let mask = Self::immediate(operand)? as u8;
                self.set_status(StatusFlags::from_bits_retain(self.p.bits() | mask));
                0
            }
            Xce => {
                let carry = self.flag(StatusFlags::CARRY);
                self.p.set(StatusFlags::CARRY, self.emulation_mode);
                self.set_emulation_mode(carry);
                0
            }

            Mvn => self.block_move(bus, operand, true)?,
            Mvp => self.block_move(bus, operand, false)?,

            Nop => 0,
            Wdm => {
                self.emit_char(self.a.low());
                0
            }
            Wai => {
                self.waiting_for_interrupt = true;
                0
            }
            Stp => {
                self.stopped = true;
                0
            }
        };
        Some(extra)
    }

    fn set_flag(&mut self, flag: StatusFlags) -> u8 {
        self.p.insert(flag);
        0
    }

    fn clear_flag(&mut self, flag: StatusFlags) -> u8 {
        self.p.remove(flag);
        0
    }
}
