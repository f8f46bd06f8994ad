//! 65C816 core.
//!
//! The CPU is generic over [`CpuBus`] so it can run against the full
//! [`MemoryMap`](crate::bus::MemoryMap) or a flat test bus.

mod addressing;
mod alu;
pub mod disasm;
mod execute;
pub mod opcode;
mod register;


use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::bits::{concat16, concat24, concat24_bytes, split16, Address};
use crate::cpu_bus::CpuBus;
use crate::debug_flags;

pub use addressing::Operand;
pub use disasm::{disassemble, DisassembledInstruction, Disassembly};
pub use opcode::{decode_instruction, AddressingMode, Instruction, Opcode};
pub use register::WidthRegister;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const CARRY = 0b0000_0001;
        const ZERO = 0b0000_0010;
        const IRQ_DISABLE = 0b0000_0100;
        const DECIMAL = 0b0000_1000;
        const INDEX_8BIT = 0b0001_0000;
        const MEMORY_8BIT = 0b0010_0000;
        const OVERFLOW = 0b0100_0000;
        const NEGATIVE = 0b1000_0000;
    }
}

/// Bit 4 of P as pushed by BRK in emulation mode.
const BREAK_BIT: u8 = 0x10;

pub const POWER_ON_FLAGS: StatusFlags = StatusFlags::MEMORY_8BIT
    .union(StatusFlags::INDEX_8BIT)
    .union(StatusFlags::IRQ_DISABLE);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    Cop,
    Brk,
    Nmi,
    Irq,
}

impl Vector {
    pub fn address(self, emulation_mode: bool) -> Address {
        let offset: u16 = match (self, emulation_mode) {
            (Vector::Cop, false) => 0xFFE4,
            (Vector::Brk, false) => 0xFFE6,
            (Vector::Nmi, false) => 0xFFEA,
            (Vector::Irq, false) => 0xFFEE,
            (Vector::Cop, true) => 0xFFF4,
            (Vector::Nmi, true) => 0xFFFA,
            (Vector::Brk, true) | (Vector::Irq, true) => 0xFFFE,
        };
        concat24(0, offset)
    }
}

/// Receives characters written by the program through `WDM`.
pub type CharHook = Box<dyn FnMut(char)>;

/// Serializable copy of every register, used by save states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub a: u16,
    pub x: u16,
    pub y: u16,
    pub pc: u16,
    pub pbr: u8,
    pub dbr: u8,
    pub dr: u16,
    pub sp: u16,
    pub p: u8,
    pub emulation_mode: bool,
    pub waiting_for_interrupt: bool,
    pub stopped: bool,
    pub cycles: u64,
}

pub struct Cpu {
    pub a: WidthRegister,
    pub x: WidthRegister,
    pub y: WidthRegister,
    pub pc: u16,
    /// Program bank.
    pub pbr: u8,
    /// Data bank.
    pub dbr: u8,
    /// Direct page.
    pub dr: u16,
    pub sp: u16,
    pub p: StatusFlags,
    pub emulation_mode: bool,
    cycles: u64,
    waiting_for_interrupt: bool,
    stopped: bool,
    put_char: Option<CharHook>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        let mut cpu = Cpu {
            a: WidthRegister::default(),
            x: WidthRegister::default(),
            y: WidthRegister::default(),
            pc: 0,
            pbr: 0,
            dbr: 0,
            dr: 0,
            sp: 0,
            p: POWER_ON_FLAGS,
            emulation_mode: true,
            cycles: 0,
            waiting_for_interrupt: false,
            stopped: false,
            put_char: None,
        };
        cpu.reset(0);
        cpu
    }

    /// Power-on state with PC taken from the reset vector. The character
    /// hook stays installed.
    pub fn reset(&mut self, reset_vector: u16) {
        self.a = WidthRegister::default();
        self.x = WidthRegister::default();
        self.y = WidthRegister::default();
        self.pc = reset_vector;
        self.pbr = 0;
        self.dbr = 0;
        self.dr = 0;
        self.sp = 0x01FF;
        self.p = POWER_ON_FLAGS;
        self.emulation_mode = true;
        self.cycles = 0;
        self.waiting_for_interrupt = false;
        self.stopped = false;
    }

    pub fn set_put_char_hook(&mut self, hook: CharHook) {
        self.put_char = Some(hook);
    }

    pub fn clear_put_char_hook(&mut self) {
        self.put_char = None;
    }

    #[inline]
    pub fn memory_and_accumulator_are_8bit(&self) -> bool {
        self.emulation_mode || self.p.contains(StatusFlags::MEMORY_8BIT)
    }

    #[inline]
    pub fn index_registers_are_8bit(&self) -> bool {
        self.emulation_mode || self.p.contains(StatusFlags::INDEX_8BIT)
    }

    #[inline]
    pub fn using_emulation_mode(&self) -> bool {
        self.emulation_mode
    }

    #[inline]
    pub fn flag(&self, flag: StatusFlags) -> bool {
        self.p.contains(flag)
    }

    /// A at the current accumulator width.
    pub fn accumulator(&self) -> u16 {
        self.a.get(self.memory_and_accumulator_are_8bit())
    }

    pub fn set_accumulator(&mut self, value: u16) {
        let eight = self.memory_and_accumulator_are_8bit();
        self.a.set(value, eight);
    }

    pub fn index_x(&self) -> u16 {
        self.x.get(self.index_registers_are_8bit())
    }

    pub fn index_y(&self) -> u16 {
        self.y.get(self.index_registers_are_8bit())
    }

    /// Full 24-bit address of the next instruction.
    pub fn program_counter(&self) -> Address {
        concat24(self.pbr, self.pc)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting_for_interrupt
    }

    /// Replaces P. Emulation mode pins m and x; an 8-bit index width drops
    /// the X/Y high bytes.
    pub fn set_status(&mut self, value: StatusFlags) {
        let mut p = value;
        if self.emulation_mode {
            p.insert(StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT);
        }
        self.p = p;
        if p.contains(StatusFlags::INDEX_8BIT) {
            self.x.clear_high();
            self.y.clear_high();
        }
    }

    /// Switches modes the way XCE does.
    pub fn set_emulation_mode(&mut self, emulation: bool) {
        self.emulation_mode = emulation;
        if emulation {
            self.set_status(self.p);
            self.pin_stack();
        }
    }

    pub fn state(&self) -> CpuState {
        CpuState {
            a: self.a.force_load_full(),
            x: self.x.force_load_full(),
            y: self.y.force_load_full(),
            pc: self.pc,
            pbr: self.pbr,
            dbr: self.dbr,
            dr: self.dr,
            sp: self.sp,
            p: self.p.bits(),
            emulation_mode: self.emulation_mode,
            waiting_for_interrupt: self.waiting_for_interrupt,
            stopped: self.stopped,
            cycles: self.cycles,
        }
    }

    pub fn restore(&mut self, state: &CpuState) {
        self.a.force_store_full(state.a);
        self.x.force_store_full(state.x);
        self.y.force_store_full(state.y);
        self.pc = state.pc;
        self.pbr = state.pbr;
        self.dbr = state.dbr;
        self.dr = state.dr;
        self.sp = state.sp;
        self.emulation_mode = state.emulation_mode;
        self.set_status(StatusFlags::from_bits_retain(state.p));
        self.pin_stack();
        self.waiting_for_interrupt = state.waiting_for_interrupt;
        self.stopped = state.stopped;
        self.cycles = state.cycles;
    }

    /// Decodes the instruction at PC with the current widths, without
    /// executing it.
    pub fn peek_instruction<B: CpuBus + ?Sized>(&self, bus: &B) -> Instruction {
        decode_instruction(
            bus.peek_u8(self.program_counter()),
            self.memory_and_accumulator_are_8bit(),
            self.index_registers_are_8bit(),
        )
    }

    /// Executes one instruction and returns the cycles it took.
    ///
    /// A stopped core, or one waiting in WAI, burns a single cycle.
    pub fn execute<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        if self.stopped || self.waiting_for_interrupt {
            self.cycles += 1;
            return 1;
        }

        let start = self.program_counter();
        let instruction = decode_instruction(
            bus.read_u8(start),
            self.memory_and_accumulator_are_8bit(),
            self.index_registers_are_8bit(),
        );
        let raw = self.fetch_operand(bus, instruction.size);

        if debug_flags::trace() {
            log::trace!(
                "{:06X}  {:<16} A:{:04X} X:{:04X} Y:{:04X} S:{:04X} D:{:04X} DB:{:02X} P:{:02X}{}",
                start,
                disasm::format_instruction(
                    &instruction,
                    start,
                    raw,
                    self.emulation_mode,
                    self.flag(StatusFlags::CARRY)
                ),
                self.a.force_load_full(),
                self.x.force_load_full(),
                self.y.force_load_full(),
                self.sp,
                self.dr,
                self.dbr,
                self.p.bits(),
                if self.emulation_mode { " E" } else { "" }
            );
        }

        self.pc = self.pc.wrapping_add(instruction.size as u16);
        let operand = self.resolve_operand(bus, &instruction, raw);
        let extra = self.dispatch(bus, &instruction, operand);

        let cycles = instruction.base_cycles.saturating_add(extra);
        self.cycles += cycles as u64;
        cycles
    }

    /// Little-endian operand bytes after the opcode, read within the
    /// program bank.
    fn fetch_operand<B: CpuBus>(&mut self, bus: &mut B, size: u8) -> u32 {
        let mut operand = [0u8; 3];
        for i in 1..size {
            let address = concat24(self.pbr, self.pc.wrapping_add(i as u16));
            operand[i as usize - 1] = bus.read_u8(address);
        }
        concat24_bytes(operand[2], operand[1], operand[0])
    }

    /// Non-maskable interrupt.
    pub fn nmi<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        self.interrupt(bus, Vector::Nmi)
    }

    /// Maskable interrupt. With `i` set it only releases a pending WAI.
    pub fn irq<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        if self.flag(StatusFlags::IRQ_DISABLE) {
            self.waiting_for_interrupt = false;
            return 0;
        }
        self.interrupt(bus, Vector::Irq)
    }

    fn interrupt<B: CpuBus>(&mut self, bus: &mut B, vector: Vector) -> u8 {
        if self.stopped {
            return 0;
        }
        self.enter_interrupt(bus, vector);
        let cycles = if self.emulation_mode { 7 } else { 8 };
        self.cycles += cycles as u64;
        cycles
    }

    /// Pushes the return state and jumps through `vector`. PC must already
    /// point at the return address.
    fn enter_interrupt<B: CpuBus>(&mut self, bus: &mut B, vector: Vector) {
        if !self.emulation_mode {
            self.push8(bus, self.pbr);
        }
        self.push16(bus, self.pc);
        let mut pushed = self.p.bits();
        if self.emulation_mode {
            pushed = if vector == Vector::Brk {
                pushed | BREAK_BIT
            } else {
                pushed & !BREAK_BIT
            };
        }
        self.push8(bus, pushed);

        self.p.insert(StatusFlags::IRQ_DISABLE);
        self.p.remove(StatusFlags::DECIMAL);
        self.pbr = 0;
        self.pc = bus.read_u16(vector.address(self.emulation_mode));
        self.waiting_for_interrupt = false;
    }

    fn stack_step(&self, delta: i16) -> u16 {
        let next = self.sp.wrapping_add(delta as u16);
        if self.emulation_mode {
            0x0100 | (next & 0x00FF)
        } else {
            next
        }
    }

    fn push8<B: CpuBus>(&mut self, bus: &mut B, value: u8) {
        bus.write_u8(self.sp as Address, value);
        self.sp = self.stack_step(-1);
    }

    fn push16<B: CpuBus>(&mut self, bus: &mut B, value: u16) {
        let (hi, lo) = split16(value);
        self.push8(bus, hi);
        self.push8(bus, lo);
    }

    fn pull8<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.stack_step(1);
        bus.read_u8(self.sp as Address)
    }

    fn pull16<B: CpuBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pull8(bus);
        let hi = self.pull8(bus);
        concat16(hi, lo)
    }

    // The 65816-only stack instructions (PEA, PEI, PER, PHD, PLD, JSL, RTL)
    // move S as a full 16-bit pointer and may leave page 1 in emulation mode.
    // `pin_stack` puts S back in page 1 once the instruction is done.

    fn push8_linear<B: CpuBus>(&mut self, bus: &mut B, value: u8) {
        bus.write_u8(self.sp as Address, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn push16_linear<B: CpuBus>(&mut self, bus: &mut B, value: u16) {
        let (hi, lo) = split16(value);
        self.push8_linear(bus, hi);
        self.push8_linear(bus, lo);
    }

    fn pull8_linear<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read_u8(self.sp as Address)
    }

    fn pull16_linear<B: CpuBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pull8_linear(bus);
        let hi = self.pull8_linear(bus);
        concat16(hi, lo)
    }

    fn pin_stack(&mut self) {
        if self.emulation_mode {
            self.sp = 0x0100 | (self.sp & 0x00FF);
        }
    }

    fn emit_char(&mut self, byte: u8) {
        if let Some(hook) = self.put_char.as_mut() {
            hook(byte as char);
        }
    }
}
