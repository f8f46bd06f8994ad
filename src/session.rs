//! Debugger session: one machine plus the run/pause/breakpoint state a front
//! end drives it with.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::path::Path;
use std::rc::Rc;

use crate::bits::{hex, next_in_bank, Address};
use crate::bus::Bus;
use crate::cartridge::MapType;
use crate::cpu::{disassemble, DisassembledInstruction, StatusFlags};
use crate::error::{RomError, SaveStateError};
use crate::savestate::SaveState;

/// Lines shown by the disassembly view.
pub const DISASSEMBLY_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The instruction budget ran out while running.
    Budget,
    /// Execution reached the breakpoint; the session is now paused.
    Breakpoint(Address),
    /// The session was already paused.
    Paused,
    NoRom,
    /// The CPU executed STP.
    Stopped,
}

pub struct Session {
    bus: Bus,
    /// One-shot: cleared when hit.
    breakpoint: Option<Address>,
    continuous: bool,
    rom_loaded: bool,
    output: Rc<RefCell<String>>,
    instructions: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let output = Rc::new(RefCell::new(String::new()));
        let mut bus = Bus::new();
        let sink = Rc::clone(&output);
        bus.cpu
            .set_put_char_hook(Box::new(move |c| sink.borrow_mut().push(c)));
        Session {
            bus,
            breakpoint: None,
            continuous: true,
            rom_loaded: false,
            output,
            instructions: 0,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn is_rom_loaded(&self) -> bool {
        self.rom_loaded
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    pub fn breakpoint(&self) -> Option<Address> {
        self.breakpoint
    }

    pub fn set_breakpoint(&mut self, breakpoint: Option<Address>) {
        self.breakpoint = breakpoint;
    }

    /// Instructions executed since the last load or reset.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<MapType, RomError> {
        let result = self.bus.load_rom(path);
        self.after_load(result)
    }

    pub fn load_rom_bytes(&mut self, data: Vec<u8>) -> Result<MapType, RomError> {
        let result = self.bus.load_rom_bytes(data);
        self.after_load(result)
    }

    fn after_load(&mut self, result: Result<MapType, RomError>) -> Result<MapType, RomError> {
        self.output.borrow_mut().clear();
        self.breakpoint = None;
        self.instructions = 0;
        self.rom_loaded = matches!(result, Ok(ty) if ty != MapType::Invalid);
        result
    }

    pub fn close_rom(&mut self) {
        self.bus.close_rom();
        self.rom_loaded = false;
        self.breakpoint = None;
        self.instructions = 0;
        self.output.borrow_mut().clear();
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.instructions = 0;
        self.output.borrow_mut().clear();
    }

    /// 24-bit address of the next instruction.
    pub fn pc(&self) -> Address {
        self.bus.cpu.program_counter()
    }

    fn execute_one(&mut self) -> u8 {
        self.instructions += 1;
        self.bus.execute()
    }

    /// Executes one instruction while paused ("step into").
    pub fn step(&mut self) -> Option<u8> {
        if !self.rom_loaded || self.continuous {
            return None;
        }
        Some(self.execute_one())
    }

    /// Like [`step`](Self::step), but runs a subroutine call to completion
    /// by breaking on the instruction after it.
    pub fn step_over(&mut self) -> Option<u8> {
        if !self.rom_loaded || self.continuous {
            return None;
        }
        let pc = self.pc();
        let instruction = self.bus.cpu.peek_instruction(&self.bus.memory);
        if instruction.opcode.is_call() {
            let resume = next_in_bank(pc, instruction.size as u16);
            log::debug!("step over: break at {:06X}", resume);
            self.breakpoint = Some(resume);
            self.continuous = true;
            Some(0)
        } else {
            Some(self.execute_one())
        }
    }

    /// One front-end tick: honour the breakpoint, then run one instruction
    /// if running.
    pub fn tick(&mut self) -> Option<StopReason> {
        let pc = self.pc();
        if self.breakpoint == Some(pc) {
            self.breakpoint = None;
            self.continuous = false;
            log::debug!("breakpoint hit at {:06X}", pc);
            return Some(StopReason::Breakpoint(pc));
        }
        if !self.rom_loaded {
            return Some(StopReason::NoRom);
        }
        if !self.continuous {
            return Some(StopReason::Paused);
        }
        if self.bus.cpu.is_stopped() {
            return Some(StopReason::Stopped);
        }
        self.execute_one();
        None
    }

    /// Ticks until something stops execution or `max_instructions` have run.
    pub fn run(&mut self, max_instructions: u64) -> StopReason {
        let mut executed = 0;
        while executed < max_instructions {
            if let Some(reason) = self.tick() {
                return reason;
            }
            executed += 1;
        }
        // a breakpoint sitting right at the end still counts
        match self.breakpoint {
            Some(bp) if bp == self.pc() => self.tick().unwrap_or(StopReason::Budget),
            _ => StopReason::Budget,
        }
    }

    /// Characters written through WDM since load/reset.
    pub fn output(&self) -> String {
        self.output.borrow().clone()
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    /// Disassembly at PC using the CPU's current widths.
    pub fn disassembly(&self, count: usize) -> Vec<DisassembledInstruction> {
        let cpu = &self.bus.cpu;
        disassemble(
            &self.bus.memory,
            cpu.program_counter(),
            count,
            cpu.memory_and_accumulator_are_8bit(),
            cpu.index_registers_are_8bit(),
            cpu.using_emulation_mode(),
            cpu.flag(StatusFlags::CARRY),
        )
        .collect()
    }

    pub fn disassembly_view(&self) -> String {
        if let Some(message) = self.unavailable("disassembly") {
            return message;
        }
        let lines = self.disassembly(DISASSEMBLY_LINES);
        if lines.is_empty() {
            return format!("Failed to disassemble memory at {}", hex(self.pc(), 6));
        }
        let mut view = String::from("   ADDR  | CODE\n ------- | ----");
        for line in lines {
            let _ = write!(view, "\n {}", line);
        }
        view
    }

    /// Register dump in the debugger's layout.
    pub fn register_summary(&self) -> String {
        let cpu = &self.bus.cpu;
        let mut flags = String::with_capacity(8);
        for (flag, name) in [
            (StatusFlags::NEGATIVE, 'n'),
            (StatusFlags::OVERFLOW, 'v'),
            (StatusFlags::MEMORY_8BIT, 'm'),
            (StatusFlags::INDEX_8BIT, 'x'),
            (StatusFlags::DECIMAL, 'd'),
            (StatusFlags::IRQ_DISABLE, 'i'),
            (StatusFlags::ZERO, 'z'),
            (StatusFlags::CARRY, 'c'),
        ] {
            flags.push(if cpu.flag(flag) { name } else { '-' });
        }

        let mut view = String::new();
        view.push_str(if cpu.using_emulation_mode() {
            "emulation mode\n"
        } else {
            "native mode\n"
        });
        let _ = writeln!(view, "P = {}", flags);
        let _ = writeln!(
            view,
            "PBR = {}   DBR = {}",
            hex(cpu.pbr as u32, 2),
            hex(cpu.dbr as u32, 2)
        );
        let _ = writeln!(
            view,
            "DR  = {} SP  = {}",
            hex(cpu.dr as u32, 4),
            hex(cpu.sp as u32, 4)
        );
        let _ = writeln!(view, "PC  = {}", hex(cpu.pc as u32, 4));
        let _ = writeln!(view);
        let _ = writeln!(view, "A   = {}", hex(cpu.a.force_load_full() as u32, 4));
        let _ = write!(
            view,
            "X   = {} Y   = {}",
            hex(cpu.x.force_load_full() as u32, 4),
            hex(cpu.y.force_load_full() as u32, 4)
        );
        view
    }

    pub fn register_view(&self) -> String {
        self.unavailable("registers")
            .unwrap_or_else(|| self.register_summary())
    }

    fn unavailable(&self, what: &str) -> Option<String> {
        if !self.rom_loaded {
            Some("No ROM loaded".to_string())
        } else if self.continuous {
            Some(format!("Can't display {} while CPU is running", what))
        } else {
            None
        }
    }

    pub fn save_state(&self) -> SaveState {
        SaveState::capture(&self.bus)
    }

    pub fn restore_state(&mut self, state: &SaveState) -> Result<(), SaveStateError> {
        state.apply(&mut self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::build_image;

    /// LoROM cartridge with `program` at $00:8000.
    fn session_with(program: &[u8]) -> Session {
        let mut image = build_image(0x7FC0, 0x20, "SESSION");
        image[..program.len()].copy_from_slice(program);
        let mut session = Session::new();
        assert_eq!(session.load_rom_bytes(image).unwrap(), MapType::LoRom);
        session
    }

    #[test]
    fn starts_without_rom() {
        let mut session = Session::new();
        assert!(!session.is_rom_loaded());
        assert_eq!(session.tick(), Some(StopReason::NoRom));
        assert_eq!(session.register_view(), "No ROM loaded");
    }

    #[test]
    fn invalid_image_is_not_loaded() {
        let mut session = Session::new();
        assert_eq!(session.load_rom_bytes(vec![0; 0x8000]).unwrap(), MapType::Invalid);
        assert!(!session.is_rom_loaded());
    }

    #[test]
    fn runs_and_collects_output() {
        // LDA #'o' ; WDM ; LDA #'k' ; WDM ; STP
        let mut session = session_with(&[0xA9, b'o', 0x42, 0x00, 0xA9, b'k', 0x42, 0x00, 0xDB]);
        assert_eq!(session.run(100), StopReason::Stopped);
        assert_eq!(session.output(), "ok");
        assert_eq!(session.take_output(), "ok");
        assert_eq!(session.output(), "");
        assert_eq!(session.instructions(), 5);
    }

    #[test]
    fn breakpoint_pauses_once() {
        // NOP ; NOP ; NOP ; BRA -2
        let mut session = session_with(&[0xEA, 0xEA, 0xEA, 0x80, 0xFE]);
        session.set_breakpoint(Some(0x008002));
        assert_eq!(session.run(100), StopReason::Breakpoint(0x008002));
        assert!(!session.is_continuous());
        assert_eq!(session.breakpoint(), None);
        assert_eq!(session.run(100), StopReason::Paused);

        assert_eq!(session.step(), Some(2));
        assert_eq!(session.pc(), 0x008003);
    }

    #[test]
    fn step_over_breaks_after_the_call() {
        // JSR $8010 ; NOP ; ... $8010: LDA #'s' ; WDM ; RTS
        let mut program = vec![0xEA; 0x20];
        program[..3].copy_from_slice(&[0x20, 0x10, 0x80]);
        program[0x10..0x15].copy_from_slice(&[0xA9, b's', 0x42, 0x00, 0x60]);
        let mut session = session_with(&program);
        session.set_continuous(false);

        assert_eq!(session.step_over(), Some(0));
        assert_eq!(session.breakpoint(), Some(0x008003));
        assert!(session.is_continuous());

        assert_eq!(session.run(100), StopReason::Breakpoint(0x008003));
        assert_eq!(session.output(), "s");

        // a plain instruction just steps
        assert_eq!(session.step_over(), Some(2));
        assert_eq!(session.pc(), 0x008004);
    }

    #[test]
    fn step_requires_pause() {
        let mut session = session_with(&[0xEA]);
        assert_eq!(session.step(), None);
        assert_eq!(
            session.disassembly_view(),
            "Can't display disassembly while CPU is running"
        );
    }

    #[test]
    fn views_while_paused() {
        let mut session = session_with(&[0xA9, 0x12, 0xEA]);
        session.set_continuous(false);

        let view = session.disassembly_view();
        let lines: Vec<_> = view.lines().collect();
        assert_eq!(lines.len(), 2 + DISASSEMBLY_LINES);
        assert_eq!(lines[2], " $008000 | LDA #$12");
        assert_eq!(lines[3], " $008002 | NOP");

        let regs = session.register_view();
        let expected = [
            "emulation mode",
            "P = --mx-i--",
            "PBR = $00   DBR = $00",
            "DR  = $0000 SP  = $01FF",
            "PC  = $8000",
            "",
            "A   = $0000",
            "X   = $0000 Y   = $0000",
        ];
        assert_eq!(regs, expected.join("\n"));
    }

    #[test]
    fn close_rom_resets_everything() {
        let mut session = session_with(&[0xA9, b'x', 0x42, 0x00]);
        session.run(2);
        assert_eq!(session.output(), "x");
        session.close_rom();
        assert!(!session.is_rom_loaded());
        assert_eq!(session.output(), "");
        assert_eq!(session.run(10), StopReason::NoRom);
    }
}
