//! Blaze: a 65C816 CPU and memory bus core for a SNES-like machine.
//!
//! [`bus::Bus`] owns the CPU and everything it can address. Front ends drive
//! it through [`session::Session`], which adds breakpoints, stepping and the
//! character output produced by `WDM`.

pub mod bits;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod cpu_bus;
pub mod debug_flags;
pub mod error;
pub mod memory;
pub mod savestate;
pub mod session;

pub use bus::Bus;
pub use session::{Session, StopReason};
