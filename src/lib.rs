//! Motorola 68000 instruction-set interpreter.
//!
//! The crate is layered leaves first: [`memory`] provides the 24-bit,
//! big-endian address space, [`registers`] the register file and status
//! word, [`decoder`] turns 16-bit opcodes into [`decoder::Instruction`]
//! records through a prebuilt 65536-entry table, and [`cpu`] resolves
//! effective addresses and executes instructions against that state.
//! [`loader`] copies ELF images into memory for the command line front end.

pub mod cpu;
pub mod decoder;
pub mod loader;
pub mod memory;
pub mod registers;

pub use cpu::{Cpu, CpuError, CpuState, StopReason};
pub use decoder::{DispatchTable, Instruction, InstructionKind, Size};
pub use memory::{AddressSpace, MEMORY_SIZE, Memory, MemoryError};
pub use registers::{Flag, Register, Registers};
