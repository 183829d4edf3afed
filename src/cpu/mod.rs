use std::{error::Error, fmt, sync::Arc};

use log::trace;

use crate::{
    decoder::{AddrReg, AddressingMode, Condition, DispatchTable, Instruction, Size},
    memory::{AddressSpace, Memory, MemoryError},
    registers::{Register, Registers},
};

mod disasm;
mod ea;
mod execute;
mod flags;

pub(crate) use ea::ea_step;

/// Failures raised while executing an instruction. Execution stops at the
/// failing access; register and memory changes made before it are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    Memory(MemoryError),
    /// The opcode at `pc` has no valid decoding.
    IllegalInstruction { opcode: u16, pc: u32 },
    /// A write was attempted through a PC-relative or immediate operand.
    NotWritable(AddressingMode),
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuError::Memory(err) => write!(f, "memory fault: {err}"),
            CpuError::IllegalInstruction { opcode, pc } => {
                write!(f, "illegal instruction {opcode:#06x} at {pc:#010x}")
            }
            CpuError::NotWritable(mode) => write!(f, "cannot write through {mode} operand"),
        }
    }
}

impl Error for CpuError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CpuError::Memory(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemoryError> for CpuError {
    fn from(err: MemoryError) -> Self {
        CpuError::Memory(err)
    }
}

/// Registers and memory: everything an instruction reads or writes.
#[derive(Debug, Clone)]
pub struct CpuState<M: AddressSpace = Memory> {
    pub registers: Registers,
    pub memory: M,
}

impl<M: AddressSpace> CpuState<M> {
    pub fn new(memory: M) -> Self {
        Self {
            registers: Registers::new(),
            memory,
        }
    }

    /// Read the word at PC and advance past it.
    pub fn fetch_word(&mut self) -> Result<u16, CpuError> {
        let pc = self.registers.pc();
        let word = self.memory.get(pc, Size::Word)? as u16;
        self.registers.set_pc(pc.wrapping_add(2));
        Ok(word)
    }

    /// Read the long at PC and advance past it.
    pub fn fetch_long(&mut self) -> Result<u32, CpuError> {
        let pc = self.registers.pc();
        let long = self.memory.get(pc, Size::Long)?;
        self.registers.set_pc(pc.wrapping_add(4));
        Ok(long)
    }

    /// Push onto the active stack. Bytes occupy a full word.
    pub fn push(&mut self, size: Size, value: u32) -> Result<(), CpuError> {
        let sp = self
            .registers
            .stack_pointer()
            .wrapping_sub(ea_step(size, AddrReg::A7));
        self.memory.set(sp, size, value)?;
        self.registers.set_stack_pointer(sp);
        Ok(())
    }

    pub fn pop(&mut self, size: Size) -> Result<u32, CpuError> {
        let sp = self.registers.stack_pointer();
        let value = self.memory.get(sp, size)?;
        self.registers
            .set_stack_pointer(sp.wrapping_add(ea_step(size, AddrReg::A7)));
        Ok(value)
    }

    pub fn check_condition(&self, condition: Condition) -> bool {
        flags::test_condition(&self.registers, condition)
    }

    fn addr_reg(&self, reg: AddrReg) -> u32 {
        self.registers.get(Register::from(reg), Size::Long)
    }

    fn set_addr_reg(&mut self, reg: AddrReg, value: u32) {
        self.registers.set(Register::from(reg), Size::Long, value);
    }
}

impl Default for CpuState<Memory> {
    fn default() -> Self {
        Self::new(Memory::default())
    }
}

/// Why [`Cpu::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Reached { pc: u32, steps: u64 },
    StepLimit { steps: u64 },
}

/// Fetch/decode/execute driver over a [`CpuState`].
#[derive(Debug, Clone)]
pub struct Cpu<M: AddressSpace = Memory> {
    pub state: CpuState<M>,
    table: Arc<DispatchTable>,
}

impl Cpu<Memory> {
    pub fn new() -> Self {
        Self::with_memory(Memory::default())
    }
}

impl Default for Cpu<Memory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: AddressSpace> Cpu<M> {
    /// A CPU over `memory` using the process-wide dispatch table.
    pub fn with_memory(memory: M) -> Self {
        Self::with_table(memory, DispatchTable::shared())
    }

    pub fn with_table(memory: M, table: Arc<DispatchTable>) -> Self {
        Self {
            state: CpuState::new(memory),
            table,
        }
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Execute the instruction at PC and return its decoded record.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        let pc = self.state.registers.pc();
        let opcode = self.state.memory.get(pc, Size::Word)? as u16;
        let instruction = *self.table.decode(opcode);
        trace!("{pc:#010x}: {opcode:04x} {}", instruction.kind.name());
        self.state.execute(&instruction)?;
        Ok(instruction)
    }

    /// Step until PC equals `stop_at` or `max_steps` instructions have run.
    /// With neither bound this only returns on a fault.
    pub fn run_until(
        &mut self,
        stop_at: Option<u32>,
        max_steps: Option<u64>,
    ) -> Result<StopReason, CpuError> {
        let mut steps = 0u64;
        loop {
            let pc = self.state.registers.pc();
            if stop_at == Some(pc) {
                return Ok(StopReason::Reached { pc, steps });
            }
            if max_steps.is_some_and(|max| steps >= max) {
                return Ok(StopReason::StepLimit { steps });
            }
            self.step()?;
            steps += 1;
        }
    }
}
