use crate::{
    decoder::{AddrReg, EffectiveAddress, Size},
    memory::AddressSpace,
    registers::{Register, Registers},
};

use super::{CpuError, CpuState};

/// Post-increment/pre-decrement distance. Byte accesses through A7 move by
/// two to keep the stack word aligned.
pub(crate) fn ea_step(size: Size, reg: AddrReg) -> u32 {
    match size {
        Size::Byte if reg == AddrReg::A7 => 2,
        _ => size.bytes(),
    }
}

// Where a resolved operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Register(Register),
    Memory(u32),
    Immediate(u32),
}

// (An)+ / -(An) register update, committed only after the access succeeds.
type Writeback = Option<(AddrReg, u32)>;

impl<M: AddressSpace> CpuState<M> {
    /// Address named by a control-mode operand, consuming its extension
    /// words. Modes with no memory address resolve to 0 and consume nothing.
    pub fn control_address(&mut self, ea: EffectiveAddress) -> Result<u32, CpuError> {
        let pc = self.registers.pc();
        let (address, extension) = self.control_operand(ea, pc)?;
        self.registers.set_pc(pc.wrapping_add(extension));
        Ok(address)
    }

    /// Read an operand, applying every side effect of the mode: extension
    /// words are consumed and (An)+ / -(An) update the register.
    pub fn get_data(&mut self, ea: EffectiveAddress, size: Size) -> Result<u32, CpuError> {
        let (location, writeback) = self.locate(ea, size)?;
        let value = self.read_location(location, size)?;
        self.commit(writeback);
        Ok(value)
    }

    /// Read an operand without touching PC or any address register.
    pub fn get_data_silent(&self, ea: EffectiveAddress, size: Size) -> Result<u32, CpuError> {
        let location = self.locate_silent(ea, size)?;
        self.read_location(location, size)
    }

    /// Write an operand with the same side effects as [`CpuState::get_data`].
    pub fn set_data(
        &mut self,
        ea: EffectiveAddress,
        size: Size,
        value: u32,
    ) -> Result<(), CpuError> {
        if !ea.is_alterable() {
            return Err(CpuError::NotWritable(ea.mode()));
        }
        let (location, writeback) = self.locate(ea, size)?;
        match location {
            Location::Register(reg) => self.registers.set(reg, size, value),
            Location::Memory(addr) => self.memory.set(addr, size, value)?,
            Location::Immediate(_) => return Err(CpuError::NotWritable(ea.mode())),
        }
        self.commit(writeback);
        Ok(())
    }

    /// Read an operand silently, transform it, and write the result back,
    /// so the mode's side effects are applied exactly once.
    pub fn read_modify_write<F>(
        &mut self,
        ea: EffectiveAddress,
        size: Size,
        op: F,
    ) -> Result<u32, CpuError>
    where
        F: FnOnce(&mut Registers, u32) -> u32,
    {
        let value = self.get_data_silent(ea, size)?;
        let result = op(&mut self.registers, value) & size.mask();
        self.set_data(ea, size, result)?;
        Ok(result)
    }

    /// Signed offset contributed by a brief-format index extension word:
    /// the sign-extended 8-bit displacement plus the index register.
    pub fn index_displacement(&self, ext: u16) -> u32 {
        let number = ((ext >> 12) & 0b111) as u8;
        let reg = if ext & 0x8000 != 0 {
            Register::addr(number)
        } else {
            Register::data(number)
        };
        let index = if ext & 0x0800 != 0 {
            self.registers.get(reg, Size::Long)
        } else {
            Size::Word.sign_extend(self.registers.get(reg, Size::Word))
        };
        index.wrapping_add(Size::Byte.sign_extend(ext as u32))
    }

    // (address, extension bytes) for a control operand whose extension
    // words start at `pc`. PC-relative modes use `pc` as their base.
    fn control_operand(&self, ea: EffectiveAddress, pc: u32) -> Result<(u32, u32), CpuError> {
        let operand = match ea {
            EffectiveAddress::Addr(reg) => (self.addr_reg(reg), 0),
            EffectiveAddress::AddrDisplace(reg) => {
                let disp = Size::Word.sign_extend(self.memory.get(pc, Size::Word)?);
                (self.addr_reg(reg).wrapping_add(disp), 2)
            }
            EffectiveAddress::AddrIndex(reg) => {
                let ext = self.memory.get(pc, Size::Word)? as u16;
                (self.addr_reg(reg).wrapping_add(self.index_displacement(ext)), 2)
            }
            EffectiveAddress::PCDisplace => {
                let disp = Size::Word.sign_extend(self.memory.get(pc, Size::Word)?);
                (pc.wrapping_add(disp), 2)
            }
            EffectiveAddress::PCIndex => {
                let ext = self.memory.get(pc, Size::Word)? as u16;
                (pc.wrapping_add(self.index_displacement(ext)), 2)
            }
            EffectiveAddress::AbsShort => {
                (Size::Word.sign_extend(self.memory.get(pc, Size::Word)?), 2)
            }
            EffectiveAddress::AbsLong => (self.memory.get(pc, Size::Long)?, 4),
            EffectiveAddress::Dr(_)
            | EffectiveAddress::Ar(_)
            | EffectiveAddress::AddrPostIncr(_)
            | EffectiveAddress::AddrPreDecr(_)
            | EffectiveAddress::Immediate => (0, 0),
        };
        Ok(operand)
    }

    // (value, extension bytes) of an immediate operand at `pc`.
    fn immediate_operand(&self, pc: u32, size: Size) -> Result<(u32, u32), CpuError> {
        Ok(match size {
            Size::Byte => (self.memory.get(pc, Size::Word)? & 0xFF, 2),
            Size::Word => (self.memory.get(pc, Size::Word)?, 2),
            Size::Long => (self.memory.get(pc, Size::Long)?, 4),
        })
    }

    fn locate(
        &mut self,
        ea: EffectiveAddress,
        size: Size,
    ) -> Result<(Location, Writeback), CpuError> {
        let located = match ea {
            EffectiveAddress::Dr(reg) => (Location::Register(reg.into()), None),
            EffectiveAddress::Ar(reg) => (Location::Register(reg.into()), None),
            EffectiveAddress::AddrPostIncr(reg) => {
                let addr = self.addr_reg(reg);
                let next = addr.wrapping_add(ea_step(size, reg));
                (Location::Memory(addr), Some((reg, next)))
            }
            EffectiveAddress::AddrPreDecr(reg) => {
                let addr = self.addr_reg(reg).wrapping_sub(ea_step(size, reg));
                (Location::Memory(addr), Some((reg, addr)))
            }
            EffectiveAddress::Immediate => {
                let pc = self.registers.pc();
                let (value, extension) = self.immediate_operand(pc, size)?;
                self.registers.set_pc(pc.wrapping_add(extension));
                (Location::Immediate(value), None)
            }
            _ => (Location::Memory(self.control_address(ea)?), None),
        };
        Ok(located)
    }

    fn commit(&mut self, writeback: Writeback) {
        if let Some((reg, value)) = writeback {
            self.set_addr_reg(reg, value);
        }
    }

    fn locate_silent(&self, ea: EffectiveAddress, size: Size) -> Result<Location, CpuError> {
        let pc = self.registers.pc();
        match ea {
            EffectiveAddress::Dr(reg) => Ok(Location::Register(reg.into())),
            EffectiveAddress::Ar(reg) => Ok(Location::Register(reg.into())),
            EffectiveAddress::AddrPostIncr(reg) => Ok(Location::Memory(self.addr_reg(reg))),
            EffectiveAddress::AddrPreDecr(reg) => Ok(Location::Memory(
                self.addr_reg(reg).wrapping_sub(ea_step(size, reg)),
            )),
            EffectiveAddress::Immediate => {
                Ok(Location::Immediate(self.immediate_operand(pc, size)?.0))
            }
            _ => Ok(Location::Memory(self.control_operand(ea, pc)?.0)),
        }
    }

    fn read_location(&self, location: Location, size: Size) -> Result<u32, CpuError> {
        match location {
            Location::Register(reg) => Ok(self.registers.get(reg, size)),
            Location::Memory(addr) => Ok(self.memory.get(addr, size)?),
            Location::Immediate(value) => Ok(value & size.mask()),
        }
    }
}
