use crate::{
    decoder::{
        AddrOp, AddrReg, Binary, Condition, DataReg, DnToEa, EffectiveAddress, Exg, ExtMode,
        ExtendOp, ImmOp, Instruction, InstructionKind, QuickOp, Size, UnaryOp,
    },
    memory::AddressSpace,
    registers::{Flag, Register, Registers},
};

use super::{
    CpuError, CpuState,
    flags::{
        add_with_flags, addx_with_flags, cmp_with_flags, set_logic_flags, sub_with_flags,
        subx_with_flags,
    },
};

// src, dst, size -> result, setting flags.
type Alu = fn(u32, u32, Size, &mut Registers) -> u32;

fn add_alu(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    add_with_flags(src, dst, size, regs)
}

fn sub_alu(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    sub_with_flags(dst, src, size, regs)
}

fn addx_alu(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    addx_with_flags(src, dst, size, regs)
}

fn subx_alu(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    subx_with_flags(dst, src, size, regs)
}

fn or_alu(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    let result = (src | dst) & size.mask();
    set_logic_flags(result, size, regs);
    result
}

fn and_alu(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    let result = src & dst & size.mask();
    set_logic_flags(result, size, regs);
    result
}

fn eor_alu(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    let result = (src ^ dst) & size.mask();
    set_logic_flags(result, size, regs);
    result
}

impl<M: AddressSpace> CpuState<M> {
    /// Execute one decoded instruction whose opcode is at PC. PC is first
    /// advanced past the opcode; extension words are consumed as operands
    /// are resolved.
    pub fn execute(&mut self, instruction: &Instruction) -> Result<(), CpuError> {
        let pc = self.registers.pc();
        self.registers.set_pc(pc.wrapping_add(2));

        match instruction.kind {
            InstructionKind::Illegal => Err(CpuError::IllegalInstruction {
                opcode: instruction.opcode,
                pc,
            }),
            InstructionKind::Nop => Ok(()),
            InstructionKind::Rts => self.exec_rts(),
            InstructionKind::Ori(op) => self.exec_immediate(op, or_alu),
            InstructionKind::Andi(op) => self.exec_immediate(op, and_alu),
            InstructionKind::Subi(op) => self.exec_immediate(op, sub_alu),
            InstructionKind::Addi(op) => self.exec_immediate(op, add_alu),
            InstructionKind::Eori(op) => self.exec_immediate(op, eor_alu),
            InstructionKind::Cmpi(op) => self.exec_cmpi(op),
            InstructionKind::Move { size, src, dst } => self.exec_move(size, src, dst),
            InstructionKind::Movea { size, src, dst } => self.exec_movea(size, src, dst),
            InstructionKind::Moveq { data, dst } => {
                self.exec_moveq(data, dst);
                Ok(())
            }
            InstructionKind::Negx(op) => self.exec_negx(op),
            InstructionKind::Clr(op) => self.exec_clr(op),
            InstructionKind::Neg(op) => self.exec_neg(op),
            InstructionKind::Not(op) => self.exec_not(op),
            InstructionKind::Tst(op) => self.exec_tst(op),
            InstructionKind::Ext { data_reg, mode } => {
                self.exec_ext(data_reg, mode);
                Ok(())
            }
            InstructionKind::Swap { data_reg } => {
                self.exec_swap(data_reg);
                Ok(())
            }
            InstructionKind::Pea { mode } => self.exec_pea(mode),
            InstructionKind::Lea { src, dst } => self.exec_lea(src, dst),
            InstructionKind::Link { addr_reg } => self.exec_link(addr_reg),
            InstructionKind::Unlk { addr_reg } => self.exec_unlk(addr_reg),
            InstructionKind::Jsr { mode } => self.exec_jsr(mode),
            InstructionKind::Jmp { mode } => self.exec_jmp(mode),
            InstructionKind::Addq(op) => self.exec_quick(op, add_alu, u32::wrapping_add),
            InstructionKind::Subq(op) => self.exec_quick(op, sub_alu, u32::wrapping_sub),
            InstructionKind::Scc { condition, mode } => self.exec_scc(condition, mode),
            InstructionKind::DBcc {
                condition,
                data_reg,
            } => self.exec_dbcc(condition, data_reg),
            InstructionKind::Bra { displacement } => self.exec_bra(displacement),
            InstructionKind::Bsr { displacement } => self.exec_bsr(displacement),
            InstructionKind::Bcc {
                condition,
                displacement,
            } => self.exec_bcc(condition, displacement),
            InstructionKind::Or(op) => self.exec_binary(op, or_alu),
            InstructionKind::And(op) => self.exec_binary(op, and_alu),
            InstructionKind::Sub(op) => self.exec_binary(op, sub_alu),
            InstructionKind::Add(op) => self.exec_binary(op, add_alu),
            InstructionKind::Eor(op) => self.exec_dn_to_ea(op, eor_alu),
            InstructionKind::Cmp(op) => {
                let src = self.get_data(op.src, op.size)?;
                let dst = self.registers.get(op.dst.into(), op.size);
                cmp_with_flags(dst, src, op.size, &mut self.registers);
                Ok(())
            }
            InstructionKind::Suba(op) => self.exec_addr_op(op, u32::wrapping_sub),
            InstructionKind::Adda(op) => self.exec_addr_op(op, u32::wrapping_add),
            InstructionKind::Cmpa(op) => self.exec_cmpa(op),
            InstructionKind::Subx(op) => self.exec_extend(op, subx_alu),
            InstructionKind::Addx(op) => self.exec_extend(op, addx_alu),
            InstructionKind::Cmpm { size, src, dst } => self.exec_cmpm(size, src, dst),
            InstructionKind::Exg(exg) => {
                self.exec_exg(exg);
                Ok(())
            }
        }
    }

    // ORI/ANDI/SUBI/ADDI/EORI - immediate source, read-modify-write destination
    fn exec_immediate(&mut self, op: ImmOp, alu: Alu) -> Result<(), CpuError> {
        let src = self.get_data(EffectiveAddress::Immediate, op.size)?;
        self.read_modify_write(op.mode, op.size, |regs, dst| alu(src, dst, op.size, regs))?;
        Ok(())
    }

    // CMPI - Compare Immediate
    fn exec_cmpi(&mut self, op: ImmOp) -> Result<(), CpuError> {
        let src = self.get_data(EffectiveAddress::Immediate, op.size)?;
        let dst = self.get_data(op.mode, op.size)?;
        cmp_with_flags(dst, src, op.size, &mut self.registers);
        Ok(())
    }

    // MOVE - Move data from source to destination
    fn exec_move(
        &mut self,
        size: Size,
        src: EffectiveAddress,
        dst: EffectiveAddress,
    ) -> Result<(), CpuError> {
        let value = self.get_data(src, size)?;
        self.set_data(dst, size, value)?;
        set_logic_flags(value, size, &mut self.registers);
        Ok(())
    }

    // MOVEA - Move Address (sign-extended, no flags)
    fn exec_movea(
        &mut self,
        size: Size,
        src: EffectiveAddress,
        dst: AddrReg,
    ) -> Result<(), CpuError> {
        let value = size.sign_extend(self.get_data(src, size)?);
        self.registers.set(dst.into(), Size::Long, value);
        Ok(())
    }

    // MOVEQ - Move Quick
    fn exec_moveq(&mut self, data: i8, dst: DataReg) {
        let value = data as i32 as u32;
        self.registers.set(dst.into(), Size::Long, value);
        set_logic_flags(value, Size::Long, &mut self.registers);
    }

    // NEGX - Negate with Extend
    fn exec_negx(&mut self, op: UnaryOp) -> Result<(), CpuError> {
        self.read_modify_write(op.mode, op.size, |regs, value| {
            subx_with_flags(0, value, op.size, regs)
        })?;
        Ok(())
    }

    // CLR - Clear an operand
    fn exec_clr(&mut self, op: UnaryOp) -> Result<(), CpuError> {
        self.set_data(op.mode, op.size, 0)?;
        self.registers.set_flag(Flag::Negative, false);
        self.registers.set_flag(Flag::Zero, true);
        self.registers.set_flag(Flag::Overflow, false);
        self.registers.set_flag(Flag::Carry, false);
        Ok(())
    }

    // NEG - Negate (two's complement)
    fn exec_neg(&mut self, op: UnaryOp) -> Result<(), CpuError> {
        self.read_modify_write(op.mode, op.size, |regs, value| {
            sub_with_flags(0, value, op.size, regs)
        })?;
        Ok(())
    }

    // NOT - Logical complement
    fn exec_not(&mut self, op: UnaryOp) -> Result<(), CpuError> {
        self.read_modify_write(op.mode, op.size, |regs, value| {
            let result = !value & op.size.mask();
            set_logic_flags(result, op.size, regs);
            result
        })?;
        Ok(())
    }

    // TST - Test an operand
    fn exec_tst(&mut self, op: UnaryOp) -> Result<(), CpuError> {
        let value = self.get_data(op.mode, op.size)?;
        set_logic_flags(value, op.size, &mut self.registers);
        Ok(())
    }

    // EXT - Sign extend
    fn exec_ext(&mut self, data_reg: DataReg, mode: ExtMode) {
        let reg = Register::from(data_reg);
        let (size, value) = match mode {
            ExtMode::ByteToWord => (
                Size::Word,
                Size::Byte.sign_extend(self.registers.get(reg, Size::Byte)),
            ),
            ExtMode::WordToLong => (
                Size::Long,
                Size::Word.sign_extend(self.registers.get(reg, Size::Word)),
            ),
        };
        self.registers.set(reg, size, value);
        set_logic_flags(value, size, &mut self.registers);
    }

    // SWAP - Swap register halves
    fn exec_swap(&mut self, data_reg: DataReg) {
        let reg = Register::from(data_reg);
        let value = self.registers.get(reg, Size::Long).rotate_left(16);
        self.registers.set(reg, Size::Long, value);
        set_logic_flags(value, Size::Long, &mut self.registers);
    }

    // PEA - Push Effective Address
    fn exec_pea(&mut self, mode: EffectiveAddress) -> Result<(), CpuError> {
        let addr = self.control_address(mode)?;
        self.push(Size::Long, addr)
    }

    // LEA - Load Effective Address
    fn exec_lea(&mut self, src: EffectiveAddress, dst: AddrReg) -> Result<(), CpuError> {
        let addr = self.control_address(src)?;
        self.registers.set(dst.into(), Size::Long, addr);
        Ok(())
    }

    // LINK - Link and Allocate
    fn exec_link(&mut self, addr_reg: AddrReg) -> Result<(), CpuError> {
        let displacement = Size::Word.sign_extend(self.fetch_word()? as u32);
        // link %a7 stores the already decremented stack pointer
        let saved = match addr_reg {
            AddrReg::A7 => self.registers.stack_pointer().wrapping_sub(4),
            _ => self.addr_reg(addr_reg),
        };
        self.push(Size::Long, saved)?;
        let sp = self.registers.stack_pointer();
        self.set_addr_reg(addr_reg, sp);
        self.registers
            .set_stack_pointer(sp.wrapping_add(displacement));
        Ok(())
    }

    // UNLK - Unlink
    fn exec_unlk(&mut self, addr_reg: AddrReg) -> Result<(), CpuError> {
        self.registers.set_stack_pointer(self.addr_reg(addr_reg));
        let value = self.pop(Size::Long)?;
        self.set_addr_reg(addr_reg, value);
        Ok(())
    }

    // JSR - Jump to Subroutine
    fn exec_jsr(&mut self, mode: EffectiveAddress) -> Result<(), CpuError> {
        let target = self.control_address(mode)?;
        self.push(Size::Long, self.registers.pc())?;
        self.registers.set_pc(target);
        Ok(())
    }

    // JMP - Jump
    fn exec_jmp(&mut self, mode: EffectiveAddress) -> Result<(), CpuError> {
        let target = self.control_address(mode)?;
        self.registers.set_pc(target);
        Ok(())
    }

    // RTS - Return from Subroutine
    fn exec_rts(&mut self) -> Result<(), CpuError> {
        let target = self.pop(Size::Long)?;
        self.registers.set_pc(target);
        Ok(())
    }

    // ADDQ/SUBQ - address register destinations use all 32 bits and leave flags
    fn exec_quick(
        &mut self,
        op: QuickOp,
        alu: Alu,
        address_op: fn(u32, u32) -> u32,
    ) -> Result<(), CpuError> {
        let data = op.data as u32;
        if let EffectiveAddress::Ar(reg) = op.mode {
            let value = address_op(self.addr_reg(reg), data);
            self.set_addr_reg(reg, value);
            return Ok(());
        }
        self.read_modify_write(op.mode, op.size, |regs, dst| alu(data, dst, op.size, regs))?;
        Ok(())
    }

    // Scc - Set according to condition
    fn exec_scc(&mut self, condition: Condition, mode: EffectiveAddress) -> Result<(), CpuError> {
        let value = if self.check_condition(condition) {
            0xFF
        } else {
            0x00
        };
        self.set_data(mode, Size::Byte, value)
    }

    // DBcc - Decrement and Branch on Condition
    fn exec_dbcc(&mut self, condition: Condition, data_reg: DataReg) -> Result<(), CpuError> {
        let base = self.registers.pc();
        let displacement = Size::Word.sign_extend(self.fetch_word()? as u32);
        if self.check_condition(condition) {
            return Ok(());
        }
        let reg = Register::from(data_reg);
        let counter = (self.registers.get(reg, Size::Word) as u16).wrapping_sub(1);
        self.registers.set(reg, Size::Word, counter as u32);
        if counter != 0xFFFF {
            self.registers.set_pc(base.wrapping_add(displacement));
        }
        Ok(())
    }

    // Branch target relative to the word after the opcode. A zero 8-bit
    // displacement means a 16-bit displacement word follows.
    fn branch_target(&mut self, displacement: i8) -> Result<u32, CpuError> {
        let base = self.registers.pc();
        let displacement = if displacement == 0 {
            Size::Word.sign_extend(self.fetch_word()? as u32)
        } else {
            displacement as i32 as u32
        };
        Ok(base.wrapping_add(displacement))
    }

    // BRA - Branch Always
    fn exec_bra(&mut self, displacement: i8) -> Result<(), CpuError> {
        let target = self.branch_target(displacement)?;
        self.registers.set_pc(target);
        Ok(())
    }

    // BSR - Branch to Subroutine
    fn exec_bsr(&mut self, displacement: i8) -> Result<(), CpuError> {
        let target = self.branch_target(displacement)?;
        self.push(Size::Long, self.registers.pc())?;
        self.registers.set_pc(target);
        Ok(())
    }

    // Bcc - Branch Conditionally
    fn exec_bcc(&mut self, condition: Condition, displacement: i8) -> Result<(), CpuError> {
        let target = self.branch_target(displacement)?;
        if self.check_condition(condition) {
            self.registers.set_pc(target);
        }
        Ok(())
    }

    fn exec_binary(&mut self, op: Binary, alu: Alu) -> Result<(), CpuError> {
        match op {
            Binary::EaToDn(op) => {
                let src = self.get_data(op.src, op.size)?;
                let reg = Register::from(op.dst);
                let dst = self.registers.get(reg, op.size);
                let result = alu(src, dst, op.size, &mut self.registers);
                self.registers.set(reg, op.size, result);
                Ok(())
            }
            Binary::DnToEa(op) => self.exec_dn_to_ea(op, alu),
        }
    }

    fn exec_dn_to_ea(&mut self, op: DnToEa, alu: Alu) -> Result<(), CpuError> {
        let src = self.registers.get(op.src.into(), op.size);
        self.read_modify_write(op.dst, op.size, |regs, dst| alu(src, dst, op.size, regs))?;
        Ok(())
    }

    // ADDA/SUBA - word sources are sign-extended, no flags
    fn exec_addr_op(&mut self, op: AddrOp, combine: fn(u32, u32) -> u32) -> Result<(), CpuError> {
        let src = op.size.sign_extend(self.get_data(op.src, op.size)?);
        let value = combine(self.addr_reg(op.dst), src);
        self.set_addr_reg(op.dst, value);
        Ok(())
    }

    // CMPA - Compare Address
    fn exec_cmpa(&mut self, op: AddrOp) -> Result<(), CpuError> {
        let src = op.size.sign_extend(self.get_data(op.src, op.size)?);
        let dst = self.addr_reg(op.dst);
        cmp_with_flags(dst, src, Size::Long, &mut self.registers);
        Ok(())
    }

    // ADDX/SUBX - Dy,Dx or -(Ay),-(Ax)
    fn exec_extend(&mut self, op: ExtendOp, alu: Alu) -> Result<(), CpuError> {
        match op {
            ExtendOp::Dn(op) => {
                let src = self.registers.get(op.src.into(), op.size);
                let reg = Register::from(op.dst);
                let dst = self.registers.get(reg, op.size);
                let result = alu(src, dst, op.size, &mut self.registers);
                self.registers.set(reg, op.size, result);
            }
            ExtendOp::PreDec(op) => {
                let src = self.get_data(EffectiveAddress::AddrPreDecr(op.src), op.size)?;
                let dst = EffectiveAddress::AddrPreDecr(op.dst);
                self.read_modify_write(dst, op.size, |regs, dst| alu(src, dst, op.size, regs))?;
            }
        }
        Ok(())
    }

    // CMPM - Compare Memory (Ay)+,(Ax)+
    fn exec_cmpm(&mut self, size: Size, src: AddrReg, dst: AddrReg) -> Result<(), CpuError> {
        let src = self.get_data(EffectiveAddress::AddrPostIncr(src), size)?;
        let dst = self.get_data(EffectiveAddress::AddrPostIncr(dst), size)?;
        cmp_with_flags(dst, src, size, &mut self.registers);
        Ok(())
    }

    // EXG - Exchange Registers
    fn exec_exg(&mut self, exg: Exg) {
        let (rx, ry) = match exg {
            Exg::DataData { rx, ry } => (Register::from(rx), Register::from(ry)),
            Exg::AddrAddr { rx, ry } => (Register::from(rx), Register::from(ry)),
            Exg::DataAddr { data, addr } => (Register::from(data), Register::from(addr)),
        };
        let x = self.registers.get(rx, Size::Long);
        let y = self.registers.get(ry, Size::Long);
        self.registers.set(rx, Size::Long, y);
        self.registers.set(ry, Size::Long, x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decoder::DispatchTable,
        memory::{Memory, MemoryError},
    };

    const ORIGIN: u32 = 0x1000;
    const STACK: u32 = 0x8000;

    fn state_with(words: &[u16]) -> CpuState {
        let mut state = CpuState::new(Memory::new(0x1_0000));
        for (i, word) in words.iter().enumerate() {
            state
                .memory
                .set(ORIGIN + 2 * i as u32, Size::Word, *word as u32)
                .unwrap();
        }
        state.registers.set_pc(ORIGIN);
        state.registers.set_stack_pointer(STACK);
        state
    }

    fn step(state: &mut CpuState) -> Result<(), CpuError> {
        let opcode = state.memory.get(state.registers.pc(), Size::Word)? as u16;
        let instruction = *DispatchTable::shared().decode(opcode);
        state.execute(&instruction)
    }

    fn d(state: &CpuState, n: u8) -> u32 {
        state.registers.get(Register::data(n), Size::Long)
    }

    fn a(state: &CpuState, n: u8) -> u32 {
        state.registers.get(Register::addr(n), Size::Long)
    }

    // (X, N, Z, V, C)
    fn ccr(state: &CpuState) -> (bool, bool, bool, bool, bool) {
        let regs = &state.registers;
        (
            regs.flag(Flag::Extend),
            regs.flag(Flag::Negative),
            regs.flag(Flag::Zero),
            regs.flag(Flag::Overflow),
            regs.flag(Flag::Carry),
        )
    }

    #[test]
    fn addq_word_to_data_register() {
        let mut state = state_with(&[0x5E40]);
        state.registers.set(Register::D0, Size::Word, 100);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 107);
        assert_eq!(ccr(&state), (false, false, false, false, false));
        assert_eq!(state.registers.pc(), ORIGIN + 2);
    }

    #[test]
    fn moveq_sign_extends_and_sets_flags() {
        let mut state = state_with(&[0x7064, 0x72FF]);
        state.registers.set_sr(0x001F);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 100);
        // X survives, the rest is derived from the value
        assert_eq!(ccr(&state), (true, false, false, false, false));
        step(&mut state).unwrap();
        assert_eq!(d(&state, 1), 0xFFFF_FFFF);
        assert!(state.registers.flag(Flag::Negative));
    }

    #[test]
    fn jsr_pushes_return_address() {
        let mut state = state_with(&[0x4E90]);
        state.registers.set(Register::A0, Size::Long, 0x2000);
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), 0x2000);
        assert_eq!(state.registers.stack_pointer(), STACK - 4);
        assert_eq!(state.memory.get(STACK - 4, Size::Long).unwrap(), ORIGIN + 2);
    }

    #[test]
    fn jsr_then_rts_returns_after_extension_words() {
        // jsr 0x3000.l; at 0x3000: rts
        let mut state = state_with(&[0x4EB9, 0x0000, 0x3000]);
        state.memory.set(0x3000, Size::Word, 0x4E75).unwrap();
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), 0x3000);
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), ORIGIN + 6);
        assert_eq!(state.registers.stack_pointer(), STACK);
    }

    #[test]
    fn clr_long_in_memory() {
        // clr.l (%a1)
        let mut state = state_with(&[0x4291]);
        state.registers.set(Register::A1, Size::Long, 0x4000);
        state.memory.set(0x4000, Size::Long, 0x8765_4321).unwrap();
        state.registers.set_sr(0x001B); // X N V C
        step(&mut state).unwrap();
        assert_eq!(state.memory.get(0x4000, Size::Long).unwrap(), 0);
        assert_eq!(ccr(&state), (true, false, true, false, false));
    }

    #[test]
    fn move_byte_through_stack_pointer_steps_by_two() {
        // move.b (%a7)+,%d0
        let mut state = state_with(&[0x101F]);
        state.memory.set(STACK, Size::Byte, 0x80).unwrap();
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0x80);
        assert_eq!(state.registers.stack_pointer(), STACK + 2);
        assert!(state.registers.flag(Flag::Negative));
    }

    #[test]
    fn movea_word_sign_extends_without_flags() {
        // movea.w %d1,%a2
        let mut state = state_with(&[0x3441]);
        state.registers.set(Register::D1, Size::Long, 0x0000_8000);
        state.registers.set_flag(Flag::Zero, true);
        step(&mut state).unwrap();
        assert_eq!(a(&state, 2), 0xFFFF_8000);
        assert!(state.registers.flag(Flag::Zero));
    }

    #[test]
    fn subq_on_address_register_uses_all_bits() {
        // subq.w #1,%a0
        let mut state = state_with(&[0x5348]);
        state.registers.set(Register::A0, Size::Long, 0x0001_0000);
        step(&mut state).unwrap();
        assert_eq!(a(&state, 0), 0x0000_FFFF);
        assert_eq!(ccr(&state), (false, false, false, false, false));
    }

    #[test]
    fn addi_to_memory_consumes_immediate_then_displacement() {
        // addi.w #0x0010,0x4(%a0)
        let mut state = state_with(&[0x0668, 0x0010, 0x0004]);
        state.registers.set(Register::A0, Size::Long, 0x4000);
        state.memory.set(0x4004, Size::Word, 0xFFF8).unwrap();
        step(&mut state).unwrap();
        assert_eq!(state.memory.get(0x4004, Size::Word).unwrap(), 0x0008);
        assert_eq!(ccr(&state), (true, false, false, false, true));
        assert_eq!(state.registers.pc(), ORIGIN + 6);
    }

    #[test]
    fn cmpi_sets_flags_without_writing() {
        // cmpi.b #0x05,%d3
        let mut state = state_with(&[0x0C03, 0x0005]);
        state.registers.set(Register::D3, Size::Long, 0x1234_5603);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 3), 0x1234_5603);
        assert_eq!(ccr(&state), (false, true, false, false, true));
    }

    #[test]
    fn neg_and_not() {
        // neg.w %d0; not.b %d1
        let mut state = state_with(&[0x4440, 0x4601]);
        state.registers.set(Register::D0, Size::Long, 0xAAAA_0001);
        state.registers.set(Register::D1, Size::Long, 0x0000_000F);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0xAAAA_FFFF);
        assert_eq!(ccr(&state), (true, true, false, false, true));
        step(&mut state).unwrap();
        assert_eq!(d(&state, 1), 0x0000_00F0);
        assert_eq!(ccr(&state), (true, true, false, false, false));
    }

    #[test]
    fn sub_and_add_register_forms() {
        // sub.l %d1,%d0; add.w %d0,(%a0)
        let mut state = state_with(&[0x9081, 0xD150]);
        state.registers.set(Register::D0, Size::Long, 3);
        state.registers.set(Register::D1, Size::Long, 5);
        state.registers.set(Register::A0, Size::Long, 0x4000);
        state.memory.set(0x4000, Size::Word, 0x0004).unwrap();
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0xFFFF_FFFE);
        assert_eq!(ccr(&state), (true, true, false, false, true));
        step(&mut state).unwrap();
        assert_eq!(state.memory.get(0x4000, Size::Word).unwrap(), 0x0002);
        assert_eq!(ccr(&state), (true, false, false, false, true));
    }

    #[test]
    fn addx_chains_through_memory() {
        // addx.l -(%a0),-(%a1) twice: 64-bit add of 0x00000001_FFFFFFFF + 1
        let mut state = state_with(&[0xD388, 0xD388]);
        state.memory.set(0x4000, Size::Long, 0x0000_0000).unwrap();
        state.memory.set(0x4004, Size::Long, 0x0000_0001).unwrap();
        state.memory.set(0x5000, Size::Long, 0x0000_0001).unwrap();
        state.memory.set(0x5004, Size::Long, 0xFFFF_FFFF).unwrap();
        state.registers.set(Register::A0, Size::Long, 0x4008);
        state.registers.set(Register::A1, Size::Long, 0x5008);
        state.registers.set_flag(Flag::Zero, true);
        step(&mut state).unwrap();
        step(&mut state).unwrap();
        assert_eq!(state.memory.get(0x5000, Size::Long).unwrap(), 2);
        assert_eq!(state.memory.get(0x5004, Size::Long).unwrap(), 0);
        assert_eq!(a(&state, 0), 0x4000);
        assert_eq!(a(&state, 1), 0x5000);
        assert!(!state.registers.flag(Flag::Zero));
    }

    #[test]
    fn cmpm_walks_both_pointers() {
        // cmpm.b (%a0)+,(%a1)+
        let mut state = state_with(&[0xB308]);
        state.memory.load(0x4000, b"ab").unwrap();
        state.memory.load(0x5000, b"ab").unwrap();
        state.registers.set(Register::A0, Size::Long, 0x4000);
        state.registers.set(Register::A1, Size::Long, 0x5000);
        step(&mut state).unwrap();
        assert!(state.registers.flag(Flag::Zero));
        assert_eq!((a(&state, 0), a(&state, 1)), (0x4001, 0x5001));
    }

    #[test]
    fn branches() {
        // beq.s +4 (not taken); bra.w +0x10
        let mut state = state_with(&[0x6704, 0x6000, 0x0010]);
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), ORIGIN + 2);
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), ORIGIN + 4 + 0x10);

        // bne.w not taken still skips the displacement word
        let mut state = state_with(&[0x6600, 0x0100]);
        state.registers.set_flag(Flag::Zero, true);
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), ORIGIN + 4);
    }

    #[test]
    fn bsr_pushes_address_after_displacement() {
        let mut state = state_with(&[0x6100, 0x0020]);
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), ORIGIN + 2 + 0x20);
        assert_eq!(state.memory.get(STACK - 4, Size::Long).unwrap(), ORIGIN + 4);
    }

    #[test]
    fn dbra_counts_down_to_minus_one() {
        // loop: dbf %d0,loop
        let mut state = state_with(&[0x51C8, 0xFFFE]);
        state.registers.set(Register::D0, Size::Long, 0xABCD_0002);
        let mut taken = 0;
        loop {
            step(&mut state).unwrap();
            if state.registers.pc() != ORIGIN {
                break;
            }
            taken += 1;
        }
        assert_eq!(taken, 2);
        assert_eq!(d(&state, 0), 0xABCD_FFFF);
        assert_eq!(state.registers.pc(), ORIGIN + 4);
    }

    #[test]
    fn scc_writes_a_byte() {
        // seq %d0; sne %d1
        let mut state = state_with(&[0x57C0, 0x56C1]);
        state.registers.set_flag(Flag::Zero, true);
        state.registers.set(Register::D1, Size::Long, 0x1234_5678);
        step(&mut state).unwrap();
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0xFF);
        assert_eq!(d(&state, 1), 0x1234_5600);
    }

    #[test]
    fn link_and_unlk_frame() {
        // link %a6,#-8; unlk %a6
        let mut state = state_with(&[0x4E56, 0xFFF8, 0x4E5E]);
        state.registers.set(Register::A6, Size::Long, 0xCAFE);
        step(&mut state).unwrap();
        assert_eq!(a(&state, 6), STACK - 4);
        assert_eq!(state.registers.stack_pointer(), STACK - 12);
        assert_eq!(state.memory.get(STACK - 4, Size::Long).unwrap(), 0xCAFE);
        step(&mut state).unwrap();
        assert_eq!(a(&state, 6), 0xCAFE);
        assert_eq!(state.registers.stack_pointer(), STACK);
    }

    #[test]
    fn link_a7_saves_decremented_stack_pointer() {
        // link %a7,#-8
        let mut state = state_with(&[0x4E57, 0xFFF8]);
        step(&mut state).unwrap();
        assert_eq!(state.memory.get(STACK - 4, Size::Long).unwrap(), STACK - 4);
        assert_eq!(state.registers.stack_pointer(), STACK - 12);
    }

    #[test]
    fn faulting_operand_access_keeps_address_register() {
        // move.w (%a0)+,%d0 at an odd address
        let mut state = state_with(&[0x3018]);
        state.registers.set(Register::A0, Size::Long, 0x3001);
        assert!(matches!(
            step(&mut state),
            Err(CpuError::Memory(MemoryError::Misaligned { addr: 0x3001, .. }))
        ));
        assert_eq!(a(&state, 0), 0x3001);

        // clr.l (%a0)+ past the end of memory
        let mut state = state_with(&[0x4298]);
        state.registers.set(Register::A0, Size::Long, 0xFFFE);
        assert!(matches!(
            step(&mut state),
            Err(CpuError::Memory(MemoryError::OutOfBounds { addr: 0xFFFE, .. }))
        ));
        assert_eq!(a(&state, 0), 0xFFFE);
    }

    #[test]
    fn lea_pea_and_jmp() {
        // lea 0x10(%pc),%a3; pea (%a3); jmp (%a3)
        let mut state = state_with(&[0x47FA, 0x0010, 0x4853, 0x4ED3]);
        step(&mut state).unwrap();
        assert_eq!(a(&state, 3), ORIGIN + 2 + 0x10);
        step(&mut state).unwrap();
        assert_eq!(state.memory.get(STACK - 4, Size::Long).unwrap(), ORIGIN + 0x12);
        step(&mut state).unwrap();
        assert_eq!(state.registers.pc(), ORIGIN + 0x12);
    }

    #[test]
    fn ext_swap_and_exg() {
        // ext.w %d0; ext.l %d0; swap %d1; exg %d1,%a1
        let mut state = state_with(&[0x4880, 0x48C0, 0x4841, 0xC389]);
        state.registers.set(Register::D0, Size::Long, 0x1234_0080);
        state.registers.set(Register::D1, Size::Long, 0x1111_2222);
        state.registers.set(Register::A1, Size::Long, 0x3333);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0x1234_FF80);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0xFFFF_FF80);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 1), 0x2222_1111);
        step(&mut state).unwrap();
        assert_eq!((d(&state, 1), a(&state, 1)), (0x3333, 0x2222_1111));
    }

    #[test]
    fn logic_ops_clear_overflow_and_carry() {
        // or.w %d1,%d0; and.l %d2,%d0; eor.b %d0,%d3
        let mut state = state_with(&[0x8041, 0xC082, 0xB103]);
        state.registers.set(Register::D0, Size::Long, 0x0000_00F0);
        state.registers.set(Register::D1, Size::Long, 0x0000_800F);
        state.registers.set(Register::D2, Size::Long, 0xFFFF_00FF);
        state.registers.set(Register::D3, Size::Long, 0x0000_00FF);
        state.registers.set_sr(0x0003);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0x0000_80FF);
        assert_eq!(ccr(&state), (false, true, false, false, false));
        step(&mut state).unwrap();
        assert_eq!(d(&state, 0), 0x0000_00FF);
        step(&mut state).unwrap();
        assert_eq!(d(&state, 3), 0);
        assert!(state.registers.flag(Flag::Zero));
    }

    #[test]
    fn adda_and_cmpa_sign_extend_word_sources() {
        // adda.w %d0,%a0; cmpa.w %d0,%a1
        let mut state = state_with(&[0xD0C0, 0xB2C0]);
        state.registers.set(Register::D0, Size::Long, 0x0000_FFFF);
        state.registers.set(Register::A0, Size::Long, 0x1000);
        state.registers.set(Register::A1, Size::Long, 0xFFFF_FFFF);
        step(&mut state).unwrap();
        assert_eq!(a(&state, 0), 0x0FFF);
        step(&mut state).unwrap();
        assert!(state.registers.flag(Flag::Zero));
    }

    #[test]
    fn illegal_instruction_faults_after_advancing_pc() {
        let mut state = state_with(&[0x4AFC]);
        assert_eq!(
            step(&mut state),
            Err(CpuError::IllegalInstruction {
                opcode: 0x4AFC,
                pc: ORIGIN,
            })
        );
        assert_eq!(state.registers.pc(), ORIGIN + 2);
    }

    #[test]
    fn fault_stops_mid_instruction() {
        // move.l (%a0)+,(%a1) with an odd destination
        let mut state = state_with(&[0x2298]);
        state.registers.set(Register::A0, Size::Long, 0x4000);
        state.registers.set(Register::A1, Size::Long, 0x5001);
        assert!(matches!(step(&mut state), Err(CpuError::Memory(_))));
        // the source side effect is not rolled back
        assert_eq!(a(&state, 0), 0x4004);
    }
}
