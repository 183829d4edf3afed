use crate::{
    decoder::{
        Binary, EffectiveAddress, Exg, ExtMode, ExtendOp, Instruction, InstructionKind, Size,
        format_index_operand, format_signed_hex,
    },
    memory::AddressSpace,
};

use super::{Cpu, CpuError, CpuState};

impl<M: AddressSpace> CpuState<M> {
    /// Render `instruction` (whose opcode is at PC) as assembly text.
    ///
    /// Like [`CpuState::execute`] this advances PC past the opcode and every
    /// extension word it reads, so it must not be combined with executing
    /// the same instruction without rewinding PC in between.
    pub fn disassemble(&mut self, instruction: &Instruction) -> Result<String, CpuError> {
        let pc = self.registers.pc();
        self.registers.set_pc(pc.wrapping_add(2));
        let kind = instruction.kind;
        let name = kind.name();

        let text = match kind {
            InstructionKind::Illegal | InstructionKind::Nop | InstructionKind::Rts => {
                name.to_string()
            }
            InstructionKind::Ori(op)
            | InstructionKind::Andi(op)
            | InstructionKind::Subi(op)
            | InstructionKind::Addi(op)
            | InstructionKind::Eori(op)
            | InstructionKind::Cmpi(op) => {
                let imm = self.operand(EffectiveAddress::Immediate, op.size)?;
                let dst = self.operand(op.mode, op.size)?;
                format!("{name}{} {imm}, {dst}", op.size)
            }
            InstructionKind::Move { size, src, dst } => {
                let src = self.operand(src, size)?;
                let dst = self.operand(dst, size)?;
                format!("move{size} {src}, {dst}")
            }
            InstructionKind::Movea { size, src, dst } => {
                format!("movea{size} {}, {dst}", self.operand(src, size)?)
            }
            InstructionKind::Moveq { data, dst } => format!("moveq #{data}, {dst}"),
            InstructionKind::Negx(op)
            | InstructionKind::Clr(op)
            | InstructionKind::Neg(op)
            | InstructionKind::Not(op)
            | InstructionKind::Tst(op) => {
                format!("{name}{} {}", op.size, self.operand(op.mode, op.size)?)
            }
            InstructionKind::Ext { data_reg, mode } => match mode {
                ExtMode::ByteToWord => format!("ext.w {data_reg}"),
                ExtMode::WordToLong => format!("ext.l {data_reg}"),
            },
            InstructionKind::Swap { data_reg } => format!("swap {data_reg}"),
            InstructionKind::Pea { mode }
            | InstructionKind::Jsr { mode }
            | InstructionKind::Jmp { mode } => {
                format!("{name} {}", self.operand(mode, Size::Long)?)
            }
            InstructionKind::Lea { src, dst } => {
                format!("lea {}, {dst}", self.operand(src, Size::Long)?)
            }
            InstructionKind::Link { addr_reg } => {
                let displacement = self.fetch_word()? as i16;
                format!("link {addr_reg}, #{displacement}")
            }
            InstructionKind::Unlk { addr_reg } => format!("unlk {addr_reg}"),
            InstructionKind::Addq(op) | InstructionKind::Subq(op) => {
                let dst = self.operand(op.mode, op.size)?;
                format!("{name}{} #{}, {dst}", op.size, op.data)
            }
            InstructionKind::Scc { condition, mode } => {
                format!("s{condition} {}", self.operand(mode, Size::Byte)?)
            }
            InstructionKind::DBcc {
                condition,
                data_reg,
            } => {
                let displacement = self.fetch_word()? as i16;
                format!(
                    "db{condition} {data_reg}, {}",
                    format_signed_hex(displacement as i32)
                )
            }
            InstructionKind::Bra { displacement } | InstructionKind::Bsr { displacement } => {
                format!("{name} {}", self.branch_displacement(displacement)?)
            }
            InstructionKind::Bcc {
                condition,
                displacement,
            } => format!("b{condition} {}", self.branch_displacement(displacement)?),
            InstructionKind::Or(op)
            | InstructionKind::And(op)
            | InstructionKind::Sub(op)
            | InstructionKind::Add(op) => match op {
                Binary::EaToDn(op) => {
                    format!("{name}{} {}, {}", op.size, self.operand(op.src, op.size)?, op.dst)
                }
                Binary::DnToEa(op) => {
                    format!("{name}{} {}, {}", op.size, op.src, self.operand(op.dst, op.size)?)
                }
            },
            InstructionKind::Eor(op) => {
                format!("eor{} {}, {}", op.size, op.src, self.operand(op.dst, op.size)?)
            }
            InstructionKind::Cmp(op) => {
                format!("cmp{} {}, {}", op.size, self.operand(op.src, op.size)?, op.dst)
            }
            InstructionKind::Suba(op) | InstructionKind::Adda(op) | InstructionKind::Cmpa(op) => {
                format!("{name}{} {}, {}", op.size, self.operand(op.src, op.size)?, op.dst)
            }
            InstructionKind::Subx(op) | InstructionKind::Addx(op) => match op {
                ExtendOp::Dn(op) => format!("{name}{} {}, {}", op.size, op.src, op.dst),
                ExtendOp::PreDec(op) => {
                    format!("{name}{} -({}), -({})", op.size, op.src, op.dst)
                }
            },
            InstructionKind::Cmpm { size, src, dst } => format!("cmpm{size} ({src})+, ({dst})+"),
            InstructionKind::Exg(exg) => match exg {
                Exg::DataData { rx, ry } => format!("exg {rx}, {ry}"),
                Exg::AddrAddr { rx, ry } => format!("exg {rx}, {ry}"),
                Exg::DataAddr { data, addr } => format!("exg {data}, {addr}"),
            },
        };
        Ok(text)
    }

    fn branch_displacement(&mut self, displacement: i8) -> Result<String, CpuError> {
        let displacement = if displacement == 0 {
            self.fetch_word()? as i16 as i32
        } else {
            displacement as i32
        };
        Ok(format_signed_hex(displacement))
    }

    // Operand text with concrete extension-word values.
    fn operand(&mut self, ea: EffectiveAddress, size: Size) -> Result<String, CpuError> {
        let text = match ea {
            EffectiveAddress::AddrDisplace(reg) => {
                let disp = self.fetch_word()? as i16 as i32;
                format!("{}({reg})", format_signed_hex(disp))
            }
            EffectiveAddress::AddrIndex(reg) => {
                format_index_operand(&reg.to_string(), self.fetch_word()?)
            }
            EffectiveAddress::PCDisplace => {
                let disp = self.fetch_word()? as i16 as i32;
                format!("{}(%pc)", format_signed_hex(disp))
            }
            EffectiveAddress::PCIndex => format_index_operand("%pc", self.fetch_word()?),
            EffectiveAddress::AbsShort => format!("0x{:04x}.w", self.fetch_word()?),
            EffectiveAddress::AbsLong => format!("0x{:08x}.l", self.fetch_long()?),
            EffectiveAddress::Immediate => match size {
                Size::Byte => format!("#0x{:02x}", self.fetch_word()? & 0xFF),
                Size::Word => format!("#0x{:04x}", self.fetch_word()?),
                Size::Long => format!("#0x{:08x}", self.fetch_long()?),
            },
            _ => ea.to_string(),
        };
        Ok(text)
    }
}

impl<M: AddressSpace> Cpu<M> {
    /// Disassemble the instruction at `address`, leaving PC at the
    /// instruction that follows it.
    pub fn disassemble_at(&mut self, address: u32) -> Result<String, CpuError> {
        self.state.registers.set_pc(address);
        let opcode = self.state.memory.get(address, Size::Word)? as u16;
        let instruction = *self.table().decode(opcode);
        self.state.disassemble(&instruction)
    }
}
