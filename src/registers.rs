use std::fmt;

use crate::decoder::{AddrReg, DataReg, Size};

const REGISTER_COUNT: usize = 19;

/// Register identifiers, in storage order.
///
/// `A7` names the user stack pointer slot. Accesses through it are
/// redirected to `Ssp` while the supervisor bit is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    Ssp,
    Pc,
    Sr,
}

impl Register {
    // raw slot of the user stack pointer
    const USP: Register = Register::A7;

    const DATA: [Register; 8] = [
        Register::D0,
        Register::D1,
        Register::D2,
        Register::D3,
        Register::D4,
        Register::D5,
        Register::D6,
        Register::D7,
    ];

    const ADDR: [Register; 8] = [
        Register::A0,
        Register::A1,
        Register::A2,
        Register::A3,
        Register::A4,
        Register::A5,
        Register::A6,
        Register::A7,
    ];

    /// Data register by number; only the low three bits are used.
    pub fn data(number: u8) -> Self {
        Self::DATA[(number & 7) as usize]
    }

    /// Address register by number; only the low three bits are used.
    pub fn addr(number: u8) -> Self {
        Self::ADDR[(number & 7) as usize]
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl From<DataReg> for Register {
    fn from(reg: DataReg) -> Self {
        Register::data(reg.number())
    }
}

impl From<AddrReg> for Register {
    fn from(reg: AddrReg) -> Self {
        Register::addr(reg.number())
    }
}

/// Status register bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Carry,
    Overflow,
    Zero,
    Negative,
    Extend,
    Supervisor,
}

impl Flag {
    pub const fn mask(self) -> u16 {
        match self {
            Flag::Carry => 0x0001,
            Flag::Overflow => 0x0002,
            Flag::Zero => 0x0004,
            Flag::Negative => 0x0008,
            Flag::Extend => 0x0010,
            Flag::Supervisor => 0x2000,
        }
    }
}

/// The register file: D0-D7, A0-A6, USP, SSP, PC and SR in one indexed array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    regs: [u32; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `reg` zero-extended from the low `size` bits.
    pub fn get(&self, reg: Register, size: Size) -> u32 {
        self.regs[self.slot(reg)] & size.mask()
    }

    /// Write the low `size` bits of `value`; the upper bits of the stored
    /// register are preserved.
    pub fn set(&mut self, reg: Register, size: Size, value: u32) {
        let slot = self.slot(reg);
        let mask = size.mask();
        let merged = (self.regs[slot] & !mask) | (value & mask);
        self.regs[slot] = if reg == Register::Sr {
            merged & 0xFFFF
        } else {
            merged
        };
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.sr() & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let sr = if value {
            self.sr() | flag.mask()
        } else {
            self.sr() & !flag.mask()
        };
        self.set_sr(sr);
    }

    pub fn pc(&self) -> u32 {
        self.regs[Register::Pc.index()]
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.regs[Register::Pc.index()] = pc;
    }

    pub fn sr(&self) -> u16 {
        self.regs[Register::Sr.index()] as u16
    }

    pub fn set_sr(&mut self, sr: u16) {
        self.regs[Register::Sr.index()] = sr as u32;
    }

    /// The active stack pointer (USP or SSP depending on the supervisor bit).
    pub fn stack_pointer(&self) -> u32 {
        self.get(Register::A7, Size::Long)
    }

    pub fn set_stack_pointer(&mut self, value: u32) {
        self.set(Register::A7, Size::Long, value);
    }

    /// User stack pointer, regardless of mode.
    pub fn usp(&self) -> u32 {
        self.regs[Register::USP.index()]
    }

    pub fn set_usp(&mut self, value: u32) {
        self.regs[Register::USP.index()] = value;
    }

    /// Supervisor stack pointer, regardless of mode.
    pub fn ssp(&self) -> u32 {
        self.regs[Register::Ssp.index()]
    }

    pub fn set_ssp(&mut self, value: u32) {
        self.regs[Register::Ssp.index()] = value;
    }

    fn slot(&self, reg: Register) -> usize {
        if reg == Register::A7 && self.flag(Flag::Supervisor) {
            Register::Ssp.index()
        } else {
            reg.index()
        }
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in 0..8 {
            writeln!(f, "D{n}: {:#010x}", self.get(Register::data(n), Size::Long))?;
        }
        for n in 0..8 {
            writeln!(f, "A{n}: {:#010x}", self.get(Register::addr(n), Size::Long))?;
        }
        writeln!(f, "USP: {:#010x}", self.usp())?;
        writeln!(f, "PC: {:#010x}", self.pc())?;
        for (name, flag) in [
            ("X", Flag::Extend),
            ("N", Flag::Negative),
            ("Z", Flag::Zero),
            ("V", Flag::Overflow),
            ("C", Flag::Carry),
        ] {
            writeln!(f, "{name}: {}", self.flag(flag) as u8)?;
        }
        Ok(())
    }
}
