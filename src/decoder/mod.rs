use std::{error::Error, fmt};

mod display;
mod table;

pub use display::{format_index_operand, format_signed_hex};
pub use table::{Collision, DispatchTable, TABLE_SIZE};

/// A decoded opcode. Records are built once per opcode value by the
/// [`DispatchTable`] and never change afterwards; extension words are
/// consumed when the instruction is executed or disassembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u16,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn illegal(opcode: u16) -> Self {
        Self {
            opcode,
            kind: InstructionKind::Illegal,
        }
    }

    pub fn is_illegal(&self) -> bool {
        self.kind == InstructionKind::Illegal
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    Illegal,
    Nop,
    Rts,
    Ori(ImmOp),
    Andi(ImmOp),
    Subi(ImmOp),
    Addi(ImmOp),
    Eori(ImmOp),
    Cmpi(ImmOp),
    Move {
        size: Size,
        src: EffectiveAddress,
        dst: EffectiveAddress,
    },
    Movea {
        size: Size,
        src: EffectiveAddress,
        dst: AddrReg,
    },
    Moveq {
        data: i8,
        dst: DataReg,
    },
    Negx(UnaryOp),
    Clr(UnaryOp),
    Neg(UnaryOp),
    Not(UnaryOp),
    Tst(UnaryOp),
    Ext {
        data_reg: DataReg,
        mode: ExtMode,
    },
    Swap {
        data_reg: DataReg,
    },
    Pea {
        mode: EffectiveAddress,
    },
    Lea {
        src: EffectiveAddress,
        dst: AddrReg,
    },
    // displacement follows in an extension word
    Link {
        addr_reg: AddrReg,
    },
    Unlk {
        addr_reg: AddrReg,
    },
    Jsr {
        mode: EffectiveAddress,
    },
    Jmp {
        mode: EffectiveAddress,
    },
    Addq(QuickOp),
    Subq(QuickOp),
    Scc {
        condition: Condition,
        mode: EffectiveAddress,
    },
    DBcc {
        condition: Condition,
        data_reg: DataReg,
    },
    // 8-bit displacements; zero means a 16-bit displacement word follows
    Bra {
        displacement: i8,
    },
    Bsr {
        displacement: i8,
    },
    Bcc {
        condition: Condition,
        displacement: i8,
    },
    Or(Binary),
    And(Binary),
    Sub(Binary),
    Add(Binary),
    Eor(DnToEa),
    Cmp(EaToDn),
    Suba(AddrOp),
    Adda(AddrOp),
    Cmpa(AddrOp),
    Subx(ExtendOp),
    Addx(ExtendOp),
    Cmpm {
        size: Size,
        src: AddrReg, // (Ay)+
        dst: AddrReg, // (Ax)+
    },
    Exg(Exg),
}

impl InstructionKind {
    pub fn name(&self) -> &'static str {
        match self {
            InstructionKind::Illegal => "illegal",
            InstructionKind::Nop => "nop",
            InstructionKind::Rts => "rts",
            InstructionKind::Ori(_) => "ori",
            InstructionKind::Andi(_) => "andi",
            InstructionKind::Subi(_) => "subi",
            InstructionKind::Addi(_) => "addi",
            InstructionKind::Eori(_) => "eori",
            InstructionKind::Cmpi(_) => "cmpi",
            InstructionKind::Move { .. } => "move",
            InstructionKind::Movea { .. } => "movea",
            InstructionKind::Moveq { .. } => "moveq",
            InstructionKind::Negx(_) => "negx",
            InstructionKind::Clr(_) => "clr",
            InstructionKind::Neg(_) => "neg",
            InstructionKind::Not(_) => "not",
            InstructionKind::Tst(_) => "tst",
            InstructionKind::Ext { .. } => "ext",
            InstructionKind::Swap { .. } => "swap",
            InstructionKind::Pea { .. } => "pea",
            InstructionKind::Lea { .. } => "lea",
            InstructionKind::Link { .. } => "link",
            InstructionKind::Unlk { .. } => "unlk",
            InstructionKind::Jsr { .. } => "jsr",
            InstructionKind::Jmp { .. } => "jmp",
            InstructionKind::Addq(_) => "addq",
            InstructionKind::Subq(_) => "subq",
            InstructionKind::Scc { .. } => "scc",
            InstructionKind::DBcc { .. } => "dbcc",
            InstructionKind::Bra { .. } => "bra",
            InstructionKind::Bsr { .. } => "bsr",
            InstructionKind::Bcc { .. } => "bcc",
            InstructionKind::Or(_) => "or",
            InstructionKind::And(_) => "and",
            InstructionKind::Sub(_) => "sub",
            InstructionKind::Add(_) => "add",
            InstructionKind::Eor(_) => "eor",
            InstructionKind::Cmp(_) => "cmp",
            InstructionKind::Suba(_) => "suba",
            InstructionKind::Adda(_) => "adda",
            InstructionKind::Cmpa(_) => "cmpa",
            InstructionKind::Subx(_) => "subx",
            InstructionKind::Addx(_) => "addx",
            InstructionKind::Cmpm { .. } => "cmpm",
            InstructionKind::Exg(_) => "exg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtMode {
    ByteToWord, // EXT.W
    WordToLong, // EXT.L
}

// <ea>,Dn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EaToDn {
    pub size: Size,
    pub dst: DataReg,
    pub src: EffectiveAddress,
}

// Dn,<ea>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnToEa {
    pub size: Size,
    pub src: DataReg,
    pub dst: EffectiveAddress,
}

/// Operand direction of the two-operand ALU families (ADD, SUB, AND, OR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binary {
    EaToDn(EaToDn),
    DnToEa(DnToEa),
}

// <ea>,An
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrOp {
    pub size: Size,
    pub src: EffectiveAddress,
    pub dst: AddrReg,
}

// Dy,Dx
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dn {
    pub size: Size,
    pub src: DataReg,
    pub dst: DataReg,
}

// -(Ay),-(Ax)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreDec {
    pub size: Size,
    pub src: AddrReg,
    pub dst: AddrReg,
}

/// ADDX/SUBX operand forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOp {
    Dn(Dn),
    PreDec(PreDec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exg {
    DataData { rx: DataReg, ry: DataReg },
    AddrAddr { rx: AddrReg, ry: AddrReg },
    DataAddr { data: DataReg, addr: AddrReg },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnaryOp {
    pub size: Size,
    pub mode: EffectiveAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickOp {
    pub data: u8, // 1..=8
    pub size: Size,
    pub mode: EffectiveAddress,
}

// #<data>,<ea>; the immediate follows the opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmOp {
    pub size: Size,
    pub mode: EffectiveAddress,
}

pub(crate) fn bit_range(word: u16, start: u8, end: u8) -> u8 {
    debug_assert!(end > start && end - start <= 8);
    let width = end - start;
    ((word >> start) & ((1 << width) - 1)) as u8
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DataReg {
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
}

impl DataReg {
    const ALL: [DataReg; 8] = [
        DataReg::D0,
        DataReg::D1,
        DataReg::D2,
        DataReg::D3,
        DataReg::D4,
        DataReg::D5,
        DataReg::D6,
        DataReg::D7,
    ];

    pub fn from_bits(value: u8) -> Self {
        Self::ALL[(value & 0b111) as usize]
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AddrReg {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
}

impl AddrReg {
    const ALL: [AddrReg; 8] = [
        AddrReg::A0,
        AddrReg::A1,
        AddrReg::A2,
        AddrReg::A3,
        AddrReg::A4,
        AddrReg::A5,
        AddrReg::A6,
        AddrReg::A7,
    ];

    pub fn from_bits(value: u8) -> Self {
        Self::ALL[(value & 0b111) as usize]
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Addressing mode classification, without register payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    DataRegisterDirect,
    AddressRegisterDirect,
    AddressIndirect,
    AddressPostIncrement,
    AddressPreDecrement,
    AddressDisplacement,
    AddressIndex,
    PcDisplacement,
    PcIndex,
    AbsoluteShort,
    AbsoluteLong,
    Immediate,
    Unknown,
}

impl AddressingMode {
    /// Classify the 3-bit mode and register fields of an EA.
    pub fn from_fields(mode: u8, reg: u8) -> Self {
        EffectiveAddress::from_fields(mode, reg).map_or(AddressingMode::Unknown, |ea| ea.mode())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EffectiveAddress {
    Dr(DataReg),           // Dn            b000 reg
    Ar(AddrReg),           // An            b001 reg
    Addr(AddrReg),         // (An)          b010 reg
    AddrPostIncr(AddrReg), // (An)+         b011 reg
    AddrPreDecr(AddrReg),  // -(An)         b100 reg
    AddrDisplace(AddrReg), // (d16, An)     b101 reg
    AddrIndex(AddrReg),    // (d8, An, Xn)  b110 reg
    PCDisplace,            // (d16, PC)     b111 b010
    PCIndex,               // (d8, PC, Xn)  b111 b011
    AbsShort,              // (xxx).W       b111 b000
    AbsLong,               // (xxx).L       b111 b001
    Immediate,             // #imm          b111 b100
}

impl EffectiveAddress {
    /// Decode the low six bits of an opcode (mode in 5..3, register in 2..0).
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::from_fields((bits >> 3) & 0b111, bits & 0b111)
    }

    pub fn from_fields(mode: u8, reg: u8) -> Option<Self> {
        match (mode & 0b111, reg & 0b111) {
            (0b000, xn) => Some(EffectiveAddress::Dr(DataReg::from_bits(xn))),
            (0b001, xn) => Some(EffectiveAddress::Ar(AddrReg::from_bits(xn))),
            (0b010, xn) => Some(EffectiveAddress::Addr(AddrReg::from_bits(xn))),
            (0b011, xn) => Some(EffectiveAddress::AddrPostIncr(AddrReg::from_bits(xn))),
            (0b100, xn) => Some(EffectiveAddress::AddrPreDecr(AddrReg::from_bits(xn))),
            (0b101, xn) => Some(EffectiveAddress::AddrDisplace(AddrReg::from_bits(xn))),
            (0b110, xn) => Some(EffectiveAddress::AddrIndex(AddrReg::from_bits(xn))),
            (0b111, 0b000) => Some(EffectiveAddress::AbsShort),
            (0b111, 0b001) => Some(EffectiveAddress::AbsLong),
            (0b111, 0b010) => Some(EffectiveAddress::PCDisplace),
            (0b111, 0b011) => Some(EffectiveAddress::PCIndex),
            (0b111, 0b100) => Some(EffectiveAddress::Immediate),
            _ => None,
        }
    }

    pub fn mode(self) -> AddressingMode {
        match self {
            EffectiveAddress::Dr(_) => AddressingMode::DataRegisterDirect,
            EffectiveAddress::Ar(_) => AddressingMode::AddressRegisterDirect,
            EffectiveAddress::Addr(_) => AddressingMode::AddressIndirect,
            EffectiveAddress::AddrPostIncr(_) => AddressingMode::AddressPostIncrement,
            EffectiveAddress::AddrPreDecr(_) => AddressingMode::AddressPreDecrement,
            EffectiveAddress::AddrDisplace(_) => AddressingMode::AddressDisplacement,
            EffectiveAddress::AddrIndex(_) => AddressingMode::AddressIndex,
            EffectiveAddress::PCDisplace => AddressingMode::PcDisplacement,
            EffectiveAddress::PCIndex => AddressingMode::PcIndex,
            EffectiveAddress::AbsShort => AddressingMode::AbsoluteShort,
            EffectiveAddress::AbsLong => AddressingMode::AbsoluteLong,
            EffectiveAddress::Immediate => AddressingMode::Immediate,
        }
    }

    /// Every mode except An.
    pub fn is_data(self) -> bool {
        !matches!(self, EffectiveAddress::Ar(_))
    }

    /// Every mode except Dn and An.
    pub fn is_memory(self) -> bool {
        !matches!(self, EffectiveAddress::Dr(_) | EffectiveAddress::Ar(_))
    }

    /// Modes that name a memory location without side effects.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            EffectiveAddress::Addr(_)
                | EffectiveAddress::AddrDisplace(_)
                | EffectiveAddress::AddrIndex(_)
                | EffectiveAddress::PCDisplace
                | EffectiveAddress::PCIndex
                | EffectiveAddress::AbsShort
                | EffectiveAddress::AbsLong
        )
    }

    pub fn is_alterable(self) -> bool {
        !matches!(
            self,
            EffectiveAddress::PCDisplace | EffectiveAddress::PCIndex | EffectiveAddress::Immediate
        )
    }

    pub fn is_data_alterable(self) -> bool {
        self.is_data() && self.is_alterable()
    }

    pub fn is_memory_alterable(self) -> bool {
        self.is_memory() && self.is_alterable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte, // .b b00 | / | b01
    Word, // .w b01 | 0 | b11
    Long, // .l b10 | 1 | b10
}

impl Size {
    /// The one-bit W/L field used by the address-register forms.
    pub fn from_wl_bit(value: u8) -> Self {
        if value & 1 == 0 { Size::Word } else { Size::Long }
    }

    /// The standard two-bit size field.
    pub fn from_size_bits(value: u8) -> Result<Self, InvalidSize> {
        match value {
            0b00 => Ok(Size::Byte),
            0b01 => Ok(Size::Word),
            0b10 => Ok(Size::Long),
            _ => Err(InvalidSize(value)),
        }
    }

    /// The size field of MOVE and MOVEA (bits 13..12).
    pub fn from_move_bits(value: u8) -> Result<Self, InvalidSize> {
        match value {
            0b01 => Ok(Size::Byte),
            0b11 => Ok(Size::Word),
            0b10 => Ok(Size::Long),
            _ => Err(InvalidSize(value)),
        }
    }

    pub const fn bytes(self) -> u32 {
        match self {
            Size::Byte => 1,
            Size::Word => 2,
            Size::Long => 4,
        }
    }

    pub const fn mask(self) -> u32 {
        match self {
            Size::Byte => 0xFF,
            Size::Word => 0xFFFF,
            Size::Long => 0xFFFF_FFFF,
        }
    }

    pub const fn sign_bit(self) -> u32 {
        match self {
            Size::Byte => 0x80,
            Size::Word => 0x8000,
            Size::Long => 0x8000_0000,
        }
    }

    /// Sign-extend the low bits of `value` to 32 bits.
    pub const fn sign_extend(self, value: u32) -> u32 {
        match self {
            Size::Byte => value as u8 as i8 as i32 as u32,
            Size::Word => value as u16 as i16 as i32 as u32,
            Size::Long => value,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Size::Byte => "byte",
            Size::Word => "word",
            Size::Long => "long",
        }
    }
}

/// A size field holding a value the instruction does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSize(pub u8);

impl fmt::Display for InvalidSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid size field {:#04b}", self.0)
    }
}

impl Error for InvalidSize {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    True,           // T   b0000
    False,          // F   b0001
    Higher,         // HI  b0010
    LowerOrSame,    // LS  b0011
    CarryClear,     // CC  b0100
    CarrySet,       // CS  b0101
    NotEqual,       // NE  b0110
    Equal,          // EQ  b0111
    OverflowClear,  // VC  b1000
    OverflowSet,    // VS  b1001
    Plus,           // PL  b1010
    Minus,          // MI  b1011
    GreaterOrEqual, // GE  b1100
    LessThan,       // LT  b1101
    GreaterThan,    // GT  b1110
    LessOrEqual,    // LE  b1111
}

impl From<u8> for Condition {
    fn from(value: u8) -> Self {
        match value & 0b1111 {
            0b0000 => Self::True,
            0b0001 => Self::False,
            0b0010 => Self::Higher,
            0b0011 => Self::LowerOrSame,
            0b0100 => Self::CarryClear,
            0b0101 => Self::CarrySet,
            0b0110 => Self::NotEqual,
            0b0111 => Self::Equal,
            0b1000 => Self::OverflowClear,
            0b1001 => Self::OverflowSet,
            0b1010 => Self::Plus,
            0b1011 => Self::Minus,
            0b1100 => Self::GreaterOrEqual,
            0b1101 => Self::LessThan,
            0b1110 => Self::GreaterThan,
            _ => Self::LessOrEqual,
        }
    }
}

// Per-family decoders. Each returns None when the opcode's fields form an
// encoding the family does not define, leaving the slot illegal.

fn ea_field(opcode: u16) -> Option<EffectiveAddress> {
    EffectiveAddress::from_bits(bit_range(opcode, 0, 6))
}

fn upper_reg(opcode: u16) -> u8 {
    bit_range(opcode, 9, 12)
}

// 0000 ooo0 ss eeeeee
pub(crate) fn decode_immediate(opcode: u16) -> Option<InstructionKind> {
    if bit_range(opcode, 8, 9) != 0 {
        return None;
    }
    let size = Size::from_size_bits(bit_range(opcode, 6, 8)).ok()?;
    let mode = ea_field(opcode)?;
    if !mode.is_data_alterable() {
        return None;
    }
    let op = ImmOp { size, mode };
    match upper_reg(opcode) {
        0b000 => Some(InstructionKind::Ori(op)),
        0b001 => Some(InstructionKind::Andi(op)),
        0b010 => Some(InstructionKind::Subi(op)),
        0b011 => Some(InstructionKind::Addi(op)),
        0b101 => Some(InstructionKind::Eori(op)),
        0b110 => Some(InstructionKind::Cmpi(op)),
        _ => None,
    }
}

// 00ss rrrm mmMM Mrrr
pub(crate) fn decode_move(opcode: u16) -> Option<InstructionKind> {
    let size = Size::from_move_bits(bit_range(opcode, 12, 14)).ok()?;
    let src = ea_field(opcode)?;
    if size == Size::Byte && !src.is_data() {
        return None;
    }
    let dst_mode = bit_range(opcode, 6, 9);
    if dst_mode == 0b001 {
        if size == Size::Byte {
            return None;
        }
        return Some(InstructionKind::Movea {
            size,
            src,
            dst: AddrReg::from_bits(upper_reg(opcode)),
        });
    }
    let dst = EffectiveAddress::from_fields(dst_mode, upper_reg(opcode))?;
    if !dst.is_data_alterable() {
        return None;
    }
    Some(InstructionKind::Move { size, src, dst })
}

// 0111 ddd0 iiiiiiii
pub(crate) fn decode_moveq(opcode: u16) -> Option<InstructionKind> {
    if bit_range(opcode, 8, 9) != 0 {
        return None;
    }
    Some(InstructionKind::Moveq {
        data: opcode as u8 as i8,
        dst: DataReg::from_bits(upper_reg(opcode)),
    })
}

// 0100 oooo ss eeeeee
pub(crate) fn decode_unary(opcode: u16) -> Option<InstructionKind> {
    let size = Size::from_size_bits(bit_range(opcode, 6, 8)).ok()?;
    let mode = ea_field(opcode)?;
    if !mode.is_data_alterable() {
        return None;
    }
    let op = UnaryOp { size, mode };
    match bit_range(opcode, 8, 12) {
        0b0000 => Some(InstructionKind::Negx(op)),
        0b0010 => Some(InstructionKind::Clr(op)),
        0b0100 => Some(InstructionKind::Neg(op)),
        0b0110 => Some(InstructionKind::Not(op)),
        0b1010 => Some(InstructionKind::Tst(op)),
        _ => None,
    }
}

// 0100 1000 1s00 0ddd
pub(crate) fn decode_ext(opcode: u16) -> Option<InstructionKind> {
    if bit_range(opcode, 3, 6) != 0 {
        return None;
    }
    let mode = match bit_range(opcode, 6, 9) {
        0b010 => ExtMode::ByteToWord,
        0b011 => ExtMode::WordToLong,
        _ => return None,
    };
    Some(InstructionKind::Ext {
        data_reg: DataReg::from_bits(bit_range(opcode, 0, 3)),
        mode,
    })
}

// 0100 1000 0100 0ddd
pub(crate) fn decode_swap(opcode: u16) -> Option<InstructionKind> {
    Some(InstructionKind::Swap {
        data_reg: DataReg::from_bits(bit_range(opcode, 0, 3)),
    })
}

// 0100 1000 01 eeeeee
pub(crate) fn decode_pea(opcode: u16) -> Option<InstructionKind> {
    let mode = ea_field(opcode)?;
    mode.is_control().then_some(InstructionKind::Pea { mode })
}

// 0100 aaa1 11 eeeeee
pub(crate) fn decode_lea(opcode: u16) -> Option<InstructionKind> {
    let src = ea_field(opcode)?;
    src.is_control().then_some(InstructionKind::Lea {
        src,
        dst: AddrReg::from_bits(upper_reg(opcode)),
    })
}

// 0100 1110 0101 0aaa
pub(crate) fn decode_link(opcode: u16) -> Option<InstructionKind> {
    Some(InstructionKind::Link {
        addr_reg: AddrReg::from_bits(bit_range(opcode, 0, 3)),
    })
}

// 0100 1110 0101 1aaa
pub(crate) fn decode_unlk(opcode: u16) -> Option<InstructionKind> {
    Some(InstructionKind::Unlk {
        addr_reg: AddrReg::from_bits(bit_range(opcode, 0, 3)),
    })
}

pub(crate) fn decode_nop(_opcode: u16) -> Option<InstructionKind> {
    Some(InstructionKind::Nop)
}

pub(crate) fn decode_rts(_opcode: u16) -> Option<InstructionKind> {
    Some(InstructionKind::Rts)
}

// 0100 1110 1x eeeeee
pub(crate) fn decode_jump(opcode: u16) -> Option<InstructionKind> {
    let mode = ea_field(opcode)?;
    if !mode.is_control() {
        return None;
    }
    match bit_range(opcode, 6, 8) {
        0b10 => Some(InstructionKind::Jsr { mode }),
        0b11 => Some(InstructionKind::Jmp { mode }),
        _ => None,
    }
}

// 0101 ddds ss eeeeee
pub(crate) fn decode_quick(opcode: u16) -> Option<InstructionKind> {
    let size = Size::from_size_bits(bit_range(opcode, 6, 8)).ok()?;
    let mode = ea_field(opcode)?;
    if !mode.is_alterable() || (size == Size::Byte && !mode.is_data()) {
        return None;
    }
    let data = match upper_reg(opcode) {
        0 => 8,
        n => n,
    };
    let op = QuickOp { data, size, mode };
    if bit_range(opcode, 8, 9) == 0 {
        Some(InstructionKind::Addq(op))
    } else {
        Some(InstructionKind::Subq(op))
    }
}

// 0101 cccc 11 eeeeee
pub(crate) fn decode_scc(opcode: u16) -> Option<InstructionKind> {
    let mode = ea_field(opcode)?;
    mode.is_data_alterable().then_some(InstructionKind::Scc {
        condition: Condition::from(bit_range(opcode, 8, 12)),
        mode,
    })
}

// 0101 cccc 1100 1ddd
pub(crate) fn decode_dbcc(opcode: u16) -> Option<InstructionKind> {
    Some(InstructionKind::DBcc {
        condition: Condition::from(bit_range(opcode, 8, 12)),
        data_reg: DataReg::from_bits(bit_range(opcode, 0, 3)),
    })
}

// 0110 cccc dddddddd
pub(crate) fn decode_branch(opcode: u16) -> Option<InstructionKind> {
    let displacement = opcode as u8 as i8;
    match bit_range(opcode, 8, 12) {
        0b0000 => Some(InstructionKind::Bra { displacement }),
        0b0001 => Some(InstructionKind::Bsr { displacement }),
        condition => Some(InstructionKind::Bcc {
            condition: Condition::from(condition),
            displacement,
        }),
    }
}

// xxxx rrro oo eeeeee with opmode 000..010 (<ea>,Dn) or 100..110 (Dn,<ea>)
fn decode_binary(opcode: u16, address_source: bool) -> Option<Binary> {
    let opmode = bit_range(opcode, 6, 9);
    let size = Size::from_size_bits(opmode & 0b11).ok()?;
    let reg = DataReg::from_bits(upper_reg(opcode));
    let ea = ea_field(opcode)?;
    if opmode & 0b100 == 0 {
        let source_ok = ea.is_data() || (address_source && size != Size::Byte);
        source_ok.then_some(Binary::EaToDn(EaToDn {
            size,
            dst: reg,
            src: ea,
        }))
    } else {
        ea.is_memory_alterable().then_some(Binary::DnToEa(DnToEa {
            size,
            src: reg,
            dst: ea,
        }))
    }
}

// 1x00 rrro oo eeeeee
pub(crate) fn decode_logical(opcode: u16) -> Option<InstructionKind> {
    let op = decode_binary(opcode, false)?;
    match bit_range(opcode, 12, 16) {
        0b1000 => Some(InstructionKind::Or(op)),
        0b1100 => Some(InstructionKind::And(op)),
        _ => None,
    }
}

fn decode_addr_op(opcode: u16) -> Option<AddrOp> {
    Some(AddrOp {
        size: Size::from_wl_bit(bit_range(opcode, 8, 9)),
        src: ea_field(opcode)?,
        dst: AddrReg::from_bits(upper_reg(opcode)),
    })
}

fn decode_extend_op(opcode: u16) -> Option<ExtendOp> {
    let size = Size::from_size_bits(bit_range(opcode, 6, 8)).ok()?;
    let src = bit_range(opcode, 0, 3);
    let dst = upper_reg(opcode);
    if bit_range(opcode, 3, 4) == 0 {
        Some(ExtendOp::Dn(Dn {
            size,
            src: DataReg::from_bits(src),
            dst: DataReg::from_bits(dst),
        }))
    } else {
        Some(ExtendOp::PreDec(PreDec {
            size,
            src: AddrReg::from_bits(src),
            dst: AddrReg::from_bits(dst),
        }))
    }
}

// 1x01 rrro oo eeeeee: SUB/SUBA/SUBX (x=0) and ADD/ADDA/ADDX (x=1)
pub(crate) fn decode_arithmetic(opcode: u16) -> Option<InstructionKind> {
    let is_add = bit_range(opcode, 14, 15) == 1;
    let opmode = bit_range(opcode, 6, 9);
    let ea_mode = bit_range(opcode, 3, 6);
    if opmode & 0b011 == 0b011 {
        let op = decode_addr_op(opcode)?;
        return Some(if is_add {
            InstructionKind::Adda(op)
        } else {
            InstructionKind::Suba(op)
        });
    }
    if opmode & 0b100 != 0 && ea_mode <= 0b001 {
        let op = decode_extend_op(opcode)?;
        return Some(if is_add {
            InstructionKind::Addx(op)
        } else {
            InstructionKind::Subx(op)
        });
    }
    let op = decode_binary(opcode, true)?;
    Some(if is_add {
        InstructionKind::Add(op)
    } else {
        InstructionKind::Sub(op)
    })
}

// 1011 rrro oo eeeeee: CMP, CMPA, CMPM, EOR
pub(crate) fn decode_compare(opcode: u16) -> Option<InstructionKind> {
    let opmode = bit_range(opcode, 6, 9);
    if opmode & 0b011 == 0b011 {
        return decode_addr_op(opcode).map(InstructionKind::Cmpa);
    }
    let size = Size::from_size_bits(opmode & 0b11).ok()?;
    if opmode & 0b100 != 0 {
        if bit_range(opcode, 3, 6) == 0b001 {
            return Some(InstructionKind::Cmpm {
                size,
                src: AddrReg::from_bits(bit_range(opcode, 0, 3)),
                dst: AddrReg::from_bits(upper_reg(opcode)),
            });
        }
        let dst = ea_field(opcode)?;
        return dst.is_data_alterable().then_some(InstructionKind::Eor(DnToEa {
            size,
            src: DataReg::from_bits(upper_reg(opcode)),
            dst,
        }));
    }
    match decode_binary(opcode, true)? {
        Binary::EaToDn(op) => Some(InstructionKind::Cmp(op)),
        Binary::DnToEa(_) => None,
    }
}

// 1100 xxx1 oooo oyyy
pub(crate) fn decode_exg(opcode: u16) -> Option<InstructionKind> {
    let rx = upper_reg(opcode);
    let ry = bit_range(opcode, 0, 3);
    let exg = match bit_range(opcode, 3, 9) {
        0b101000 => Exg::DataData {
            rx: DataReg::from_bits(rx),
            ry: DataReg::from_bits(ry),
        },
        0b101001 => Exg::AddrAddr {
            rx: AddrReg::from_bits(rx),
            ry: AddrReg::from_bits(ry),
        },
        0b110001 => Exg::DataAddr {
            data: DataReg::from_bits(rx),
            addr: AddrReg::from_bits(ry),
        },
        _ => return None,
    };
    Some(InstructionKind::Exg(exg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addq_fields_are_baked_from_the_opcode() {
        assert_eq!(
            decode_quick(0x5E40),
            Some(InstructionKind::Addq(QuickOp {
                data: 7,
                size: Size::Word,
                mode: EffectiveAddress::Dr(DataReg::D0),
            }))
        );
        assert_eq!(
            decode_quick(0x5681),
            Some(InstructionKind::Addq(QuickOp {
                data: 3,
                size: Size::Long,
                mode: EffectiveAddress::Dr(DataReg::D1),
            }))
        );
        // a zero data field encodes 8
        assert_eq!(
            decode_quick(0x5148),
            Some(InstructionKind::Subq(QuickOp {
                data: 8,
                size: Size::Word,
                mode: EffectiveAddress::Ar(AddrReg::A0),
            }))
        );
    }

    #[test]
    fn byte_operations_on_address_registers_are_rejected() {
        assert_eq!(decode_quick(0x5208), None); // addq.b #1,%a0
        assert_eq!(decode_move(0x1008), None); // move.b %a0,%d0
        assert_eq!(decode_move(0x1040), None); // movea.b
        assert_eq!(decode_arithmetic(0xD008), None); // add.b %a0,%d0
        assert!(decode_arithmetic(0xD048).is_some()); // add.w %a0,%d0
    }

    #[test]
    fn moveq_sign_extends_its_data() {
        assert_eq!(
            decode_moveq(0x7064),
            Some(InstructionKind::Moveq {
                data: 100,
                dst: DataReg::D0,
            })
        );
        assert_eq!(
            decode_moveq(0x72FF),
            Some(InstructionKind::Moveq {
                data: -1,
                dst: DataReg::D1,
            })
        );
        assert_eq!(decode_moveq(0x7164), None);
    }

    #[test]
    fn move_destination_field_order() {
        // move.w (%a1)+,-(%a2): dst mode 100 reg 010, src mode 011 reg 001
        assert_eq!(
            decode_move(0x3519),
            Some(InstructionKind::Move {
                size: Size::Word,
                src: EffectiveAddress::AddrPostIncr(AddrReg::A1),
                dst: EffectiveAddress::AddrPreDecr(AddrReg::A2),
            })
        );
        // movea.l %d0,%a3
        assert_eq!(
            decode_move(0x2640),
            Some(InstructionKind::Movea {
                size: Size::Long,
                src: EffectiveAddress::Dr(DataReg::D0),
                dst: AddrReg::A3,
            })
        );
        // immediate destination is not alterable
        assert_eq!(decode_move(0x39C0), None);
    }

    #[test]
    fn clr_and_cmpi_require_data_alterable_destinations() {
        assert!(decode_unary(0x4290).is_some()); // clr.l (%a0)
        assert_eq!(decode_unary(0x4248), None); // clr.w %a0
        assert_eq!(decode_unary(0x427A), None); // clr.w (d16,%pc)
        assert_eq!(decode_unary(0x42C0), None); // size 11
        assert!(decode_immediate(0x0C40).is_some()); // cmpi.w #x,%d0
        assert_eq!(decode_immediate(0x0C7C), None); // cmpi.w #x,#y
    }

    #[test]
    fn control_modes_only_for_jumps() {
        assert_eq!(
            decode_jump(0x4E90),
            Some(InstructionKind::Jsr {
                mode: EffectiveAddress::Addr(AddrReg::A0),
            })
        );
        assert_eq!(
            decode_jump(0x4ED0),
            Some(InstructionKind::Jmp {
                mode: EffectiveAddress::Addr(AddrReg::A0),
            })
        );
        assert_eq!(decode_jump(0x4E98), None); // jsr (%a0)+
        assert_eq!(decode_jump(0x4EBC), None); // jsr #imm
        assert_eq!(decode_lea(0x41C0), None); // lea %d0,%a0
    }

    #[test]
    fn group_b_splits_into_compare_and_eor() {
        assert!(matches!(decode_compare(0xB041), Some(InstructionKind::Cmp(_))));
        assert!(matches!(decode_compare(0xB0C1), Some(InstructionKind::Cmpa(_))));
        assert!(matches!(decode_compare(0xB149), Some(InstructionKind::Cmpm { .. })));
        assert!(matches!(decode_compare(0xB141), Some(InstructionKind::Eor(_))));
    }

    #[test]
    fn exg_opmodes() {
        assert_eq!(
            decode_exg(0xC342),
            Some(InstructionKind::Exg(Exg::DataData {
                rx: DataReg::D1,
                ry: DataReg::D2,
            }))
        );
        assert_eq!(
            decode_exg(0xC38A),
            Some(InstructionKind::Exg(Exg::DataAddr {
                data: DataReg::D1,
                addr: AddrReg::A2,
            }))
        );
        assert_eq!(decode_exg(0xC340 | 0b010_000), None);
    }

    #[test]
    fn addressing_mode_classification() {
        assert_eq!(AddressingMode::from_fields(0b111, 0b101), AddressingMode::Unknown);
        assert_eq!(AddressingMode::from_fields(0b111, 0b011), AddressingMode::PcIndex);
        assert_eq!(
            AddressingMode::from_fields(0b011, 0b111),
            AddressingMode::AddressPostIncrement
        );
        let pc_rel = EffectiveAddress::PCDisplace;
        assert!(pc_rel.is_control() && pc_rel.is_data() && !pc_rel.is_alterable());
        let dn = EffectiveAddress::Dr(DataReg::D0);
        assert!(dn.is_data_alterable() && !dn.is_memory_alterable() && !dn.is_control());
    }

    #[test]
    fn size_fields() {
        assert_eq!(Size::from_size_bits(0b11), Err(InvalidSize(0b11)));
        assert_eq!(Size::from_move_bits(0b00), Err(InvalidSize(0b00)));
        assert_eq!(Size::from_move_bits(0b11), Ok(Size::Word));
        assert_eq!(Size::Word.sign_extend(0x8001), 0xFFFF_8001);
        assert_eq!(Size::Byte.sign_extend(0x7F), 0x7F);
    }
}
