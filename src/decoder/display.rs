use super::{AddrReg, AddressingMode, Condition, DataReg, EffectiveAddress, Size, bit_range};
use std::fmt;

// Operand text. Modes with extension words print as placeholders
// (`(d16,%a0)`, `#imm`); the CPU's disassembler fills in concrete values.

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Condition::True => "t",
            Condition::False => "f",
            Condition::Higher => "hi",
            Condition::LowerOrSame => "ls",
            Condition::CarryClear => "cc",
            Condition::CarrySet => "cs",
            Condition::NotEqual => "ne",
            Condition::Equal => "eq",
            Condition::OverflowClear => "vc",
            Condition::OverflowSet => "vs",
            Condition::Plus => "pl",
            Condition::Minus => "mi",
            Condition::GreaterOrEqual => "ge",
            Condition::LessThan => "lt",
            Condition::GreaterThan => "gt",
            Condition::LessOrEqual => "le",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self {
            Size::Byte => ".b",
            Size::Word => ".w",
            Size::Long => ".l",
        };
        f.write_str(suffix)
    }
}

impl fmt::Display for DataReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%d{}", self.number())
    }
}

impl fmt::Display for AddrReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%a{}", self.number())
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AddressingMode::DataRegisterDirect => "data register direct",
            AddressingMode::AddressRegisterDirect => "address register direct",
            AddressingMode::AddressIndirect => "address register indirect",
            AddressingMode::AddressPostIncrement => "address register indirect with postincrement",
            AddressingMode::AddressPreDecrement => "address register indirect with predecrement",
            AddressingMode::AddressDisplacement => "address register indirect with displacement",
            AddressingMode::AddressIndex => "address register indirect with index",
            AddressingMode::PcDisplacement => "program counter with displacement",
            AddressingMode::PcIndex => "program counter with index",
            AddressingMode::AbsoluteShort => "absolute short",
            AddressingMode::AbsoluteLong => "absolute long",
            AddressingMode::Immediate => "immediate",
            AddressingMode::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl fmt::Display for EffectiveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveAddress::Dr(reg) => write!(f, "{reg}"),
            EffectiveAddress::Ar(reg) => write!(f, "{reg}"),
            EffectiveAddress::Addr(reg) => write!(f, "({reg})"),
            EffectiveAddress::AddrPostIncr(reg) => write!(f, "({reg})+"),
            EffectiveAddress::AddrPreDecr(reg) => write!(f, "-({reg})"),
            EffectiveAddress::AddrDisplace(reg) => write!(f, "(d16,{reg})"),
            EffectiveAddress::AddrIndex(reg) => write!(f, "(d8,{reg},xn)"),
            EffectiveAddress::PCDisplace => f.write_str("(d16,%pc)"),
            EffectiveAddress::PCIndex => f.write_str("(d8,%pc,xn)"),
            EffectiveAddress::AbsShort => f.write_str("(xxx).w"),
            EffectiveAddress::AbsLong => f.write_str("(xxx).l"),
            EffectiveAddress::Immediate => f.write_str("#imm"),
        }
    }
}

// Signed hex with a leading '-' for negative values.
pub fn format_signed_hex(value: i32) -> String {
    if value < 0 {
        format!("-0x{:x}", (value as i64).unsigned_abs())
    } else {
        format!("0x{:x}", value)
    }
}

/// Render a brief-format index extension word against `base_reg`, e.g.
/// `0x4(%a0,%d1.w)`.
pub fn format_index_operand(base_reg: &str, ext_word: u16) -> String {
    let displacement = ext_word as u8 as i8 as i32;
    let index_reg_num = bit_range(ext_word, 12, 15);
    let is_addr_reg = bit_range(ext_word, 15, 16) == 1;
    let size_suffix = if bit_range(ext_word, 11, 12) == 1 {
        ".l"
    } else {
        ".w"
    };
    let index_reg = if is_addr_reg {
        format!("%a{index_reg_num}")
    } else {
        format!("%d{index_reg_num}")
    };

    if displacement == 0 {
        format!("({base_reg},{index_reg}{size_suffix})")
    } else {
        format!(
            "{}({base_reg},{index_reg}{size_suffix})",
            format_signed_hex(displacement)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_text() {
        let cases = [
            (EffectiveAddress::Dr(DataReg::D0), "%d0"),
            (EffectiveAddress::Ar(AddrReg::A7), "%a7"),
            (EffectiveAddress::AddrPostIncr(AddrReg::A1), "(%a1)+"),
            (EffectiveAddress::AddrPreDecr(AddrReg::A2), "-(%a2)"),
            (EffectiveAddress::AddrDisplace(AddrReg::A3), "(d16,%a3)"),
            (EffectiveAddress::Immediate, "#imm"),
        ];
        for (ea, text) in cases {
            assert_eq!(ea.to_string(), text);
        }
        assert_eq!(Size::Long.to_string(), ".l");
        assert_eq!(Condition::LowerOrSame.to_string(), "ls");
        assert_eq!(
            EffectiveAddress::PCIndex.mode().to_string(),
            "program counter with index"
        );
    }

    #[test]
    fn index_extension_words() {
        assert_eq!(format_index_operand("%a0", 0x1004), "0x4(%a0,%d1.w)");
        assert_eq!(format_index_operand("%pc", 0xA8FE), "-0x2(%pc,%a2.l)");
        assert_eq!(format_index_operand("%a3", 0x0000), "(%a3,%d0.w)");
    }

    #[test]
    fn signed_hex() {
        assert_eq!(format_signed_hex(-16), "-0x10");
        assert_eq!(format_signed_hex(255), "0xff");
        assert_eq!(format_signed_hex(i32::MIN), "-0x80000000");
    }
}
