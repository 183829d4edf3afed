use crate::{
    decoder::{Condition, Size},
    registers::{Flag, Registers},
};

fn is_negative(value: u32, size: Size) -> bool {
    value & size.sign_bit() != 0
}

/// N and Z from `value`; V and C cleared. X is left alone.
pub(crate) fn set_logic_flags(value: u32, size: Size, regs: &mut Registers) {
    let value = value & size.mask();
    regs.set_flag(Flag::Negative, is_negative(value, size));
    regs.set_flag(Flag::Zero, value == 0);
    regs.set_flag(Flag::Overflow, false);
    regs.set_flag(Flag::Carry, false);
}

/// dst + src with N, Z, V, C and X.
pub(crate) fn add_with_flags(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    let mask = size.mask();
    let (src, dst) = (src & mask, dst & mask);
    let result = src.wrapping_add(dst) & mask;

    let c = src as u64 + dst as u64 > mask as u64;
    let v = is_negative(src, size) == is_negative(dst, size)
        && is_negative(result, size) != is_negative(src, size);

    regs.set_flag(Flag::Negative, is_negative(result, size));
    regs.set_flag(Flag::Zero, result == 0);
    regs.set_flag(Flag::Overflow, v);
    regs.set_flag(Flag::Carry, c);
    regs.set_flag(Flag::Extend, c);
    result
}

/// dst - src with N, Z, V, C and X.
pub(crate) fn sub_with_flags(dst: u32, src: u32, size: Size, regs: &mut Registers) -> u32 {
    let result = compare(dst, src, size, regs);
    regs.set_flag(Flag::Extend, src & size.mask() > dst & size.mask());
    result
}

/// dst - src setting N, Z, V and C only.
pub(crate) fn cmp_with_flags(dst: u32, src: u32, size: Size, regs: &mut Registers) {
    compare(dst, src, size, regs);
}

fn compare(dst: u32, src: u32, size: Size, regs: &mut Registers) -> u32 {
    let mask = size.mask();
    let (src, dst) = (src & mask, dst & mask);
    let result = dst.wrapping_sub(src) & mask;

    let v = is_negative(src, size) != is_negative(dst, size)
        && is_negative(result, size) != is_negative(dst, size);

    regs.set_flag(Flag::Negative, is_negative(result, size));
    regs.set_flag(Flag::Zero, result == 0);
    regs.set_flag(Flag::Overflow, v);
    regs.set_flag(Flag::Carry, src > dst);
    result
}

/// dst + src + X. Z is only ever cleared, so a multi-precision chain keeps
/// Z set only when every part was zero.
pub(crate) fn addx_with_flags(src: u32, dst: u32, size: Size, regs: &mut Registers) -> u32 {
    let mask = size.mask();
    let x = regs.flag(Flag::Extend) as u64;
    let (src, dst) = (src & mask, dst & mask);
    let sum = src as u64 + dst as u64 + x;
    let result = sum as u32 & mask;

    let c = sum > mask as u64;
    let v = is_negative(src, size) == is_negative(dst, size)
        && is_negative(result, size) != is_negative(src, size);

    regs.set_flag(Flag::Negative, is_negative(result, size));
    if result != 0 {
        regs.set_flag(Flag::Zero, false);
    }
    regs.set_flag(Flag::Overflow, v);
    regs.set_flag(Flag::Carry, c);
    regs.set_flag(Flag::Extend, c);
    result
}

/// dst - src - X, with the same Z rule as [`addx_with_flags`].
pub(crate) fn subx_with_flags(dst: u32, src: u32, size: Size, regs: &mut Registers) -> u32 {
    let mask = size.mask();
    let x = regs.flag(Flag::Extend) as u32;
    let (src, dst) = (src & mask, dst & mask);
    let result = dst.wrapping_sub(src).wrapping_sub(x) & mask;

    let c = src as u64 + x as u64 > dst as u64;
    let v = is_negative(src, size) != is_negative(dst, size)
        && is_negative(result, size) != is_negative(dst, size);

    regs.set_flag(Flag::Negative, is_negative(result, size));
    if result != 0 {
        regs.set_flag(Flag::Zero, false);
    }
    regs.set_flag(Flag::Overflow, v);
    regs.set_flag(Flag::Carry, c);
    regs.set_flag(Flag::Extend, c);
    result
}

pub(crate) fn test_condition(regs: &Registers, condition: Condition) -> bool {
    let n = regs.flag(Flag::Negative);
    let z = regs.flag(Flag::Zero);
    let v = regs.flag(Flag::Overflow);
    let c = regs.flag(Flag::Carry);

    match condition {
        Condition::True => true,
        Condition::False => false,
        Condition::Higher => !c && !z,
        Condition::LowerOrSame => c || z,
        Condition::CarryClear => !c,
        Condition::CarrySet => c,
        Condition::NotEqual => !z,
        Condition::Equal => z,
        Condition::OverflowClear => !v,
        Condition::OverflowSet => v,
        Condition::Plus => !n,
        Condition::Minus => n,
        Condition::GreaterOrEqual => n == v,
        Condition::LessThan => n != v,
        Condition::GreaterThan => !z && n == v,
        Condition::LessOrEqual => z || n != v,
    }
}
