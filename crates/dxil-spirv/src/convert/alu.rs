// Arithmetic, logic, comparison, conversion, and select operations.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use rspirv::spirv::{Op, Word};

use crate::Result;
use crate::cfg::Operation;
use crate::dxil::{BinaryOp, CastOp, Instruction, Predicate, Type, UnaryOp, ValueId};
use crate::spirv::SpirvType;

use super::types::type_of_value;
use super::values::id_for;
use super::{Converter, Diagnostic};

fn is_bool(c: &Converter<'_>, value: ValueId) -> Result<bool> {
    Ok(matches!(c.value_source_type(value)?, Type::Integer(1)))
}

/// Emits `op` producing `instr`'s value from `args`.
fn emit_value_op(
    c: &mut Converter<'_>,
    instr: &Instruction,
    op: Op,
    args: &[ValueId],
) -> Result<()> {
    let id = id_for(c, instr.value)?;
    let type_id = type_of_value(c, instr.value)?;
    let arguments = args
        .iter()
        .map(|arg| id_for(c, *arg))
        .collect::<Result<Vec<_>>>()?;
    c.emit(Operation::new(op, id, type_id, arguments));
    Ok(())
}

pub fn binary_opcode(op: BinaryOp, boolean: bool) -> Op {
    match op {
        BinaryOp::FAdd => Op::FAdd,
        BinaryOp::FSub => Op::FSub,
        BinaryOp::FMul => Op::FMul,
        BinaryOp::FDiv => Op::FDiv,
        BinaryOp::FRem => Op::FRem,
        BinaryOp::Add => Op::IAdd,
        BinaryOp::Sub => Op::ISub,
        BinaryOp::Mul => Op::IMul,
        BinaryOp::SDiv => Op::SDiv,
        BinaryOp::UDiv => Op::UDiv,
        BinaryOp::SRem => Op::SRem,
        BinaryOp::URem => Op::UMod,
        BinaryOp::Shl => Op::ShiftLeftLogical,
        BinaryOp::LShr => Op::ShiftRightLogical,
        BinaryOp::AShr => Op::ShiftRightArithmetic,
        // i1 logic has to use the logical opcodes.
        BinaryOp::And if boolean => Op::LogicalAnd,
        BinaryOp::Or if boolean => Op::LogicalOr,
        BinaryOp::Xor if boolean => Op::LogicalNotEqual,
        BinaryOp::And => Op::BitwiseAnd,
        BinaryOp::Or => Op::BitwiseOr,
        BinaryOp::Xor => Op::BitwiseXor,
    }
}

pub fn lower_binary(
    c: &mut Converter<'_>,
    instr: &Instruction,
    op: BinaryOp,
    lhs: ValueId,
    rhs: ValueId,
) -> Result<()> {
    let opcode = binary_opcode(op, is_bool(c, lhs)?);
    emit_value_op(c, instr, opcode, &[lhs, rhs])
}

pub fn lower_unary(
    c: &mut Converter<'_>,
    instr: &Instruction,
    op: UnaryOp,
    operand: ValueId,
) -> Result<()> {
    match op {
        UnaryOp::FNeg => emit_value_op(c, instr, Op::FNegate, &[operand]),
    }
}

pub fn cast_opcode(op: CastOp) -> Option<Op> {
    Some(match op {
        CastOp::BitCast => Op::Bitcast,
        CastOp::SExt => Op::SConvert,
        CastOp::Trunc | CastOp::ZExt => Op::UConvert,
        CastOp::FPTrunc | CastOp::FPExt => Op::FConvert,
        CastOp::FPToUI => Op::ConvertFToU,
        CastOp::FPToSI => Op::ConvertFToS,
        CastOp::SIToFP => Op::ConvertSToF,
        CastOp::UIToFP => Op::ConvertUToF,
        CastOp::PtrToInt | CastOp::IntToPtr | CastOp::AddrSpaceCast => return None,
    })
}

/// Scalar constant of `ty` (an int or float type) holding `value`.
///
/// Literals narrower than 32 bits keep their unused high bits zero.
fn numeric_constant(c: &mut Converter<'_>, ty: Word, value: i64) -> Word {
    match c.spirv.get_type(ty).cloned() {
        Some(SpirvType::Float { width: 64 }) => {
            c.spirv.constant_bits64(ty, (value as f64).to_bits())
        }
        Some(SpirvType::Float { width: 16 }) => c.spirv.constant_bits32(ty, half_bits(value)),
        Some(SpirvType::Float { .. }) => c.spirv.constant_bits32(ty, (value as f32).to_bits()),
        Some(SpirvType::Int { width: 64, .. }) => c.spirv.constant_bits64(ty, value as u64),
        Some(SpirvType::Int { width, .. }) if width < 32 => {
            c.spirv.constant_bits32(ty, (value as u32) & ((1 << width) - 1))
        }
        _ => c.spirv.constant_bits32(ty, value as u32),
    }
}

/// binary16 bit pattern of a small integer (exact up to a magnitude of 2048).
fn half_bits(value: i64) -> u32 {
    if value == 0 {
        return 0;
    }
    let sign = if value < 0 { 0x8000 } else { 0 };
    let magnitude = value.unsigned_abs();
    let exponent = 63 - magnitude.leading_zeros();
    let mantissa = ((magnitude << 10) >> exponent) & 0x3ff;
    sign | ((exponent + 15) << 10) | mantissa as u32
}

/// `trunc iN -> i1` keeps the low bit: `(x & 1) != 0`.
fn lower_trunc_to_bool(c: &mut Converter<'_>, instr: &Instruction, operand: ValueId) -> Result<()> {
    let id = id_for(c, instr.value)?;
    let bool_ty = c.spirv.type_bool();
    let source = id_for(c, operand)?;
    let source_ty = type_of_value(c, operand)?;
    let one = numeric_constant(c, source_ty, 1);
    let zero = numeric_constant(c, source_ty, 0);

    let low_bit = c.spirv.alloc_id();
    c.spirv.set_id_type(low_bit, source_ty);
    c.emit(Operation::new(
        Op::BitwiseAnd,
        low_bit,
        source_ty,
        vec![source, one],
    ));
    c.emit(Operation::new(Op::INotEqual, id, bool_ty, vec![low_bit, zero]));
    Ok(())
}

pub fn lower_cast(
    c: &mut Converter<'_>,
    instr: &Instruction,
    op: CastOp,
    operand: ValueId,
) -> Result<()> {
    let Some(opcode) = cast_opcode(op) else {
        return c.diagnose(Diagnostic::UnsupportedCast(op.name()));
    };

    if op == CastOp::Trunc && is_bool(c, instr.value)? {
        return lower_trunc_to_bool(c, instr, operand);
    }

    // Widening a bool is a select between two constants; there is no bool conversion.
    let from_bool = is_bool(c, operand)?;
    if from_bool && matches!(op, CastOp::ZExt | CastOp::SExt | CastOp::UIToFP | CastOp::SIToFP) {
        let id = id_for(c, instr.value)?;
        let type_id = type_of_value(c, instr.value)?;
        let condition = id_for(c, operand)?;
        let one = match op {
            CastOp::SExt | CastOp::SIToFP => -1,
            _ => 1,
        };
        let on_true = numeric_constant(c, type_id, one);
        let on_false = numeric_constant(c, type_id, 0);
        c.emit(Operation::new(
            Op::Select,
            id,
            type_id,
            vec![condition, on_true, on_false],
        ));
        return Ok(());
    }

    emit_value_op(c, instr, opcode, &[operand])
}

/// Opcode for a predicate; `None` for the ones lowered specially or not at all.
pub fn compare_opcode(predicate: Predicate, boolean: bool) -> Option<Op> {
    Some(match predicate {
        Predicate::FcmpOeq => Op::FOrdEqual,
        Predicate::FcmpOgt => Op::FOrdGreaterThan,
        Predicate::FcmpOge => Op::FOrdGreaterThanEqual,
        Predicate::FcmpOlt => Op::FOrdLessThan,
        Predicate::FcmpOle => Op::FOrdLessThanEqual,
        Predicate::FcmpOne => Op::FOrdNotEqual,
        Predicate::FcmpUeq => Op::FUnordEqual,
        Predicate::FcmpUgt => Op::FUnordGreaterThan,
        Predicate::FcmpUge => Op::FUnordGreaterThanEqual,
        Predicate::FcmpUlt => Op::FUnordLessThan,
        Predicate::FcmpUle => Op::FUnordLessThanEqual,
        Predicate::FcmpUne => Op::FUnordNotEqual,
        Predicate::IcmpEq if boolean => Op::LogicalEqual,
        Predicate::IcmpNe if boolean => Op::LogicalNotEqual,
        Predicate::IcmpEq => Op::IEqual,
        Predicate::IcmpNe => Op::INotEqual,
        Predicate::IcmpUgt => Op::UGreaterThan,
        Predicate::IcmpUge => Op::UGreaterThanEqual,
        Predicate::IcmpUlt => Op::ULessThan,
        Predicate::IcmpUle => Op::ULessThanEqual,
        Predicate::IcmpSgt => Op::SGreaterThan,
        Predicate::IcmpSge => Op::SGreaterThanEqual,
        Predicate::IcmpSlt => Op::SLessThan,
        Predicate::IcmpSle => Op::SLessThanEqual,
        Predicate::FcmpFalse | Predicate::FcmpTrue | Predicate::FcmpOrd | Predicate::FcmpUno => {
            return None;
        }
    })
}

pub fn lower_cmp(
    c: &mut Converter<'_>,
    instr: &Instruction,
    predicate: Predicate,
    lhs: ValueId,
    rhs: ValueId,
) -> Result<()> {
    match predicate {
        // Constant-folded predicates copy a bool constant.
        Predicate::FcmpFalse | Predicate::FcmpTrue => {
            let id = id_for(c, instr.value)?;
            let type_id = c.spirv.type_bool();
            let value = c.spirv.constant_bool(predicate == Predicate::FcmpTrue);
            c.emit(Operation::new(Op::CopyLogical, id, type_id, vec![value]));
            Ok(())
        }
        _ => {
            let boolean = is_bool(c, lhs)?;
            match compare_opcode(predicate, boolean) {
                Some(op) => emit_value_op(c, instr, op, &[lhs, rhs]),
                None => c.diagnose(Diagnostic::UnsupportedPredicate(predicate)),
            }
        }
    }
}

pub fn lower_select(
    c: &mut Converter<'_>,
    instr: &Instruction,
    condition: ValueId,
    true_value: ValueId,
    false_value: ValueId,
) -> Result<()> {
    emit_value_op(c, instr, Op::Select, &[condition, true_value, false_value])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_and_shift_mappings() {
        assert_eq!(binary_opcode(BinaryOp::URem, false), Op::UMod);
        assert_eq!(binary_opcode(BinaryOp::SRem, false), Op::SRem);
        assert_eq!(binary_opcode(BinaryOp::AShr, false), Op::ShiftRightArithmetic);
        assert_eq!(binary_opcode(BinaryOp::Xor, false), Op::BitwiseXor);
        assert_eq!(binary_opcode(BinaryOp::Xor, true), Op::LogicalNotEqual);
    }

    #[test]
    fn cast_mappings() {
        assert_eq!(cast_opcode(CastOp::ZExt), Some(Op::UConvert));
        assert_eq!(cast_opcode(CastOp::Trunc), Some(Op::UConvert));
        assert_eq!(cast_opcode(CastOp::SExt), Some(Op::SConvert));
        assert_eq!(cast_opcode(CastOp::FPExt), Some(Op::FConvert));
        assert_eq!(cast_opcode(CastOp::PtrToInt), None);
    }

    #[test]
    fn compare_mappings() {
        assert_eq!(compare_opcode(Predicate::FcmpUlt, false), Some(Op::FUnordLessThan));
        assert_eq!(compare_opcode(Predicate::IcmpSge, false), Some(Op::SGreaterThanEqual));
        assert_eq!(compare_opcode(Predicate::IcmpEq, true), Some(Op::LogicalEqual));
        assert_eq!(compare_opcode(Predicate::FcmpOrd, false), None);
        assert_eq!(compare_opcode(Predicate::FcmpTrue, false), None);
    }

    #[test]
    fn half_constants() {
        assert_eq!(half_bits(0), 0);
        assert_eq!(half_bits(1), 0x3c00);
        assert_eq!(half_bits(-1), 0xbc00);
        assert_eq!(half_bits(2), 0x4000);
        assert_eq!(half_bits(3), 0x4200);
    }
}
