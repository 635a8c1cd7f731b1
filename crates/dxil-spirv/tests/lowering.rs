//! Instruction lowering tests
//!
//! Arithmetic, comparisons, casts, memory and aggregate instructions, calls, and the
//! resource intrinsics that do not sample.

use dxil_spirv::dxil::{
    BinaryOp, CastOp, ComponentType, DxilOp, Predicate, ResourceClass, ResourceKind,
};
use dxil_spirv::spirv::SpirvType;
use dxil_spirv::test_harness::*;
use dxil_spirv::{Diagnostic, Error};
use rspirv::spirv::{Op, StorageClass};

fn ps() -> ShaderBuilder {
    ShaderBuilder::new("ps")
}

// ── Arithmetic ──

#[test]
fn float_arithmetic_reuses_value_ids() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let a = f.add_argument(float);
        let b = f.add_argument(float);
        let sum = f.binary(BinaryOp::FAdd, a, b)?;
        f.binary(BinaryOp::FMul, sum, a)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let float = converted.module.type_float(32);
    let ops = operations(&converted);

    assert_has_pattern(&ops, &[OpPattern::op(Op::FAdd), OpPattern::op(Op::FMul)]);
    let add = find_op(&ops, Op::FAdd).unwrap();
    let mul = find_op(&ops, Op::FMul).unwrap();
    assert_eq!(add.type_id, float);
    assert_eq!(mul.arguments, vec![add.id, add.arguments[0]]);
    assert_ne!(add.arguments[0], add.arguments[1]);
}

#[test]
fn integer_ops_map_to_unsigned_forms() {
    let module = with_main(ps(), |f| {
        let int = f.module().int_type(32);
        let a = f.add_argument(int);
        let b = f.add_argument(int);
        f.binary(BinaryOp::And, a, b)?;
        f.binary(BinaryOp::Shl, a, b)?;
        f.binary(BinaryOp::URem, a, b)?;
        f.binary(BinaryOp::AShr, a, b)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let uint = converted.module.type_uint(32);
    let ops = operations(&converted);

    assert_has_pattern(
        &ops,
        &[
            OpPattern::op(Op::BitwiseAnd),
            OpPattern::op(Op::ShiftLeftLogical),
            OpPattern::op(Op::UMod),
            OpPattern::op(Op::ShiftRightArithmetic),
        ],
    );
    assert!(ops.iter().all(|op| op.type_id == uint));
}

#[test]
fn boolean_logic_uses_logical_opcodes() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let a = f.add_argument(float);
        let b = f.add_argument(float);
        let p = f.cmp(Predicate::FcmpOlt, a, b)?;
        let q = f.cmp(Predicate::FcmpOgt, a, b)?;
        f.binary(BinaryOp::And, p, q)?;
        f.binary(BinaryOp::Or, p, q)?;
        f.binary(BinaryOp::Xor, p, q)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let bool_ty = converted.module.type_bool();
    let ops = operations(&converted);

    assert_has_pattern(
        &ops,
        &[
            OpPattern::op(Op::FOrdLessThan),
            OpPattern::op(Op::FOrdGreaterThan),
            OpPattern::op(Op::LogicalAnd),
            OpPattern::op(Op::LogicalOr),
            OpPattern::op(Op::LogicalNotEqual),
        ],
    );
    let lt = find_op(&ops, Op::FOrdLessThan).unwrap();
    let and = find_op(&ops, Op::LogicalAnd).unwrap();
    assert_eq!(and.type_id, bool_ty);
    assert_eq!(and.arguments[0], lt.id);
}

#[test]
fn boolean_constant_operand_is_rejected() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let a = f.add_argument(float);
        let p = f.cmp(Predicate::FcmpOeq, a, a)?;
        let yes = f.module().const_bool(true);
        f.binary(BinaryOp::And, p, yes)?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::UnsupportedConstant(_))
    ));
}

#[test]
fn fneg_and_select() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let a = f.add_argument(float);
        let b = f.add_argument(float);
        let neg = f.fneg(a)?;
        let p = f.cmp(Predicate::FcmpUne, a, b)?;
        f.select(p, neg, b)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let ops = operations(&converted);

    let neg = find_op(&ops, Op::FNegate).unwrap();
    let cmp = find_op(&ops, Op::FUnordNotEqual).unwrap();
    let select = find_op(&ops, Op::Select).unwrap();
    assert_eq!(select.arguments, vec![cmp.id, neg.id, cmp.arguments[1]]);
}

// ── Comparisons ──

#[test]
fn constant_true_compare_copies_a_bool() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let a = f.add_argument(float);
        f.cmp(Predicate::FcmpTrue, a, a)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let yes = converted.module.constant_bool(true);
    let ops = operations(&converted);

    assert_has_pattern(
        &ops,
        &[OpPattern {
            op: Op::CopyLogical,
            arguments: Pat::Exact(vec![yes]),
        }],
    );
}

#[test]
fn ordered_predicate_is_reported() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let a = f.add_argument(float);
        f.cmp(Predicate::FcmpOrd, a, a)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert!(operations(&converted).is_empty());
    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::UnsupportedPredicate(Predicate::FcmpOrd)]
    );
}

#[test]
fn signed_integer_compares() {
    let module = with_main(ps(), |f| {
        let int = f.module().int_type(32);
        let a = f.add_argument(int);
        let b = f.add_argument(int);
        f.cmp(Predicate::IcmpSlt, a, b)?;
        f.cmp(Predicate::IcmpEq, a, b)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let ops = operations(&converted);
    assert_has_pattern(&ops, &[OpPattern::op(Op::SLessThan), OpPattern::op(Op::IEqual)]);
}

// ── Casts ──

#[test]
fn widening_a_bool_selects_between_constants() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let int = f.module().int_type(32);
        let a = f.add_argument(float);
        let p = f.cmp(Predicate::FcmpOlt, a, a)?;
        f.cast(CastOp::ZExt, p, int)?;
        f.cast(CastOp::SExt, p, int)?;
        f.cast(CastOp::UIToFP, p, float)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let one = converted.module.constant_u32(1);
    let zero = converted.module.constant_u32(0);
    let all_ones = converted.module.constant_u32(u32::MAX);
    let one_f = converted.module.constant_f32(1.0);
    let zero_f = converted.module.constant_f32(0.0);
    let ops = operations(&converted);

    let cmp = find_op(&ops, Op::FOrdLessThan).unwrap();
    let selects: Vec<_> = ops.iter().filter(|op| op.op == Op::Select).collect();
    assert_eq!(selects.len(), 3);
    assert_eq!(selects[0].arguments, vec![cmp.id, one, zero]);
    assert_eq!(selects[1].arguments, vec![cmp.id, all_ones, zero]);
    assert_eq!(selects[2].arguments, vec![cmp.id, one_f, zero_f]);
    assert!(!has_op(&ops, Op::UConvert));
}

#[test]
fn narrow_bool_widening_keeps_high_bits_clear() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let short = f.module().int_type(16);
        let half = f.module().half_type();
        let a = f.add_argument(float);
        let p = f.cmp(Predicate::FcmpOlt, a, a)?;
        f.cast(CastOp::SExt, p, short)?;
        f.cast(CastOp::SIToFP, p, half)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let short = converted.module.type_uint(16);
    let half = converted.module.type_float(16);
    let all_ones = converted.module.constant_bits32(short, 0xffff);
    let minus_one = converted.module.constant_bits32(half, 0xbc00);
    let ops = operations(&converted);

    let selects: Vec<_> = ops.iter().filter(|op| op.op == Op::Select).collect();
    assert_eq!(selects.len(), 2);
    assert_eq!(selects[0].arguments[1], all_ones);
    assert_eq!(selects[1].arguments[1], minus_one);

    let literal = converted
        .module
        .module()
        .types_global_values
        .iter()
        .find(|inst| inst.result_id == Some(all_ones))
        .map(|inst| inst.operands.clone());
    assert_eq!(literal, Some(vec![rspirv::dr::Operand::LiteralBit32(0xffff)]));
}

#[test]
fn truncating_to_bool_tests_the_low_bit() {
    let module = with_main(ps(), |f| {
        let int = f.module().int_type(32);
        let bool_ty = f.module().int_type(1);
        let a = f.add_argument(int);
        f.cast(CastOp::Trunc, a, bool_ty)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let one = converted.module.constant_u32(1);
    let zero = converted.module.constant_u32(0);
    let bool_ty = converted.module.type_bool();
    let ops = operations(&converted);

    assert_has_pattern(
        &ops,
        &[OpPattern::op(Op::BitwiseAnd), OpPattern::op(Op::INotEqual)],
    );
    let and = find_op(&ops, Op::BitwiseAnd).unwrap();
    let ne = find_op(&ops, Op::INotEqual).unwrap();
    assert_eq!(and.arguments[1], one);
    assert_eq!(ne.arguments, vec![and.id, zero]);
    assert_eq!(ne.type_id, bool_ty);
    assert!(!has_op(&ops, Op::UConvert));
}

#[test]
fn numeric_casts() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let double = f.module().double_type();
        let int = f.module().int_type(32);
        let short = f.module().int_type(16);
        let a = f.add_argument(int);
        let x = f.add_argument(float);
        f.cast(CastOp::Trunc, a, short)?;
        f.cast(CastOp::SIToFP, a, float)?;
        f.cast(CastOp::FPExt, x, double)?;
        f.cast(CastOp::FPToUI, x, int)?;
        f.cast(CastOp::BitCast, x, int)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let ops = operations(&converted);
    assert_has_pattern(
        &ops,
        &[
            OpPattern::op(Op::UConvert),
            OpPattern::op(Op::ConvertSToF),
            OpPattern::op(Op::FConvert),
            OpPattern::op(Op::ConvertFToU),
            OpPattern::op(Op::Bitcast),
        ],
    );
    let trunc = find_op(&ops, Op::UConvert).unwrap();
    assert_eq!(
        converted.module.get_type(trunc.type_id),
        Some(&SpirvType::Int {
            width: 16,
            signed: false
        })
    );
}

#[test]
fn pointer_casts_are_reported() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let ptr = f.module().pointer_type(float);
        let int = f.module().int_type(32);
        let p = f.add_argument(ptr);
        f.cast(CastOp::PtrToInt, p, int)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::UnsupportedCast("ptrtoint")]
    );
    assert!(matches!(
        convert_strict(&module),
        Err(Error::Unsupported(_))
    ));
}

// ── Memory ──

#[test]
fn alloca_becomes_function_variable() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let a = f.add_argument(float);
        let slot = f.alloca(float)?;
        f.store(slot, a)?;
        f.load(float, slot)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let float = converted.module.type_float(32);

    assert_eq!(converted.local_variables.len(), 1);
    let local = converted.local_variables[0].clone();
    assert_eq!(
        converted.module.pointee(local.pointer_type),
        Some((StorageClass::Function, float))
    );

    let ops = operations(&converted);
    assert!(!has_op(&ops, Op::Variable));
    let store = find_op(&ops, Op::Store).unwrap();
    let load = find_op(&ops, Op::Load).unwrap();
    assert_eq!(store.arguments[0], local.id);
    assert_eq!(load.arguments, vec![local.id]);
    assert_eq!(load.type_id, float);
}

#[test]
fn alloca_of_several_elements_fails() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let two = f.module().const_i32(2);
        f.alloca_n(float, two)?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::InvalidAllocaCount(2))
    ));
}

#[test]
fn alloca_with_dynamic_count_fails() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let int = f.module().int_type(32);
        let n = f.add_argument(int);
        f.alloca_n(float, n)?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::NonConstantOperand {
            context: "alloca",
            ..
        })
    ));
}

#[test]
fn gep_drops_the_leading_zero() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let int = f.module().int_type(32);
        let array = f.module().array_type(float, 4);
        let float_ptr = f.module().pointer_type(float);
        let i = f.add_argument(int);
        let zero = f.module().const_i32(0);
        let slot = f.alloca(array)?;
        let element = f.gep(float_ptr, slot, vec![zero, i])?;
        f.load(float, element)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let float = converted.module.type_float(32);
    let local = converted.local_variables[0].id;
    let ops = operations(&converted);

    let chain = find_op(&ops, Op::InBoundsAccessChain).unwrap();
    assert_eq!(chain.arguments.len(), 2);
    assert_eq!(chain.arguments[0], local);
    assert_eq!(
        converted.module.pointee(chain.type_id),
        Some((StorageClass::Function, float))
    );
    assert_eq!(find_op(&ops, Op::Load).unwrap().arguments, vec![chain.id]);
}

#[test]
fn gep_with_nonzero_leading_index_fails() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let array = f.module().array_type(float, 4);
        let float_ptr = f.module().pointer_type(float);
        let one = f.module().const_i32(1);
        let slot = f.alloca(array)?;
        f.gep(float_ptr, slot, vec![one, one])?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::NonZeroLeadingIndex)
    ));
}

#[test]
fn extract_value_keeps_literal_indices() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let int = f.module().int_type(32);
        let pair = f.module().struct_type(None, vec![float, int]);
        let s = f.add_argument(pair);
        f.extract_value(int, s, vec![1])?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let uint = converted.module.type_uint(32);
    let ops = operations(&converted);

    let extract = find_op(&ops, Op::CompositeExtract).unwrap();
    assert_eq!(extract.arguments.len(), 2);
    assert_eq!(extract.arguments[1], 1);
    assert_eq!(extract.type_id, uint);
}

// ── Calls and unknown instructions ──

#[test]
fn non_intrinsic_call_is_reported() {
    let module = with_main(ps(), |f| {
        let void = f.module().void_type();
        f.call(void, "helper", Vec::new())?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::NonIntrinsicCall("helper".into())]
    );
    assert!(matches!(
        convert_strict(&module),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn unmodelled_instruction_is_reported() {
    let module = with_main(ps(), |f| {
        let int = f.module().int_type(32);
        f.other(int, "atomicrmw")?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::UnsupportedInstruction("atomicrmw".into())]
    );
}

#[test]
fn unknown_dx_op_is_reported() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let opcode = f.module().const_i32(9999);
        f.call(float, "dx.op.mystery.f32", vec![opcode])?;
        let ret = res_ret_f32(f.module());
        dx_op(f, DxilOp::TextureLoad, "f32", ret, &[])?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(
        converted.diagnostics,
        vec![
            Diagnostic::UnsupportedIntrinsic {
                opcode: 9999,
                callee: "dx.op.mystery.f32".into()
            },
            Diagnostic::UnsupportedIntrinsic {
                opcode: u64::from(DxilOp::TextureLoad.code()),
                callee: "dx.op.textureLoad.f32".into()
            },
        ]
    );
}

#[test]
fn dx_op_needs_a_constant_opcode() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let int = f.module().int_type(32);
        let opcode = f.add_argument(int);
        f.call(float, "dx.op.loadInput.f32", vec![opcode])?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::NonConstantOperand {
            context: "dx.op",
            index: 0
        })
    ));
}

#[test]
fn terminator_inside_a_block_fails() {
    let module = with_main(ps(), |f| {
        f.ret(None)?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::MalformedInstruction(_))
    ));
}

// ── Resource handles and constant buffers ──

#[test]
fn float_cbuffer_load_reads_one_vec4() {
    let mut shader = ps();
    shader.cbv(0, "cb", 0, 0, 64);
    let module = with_main(shader, |f| {
        let float = f.module().float_type();
        let handle = create_handle(f, ResourceClass::Cbv, 0)?;
        let row = cbuffer_load_legacy(f, handle, 2, float)?;
        f.extract_value(float, row, vec![1])?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let buffer = converted.resources.get(ResourceClass::Cbv, 0).unwrap();
    let zero = converted.module.constant_u32(0);
    let two = converted.module.constant_u32(2);
    let float = converted.module.type_float(32);
    let vec4 = converted.module.type_vector(float, 4);
    let ops = operations(&converted);

    assert_has_pattern(
        &ops,
        &[
            OpPattern {
                op: Op::InBoundsAccessChain,
                arguments: Pat::Exact(vec![buffer, zero, two]),
            },
            OpPattern::op(Op::Load),
            OpPattern::op(Op::CompositeExtract),
        ],
    );
    let chain = find_op(&ops, Op::InBoundsAccessChain).unwrap();
    let load = find_op(&ops, Op::Load).unwrap();
    let extract = find_op(&ops, Op::CompositeExtract).unwrap();
    assert_eq!(
        converted.module.pointee(chain.type_id),
        Some((StorageClass::Uniform, vec4))
    );
    assert_eq!(load.type_id, vec4);
    assert_eq!(extract.arguments, vec![load.id, 1]);
    assert!(!has_op(&ops, Op::Bitcast));
}

#[test]
fn integer_cbuffer_load_is_bitcast() {
    let mut shader = ps();
    shader.cbv(0, "cb", 0, 0, 16);
    let module = with_main(shader, |f| {
        let int = f.module().int_type(32);
        let handle = create_handle(f, ResourceClass::Cbv, 0)?;
        cbuffer_load_legacy(f, handle, 0, int)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let uint = converted.module.type_uint(32);
    let uvec4 = converted.module.type_vector(uint, 4);
    let ops = operations(&converted);

    assert_has_pattern(
        &ops,
        &[
            OpPattern::op(Op::InBoundsAccessChain),
            OpPattern::op(Op::Load),
            OpPattern::op(Op::Bitcast),
        ],
    );
    let load = find_op(&ops, Op::Load).unwrap();
    let cast = find_op(&ops, Op::Bitcast).unwrap();
    assert_eq!(cast.arguments, vec![load.id]);
    assert_eq!(cast.type_id, uvec4);
}

#[test]
fn double_cbuffer_load_is_reported() {
    let mut shader = ps();
    shader.cbv(0, "cb", 0, 0, 32);
    let module = with_main(shader, |f| {
        let double = f.module().double_type();
        let handle = create_handle(f, ResourceClass::Cbv, 0)?;
        cbuffer_load_legacy(f, handle, 0, double)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::UnsupportedCBufferLayout("double".into())]
    );
    assert!(!has_op(&operations(&converted), Op::Load));
}

#[test]
fn srv_handle_loads_the_image() {
    let mut shader = ps();
    shader.srv(0, "tex", 0, 0, ResourceKind::Texture2D, ComponentType::F32);
    let module = with_main(shader, |f| {
        create_handle(f, ResourceClass::Srv, 0)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let srv = converted.resources.get(ResourceClass::Srv, 0).unwrap();
    let ops = operations(&converted);

    let load = find_op(&ops, Op::Load).unwrap();
    assert_eq!(load.arguments, vec![srv]);
    assert!(converted.module.image(load.type_id).is_some());
}

#[test]
fn handle_to_undeclared_range_fails() {
    let module = with_main(ps(), |f| {
        create_handle(f, ResourceClass::Srv, 3)?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::UndeclaredResource {
            class: ResourceClass::Srv,
            index: 3
        })
    ));
}

#[test]
fn uav_handle_is_reported() {
    let module = with_main(ps(), |f| {
        create_handle(f, ResourceClass::Uav, 1)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(converted.diagnostics, vec![Diagnostic::UavHandle(1)]);
}

#[test]
fn cbuffer_load_through_unknown_handle_fails() {
    let module = with_main(ps(), |f| {
        let float = f.module().float_type();
        let handle_ty = handle_type(f.module());
        let handle = f.add_argument(handle_ty);
        cbuffer_load_legacy(f, handle, 0, float)?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::UnknownHandle(_))
    ));
}
