// DXIL intrinsic (`dx.op.*`) lowering.
//
// The opcode is the first argument of every call, as an i32 constant.

use rspirv::spirv::{Op, StorageClass, Word};

use crate::cfg::Operation;
use crate::dxil::{DxilOp, Instruction, ResourceClass, SignatureDirection, Type, ValueId};
use crate::spirv::SpirvType;
use crate::{Error, Result};

use super::converter::{const_arg, const_u32_arg, get_arg};
use super::sample::lower_sample;
use super::types::type_of_value;
use super::values::{id_for, id_for_width};
use super::{Converter, Diagnostic};

/// Lower a call to a `dx.op.*` function.
pub fn lower_dxil_intrinsic(
    c: &mut Converter<'_>,
    instr: &Instruction,
    callee: &str,
    args: &[ValueId],
) -> Result<()> {
    let code = const_arg(c, args, 0, "dx.op")?;
    let Some(op) = DxilOp::from_code(code) else {
        return c.diagnose(Diagnostic::UnsupportedIntrinsic {
            opcode: code,
            callee: callee.to_owned(),
        });
    };

    match op {
        // ── Signature I/O ──
        DxilOp::LoadInput => lower_load_input(c, instr, args),
        DxilOp::StoreOutput => lower_store_output(c, args),

        // ── Resources ──
        DxilOp::CreateHandle => lower_create_handle(c, instr, args),
        DxilOp::CBufferLoadLegacy => lower_cbuffer_load_legacy(c, instr, args),

        // ── Sampling ──
        DxilOp::Sample
        | DxilOp::SampleBias
        | DxilOp::SampleLevel
        | DxilOp::SampleCmp
        | DxilOp::SampleCmpLevelZero => lower_sample(c, instr, op, args),

        DxilOp::CBufferLoad
        | DxilOp::SampleGrad
        | DxilOp::TextureLoad
        | DxilOp::TextureStore
        | DxilOp::BufferLoad
        | DxilOp::BufferStore => c.diagnose(Diagnostic::UnsupportedIntrinsic {
            opcode: code,
            callee: callee.to_owned(),
        }),
    }
}

/// Pointer to the addressed component of a signature variable.
///
/// Multi-row elements are indexed by row first; vector rows are then indexed by column.
/// A scalar single-row element is used directly.
fn signature_pointer(
    c: &mut Converter<'_>,
    direction: SignatureDirection,
    args: &[ValueId],
) -> Result<Word> {
    let context = match direction {
        SignatureDirection::Input => "loadInput",
        SignatureDirection::Output => "storeOutput",
    };
    let element = const_u32_arg(c, args, 1, context)?;
    let var = c.signature_variable(direction, element)?.clone();

    let mut indices = Vec::new();
    if var.rows > 1 {
        let row = get_arg(args, 2, context)?;
        indices.push(id_for_width(c, row, Some(32))?);
    }
    if var.cols > 1 {
        let col = get_arg(args, 3, context)?;
        indices.push(id_for_width(c, col, Some(32))?);
    }
    if indices.is_empty() {
        return Ok(var.id);
    }

    let scalar = component_of(c, var.value_type);
    let ptr_type = c.spirv.type_pointer(var.storage, scalar);
    let ptr = c.spirv.alloc_id();
    let mut arguments = vec![var.id];
    arguments.extend(indices);
    c.emit(Operation::new(
        Op::InBoundsAccessChain,
        ptr,
        ptr_type,
        arguments,
    ));
    Ok(ptr)
}

/// Innermost scalar type of a scalar, vector, matrix, or array type.
fn component_of(c: &Converter<'_>, mut ty: Word) -> Word {
    loop {
        ty = match c.spirv.get_type(ty) {
            Some(SpirvType::Vector { component, .. }) => *component,
            Some(SpirvType::Matrix { column, .. }) => *column,
            Some(SpirvType::Array { element, .. }) => *element,
            _ => return ty,
        };
    }
}

fn lower_load_input(c: &mut Converter<'_>, instr: &Instruction, args: &[ValueId]) -> Result<()> {
    let ptr = signature_pointer(c, SignatureDirection::Input, args)?;
    let id = id_for(c, instr.value)?;
    let type_id = type_of_value(c, instr.value)?;
    c.emit(Operation::new(Op::Load, id, type_id, vec![ptr]));
    Ok(())
}

fn lower_store_output(c: &mut Converter<'_>, args: &[ValueId]) -> Result<()> {
    let ptr = signature_pointer(c, SignatureDirection::Output, args)?;
    let value = get_arg(args, 4, "storeOutput")?;
    let value = id_for(c, value)?;
    c.emit(Operation::void(Op::Store, vec![ptr, value]));
    Ok(())
}

/// `createHandle(class, range, index, non_uniform)`.
///
/// SRVs and samplers are loaded here and the loaded value becomes the handle; a CBV
/// handle is the block variable itself.
fn lower_create_handle(
    c: &mut Converter<'_>,
    instr: &Instruction,
    args: &[ValueId],
) -> Result<()> {
    let class_code = const_arg(c, args, 1, "createHandle")?;
    let range = const_u32_arg(c, args, 2, "createHandle")?;
    let Some(class) = ResourceClass::from_code(class_code) else {
        return Err(Error::MalformedInstruction(format!(
            "createHandle with resource class {class_code}"
        )));
    };

    match class {
        ResourceClass::Srv | ResourceClass::Sampler => {
            let var = c.resources.get(class, range)?;
            let ptr_type = c.spirv.id_type(var).ok_or_else(|| {
                Error::Internal(format!("{class} variable %{var} has no type"))
            })?;
            let (_, type_id) = c.spirv.pointee(ptr_type).ok_or_else(|| {
                Error::Internal(format!("{class} variable %{var} is not a pointer"))
            })?;
            let id = c.spirv.alloc_id();
            c.spirv.set_id_type(id, type_id);
            c.emit(Operation::new(Op::Load, id, type_id, vec![var]));
            c.handles.insert(instr.value, id);
            Ok(())
        }
        ResourceClass::Cbv => {
            let var = c.resources.get(class, range)?;
            c.handles.insert(instr.value, var);
            Ok(())
        }
        ResourceClass::Uav => c.diagnose(Diagnostic::UavHandle(range)),
    }
}

/// `cbufferLoadLegacy(handle, slot)`: one vec4 of the buffer's backing array,
/// bitcast to uvec4 when the call returns integers.
fn lower_cbuffer_load_legacy(
    c: &mut Converter<'_>,
    instr: &Instruction,
    args: &[ValueId],
) -> Result<()> {
    let result = c.value_source_type(instr.value)?;
    let element = match result {
        Type::Struct { fields, .. } => match fields.first() {
            Some(field) => c.source_type(*field)?,
            None => result,
        },
        other => other,
    };
    let need_bitcast = match element {
        Type::Float => false,
        Type::Integer(32) => true,
        other => {
            return c.diagnose(Diagnostic::UnsupportedCBufferLayout(other.to_string()));
        }
    };

    let handle = get_arg(args, 1, "cbufferLoadLegacy")?;
    let buffer = c.handle(handle)?;
    let slot = get_arg(args, 2, "cbufferLoadLegacy")?;
    let slot = id_for(c, slot)?;

    let float = c.spirv.type_float(32);
    let vec4 = c.spirv.type_vector(float, 4);
    let ptr_type = c.spirv.type_pointer(StorageClass::Uniform, vec4);
    let zero = c.spirv.constant_u32(0);
    let chain = c.spirv.alloc_id();
    c.emit(Operation::new(
        Op::InBoundsAccessChain,
        chain,
        ptr_type,
        vec![buffer, zero, slot],
    ));

    let result_id = id_for(c, instr.value)?;
    if need_bitcast {
        let loaded = c.spirv.alloc_id();
        c.emit(Operation::new(Op::Load, loaded, vec4, vec![chain]));
        let uint = c.spirv.type_uint(32);
        let uvec4 = c.spirv.type_vector(uint, 4);
        c.emit(Operation::new(Op::Bitcast, result_id, uvec4, vec![loaded]));
    } else {
        c.emit(Operation::new(Op::Load, result_id, vec4, vec![chain]));
    }
    Ok(())
}
