// Pointers and aggregates: getelementptr, load/store, extractvalue, alloca.

use rspirv::spirv::{Op, StorageClass};

use crate::cfg::Operation;
use crate::dxil::{Instruction, TypeId, ValueId};
use crate::{Error, Result};

use super::types::{type_of, type_of_value};
use super::values::id_for;
use super::{Converter, LocalVariable};

/// Access chain for a `getelementptr` whose leading index is constant 0.
///
/// The result pointer keeps the storage class of `base` when it is known.
pub fn lower_gep(
    c: &mut Converter<'_>,
    instr: &Instruction,
    in_bounds: bool,
    base: ValueId,
    indices: &[ValueId],
) -> Result<()> {
    let Some((first, rest)) = indices.split_first() else {
        return Err(Error::MalformedInstruction(
            "getelementptr without indices".into(),
        ));
    };
    if c.value(*first)?.as_const_int() != Some(0) {
        return Err(Error::NonZeroLeadingIndex);
    }

    let base_id = id_for(c, base)?;
    let mut type_id = type_of_value(c, instr.value)?;
    if let Some(base_ptr) = c.spirv.id_type(base_id)
        && let Some((storage, _)) = c.spirv.pointee(base_ptr)
        && let Some((StorageClass::Function, pointee)) = c.spirv.pointee(type_id)
        && storage != StorageClass::Function
    {
        type_id = c.spirv.type_pointer(storage, pointee);
    }

    let mut arguments = vec![base_id];
    for index in rest {
        arguments.push(id_for(c, *index)?);
    }
    let id = id_for(c, instr.value)?;
    c.spirv.set_id_type(id, type_id);

    let op = if in_bounds {
        Op::InBoundsAccessChain
    } else {
        Op::AccessChain
    };
    c.emit(Operation::new(op, id, type_id, arguments));
    Ok(())
}

pub fn lower_load(c: &mut Converter<'_>, instr: &Instruction, ptr: ValueId) -> Result<()> {
    let id = id_for(c, instr.value)?;
    let type_id = type_of_value(c, instr.value)?;
    let ptr = id_for(c, ptr)?;
    c.emit(Operation::new(Op::Load, id, type_id, vec![ptr]));
    Ok(())
}

pub fn lower_store(c: &mut Converter<'_>, ptr: ValueId, value: ValueId) -> Result<()> {
    let ptr = id_for(c, ptr)?;
    let value = id_for(c, value)?;
    c.emit(Operation::void(Op::Store, vec![ptr, value]));
    Ok(())
}

/// `extractvalue` becomes `OpCompositeExtract`; indices stay literals.
pub fn lower_extract_value(
    c: &mut Converter<'_>,
    instr: &Instruction,
    aggregate: ValueId,
    indices: &[u32],
) -> Result<()> {
    let id = id_for(c, instr.value)?;
    let type_id = type_of_value(c, instr.value)?;
    let mut arguments = vec![id_for(c, aggregate)?];
    arguments.extend_from_slice(indices);
    c.emit(Operation::new(Op::CompositeExtract, id, type_id, arguments));
    Ok(())
}

/// Single-element `alloca` -> `Function` variable. Emits no operation; the variable is
/// returned in the conversion result for the function header.
pub fn lower_alloca(
    c: &mut Converter<'_>,
    instr: &Instruction,
    allocated_type: TypeId,
    count: ValueId,
) -> Result<()> {
    let count = c
        .value(count)?
        .as_const_int()
        .ok_or(Error::NonConstantOperand {
            context: "alloca",
            index: 0,
        })?;
    if count != 1 {
        return Err(Error::InvalidAllocaCount(count));
    }

    let pointee = type_of(c, allocated_type)?;
    let pointer_type = c.spirv.type_pointer(StorageClass::Function, pointee);
    let id = id_for(c, instr.value)?;
    c.spirv.set_id_type(id, pointer_type);
    c.local_variables.push(LocalVariable {
        id,
        pointer_type,
        name: c.value(instr.value)?.name.clone(),
    });
    Ok(())
}
