// Type oracle: source types and DXIL component codes -> SPIR-V type ids.

use rspirv::spirv::{StorageClass, Word};

use crate::dxil::{ComponentType, Type, TypeId, ValueId};
use crate::{Error, Result};

use super::Converter;

/// SPIR-V type for a source type. Pointers default to `Function` storage.
pub fn type_of(c: &mut Converter<'_>, ty: TypeId) -> Result<Word> {
    let source = c.source_type(ty)?;
    let id = match source {
        Type::Void => c.spirv.type_void(),
        Type::Half => c.spirv.type_float(16),
        Type::Float => c.spirv.type_float(32),
        Type::Double => c.spirv.type_float(64),
        Type::Integer(1) => c.spirv.type_bool(),
        Type::Integer(bits) => c.spirv.type_uint(*bits),
        Type::Pointer(pointee) => {
            let pointee = type_of(c, *pointee)?;
            c.spirv.type_pointer(StorageClass::Function, pointee)
        }
        Type::Vector { element, len } => {
            let element = type_of(c, *element)?;
            c.spirv.type_vector(element, *len)
        }
        Type::Array { element, len } => {
            let len = u32::try_from(*len)
                .map_err(|_| Error::UnsupportedType(format!("array of {len} elements")))?;
            let element = type_of(c, *element)?;
            c.spirv.type_array(element, len)
        }
        Type::Struct { fields, .. } => {
            if let Some(id) = c.struct_types.get(&ty) {
                return Ok(*id);
            }
            let members = fields
                .iter()
                .map(|field| type_of(c, *field))
                .collect::<Result<Vec<_>>>()?;
            let id = c.spirv.type_struct(members);
            c.struct_types.insert(ty, id);
            id
        }
        Type::Label | Type::Metadata => return Err(Error::UnsupportedType(source.to_string())),
    };
    Ok(id)
}

pub fn type_of_value(c: &mut Converter<'_>, value: ValueId) -> Result<Word> {
    let ty = c.value(value)?.ty;
    type_of(c, ty)
}

/// Scalar type for a component code.
pub fn component_scalar(c: &mut Converter<'_>, component: ComponentType) -> Word {
    match component {
        ComponentType::I1 => c.spirv.type_bool(),
        ComponentType::I16 => c.spirv.type_int(16, true),
        ComponentType::U16 => c.spirv.type_uint(16),
        ComponentType::I32 => c.spirv.type_int(32, true),
        ComponentType::U32 => c.spirv.type_uint(32),
        ComponentType::I64 => c.spirv.type_int(64, true),
        ComponentType::U64 => c.spirv.type_uint(64),
        ComponentType::F16 | ComponentType::SNormF16 | ComponentType::UNormF16 => {
            c.spirv.type_float(16)
        }
        ComponentType::F32 | ComponentType::SNormF32 | ComponentType::UNormF32 => {
            c.spirv.type_float(32)
        }
        ComponentType::F64 | ComponentType::SNormF64 | ComponentType::UNormF64 => {
            c.spirv.type_float(64)
        }
    }
}

/// Type of a `rows x cols` element of `code` components.
///
/// 1x1 is a scalar, 1xN a vector, and MxN a matrix of M N-vectors. Matrices need
/// float columns with at least two components, so other multi-row shapes become an
/// array of M rows instead.
pub fn type_of_component(c: &mut Converter<'_>, code: u64, rows: u32, cols: u32) -> Result<Word> {
    let component = ComponentType::from_code(code).ok_or(Error::UnknownComponentType(code))?;
    let scalar = component_scalar(c, component);
    let row = if cols > 1 {
        c.spirv.type_vector(scalar, cols)
    } else {
        scalar
    };
    if rows <= 1 {
        return Ok(row);
    }

    let is_float = c.spirv.get_type(scalar).is_some_and(|t| t.is_float());
    if is_float && cols > 1 {
        Ok(c.spirv.type_matrix(row, rows))
    } else {
        Ok(c.spirv.type_array(row, rows))
    }
}
