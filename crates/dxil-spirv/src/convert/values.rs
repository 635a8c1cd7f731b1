// Value materializer: source SSA values and constants -> SPIR-V ids.

#![allow(clippy::cast_possible_truncation)]

use rspirv::spirv::Word;

use crate::dxil::{Type, ValueId, ValueKind};
use crate::{Error, Result};

use super::Converter;
use super::types::type_of;

pub fn id_for(c: &mut Converter<'_>, value: ValueId) -> Result<Word> {
    id_for_width(c, value, None)
}

/// Id for `value`, allocated on first use and reused afterwards.
///
/// `forced_width` re-types an integer constant on its first materialization only;
/// later calls return the memoized id whatever width they ask for.
pub fn id_for_width(
    c: &mut Converter<'_>,
    value: ValueId,
    forced_width: Option<u32>,
) -> Result<Word> {
    if let Some(id) = c.values.get(&value) {
        return Ok(*id);
    }

    let data = c.value(value)?;
    let id = match &data.kind {
        ValueKind::Undef => {
            let ty = type_of(c, data.ty)?;
            c.spirv.undef(ty)
        }
        ValueKind::ConstFloat(v) => match c.source_type(data.ty)? {
            Type::Float => c.spirv.constant_f32(*v as f32),
            Type::Double => c.spirv.constant_f64(*v),
            other => {
                return Err(Error::UnsupportedConstant(format!("{other} constant {v}")));
            }
        },
        ValueKind::ConstInt(v) => {
            let width = match forced_width {
                Some(width) => width,
                None => c
                    .source_type(data.ty)?
                    .integer_width()
                    .ok_or_else(|| Error::UnsupportedConstant(format!("integer constant {v}")))?,
            };
            if width != 32 {
                return Err(Error::UnsupportedConstant(format!("i{width} constant {v}")));
            }
            c.spirv.constant_u32(*v as u32)
        }
        ValueKind::Argument(_) | ValueKind::Global(_) | ValueKind::Instruction => {
            c.spirv.alloc_id()
        }
    };

    c.values.insert(value, id);
    Ok(id)
}
