// Texture sampling: `sample`, `sampleBias`, `sampleLevel`, `sampleCmp`, `sampleCmpLevelZero`.
//
// Operand layout shared by the family:
//   0 opcode, 1 image handle, 2 sampler handle, 3..=6 coordinates, 7..=9 texel offsets,
//   10 bias / lod / depth reference, 11 clamp (bias and cmp variants only).

use rspirv::spirv::{Capability, ImageFormat, ImageOperands, Op, Word};

use crate::cfg::Operation;
use crate::dxil::{DxilOp, Instruction, Type, ValueId};
use crate::spirv::ImageType;
use crate::{Error, Result};

use super::Converter;
use super::converter::get_arg;
use super::types::type_of;
use super::values::id_for;

const COORDINATE_BASE: usize = 3;
const OFFSET_BASE: usize = 7;
const AUX_OPERAND: usize = 10;
const CLAMP_OPERAND: usize = 11;

/// Optional operands of one sampling instruction, collected before emission.
struct ImageOperandList {
    mask: ImageOperands,
    /// Bias or explicit LOD.
    lod: Option<Word>,
    offset: Option<Word>,
    min_lod: Option<Word>,
}

impl Default for ImageOperandList {
    fn default() -> Self {
        Self {
            mask: ImageOperands::empty(),
            lod: None,
            offset: None,
            min_lod: None,
        }
    }
}

impl ImageOperandList {
    /// Mask literal followed by the operands it requests, in mask bit order.
    fn into_arguments(self) -> Vec<Word> {
        let mut arguments = vec![self.mask.bits()];
        arguments.extend(self.lod);
        arguments.extend(self.offset);
        arguments.extend(self.min_lod);
        arguments
    }
}

fn sample_opcode(op: DxilOp) -> Op {
    match op {
        DxilOp::SampleLevel => Op::ImageSampleExplicitLod,
        DxilOp::SampleCmp => Op::ImageSampleDrefImplicitLod,
        DxilOp::SampleCmpLevelZero => Op::ImageSampleDrefExplicitLod,
        _ => Op::ImageSampleImplicitLod,
    }
}

pub fn lower_sample(
    c: &mut Converter<'_>,
    instr: &Instruction,
    op: DxilOp,
    args: &[ValueId],
) -> Result<()> {
    let context = "sample";
    let comparison = op.is_comparison_sample();

    let image = c.handle(get_arg(args, 1, context)?)?;
    let sampler = c.handle(get_arg(args, 2, context)?)?;
    let shape = image_shape(c, image)?;

    let sampled_image = combine(c, image, sampler, shape, comparison);
    let coordinates = coordinate_vector(c, args, shape.coordinate_count())?;
    let dref = if comparison {
        Some(id_for(c, get_arg(args, AUX_OPERAND, context)?)?)
    } else {
        None
    };

    let mut operands = ImageOperandList::default();
    match op {
        DxilOp::SampleBias => {
            operands.mask |= ImageOperands::BIAS;
            operands.lod = Some(id_for(c, get_arg(args, AUX_OPERAND, context)?)?);
        }
        DxilOp::SampleLevel => {
            operands.mask |= ImageOperands::LOD;
            operands.lod = Some(id_for(c, get_arg(args, AUX_OPERAND, context)?)?);
        }
        DxilOp::SampleCmpLevelZero => {
            operands.mask |= ImageOperands::LOD;
            operands.lod = Some(c.spirv.constant_f32(0.0));
        }
        _ => {}
    }
    if let Some(offset) = offset_vector(c, args, shape.offset_count())? {
        operands.mask |= ImageOperands::CONST_OFFSET;
        operands.offset = Some(offset);
    }
    let clamp = match op {
        DxilOp::Sample => Some(AUX_OPERAND),
        DxilOp::SampleBias | DxilOp::SampleCmp => Some(CLAMP_OPERAND),
        _ => None,
    };
    if let Some(index) = clamp
        && let Some(value) = args.get(index)
        && !c.value(*value)?.is_undef()
    {
        c.spirv.capability(Capability::MinLod);
        operands.mask |= ImageOperands::MIN_LOD;
        operands.min_lod = Some(id_for(c, *value)?);
    }

    let component = result_component(c, instr)?;
    let vec4 = c.spirv.type_vector(component, 4);
    let result = id_for(c, instr.value)?;
    c.spirv.set_id_type(result, vec4);

    let mut arguments = vec![sampled_image, coordinates];
    arguments.extend(dref);
    arguments.extend(operands.into_arguments());

    let opcode = sample_opcode(op);
    if comparison {
        // Depth comparison yields one scalar; every lane of the result carries it.
        let scalar = c.spirv.alloc_id();
        c.emit(Operation::new(opcode, scalar, component, arguments));
        c.emit(Operation::new(
            Op::CompositeConstruct,
            result,
            vec4,
            vec![scalar; 4],
        ));
    } else {
        c.emit(Operation::new(opcode, result, vec4, arguments));
    }
    Ok(())
}

fn image_shape(c: &Converter<'_>, image: Word) -> Result<ImageType> {
    c.spirv
        .id_type(image)
        .and_then(|ty| c.spirv.image(ty))
        .copied()
        .ok_or_else(|| Error::Internal(format!("sample: %{image} is not a loaded image")))
}

/// `OpSampledImage` over `image` and `sampler`, with the depth flag matching the variant.
fn combine(
    c: &mut Converter<'_>,
    image: Word,
    sampler: Word,
    shape: ImageType,
    comparison: bool,
) -> Word {
    let image_type = c.spirv.type_image(ImageType {
        depth: comparison,
        sampled: 1,
        format: ImageFormat::Unknown,
        ..shape
    });
    let type_id = c.spirv.type_sampled_image(image_type);
    let id = c.spirv.alloc_id();
    c.spirv.set_id_type(id, type_id);
    c.emit(Operation::new(
        Op::SampledImage,
        id,
        type_id,
        vec![image, sampler],
    ));
    id
}

fn coordinate_vector(c: &mut Converter<'_>, args: &[ValueId], count: u32) -> Result<Word> {
    let mut components = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let value = get_arg(args, COORDINATE_BASE + i, "sample")?;
        components.push(id_for(c, value)?);
    }
    if let [single] = components[..] {
        return Ok(single);
    }

    let float = c.spirv.type_float(32);
    let type_id = c.spirv.type_vector(float, count);
    let id = c.spirv.alloc_id();
    c.spirv.set_id_type(id, type_id);
    c.emit(Operation::new(
        Op::CompositeConstruct,
        id,
        type_id,
        components,
    ));
    Ok(id)
}

/// Signed texel offset vector, or `None` when every offset operand is undef.
///
/// Undef axes become 0. A non-constant offset cannot be expressed as `ConstOffset`.
fn offset_vector(c: &mut Converter<'_>, args: &[ValueId], count: u32) -> Result<Option<Word>> {
    let mut offsets = Vec::with_capacity(count as usize);
    let mut any_constant = false;
    for i in 0..count as usize {
        let index = OFFSET_BASE + i;
        let value = get_arg(args, index, "sample")?;
        if c.dxil.is_undef(value) {
            offsets.push(0);
            continue;
        }
        let offset = c.dxil.const_sext_value(value).ok_or(Error::NonConstantOperand {
            context: "sample offset",
            index,
        })?;
        any_constant = true;
        offsets.push(i32::try_from(offset).map_err(|_| {
            Error::MalformedInstruction(format!("sample offset {offset} out of range"))
        })?);
    }
    if !any_constant {
        return Ok(None);
    }

    let components: Vec<Word> = offsets
        .into_iter()
        .map(|offset| c.spirv.constant_i32(offset))
        .collect();
    if let [single] = components[..] {
        return Ok(Some(single));
    }

    let int = c.spirv.type_int(32, true);
    let type_id = c.spirv.type_vector(int, count);
    let id = c.spirv.alloc_id();
    c.spirv.set_id_type(id, type_id);
    c.emit(Operation::new(
        Op::CompositeConstruct,
        id,
        type_id,
        components,
    ));
    Ok(Some(id))
}

/// Lane type of the call's `{T, T, T, T, i32}` result.
fn result_component(c: &mut Converter<'_>, instr: &Instruction) -> Result<Word> {
    let ty = c.value(instr.value)?.ty;
    let lane = match c.source_type(ty)? {
        Type::Struct { fields, .. } => fields.first().copied().ok_or_else(|| {
            Error::MalformedInstruction("sample returning an empty struct".into())
        })?,
        _ => ty,
    };
    type_of(c, lane)
}
