// Resource binder: `dx.resources` -> descriptor variables.
//
// Entry operands (all classes): 0 range index, 1 symbol, 2 name, 3 space, 4 register,
// 5 range size. SRV: 6 shape, 8 tags. CBV: 6 byte size. Sampler: 6 sampler kind.

#![allow(clippy::cast_possible_truncation)]

use rspirv::dr::Operand;
use rspirv::spirv::{Capability, Decoration, Dim, ImageFormat, StorageClass, Word};

use crate::dxil::ResourceClass;
use crate::dxil::schema::{RESOURCES_METADATA, ResourceKind};
use crate::spirv::ImageType;
use crate::{Error, Result};

use super::metadata::MdReader;
use super::types::type_of_component;
use super::{Converter, Diagnostic};

const CBV_VEC4_BYTES: u64 = 16;

/// Operands shared by every resource entry.
struct ResourceEntry<'m> {
    index: u32,
    name: &'m str,
    space: u32,
    register: u32,
}

impl<'m> ResourceEntry<'m> {
    fn read(entry: &MdReader<'m>) -> Result<Self> {
        Ok(Self {
            index: entry.u32(0)?,
            name: entry.string(2)?,
            space: entry.u32(3)?,
            register: entry.u32(4)?,
        })
    }
}

/// Declares one variable per entry of the four resource tables. Absent tables are skipped.
pub fn declare_resources(c: &mut Converter<'_>) -> Result<()> {
    let Some(root) = MdReader::named(c.dxil, RESOURCES_METADATA)? else {
        tracing::debug!("no {RESOURCES_METADATA}; shader binds no resources");
        return Ok(());
    };

    for (slot, class) in ResourceClass::ALL.into_iter().enumerate() {
        let Some(list) = root.optional_node(slot)? else {
            continue;
        };
        for entry in list.nodes()? {
            match class {
                ResourceClass::Srv => declare_srv(c, &entry.with_context("SRV entry"))?,
                ResourceClass::Uav => declare_uav(c, &entry.with_context("UAV entry"))?,
                ResourceClass::Cbv => declare_cbv(c, &entry.with_context("CBV entry"))?,
                ResourceClass::Sampler => {
                    declare_sampler(c, &entry.with_context("Sampler entry"))?;
                }
            }
        }
    }

    tracing::debug!(
        srv = c.resources.len(ResourceClass::Srv),
        cbv = c.resources.len(ResourceClass::Cbv),
        sampler = c.resources.len(ResourceClass::Sampler),
        "resources declared"
    );
    Ok(())
}

fn bind(c: &mut Converter<'_>, class: ResourceClass, entry: &ResourceEntry<'_>, var: Word) {
    c.spirv.decorate(
        var,
        Decoration::DescriptorSet,
        vec![Operand::LiteralBit32(entry.space)],
    );
    c.spirv.decorate(
        var,
        Decoration::Binding,
        vec![Operand::LiteralBit32(entry.register)],
    );
    c.spirv.name(var, entry.name);
    c.resources.insert(class, entry.index, var);
}

/// Image shape for an SRV kind: (dim, arrayed, multisampled).
pub fn image_shape(kind: ResourceKind) -> Option<(Dim, bool, bool)> {
    let dim = match kind {
        ResourceKind::Texture1D | ResourceKind::Texture1DArray => Dim::Dim1D,
        ResourceKind::Texture2D
        | ResourceKind::Texture2DMS
        | ResourceKind::Texture2DArray
        | ResourceKind::Texture2DMSArray => Dim::Dim2D,
        ResourceKind::Texture3D => Dim::Dim3D,
        ResourceKind::TextureCube | ResourceKind::TextureCubeArray => Dim::DimCube,
        ResourceKind::TypedBuffer | ResourceKind::RawBuffer | ResourceKind::StructuredBuffer => {
            Dim::DimBuffer
        }
        _ => return None,
    };
    Some((dim, kind.is_arrayed(), kind.is_multisampled()))
}

fn declare_srv(c: &mut Converter<'_>, entry: &MdReader<'_>) -> Result<()> {
    let common = ResourceEntry::read(entry)?;
    let code = entry.u64(6)?;
    let kind = ResourceKind::from_code(code).ok_or(Error::UnknownResourceKind(code))?;
    let (dim, arrayed, multisampled) =
        image_shape(kind).ok_or(Error::UnknownResourceKind(code))?;

    // Tag 0 carries the element component type. Structured and raw views have none and
    // read as uint; every other view must carry it.
    let untyped = matches!(kind, ResourceKind::RawBuffer | ResourceKind::StructuredBuffer);
    let sampled_type = match entry.optional_node(8)? {
        Some(tags) if tags.len() >= 2 && tags.u64(0)? == 0 => {
            type_of_component(c, tags.u64(1)?, 1, 1)?
        }
        _ if untyped => c.spirv.type_uint(32),
        _ => return Err(entry.malformed(8, "element type tag")),
    };

    match dim {
        Dim::Dim1D => c.spirv.capability(Capability::Sampled1D),
        Dim::DimBuffer => c.spirv.capability(Capability::SampledBuffer),
        Dim::DimCube if arrayed => c.spirv.capability(Capability::SampledCubeArray),
        _ => {}
    }
    if arrayed && multisampled {
        c.spirv.capability(Capability::ImageMSArray);
    }

    let image = c.spirv.type_image(ImageType {
        sampled_type,
        dim,
        depth: false,
        arrayed,
        multisampled,
        sampled: 1,
        format: ImageFormat::Unknown,
    });
    let ptr = c.spirv.type_pointer(StorageClass::UniformConstant, image);
    let var = c.spirv.variable(ptr, StorageClass::UniformConstant);
    bind(c, ResourceClass::Srv, &common, var);
    Ok(())
}

fn declare_uav(c: &mut Converter<'_>, entry: &MdReader<'_>) -> Result<()> {
    let common = ResourceEntry::read(entry)?;
    c.diagnose(Diagnostic::UavNotSupported {
        index: common.index,
        name: common.name.to_owned(),
    })
}

/// Number of vec4 slots backing a constant buffer of `byte_size` bytes (at least one).
pub fn cbv_vec4_count(byte_size: u64) -> u64 {
    byte_size.div_ceil(CBV_VEC4_BYTES).max(1)
}

fn declare_cbv(c: &mut Converter<'_>, entry: &MdReader<'_>) -> Result<()> {
    let common = ResourceEntry::read(entry)?;
    let byte_size = entry.u64(6)?;
    let slots = u32::try_from(cbv_vec4_count(byte_size))
        .map_err(|_| Error::UnsupportedType(format!("constant buffer of {byte_size} bytes")))?;

    let float = c.spirv.type_float(32);
    let vec4 = c.spirv.type_vector(float, 4);
    let array = c.spirv.type_array(vec4, slots);
    if c.strided_arrays.insert(array) {
        c.spirv.decorate(
            array,
            Decoration::ArrayStride,
            vec![Operand::LiteralBit32(CBV_VEC4_BYTES as u32)],
        );
    }

    let block = c.spirv.type_struct(vec![array]);
    c.spirv
        .member_decorate(block, 0, Decoration::Offset, vec![Operand::LiteralBit32(0)]);
    c.spirv.decorate(block, Decoration::Block, Vec::new());
    c.spirv.name(block, common.name);

    let ptr = c.spirv.type_pointer(StorageClass::Uniform, block);
    let var = c.spirv.variable(ptr, StorageClass::Uniform);
    bind(c, ResourceClass::Cbv, &common, var);
    Ok(())
}

fn declare_sampler(c: &mut Converter<'_>, entry: &MdReader<'_>) -> Result<()> {
    let common = ResourceEntry::read(entry)?;
    let sampler = c.spirv.type_sampler();
    let ptr = c.spirv.type_pointer(StorageClass::UniformConstant, sampler);
    let var = c.spirv.variable(ptr, StorageClass::UniformConstant);
    bind(c, ResourceClass::Sampler, &common, var);
    Ok(())
}
