// Signature builder: `dx.entryPoints` signatures -> Input/Output interface variables.
//
// Entry point operands: 0 function, 1 name, 2 signatures (inputs, outputs, patch constants).
// Element operands: 0 id, 1 name, 2 component type, 3 system value, 6 rows, 7 cols, 8 start row.

use rspirv::dr::Operand;
use rspirv::spirv::{BuiltIn, Decoration, ExecutionModel, StorageClass};

use crate::dxil::schema::{ENTRY_POINTS_METADATA, SHADER_MODEL_METADATA};
use crate::dxil::{Function, Semantic, SignatureDirection};
use crate::{Error, Result};

use super::metadata::MdReader;
use super::types::type_of_component;
use super::{Converter, Diagnostic, SignatureVariable};

/// Stage string of `dx.shaderModel` -> execution model; unknown stages map to `None`.
pub fn execution_model_for(stage: &str) -> Option<ExecutionModel> {
    match stage {
        "vs" => Some(ExecutionModel::Vertex),
        "ps" => Some(ExecutionModel::Fragment),
        "hs" => Some(ExecutionModel::TessellationControl),
        "ds" => Some(ExecutionModel::TessellationEvaluation),
        "gs" => Some(ExecutionModel::Geometry),
        "cs" => Some(ExecutionModel::GLCompute),
        _ => None,
    }
}

pub fn read_execution_model(c: &Converter<'_>) -> Result<Option<ExecutionModel>> {
    let model = MdReader::named(c.dxil, SHADER_MODEL_METADATA)?
        .ok_or(Error::MissingMetadata(SHADER_MODEL_METADATA))?;
    let stage = model.string(0)?;
    let execution_model = execution_model_for(stage);
    if execution_model.is_none() {
        tracing::warn!("unknown shader stage {stage:?}; no entry point will be declared");
    }
    Ok(execution_model)
}

fn entry_point<'m>(c: &Converter<'m>) -> Result<MdReader<'m>> {
    MdReader::named(c.dxil, ENTRY_POINTS_METADATA)?
        .ok_or(Error::MissingMetadata(ENTRY_POINTS_METADATA))
}

/// The function named by the first `dx.entryPoints` entry.
pub fn entry_function<'m>(c: &Converter<'m>) -> Result<&'m Function> {
    let name = entry_point(c)?.string(1)?;
    c.dxil
        .function(name)
        .ok_or_else(|| Error::EntryPointNotFound(name.to_owned()))
}

struct Element<'m> {
    index: u32,
    name: &'m str,
    component: u64,
    semantic: Semantic,
    rows: u32,
    cols: u32,
    start_row: Option<u32>,
}

impl<'m> Element<'m> {
    fn read(node: &MdReader<'m>) -> Result<Self> {
        Ok(Self {
            index: node.u32(0)?,
            name: node.string(1)?,
            component: node.u64(2)?,
            semantic: Semantic::from_code(node.u64(3)?),
            rows: node.u32(6)?,
            cols: node.u32(7)?,
            start_row: if node.len() > 8 {
                Some(node.u32(8)?)
            } else {
                None
            },
        })
    }
}

/// Declares every input and output element of the entry point's signature.
pub fn build_signature(c: &mut Converter<'_>, model: Option<ExecutionModel>) -> Result<()> {
    let Some(signatures) = entry_point(c)?.optional_node(2)? else {
        tracing::debug!("entry point has no signatures");
        return Ok(());
    };

    for (slot, direction) in [SignatureDirection::Input, SignatureDirection::Output]
        .into_iter()
        .enumerate()
    {
        let Some(list) = signatures.optional_node(slot)? else {
            continue;
        };
        let mut location = 0u32;
        for node in list.nodes()? {
            let element = Element::read(&node.with_context("signature element"))?;
            declare_element(c, direction, &element, &mut location, model)?;
        }
    }

    tracing::debug!(
        inputs = c.inputs.len(),
        outputs = c.outputs.len(),
        "signature built"
    );
    Ok(())
}

fn builtin_for(
    semantic: Semantic,
    direction: SignatureDirection,
    model: Option<ExecutionModel>,
) -> Option<BuiltIn> {
    match semantic {
        Semantic::Position
            if direction == SignatureDirection::Input
                && model == Some(ExecutionModel::Fragment) =>
        {
            Some(BuiltIn::FragCoord)
        }
        Semantic::Position => Some(BuiltIn::Position),
        _ => None,
    }
}

fn declare_element(
    c: &mut Converter<'_>,
    direction: SignatureDirection,
    element: &Element<'_>,
    location: &mut u32,
    model: Option<ExecutionModel>,
) -> Result<()> {
    let storage = match direction {
        SignatureDirection::Input => StorageClass::Input,
        SignatureDirection::Output => StorageClass::Output,
    };
    let value_type = type_of_component(c, element.component, element.rows, element.cols)?;
    let ptr = c.spirv.type_pointer(storage, value_type);
    let var = c.spirv.variable(ptr, storage);
    c.spirv.name(var, element.name);

    match element.semantic {
        Semantic::User => {
            c.spirv
                .decorate(var, Decoration::Location, vec![Operand::LiteralBit32(*location)]);
            *location += element.rows.max(1);
        }
        Semantic::Target if direction == SignatureDirection::Output => {
            let target = element.start_row.ok_or(Error::MalformedMetadata {
                context: "signature element",
                index: 8,
                expected: "present",
            })?;
            c.spirv
                .decorate(var, Decoration::Location, vec![Operand::LiteralBit32(target)]);
        }
        semantic => match builtin_for(semantic, direction, model) {
            Some(builtin) => {
                c.spirv
                    .decorate(var, Decoration::BuiltIn, vec![Operand::BuiltIn(builtin)]);
            }
            None => c.diagnose(Diagnostic::UnmappedBuiltin {
                direction,
                index: element.index,
                name: element.name.to_owned(),
                semantic,
            })?,
        },
    }

    c.spirv.add_interface(var);
    let variable = SignatureVariable {
        id: var,
        value_type,
        storage,
        rows: element.rows,
        cols: element.cols,
        name: element.name.to_owned(),
    };
    match direction {
        SignatureDirection::Input => c.inputs.insert(element.index, variable),
        SignatureDirection::Output => c.outputs.insert(element.index, variable),
    };
    Ok(())
}
