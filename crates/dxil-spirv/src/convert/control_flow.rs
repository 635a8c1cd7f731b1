// Control flow: phi nodes and block terminators.
//
// Nothing here emits branch instructions. PHIs and terminators are recorded on the
// node as descriptors, and the structurizer downstream turns them into SPIR-V.

use crate::cfg::{IncomingValue, NodeId, Phi, SwitchCase, Terminator};
use crate::dxil::{BasicBlock, BlockId, Instruction, InstructionKind, ValueId};
use crate::{Error, Result};

use super::types::type_of_value;
use super::values::id_for;
use super::{Converter, Diagnostic};

/// Record a PHI on the current node.
///
/// Incoming edges from blocks the CFG walk never reached are dropped; those blocks
/// have no node to branch from. A predecessor listed more than once (several switch
/// cases into the same block) keeps its first entry, matching its single branch edge.
pub fn lower_phi(
    c: &mut Converter<'_>,
    instr: &Instruction,
    incoming: &[(ValueId, BlockId)],
) -> Result<()> {
    let id = id_for(c, instr.value)?;
    let type_id = type_of_value(c, instr.value)?;
    c.spirv.set_id_type(id, type_id);

    let mut edges = Vec::with_capacity(incoming.len());
    for (value, block) in incoming {
        let Some(node) = c.block_nodes.get(block).copied() else {
            tracing::trace!(block = block.0, "dropping phi edge from unreachable block");
            continue;
        };
        if edges.iter().any(|edge: &IncomingValue| edge.node == node) {
            continue;
        }
        edges.push(IncomingValue {
            node,
            id: id_for(c, *value)?,
        });
    }

    let node = c.current;
    c.pool[node].ir.phi.push(Phi {
        id,
        type_id,
        incoming: edges,
    });
    Ok(())
}

/// Describe how `block` leaves `node`.
pub fn lower_terminator(c: &mut Converter<'_>, block: &BasicBlock, node: NodeId) -> Result<()> {
    if c.pool[node].ir.terminator.is_some() {
        return Err(Error::Internal(format!(
            "node {} already has a terminator",
            c.pool[node].name
        )));
    }

    let Some(term) = block.terminator() else {
        return c.diagnose(Diagnostic::UnsupportedTerminator {
            block: block.name.clone(),
            opcode: "<empty block>".into(),
        });
    };

    let terminator = match &term.kind {
        InstructionKind::Br { target } => Terminator::Branch(c.node_for_block(*target)?),
        InstructionKind::CondBr {
            condition,
            on_true,
            on_false,
        } => Terminator::Condition {
            condition: id_for(c, *condition)?,
            on_true: c.node_for_block(*on_true)?,
            on_false: c.node_for_block(*on_false)?,
        },
        InstructionKind::Switch {
            selector,
            default,
            cases,
        } => lower_switch(c, *selector, *default, cases)?,
        InstructionKind::Ret { value } => {
            let value = match value {
                Some(value) => Some(id_for(c, *value)?),
                None => None,
            };
            Terminator::Return(value)
        }
        InstructionKind::Unreachable => Terminator::Unreachable,
        other => {
            return c.diagnose(Diagnostic::UnsupportedTerminator {
                block: block.name.clone(),
                opcode: other.opcode_name().to_owned(),
            });
        }
    };

    c.pool[node].ir.terminator = Some(terminator);
    Ok(())
}

fn lower_switch(
    c: &mut Converter<'_>,
    selector: ValueId,
    default: BlockId,
    cases: &[(ValueId, BlockId)],
) -> Result<Terminator> {
    let selector = id_for(c, selector)?;
    let default = c.node_for_block(default)?;
    let mut lowered = Vec::with_capacity(cases.len());
    for (i, (value, block)) in cases.iter().enumerate() {
        let literal = c
            .dxil
            .const_int_value(*value)
            .ok_or(Error::NonConstantOperand {
                context: "switch",
                index: i + 1,
            })?;
        lowered.push(SwitchCase {
            literal,
            node: c.node_for_block(*block)?,
        });
    }
    Ok(Terminator::Switch {
        selector,
        default,
        cases: lowered,
    })
}
