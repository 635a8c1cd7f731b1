// Successor blocks of a terminator, in branch-operand order.

use crate::dxil::{BlockId, InstructionKind};

/// Collect successor blocks from a terminator. Non-terminators have none.
pub fn collect_successors(term: &InstructionKind) -> Vec<BlockId> {
    match term {
        InstructionKind::Br { target } => vec![*target],
        InstructionKind::CondBr {
            on_true, on_false, ..
        } => vec![*on_true, *on_false],
        InstructionKind::Switch { default, cases, .. } => {
            let mut successors = Vec::with_capacity(cases.len() + 1);
            successors.push(*default);
            successors.extend(cases.iter().map(|(_, block)| *block));
            successors
        }
        // Return, Unreachable and unlowered terminators have no successors
        _ => Vec::new(),
    }
}
