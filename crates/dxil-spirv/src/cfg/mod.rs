// Node graph handed to the structurizer: one node per reachable basic block,
// each owning its lowered operations, PHIs, terminator and branch edges.

#![allow(clippy::cast_possible_truncation)]

mod display;

use std::ops::{Index, IndexMut};

use rspirv::spirv::{Op, Word};

/// Index of a node inside its [`NodePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// One lowered SPIR-V instruction. `id` is 0 when the opcode has no result.
///
/// `arguments` are ids, except for opcodes that take literal operands
/// (`OpCompositeExtract` indices, image-operand masks), where they hold the literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub op: Op,
    pub id: Word,
    pub type_id: Word,
    pub arguments: Vec<Word>,
}

impl Operation {
    pub fn new(op: Op, id: Word, type_id: Word, arguments: Vec<Word>) -> Self {
        Self {
            op,
            id,
            type_id,
            arguments,
        }
    }

    /// Operation without a result.
    pub fn void(op: Op, arguments: Vec<Word>) -> Self {
        Self::new(op, 0, 0, arguments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingValue {
    pub node: NodeId,
    pub id: Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phi {
    pub id: Word,
    pub type_id: Word,
    pub incoming: Vec<IncomingValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCase {
    pub literal: u64,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Branch(NodeId),
    Condition {
        condition: Word,
        on_true: NodeId,
        on_false: NodeId,
    },
    Switch {
        selector: Word,
        default: NodeId,
        cases: Vec<SwitchCase>,
    },
    Return(Option<Word>),
    Unreachable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIr {
    pub phi: Vec<Phi>,
    pub operations: Vec<Operation>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone, Default)]
pub struct CfgNode {
    pub name: String,
    pub ir: NodeIr,
    pub succ: Vec<NodeId>,
    pub pred: Vec<NodeId>,
}

/// Arena owning every node of one converted function.
#[derive(Debug, Clone, Default)]
pub struct NodePool {
    nodes: Vec<CfgNode>,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        self.nodes.push(CfgNode {
            name: name.into(),
            ..CfgNode::default()
        });
        NodeId(self.nodes.len() as u32 - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Adds the edge `from -> to` unless it already exists.
    pub fn add_branch(&mut self, from: NodeId, to: NodeId) {
        if self[from].succ.contains(&to) {
            return;
        }
        self[from].succ.push(to);
        self[to].pred.push(from);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CfgNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }
}

impl Index<NodeId> for NodePool {
    type Output = CfgNode;

    fn index(&self, id: NodeId) -> &CfgNode {
        &self.nodes[id.0 as usize]
    }
}

impl IndexMut<NodeId> for NodePool {
    fn index_mut(&mut self, id: NodeId) -> &mut CfgNode {
        &mut self.nodes[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branches_are_unique_and_mirrored() {
        let mut pool = NodePool::new();
        let a = pool.create_node("a");
        let b = pool.create_node("b");
        pool.add_branch(a, b);
        pool.add_branch(a, b);
        pool.add_branch(b, b);

        assert_eq!(pool[a].succ, vec![b]);
        assert_eq!(pool[b].pred, vec![a, b]);
        assert_eq!(pool[b].succ, vec![b]);
        assert_eq!(pool.len(), 2);
    }
}
