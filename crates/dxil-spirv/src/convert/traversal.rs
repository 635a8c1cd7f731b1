// CFG builder: breadth-first walk from the entry block, one node per reachable block.

use std::collections::VecDeque;

use crate::cfg::NodeId;
use crate::dxil::{BlockId, Function};
use crate::{Error, Result};

use super::Converter;
use super::successors::collect_successors;

fn node_name(function: &Function, block: BlockId) -> String {
    match function.block(block) {
        Some(bb) if !bb.name.is_empty() => bb.name.clone(),
        _ => format!("bb{}", block.0),
    }
}

/// Populates the node pool and visit order; returns the entry node.
///
/// Visit order is discovery order, not dominance order.
pub fn build_cfg(c: &mut Converter<'_>, function: &Function) -> Result<NodeId> {
    let entry_block = function
        .entry_block()
        .ok_or_else(|| Error::MalformedInstruction(format!("{} has no blocks", function.name)))?;

    let entry = c
        .pool
        .create_node(format!("{}.entry", node_name(function, entry_block)));
    c.block_nodes.insert(entry_block, entry);

    let mut queue = VecDeque::from([entry_block]);
    while let Some(block) = queue.pop_front() {
        let node = c.node_for_block(block)?;
        c.visit_order.push((block, node));

        let bb = function.block(block).ok_or(Error::UnknownBlock(block.0))?;
        let Some(term) = bb.terminator() else {
            continue;
        };
        for succ in collect_successors(&term.kind) {
            if function.block(succ).is_none() {
                return Err(Error::UnknownBlock(succ.0));
            }
            let succ_node = match c.block_nodes.get(&succ) {
                Some(existing) => *existing,
                None => {
                    let created = c.pool.create_node(node_name(function, succ));
                    c.block_nodes.insert(succ, created);
                    queue.push_back(succ);
                    created
                }
            };
            c.pool.add_branch(node, succ_node);
        }
    }

    tracing::debug!(
        nodes = c.pool.len(),
        blocks = function.blocks.len(),
        "cfg built"
    );
    Ok(entry)
}
