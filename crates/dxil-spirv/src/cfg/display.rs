use std::fmt::{self, Write as _};

use super::{NodeId, NodePool, Operation, Phi, Terminator};

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id != 0 {
            write!(f, "%{} = ", self.id)?;
        }
        write!(f, "Op{:?}", self.op)?;
        if self.type_id != 0 {
            write!(f, " %{}", self.type_id)?;
        }
        for arg in &self.arguments {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Phi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{} = OpPhi %{}", self.id, self.type_id)?;
        for incoming in &self.incoming {
            write!(f, " [%{}, {}]", incoming.id, incoming.node)?;
        }
        Ok(())
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Branch(target) => write!(f, "branch {target}"),
            Terminator::Condition {
                condition,
                on_true,
                on_false,
            } => write!(f, "condition %{condition} ? {on_true} : {on_false}"),
            Terminator::Switch {
                selector,
                default,
                cases,
            } => {
                write!(f, "switch %{selector} default {default}")?;
                for case in cases {
                    write!(f, " [{} -> {}]", case.literal, case.node)?;
                }
                Ok(())
            }
            Terminator::Return(Some(value)) => write!(f, "return %{value}"),
            Terminator::Return(None) => write!(f, "return"),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl NodePool {
    /// Renders the nodes listed in `order` as text, one block per node.
    pub fn render(&self, order: &[NodeId]) -> String {
        let mut out = String::new();
        for id in order {
            let Some(node) = self.get(*id) else {
                continue;
            };
            let _ = writeln!(out, "{id} {}:", node.name);
            for phi in &node.ir.phi {
                let _ = writeln!(out, "    {phi}");
            }
            for op in &node.ir.operations {
                let _ = writeln!(out, "    {op}");
            }
            match &node.ir.terminator {
                Some(term) => {
                    let _ = writeln!(out, "    {term}");
                }
                None => out.push_str("    <no terminator>\n"),
            }
        }
        out
    }
}
