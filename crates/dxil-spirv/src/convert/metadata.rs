// Typed access to DXIL metadata tuples.
//
// Operand positions are fixed by the DXIL schema; anything missing or of the wrong
// kind is a `MalformedMetadata` error naming the tuple and the operand.

use crate::dxil::{MdNode, MdNodeId, Metadata, Module, ValueKind};
use crate::{Error, Result};

#[derive(Clone, Copy)]
pub struct MdReader<'m> {
    module: &'m Module,
    node: &'m MdNode,
    context: &'static str,
}

impl<'m> MdReader<'m> {
    pub fn new(module: &'m Module, id: MdNodeId, context: &'static str) -> Result<Self> {
        let node = module.md_node(id).ok_or_else(|| {
            Error::Internal(format!("{context}: dangling metadata node !{}", id.0))
        })?;
        Ok(Self {
            module,
            node,
            context,
        })
    }

    /// First node attached to the named metadata `name`, if any.
    pub fn named(module: &'m Module, name: &'static str) -> Result<Option<Self>> {
        match module.named_metadata(name).and_then(|nodes| nodes.first()) {
            Some(id) => Self::new(module, *id, name).map(Some),
            None => Ok(None),
        }
    }

    pub fn with_context(self, context: &'static str) -> Self {
        Self { context, ..self }
    }

    pub fn len(&self) -> usize {
        self.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    pub fn malformed(&self, index: usize, expected: &'static str) -> Error {
        Error::MalformedMetadata {
            context: self.context,
            index,
            expected,
        }
    }

    pub fn operand(&self, index: usize) -> Result<&'m Metadata> {
        self.node
            .operand(index)
            .ok_or_else(|| self.malformed(index, "present"))
    }

    /// Nested tuple at `index`; `None` when the operand is null or missing.
    pub fn optional_node(&self, index: usize) -> Result<Option<MdReader<'m>>> {
        match self.node.operand(index) {
            None => Ok(None),
            Some(Metadata::Node(id)) => Self::new(self.module, *id, self.context).map(Some),
            Some(_) => Err(self.malformed(index, "a metadata node")),
        }
    }

    pub fn node(&self, index: usize) -> Result<MdReader<'m>> {
        self.optional_node(index)?
            .ok_or_else(|| self.malformed(index, "a metadata node"))
    }

    pub fn u64(&self, index: usize) -> Result<u64> {
        match self.operand(index)? {
            Metadata::Value(value) => match self.module.value(*value).map(|v| &v.kind) {
                Some(ValueKind::ConstInt(v)) => Ok(*v),
                _ => Err(self.malformed(index, "an integer constant")),
            },
            _ => Err(self.malformed(index, "an integer constant")),
        }
    }

    pub fn u32(&self, index: usize) -> Result<u32> {
        let value = self.u64(index)?;
        u32::try_from(value).map_err(|_| self.malformed(index, "a 32-bit integer"))
    }

    pub fn string(&self, index: usize) -> Result<&'m str> {
        match self.operand(index)? {
            Metadata::String(s) => Ok(s),
            _ => Err(self.malformed(index, "a string")),
        }
    }

    /// Non-null tuples among the operands, in order.
    pub fn nodes(&self) -> Result<Vec<MdReader<'m>>> {
        let mut out = Vec::with_capacity(self.len());
        for index in 0..self.len() {
            if let Some(node) = self.optional_node(index)? {
                out.push(node);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_typed_operands() {
        let mut m = Module::new();
        let seven = m.const_i32(7);
        let inner = m.add_md_tuple(vec![Metadata::string("x")]);
        let node = m.add_md_node(vec![
            Some(seven.into()),
            None,
            Some(Metadata::string("name")),
            Some(inner.into()),
        ]);

        let r = MdReader::new(&m, node, "test").unwrap();
        assert_eq!(r.u64(0).unwrap(), 7);
        assert!(r.optional_node(1).unwrap().is_none());
        assert_eq!(r.string(2).unwrap(), "name");
        assert_eq!(r.node(3).unwrap().string(0).unwrap(), "x");
        assert_eq!(r.nodes().unwrap().len(), 1);
    }

    #[test]
    fn reports_malformed_operands() {
        let mut m = Module::new();
        let node = m.add_md_tuple(vec![Metadata::string("not a number")]);
        let r = MdReader::new(&m, node, "dx.resources").unwrap();

        match r.u64(0) {
            Err(Error::MalformedMetadata { context, index, .. }) => {
                assert_eq!(context, "dx.resources");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            r.string(4),
            Err(Error::MalformedMetadata { index: 4, .. })
        ));
    }
}
