use super::ValueId;

/// Handle to a metadata node in a [`Module`](super::Module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdNodeId(pub u32);

/// A single (non-null) metadata operand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metadata {
    Node(MdNodeId),
    String(String),
    /// `ConstantAsMetadata` / `ValueAsMetadata`.
    Value(ValueId),
}

impl Metadata {
    pub fn string(s: impl Into<String>) -> Self {
        Metadata::String(s.into())
    }
}

impl From<MdNodeId> for Metadata {
    fn from(node: MdNodeId) -> Self {
        Metadata::Node(node)
    }
}

impl From<ValueId> for Metadata {
    fn from(value: ValueId) -> Self {
        Metadata::Value(value)
    }
}

/// Metadata tuple. Operands can be null, e.g. absent resource tables.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdNode {
    pub operands: Vec<Option<Metadata>>,
}

impl MdNode {
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    pub fn operand(&self, index: usize) -> Option<&Metadata> {
        self.operands.get(index).and_then(Option::as_ref)
    }
}
