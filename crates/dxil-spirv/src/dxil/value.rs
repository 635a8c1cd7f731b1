use super::TypeId;

/// Handle to an SSA value, constant or undef. Identity of a source value is its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueId(pub u32);

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Undef,
    /// Integer constant, zero-extended from the type's bit width.
    ConstInt(u64),
    ConstFloat(f64),
    Argument(u32),
    Global(String),
    /// Result of the instruction that carries this value id.
    Instruction,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueData {
    pub ty: TypeId,
    pub kind: ValueKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
}

impl ValueData {
    pub fn is_undef(&self) -> bool {
        matches!(self.kind, ValueKind::Undef)
    }

    pub fn as_const_int(&self) -> Option<u64> {
        match self.kind {
            ValueKind::ConstInt(v) => Some(v),
            _ => None,
        }
    }
}
