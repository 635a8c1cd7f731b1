use std::fmt;

/// Handle to an interned type in a [`Module`](super::Module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeId(pub u32);

/// Source-level (LLVM) type as seen by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    Void,
    Half,
    Float,
    Double,
    Integer(u32),
    Pointer(TypeId),
    Vector { element: TypeId, len: u32 },
    Array { element: TypeId, len: u64 },
    Struct {
        name: Option<String>,
        fields: Vec<TypeId>,
    },
    Label,
    Metadata,
}

impl Type {
    pub fn is_float(&self) -> bool {
        matches!(self, Type::Half | Type::Float | Type::Double)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Integer(_))
    }

    pub fn integer_width(&self) -> Option<u32> {
        match self {
            Type::Integer(bits) => Some(*bits),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Half => write!(f, "half"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Integer(bits) => write!(f, "i{bits}"),
            Type::Pointer(pointee) => write!(f, "ptr(%t{})", pointee.0),
            Type::Vector { element, len } => write!(f, "<{len} x %t{}>", element.0),
            Type::Array { element, len } => write!(f, "[{len} x %t{}]", element.0),
            Type::Struct {
                name: Some(name), ..
            } => write!(f, "%{name}"),
            Type::Struct { name: None, fields } => write!(f, "{{{} fields}}", fields.len()),
            Type::Label => write!(f, "label"),
            Type::Metadata => write!(f, "metadata"),
        }
    }
}
