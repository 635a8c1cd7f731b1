use crate::dxil::{ResourceClass, SignatureDirection};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing named metadata: {0}")]
    MissingMetadata(&'static str),

    #[error("Malformed metadata in {context}: operand {index} is not {expected}")]
    MalformedMetadata {
        context: &'static str,
        index: usize,
        expected: &'static str,
    },

    #[error("Entry point function not found: {0}")]
    EntryPointNotFound(String),

    #[error("Unknown component type code {0}")]
    UnknownComponentType(u64),

    #[error("Unknown resource kind code {0}")]
    UnknownResourceKind(u64),

    #[error("{class} range index {index} was never declared")]
    UndeclaredResource { class: ResourceClass, index: u32 },

    #[error("Resource handle {0} used before it was created")]
    UnknownHandle(u32),

    #[error("{direction} signature element {index} was never declared")]
    UnknownSignatureElement {
        direction: SignatureDirection,
        index: u32,
    },

    #[error("getelementptr with a leading index other than constant 0 requires variable pointers")]
    NonZeroLeadingIndex,

    #[error("alloca with element count {0} (only single-element allocations are supported)")]
    InvalidAllocaCount(u64),

    #[error("Unsupported constant: {0}")]
    UnsupportedConstant(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Operand {index} of {context} must be a constant integer")]
    NonConstantOperand { context: &'static str, index: usize },

    #[error("Malformed instruction: {0}")]
    MalformedInstruction(String),

    #[error("Branch to basic block {0} that was never reached")]
    UnknownBlock(u32),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
