use crate::dxil::{Predicate, Semantic, SignatureDirection};

/// Something the converter recognised but does not lower.
///
/// The offending instruction or declaration contributes nothing to the output; conversion
/// carries on unless [`ConvertOptions::deny_unsupported`](super::ConvertOptions) is set.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    #[error("UAV {index} ({name}) is not supported; no variable declared")]
    UavNotSupported { index: u32, name: String },

    #[error("UAV handle for range {0} is not supported")]
    UavHandle(u32),

    #[error("{direction} element {index} ({name}) uses system value {semantic:?} with no builtin mapping")]
    UnmappedBuiltin {
        direction: SignatureDirection,
        index: u32,
        name: String,
        semantic: Semantic,
    },

    #[error("cast {0} is not supported")]
    UnsupportedCast(&'static str),

    #[error("compare predicate `{0}` is not supported")]
    UnsupportedPredicate(Predicate),

    #[error("call to non-intrinsic function {0}")]
    NonIntrinsicCall(String),

    #[error("DXIL operation {opcode} ({callee}) is not supported")]
    UnsupportedIntrinsic { opcode: u64, callee: String },

    #[error("constant buffer load returning {0} is not supported")]
    UnsupportedCBufferLayout(String),

    #[error("instruction `{0}` is not supported")]
    UnsupportedInstruction(String),

    #[error("block {block} ends in `{opcode}`, which is not a supported terminator")]
    UnsupportedTerminator { block: String, opcode: String },
}
