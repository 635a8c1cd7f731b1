// Object model of a decoded DXIL module.
//
// The bitcode decoder is an external collaborator: it produces this plain-data model,
// and everything downstream reads it through index handles only.

mod builder;
mod instruction;
mod metadata;
mod module;
pub mod schema;
mod types;
mod value;

pub use builder::FunctionBuilder;
pub use instruction::{
    BasicBlock, BinaryOp, BlockId, CastOp, Function, Instruction, InstructionKind, Predicate,
    UnaryOp,
};
pub use metadata::{MdNode, MdNodeId, Metadata};
pub use module::Module;
pub use schema::{ComponentType, DxilOp, ResourceClass, ResourceKind, Semantic, SignatureDirection};
pub use types::{Type, TypeId};
pub use value::{ValueData, ValueId, ValueKind};
