use std::fmt;

use super::{TypeId, ValueId};

/// Index of a basic block inside its [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    FNeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    FPTrunc,
    FPExt,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,
}

/// `fcmp` / `icmp` predicates, in LLVM order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Predicate {
    FcmpFalse,
    FcmpOeq,
    FcmpOgt,
    FcmpOge,
    FcmpOlt,
    FcmpOle,
    FcmpOne,
    FcmpOrd,
    FcmpUno,
    FcmpUeq,
    FcmpUgt,
    FcmpUge,
    FcmpUlt,
    FcmpUle,
    FcmpUne,
    FcmpTrue,
    IcmpEq,
    IcmpNe,
    IcmpUgt,
    IcmpUge,
    IcmpUlt,
    IcmpUle,
    IcmpSgt,
    IcmpSge,
    IcmpSlt,
    IcmpSle,
}

/// Closed set of instruction shapes handed over by the bitcode decoder.
///
/// Anything the decoder recognises but this crate does not model arrives as
/// [`InstructionKind::Other`] and is reported rather than lowered.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstructionKind {
    Phi {
        incoming: Vec<(ValueId, BlockId)>,
    },
    Binary {
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Unary {
        op: UnaryOp,
        operand: ValueId,
    },
    Cast {
        op: CastOp,
        operand: ValueId,
    },
    GetElementPtr {
        in_bounds: bool,
        base: ValueId,
        indices: Vec<ValueId>,
    },
    Load {
        ptr: ValueId,
    },
    Store {
        ptr: ValueId,
        value: ValueId,
    },
    Cmp {
        predicate: Predicate,
        lhs: ValueId,
        rhs: ValueId,
    },
    ExtractValue {
        aggregate: ValueId,
        indices: Vec<u32>,
    },
    Alloca {
        allocated_type: TypeId,
        count: ValueId,
    },
    Select {
        condition: ValueId,
        true_value: ValueId,
        false_value: ValueId,
    },
    Call {
        callee: String,
        args: Vec<ValueId>,
    },

    // === Terminators ===
    Br {
        target: BlockId,
    },
    CondBr {
        condition: ValueId,
        on_true: BlockId,
        on_false: BlockId,
    },
    Switch {
        selector: ValueId,
        default: BlockId,
        cases: Vec<(ValueId, BlockId)>,
    },
    Ret {
        value: Option<ValueId>,
    },
    Unreachable,

    Other {
        opcode: String,
    },
}

impl InstructionKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionKind::Br { .. }
                | InstructionKind::CondBr { .. }
                | InstructionKind::Switch { .. }
                | InstructionKind::Ret { .. }
                | InstructionKind::Unreachable
        )
    }

    /// Short opcode mnemonic, used in diagnostics.
    pub fn opcode_name(&self) -> &str {
        match self {
            InstructionKind::Phi { .. } => "phi",
            InstructionKind::Binary { op, .. } => op.name(),
            InstructionKind::Unary { .. } => "fneg",
            InstructionKind::Cast { op, .. } => op.name(),
            InstructionKind::GetElementPtr { .. } => "getelementptr",
            InstructionKind::Load { .. } => "load",
            InstructionKind::Store { .. } => "store",
            InstructionKind::Cmp { predicate, .. } => {
                if predicate.is_float() {
                    "fcmp"
                } else {
                    "icmp"
                }
            }
            InstructionKind::ExtractValue { .. } => "extractvalue",
            InstructionKind::Alloca { .. } => "alloca",
            InstructionKind::Select { .. } => "select",
            InstructionKind::Call { .. } => "call",
            InstructionKind::Br { .. } | InstructionKind::CondBr { .. } => "br",
            InstructionKind::Switch { .. } => "switch",
            InstructionKind::Ret { .. } => "ret",
            InstructionKind::Unreachable => "unreachable",
            InstructionKind::Other { opcode } => opcode,
        }
    }
}

/// One instruction. `value` is the id of its result (of type `void` when it has none).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    pub value: ValueId,
    pub kind: InstructionKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasicBlock {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// The block's terminating instruction, if the block is well formed.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub arguments: Vec<ValueId>,
    /// Blocks in source order; the first one is the entry block.
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn entry_block(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then_some(BlockId(0))
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0 as usize)
    }
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

impl CastOp {
    pub fn name(self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::FPToUI => "fptoui",
            CastOp::FPToSI => "fptosi",
            CastOp::UIToFP => "uitofp",
            CastOp::SIToFP => "sitofp",
            CastOp::FPTrunc => "fptrunc",
            CastOp::FPExt => "fpext",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::BitCast => "bitcast",
            CastOp::AddrSpaceCast => "addrspacecast",
        }
    }
}

impl Predicate {
    pub fn is_float(self) -> bool {
        !matches!(
            self,
            Predicate::IcmpEq
                | Predicate::IcmpNe
                | Predicate::IcmpUgt
                | Predicate::IcmpUge
                | Predicate::IcmpUlt
                | Predicate::IcmpUle
                | Predicate::IcmpSgt
                | Predicate::IcmpSge
                | Predicate::IcmpSlt
                | Predicate::IcmpSle
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Predicate::FcmpFalse => "false",
            Predicate::FcmpOeq => "oeq",
            Predicate::FcmpOgt => "ogt",
            Predicate::FcmpOge => "oge",
            Predicate::FcmpOlt => "olt",
            Predicate::FcmpOle => "ole",
            Predicate::FcmpOne => "one",
            Predicate::FcmpOrd => "ord",
            Predicate::FcmpUno => "uno",
            Predicate::FcmpUeq => "ueq",
            Predicate::FcmpUgt => "ugt",
            Predicate::FcmpUge => "uge",
            Predicate::FcmpUlt => "ult",
            Predicate::FcmpUle => "ule",
            Predicate::FcmpUne => "une",
            Predicate::FcmpTrue => "true",
            Predicate::IcmpEq => "eq",
            Predicate::IcmpNe => "ne",
            Predicate::IcmpUgt => "ugt",
            Predicate::IcmpUge => "uge",
            Predicate::IcmpUlt => "ult",
            Predicate::IcmpUle => "ule",
            Predicate::IcmpSgt => "sgt",
            Predicate::IcmpSge => "sge",
            Predicate::IcmpSlt => "slt",
            Predicate::IcmpSle => "sle",
        };
        let prefix = if self.is_float() { "fcmp" } else { "icmp" };
        write!(f, "{prefix} {name}")
    }
}
