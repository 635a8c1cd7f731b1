#![allow(clippy::cast_possible_truncation)]

use crate::{Error, Result};

use super::{
    BasicBlock, BinaryOp, BlockId, CastOp, Function, Instruction, InstructionKind, Module,
    Predicate, TypeId, UnaryOp, ValueData, ValueId, ValueKind,
};

/// Appends one function to a [`Module`], block by block.
///
/// Mirrors an LLVM `IRBuilder`: create blocks up front, position at one, then emit
/// instructions. Each emitted instruction gets a fresh [`ValueId`] whose type is the
/// instruction's result type (`void` for stores and terminators).
pub struct FunctionBuilder<'m> {
    module: &'m mut Module,
    function: Function,
    current: Option<BlockId>,
}

impl<'m> FunctionBuilder<'m> {
    pub fn new(module: &'m mut Module, name: &str) -> Self {
        Self {
            module,
            function: Function {
                name: name.to_owned(),
                arguments: Vec::new(),
                blocks: Vec::new(),
            },
            current: None,
        }
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn add_argument(&mut self, ty: TypeId) -> ValueId {
        let index = self.function.arguments.len() as u32;
        let id = self.module.add_value(ValueData {
            ty,
            kind: ValueKind::Argument(index),
            name: None,
        });
        self.function.arguments.push(id);
        id
    }

    pub fn add_block(&mut self, name: &str) -> BlockId {
        self.function.blocks.push(BasicBlock {
            name: name.to_owned(),
            instructions: Vec::new(),
        });
        BlockId(self.function.blocks.len() as u32 - 1)
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    /// Registers the function with the module and returns its index.
    pub fn finish(self) -> usize {
        self.module.add_function(self.function)
    }

    fn value_ty(&self, value: ValueId) -> Result<TypeId> {
        self.module
            .value(value)
            .map(|v| v.ty)
            .ok_or_else(|| Error::Internal(format!("unknown value %{}", value.0)))
    }

    /// Emits `kind` with a result of type `ty` into the current block.
    pub fn push(&mut self, ty: TypeId, kind: InstructionKind) -> Result<ValueId> {
        let block = self
            .current
            .ok_or_else(|| Error::Internal("builder is not positioned at a block".into()))?;
        let value = self.module.add_value(ValueData {
            ty,
            kind: ValueKind::Instruction,
            name: None,
        });
        let bb = self
            .function
            .blocks
            .get_mut(block.0 as usize)
            .ok_or(Error::UnknownBlock(block.0))?;
        bb.instructions.push(Instruction { value, kind });
        Ok(value)
    }

    fn push_void(&mut self, kind: InstructionKind) -> Result<ValueId> {
        let void = self.module.void_type();
        self.push(void, kind)
    }

    // ── Native instructions ──

    pub fn phi(&mut self, ty: TypeId, incoming: Vec<(ValueId, BlockId)>) -> Result<ValueId> {
        self.push(ty, InstructionKind::Phi { incoming })
    }

    /// Adds an edge to a PHI emitted earlier, for values defined after it (loop back edges).
    pub fn add_incoming(&mut self, phi: ValueId, value: ValueId, block: BlockId) -> Result<()> {
        let instr = self
            .function
            .blocks
            .iter_mut()
            .flat_map(|bb| bb.instructions.iter_mut())
            .find(|instr| instr.value == phi)
            .ok_or_else(|| Error::Internal(format!("unknown value %{}", phi.0)))?;
        match &mut instr.kind {
            InstructionKind::Phi { incoming } => {
                incoming.push((value, block));
                Ok(())
            }
            _ => Err(Error::Internal(format!("%{} is not a phi", phi.0))),
        }
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        let ty = self.value_ty(lhs)?;
        self.push(ty, InstructionKind::Binary { op, lhs, rhs })
    }

    pub fn fneg(&mut self, operand: ValueId) -> Result<ValueId> {
        let ty = self.value_ty(operand)?;
        self.push(
            ty,
            InstructionKind::Unary {
                op: UnaryOp::FNeg,
                operand,
            },
        )
    }

    pub fn cast(&mut self, op: CastOp, operand: ValueId, to: TypeId) -> Result<ValueId> {
        self.push(to, InstructionKind::Cast { op, operand })
    }

    pub fn cmp(&mut self, predicate: Predicate, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        let bool_ty = self.module.int_type(1);
        self.push(
            bool_ty,
            InstructionKind::Cmp {
                predicate,
                lhs,
                rhs,
            },
        )
    }

    pub fn gep(
        &mut self,
        result_ty: TypeId,
        base: ValueId,
        indices: Vec<ValueId>,
    ) -> Result<ValueId> {
        self.push(
            result_ty,
            InstructionKind::GetElementPtr {
                in_bounds: true,
                base,
                indices,
            },
        )
    }

    pub fn load(&mut self, ty: TypeId, ptr: ValueId) -> Result<ValueId> {
        self.push(ty, InstructionKind::Load { ptr })
    }

    pub fn store(&mut self, ptr: ValueId, value: ValueId) -> Result<ValueId> {
        self.push_void(InstructionKind::Store { ptr, value })
    }

    pub fn extract_value(
        &mut self,
        ty: TypeId,
        aggregate: ValueId,
        indices: Vec<u32>,
    ) -> Result<ValueId> {
        self.push(ty, InstructionKind::ExtractValue { aggregate, indices })
    }

    /// Single-element stack slot of `allocated_type`.
    pub fn alloca(&mut self, allocated_type: TypeId) -> Result<ValueId> {
        let count = self.module.const_i32(1);
        self.alloca_n(allocated_type, count)
    }

    pub fn alloca_n(&mut self, allocated_type: TypeId, count: ValueId) -> Result<ValueId> {
        let ptr_ty = self.module.pointer_type(allocated_type);
        self.push(
            ptr_ty,
            InstructionKind::Alloca {
                allocated_type,
                count,
            },
        )
    }

    pub fn select(
        &mut self,
        condition: ValueId,
        true_value: ValueId,
        false_value: ValueId,
    ) -> Result<ValueId> {
        let ty = self.value_ty(true_value)?;
        self.push(
            ty,
            InstructionKind::Select {
                condition,
                true_value,
                false_value,
            },
        )
    }

    pub fn call(&mut self, ret_ty: TypeId, callee: &str, args: Vec<ValueId>) -> Result<ValueId> {
        self.push(
            ret_ty,
            InstructionKind::Call {
                callee: callee.to_owned(),
                args,
            },
        )
    }

    /// Instruction the decoder recognised but has no dedicated shape for.
    pub fn other(&mut self, ty: TypeId, opcode: &str) -> Result<ValueId> {
        self.push(
            ty,
            InstructionKind::Other {
                opcode: opcode.to_owned(),
            },
        )
    }

    // ── Terminators ──

    pub fn br(&mut self, target: BlockId) -> Result<ValueId> {
        self.push_void(InstructionKind::Br { target })
    }

    pub fn cond_br(
        &mut self,
        condition: ValueId,
        on_true: BlockId,
        on_false: BlockId,
    ) -> Result<ValueId> {
        self.push_void(InstructionKind::CondBr {
            condition,
            on_true,
            on_false,
        })
    }

    pub fn switch(
        &mut self,
        selector: ValueId,
        default: BlockId,
        cases: Vec<(ValueId, BlockId)>,
    ) -> Result<ValueId> {
        self.push_void(InstructionKind::Switch {
            selector,
            default,
            cases,
        })
    }

    pub fn ret(&mut self, value: Option<ValueId>) -> Result<ValueId> {
        self.push_void(InstructionKind::Ret { value })
    }

    pub fn unreachable(&mut self) -> Result<ValueId> {
        self.push_void(InstructionKind::Unreachable)
    }
}
