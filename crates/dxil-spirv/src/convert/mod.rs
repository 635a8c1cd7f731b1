// DXIL -> SPIR-V lowering for one entry point.
//
// This module is organized into submodules:
// - `converter`: Converter state shared by all lowering code
// - `types`, `values`: type oracle and value materializer
// - `resources`, `signature`: descriptor and interface variable declarations
// - `traversal`: node graph construction
// - `alu`, `memory`, `control_flow`: native LLVM instructions
// - `intrinsics`, `sample`: `dx.op.*` calls

mod alu;
mod control_flow;
mod converter;
mod diagnostics;
mod intrinsics;
mod memory;
mod metadata;
mod resources;
mod sample;
mod signature;
mod successors;
mod traversal;
mod types;
mod values;

pub(crate) use converter::Converter;
pub use converter::{LocalVariable, ResourceTables, SignatureVariable};
pub use diagnostics::Diagnostic;
pub use resources::cbv_vec4_count;
pub use signature::execution_model_for;

use std::collections::BTreeMap;

use rspirv::dr;
use rspirv::spirv::{ExecutionModel, Word};

use crate::cfg::{NodeId, NodePool};
use crate::dxil::schema::INTRINSIC_PREFIX;
use crate::dxil::{Instruction, InstructionKind, Module};
use crate::spirv::SpirvModule;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Name given to the SPIR-V entry point.
    pub entry_point_name: String,
    /// Fail on the first [`Diagnostic`] instead of collecting it.
    pub deny_unsupported: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            entry_point_name: "main".to_owned(),
            deny_unsupported: false,
        }
    }
}

/// Everything produced for one entry point.
///
/// The node pool is ready for structurization; `module` holds the declarations
/// (types, constants, variables, decorations) its operations refer to.
#[derive(Debug)]
pub struct ConvertedFunction {
    pub node_pool: NodePool,
    pub entry: NodeId,
    /// Nodes in the order the CFG walk discovered them, starting with `entry`.
    pub visit_order: Vec<NodeId>,
    /// `Function` variables to place at the head of the entry block.
    pub local_variables: Vec<LocalVariable>,
    pub diagnostics: Vec<Diagnostic>,
    pub execution_model: Option<ExecutionModel>,
    pub function_id: Word,
    pub entry_point_name: String,
    pub resources: ResourceTables,
    pub inputs: BTreeMap<u32, SignatureVariable>,
    pub outputs: BTreeMap<u32, SignatureVariable>,
    pub module: SpirvModule,
}

impl ConvertedFunction {
    /// Seals the module: declares the entry point with its interface and sets the id bound.
    pub fn into_spirv(self) -> dr::Module {
        self.module
            .finish(self.execution_model, self.function_id, &self.entry_point_name)
    }
}

/// Convert the entry point named by `dx.entryPoints`.
pub fn convert(module: &Module, options: &ConvertOptions) -> Result<ConvertedFunction> {
    let mut c = Converter::new(module, options.clone());

    // Phase 1: module-level declarations.
    let execution_model = signature::read_execution_model(&c)?;
    let function_id = c.spirv.alloc_id();
    resources::declare_resources(&mut c)?;
    let function = signature::entry_function(&c)?;
    c.spirv.name(function_id, &function.name);
    signature::build_signature(&mut c, execution_model)?;
    tracing::debug!(
        function = %function.name,
        ?execution_model,
        interface = c.spirv.interface().len(),
        "declarations done"
    );

    // Phase 2: one node per reachable block.
    let entry = traversal::build_cfg(&mut c, function)?;

    // Phase 3: lower each block's body, then its terminator.
    let visit_order = c.visit_order.clone();
    for (block_id, node) in &visit_order {
        let block = function
            .block(*block_id)
            .ok_or(Error::UnknownBlock(block_id.0))?;
        c.current = *node;
        let body_len = block.instructions.len().saturating_sub(1);
        for instr in &block.instructions[..body_len] {
            lower_instruction(&mut c, instr)?;
        }
        control_flow::lower_terminator(&mut c, block, *node)?;
    }

    tracing::debug!(
        nodes = c.pool.len(),
        diagnostics = c.diagnostics.len(),
        "lowering done"
    );

    Ok(ConvertedFunction {
        node_pool: c.pool,
        entry,
        visit_order: visit_order.into_iter().map(|(_, node)| node).collect(),
        local_variables: c.local_variables,
        diagnostics: c.diagnostics,
        execution_model,
        function_id,
        entry_point_name: options.entry_point_name.clone(),
        resources: c.resources,
        inputs: c.inputs,
        outputs: c.outputs,
        module: c.spirv,
    })
}

/// Lower a single non-terminator instruction into the current node.
fn lower_instruction(c: &mut Converter<'_>, instr: &Instruction) -> Result<()> {
    use alu::{lower_binary, lower_cast, lower_cmp, lower_select, lower_unary};
    use control_flow::lower_phi;
    use intrinsics::lower_dxil_intrinsic;
    use memory::{lower_alloca, lower_extract_value, lower_gep, lower_load, lower_store};

    match &instr.kind {
        InstructionKind::Phi { incoming } => lower_phi(c, instr, incoming),

        // Arithmetic and logic
        InstructionKind::Binary { op, lhs, rhs } => lower_binary(c, instr, *op, *lhs, *rhs),
        InstructionKind::Unary { op, operand } => lower_unary(c, instr, *op, *operand),
        InstructionKind::Cast { op, operand } => lower_cast(c, instr, *op, *operand),
        InstructionKind::Cmp {
            predicate,
            lhs,
            rhs,
        } => lower_cmp(c, instr, *predicate, *lhs, *rhs),
        InstructionKind::Select {
            condition,
            true_value,
            false_value,
        } => lower_select(c, instr, *condition, *true_value, *false_value),

        // Memory and aggregates
        InstructionKind::GetElementPtr {
            in_bounds,
            base,
            indices,
        } => lower_gep(c, instr, *in_bounds, *base, indices),
        InstructionKind::Load { ptr } => lower_load(c, instr, *ptr),
        InstructionKind::Store { ptr, value } => lower_store(c, *ptr, *value),
        InstructionKind::ExtractValue { aggregate, indices } => {
            lower_extract_value(c, instr, *aggregate, indices)
        }
        InstructionKind::Alloca {
            allocated_type,
            count,
        } => lower_alloca(c, instr, *allocated_type, *count),

        InstructionKind::Call { callee, args } => {
            if callee.starts_with(INTRINSIC_PREFIX) {
                lower_dxil_intrinsic(c, instr, callee, args)
            } else {
                c.diagnose(Diagnostic::NonIntrinsicCall(callee.clone()))
            }
        }

        InstructionKind::Br { .. }
        | InstructionKind::CondBr { .. }
        | InstructionKind::Switch { .. }
        | InstructionKind::Ret { .. }
        | InstructionKind::Unreachable => Err(Error::MalformedInstruction(format!(
            "`{}` before the end of its block",
            instr.kind.opcode_name()
        ))),

        InstructionKind::Other { opcode } => {
            c.diagnose(Diagnostic::UnsupportedInstruction(opcode.clone()))
        }
    }
}
