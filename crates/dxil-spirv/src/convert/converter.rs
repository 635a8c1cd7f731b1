// Conversion state shared by every lowering component.
//
// One `Converter` owns all maps for one entry point: value ids, struct types,
// resource tables, handles, signature variables, and the node pool.

use std::collections::{BTreeMap, HashMap, HashSet};

use rspirv::spirv::{StorageClass, Word};

use crate::cfg::{NodeId, NodePool, Operation};
use crate::dxil::{
    BlockId, Module, ResourceClass, SignatureDirection, Type, TypeId, ValueData, ValueId,
};
use crate::spirv::SpirvModule;
use crate::{Error, Result};

use super::{ConvertOptions, Diagnostic};

/// Function-storage variable created for an `alloca`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub id: Word,
    pub pointer_type: Word,
    pub name: Option<String>,
}

/// Interface variable declared for one signature element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureVariable {
    pub id: Word,
    /// Type of the variable's contents (not the pointer).
    pub value_type: Word,
    pub storage: StorageClass,
    pub rows: u32,
    pub cols: u32,
    pub name: String,
}

/// Range index -> declared variable id, one table per resource class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTables {
    pub srv: Vec<Option<Word>>,
    pub uav: Vec<Option<Word>>,
    pub cbv: Vec<Option<Word>>,
    pub sampler: Vec<Option<Word>>,
}

impl ResourceTables {
    fn table(&self, class: ResourceClass) -> &Vec<Option<Word>> {
        match class {
            ResourceClass::Srv => &self.srv,
            ResourceClass::Uav => &self.uav,
            ResourceClass::Cbv => &self.cbv,
            ResourceClass::Sampler => &self.sampler,
        }
    }

    fn table_mut(&mut self, class: ResourceClass) -> &mut Vec<Option<Word>> {
        match class {
            ResourceClass::Srv => &mut self.srv,
            ResourceClass::Uav => &mut self.uav,
            ResourceClass::Cbv => &mut self.cbv,
            ResourceClass::Sampler => &mut self.sampler,
        }
    }

    /// Records `id` at `index`, growing the table as needed.
    pub fn insert(&mut self, class: ResourceClass, index: u32, id: Word) {
        let table = self.table_mut(class);
        let index = index as usize;
        if table.len() <= index {
            table.resize(index + 1, None);
        }
        table[index] = Some(id);
    }

    pub fn get(&self, class: ResourceClass, index: u32) -> Result<Word> {
        self.table(class)
            .get(index as usize)
            .copied()
            .flatten()
            .ok_or(Error::UndeclaredResource { class, index })
    }

    pub fn len(&self, class: ResourceClass) -> usize {
        self.table(class).len()
    }
}

pub struct Converter<'m> {
    pub(crate) dxil: &'m Module,
    pub(crate) options: ConvertOptions,
    pub(crate) spirv: SpirvModule,

    /// Source value -> target id; at most one entry per source value.
    pub(crate) values: HashMap<ValueId, Word>,
    pub(crate) struct_types: HashMap<TypeId, Word>,
    /// Array types that already carry an `ArrayStride` decoration.
    pub(crate) strided_arrays: HashSet<Word>,

    pub(crate) resources: ResourceTables,
    /// `createHandle` result -> loaded image/sampler or buffer variable.
    pub(crate) handles: HashMap<ValueId, Word>,
    pub(crate) inputs: BTreeMap<u32, SignatureVariable>,
    pub(crate) outputs: BTreeMap<u32, SignatureVariable>,

    pub(crate) pool: NodePool,
    pub(crate) block_nodes: HashMap<BlockId, NodeId>,
    pub(crate) visit_order: Vec<(BlockId, NodeId)>,
    /// Node that lowered operations are appended to.
    pub(crate) current: NodeId,

    pub(crate) local_variables: Vec<LocalVariable>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'m> Converter<'m> {
    pub fn new(dxil: &'m Module, options: ConvertOptions) -> Self {
        Self {
            dxil,
            options,
            spirv: SpirvModule::new(),
            values: HashMap::new(),
            struct_types: HashMap::new(),
            strided_arrays: HashSet::new(),
            resources: ResourceTables::default(),
            handles: HashMap::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            pool: NodePool::new(),
            block_nodes: HashMap::new(),
            visit_order: Vec::new(),
            current: NodeId(0),
            local_variables: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn emit(&mut self, op: Operation) {
        tracing::trace!(node = self.current.0, "{op}");
        let node = self.current;
        self.pool[node].ir.operations.push(op);
    }

    /// Records a diagnostic, or fails when unsupported input is denied.
    pub fn diagnose(&mut self, diagnostic: Diagnostic) -> Result<()> {
        tracing::warn!("{diagnostic}");
        if self.options.deny_unsupported {
            return Err(Error::Unsupported(diagnostic.to_string()));
        }
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    // ── Source model lookups ──

    pub fn value(&self, id: ValueId) -> Result<&'m ValueData> {
        self.dxil
            .value(id)
            .ok_or_else(|| Error::Internal(format!("unknown value %{}", id.0)))
    }

    pub fn source_type(&self, id: TypeId) -> Result<&'m Type> {
        self.dxil
            .get_type(id)
            .ok_or_else(|| Error::Internal(format!("unknown type %t{}", id.0)))
    }

    pub fn value_source_type(&self, id: ValueId) -> Result<&'m Type> {
        let ty = self.value(id)?.ty;
        self.source_type(ty)
    }

    pub fn node_for_block(&self, block: BlockId) -> Result<NodeId> {
        self.block_nodes
            .get(&block)
            .copied()
            .ok_or(Error::UnknownBlock(block.0))
    }

    pub fn signature_variable(
        &self,
        direction: SignatureDirection,
        index: u32,
    ) -> Result<&SignatureVariable> {
        let table = match direction {
            SignatureDirection::Input => &self.inputs,
            SignatureDirection::Output => &self.outputs,
        };
        table
            .get(&index)
            .ok_or(Error::UnknownSignatureElement { direction, index })
    }

    pub fn handle(&self, value: ValueId) -> Result<Word> {
        self.handles
            .get(&value)
            .copied()
            .ok_or(Error::UnknownHandle(value.0))
    }
}

/// Argument `index` of an instruction's operand list.
pub fn get_arg(args: &[ValueId], index: usize, context: &str) -> Result<ValueId> {
    args.get(index).copied().ok_or_else(|| {
        Error::MalformedInstruction(format!("{context}: missing operand {index}"))
    })
}

/// Argument `index`, which must be an integer constant.
pub fn const_arg(
    c: &Converter<'_>,
    args: &[ValueId],
    index: usize,
    context: &'static str,
) -> Result<u64> {
    let value = get_arg(args, index, context)?;
    c.value(value)?
        .as_const_int()
        .ok_or(Error::NonConstantOperand { context, index })
}

pub fn const_u32_arg(
    c: &Converter<'_>,
    args: &[ValueId],
    index: usize,
    context: &'static str,
) -> Result<u32> {
    let value = const_arg(c, args, index, context)?;
    u32::try_from(value).map_err(|_| {
        Error::MalformedInstruction(format!("{context}: operand {index} = {value} out of range"))
    })
}
