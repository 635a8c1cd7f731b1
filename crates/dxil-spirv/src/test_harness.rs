//! Test harness for lowering tests
//!
//! Builds DXIL object models the way the compiler front end lays them out
//! (`dx.shaderModel`, `dx.entryPoints`, `dx.resources`, `dx.op.*` calls) and
//! offers helpers to inspect the lowered node graph.
//!
//! # Example
//!
//! ```rust
//! use dxil_spirv::dxil::{ComponentType, FunctionBuilder, Semantic};
//! use dxil_spirv::test_harness::*;
//! use rspirv::spirv::Op;
//!
//! let mut shader = ShaderBuilder::new("ps");
//! shader.input(0, "COLOR", ComponentType::F32, Semantic::User, 1, 4);
//! shader.output(0, "SV_Target", ComponentType::F32, Semantic::Target, 1, 4, 0);
//! let mut module = shader.finish();
//!
//! let mut f = FunctionBuilder::new(&mut module, "main");
//! let entry = f.add_block("entry");
//! f.position_at_end(entry);
//! let float = f.module().float_type();
//! let x = load_input(&mut f, float, 0, 0, 0).unwrap();
//! store_output(&mut f, 0, 0, 0, x).unwrap();
//! f.ret(None).unwrap();
//! f.finish();
//!
//! let converted = convert_default(&module).unwrap();
//! let ops = operations(&converted);
//! assert_eq!(count_op(&ops, Op::Load), 1);
//! assert_eq!(count_op(&ops, Op::Store), 1);
//! ```

#![allow(
    clippy::cast_possible_wrap,
    clippy::match_same_arms,
    clippy::must_use_candidate,
    clippy::manual_assert,
    clippy::missing_panics_doc,
    clippy::uninlined_format_args
)]

use rspirv::dr;
use rspirv::spirv::{Decoration, Op, Word};

use crate::cfg::{NodeId, Operation};
use crate::dxil::schema::{ENTRY_POINTS_METADATA, RESOURCES_METADATA, SHADER_MODEL_METADATA};
use crate::dxil::{
    ComponentType, DxilOp, FunctionBuilder, MdNodeId, Metadata, Module, ResourceClass,
    ResourceKind, Semantic, TypeId, ValueId,
};
use crate::spirv::SpirvModule;
use crate::{ConvertOptions, ConvertedFunction, Result, convert};

// ── Module construction ──

/// Collects shader-level metadata, then writes it into a fresh [`Module`].
pub struct ShaderBuilder {
    module: Module,
    stage: String,
    entry_name: String,
    srvs: Vec<MdNodeId>,
    uavs: Vec<MdNodeId>,
    cbvs: Vec<MdNodeId>,
    samplers: Vec<MdNodeId>,
    inputs: Vec<MdNodeId>,
    outputs: Vec<MdNodeId>,
    has_signatures: bool,
}

impl ShaderBuilder {
    /// `stage` is the `dx.shaderModel` stage string (`"ps"`, `"vs"`, `"cs"`, ...).
    pub fn new(stage: &str) -> Self {
        Self {
            module: Module::new(),
            stage: stage.to_owned(),
            entry_name: "main".to_owned(),
            srvs: Vec::new(),
            uavs: Vec::new(),
            cbvs: Vec::new(),
            samplers: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            has_signatures: true,
        }
    }

    /// Name of the DXIL function `dx.entryPoints` points at. Defaults to `main`.
    pub fn entry_name(&mut self, name: &str) -> &mut Self {
        self.entry_name = name.to_owned();
        self
    }

    /// Leave operand 2 of the entry point null.
    pub fn without_signatures(&mut self) -> &mut Self {
        self.has_signatures = false;
        self
    }

    pub fn module(&mut self) -> &mut Module {
        &mut self.module
    }

    fn int(&mut self, value: u32) -> Option<Metadata> {
        Some(Metadata::Value(self.module.const_i32(value as i32)))
    }

    fn resource_entry(
        &mut self,
        index: u32,
        name: &str,
        space: u32,
        register: u32,
        extra: Vec<Option<Metadata>>,
    ) -> MdNodeId {
        let mut operands = vec![
            self.int(index),
            None,
            Some(Metadata::string(name)),
            self.int(space),
            self.int(register),
            self.int(1),
        ];
        operands.extend(extra);
        self.module.add_md_node(operands)
    }

    /// Typed texture or buffer SRV with `component` as its element type.
    pub fn srv(
        &mut self,
        index: u32,
        name: &str,
        space: u32,
        register: u32,
        kind: ResourceKind,
        component: ComponentType,
    ) -> &mut Self {
        let tag_kind = self.module.const_i32(0);
        let tag_value = self.module.const_i32(component.code() as i32);
        let tags = self
            .module
            .add_md_tuple(vec![tag_kind.into(), tag_value.into()]);
        let extra = vec![
            self.int(kind.code()),
            self.int(0),
            Some(Metadata::Node(tags)),
        ];
        let entry = self.resource_entry(index, name, space, register, extra);
        self.srvs.push(entry);
        self
    }

    /// Raw or structured SRV: no element-type tag.
    pub fn untyped_srv(
        &mut self,
        index: u32,
        name: &str,
        space: u32,
        register: u32,
        kind: ResourceKind,
    ) -> &mut Self {
        let extra = vec![self.int(kind.code()), self.int(0), None];
        let entry = self.resource_entry(index, name, space, register, extra);
        self.srvs.push(entry);
        self
    }

    pub fn uav(&mut self, index: u32, name: &str, space: u32, register: u32) -> &mut Self {
        let extra = vec![self.int(ResourceKind::Texture2D.code())];
        let entry = self.resource_entry(index, name, space, register, extra);
        self.uavs.push(entry);
        self
    }

    pub fn cbv(
        &mut self,
        index: u32,
        name: &str,
        space: u32,
        register: u32,
        byte_size: u32,
    ) -> &mut Self {
        let extra = vec![self.int(byte_size)];
        let entry = self.resource_entry(index, name, space, register, extra);
        self.cbvs.push(entry);
        self
    }

    pub fn sampler(&mut self, index: u32, name: &str, space: u32, register: u32) -> &mut Self {
        let extra = vec![self.int(0)];
        let entry = self.resource_entry(index, name, space, register, extra);
        self.samplers.push(entry);
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn element(
        &mut self,
        index: u32,
        name: &str,
        component: ComponentType,
        semantic: Semantic,
        rows: u32,
        cols: u32,
        start_row: u32,
    ) -> MdNodeId {
        let operands = vec![
            self.int(index),
            Some(Metadata::string(name)),
            self.int(component.code()),
            self.int(semantic.code()),
            None,
            self.int(0),
            self.int(rows),
            self.int(cols),
            self.int(start_row),
            self.int(0),
        ];
        self.module.add_md_node(operands)
    }

    pub fn input(
        &mut self,
        index: u32,
        name: &str,
        component: ComponentType,
        semantic: Semantic,
        rows: u32,
        cols: u32,
    ) -> &mut Self {
        let node = self.element(index, name, component, semantic, rows, cols, 0);
        self.inputs.push(node);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn output(
        &mut self,
        index: u32,
        name: &str,
        component: ComponentType,
        semantic: Semantic,
        rows: u32,
        cols: u32,
        start_row: u32,
    ) -> &mut Self {
        let node = self.element(index, name, component, semantic, rows, cols, start_row);
        self.outputs.push(node);
        self
    }

    fn list(&mut self, entries: &[MdNodeId]) -> Option<Metadata> {
        if entries.is_empty() {
            return None;
        }
        let node = self
            .module
            .add_md_tuple(entries.iter().map(|id| Metadata::Node(*id)).collect());
        Some(Metadata::Node(node))
    }

    /// Writes the named metadata and hands over the module; add functions afterwards.
    pub fn finish(mut self) -> Module {
        let major = self.int(6);
        let minor = self.int(0);
        let model = self
            .module
            .add_md_node(vec![Some(Metadata::string(self.stage.clone())), major, minor]);
        self.module
            .add_named_metadata(SHADER_MODEL_METADATA, vec![model]);

        let signatures = if self.has_signatures {
            let inputs = self.inputs.clone();
            let outputs = self.outputs.clone();
            let inputs = self.list(&inputs);
            let outputs = self.list(&outputs);
            Some(Metadata::Node(
                self.module.add_md_node(vec![inputs, outputs, None]),
            ))
        } else {
            None
        };
        let entry = self.module.add_md_node(vec![
            None,
            Some(Metadata::string(self.entry_name.clone())),
            signatures,
            None,
            None,
        ]);
        self.module
            .add_named_metadata(ENTRY_POINTS_METADATA, vec![entry]);

        let tables = [
            self.srvs.clone(),
            self.uavs.clone(),
            self.cbvs.clone(),
            self.samplers.clone(),
        ];
        if tables.iter().any(|t| !t.is_empty()) {
            let lists = tables.iter().map(|t| self.list(t)).collect();
            let root = self.module.add_md_node(lists);
            self.module.add_named_metadata(RESOURCES_METADATA, vec![root]);
        }
        self.module
    }
}

/// A module with only `dx.shaderModel` and `dx.entryPoints`, plus an empty `main`.
pub fn empty_shader(stage: &str) -> Module {
    with_empty_main(ShaderBuilder::new(stage))
}

/// Finishes `shader` and adds a `main` made of a single `ret void` block.
pub fn with_empty_main(shader: ShaderBuilder) -> Module {
    with_main(shader, |_| Ok(()))
}

/// Finishes `shader` and adds a single-block `main`: `body` fills the block, then
/// `ret void` closes it.
pub fn with_main(
    shader: ShaderBuilder,
    body: impl FnOnce(&mut FunctionBuilder<'_>) -> Result<()>,
) -> Module {
    let mut module = shader.finish();
    let mut f = FunctionBuilder::new(&mut module, "main");
    let entry = f.add_block("entry");
    f.position_at_end(entry);
    body(&mut f).expect("function body");
    f.ret(None).expect("positioned");
    f.finish();
    module
}

// ── dx.op calls ──

fn op_name(op: DxilOp) -> &'static str {
    match op {
        DxilOp::LoadInput => "loadInput",
        DxilOp::StoreOutput => "storeOutput",
        DxilOp::CreateHandle => "createHandle",
        DxilOp::CBufferLoad => "cbufferLoad",
        DxilOp::CBufferLoadLegacy => "cbufferLoadLegacy",
        DxilOp::Sample => "sample",
        DxilOp::SampleBias => "sampleBias",
        DxilOp::SampleLevel => "sampleLevel",
        DxilOp::SampleGrad => "sampleGrad",
        DxilOp::SampleCmp => "sampleCmp",
        DxilOp::SampleCmpLevelZero => "sampleCmpLevelZero",
        DxilOp::TextureLoad => "textureLoad",
        DxilOp::TextureStore => "textureStore",
        DxilOp::BufferLoad => "bufferLoad",
        DxilOp::BufferStore => "bufferStore",
    }
}

/// `call @dx.op.<name>.<overload>(i32 opcode, args...)`.
pub fn dx_op(
    f: &mut FunctionBuilder<'_>,
    op: DxilOp,
    overload: &str,
    ret: TypeId,
    args: &[ValueId],
) -> Result<ValueId> {
    let opcode = f.module().const_i32(op.code() as i32);
    let mut all = vec![opcode];
    all.extend_from_slice(args);
    f.call(ret, &format!("dx.op.{}.{overload}", op_name(op)), all)
}

pub fn load_input(
    f: &mut FunctionBuilder<'_>,
    ty: TypeId,
    element: u32,
    row: u32,
    col: u8,
) -> Result<ValueId> {
    let m = f.module();
    let i32_ty = m.int_type(32);
    let args = vec![
        m.const_i32(element as i32),
        m.const_i32(row as i32),
        m.const_i8(col),
        m.undef(i32_ty),
    ];
    dx_op(f, DxilOp::LoadInput, "f32", ty, &args)
}

pub fn store_output(
    f: &mut FunctionBuilder<'_>,
    element: u32,
    row: u32,
    col: u8,
    value: ValueId,
) -> Result<ValueId> {
    let m = f.module();
    let void = m.void_type();
    let args = vec![
        m.const_i32(element as i32),
        m.const_i32(row as i32),
        m.const_i8(col),
        value,
    ];
    dx_op(f, DxilOp::StoreOutput, "f32", void, &args)
}

pub fn handle_type(m: &mut Module) -> TypeId {
    let i8_ty = m.int_type(8);
    let ptr = m.pointer_type(i8_ty);
    m.struct_type(Some("dx.types.Handle"), vec![ptr])
}

pub fn create_handle(
    f: &mut FunctionBuilder<'_>,
    class: ResourceClass,
    range: u32,
) -> Result<ValueId> {
    let m = f.module();
    let handle = handle_type(m);
    let args = vec![
        m.const_i8(class.code() as u8),
        m.const_i32(range as i32),
        m.const_i32(0),
        m.const_bool(false),
    ];
    dx_op(f, DxilOp::CreateHandle, "", handle, &args)
}

/// `%dx.types.CBufRet.f32` or `.i32`: four lanes of one 16-byte slot.
pub fn cbuffer_load_legacy(
    f: &mut FunctionBuilder<'_>,
    handle: ValueId,
    slot: u32,
    lane: TypeId,
) -> Result<ValueId> {
    let m = f.module();
    let ret = m.struct_type(Some("dx.types.CBufRet"), vec![lane; 4]);
    let slot = m.const_i32(slot as i32);
    dx_op(f, DxilOp::CBufferLoadLegacy, "f32", ret, &[handle, slot])
}

/// `%dx.types.ResRet.f32`: four float lanes and a residency status.
pub fn res_ret_f32(m: &mut Module) -> TypeId {
    let float = m.float_type();
    let status = m.int_type(32);
    m.struct_type(
        Some("dx.types.ResRet.f32"),
        vec![float, float, float, float, status],
    )
}

/// Operands of a sampling call; anything left out is passed as undef.
#[derive(Debug, Clone, Default)]
pub struct SampleArgs {
    pub coords: Vec<ValueId>,
    pub offsets: Vec<Option<i32>>,
    /// Bias, LOD or depth reference, depending on the opcode.
    pub aux: Option<ValueId>,
    pub clamp: Option<ValueId>,
}

impl SampleArgs {
    pub fn at(coords: Vec<ValueId>) -> Self {
        Self {
            coords,
            ..Self::default()
        }
    }
}

pub fn sample(
    f: &mut FunctionBuilder<'_>,
    op: DxilOp,
    image: ValueId,
    sampler: ValueId,
    sample_args: &SampleArgs,
) -> Result<ValueId> {
    let m = f.module();
    let ret = res_ret_f32(m);
    let float = m.float_type();
    let int = m.int_type(32);
    let undef_float = m.undef(float);
    let undef_int = m.undef(int);

    let mut args = vec![image, sampler];
    for i in 0..4 {
        args.push(sample_args.coords.get(i).copied().unwrap_or(undef_float));
    }
    for i in 0..3 {
        let offset = match sample_args.offsets.get(i).copied().flatten() {
            Some(offset) => m.const_i32(offset),
            None => undef_int,
        };
        args.push(offset);
    }
    let aux = sample_args.aux.unwrap_or(undef_float);
    let clamp = sample_args.clamp.unwrap_or(undef_float);
    match op {
        DxilOp::Sample => args.push(clamp),
        DxilOp::SampleBias | DxilOp::SampleCmp => args.extend([aux, clamp]),
        _ => args.push(aux),
    }
    dx_op(f, op, "f32", ret, &args)
}

// ── Conversion and inspection ──

pub fn convert_default(module: &Module) -> Result<ConvertedFunction> {
    convert(module, &ConvertOptions::default())
}

pub fn convert_strict(module: &Module) -> Result<ConvertedFunction> {
    convert(
        module,
        &ConvertOptions {
            deny_unsupported: true,
            ..ConvertOptions::default()
        },
    )
}

/// Every lowered operation, node by node in visit order.
pub fn operations(converted: &ConvertedFunction) -> Vec<&Operation> {
    converted
        .visit_order
        .iter()
        .flat_map(|node| converted.node_pool[*node].ir.operations.iter())
        .collect()
}

pub fn node_by_name(converted: &ConvertedFunction, name: &str) -> Option<NodeId> {
    converted
        .node_pool
        .iter()
        .find(|(_, node)| node.name == name)
        .map(|(id, _)| id)
}

pub fn count_op(ops: &[&Operation], op: Op) -> usize {
    ops.iter().filter(|o| o.op == op).count()
}

pub fn has_op(ops: &[&Operation], op: Op) -> bool {
    ops.iter().any(|o| o.op == op)
}

pub fn find_op<'a>(ops: &[&'a Operation], op: Op) -> Option<&'a Operation> {
    ops.iter().find(|o| o.op == op).copied()
}

/// First literal operand of `decoration` on `target` (a location, binding, stride...).
pub fn decoration_literal(module: &SpirvModule, target: Word, decoration: Decoration) -> Option<u32> {
    match module.find_decoration(target, decoration)? {
        [dr::Operand::LiteralBit32(value), ..] => Some(*value),
        _ => None,
    }
}

pub fn has_decoration(module: &SpirvModule, target: Word, decoration: Decoration) -> bool {
    module.find_decoration(target, decoration).is_some()
}

/// Debug name given to `target` with `OpName`.
pub fn debug_name(module: &SpirvModule, target: Word) -> Option<&str> {
    module
        .module()
        .debug_names
        .iter()
        .find_map(|inst| match inst.operands.as_slice() {
            [dr::Operand::IdRef(id), dr::Operand::LiteralString(name)] if *id == target => {
                Some(name.as_str())
            }
            _ => None,
        })
}

/// Pattern matching for operation fields
#[derive(Debug, Clone)]
pub enum Pat<T> {
    /// Match any value
    Any,
    /// Match exact value
    Exact(T),
    /// Match if value satisfies predicate
    Predicate(fn(&T) -> bool),
}

impl<T: PartialEq> Pat<T> {
    /// Check if a value matches this pattern
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Pat::Any => true,
            Pat::Exact(expected) => value == expected,
            Pat::Predicate(pred) => pred(value),
        }
    }
}

/// Pattern for one operation: its opcode and its argument list.
#[derive(Debug, Clone)]
pub struct OpPattern {
    pub op: Op,
    pub arguments: Pat<Vec<Word>>,
}

impl OpPattern {
    pub fn op(op: Op) -> Self {
        Self {
            op,
            arguments: Pat::Any,
        }
    }

    pub fn matches(&self, operation: &Operation) -> bool {
        operation.op == self.op && self.arguments.matches(&operation.arguments)
    }
}

/// Index of the first run of operations matching `pattern` in order.
pub fn find_pattern(ops: &[&Operation], pattern: &[OpPattern]) -> Option<usize> {
    if pattern.is_empty() {
        return Some(0);
    }

    'outer: for start in 0..=ops.len().saturating_sub(pattern.len()) {
        if start + pattern.len() > ops.len() {
            break;
        }
        for (i, pat) in pattern.iter().enumerate() {
            if !pat.matches(ops[start + i]) {
                continue 'outer;
            }
        }
        return Some(start);
    }
    None
}

pub fn assert_has_pattern(ops: &[&Operation], pattern: &[OpPattern]) {
    if find_pattern(ops, pattern).is_none() {
        panic!(
            "Pattern not found in operation sequence.\n\nExpected pattern:\n{}\n\nActual operations:\n{}",
            pattern
                .iter()
                .map(|p| format!("  Op{:?} {:?}", p.op, p.arguments))
                .collect::<Vec<_>>()
                .join("\n"),
            ops.iter()
                .map(|o| format!("  {}", o))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
}
