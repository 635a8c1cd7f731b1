// Module-level half of the SPIR-V builder, wrapping `rspirv::dr::Builder` with shape
// records and constant caches: ids, types, constants, variables, decorations and the
// entry-point interface. Function bodies are not built here; lowering produces
// per-node operation lists instead (see `cfg`).

#![allow(clippy::cast_possible_truncation)]

mod types;

use std::collections::HashMap;
use std::fmt;

use rspirv::dr::{self, Builder};
use rspirv::spirv::{
    AddressingModel, Capability, Decoration, ExecutionModel, MemoryModel, Op, StorageClass, Word,
};

pub use types::{ImageType, SpirvType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ConstKey {
    Bits32(Word, u32),
    Bits64(Word, u64),
    Bool(bool),
    Undef(Word),
}

pub struct SpirvModule {
    builder: Builder,
    types: HashMap<Word, SpirvType>,
    constants: HashMap<ConstKey, Word>,
    /// Type of every id that has one (variables, constants, lowered values).
    id_types: HashMap<Word, Word>,
    capabilities: Vec<Capability>,
    interface: Vec<Word>,
}

impl fmt::Debug for SpirvModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpirvModule")
            .field("module", self.builder.module_ref())
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}

impl Default for SpirvModule {
    fn default() -> Self {
        Self::new()
    }
}

impl SpirvModule {
    pub fn new() -> Self {
        let mut builder = Builder::new();
        builder.memory_model(AddressingModel::Logical, MemoryModel::GLSL450);
        let mut this = Self {
            builder,
            types: HashMap::new(),
            constants: HashMap::new(),
            id_types: HashMap::new(),
            capabilities: Vec::new(),
            interface: Vec::new(),
        };
        this.capability(Capability::Shader);
        this
    }

    pub fn alloc_id(&mut self) -> Word {
        self.builder.id()
    }

    pub fn module(&self) -> &dr::Module {
        self.builder.module_ref()
    }

    // ── Types ──

    /// Declares `ty` through the builder, which reuses an identical declaration unless
    /// `ty` is a struct, and records its shape for later queries.
    fn declare_type(&mut self, ty: SpirvType) -> Word {
        let b = &mut self.builder;
        let id = match &ty {
            SpirvType::Void => b.type_void(),
            SpirvType::Bool => b.type_bool(),
            SpirvType::Int { width, signed } => b.type_int(*width, u32::from(*signed)),
            SpirvType::Float { width } => b.type_float(*width),
            SpirvType::Vector { component, count } => b.type_vector(*component, *count),
            SpirvType::Matrix { column, count } => b.type_matrix(*column, *count),
            SpirvType::Array { element, length } => b.type_array(*element, *length),
            SpirvType::Struct { members } => {
                let id = b.id();
                b.type_struct_id(Some(id), members.iter().copied())
            }
            SpirvType::Pointer { storage, pointee } => b.type_pointer(None, *storage, *pointee),
            SpirvType::Image(image) => b.type_image(
                image.sampled_type,
                image.dim,
                u32::from(image.depth),
                u32::from(image.arrayed),
                u32::from(image.multisampled),
                image.sampled,
                image.format,
                None,
            ),
            SpirvType::Sampler => b.type_sampler(),
            SpirvType::SampledImage { image } => b.type_sampled_image(*image),
        };
        self.types.insert(id, ty);
        id
    }

    pub fn type_void(&mut self) -> Word {
        self.declare_type(SpirvType::Void)
    }

    pub fn type_bool(&mut self) -> Word {
        self.declare_type(SpirvType::Bool)
    }

    pub fn type_int(&mut self, width: u32, signed: bool) -> Word {
        self.declare_type(SpirvType::Int { width, signed })
    }

    pub fn type_uint(&mut self, width: u32) -> Word {
        self.type_int(width, false)
    }

    pub fn type_float(&mut self, width: u32) -> Word {
        self.declare_type(SpirvType::Float { width })
    }

    pub fn type_vector(&mut self, component: Word, count: u32) -> Word {
        self.declare_type(SpirvType::Vector { component, count })
    }

    pub fn type_matrix(&mut self, column: Word, count: u32) -> Word {
        self.declare_type(SpirvType::Matrix { column, count })
    }

    /// Array type whose length is a 32-bit unsigned constant.
    pub fn type_array(&mut self, element: Word, len: u32) -> Word {
        let length = self.constant_u32(len);
        self.declare_type(SpirvType::Array { element, length })
    }

    /// Always a fresh declaration, so each struct can carry its own decorations.
    pub fn type_struct(&mut self, members: Vec<Word>) -> Word {
        self.declare_type(SpirvType::Struct { members })
    }

    pub fn type_pointer(&mut self, storage: StorageClass, pointee: Word) -> Word {
        self.declare_type(SpirvType::Pointer { storage, pointee })
    }

    pub fn type_image(&mut self, image: ImageType) -> Word {
        self.declare_type(SpirvType::Image(image))
    }

    pub fn type_sampler(&mut self) -> Word {
        self.declare_type(SpirvType::Sampler)
    }

    pub fn type_sampled_image(&mut self, image: Word) -> Word {
        self.declare_type(SpirvType::SampledImage { image })
    }

    // ── Introspection ──

    pub fn get_type(&self, id: Word) -> Option<&SpirvType> {
        self.types.get(&id)
    }

    pub fn pointee(&self, pointer_type: Word) -> Option<(StorageClass, Word)> {
        match self.types.get(&pointer_type)? {
            SpirvType::Pointer { storage, pointee } => Some((*storage, *pointee)),
            _ => None,
        }
    }

    pub fn image(&self, image_type: Word) -> Option<&ImageType> {
        match self.types.get(&image_type)? {
            SpirvType::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn set_id_type(&mut self, id: Word, ty: Word) {
        self.id_types.insert(id, ty);
    }

    pub fn id_type(&self, id: Word) -> Option<Word> {
        self.id_types.get(&id).copied()
    }

    // ── Constants ──

    fn cached_constant(
        &mut self,
        key: ConstKey,
        ty: Word,
        emit: impl FnOnce(&mut Builder) -> Word,
    ) -> Word {
        if let Some(id) = self.constants.get(&key) {
            return *id;
        }
        let id = emit(&mut self.builder);
        self.constants.insert(key, id);
        self.id_types.insert(id, ty);
        id
    }

    /// 32-bit constant of type `ty`, from its raw bit pattern.
    pub fn constant_bits32(&mut self, ty: Word, bits: u32) -> Word {
        self.cached_constant(ConstKey::Bits32(ty, bits), ty, |b| {
            b.constant_bit32(ty, bits)
        })
    }

    pub fn constant_bits64(&mut self, ty: Word, bits: u64) -> Word {
        self.cached_constant(ConstKey::Bits64(ty, bits), ty, |b| {
            b.constant_bit64(ty, bits)
        })
    }

    pub fn constant_u32(&mut self, value: u32) -> Word {
        let ty = self.type_uint(32);
        self.constant_bits32(ty, value)
    }

    pub fn constant_i32(&mut self, value: i32) -> Word {
        let ty = self.type_int(32, true);
        self.constant_bits32(ty, value as u32)
    }

    pub fn constant_f32(&mut self, value: f32) -> Word {
        let ty = self.type_float(32);
        self.constant_bits32(ty, value.to_bits())
    }

    pub fn constant_f64(&mut self, value: f64) -> Word {
        let ty = self.type_float(64);
        self.constant_bits64(ty, value.to_bits())
    }

    pub fn constant_bool(&mut self, value: bool) -> Word {
        let ty = self.type_bool();
        self.cached_constant(ConstKey::Bool(value), ty, |b| {
            if value {
                b.constant_true(ty)
            } else {
                b.constant_false(ty)
            }
        })
    }

    pub fn undef(&mut self, ty: Word) -> Word {
        self.cached_constant(ConstKey::Undef(ty), ty, |b| b.undef(ty, None))
    }

    // ── Variables, decorations, names ──

    /// Module-level `OpVariable` of the given pointer type.
    pub fn variable(&mut self, pointer_type: Word, storage: StorageClass) -> Word {
        let id = self.builder.variable(pointer_type, None, storage, None);
        self.id_types.insert(id, pointer_type);
        id
    }

    pub fn decorate(&mut self, target: Word, decoration: Decoration, extra: Vec<dr::Operand>) {
        self.builder.decorate(target, decoration, extra);
    }

    pub fn member_decorate(
        &mut self,
        structure: Word,
        member: u32,
        decoration: Decoration,
        extra: Vec<dr::Operand>,
    ) {
        self.builder
            .member_decorate(structure, member, decoration, extra);
    }

    /// Operands following the decoration enum, if `target` carries `decoration`.
    pub fn find_decoration(&self, target: Word, decoration: Decoration) -> Option<&[dr::Operand]> {
        self.module().annotations.iter().find_map(|inst| {
            if inst.class.opcode != Op::Decorate {
                return None;
            }
            match inst.operands.as_slice() {
                [dr::Operand::IdRef(id), dr::Operand::Decoration(d), rest @ ..]
                    if *id == target && *d == decoration =>
                {
                    Some(rest)
                }
                _ => None,
            }
        })
    }

    pub fn name(&mut self, target: Word, name: &str) {
        if !name.is_empty() {
            self.builder.name(target, name);
        }
    }

    pub fn capability(&mut self, capability: Capability) {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
            self.builder.capability(capability);
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn add_interface(&mut self, variable: Word) {
        if !self.interface.contains(&variable) {
            self.interface.push(variable);
        }
    }

    pub fn interface(&self) -> &[Word] {
        &self.interface
    }

    /// Emits `OpEntryPoint` (when a stage is known) and hands over the module with its
    /// header bound set.
    pub fn finish(
        mut self,
        execution_model: Option<ExecutionModel>,
        function: Word,
        name: &str,
    ) -> dr::Module {
        if let Some(model) = execution_model {
            self.builder
                .entry_point(model, function, name, &self.interface);
        }
        self.builder.module()
    }
}
