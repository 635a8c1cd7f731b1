#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::collections::{BTreeMap, HashMap};

use super::{Function, MdNode, MdNodeId, Metadata, Type, TypeId, ValueData, ValueId, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ConstKey {
    Int(TypeId, u64),
    Float(TypeId, u64),
    Undef(TypeId),
}

/// Decoded DXIL module: the object model the bitcode decoder hands to the converter.
///
/// Types and constants are uniqued the way LLVM uniques them, so two distinct
/// constant [`ValueId`]s never describe the same constant.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Module {
    pub types: Vec<Type>,
    pub values: Vec<ValueData>,
    pub metadata: Vec<MdNode>,
    pub named_metadata: BTreeMap<String, Vec<MdNodeId>>,
    pub functions: Vec<Function>,
    #[cfg_attr(feature = "serde", serde(skip))]
    constant_cache: HashMap<ConstKey, ValueId>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookup ──

    pub fn get_type(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize)
    }

    pub fn value(&self, id: ValueId) -> Option<&ValueData> {
        self.values.get(id.0 as usize)
    }

    pub fn value_type(&self, id: ValueId) -> Option<&Type> {
        self.value(id).and_then(|v| self.get_type(v.ty))
    }

    pub fn md_node(&self, id: MdNodeId) -> Option<&MdNode> {
        self.metadata.get(id.0 as usize)
    }

    pub fn named_metadata(&self, name: &str) -> Option<&[MdNodeId]> {
        self.named_metadata.get(name).map(Vec::as_slice)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Zero-extended value of an integer constant.
    pub fn const_int_value(&self, id: ValueId) -> Option<u64> {
        self.value(id).and_then(ValueData::as_const_int)
    }

    /// Sign-extended value of an integer constant, using the constant's own bit width.
    pub fn const_sext_value(&self, id: ValueId) -> Option<i64> {
        let raw = self.const_int_value(id)?;
        let width = self.value_type(id)?.integer_width()?;
        if width == 0 || width >= 64 {
            return Some(raw as i64);
        }
        let shift = 64 - width;
        Some(((raw << shift) as i64) >> shift)
    }

    pub fn is_undef(&self, id: ValueId) -> bool {
        self.value(id).is_some_and(ValueData::is_undef)
    }

    // ── Types ──

    pub fn intern_type(&mut self, ty: Type) -> TypeId {
        if let Some(idx) = self.types.iter().position(|t| *t == ty) {
            return TypeId(idx as u32);
        }
        self.types.push(ty);
        TypeId(self.types.len() as u32 - 1)
    }

    pub fn void_type(&mut self) -> TypeId {
        self.intern_type(Type::Void)
    }

    pub fn int_type(&mut self, bits: u32) -> TypeId {
        self.intern_type(Type::Integer(bits))
    }

    pub fn half_type(&mut self) -> TypeId {
        self.intern_type(Type::Half)
    }

    pub fn float_type(&mut self) -> TypeId {
        self.intern_type(Type::Float)
    }

    pub fn double_type(&mut self) -> TypeId {
        self.intern_type(Type::Double)
    }

    pub fn pointer_type(&mut self, pointee: TypeId) -> TypeId {
        self.intern_type(Type::Pointer(pointee))
    }

    pub fn vector_type(&mut self, element: TypeId, len: u32) -> TypeId {
        self.intern_type(Type::Vector { element, len })
    }

    pub fn array_type(&mut self, element: TypeId, len: u64) -> TypeId {
        self.intern_type(Type::Array { element, len })
    }

    pub fn struct_type(&mut self, name: Option<&str>, fields: Vec<TypeId>) -> TypeId {
        self.intern_type(Type::Struct {
            name: name.map(str::to_owned),
            fields,
        })
    }

    // ── Values ──

    pub fn add_value(&mut self, data: ValueData) -> ValueId {
        self.values.push(data);
        ValueId(self.values.len() as u32 - 1)
    }

    fn cached_constant(&mut self, key: ConstKey, data: ValueData) -> ValueId {
        if let Some(id) = self.constant_cache.get(&key) {
            return *id;
        }
        let id = self.add_value(data);
        self.constant_cache.insert(key, id);
        id
    }

    /// Integer constant of type `ty`; `value` is truncated to the type's width.
    pub fn const_int(&mut self, ty: TypeId, value: u64) -> ValueId {
        let width = self
            .get_type(ty)
            .and_then(Type::integer_width)
            .unwrap_or(64);
        let value = if width >= 64 {
            value
        } else {
            value & ((1u64 << width) - 1)
        };
        self.cached_constant(
            ConstKey::Int(ty, value),
            ValueData {
                ty,
                kind: ValueKind::ConstInt(value),
                name: None,
            },
        )
    }

    pub fn const_i32(&mut self, value: i32) -> ValueId {
        let ty = self.int_type(32);
        self.const_int(ty, u64::from(value as u32))
    }

    pub fn const_i8(&mut self, value: u8) -> ValueId {
        let ty = self.int_type(8);
        self.const_int(ty, u64::from(value))
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        let ty = self.int_type(1);
        self.const_int(ty, u64::from(value))
    }

    pub fn const_float(&mut self, ty: TypeId, value: f64) -> ValueId {
        self.cached_constant(
            ConstKey::Float(ty, value.to_bits()),
            ValueData {
                ty,
                kind: ValueKind::ConstFloat(value),
                name: None,
            },
        )
    }

    pub fn const_f32(&mut self, value: f32) -> ValueId {
        let ty = self.float_type();
        self.const_float(ty, f64::from(value))
    }

    pub fn const_f64(&mut self, value: f64) -> ValueId {
        let ty = self.double_type();
        self.const_float(ty, value)
    }

    pub fn undef(&mut self, ty: TypeId) -> ValueId {
        self.cached_constant(
            ConstKey::Undef(ty),
            ValueData {
                ty,
                kind: ValueKind::Undef,
                name: None,
            },
        )
    }

    pub fn global(&mut self, ty: TypeId, name: &str) -> ValueId {
        self.add_value(ValueData {
            ty,
            kind: ValueKind::Global(name.to_owned()),
            name: Some(name.to_owned()),
        })
    }

    // ── Metadata ──

    pub fn add_md_node(&mut self, operands: Vec<Option<Metadata>>) -> MdNodeId {
        self.metadata.push(MdNode { operands });
        MdNodeId(self.metadata.len() as u32 - 1)
    }

    /// Node where every operand is present.
    pub fn add_md_tuple(&mut self, operands: Vec<Metadata>) -> MdNodeId {
        self.add_md_node(operands.into_iter().map(Some).collect())
    }

    pub fn add_named_metadata(&mut self, name: &str, nodes: Vec<MdNodeId>) {
        self.named_metadata
            .entry(name.to_owned())
            .or_default()
            .extend(nodes);
    }

    // ── Functions ──

    pub fn add_function(&mut self, function: Function) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }
}
