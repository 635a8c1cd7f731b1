// DXIL enumerations and well-known names, as encoded in metadata and `dx.op` calls.

use std::fmt;

/// Callee-name prefix of every DXIL intrinsic (`dx.op.sample.f32`, `dx.op.loadInput.i32`, ...).
pub const INTRINSIC_PREFIX: &str = "dx.op";

pub const ENTRY_POINTS_METADATA: &str = "dx.entryPoints";
pub const RESOURCES_METADATA: &str = "dx.resources";
pub const SHADER_MODEL_METADATA: &str = "dx.shaderModel";

/// `dx.op` opcode, carried as the first constant argument of an intrinsic call.
///
/// Only the families this crate lowers (plus a few neighbours, for readable diagnostics)
/// are named; every other opcode is reported by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxilOp {
    LoadInput,
    StoreOutput,
    CreateHandle,
    CBufferLoad,
    CBufferLoadLegacy,
    Sample,
    SampleBias,
    SampleLevel,
    SampleGrad,
    SampleCmp,
    SampleCmpLevelZero,
    TextureLoad,
    TextureStore,
    BufferLoad,
    BufferStore,
}

impl DxilOp {
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            4 => DxilOp::LoadInput,
            5 => DxilOp::StoreOutput,
            57 => DxilOp::CreateHandle,
            58 => DxilOp::CBufferLoad,
            59 => DxilOp::CBufferLoadLegacy,
            60 => DxilOp::Sample,
            61 => DxilOp::SampleBias,
            62 => DxilOp::SampleLevel,
            63 => DxilOp::SampleGrad,
            64 => DxilOp::SampleCmp,
            65 => DxilOp::SampleCmpLevelZero,
            66 => DxilOp::TextureLoad,
            67 => DxilOp::TextureStore,
            68 => DxilOp::BufferLoad,
            69 => DxilOp::BufferStore,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        match self {
            DxilOp::LoadInput => 4,
            DxilOp::StoreOutput => 5,
            DxilOp::CreateHandle => 57,
            DxilOp::CBufferLoad => 58,
            DxilOp::CBufferLoadLegacy => 59,
            DxilOp::Sample => 60,
            DxilOp::SampleBias => 61,
            DxilOp::SampleLevel => 62,
            DxilOp::SampleGrad => 63,
            DxilOp::SampleCmp => 64,
            DxilOp::SampleCmpLevelZero => 65,
            DxilOp::TextureLoad => 66,
            DxilOp::TextureStore => 67,
            DxilOp::BufferLoad => 68,
            DxilOp::BufferStore => 69,
        }
    }

    pub fn is_comparison_sample(self) -> bool {
        matches!(self, DxilOp::SampleCmp | DxilOp::SampleCmpLevelZero)
    }
}

/// Resource class operand of `createHandle`, also the slot order inside `dx.resources`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceClass {
    Srv,
    Uav,
    Cbv,
    Sampler,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 4] = [
        ResourceClass::Srv,
        ResourceClass::Uav,
        ResourceClass::Cbv,
        ResourceClass::Sampler,
    ];

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(ResourceClass::Srv),
            1 => Some(ResourceClass::Uav),
            2 => Some(ResourceClass::Cbv),
            3 => Some(ResourceClass::Sampler),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            ResourceClass::Srv => 0,
            ResourceClass::Uav => 1,
            ResourceClass::Cbv => 2,
            ResourceClass::Sampler => 3,
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceClass::Srv => "SRV",
            ResourceClass::Uav => "UAV",
            ResourceClass::Cbv => "CBV",
            ResourceClass::Sampler => "Sampler",
        })
    }
}

/// Resource shape code (operand 6 of SRV/UAV entries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Invalid,
    Texture1D,
    Texture2D,
    Texture2DMS,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    Texture2DMSArray,
    TextureCubeArray,
    TypedBuffer,
    RawBuffer,
    StructuredBuffer,
    CBuffer,
    Sampler,
    TBuffer,
    RTAccelerationStructure,
    FeedbackTexture2D,
    FeedbackTexture2DArray,
}

impl ResourceKind {
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => ResourceKind::Invalid,
            1 => ResourceKind::Texture1D,
            2 => ResourceKind::Texture2D,
            3 => ResourceKind::Texture2DMS,
            4 => ResourceKind::Texture3D,
            5 => ResourceKind::TextureCube,
            6 => ResourceKind::Texture1DArray,
            7 => ResourceKind::Texture2DArray,
            8 => ResourceKind::Texture2DMSArray,
            9 => ResourceKind::TextureCubeArray,
            10 => ResourceKind::TypedBuffer,
            11 => ResourceKind::RawBuffer,
            12 => ResourceKind::StructuredBuffer,
            13 => ResourceKind::CBuffer,
            14 => ResourceKind::Sampler,
            15 => ResourceKind::TBuffer,
            16 => ResourceKind::RTAccelerationStructure,
            17 => ResourceKind::FeedbackTexture2D,
            18 => ResourceKind::FeedbackTexture2DArray,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        match self {
            ResourceKind::Invalid => 0,
            ResourceKind::Texture1D => 1,
            ResourceKind::Texture2D => 2,
            ResourceKind::Texture2DMS => 3,
            ResourceKind::Texture3D => 4,
            ResourceKind::TextureCube => 5,
            ResourceKind::Texture1DArray => 6,
            ResourceKind::Texture2DArray => 7,
            ResourceKind::Texture2DMSArray => 8,
            ResourceKind::TextureCubeArray => 9,
            ResourceKind::TypedBuffer => 10,
            ResourceKind::RawBuffer => 11,
            ResourceKind::StructuredBuffer => 12,
            ResourceKind::CBuffer => 13,
            ResourceKind::Sampler => 14,
            ResourceKind::TBuffer => 15,
            ResourceKind::RTAccelerationStructure => 16,
            ResourceKind::FeedbackTexture2D => 17,
            ResourceKind::FeedbackTexture2DArray => 18,
        }
    }

    pub fn is_arrayed(self) -> bool {
        matches!(
            self,
            ResourceKind::Texture1DArray
                | ResourceKind::Texture2DArray
                | ResourceKind::Texture2DMSArray
                | ResourceKind::TextureCubeArray
        )
    }

    pub fn is_multisampled(self) -> bool {
        matches!(
            self,
            ResourceKind::Texture2DMS | ResourceKind::Texture2DMSArray
        )
    }
}

/// Component type code used by signature elements and typed resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I1,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F16,
    F32,
    F64,
    SNormF16,
    UNormF16,
    SNormF32,
    UNormF32,
    SNormF64,
    UNormF64,
}

impl ComponentType {
    /// Code 0 is `Invalid` and deliberately has no variant.
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            1 => ComponentType::I1,
            2 => ComponentType::I16,
            3 => ComponentType::U16,
            4 => ComponentType::I32,
            5 => ComponentType::U32,
            6 => ComponentType::I64,
            7 => ComponentType::U64,
            8 => ComponentType::F16,
            9 => ComponentType::F32,
            10 => ComponentType::F64,
            11 => ComponentType::SNormF16,
            12 => ComponentType::UNormF16,
            13 => ComponentType::SNormF32,
            14 => ComponentType::UNormF32,
            15 => ComponentType::SNormF64,
            16 => ComponentType::UNormF64,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        match self {
            ComponentType::I1 => 1,
            ComponentType::I16 => 2,
            ComponentType::U16 => 3,
            ComponentType::I32 => 4,
            ComponentType::U32 => 5,
            ComponentType::I64 => 6,
            ComponentType::U64 => 7,
            ComponentType::F16 => 8,
            ComponentType::F32 => 9,
            ComponentType::F64 => 10,
            ComponentType::SNormF16 => 11,
            ComponentType::UNormF16 => 12,
            ComponentType::SNormF32 => 13,
            ComponentType::UNormF32 => 14,
            ComponentType::SNormF64 => 15,
            ComponentType::UNormF64 => 16,
        }
    }
}

/// System-value semantic of a signature element (operand 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    User,
    VertexId,
    InstanceId,
    Position,
    RenderTargetArrayIndex,
    ViewportArrayIndex,
    ClipDistance,
    CullDistance,
    OutputControlPointId,
    DomainLocation,
    PrimitiveId,
    GsInstanceId,
    SampleIndex,
    IsFrontFace,
    Coverage,
    InnerCoverage,
    Target,
    Depth,
    DepthLessEqual,
    DepthGreaterEqual,
    StencilRef,
    DispatchThreadId,
    GroupId,
    GroupIndex,
    GroupThreadId,
    TessFactor,
    InsideTessFactor,
    ViewId,
    Barycentrics,
    ShadingRate,
    CullPrimitive,
    Invalid,
}

impl Semantic {
    const TABLE: [Semantic; 32] = [
        Semantic::User,
        Semantic::VertexId,
        Semantic::InstanceId,
        Semantic::Position,
        Semantic::RenderTargetArrayIndex,
        Semantic::ViewportArrayIndex,
        Semantic::ClipDistance,
        Semantic::CullDistance,
        Semantic::OutputControlPointId,
        Semantic::DomainLocation,
        Semantic::PrimitiveId,
        Semantic::GsInstanceId,
        Semantic::SampleIndex,
        Semantic::IsFrontFace,
        Semantic::Coverage,
        Semantic::InnerCoverage,
        Semantic::Target,
        Semantic::Depth,
        Semantic::DepthLessEqual,
        Semantic::DepthGreaterEqual,
        Semantic::StencilRef,
        Semantic::DispatchThreadId,
        Semantic::GroupId,
        Semantic::GroupIndex,
        Semantic::GroupThreadId,
        Semantic::TessFactor,
        Semantic::InsideTessFactor,
        Semantic::ViewId,
        Semantic::Barycentrics,
        Semantic::ShadingRate,
        Semantic::CullPrimitive,
        Semantic::Invalid,
    ];

    /// Out-of-range codes collapse to [`Semantic::Invalid`].
    pub fn from_code(code: u64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::TABLE.get(idx).copied())
            .unwrap_or(Semantic::Invalid)
    }

    pub fn code(self) -> u32 {
        Self::TABLE
            .iter()
            .position(|s| *s == self)
            .map_or(31, |idx| idx as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureDirection {
    Input,
    Output,
}

impl fmt::Display for SignatureDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignatureDirection::Input => "input",
            SignatureDirection::Output => "output",
        })
    }
}
