use rspirv::spirv::{Dim, ImageFormat, StorageClass, Word};

/// Shape of an `OpTypeImage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageType {
    pub sampled_type: Word,
    pub dim: Dim,
    pub depth: bool,
    pub arrayed: bool,
    pub multisampled: bool,
    /// 1 = used with a sampler, 2 = storage image.
    pub sampled: u32,
    pub format: ImageFormat,
}

impl ImageType {
    /// Number of coordinate components a sampling instruction needs for this image.
    pub fn coordinate_count(&self) -> u32 {
        let base = match self.dim {
            Dim::Dim1D | Dim::DimBuffer => 1,
            Dim::Dim2D | Dim::DimRect | Dim::DimSubpassData => 2,
            Dim::Dim3D | Dim::DimCube => 3,
            _ => 2,
        };
        base + u32::from(self.arrayed)
    }

    /// Number of texel-offset components (offsets never cover the array layer).
    pub fn offset_count(&self) -> u32 {
        self.coordinate_count() - u32::from(self.arrayed)
    }
}

/// Declared SPIR-V type, recorded so lowering can ask about shapes after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpirvType {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: Word, count: u32 },
    Matrix { column: Word, count: u32 },
    /// `length` is the id of a constant.
    Array { element: Word, length: Word },
    Struct { members: Vec<Word> },
    Pointer { storage: StorageClass, pointee: Word },
    Image(ImageType),
    Sampler,
    SampledImage { image: Word },
}

impl SpirvType {
    pub fn is_float(&self) -> bool {
        matches!(self, SpirvType::Float { .. })
    }
}
