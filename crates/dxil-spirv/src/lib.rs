#![allow(
    clippy::cast_possible_truncation, // ids, literals and table indices are u32 throughout SPIR-V
    clippy::module_name_repetitions,  // `dxil::DxilOp`, `spirv::SpirvModule` read better qualified
    clippy::missing_errors_doc        // every fallible function returns the crate `Error`
)]

pub mod cfg;
pub mod convert;
pub mod dxil;
pub mod error;
pub mod spirv;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use convert::{ConvertOptions, ConvertedFunction, Diagnostic, convert};
pub use error::{Error, Result};
