//! Resource binder tests
//!
//! Covers descriptor variable declaration for SRVs, CBVs and samplers, the
//! per-class index tables, and the handling of UAVs and absent tables.

use dxil_spirv::dxil::{ComponentType, ResourceClass, ResourceKind};
use dxil_spirv::spirv::{ImageType, SpirvType};
use dxil_spirv::test_harness::*;
use dxil_spirv::{Diagnostic, Error, convert::cbv_vec4_count};
use rspirv::spirv::{Capability, Decoration, Dim, StorageClass};

// ── Declarations ──

#[test]
fn srv_cbv_and_sampler_get_bindings() {
    let mut shader = ShaderBuilder::new("ps");
    shader
        .srv(0, "tex", 1, 3, ResourceKind::Texture2D, ComponentType::F32)
        .cbv(0, "globals", 0, 2, 64)
        .sampler(0, "samp", 2, 5);
    let converted = convert_default(&with_empty_main(shader)).unwrap();
    let module = &converted.module;

    let srv = converted.resources.get(ResourceClass::Srv, 0).unwrap();
    let cbv = converted.resources.get(ResourceClass::Cbv, 0).unwrap();
    let sampler = converted.resources.get(ResourceClass::Sampler, 0).unwrap();

    assert_eq!(decoration_literal(module, srv, Decoration::DescriptorSet), Some(1));
    assert_eq!(decoration_literal(module, srv, Decoration::Binding), Some(3));
    assert_eq!(decoration_literal(module, cbv, Decoration::DescriptorSet), Some(0));
    assert_eq!(decoration_literal(module, cbv, Decoration::Binding), Some(2));
    assert_eq!(decoration_literal(module, sampler, Decoration::DescriptorSet), Some(2));
    assert_eq!(decoration_literal(module, sampler, Decoration::Binding), Some(5));

    assert_eq!(debug_name(module, srv), Some("tex"));
    assert_eq!(debug_name(module, sampler), Some("samp"));
    assert!(converted.diagnostics.is_empty());
}

#[test]
fn srv_declares_sampled_image_of_component_type() {
    let mut shader = ShaderBuilder::new("ps");
    shader.srv(0, "tex", 0, 0, ResourceKind::Texture2DArray, ComponentType::F32);
    let mut converted = convert_default(&with_empty_main(shader)).unwrap();
    let srv = converted.resources.get(ResourceClass::Srv, 0).unwrap();

    let module = &mut converted.module;
    let ptr = module.id_type(srv).unwrap();
    let (storage, image) = module.pointee(ptr).unwrap();
    assert_eq!(storage, StorageClass::UniformConstant);
    let float = module.type_float(32);
    assert_eq!(
        module.image(image).copied().map(|i| (i.sampled_type, i.dim, i.arrayed, i.sampled)),
        Some((float, Dim::Dim2D, true, 1))
    );
}

#[test]
fn untyped_srv_defaults_to_uint() {
    let mut shader = ShaderBuilder::new("ps");
    shader.untyped_srv(0, "buf", 0, 0, ResourceKind::StructuredBuffer);
    let mut converted = convert_default(&with_empty_main(shader)).unwrap();
    let srv = converted.resources.get(ResourceClass::Srv, 0).unwrap();

    let module = &mut converted.module;
    let (_, image) = module.pointee(module.id_type(srv).unwrap()).unwrap();
    let uint = module.type_uint(32);
    assert!(matches!(
        module.get_type(image),
        Some(SpirvType::Image(ImageType {
            dim: Dim::DimBuffer,
            sampled_type,
            ..
        })) if *sampled_type == uint
    ));
    assert!(module.has_capability(Capability::SampledBuffer));
}

#[test]
fn texture_without_element_tag_fails() {
    let mut shader = ShaderBuilder::new("ps");
    shader.untyped_srv(0, "tex", 0, 0, ResourceKind::Texture2D);
    let result = convert_default(&with_empty_main(shader));
    assert!(matches!(
        result,
        Err(Error::MalformedMetadata { index: 8, .. })
    ));
}

#[test]
fn one_dimensional_textures_need_sampled1d() {
    let mut shader = ShaderBuilder::new("ps");
    shader.srv(0, "line", 0, 0, ResourceKind::Texture1D, ComponentType::F32);
    let converted = convert_default(&with_empty_main(shader)).unwrap();
    assert!(converted.module.has_capability(Capability::Sampled1D));
    assert!(!converted.module.has_capability(Capability::ImageMSArray));
}

#[test]
fn cbv_is_strided_vec4_block() {
    let mut shader = ShaderBuilder::new("ps");
    shader.cbv(0, "cb", 0, 0, 20);
    let mut converted = convert_default(&with_empty_main(shader)).unwrap();
    let cbv = converted.resources.get(ResourceClass::Cbv, 0).unwrap();

    let module = &mut converted.module;
    let (storage, block) = module.pointee(module.id_type(cbv).unwrap()).unwrap();
    assert_eq!(storage, StorageClass::Uniform);
    assert!(has_decoration(module, block, Decoration::Block));
    assert_eq!(debug_name(module, block), Some("cb"));

    let Some(SpirvType::Struct { members }) = module.get_type(block).cloned() else {
        panic!("cbuffer block is not a struct");
    };
    assert_eq!(members.len(), 1);
    let array = members[0];
    let two = module.constant_u32(2);
    let float = module.type_float(32);
    let vec4 = module.type_vector(float, 4);
    assert_eq!(
        module.get_type(array),
        Some(&SpirvType::Array {
            element: vec4,
            length: two
        })
    );
    assert_eq!(decoration_literal(module, array, Decoration::ArrayStride), Some(16));
}

#[test]
fn same_sized_cbvs_share_one_stride_decoration() {
    let mut shader = ShaderBuilder::new("ps");
    shader.cbv(0, "a", 0, 0, 32).cbv(1, "b", 0, 1, 32);
    let converted = convert_default(&with_empty_main(shader)).unwrap();

    let strides = converted
        .module
        .module()
        .annotations
        .iter()
        .filter(|inst| {
            inst.operands
                .get(1)
                .is_some_and(|op| *op == rspirv::dr::Operand::Decoration(Decoration::ArrayStride))
        })
        .count();
    assert_eq!(strides, 1);
    assert_ne!(
        converted.resources.get(ResourceClass::Cbv, 0).unwrap(),
        converted.resources.get(ResourceClass::Cbv, 1).unwrap()
    );
}

#[test]
fn cbv_sizes_round_up_to_whole_vec4s() {
    assert_eq!(cbv_vec4_count(1), 1);
    assert_eq!(cbv_vec4_count(16), 1);
    assert_eq!(cbv_vec4_count(20), 2);
    assert_eq!(cbv_vec4_count(48), 3);
}

// ── Tables ──

#[test]
fn tables_grow_to_highest_index() {
    let mut shader = ShaderBuilder::new("ps");
    shader
        .sampler(3, "s3", 0, 3)
        .sampler(1, "s1", 0, 1);
    let converted = convert_default(&with_empty_main(shader)).unwrap();

    assert_eq!(converted.resources.len(ResourceClass::Sampler), 4);
    assert_eq!(converted.resources.sampler[0], None);
    assert!(converted.resources.sampler[1].is_some());
    assert!(converted.resources.sampler[3].is_some());
    assert!(matches!(
        converted.resources.get(ResourceClass::Sampler, 2),
        Err(Error::UndeclaredResource {
            class: ResourceClass::Sampler,
            index: 2
        })
    ));
}

#[test]
fn missing_resource_metadata_declares_nothing() {
    let converted = convert_default(&empty_shader("ps")).unwrap();
    for class in ResourceClass::ALL {
        assert_eq!(converted.resources.len(class), 0);
    }
}

// ── UAVs ──

#[test]
fn uav_is_reported_not_declared() {
    let mut shader = ShaderBuilder::new("cs");
    shader.uav(0, "out", 0, 0);
    let converted = convert_default(&with_empty_main(shader)).unwrap();

    assert_eq!(converted.resources.len(ResourceClass::Uav), 0);
    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::UavNotSupported {
            index: 0,
            name: "out".into()
        }]
    );
}

#[test]
fn uav_fails_in_strict_mode() {
    let mut shader = ShaderBuilder::new("cs");
    shader.uav(0, "out", 0, 0);
    assert!(matches!(
        convert_strict(&with_empty_main(shader)),
        Err(Error::Unsupported(_))
    ));
}
