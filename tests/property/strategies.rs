// Shared generators.

use ffi_bridge::{FieldSpec, PrimType};
use proptest::prelude::*;

pub fn scalar_type() -> impl Strategy<Value = PrimType> {
    prop::sample::select(vec![
        PrimType::Int8,
        PrimType::UInt8,
        PrimType::Int16,
        PrimType::UInt16,
        PrimType::Int32,
        PrimType::UInt32,
        PrimType::Int64,
        PrimType::UInt64,
        PrimType::Float32,
        PrimType::Float64,
        PrimType::Pointer,
    ])
}

pub fn integer_type() -> impl Strategy<Value = PrimType> {
    prop::sample::select(vec![
        PrimType::Int8,
        PrimType::UInt8,
        PrimType::Int16,
        PrimType::UInt16,
        PrimType::Int32,
        PrimType::UInt32,
        PrimType::Int64,
    ])
}

/// Flat field lists with unique names and optional small dimensions.
pub fn field_specs() -> impl Strategy<Value = Vec<FieldSpec>> {
    prop::collection::vec((scalar_type(), prop::option::of(1u64..5)), 1..8).prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (ty, dim))| {
                let spec = FieldSpec::new(format!("f{}", i), ty);
                match dim {
                    Some(d) => spec.array(d),
                    None => spec,
                }
            })
            .collect()
    })
}
