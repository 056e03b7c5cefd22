//! Layout algorithm: turns a list of field specifications into a schema.

use super::{AbiType, FieldSchema, FieldSpec, FieldType, StructAbi, StructLayout, TypeSpec};
use crate::cif::status_name;
use crate::error::{FfiError, FfiResult};
use crate::types::{PrimType, SIZE_LIMIT};
use libffi::raw::{self, ffi_type};
use rustc_hash::FxHashMap;
use std::sync::Arc;

impl FieldSchema {
    /// Build a top-level aggregate schema from its field specifications.
    ///
    /// Offsets accumulate in declaration order with no padding. Any rule
    /// violation aborts the whole build.
    pub fn build(specs: &[FieldSpec]) -> FfiResult<Arc<FieldSchema>> {
        if specs.is_empty() {
            return Err(FfiError::invalid_spec(
                "empty struct definitions are not legal",
            ));
        }

        let mut fields = Vec::with_capacity(specs.len());
        let mut index = FxHashMap::default();
        let mut offset: u64 = 0;

        for spec in specs {
            let label = spec.name.as_deref().unwrap_or("<anonymous>");
            let dimension = match spec.dimension {
                None => None,
                Some(0) => {
                    return Err(FfiError::invalid_spec(format!(
                        "array field '{}' must have a positive dimension",
                        label
                    )))
                }
                Some(d) if d > SIZE_LIMIT => {
                    return Err(FfiError::size_limit(format!("dimension of '{}'", label), d))
                }
                Some(d) => Some(d as u32),
            };

            let (ty, width, abi) = resolve(&spec.ty)?;

            let total = width * dimension.unwrap_or(1) as u64;
            if total > SIZE_LIMIT {
                return Err(FfiError::size_limit(format!("field '{}'", label), total));
            }
            if offset + total > SIZE_LIMIT {
                return Err(FfiError::size_limit("aggregate", offset + total));
            }

            if let Some(name) = &spec.name {
                if index.insert(name.clone(), fields.len()).is_some() {
                    return Err(FfiError::invalid_spec(format!(
                        "duplicate field name '{}'",
                        name
                    )));
                }
            }

            fields.push(FieldSchema {
                name: spec.name.clone(),
                ty,
                dimension,
                offset: Some(offset as u32),
                width: width as u32,
                abi,
            });
            offset += total;
        }

        let mut scalars = Vec::new();
        flatten(&fields, &mut scalars);
        let abi = StructAbi::new(scalars)?;

        tracing::debug!(
            event = "schema_built",
            fields = fields.len(),
            size = offset,
            abi_size = abi.ty.size,
            scalars = abi.scalars.len(),
        );

        Ok(Arc::new(FieldSchema {
            name: None,
            ty: FieldType::Struct(Arc::new(StructLayout { fields, index })),
            dimension: None,
            offset: None,
            width: offset as u32,
            abi: AbiType::Struct(Arc::new(abi)),
        }))
    }
}

/// Element type, element width and ABI descriptor of one field.
fn resolve(spec: &TypeSpec) -> FfiResult<(FieldType, u64, AbiType)> {
    match spec {
        TypeSpec::Primitive(p) => Ok((
            FieldType::Primitive(*p),
            p.size() as u64,
            AbiType::Primitive(*p),
        )),
        TypeSpec::Struct(inner) => {
            let sub = FieldSchema::build(inner)?;
            Ok((sub.ty.clone(), sub.width as u64, sub.abi.clone()))
        }
        TypeSpec::Schema(sub) => {
            if !sub.is_struct() || sub.offset.is_some() || sub.dimension.is_some() {
                return Err(FfiError::invalid_spec(
                    "a nested schema must describe a whole aggregate",
                ));
            }
            Ok((sub.ty.clone(), sub.width as u64, sub.abi.clone()))
        }
    }
}

/// Every scalar of every field, repeated per array element, nested
/// aggregates included.
fn flatten(fields: &[FieldSchema], out: &mut Vec<PrimType>) {
    for field in fields {
        let count = field.dimension.unwrap_or(1);
        match &field.abi {
            AbiType::Primitive(p) => out.extend(std::iter::repeat(*p).take(count as usize)),
            AbiType::Struct(inner) => {
                for _ in 0..count {
                    out.extend_from_slice(&inner.scalars);
                }
            }
        }
    }
}

impl StructAbi {
    fn new(scalars: Vec<PrimType>) -> FfiResult<StructAbi> {
        let mut elements: Box<[*mut ffi_type]> = scalars
            .iter()
            .map(|p| p.ffi_type())
            .chain(std::iter::once(std::ptr::null_mut()))
            .collect();
        let mut ty = Box::new(ffi_type {
            size: 0,
            alignment: 0,
            type_: raw::FFI_TYPE_STRUCT as u16,
            elements: elements.as_mut_ptr(),
        });
        prime(&mut ty)?;
        Ok(StructAbi {
            ty,
            elements,
            scalars,
        })
    }
}

/// Let libffi compute size and alignment now, so the descriptor is never
/// written again once it is shared.
fn prime(ty: &mut ffi_type) -> FfiResult<()> {
    let mut cif: raw::ffi_cif = unsafe { std::mem::zeroed() };
    let status = unsafe {
        raw::ffi_prep_cif(
            &mut cif,
            raw::ffi_abi_FFI_DEFAULT_ABI,
            0,
            ty,
            std::ptr::null_mut(),
        )
    };
    if status != raw::ffi_status_FFI_OK {
        return Err(FfiError::cif_prep("prime_struct", status_name(status)));
    }
    Ok(())
}
