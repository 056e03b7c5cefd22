//! Value codec: host values to native bytes and back.
//!
//! Encoding always writes into a byte slice, either a slot reserved in an
//! [`ArgBuffer`] or a field inside an aggregate instance. Decoding reads
//! from a native pointer or slice and builds a fresh host value.

mod buffer;
mod scalar;

pub use buffer::{ArgBuffer, FrozenBuffer};
pub use scalar::{decode_scalar, encode_scalar, pointer_address};

use crate::error::{FfiError, FfiResult};
use crate::instance::Instance;
use crate::schema::ValueType;
use crate::types::{PrimType, FFI_ARG_SIZE};
use crate::value::HostValue;
use libffi::raw::ffi_arg;

/// Encode `value` as `ty` into `dest`, which must hold `ty.size()` bytes.
///
/// Aggregates must come from a layout-compatible instance; their bytes are
/// copied as-is.
pub fn encode_value<V: HostValue>(value: &V, ty: &ValueType, dest: &mut [u8]) -> FfiResult<()> {
    match ty {
        ValueType::Primitive(p) => encode_scalar(*p, value, dest),
        ValueType::Struct(schema) => {
            let instance = value
                .as_instance()
                .ok_or_else(|| FfiError::type_mismatch(ty.describe(), value.category().name()))?;
            if !instance.schema().compatible(schema) {
                return Err(FfiError::layout_mismatch(format!(
                    "cannot pass {} where {} is expected",
                    instance.schema(),
                    schema
                )));
            }
            let size = schema.total_size();
            instance.with_bytes(|bytes| dest[..size].copy_from_slice(bytes))
        }
    }
}

/// Encode `value` into a new slot appended to `buf`; returns the offset.
pub fn append_value<V: HostValue>(
    buf: &mut ArgBuffer,
    value: &V,
    ty: &ValueType,
) -> FfiResult<usize> {
    let size = ty.slot_size();
    let offset = buf.reserve(size, ty.slot_align());
    encode_value(value, ty, buf.slot_mut(offset, size))?;
    Ok(offset)
}

/// Decode a `ty` stored at `src`.
///
/// # Safety
/// `src` must point at `ty.size()` readable bytes.
pub unsafe fn decode_value<V: HostValue>(ty: &ValueType, src: *const u8) -> FfiResult<V> {
    match ty {
        ValueType::Primitive(p) => {
            decode_scalar(*p, std::slice::from_raw_parts(src, p.size()))
        }
        ValueType::Struct(schema) => Ok(V::instance(Instance::from_raw(schema.clone(), src))),
    }
}

/// Bytes and alignment to reserve for a return slot.
///
/// libffi writes small integral results as a full `ffi_arg`.
pub(crate) fn return_slot(ty: &ValueType) -> (usize, usize) {
    (
        ty.slot_size().max(FFI_ARG_SIZE),
        ty.slot_align().max(FFI_ARG_SIZE),
    )
}

fn widened(ty: &ValueType) -> Option<PrimType> {
    match ty {
        ValueType::Primitive(p) if p.is_integer() && p.size() < FFI_ARG_SIZE => Some(*p),
        _ => None,
    }
}

/// Decode a native return value, narrowing widened integers.
///
/// # Safety
/// `slot` must be a return slot sized by [`return_slot`] and filled by
/// `ffi_call`.
pub(crate) unsafe fn decode_return<V: HostValue>(ty: &ValueType, slot: *const u8) -> FfiResult<V> {
    match widened(ty) {
        Some(p) => {
            let raw = std::ptr::read(slot as *const ffi_arg);
            let n = match p {
                PrimType::Int8 => raw as i8 as i64,
                PrimType::UInt8 => raw as u8 as i64,
                PrimType::Int16 => raw as i16 as i64,
                PrimType::UInt16 => raw as u16 as i64,
                PrimType::Int32 => raw as i32 as i64,
                PrimType::UInt32 => raw as u32 as i64,
                _ => raw as i64,
            };
            Ok(V::integer(n))
        }
        None => decode_value(ty, slot),
    }
}

/// Encode a callback result into the return slot libffi handed us.
///
/// # Safety
/// `slot` must be the writable return pointer of a closure call typed
/// with `ty`.
pub(crate) unsafe fn encode_return<V: HostValue>(
    value: &V,
    ty: &ValueType,
    slot: *mut u8,
) -> FfiResult<()> {
    match widened(ty) {
        Some(p) => {
            // range check at the declared width first
            let mut scratch = [0u8; 8];
            encode_scalar(p, value, &mut scratch)?;
            let n = value.as_integer().unwrap_or_default();
            std::ptr::write(slot as *mut ffi_arg, n as ffi_arg);
            Ok(())
        }
        None => {
            let dest = std::slice::from_raw_parts_mut(slot, ty.size());
            encode_value(value, ty, dest)
        }
    }
}
