//! Primitive encode/decode.

use crate::cell::{alloc_value_pointer, get_at_pointer};
use crate::error::{FfiError, FfiResult};
use crate::types::{PrimType, POINTER_SIZE};
use crate::value::{Category, HostValue};

fn mismatch<V: HostValue>(expected: impl Into<String>, value: &V) -> FfiError {
    FfiError::type_mismatch(expected, value.category().name())
}

/// Write `value` as `ty` into the first `ty.size()` bytes of `dest`.
///
/// Integers must fit the target width. Floats accept integers. An opaque
/// slot stores the address of a new value cell holding a clone of `value`;
/// the cell lives until [`crate::cell::free_value_pointer`] releases it.
pub fn encode_scalar<V: HostValue>(ty: PrimType, value: &V, dest: &mut [u8]) -> FfiResult<()> {
    debug_assert!(dest.len() >= ty.size());
    match ty {
        PrimType::Float32 | PrimType::Float64 => {
            let f = value
                .as_float()
                .or_else(|| value.as_integer().map(|n| n as f64))
                .ok_or_else(|| mismatch(ty.keyword(), value))?;
            if ty == PrimType::Float32 {
                put(dest, &(f as f32).to_ne_bytes());
            } else {
                put(dest, &f.to_ne_bytes());
            }
            Ok(())
        }
        PrimType::Pointer => {
            let addr = pointer_address(value)?;
            put(dest, &addr.to_ne_bytes());
            Ok(())
        }
        PrimType::Opaque => {
            let addr = match value.category() {
                Category::Null => 0,
                _ => alloc_value_pointer(value.clone()),
            };
            put(dest, &addr.to_ne_bytes());
            Ok(())
        }
        _ => {
            let n = value
                .as_integer()
                .ok_or_else(|| mismatch(ty.keyword(), value))?;
            encode_integer(ty, n, dest)
        }
    }
}

fn encode_integer(ty: PrimType, n: i64, dest: &mut [u8]) -> FfiResult<()> {
    let range = || FfiError::out_of_range(ty.keyword(), n);
    match ty {
        PrimType::Int8 => put(dest, &i8::try_from(n).map_err(|_| range())?.to_ne_bytes()),
        PrimType::UInt8 => put(dest, &u8::try_from(n).map_err(|_| range())?.to_ne_bytes()),
        PrimType::Int16 => put(dest, &i16::try_from(n).map_err(|_| range())?.to_ne_bytes()),
        PrimType::UInt16 => put(dest, &u16::try_from(n).map_err(|_| range())?.to_ne_bytes()),
        PrimType::Int32 => put(dest, &i32::try_from(n).map_err(|_| range())?.to_ne_bytes()),
        PrimType::UInt32 => put(dest, &u32::try_from(n).map_err(|_| range())?.to_ne_bytes()),
        PrimType::Int64 => put(dest, &n.to_ne_bytes()),
        PrimType::UInt64 => put(dest, &u64::try_from(n).map_err(|_| range())?.to_ne_bytes()),
        other => return Err(FfiError::type_mismatch(other.keyword(), "integer")),
    }
    Ok(())
}

/// Address a value stands for when passed as a pointer.
pub fn pointer_address<V: HostValue>(value: &V) -> FfiResult<usize> {
    match value.category() {
        Category::Null => Ok(0),
        Category::Integer => {
            let n = value
                .as_integer()
                .ok_or_else(|| mismatch("pointer", value))?;
            usize::try_from(n).map_err(|_| FfiError::out_of_range("pointer", n))
        }
        Category::Text | Category::Bytes => {
            value.as_address().ok_or_else(|| mismatch("pointer", value))
        }
        Category::Struct => match value.as_instance() {
            Some(instance) => instance.address(),
            None => Err(mismatch("pointer", value)),
        },
        Category::Routine => match value.as_routine() {
            Some(routine) if routine.is_callback() => Ok(routine.address()),
            Some(_) => Err(FfiError::type_mismatch(
                "pointer (only callbacks can be passed by pointer)",
                "routine",
            )),
            None => Err(mismatch("pointer", value)),
        },
        _ => Err(mismatch("pointer", value)),
    }
}

/// Read a `ty` from the first `ty.size()` bytes of `src`.
///
/// Pointers decode to integers. `uint64` values above `i64::MAX` do not
/// fit a host integer and are rejected. An opaque slot must hold null or
/// the address of a live value cell.
pub fn decode_scalar<V: HostValue>(ty: PrimType, src: &[u8]) -> FfiResult<V> {
    debug_assert!(src.len() >= ty.size());
    let value = match ty {
        PrimType::Int8 => V::integer(i8::from_ne_bytes(take(src)) as i64),
        PrimType::UInt8 => V::integer(u8::from_ne_bytes(take(src)) as i64),
        PrimType::Int16 => V::integer(i16::from_ne_bytes(take(src)) as i64),
        PrimType::UInt16 => V::integer(u16::from_ne_bytes(take(src)) as i64),
        PrimType::Int32 => V::integer(i32::from_ne_bytes(take(src)) as i64),
        PrimType::UInt32 => V::integer(u32::from_ne_bytes(take(src)) as i64),
        PrimType::Int64 => V::integer(i64::from_ne_bytes(take(src))),
        PrimType::UInt64 => {
            let n = u64::from_ne_bytes(take(src));
            V::integer(i64::try_from(n).map_err(|_| FfiError::out_of_range("host integer", n))?)
        }
        PrimType::Float32 => V::float(f32::from_ne_bytes(take(src)) as f64),
        PrimType::Float64 => V::float(f64::from_ne_bytes(take(src))),
        PrimType::Pointer => {
            let addr = usize::from_ne_bytes(take(src));
            V::integer(i64::try_from(addr).map_err(|_| FfiError::out_of_range("host integer", addr))?)
        }
        PrimType::Opaque => {
            let addr = usize::from_ne_bytes(take(src));
            if addr == 0 {
                V::null()
            } else {
                get_at_pointer(addr)?
            }
        }
    };
    Ok(value)
}

fn put(dest: &mut [u8], bytes: &[u8]) {
    dest[..bytes.len()].copy_from_slice(bytes);
}

fn take<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&src[..N]);
    out
}

const _: () = assert!(POINTER_SIZE == std::mem::size_of::<usize>());
