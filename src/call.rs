//! Outbound calls.
//!
//! One call runs through these steps in order: pair up variadic
//! arguments, reserve the return slot, encode fixed arguments, pick the
//! cached interface or build a transient one (encoding the trailing
//! arguments), resolve offsets to pointers, call, decode the return value.
//! Scratch memory is owned by locals and released on every exit path.

use crate::cif::CallInterface;
use crate::error::{FfiError, FfiResult};
use crate::marshal::{append_value, decode_return, encode_scalar, return_slot, ArgBuffer};
use crate::routine::Routine;
use crate::schema::{FieldSchema, TypeSpec, ValueType};
use crate::signature::accepts;
use crate::types::PrimType;
use crate::value::HostValue;
use smallvec::SmallVec;
use std::ffi::c_void;

/// One element of a variadic argument stream.
///
/// The stream alternates a value and the type annotation it is passed as.
#[derive(Debug, Clone)]
pub enum StreamItem<V> {
    Value(V),
    Annotation(TypeSpec),
}

impl<V> StreamItem<V> {
    pub fn typed(value: V, ty: impl Into<TypeSpec>) -> [StreamItem<V>; 2] {
        [StreamItem::Value(value), StreamItem::Annotation(ty.into())]
    }
}

/// Split a variadic stream into `(type, value)` pairs.
pub fn pair_stream<V: HostValue>(
    stream: impl IntoIterator<Item = StreamItem<V>>,
) -> FfiResult<Vec<(ValueType, V)>> {
    let items: Vec<StreamItem<V>> = stream.into_iter().collect();
    if items.len() % 2 != 0 {
        return Err(FfiError::variadic_pairing(items.len()));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(first), Some(second)) = (iter.next(), iter.next()) {
        match (first, second) {
            (StreamItem::Value(value), StreamItem::Annotation(spec)) => {
                let ty = annotation_type(&spec)?;
                if !accepts(&ty, value.category()) {
                    return Err(FfiError::type_mismatch(
                        ty.describe(),
                        value.category().name(),
                    ));
                }
                let ty = promote(ty, &value)?;
                pairs.push((ty, value));
            }
            (StreamItem::Value(_), StreamItem::Value(_)) => {
                return Err(FfiError::type_mismatch("type annotation", "value"))
            }
            (StreamItem::Annotation(_), _) => {
                return Err(FfiError::type_mismatch("value", "type annotation"))
            }
        }
    }
    Ok(pairs)
}

/// Apply the C default argument promotions to a variadic annotation.
///
/// The value is range-checked against the annotated type first, so an
/// `int8` annotation still rejects 300.
fn promote<V: HostValue>(ty: ValueType, value: &V) -> FfiResult<ValueType> {
    let narrow = match ty {
        ValueType::Primitive(p) => p,
        other => return Ok(other),
    };
    let promoted = match narrow {
        PrimType::Int8 | PrimType::UInt8 | PrimType::Int16 | PrimType::UInt16 => PrimType::Int32,
        PrimType::Float32 => PrimType::Float64,
        _ => return Ok(ValueType::Primitive(narrow)),
    };
    encode_scalar(narrow, value, &mut [0u8; 8])?;
    Ok(ValueType::Primitive(promoted))
}

fn annotation_type(spec: &TypeSpec) -> FfiResult<ValueType> {
    match spec {
        TypeSpec::Primitive(p) => Ok(ValueType::Primitive(*p)),
        TypeSpec::Struct(fields) => Ok(ValueType::Struct(FieldSchema::build(fields)?)),
        TypeSpec::Schema(schema) => Ok(ValueType::Struct(schema.clone())),
    }
}

impl<V: HostValue> Routine<V> {
    /// Call a routine with its fixed arguments.
    ///
    /// A variadic routine called this way gets no trailing arguments.
    pub fn call(&self, args: &[V]) -> FfiResult<V> {
        self.dispatch(args, Vec::new())
    }

    /// Call a variadic routine with fixed arguments plus a stream of
    /// alternating values and type annotations.
    pub fn call_variadic(
        &self,
        args: &[V],
        stream: impl IntoIterator<Item = StreamItem<V>>,
    ) -> FfiResult<V> {
        self.check_live()?;
        let pairs = pair_stream(stream)?;
        if !self.is_variadic() && !pairs.is_empty() {
            return Err(FfiError::arity_mismatch(
                self.signature.params().len(),
                args.len() + pairs.len(),
            ));
        }
        self.dispatch(args, pairs)
    }

    fn dispatch(&self, args: &[V], trailing: Vec<(ValueType, V)>) -> FfiResult<V> {
        self.check_live()?;
        self.signature.check_args(args)?;

        let params = self.signature.params();
        let mut buf = ArgBuffer::with_capacity(16 * (params.len() + trailing.len() + 1));

        let ret_offset = self.signature.ret().map(|ty| {
            let (size, align) = return_slot(ty);
            buf.reserve(size, align)
        });

        let mut offsets: SmallVec<[usize; 8]> = SmallVec::new();
        for (param, arg) in params.iter().zip(args) {
            let offset =
                append_value(&mut buf, arg, param.ty()).map_err(|e| e.with_context(param.name()))?;
            offsets.push(offset);
        }

        let transient;
        let cif = match &self.cif {
            Some(cif) => cif,
            None => {
                let mut trailing_types = Vec::with_capacity(trailing.len());
                for (i, (ty, value)) in trailing.iter().enumerate() {
                    let offset = append_value(&mut buf, value, ty)
                        .map_err(|e| e.with_context(format!("variadic argument {}", i + 1)))?;
                    offsets.push(offset);
                    trailing_types.push(ty.clone());
                }
                transient = CallInterface::transient(
                    self.abi,
                    self.signature.ret(),
                    &self.signature.arg_types(),
                    &trailing_types,
                )?;
                &transient
            }
        };

        let frozen = buf.freeze();
        let mut arg_ptrs: SmallVec<[*mut c_void; 8]> =
            offsets.iter().map(|&off| frozen.ptr(off)).collect();
        let ret_ptr = ret_offset
            .map(|off| frozen.ptr(off))
            .unwrap_or(std::ptr::null_mut());

        tracing::trace!(
            event = "call",
            entry = self.entry,
            args = arg_ptrs.len(),
            scratch = frozen.len(),
            transient = self.cif.is_none(),
        );

        unsafe { cif.call(self.entry as *const c_void, ret_ptr, arg_ptrs.as_mut_ptr()) };

        match self.signature.ret() {
            Some(ty) => unsafe { decode_return(ty, ret_ptr as *const u8) },
            None => Ok(V::null()),
        }
    }
}
