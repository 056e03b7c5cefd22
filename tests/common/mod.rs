//! Shared test helpers.

use ffi_bridge::{
    Abi, FieldSchema, FieldSpec, Library, NativeLibrary, PrimType, Routine, Signature, SpecItem,
    Value,
};
use std::rc::Rc;
use std::sync::Arc;

/// The test binary itself, which has libc linked in.
pub fn libc() -> Rc<dyn Library> {
    Rc::new(NativeLibrary::this_process())
}

/// Bind a libc symbol with a parsed routine spec.
pub fn bind(symbol: &str, spec: &[SpecItem]) -> Routine<Value> {
    let sig = Signature::parse(spec).unwrap();
    Routine::bind(libc(), symbol, sig, Abi::Default).unwrap()
}

/// `struct { int32 a; int8 b[3]; }`, seven bytes packed.
pub fn sample_schema() -> Arc<FieldSchema> {
    FieldSchema::build(&[
        FieldSpec::new("a", PrimType::Int32),
        FieldSpec::new("b", PrimType::Int8).array(3),
    ])
    .unwrap()
}

pub fn list(items: &[i64]) -> Value {
    Value::List(Rc::new(items.iter().map(|&n| Value::Int(n)).collect()))
}
