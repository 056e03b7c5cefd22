// Outbound calls into the C library, bound by symbol name.

use crate::common::{bind, libc};
use ffi_bridge::{
    Abi, ErrorCategory, NativeLibrary, PrimType, Routine, Signature, SpecItem, StreamItem, Value,
};
use std::rc::Rc;

#[test]
fn abs_of_negative() {
    let abs = bind(
        "abs",
        &[SpecItem::param("n", PrimType::Int32), SpecItem::returns(PrimType::Int32)],
    );
    assert_eq!(abs.call(&[Value::Int(-42)]).unwrap(), Value::Int(42));
    assert_eq!(abs.call(&[Value::Int(7)]).unwrap(), Value::Int(7));
}

#[test]
fn labs_of_wide_value() {
    let labs = bind(
        "labs",
        &[SpecItem::param("n", PrimType::Int64), SpecItem::returns(PrimType::Int64)],
    );
    let n = -(1i64 << 40);
    assert_eq!(labs.call(&[Value::Int(n)]).unwrap(), Value::Int(1 << 40));
}

#[test]
fn out_of_range_argument_is_rejected_before_the_call() {
    let abs = bind(
        "abs",
        &[SpecItem::param("n", PrimType::Int32), SpecItem::returns(PrimType::Int32)],
    );
    let err = abs.call(&[Value::Int(1 << 40)]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
    assert!(err.to_string().contains("(in n)"));
}

#[test]
fn wrong_category_names_the_parameter() {
    let abs = bind(
        "abs",
        &[SpecItem::param("n", PrimType::Int32), SpecItem::returns(PrimType::Int32)],
    );
    let err = abs.call(&[Value::text("x")]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
    assert!(err.to_string().contains("'n'"));
}

#[test]
fn arity_is_checked() {
    let abs = bind(
        "abs",
        &[SpecItem::param("n", PrimType::Int32), SpecItem::returns(PrimType::Int32)],
    );
    let err = abs.call(&[]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn strlen_of_text() {
    let strlen = bind(
        "strlen",
        &[SpecItem::param("s", PrimType::Pointer), SpecItem::returns(PrimType::UInt64)],
    );
    assert_eq!(strlen.call(&[Value::text("bridge")]).unwrap(), Value::Int(6));
}

#[test]
fn snprintf_with_variadic_stream() {
    let snprintf = bind(
        "snprintf",
        &[
            SpecItem::param("buf", PrimType::Pointer),
            SpecItem::param("n", PrimType::UInt64),
            SpecItem::param("fmt", PrimType::Pointer),
            SpecItem::Variadic,
            SpecItem::returns(PrimType::Int32),
        ],
    );
    assert!(snprintf.is_variadic());

    let out = Value::bytes(vec![0u8; 64]);
    let mut stream = Vec::new();
    stream.extend(StreamItem::typed(Value::Int(-3), PrimType::Int32));
    stream.extend(StreamItem::typed(Value::text("ok"), PrimType::Pointer));
    stream.extend(StreamItem::typed(Value::Int(9), PrimType::Float64));
    let written = snprintf
        .call_variadic(
            &[out.clone(), Value::Int(64), Value::text("%d %s %.2f")],
            stream,
        )
        .unwrap();
    assert_eq!(written, Value::Int(10));
    match out {
        Value::Bytes(b) => assert_eq!(&b.borrow()[..11], b"-3 ok 9.00\0"),
        _ => unreachable!(),
    }
}

#[test]
fn odd_variadic_stream_fails() {
    let printf = bind(
        "printf",
        &[
            SpecItem::param("fmt", PrimType::Pointer),
            SpecItem::Variadic,
            SpecItem::returns(PrimType::Int32),
        ],
    );
    let err = printf
        .call_variadic(&[Value::text("%d\n")], vec![StreamItem::Value(Value::Int(1))])
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("variadic routines must alternate values and type annotations"));
}

#[test]
fn missing_symbol() {
    let sig = Signature::parse(&[SpecItem::returns(PrimType::Int32)]).unwrap();
    let err =
        Routine::<Value>::bind(libc(), "no_such_symbol_anywhere", sig, Abi::Default).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
}

#[test]
fn closed_library_stops_its_routines() {
    let library = Rc::new(NativeLibrary::this_process());
    let sig = Signature::parse(&[
        SpecItem::param("n", PrimType::Int32),
        SpecItem::returns(PrimType::Int32),
    ])
    .unwrap();
    let abs: Routine<Value> = Routine::bind(library.clone(), "abs", sig, Abi::Default).unwrap();
    assert_eq!(abs.call(&[Value::Int(-1)]).unwrap(), Value::Int(1));

    library.close().unwrap();
    let err = abs.call(&[Value::Int(-1)]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Liveness);
}

#[test]
fn missing_library_file() {
    let err = NativeLibrary::open("/nonexistent/libnothing.so").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
}

#[test]
fn snprintf_with_narrow_annotations() {
    let snprintf = bind(
        "snprintf",
        &[
            SpecItem::param("buf", PrimType::Pointer),
            SpecItem::param("n", PrimType::UInt64),
            SpecItem::param("fmt", PrimType::Pointer),
            SpecItem::Variadic,
            SpecItem::returns(PrimType::Int32),
        ],
    );
    let out = Value::bytes(vec![0u8; 32]);
    let mut stream = Vec::new();
    stream.extend(StreamItem::typed(Value::Int(-5), PrimType::Int8));
    stream.extend(StreamItem::typed(Value::Int(60000), PrimType::UInt16));
    stream.extend(StreamItem::typed(Value::Float(0.5), PrimType::Float32));
    let written = snprintf
        .call_variadic(&[out.clone(), Value::Int(32), Value::text("%d %d %.1f")], stream)
        .unwrap();
    assert_eq!(written, Value::Int(12));
    match out {
        Value::Bytes(b) => assert_eq!(&b.borrow()[..13], b"-5 60000 0.5\0"),
        _ => unreachable!(),
    }
}
