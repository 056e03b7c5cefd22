// Host closures handed to native code as function pointers.

use crate::common::bind;
use ffi_bridge::{Abi, Param, PrimType, Routine, Signature, SpecItem, Value};
use std::cell::Cell;
use std::rc::Rc;

fn comparator(calls: Rc<Cell<usize>>) -> Routine<Value> {
    let sig = Signature::new(
        vec![
            Param::new("a", PrimType::Pointer),
            Param::new("b", PrimType::Pointer),
        ],
        Some(PrimType::Int32.into()),
    );
    Routine::wrap_callback(
        move |args: &[Value]| -> Result<Value, String> {
            calls.set(calls.get() + 1);
            let read = |v: &Value| -> Result<i32, String> {
                let addr = v.as_int().ok_or("expected an address")?;
                Ok(unsafe { std::ptr::read_unaligned(addr as *const i32) })
            };
            let (a, b) = (read(&args[0])?, read(&args[1])?);
            Ok(Value::Int(a.cmp(&b) as i64))
        },
        sig,
        Abi::Default,
    )
    .unwrap()
}

fn qsort() -> Routine<Value> {
    bind(
        "qsort",
        &[
            SpecItem::param("base", PrimType::Pointer),
            SpecItem::param("count", PrimType::UInt64),
            SpecItem::param("size", PrimType::UInt64),
            SpecItem::param("compare", PrimType::Pointer),
        ],
    )
}

#[test]
fn qsort_with_host_comparator() {
    let numbers: Vec<i32> = vec![5, -2, 9, 0, 3, 3, -7];
    let bytes: Vec<u8> = numbers.iter().flat_map(|n| n.to_ne_bytes()).collect();
    let buffer = Value::bytes(bytes);

    let calls = Rc::new(Cell::new(0));
    let compare = Value::routine(comparator(calls.clone()));

    let out = qsort()
        .call(&[buffer.clone(), Value::Int(7), Value::Int(4), compare])
        .unwrap();
    assert_eq!(out, Value::Null);
    assert!(calls.get() > 0);

    let sorted: Vec<i32> = match buffer {
        Value::Bytes(b) => b
            .borrow()
            .chunks(4)
            .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        _ => unreachable!(),
    };
    assert_eq!(sorted, vec![-7, -2, 0, 3, 3, 5, 9]);
}

#[test]
fn bound_routine_is_not_a_function_pointer_value() {
    let abs = bind(
        "abs",
        &[SpecItem::param("n", PrimType::Int32), SpecItem::returns(PrimType::Int32)],
    );
    let err = qsort()
        .call(&[
            Value::bytes(vec![0; 4]),
            Value::Int(1),
            Value::Int(4),
            Value::routine(abs),
        ])
        .unwrap_err();
    assert!(err.to_string().contains("compare"));
}

#[test]
fn callback_returning_float() {
    let halve: Routine<Value> = Routine::wrap_callback(
        |args: &[Value]| -> Result<Value, String> {
            match args[0] {
                Value::Float(x) => Ok(Value::Float(x / 2.0)),
                _ => Err("expected a float".to_string()),
            }
        },
        Signature::new(
            vec![Param::new("x", PrimType::Float64)],
            Some(PrimType::Float64.into()),
        ),
        Abi::Default,
    )
    .unwrap();
    assert_eq!(halve.call(&[Value::Float(5.0)]).unwrap(), Value::Float(2.5));
    assert_eq!(halve.call(&[Value::Int(3)]).unwrap(), Value::Float(1.5));
}
