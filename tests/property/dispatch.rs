// Fixed and per-call interfaces must agree.

use ffi_bridge::{Abi, Param, PrimType, Routine, Signature, SpecItem, StreamItem, Value};
use proptest::prelude::*;

extern "C" fn mix(a: i32, b: f64, c: i16) -> f64 {
    a as f64 * 0.5 + b - c as f64
}

fn fixed() -> Routine<Value> {
    let sig = Signature::new(
        vec![
            Param::new("a", PrimType::Int32),
            Param::new("b", PrimType::Float64),
            Param::new("c", PrimType::Int16),
        ],
        Some(PrimType::Float64.into()),
    );
    unsafe { Routine::from_address(mix as usize, sig, Abi::Default) }.unwrap()
}

fn transient() -> Routine<Value> {
    // every argument declared fixed, but the routine is marked variadic so
    // each call prepares its own interface
    let sig = Signature::parse(&[
        SpecItem::param("a", PrimType::Int32),
        SpecItem::param("b", PrimType::Float64),
        SpecItem::param("c", PrimType::Int16),
        SpecItem::Variadic,
        SpecItem::returns(PrimType::Float64),
    ])
    .unwrap();
    unsafe { Routine::from_address(mix as usize, sig, Abi::Default) }.unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn fixed_and_transient_agree(a in any::<i32>(), b in -1.0e6f64..1.0e6, c in any::<i16>()) {
        let args = [Value::Int(a as i64), Value::Float(b), Value::Int(c as i64)];
        let one = fixed().call(&args).unwrap();
        let two = transient()
            .call_variadic(&args, Vec::<StreamItem<Value>>::new())
            .unwrap();
        prop_assert_eq!(&one, &two);
        prop_assert_eq!(one, Value::Float(mix(a, b, c)));
    }
}
