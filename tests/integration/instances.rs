// Struct schemas and owned instances through the public API.

use crate::common::{list, sample_schema};
use ffi_bridge::{
    free_value_pointer, is_value_pointer, ErrorCategory, ErrorKind, FieldSchema, FieldSpec,
    Instance, MemoryOwner, PrimType, TypeSpec, Value,
};

#[test]
fn sample_layout() {
    let schema = sample_schema();
    assert_eq!(schema.total_size(), 7);
    assert_eq!(schema.field("a").unwrap().offset(), Some(0));
    assert_eq!(schema.field("b").unwrap().offset(), Some(4));
    assert_eq!(schema.field("b").unwrap().dimension(), Some(3));
}

#[test]
fn sample_values_and_bytes() {
    let point = Instance::with_values(
        sample_schema(),
        &[("a", Value::Int(300000)), ("b", list(&[1, 2, 3]))],
    )
    .unwrap();
    assert_eq!(point.owner(), MemoryOwner::Bridge);
    assert_eq!(point.length().unwrap(), 7);

    let mut expected = 300000i32.to_ne_bytes().to_vec();
    expected.extend_from_slice(&[1, 2, 3]);
    assert_eq!(point.bytes().unwrap(), expected);

    let fields: Vec<(Option<String>, Value)> = point.fields().unwrap();
    assert_eq!(
        fields,
        vec![
            (Some("a".to_string()), Value::Int(300000)),
            (Some("b".to_string()), list(&[1, 2, 3])),
        ]
    );
}

#[test]
fn equality_copy_and_change() {
    let a = Instance::with_values(sample_schema(), &[("a", Value::Int(1))]).unwrap();
    let b = a.duplicate().unwrap();
    assert_eq!(a, b);
    assert!(!a.shares_storage(&b));

    b.set_element("b", 2, &Value::Int(9)).unwrap();
    assert_ne!(a, b);

    let c = a.make_similar(&[("a", Value::Int(2))]).unwrap();
    assert_eq!(c.get::<Value>("a").unwrap(), Value::Int(2));
    assert_eq!(a.get::<Value>("a").unwrap(), Value::Int(1));

    c.change(&[0; 7]).unwrap();
    assert_eq!(c.get::<Value>("b").unwrap(), list(&[0, 0, 0]));
    let err = c.change(&[0; 6]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn array_writes_are_all_or_nothing() {
    let point = Instance::with_values(sample_schema(), &[("b", list(&[4, 5, 6]))]).unwrap();
    assert!(point.set("b", &list(&[1, 2])).is_err());
    assert!(point.set("b", &list(&[1, 2, 300])).is_err());
    assert_eq!(point.get::<Value>("b").unwrap(), list(&[4, 5, 6]));
    assert!(point.get_element::<Value>("b", 3).is_err());
}

#[test]
fn nested_struct_views_share_storage() {
    let inner = sample_schema();
    let outer = FieldSchema::build(&[
        FieldSpec::new("tag", PrimType::UInt8),
        FieldSpec::new("body", TypeSpec::Schema(inner.clone())),
        FieldSpec::new("pair", inner).array(2),
    ])
    .unwrap();
    assert_eq!(outer.total_size(), 1 + 7 + 14);

    let record = Instance::new(outer);
    let body = match record.get::<Value>("body").unwrap() {
        Value::Struct(view) => view,
        other => panic!("expected a struct, got {:?}", other),
    };
    assert!(body.shares_storage(&record));
    body.set("a", &Value::Int(77)).unwrap();
    assert_eq!(record.bytes().unwrap()[1..5], 77i32.to_ne_bytes());

    let second = match record.get_element::<Value>("pair", 1).unwrap() {
        Value::Struct(view) => view,
        other => panic!("expected a struct, got {:?}", other),
    };
    second.set("a", &Value::Int(-1)).unwrap();
    assert_eq!(record.bytes().unwrap()[15..19], [0xff; 4]);
}

#[test]
fn unknown_field() {
    let point = Instance::new(sample_schema());
    let err = point.get::<Value>("z").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
}

fn opaque_schema() -> std::sync::Arc<FieldSchema> {
    FieldSchema::build(&[FieldSpec::new("v", PrimType::Opaque)]).unwrap()
}

#[test]
fn opaque_field_outlives_the_stored_value() {
    let holder = Instance::new(opaque_schema());
    {
        let temporary = Value::text("tunnelled");
        holder.set("v", &temporary).unwrap();
    }
    assert_eq!(holder.get::<Value>("v").unwrap(), Value::text("tunnelled"));

    let address = usize::from_ne_bytes(holder.bytes().unwrap().try_into().unwrap());
    assert!(is_value_pointer(address));
    free_value_pointer::<Value>(address).unwrap();
    let err = holder.get::<Value>("v").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Liveness);
}

#[test]
fn forged_opaque_bytes_fail_cleanly() {
    let holder = Instance::from_bytes(opaque_schema(), &0x4141_4141usize.to_ne_bytes()).unwrap();
    let err = holder.get::<Value>("v").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownCell { address: 0x4141_4141 }));

    holder.change(&0x10usize.to_ne_bytes()).unwrap();
    assert!(holder.get::<Value>("v").is_err());

    holder.change(&0usize.to_ne_bytes()).unwrap();
    assert_eq!(holder.get::<Value>("v").unwrap(), Value::Null);
}
