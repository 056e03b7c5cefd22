// Struct instances over memory owned by the C allocator.

use crate::common::{bind, sample_schema};
use ffi_bridge::{ErrorCategory, Instance, MemoryOwner, PrimType, SpecItem, Value};
use std::cell::Cell;

fn malloc_sample() -> (usize, Instance) {
    let schema = sample_schema();
    let address = unsafe { libc::calloc(1, schema.total_size()) } as usize;
    assert_ne!(address, 0);
    let instance = unsafe { Instance::external(schema, address, Some(7)) }.unwrap();
    (address, instance)
}

#[test]
fn writes_land_in_native_memory() {
    let (address, instance) = malloc_sample();
    assert_eq!(instance.owner(), MemoryOwner::External);
    assert_eq!(instance.address().unwrap(), address);

    instance.set("a", &Value::Int(-2)).unwrap();
    let raw = unsafe { std::ptr::read_unaligned(address as *const i32) };
    assert_eq!(raw, -2);

    unsafe { *((address + 5) as *mut i8) = 42 };
    let b1: Value = instance.get_element("b", 1).unwrap();
    assert_eq!(b1, Value::Int(42));

    let freed = Cell::new(0usize);
    instance
        .invalidate(Some(&|addr: usize| {
            freed.set(addr);
            unsafe { libc::free(addr as *mut libc::c_void) };
        }))
        .unwrap();
    assert_eq!(freed.get(), address);
}

#[test]
fn dead_memory_is_never_touched() {
    let (address, instance) = malloc_sample();
    let alias = instance.clone();
    instance
        .invalidate(Some(&|addr: usize| unsafe { libc::free(addr as *mut libc::c_void) }))
        .unwrap();

    assert!(!alias.is_live());
    let err = alias.get::<Value>("a").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Liveness);
    assert!(alias.set("a", &Value::Int(1)).is_err());
    assert!(alias.bytes().is_err());
    assert!(alias.address().is_err());

    let again = instance.invalidate(None).unwrap_err();
    assert!(again.to_string().contains(&format!("{:#x}", address)));
}

#[test]
fn owned_memory_cannot_be_invalidated() {
    let owned = Instance::new(sample_schema());
    let err = owned.invalidate(None).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Liveness);
}

#[test]
fn import_checks() {
    let schema = sample_schema();
    let mut backing = [0u8; 7];
    let addr = backing.as_mut_ptr() as usize;
    assert!(unsafe { Instance::external(schema.clone(), 0, None) }.is_err());
    assert!(unsafe { Instance::external(schema.clone(), addr, Some(0)) }.is_err());
    let err = unsafe { Instance::external(schema.clone(), addr, Some(8)) }.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Specification);
    assert!(unsafe { Instance::external(schema, addr, None) }.is_ok());
}

#[test]
fn external_instance_passed_to_memset() {
    let memset = bind(
        "memset",
        &[
            SpecItem::param("dest", PrimType::Pointer),
            SpecItem::param("byte", PrimType::Int32),
            SpecItem::param("count", PrimType::UInt64),
            SpecItem::returns(PrimType::Pointer),
        ],
    );
    let (address, instance) = malloc_sample();
    let ret = memset
        .call(&[Value::Struct(instance.clone()), Value::Int(0xff), Value::Int(7)])
        .unwrap();
    assert_eq!(ret, Value::Int(address as i64));
    assert_eq!(instance.get::<Value>("a").unwrap(), Value::Int(-1));
    assert_eq!(instance.get::<Value>("b").unwrap(), crate::common::list(&[-1, -1, -1]));
    instance
        .invalidate(Some(&|addr: usize| unsafe { libc::free(addr as *mut libc::c_void) }))
        .unwrap();
}
