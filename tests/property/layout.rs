// Layout arithmetic, compatibility and equality.

use super::strategies::field_specs;
use ffi_bridge::{FieldSchema, Instance};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn offsets_are_running_sums(specs in field_specs()) {
        let schema = FieldSchema::build(&specs).unwrap();
        let mut expected = 0usize;
        for field in schema.fields() {
            prop_assert_eq!(field.offset(), Some(expected as u32));
            expected += field.total_size();
        }
        prop_assert_eq!(schema.total_size(), expected);
        prop_assert!(schema.abi_size() >= schema.total_size());
    }

    #[test]
    fn compatibility_is_reflexive_and_symmetric(a in field_specs(), b in field_specs()) {
        let x = FieldSchema::build(&a).unwrap();
        let y = FieldSchema::build(&b).unwrap();
        let x_again = FieldSchema::build(&a).unwrap();
        prop_assert!(x.compatible(&x));
        prop_assert!(x.compatible(&x_again));
        prop_assert_eq!(x.compatible(&y), y.compatible(&x));
    }

    #[test]
    fn one_byte_breaks_equality(specs in field_specs(), pick in any::<prop::sample::Index>()) {
        let schema = FieldSchema::build(&specs).unwrap();
        let a = Instance::new(schema.clone());
        let b = Instance::new(schema);
        prop_assert_eq!(&a, &b);

        let mut bytes = b.bytes().unwrap();
        let i = pick.index(bytes.len());
        bytes[i] ^= 0x01;
        b.change(&bytes).unwrap();
        prop_assert_ne!(&a, &b);
    }
}
