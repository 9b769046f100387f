use clientgen::model::{sort_fields, Field, TypeRef};
use proptest::prelude::*;

fn field(name: String, required: bool) -> Field {
    Field {
        source_key: name.clone(),
        name,
        type_ref: TypeRef::any(),
        required,
        doc: None,
    }
}

proptest! {
    #[test]
    fn required_fields_come_first_then_by_name(
        input in proptest::collection::vec(("[a-z_]{1,8}", any::<bool>()), 0..24)
    ) {
        let mut fields: Vec<Field> = input.into_iter().map(|(n, r)| field(n, r)).collect();
        let before = fields.len();
        sort_fields(&mut fields);
        prop_assert_eq!(fields.len(), before);

        for pair in fields.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.required >= b.required);
            if a.required == b.required {
                prop_assert!(a.name <= b.name);
            }
        }
    }

    #[test]
    fn sorting_is_idempotent(
        input in proptest::collection::vec(("[a-z]{1,6}", any::<bool>()), 0..16)
    ) {
        let mut once: Vec<Field> = input.into_iter().map(|(n, r)| field(n, r)).collect();
        sort_fields(&mut once);
        let mut twice = once.clone();
        sort_fields(&mut twice);
        prop_assert_eq!(once, twice);
    }
}
