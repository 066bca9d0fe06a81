//! Property tests: value splits conserve the split field.
//!
//! Splitting any part of a balance leaves the two halves summing to the
//! original, and the split passes exactly when neither half is negative.

use capsule_conformance::{amount_of, dec, key, sealed_token, AMOUNT};
use capsule_contract::Validator;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn split_conserves_total(seed in 1u8..200, total in 1u32..10_000, part in 1u32..20_000) {
        let k = key(seed);
        let token = sealed_token(&k, &total.to_string()).unwrap();

        let mut revision = token.create_revision_with_keys(&[k.clone()]).unwrap();
        revision.split_value(AMOUNT, dec(&part.to_string()).unwrap()).unwrap();

        let sibling = &revision.new_items()[0];
        let sum = amount_of(&revision).unwrap() + amount_of(sibling).unwrap();
        prop_assert_eq!(sum, amount_of(&token).unwrap());

        let expected = part <= total;
        let tree = revision.contracts_in_tree();
        let sibling_ok = Validator::default()
            .check_in_tree(sibling, &tree, "")
            .unwrap()
            .ok;
        prop_assert_eq!(sibling_ok, expected);
        prop_assert_eq!(revision.check("").unwrap(), expected);
    }
}
