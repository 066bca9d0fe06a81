//! Property tests: revision chains keep their provenance.
//!
//! Along any chain of sealed revisions every revision points at the
//! previous one, shares the root's origin, counts up by one and passes the
//! check.

use capsule_conformance::{key, sealed_token};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn chain_links_to_root(seed in 1u8..200, length in 1usize..6) {
        let k = key(seed);
        let root = sealed_token(&k, "10").unwrap();
        let origin = root.id();

        let mut previous = root;
        for step in 0..length {
            let mut next = previous.create_revision_with_keys(&[k.clone()]).unwrap();
            next.seal().unwrap();

            prop_assert_eq!(next.origin(), origin);
            prop_assert_eq!(next.parent(), previous.id());
            prop_assert_eq!(next.revision() as usize, step + 2);
            prop_assert!(next.check("").unwrap(), "{:?}", next.errors());
            previous = next;
        }
    }
}
