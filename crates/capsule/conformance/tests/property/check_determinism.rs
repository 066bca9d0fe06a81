//! Property tests: checking is deterministic and its cost is a hard bound.
//!
//! The same item checked twice yields the same errors and spends the same
//! quanta. A budget of exactly the quanta an unlimited check spent is
//! enough; one quantum less aborts the check.

use capsule_conformance::{issue_token, key, sealed_token};
use capsule_contract::{Contract, ValidationConfig, Validator};
use capsule_quantiser::QuantiserError;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A carrier with `count` sealed tokens and optionally a broken expiry.
fn carrier(seed: u8, count: usize, expired: bool) -> Contract {
    let k = key(seed);
    let mut c = issue_token(&k, "1").unwrap();
    for i in 0..count {
        c.add_new_item(sealed_token(&k, &format!("{}", i + 1)).unwrap());
    }
    if expired {
        c.set_expires_at(None);
    }
    c
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Checking twice gives the same verdict and cost.
    #[test]
    fn check_is_idempotent(seed in 1u8..200, count in 0usize..4, expired in any::<bool>()) {
        let mut c = carrier(seed, count, expired);
        let first = c.check("").unwrap();
        let first_errors = c.errors().to_vec();
        let first_quanta = c.quantiser().quanta_sum();

        let second = c.check("").unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(first, !expired);
        prop_assert_eq!(c.errors(), first_errors.as_slice());
        prop_assert_eq!(c.quantiser().quanta_sum(), first_quanta);
    }

    /// The quanta spent by an unlimited check is exactly the smallest
    /// sufficient budget.
    #[test]
    fn budget_is_monotone(seed in 1u8..200, count in 0usize..4) {
        let mut c = carrier(seed, count, false);
        c.seal().unwrap();

        let spent = Validator::default().check(&c).unwrap().quanta;
        prop_assert!(spent > 0);
        let limit = i64::try_from(spent).unwrap();

        let enough = Validator::new(ValidationConfig::default().with_quanta_limit(limit));
        prop_assert!(enough.check(&c).unwrap().ok);

        let short = Validator::new(ValidationConfig::default().with_quanta_limit(limit - 1));
        let is_limit_exceeded = matches!(
            short.check(&c),
            Err(QuantiserError::LimitExceeded { .. })
        );
        prop_assert!(is_limit_exceeded);
    }
}
