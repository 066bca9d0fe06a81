//! Adversarial test: a submission cannot outspend its quanta budget.
//!
//! A breach aborts the whole check, including one that happens while
//! checking a nested item, and leaves no partial verdict behind.

use capsule_conformance::{issue_token, key, sealed_token};
use capsule_contract::{Contract, Validator};
use capsule_quantiser::QuantiserError;

fn stuffed(count: usize) -> Contract {
    let k = key(80);
    let mut carrier = issue_token(&k, "1").unwrap();
    for i in 0..count {
        carrier.add_new_item(sealed_token(&k, &(i + 1).to_string()).unwrap());
    }
    carrier
}

#[test]
fn breach_in_nested_item_aborts() {
    let mut carrier = stuffed(5);
    let spent = Validator::default().check(&carrier).unwrap().quanta;

    // Enough for the carrier itself but not for all of its items.
    carrier.set_quanta_limit(i64::try_from(spent).unwrap() - 10);
    let result = carrier.check("");
    assert!(matches!(result, Err(QuantiserError::LimitExceeded { .. })));
    assert!(carrier.errors().is_empty());
}

#[test]
fn soft_errors_do_not_survive_a_breach() {
    let mut carrier = stuffed(3);
    carrier.set_expires_at(None);
    carrier.set_quanta_limit(1);
    assert!(carrier.check("").is_err());
    assert!(carrier.errors().is_empty());

    carrier.set_quanta_limit(-1);
    assert!(!carrier.check("").unwrap());
    assert_eq!(carrier.errors().len(), 1);
}
