//! Property tests: sealing and decoding preserve the contract.
//!
//! Any state data survives a seal/decode round trip, the decoded id is the
//! hash of the bytes it came from, and the decoded item passes the check
//! exactly when the original did.

use capsule_conformance::key;
use capsule_contract::{Contract, DataMap};
use capsule_crypto::HashId;
use proptest::prelude::*;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
        any::<u32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
    ]
}

fn arb_data() -> impl Strategy<Value = DataMap> {
    prop::collection::btree_map("[a-z]{1,8}", arb_value(), 0..6)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sealed_data_round_trips(seed in 1u8..200, data in arb_data()) {
        let k = key(seed);
        let mut c = Contract::issue(&k);
        c.state_data_mut().extend(data.clone());
        let id = c.seal().unwrap();

        let bytes = c.sealed_binary().unwrap().to_vec();
        prop_assert_eq!(id, HashId::of(&bytes));

        let mut decoded = Contract::from_sealed_standalone(&bytes).unwrap();
        prop_assert_eq!(decoded.id(), Some(id));
        prop_assert_eq!(decoded.state_data(), &data);
        prop_assert!(decoded.errors().is_empty());
        prop_assert!(decoded.check("").unwrap());
    }

    /// Decoding keeps the signed payload byte for byte.
    #[test]
    fn payload_is_stable(seed in 1u8..200, data in arb_data()) {
        let mut c = Contract::issue(&key(seed));
        c.state_data_mut().extend(data);
        c.seal().unwrap();
        let payload = c.extract_contract_bytes().unwrap();

        let decoded = Contract::from_sealed_standalone(c.sealed_binary().unwrap()).unwrap();
        prop_assert_eq!(decoded.extract_contract_bytes().unwrap(), payload);
    }
}
