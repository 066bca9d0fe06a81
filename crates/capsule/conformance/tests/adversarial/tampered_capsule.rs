//! Adversarial test: tampered and foreign capsules.
//!
//! A flipped signature byte must not count as a signature, bytes that are
//! not a `unicapsule` must be refused at decode time, and truncated input
//! must never panic.

use capsule_conformance::{key, sealed_token};
use capsule_contract::{Contract, ContractError};
use capsule_crypto::{cbor, Blob};
use capsule_types::ErrorCode;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ForeignEnvelope {
    #[serde(rename = "type")]
    kind: String,
    version: u64,
    data: Blob,
    signatures: Vec<Blob>,
}

fn foreign(kind: &str, version: u64) -> Vec<u8> {
    cbor::encode(&ForeignEnvelope {
        kind: kind.to_string(),
        version,
        data: Blob::from(vec![0xa0]),
        signatures: Vec::new(),
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Tests: Signatures
// ---------------------------------------------------------------------------

#[test]
fn flipped_signature_byte_is_reported() {
    let k = key(60);
    let token = sealed_token(&k, "10").unwrap();
    let signature = token
        .find_signature_in_seal(&k.public_key())
        .unwrap()
        .expect("token is signed by its issuer");

    let mut bytes = token.sealed_binary().unwrap().to_vec();
    let start = bytes
        .windows(signature.len())
        .position(|w| w == signature.as_slice())
        .expect("signature is embedded in the capsule");
    bytes[start + signature.len() - 1] ^= 0x01;

    let mut decoded = Contract::from_sealed_standalone(&bytes).unwrap();
    let tag = format!("keytag:{}", k.public_key().tag().to_hex());
    assert!(decoded
        .errors()
        .iter()
        .any(|e| e.code == ErrorCode::BadSignature && e.object_name == tag));
    assert!(!decoded.sealed_by_keys().contains_key(&k.public_key()));

    // Without the signature the creator is simply missing.
    assert!(!decoded.check("").unwrap());
    assert!(decoded
        .errors()
        .iter()
        .any(|e| e.code == ErrorCode::NotSigned));
}

#[test]
fn signature_by_unknown_key_is_ignored() {
    let k = key(61);
    let mut token = sealed_token(&k, "10").unwrap();
    token.add_signature_to_seal(&[key(62)]).unwrap();

    let decoded = Contract::from_sealed_standalone(token.sealed_binary().unwrap()).unwrap();
    assert!(decoded.errors().is_empty());
    assert_eq!(decoded.sealed_by_keys().len(), 1);
    assert!(decoded.sealed_by_keys().contains_key(&k.public_key()));
}

#[test]
fn stripped_signatures_fail_the_check() {
    let k = key(63);
    let mut token = sealed_token(&k, "10").unwrap();
    token.remove_all_signatures().unwrap();

    let mut decoded = Contract::from_sealed_standalone(token.sealed_binary().unwrap()).unwrap();
    assert!(decoded.sealed_by_keys().is_empty());
    assert!(!decoded.check("").unwrap());
}

// ---------------------------------------------------------------------------
// Tests: Envelopes
// ---------------------------------------------------------------------------

#[test]
fn foreign_type_is_refused() {
    let result = Contract::from_sealed_standalone(&foreign("transaction", 3));
    assert!(matches!(result, Err(ContractError::WrongCapsuleType(kind)) if kind == "transaction"));
}

#[test]
fn unknown_version_is_refused() {
    let result = Contract::from_sealed_standalone(&foreign("unicapsule", 9));
    assert!(matches!(result, Err(ContractError::UnsupportedVersion(9))));
}

#[test]
fn truncated_capsule_is_malformed() {
    let token = sealed_token(&key(64), "10").unwrap();
    let bytes = token.sealed_binary().unwrap();
    for cut in [0, 1, bytes.len() / 3, bytes.len() / 2, bytes.len() - 1] {
        let result = Contract::from_sealed_standalone(&bytes[..cut]);
        assert!(
            matches!(result, Err(ContractError::Malformed(_))),
            "cut at {} decoded",
            cut
        );
    }
}
