//! Adversarial test: forged provenance and unauthorised changes.
//!
//! A revision cannot claim a parent it does not carry, an origin that is
//! not its parent's, or an owner change its signers were never granted.
//! Sharing an origin grants no right to revoke another owner's revision.

use capsule_conformance::{dec, key, sealed_token, AMOUNT};
use capsule_contract::Contract;
use capsule_crypto::HashId;
use capsule_types::ErrorCode;

fn has(contract: &Contract, code: ErrorCode, object: &str) -> bool {
    contract
        .errors()
        .iter()
        .any(|e| e.code == code && e.object_name == object)
}

#[test]
fn revision_without_its_parent_is_bad_ref() {
    let k = key(70);
    let token = sealed_token(&k, "10").unwrap();
    let mut revision = token.create_revision_with_keys(&[k.clone()]).unwrap();
    revision.seal().unwrap();

    // Decoded alone, the parent referenced by hash cannot be resolved.
    let mut decoded = Contract::from_sealed_standalone(revision.sealed_binary().unwrap()).unwrap();
    assert!(decoded.revoking_items().is_empty());
    assert!(!decoded.check("").unwrap());
    assert!(has(&decoded, ErrorCode::BadRef, "parent"));
}

#[test]
fn forged_parent_is_bad_ref() {
    let k = key(71);
    let token = sealed_token(&k, "10").unwrap();
    let mut revision = token.create_revision_with_keys(&[k.clone()]).unwrap();
    revision.state_mut().parent = Some(HashId::of(b"someone else's contract"));

    assert!(!revision.check("").unwrap());
    assert!(has(&revision, ErrorCode::BadRef, "parent"));
}

#[test]
fn forged_origin_is_rejected() {
    let k = key(72);
    let token = sealed_token(&k, "10").unwrap();
    let mut revision = token.create_revision_with_keys(&[k.clone()]).unwrap();
    revision.state_mut().origin = Some(HashId::of(b"another chain"));

    assert!(!revision.check("").unwrap());
    assert!(has(&revision, ErrorCode::BadValue, "state.origin"));
}

#[test]
fn stranger_cannot_take_ownership() {
    let owner = key(73);
    let stranger = key(74);
    let token = sealed_token(&owner, "10").unwrap();

    let mut revision = token.create_revision_with_keys(&[stranger.clone()]).unwrap();
    revision.set_owner_keys([stranger.public_key()]);

    assert!(!revision.check("").unwrap());
    assert!(has(&revision, ErrorCode::Forbidden, "state.owner"));
}

#[test]
fn owner_can_hand_over() {
    let owner = key(75);
    let buyer = key(76);
    let token = sealed_token(&owner, "10").unwrap();

    let mut revision = token.create_revision_with_keys(&[owner.clone()]).unwrap();
    revision.set_owner_keys([buyer.public_key()]);
    assert!(revision.check("").unwrap(), "{:?}", revision.errors());
    revision.seal().unwrap();

    // The new owner may now change the owner again; the old one may not.
    let mut back = revision.create_revision_with_keys(&[owner.clone()]).unwrap();
    back.set_owner_keys([owner.public_key()]);
    assert!(!back.check("").unwrap());
    assert!(has(&back, ErrorCode::Forbidden, "state.owner"));

    let mut onward = revision.create_revision_with_keys(&[buyer.clone()]).unwrap();
    onward.set_owner_keys([key(77).public_key()]);
    assert!(onward.check("").unwrap(), "{:?}", onward.errors());
}

#[test]
fn definition_cannot_change() {
    let k = key(78);
    let token = sealed_token(&k, "10").unwrap();
    let mut revision = token.create_revision_with_keys(&[k.clone()]).unwrap();
    revision
        .definition_mut()
        .data
        .insert("name".to_string(), serde_json::json!("renamed"));

    assert!(!revision.check("").unwrap());
    assert!(has(&revision, ErrorCode::Forbidden, "definition"));
}

#[test]
fn same_origin_does_not_grant_revocation() {
    let owner = key(79);
    let victim = key(81);
    let token = sealed_token(&owner, "100").unwrap();

    let mut left = token.create_revision_with_keys(&[owner.clone()]).unwrap();
    left.split_value(AMOUNT, dec("30").unwrap())
        .unwrap()
        .set_owner_keys([victim.public_key()]);
    left.seal().unwrap();
    let sold = left.new_items()[0].clone();

    // The old owner folds the sold half back into their own.
    let mut joined = left.create_revision_with_keys(&[owner.clone()]).unwrap();
    joined.set_field("state.data.amount", serde_json::json!("100")).unwrap();
    joined.add_revoking_item(sold).unwrap();

    assert!(!joined.check("").unwrap());
    assert!(has(&joined, ErrorCode::Forbidden, "revokingItem"));
}

