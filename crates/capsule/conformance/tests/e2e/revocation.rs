//! End-to-end test: revoking a token.

use capsule_conformance::{key, sealed_token};
use capsule_types::ErrorCode;
use std::collections::BTreeSet;

#[test]
fn owner_revocation_passes() -> anyhow::Result<()> {
    let owner = key(50);
    let token = sealed_token(&owner, "1")?;
    assert!(token.can_be_revoked_by(&BTreeSet::from([owner.public_key()])));

    let mut revocation = token.create_revocation(&[owner.clone()])?;
    assert!(revocation.check("")?, "{:?}", revocation.errors());
    Ok(())
}

#[test]
fn stranger_revocation_is_forbidden() -> anyhow::Result<()> {
    let token = sealed_token(&key(51), "1")?;
    let stranger = key(52);
    assert!(!token.can_be_revoked_by(&BTreeSet::from([stranger.public_key()])));

    let mut revocation = token.create_revocation(&[stranger])?;
    assert!(!revocation.check("")?);
    assert!(revocation
        .errors()
        .iter()
        .any(|e| e.code == ErrorCode::Forbidden && e.object_name == "revokingItem"));
    Ok(())
}
