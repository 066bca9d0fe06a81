//! End-to-end test: splitting a token's value and joining it back.
//!
//! Verifies that:
//! - a conserving split passes for both halves
//! - an overdrawn split fails for both halves through the delta checker
//! - a join of two halves of the same token restores the balance
//! - a split that leaves every sibling with the full value fails
//! - a sibling taken out of its tree still checks against its split

use capsule_conformance::{amount_of, dec, key, sealed_token, AMOUNT};
use capsule_contract::Validator;
use capsule_types::ErrorCode;
use serde_json::json;

#[test]
fn conserving_split_passes() -> anyhow::Result<()> {
    let owner = key(10);
    let token = sealed_token(&owner, "100")?;

    let mut revision = token.create_revision_with_keys(&[owner.clone()])?;
    let sibling = revision.split_value(AMOUNT, dec("50")?)?;
    assert_eq!(sibling.state_data()[AMOUNT], json!("50"));
    assert_eq!(revision.state_data()[AMOUNT], json!("50"));

    // The sibling is checked as a new item of the revision.
    assert!(revision.check("")?, "{:?}", revision.errors());

    let tree = revision.contracts_in_tree();
    let verdict = Validator::default().check_in_tree(&revision.new_items()[0], &tree, "")?;
    assert!(verdict.ok, "{:?}", verdict.errors);
    Ok(())
}

#[test]
fn overdrawn_split_fails() -> anyhow::Result<()> {
    let owner = key(11);
    let token = sealed_token(&owner, "100")?;

    let mut revision = token.create_revision_with_keys(&[owner.clone()])?;
    revision.split_value(AMOUNT, dec("550")?)?;
    assert_eq!(revision.state_data()[AMOUNT], json!("-450"));

    assert!(!revision.check("")?);
    let errors = revision.errors();
    assert!(errors
        .iter()
        .any(|e| e.code == ErrorCode::Forbidden && e.object_name == "state.data.amount"));
    assert!(errors
        .iter()
        .any(|e| e.code == ErrorCode::Forbidden && e.object_name == "new[0].state.data.amount"));

    let tree = revision.contracts_in_tree();
    let verdict = Validator::default().check_in_tree(&revision.new_items()[0], &tree, "")?;
    assert!(!verdict.ok);
    Ok(())
}

#[test]
fn split_then_join_restores_balance() -> anyhow::Result<()> {
    let owner = key(12);
    let token = sealed_token(&owner, "100")?;

    let mut left = token.create_revision_with_keys(&[owner.clone()])?;
    left.split_value(AMOUNT, dec("30")?)?;
    left.seal()?;
    let right = left.new_items()[0].clone();
    assert_eq!(amount_of(&left)?, dec("70")?);
    assert_eq!(amount_of(&right)?, dec("30")?);

    let mut joined = left.create_revision_with_keys(&[owner.clone()])?;
    joined.set_field("state.data.amount", json!("100"))?;
    joined.add_revoking_item(right)?;

    assert!(joined.check("")?, "{:?}", joined.errors());
    assert_eq!(amount_of(&joined)?, amount_of(&token)?);
    Ok(())
}

#[test]
fn join_must_add_up() -> anyhow::Result<()> {
    let owner = key(13);
    let token = sealed_token(&owner, "100")?;

    let mut left = token.create_revision_with_keys(&[owner.clone()])?;
    left.split_value(AMOUNT, dec("30")?)?;
    left.seal()?;

    let mut joined = left.create_revision_with_keys(&[owner.clone()])?;
    joined.set_field("state.data.amount", json!("130"))?;
    joined.add_revoking_item(left.new_items()[0].clone())?;

    assert!(!joined.check("")?);
    assert!(joined
        .errors()
        .iter()
        .any(|e| e.object_name == "state.data.amount"));
    Ok(())
}

#[test]
fn untouched_split_fails() -> anyhow::Result<()> {
    let owner = key(14);
    let token = sealed_token(&owner, "100")?;

    // Three contracts each still holding 100.
    let mut revision = token.create_revision_with_keys(&[owner.clone()])?;
    revision.split(2)?;

    assert!(!revision.check("")?);
    let errors = revision.errors();
    assert!(errors
        .iter()
        .any(|e| e.code == ErrorCode::Forbidden && e.object_name == "state.data.amount"));
    assert!(errors
        .iter()
        .any(|e| e.code == ErrorCode::Forbidden && e.object_name == "new[1].state.data.amount"));
    Ok(())
}

#[test]
fn detached_sibling_checks_alone() -> anyhow::Result<()> {
    let owner = key(15);
    let token = sealed_token(&owner, "100")?;

    let mut revision = token.create_revision_with_keys(&[owner.clone()])?;
    revision.split_value(AMOUNT, dec("30")?)?;
    revision.seal()?;

    let mut sibling = revision.new_items()[0].clone();
    assert!(sibling.revoking_items().is_empty());
    assert!(sibling.check("")?, "{:?}", sibling.errors());
    Ok(())
}

#[test]
fn detached_overdrawn_sibling_fails() -> anyhow::Result<()> {
    let owner = key(16);
    let token = sealed_token(&owner, "100")?;

    let mut revision = token.create_revision_with_keys(&[owner.clone()])?;
    revision.split_value(AMOUNT, dec("130")?)?;
    revision.seal()?;

    let mut sibling = revision.new_items()[0].clone();
    assert!(!sibling.check("")?);
    assert!(sibling
        .errors()
        .iter()
        .any(|e| e.code == ErrorCode::Forbidden && e.object_name == "state.data.amount"));
    Ok(())
}

