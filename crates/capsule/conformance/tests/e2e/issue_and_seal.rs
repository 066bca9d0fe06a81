//! End-to-end test: issuing, checking and sealing a root token.
//!
//! Verifies that:
//! - a freshly issued token signed by its issuer passes the check
//! - its id is stable once sealed and survives a decode
//! - the legacy self-contained format decodes to the same contract

use capsule_conformance::{init_tracing, issue_token, key, sealed_token, AMOUNT};
use capsule_contract::{Contract, TransactionPack, Validator};
use serde_json::json;

#[test]
fn issued_token_passes_and_seals() -> anyhow::Result<()> {
    init_tracing();
    let issuer = key(1);
    let mut token = issue_token(&issuer, "100")?;

    assert!(token.check("")?, "{:?}", token.errors());
    assert!(token.processed_cost_units() >= 1);

    let id = token.seal()?;
    assert_eq!(token.id(), Some(id));
    assert!(token.check("")?);
    assert_eq!(token.id(), Some(id));
    Ok(())
}

#[test]
fn decoded_token_matches_original() -> anyhow::Result<()> {
    let issuer = key(2);
    let token = sealed_token(&issuer, "100")?;
    let decoded = Contract::from_sealed_standalone(token.sealed_binary().unwrap_or_default())?;

    assert_eq!(decoded.id(), token.id());
    assert_eq!(decoded.state_data()[AMOUNT], json!("100"));
    assert_eq!(decoded.definition().data["name"], json!("test token"));
    assert!(decoded.sealed_by_keys().contains_key(&issuer.public_key()));

    let verdict = Validator::default().check(&decoded)?;
    assert!(verdict.ok, "{:?}", verdict.errors);
    Ok(())
}

#[test]
fn legacy_capsule_carries_its_items() -> anyhow::Result<()> {
    let issuer = key(3);
    let mut token = issue_token(&issuer, "10")?;
    token.add_new_item(issue_token(&issuer, "20")?);
    token.seal_as_v2()?;

    let mut pack = TransactionPack::new();
    let decoded = Contract::from_sealed(token.sealed_binary().unwrap_or_default(), &mut pack)?;
    assert_eq!(decoded.new_items().len(), 1);
    assert_eq!(decoded.new_items()[0].state_data()[AMOUNT], json!("20"));

    let verdict = Validator::default().check(&decoded)?;
    assert!(verdict.ok, "{:?}", verdict.errors);
    Ok(())
}
