//! # Capsule Conformance
//!
//! Fixtures shared by the suites under `tests/`:
//!
//! - `e2e_tests`: issuance, revisions, splits and joins, references,
//!   transaction packs and revocations, checked end to end
//! - `property_tests`: idempotence, codec round trips, provenance chains,
//!   split conservation and budget monotonicity
//! - `adversarial_tests`: tampered signatures, foreign envelopes, budget
//!   exhaustion and forged provenance

use bigdecimal::BigDecimal;
use capsule_contract::{Contract, ContractError, ROLE_OWNER};
use capsule_crypto::PrivateKey;
use capsule_roles::{Permission, Role, SplitJoinParams};
use tracing_subscriber::EnvFilter;

/// Field holding a token's balance.
pub const AMOUNT: &str = "amount";

/// Deterministic key for a test actor.
pub fn key(seed: u8) -> PrivateKey {
    PrivateKey::from_seed(&[seed; 32])
}

/// Exact decimal from text.
pub fn dec(text: &str) -> Result<BigDecimal, ContractError> {
    Ok(capsule_roles::decimal::parse(text)?)
}

/// Unsealed root token issued by `issuer` holding `amount`, whose owner may
/// split and join the amount.
pub fn issue_token(issuer: &PrivateKey, amount: &str) -> Result<Contract, ContractError> {
    let mut token = Contract::issue(issuer);
    token
        .state_data_mut()
        .insert(AMOUNT.to_string(), serde_json::Value::String(amount.to_string()));
    token
        .definition_mut()
        .data
        .insert("name".to_string(), serde_json::json!("test token"));
    token.add_permission(Permission::split_join(
        Role::link("@split_join", ROLE_OWNER),
        SplitJoinParams::new(AMOUNT),
    ))?;
    Ok(token)
}

/// [`issue_token`], sealed.
pub fn sealed_token(issuer: &PrivateKey, amount: &str) -> Result<Contract, ContractError> {
    let mut token = issue_token(issuer, amount)?;
    token.seal()?;
    Ok(token)
}

/// Balance of a token as an exact decimal.
pub fn amount_of(token: &Contract) -> Result<BigDecimal, ContractError> {
    let value = token
        .state_data()
        .get(AMOUNT)
        .ok_or_else(|| ContractError::FieldNotFound(AMOUNT.to_string()))?;
    Ok(capsule_roles::decimal::from_value(value)?)
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

