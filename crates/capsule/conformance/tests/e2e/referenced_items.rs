//! End-to-end test: references to other items of the same submission.

use capsule_conformance::{issue_token, key, sealed_token};
use capsule_contract::ROLE_OWNER;
use capsule_types::{ErrorCode, Reference};

#[test]
fn reference_to_item_without_required_role_fails() -> anyhow::Result<()> {
    let k = key(20);
    let target = sealed_token(&k, "5")?;
    let target_id = target.id().ok_or_else(|| anyhow::anyhow!("target not sealed"))?;

    let mut item = issue_token(&k, "1")?;
    item.add_reference(
        Reference::existing("approval")
            .with_contract_id(target_id)
            .signed_by("auditor"),
    );
    item.add_new_item(target);

    assert!(!item.check("")?);
    let errors = item.errors();
    assert!(errors.iter().any(|e| e.code == ErrorCode::BadRef));
    assert!(errors
        .iter()
        .any(|e| e.code == ErrorCode::FailedCheck && e.object_name == "reference[approval]"));
    Ok(())
}

#[test]
fn reference_satisfied_by_co_submitted_item() -> anyhow::Result<()> {
    let k = key(21);
    let target = sealed_token(&k, "5")?;
    let target_id = target.id().ok_or_else(|| anyhow::anyhow!("target not sealed"))?;

    let mut item = issue_token(&k, "1")?;
    item.add_reference(
        Reference::existing("payment")
            .with_contract_id(target_id)
            .signed_by(ROLE_OWNER)
            .requires_field("amount"),
    );
    item.add_new_item(target);

    assert!(item.check("")?, "{:?}", item.errors());
    Ok(())
}

#[test]
fn transactional_pairing() -> anyhow::Result<()> {
    let k = key(22);
    let mut first = issue_token(&k, "1")?;
    first.create_transactional_section("swap-1");
    let mut second = issue_token(&k, "2")?;
    second
        .create_transactional_section("swap-2")
        .references
        .push(Reference::transactional("counterpart", "swap-1"));
    second.add_new_item(first);

    assert!(second.check("")?, "{:?}", second.errors());
    Ok(())
}

#[test]
fn reference_without_contract_id_matches_nothing() -> anyhow::Result<()> {
    let k = key(23);
    let target = sealed_token(&k, "5")?;

    let mut item = issue_token(&k, "1")?;
    item.add_reference(Reference::existing("anything").signed_by(ROLE_OWNER));
    item.add_new_item(target);

    assert!(!item.check("")?);
    assert!(item
        .errors()
        .iter()
        .any(|e| e.code == ErrorCode::FailedCheck && e.object_name == "reference[anything]"));
    Ok(())
}

