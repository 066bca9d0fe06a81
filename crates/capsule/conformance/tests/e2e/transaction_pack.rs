//! End-to-end test: shipping a revision with its parent in one pack.

use capsule_conformance::{dec, key, sealed_token, AMOUNT};
use capsule_contract::{Contract, TransactionPack};

#[test]
fn packed_revision_round_trips() -> anyhow::Result<()> {
    let k = key(40);
    let token = sealed_token(&k, "100")?;
    let mut revision = token.create_revision_with_keys(&[k.clone()])?;
    revision.seal()?;
    let expected = revision.check("")?;

    let bytes = revision.to_packed_transaction()?;
    let mut unpacked = Contract::from_packed_transaction(&bytes)?;

    assert_eq!(unpacked.id(), revision.id());
    assert_eq!(unpacked.parent(), token.id());
    assert_eq!(unpacked.revoking_items().len(), 1);
    assert_eq!(unpacked.revoking_items()[0].id(), token.id());
    assert_eq!(unpacked.check("")?, expected);
    assert!(expected);
    Ok(())
}

#[test]
fn packed_split_keeps_siblings() -> anyhow::Result<()> {
    let k = key(41);
    let token = sealed_token(&k, "100")?;
    let mut revision = token.create_revision_with_keys(&[k.clone()])?;
    revision.split_value(AMOUNT, dec("25")?)?;
    revision.seal()?;

    let pack = TransactionPack::from_contract(&revision)?;
    assert_eq!(pack.references().count(), 2);

    let mut unpacked = Contract::from_packed_transaction(&pack.pack()?)?;
    assert_eq!(unpacked.new_items().len(), 1);
    assert!(unpacked.check("")?, "{:?}", unpacked.errors());
    Ok(())
}
