//! End-to-end test: items submitted together must have distinct revision ids.

use capsule_conformance::{issue_token, key, sealed_token};
use capsule_types::ErrorCode;

#[test]
fn colliding_revisions_are_rejected() -> anyhow::Result<()> {
    let k = key(30);
    let base = sealed_token(&k, "10")?;

    let mut carrier = issue_token(&k, "1")?;
    carrier.add_new_item(base.create_revision_with_keys(&[k.clone()])?);
    carrier.add_new_item(base.create_revision_with_keys(&[k.clone()])?);

    assert!(!carrier.check("")?);
    assert!(carrier.errors().iter().any(|e| {
        e.code == ErrorCode::BadValue && e.message.starts_with("duplicated revision id")
    }));
    Ok(())
}

#[test]
fn split_siblings_do_not_collide() -> anyhow::Result<()> {
    let k = key(31);
    let base = sealed_token(&k, "10")?;
    let mut revision = base.create_revision_with_keys(&[k.clone()])?;
    revision.split(3)?;

    let ids: std::collections::BTreeSet<_> = std::iter::once(&revision)
        .chain(revision.new_items())
        .filter_map(|c| c.revision_id())
        .collect();
    assert_eq!(ids.len(), 4);
    Ok(())
}
