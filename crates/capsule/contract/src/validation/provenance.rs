use super::Validator;
use crate::contract::Contract;
use crate::delta::DeltaContext;
use crate::error::ContractError;
use capsule_crypto::PublicKey;
use capsule_quantiser::Quantiser;
use capsule_types::{ErrorCode, ErrorRecord};
use std::collections::BTreeSet;
use std::ptr;
use tracing::trace;

/// Does `revoked` let `keys` revoke it? A grant is charged.
fn may_revoke(
    revoked: &Contract,
    keys: &BTreeSet<PublicKey>,
    quantiser: &mut Quantiser,
) -> Result<bool, ContractError> {
    revoked
        .permissions()
        .is_permitted("revoke", keys, revoked.roles(), quantiser)
        .map_err(ContractError::from)
}

fn revoke_forbidden(revoked: &Contract) -> ErrorRecord {
    let target = revoked
        .id()
        .map(|id| id.to_hex())
        .unwrap_or_else(|| "unsealed item".to_string());
    ErrorRecord::new(
        ErrorCode::Forbidden,
        "revokingItem",
        format!("revocation not permitted for {}", target),
    )
}

impl Validator {
    /// Checks for the first revision of a chain.
    pub(super) fn check_root(
        &self,
        item: &Contract,
        quantiser: &mut Quantiser,
        errors: &mut Vec<ErrorRecord>,
    ) -> Result<(), ContractError> {
        let roles = item.roles();
        if let (Some(issuer), Some(creator)) = (item.issuer(), item.creator()) {
            if issuer.is_valid(roles) && !creator.equal_keys(issuer, roles) {
                errors.push(ErrorRecord::new(
                    ErrorCode::IssuerMustCreate,
                    "state.created_by",
                    "issuer must create",
                ));
            }
        }
        if item.revision() != 1 {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.revision",
                "must be 1 in a root contract",
            ));
        }
        if item.parent().is_some() {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.parent",
                "must be empty in a root contract",
            ));
        }
        if item.state().created_at != item.definition().created_at {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.created_at",
                "must equal definition.created_at in a root contract",
            ));
        }

        let issuer_keys = item
            .issuer()
            .map(|issuer| issuer.key_set(roles))
            .unwrap_or_default();
        for revoked in item.revoking_items() {
            if !may_revoke(revoked, &issuer_keys, quantiser)? {
                errors.push(revoke_forbidden(revoked));
            }
        }
        Ok(())
    }

    /// Checks for a later revision: find the parent, check the other
    /// revoked items, and run the delta checker.
    pub(super) fn check_changed(
        &self,
        item: &Contract,
        tree: &[&Contract],
        quantiser: &mut Quantiser,
        errors: &mut Vec<ErrorRecord>,
    ) -> Result<(), ContractError> {
        let Some(parent_id) = item.parent() else {
            errors.push(ErrorRecord::new(
                ErrorCode::BadRef,
                "parent",
                "missing parent reference",
            ));
            return Ok(());
        };

        let parent = item
            .revoking_items()
            .iter()
            .find(|c| c.id() == Some(parent_id))
            .or_else(|| {
                item.split_context()
                    .and_then(|ctx| ctx.base())
                    .filter(|base| base.id() == Some(parent_id))
            })
            .or_else(|| {
                // Only a split sibling may find its parent outside its own
                // revoking items.
                item.state()
                    .branch_id
                    .and_then(|_| tree.iter().copied().find(|c| c.id() == Some(parent_id)))
            });
        let Some(parent) = parent else {
            errors.push(ErrorRecord::new(
                ErrorCode::BadRef,
                "parent",
                format!("parent {} not found", parent_id),
            ));
            return Ok(());
        };

        if parent.origin() != item.state().origin {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.origin",
                "does not match the parent's origin",
            ));
        }

        let signers = item.signer_keys();
        for revoked in item.revoking_items() {
            if revoked.id() != Some(parent_id) && !may_revoke(revoked, &signers, quantiser)? {
                errors.push(revoke_forbidden(revoked));
            }
        }

        let siblings = split_siblings(item, tree);
        trace!(siblings = siblings.len(), "running delta checker");
        let ctx = DeltaContext {
            parent,
            child: item,
            siblings: &siblings,
        };
        errors.extend(self.delta.check(&ctx, quantiser)?);
        Ok(())
    }
}

/// Contracts of the split `item` belongs to, `item` first. Items in the
/// tree win over the snapshots kept in the split context.
fn split_siblings<'a>(item: &'a Contract, tree: &[&'a Contract]) -> Vec<&'a Contract> {
    let mut siblings = vec![item];
    let Some(branch) = item.state().branch_id else {
        return siblings;
    };
    for candidate in tree {
        if ptr::eq(*candidate, item) || siblings.iter().any(|s| ptr::eq(*s, *candidate)) {
            continue;
        }
        let same_split = candidate.parent() == item.parent()
            && candidate
                .state()
                .branch_id
                .is_some_and(|b| b.revision == branch.revision);
        if same_split {
            siblings.push(*candidate);
        }
    }
    if let Some(ctx) = item.split_context() {
        for snapshot in ctx.siblings() {
            let branch = snapshot.state().branch_id;
            let known = siblings.iter().any(|s| s.state().branch_id == branch);
            if !known && snapshot.parent() == item.parent() {
                siblings.push(snapshot);
            }
        }
    }
    siblings
}
