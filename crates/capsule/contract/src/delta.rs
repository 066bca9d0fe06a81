//! Parent/child delta checking.
//!
//! The validator hands every changed contract to a [`DeltaChecker`] together
//! with the parent it replaces and the siblings produced by the same split.
//! [`ContractDelta`] is the default: everything but the expected provenance
//! fields must either stay the same or be covered by a permission granted to
//! the child's signers.

use crate::contract::{Contract, ROLE_CREATOR, ROLE_ISSUER, ROLE_OWNER};
use crate::error::ContractError;
use bigdecimal::BigDecimal;
use capsule_crypto::PublicKey;
use capsule_quantiser::{Quantiser, QuantiserProcess};
use capsule_roles::{
    decimal, ChangeNumberParams, Permission, PermissionKind, Role, SplitJoinParams,
};
use capsule_types::{ErrorCode, ErrorRecord};
use std::collections::BTreeSet;
use tracing::trace;

/// Modify-data field name that covers the state expiry.
pub const EXPIRES_AT_FIELD: &str = "/expires_at";

/// What a delta checker gets to see.
pub struct DeltaContext<'a> {
    pub parent: &'a Contract,
    pub child: &'a Contract,
    /// Contracts of the same split, the child included. Just the child when
    /// it was not split.
    pub siblings: &'a [&'a Contract],
}

/// Decides whether `child` is an acceptable successor of `parent`.
///
/// Implementations charge permission use to the quantiser and return soft
/// errors; an `Err` is turned into a single `FAILED_CHECK` by the caller,
/// except a quantiser breach which aborts the check.
pub trait DeltaChecker: Send + Sync {
    fn check(
        &self,
        ctx: &DeltaContext<'_>,
        quantiser: &mut Quantiser,
    ) -> Result<Vec<ErrorRecord>, ContractError>;
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Change {
    Owner,
    ExpiresAt,
    Data(String),
}

impl Change {
    fn path(&self) -> String {
        match self {
            Change::Owner => "state.owner".to_string(),
            Change::ExpiresAt => "state.expires_at".to_string(),
            Change::Data(field) => format!("state.data.{}", field),
        }
    }
}

/// Default delta checker.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContractDelta;

impl ContractDelta {
    fn definition_changed(parent: &Contract, child: &Contract) -> bool {
        let static_roles = |c: &Contract| -> Vec<Role> {
            c.roles()
                .iter()
                .filter(|r| r.name != ROLE_OWNER && r.name != ROLE_CREATOR)
                .cloned()
                .collect()
        };
        parent.definition() != child.definition()
            || parent.api_level() != child.api_level()
            || parent.permissions() != child.permissions()
            || parent.role(ROLE_ISSUER) != child.role(ROLE_ISSUER)
            || static_roles(parent) != static_roles(child)
    }

    fn pending_changes(parent: &Contract, child: &Contract) -> BTreeSet<Change> {
        let mut changes = BTreeSet::new();

        let owner_keys = |c: &Contract| c.owner().map(|r| r.key_set(c.roles()));
        if owner_keys(parent) != owner_keys(child) {
            changes.insert(Change::Owner);
        }
        if parent.state().expires_at != child.state().expires_at {
            changes.insert(Change::ExpiresAt);
        }
        let old = parent.state_data();
        let new = child.state_data();
        for field in old.keys().chain(new.keys()) {
            if old.get(field) != new.get(field) {
                changes.insert(Change::Data(field.clone()));
            }
        }
        changes
    }

    fn decimal_field(contract: &Contract, field: &str) -> Option<BigDecimal> {
        contract
            .state_data()
            .get(field)
            .and_then(|v| decimal::from_value(v).ok())
    }

    fn integer_field(contract: &Contract, field: &str) -> Option<i64> {
        let value = contract.state_data().get(field)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    }

    fn covers_number(params: &ChangeNumberParams, ctx: &DeltaContext<'_>) -> bool {
        match (
            Self::integer_field(ctx.parent, &params.field_name),
            Self::integer_field(ctx.child, &params.field_name),
        ) {
            (Some(old), Some(new)) => params.allows(old, new),
            _ => false,
        }
    }

    fn covers_split_join(params: &SplitJoinParams, ctx: &DeltaContext<'_>) -> bool {
        let field = &params.field_name;
        let (Some(old), Some(new)) = (
            Self::decimal_field(ctx.parent, field),
            Self::decimal_field(ctx.child, field),
        ) else {
            return false;
        };

        if ctx.siblings.len() > 1 {
            // Split: siblings together hold exactly what the parent held.
            let mut sum = BigDecimal::default();
            for sibling in ctx.siblings {
                let Some(value) = Self::decimal_field(sibling, field) else {
                    return false;
                };
                if !params.accepts_value(&value) {
                    return false;
                }
                sum += value;
            }
            sum == old
        } else if new > old {
            // Join: the revoked items being merged hold exactly the new value.
            let mut sum = BigDecimal::default();
            for revoked in ctx.child.revoking_items() {
                let matches = params.join_match_fields.iter().all(|path| {
                    match (revoked.get_field(path), ctx.child.get_field(path)) {
                        (Ok(a), Ok(b)) => a == b,
                        _ => false,
                    }
                });
                if !matches {
                    continue;
                }
                if let Some(value) = Self::decimal_field(revoked, field) {
                    sum += value;
                }
            }
            sum == new && params.accepts_value(&new)
        } else {
            new == old
        }
    }

    fn apply(permission: &Permission, ctx: &DeltaContext<'_>, changes: &mut BTreeSet<Change>) {
        match &permission.kind {
            PermissionKind::ChangeOwner => {
                changes.remove(&Change::Owner);
            }
            PermissionKind::Revoke => {}
            PermissionKind::ChangeNumber(params) => {
                let change = Change::Data(params.field_name.clone());
                if changes.contains(&change) && Self::covers_number(params, ctx) {
                    changes.remove(&change);
                }
            }
            PermissionKind::SplitJoin(params) => {
                let change = Change::Data(params.field_name.clone());
                if changes.contains(&change) && Self::covers_split_join(params, ctx) {
                    changes.remove(&change);
                }
            }
            PermissionKind::ModifyData(params) => {
                if params.fields.contains_key(EXPIRES_AT_FIELD) {
                    changes.remove(&Change::ExpiresAt);
                }
                changes.retain(|change| match change {
                    Change::Data(field) => !params.allows(field, ctx.child.state_data().get(field)),
                    _ => true,
                });
            }
        }
    }
}

impl DeltaChecker for ContractDelta {
    fn check(
        &self,
        ctx: &DeltaContext<'_>,
        quantiser: &mut Quantiser,
    ) -> Result<Vec<ErrorRecord>, ContractError> {
        let (parent, child) = (ctx.parent, ctx.child);
        let mut errors = Vec::new();

        if Self::definition_changed(parent, child) {
            errors.push(ErrorRecord::new(
                ErrorCode::Forbidden,
                "definition",
                "definition must not change",
            ));
        }
        if parent.revision().checked_add(1) != Some(child.revision()) {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.revision",
                format!("must be {}", u64::from(parent.revision()) + 1),
            ));
        }
        if child.state().created_at < parent.state().created_at {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.created_at",
                "created before its parent",
            ));
        }

        let mut changes = Self::pending_changes(parent, child);
        if ctx.siblings.len() > 1 {
            // Every split-join field of a split is rechecked, changed or not.
            for permission in parent.permissions().iter() {
                if let PermissionKind::SplitJoin(params) = &permission.kind {
                    changes.insert(Change::Data(params.field_name.clone()));
                }
            }
        }
        if !changes.is_empty() {
            let signers: BTreeSet<PublicKey> = child.signer_keys();
            let names: Vec<&str> = parent.permissions().names().collect();
            for name in names {
                let granted: Vec<&Permission> = parent
                    .permissions()
                    .by_name(name)
                    .iter()
                    .filter(|p| p.role.is_allowed_for_keys(&signers, parent.roles()))
                    .collect();
                if granted.is_empty() {
                    continue;
                }
                quantiser.add_work_cost(QuantiserProcess::ApplicablePermission)?;
                if granted.iter().any(|p| p.is_split_join()) {
                    quantiser.add_work_cost(QuantiserProcess::SplitJoinPermission)?;
                }
                for permission in granted {
                    trace!(permission = name, id = ?permission.id, "applying permission");
                    Self::apply(permission, ctx, &mut changes);
                }
            }
        }

        errors.extend(changes.into_iter().map(|change| {
            ErrorRecord::new(ErrorCode::Forbidden, change.path(), "not permitted")
        }));
        Ok(errors)
    }
}
