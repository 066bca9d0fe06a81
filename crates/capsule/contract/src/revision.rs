//! Revisions, splits and revocations.
//!
//! A revision is a structural copy of a sealed contract that points back at
//! it (`parent`, `origin`) and revokes it. A split turns one fresh revision
//! into several sibling revisions told apart by their branch id.

use crate::contract::{now_seconds, Contract, ROLE_CREATOR};
use crate::error::ContractError;
use crate::sections::{BranchId, State, Transactional};
use bigdecimal::BigDecimal;
use capsule_crypto::PrivateKey;
use capsule_quantiser::Quantiser;
use capsule_roles::{decimal, Role};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// What every contract of one split knows about the others: the contract
/// they all revise and a snapshot of each sibling, itself included.
///
/// Lives only in memory. It is rebuilt whenever the splitting contract is
/// split, sealed or decoded, so a sibling taken out of its tree can still
/// be checked on its own.
#[derive(Debug)]
pub struct SplitContext {
    base: Option<Contract>,
    siblings: Vec<Contract>,
}

impl SplitContext {
    /// The revoked parent, when the splitting contract carried it.
    pub fn base(&self) -> Option<&Contract> {
        self.base.as_ref()
    }

    pub fn siblings(&self) -> &[Contract] {
        &self.siblings
    }
}

impl Contract {
    /// Copy into the next revision. Every field is named here so a new
    /// field cannot cross revisions unnoticed.
    fn structural_copy(&self, transactional: Option<Transactional>) -> Result<Contract, ContractError> {
        let id = self.id.ok_or(ContractError::NotSealed)?;
        let Contract {
            api_level,
            definition,
            state,
            transactional: _,
            roles,
            permissions,
            revoking_items: _,
            new_items: _,
            sealed_by_keys: _,
            keys_to_sign_with: _,
            sealed_binary: _,
            id: _,
            errors: _,
            quantiser,
            quanta_per_unit,
            split_context: _,
        } = self;

        let revision = state
            .revision
            .checked_add(1)
            .ok_or(ContractError::RevisionOverflow)?;
        let origin = if state.revision == 1 {
            id
        } else {
            state.origin.unwrap_or(id)
        };

        let copy = Contract {
            api_level: *api_level,
            definition: definition.clone(),
            state: State {
                revision,
                created_at: now_seconds(),
                expires_at: state.expires_at,
                origin: Some(origin),
                parent: Some(id),
                branch_id: None,
                data: state.data.clone(),
            },
            transactional,
            roles: roles.clone(),
            permissions: permissions.clone(),
            revoking_items: vec![self.clone()],
            new_items: Vec::new(),
            sealed_by_keys: BTreeMap::new(),
            keys_to_sign_with: BTreeMap::new(),
            sealed_binary: None,
            id: None,
            errors: Vec::new(),
            quantiser: Quantiser::new(quantiser.raw_limit()),
            quanta_per_unit: *quanta_per_unit,
            split_context: None,
        };
        debug!(parent = %id, revision, "revision created");
        Ok(copy)
    }

    /// Next revision of this sealed contract. No signer keys are carried
    /// over and the transactional section is cleared.
    pub fn create_revision(&self) -> Result<Contract, ContractError> {
        self.structural_copy(None)
    }

    /// Next revision created by `keys`: they become the creator role and
    /// the signers.
    pub fn create_revision_with_keys(&self, keys: &[PrivateKey]) -> Result<Contract, ContractError> {
        if keys.is_empty() {
            return Err(ContractError::NoKeys);
        }
        let mut copy = self.structural_copy(None)?;
        copy.roles.register(Role::keys(
            ROLE_CREATOR,
            keys.iter().map(PrivateKey::public_key),
        ));
        for key in keys {
            copy.keys_to_sign_with.insert(key.public_key(), key.clone());
        }
        Ok(copy)
    }

    /// Next revision carrying a fresh transactional section.
    pub fn create_revision_with_transactional(
        &self,
        transactional: Transactional,
    ) -> Result<Contract, ContractError> {
        self.structural_copy(Some(transactional))
    }

    fn ensure_splittable(&self, count: usize) -> Result<(), ContractError> {
        if count < 1 {
            return Err(ContractError::InvalidSplitCount(count));
        }
        match self.state.branch_id {
            Some(branch) if branch.revision == self.state.revision => {
                Err(ContractError::AlreadySplit(self.state.revision))
            }
            _ => Ok(()),
        }
    }

    /// Split into `count` additional siblings. This contract keeps branch
    /// index 0; siblings get `1..=count`, share its signer keys and are
    /// added to its new items. Returns the siblings.
    pub fn split(&mut self, count: usize) -> Result<&mut [Contract], ContractError> {
        self.ensure_splittable(count)?;
        let indices = (1..=count)
            .map(|i| u32::try_from(i).map_err(|_| ContractError::InvalidSplitCount(count)))
            .collect::<Result<Vec<_>, _>>()?;

        self.touch();
        let revision = self.state.revision;
        self.state.branch_id = Some(BranchId::new(revision, 0));

        // Siblings neither create nor revoke anything themselves.
        let existing = std::mem::take(&mut self.new_items);
        let revoked = std::mem::take(&mut self.revoking_items);
        let template = self.clone();
        self.new_items = existing;
        self.revoking_items = revoked;

        let start = self.new_items.len();
        for index in indices {
            let mut sibling = template.clone();
            sibling.state.branch_id = Some(BranchId::new(revision, index));
            self.new_items.push(sibling);
        }
        self.link_split();
        debug!(revision, count, "contract split");
        Ok(&mut self.new_items[start..])
    }

    /// The split this contract belongs to, if it was split or produced by
    /// a split.
    pub fn split_context(&self) -> Option<&SplitContext> {
        self.split_context.as_deref()
    }

    /// Rebuild the split context of this contract and of the new items that
    /// share its split. Does nothing unless this contract made a split.
    pub(crate) fn link_split(&mut self) {
        let (Some(branch), Some(parent)) = (self.state.branch_id, self.state.parent) else {
            return;
        };
        let members: Vec<usize> = self
            .new_items
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.state.parent == Some(parent)
                    && c.state
                        .branch_id
                        .is_some_and(|b| b.revision == branch.revision && b != branch)
            })
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            return;
        }

        let base = self
            .revoking_items
            .iter()
            .find(|c| c.id == Some(parent))
            .map(Contract::split_snapshot)
            .or_else(|| {
                self.split_context
                    .as_ref()
                    .and_then(|ctx| ctx.base.clone())
            });
        let mut siblings = Vec::with_capacity(members.len() + 1);
        siblings.push(self.split_snapshot());
        siblings.extend(members.iter().map(|&i| self.new_items[i].split_snapshot()));

        let context = Arc::new(SplitContext { base, siblings });
        for i in members {
            self.new_items[i].split_context = Some(Arc::clone(&context));
        }
        self.split_context = Some(context);
        trace!(revision = branch.revision, "split context linked");
    }

    /// Copy of this contract without the items submitted with it.
    fn split_snapshot(&self) -> Contract {
        Contract {
            api_level: self.api_level,
            definition: self.definition.clone(),
            state: self.state.clone(),
            transactional: self.transactional.clone(),
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
            revoking_items: Vec::new(),
            new_items: Vec::new(),
            sealed_by_keys: self.sealed_by_keys.clone(),
            keys_to_sign_with: self.keys_to_sign_with.clone(),
            sealed_binary: self.sealed_binary.clone(),
            id: self.id,
            errors: Vec::new(),
            quantiser: Quantiser::new(self.quantiser.raw_limit()),
            quanta_per_unit: self.quanta_per_unit,
            split_context: None,
        }
    }

    /// Move `amount` of the decimal field `field` into a new sibling.
    ///
    /// Only the arithmetic happens here: a negative remainder is written as
    /// is and left for the check to reject.
    pub fn split_value(&mut self, field: &str, amount: BigDecimal) -> Result<&mut Contract, ContractError> {
        self.ensure_splittable(1)?;
        let current = self
            .state
            .data
            .get(field)
            .ok_or_else(|| ContractError::FieldNotFound(format!("state.data.{}", field)))?;
        let current = decimal::from_value(current)?;
        let remainder = &current - &amount;

        self.state
            .data
            .insert(field.to_string(), Value::String(remainder.to_string()));
        self.split(1)?
            .first_mut()
            .ok_or(ContractError::InvalidSplitCount(1))?
            .state
            .data
            .insert(field.to_string(), Value::String(amount.to_string()));
        self.link_split();
        self.new_items
            .last_mut()
            .ok_or(ContractError::InvalidSplitCount(1))
    }

    /// A sealed root contract issued by `keys[0]` (signed by all of `keys`)
    /// that revokes this one.
    pub fn create_revocation(&self, keys: &[PrivateKey]) -> Result<Contract, ContractError> {
        let (first, rest) = keys.split_first().ok_or(ContractError::NoKeys)?;
        let id = self.id.ok_or(ContractError::NotSealed)?;

        let mut revocation = Contract::issue(first);
        for key in rest {
            revocation.add_signer_key(key.clone());
        }
        revocation.state.data.insert(
            "actions".to_string(),
            json!([{ "action": "remove", "id": id.to_hex() }]),
        );
        revocation.add_revoking_item(self.clone())?;
        let revocation_id = revocation.seal()?;
        debug!(revoked = %id, revocation = %revocation_id, "revocation created");
        Ok(revocation)
    }
}
