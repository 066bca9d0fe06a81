//! The check pipeline.
//!
//! One check runs these stages over an item, in order:
//!
//! 1. charge the quantiser for the item's signatures, its registration, its
//!    revoking items and its references;
//! 2. basic checks (timestamps, expiry, api level, roles, creator
//!    signature);
//! 3. root checks, or parent resolution plus the delta checker for a
//!    changed contract;
//! 4. every new item, recursively, on the remaining budget;
//! 5. revision id uniqueness among the item and its new items;
//! 6. references against the submission tree.
//!
//! Soft errors are collected throughout. Only a quantiser breach stops the
//! pipeline.

mod basic;
mod provenance;
mod references;

use crate::config::ValidationConfig;
use crate::contract::Contract;
use crate::delta::{ContractDelta, DeltaChecker};
use crate::error::ContractError;
use capsule_quantiser::{Quantiser, QuantiserError, QuantiserProcess};
use capsule_types::{ErrorCode, ErrorRecord, ItemState};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

/// Outcome of checking one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    pub errors: Vec<ErrorRecord>,
    /// Quanta spent.
    pub quanta: u64,
    /// Quanta in network cost units.
    pub cost_units: u64,
}

impl Verdict {
    /// This node's vote for the voting layer.
    pub fn item_state(&self) -> ItemState {
        ItemState::from_local_verdict(self.ok)
    }

    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// Runs the check pipeline.
pub struct Validator {
    config: ValidationConfig,
    delta: Box<dyn DeltaChecker>,
    now: Option<DateTime<Utc>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            delta: Box::new(ContractDelta),
            now: None,
        }
    }

    pub fn with_delta_checker(mut self, delta: Box<dyn DeltaChecker>) -> Self {
        self.delta = delta;
        self
    }

    /// Check as of a fixed time instead of the wall clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Check `item` against everything it carries.
    pub fn check(&self, item: &Contract) -> Result<Verdict, QuantiserError> {
        let tree = item.contracts_in_tree();
        self.check_in_tree(item, &tree, "")
    }

    /// Check `item` against an explicit submission tree, e.g. a split
    /// sibling against the tree of the contract it was split from.
    pub fn check_in_tree(
        &self,
        item: &Contract,
        tree: &[&Contract],
        prefix: &str,
    ) -> Result<Verdict, QuantiserError> {
        let mut quantiser = Quantiser::new(self.config.quanta_limit);
        let errors = self.check_item(item, tree, prefix, &mut quantiser)?;
        Ok(Verdict {
            ok: errors.is_empty(),
            errors,
            quanta: quantiser.quanta_sum(),
            cost_units: quantiser.cost_in_units(self.config.quanta_per_unit),
        })
    }

    pub(crate) fn check_item(
        &self,
        item: &Contract,
        tree: &[&Contract],
        prefix: &str,
        quantiser: &mut Quantiser,
    ) -> Result<Vec<ErrorRecord>, QuantiserError> {
        debug!(revision = item.revision(), prefix, "check started");
        charge_item(item, quantiser)?;

        let mut errors = Vec::new();
        self.basic_check(item, &mut errors);

        let stage = if item.is_root() {
            self.check_root(item, quantiser, &mut errors)
        } else {
            self.check_changed(item, tree, quantiser, &mut errors)
        };
        absorb(stage, &mut errors)?;

        for (index, new_item) in item.new_items().iter().enumerate() {
            let mut child = quantiser.child();
            let outcome = self.check_item(new_item, tree, "", &mut child);
            quantiser.add_work_cost_from(&child)?;
            let nested = outcome?;
            let namespace = format!("new[{}].", index);
            errors.extend(nested.into_iter().map(|e| e.with_prefix(&namespace)));
        }

        check_dupes(item, &mut errors);
        self.check_references(item, tree, &mut errors);

        let errors: Vec<ErrorRecord> = errors.into_iter().map(|e| e.with_prefix(prefix)).collect();
        debug!(
            revision = item.revision(),
            errors = errors.len(),
            quanta = quantiser.quanta_sum(),
            "check finished"
        );
        Ok(errors)
    }
}

/// Up-front cost of an item, charged before any work on it.
fn charge_item(item: &Contract, quantiser: &mut Quantiser) -> Result<(), QuantiserError> {
    for key in item.sealed_by_keys().keys() {
        quantiser.add_work_cost(QuantiserProcess::signature_check(key.strength()))?;
    }
    quantiser.add_work_cost(QuantiserProcess::RegisterVersion)?;
    for revoked in item.revoking_items() {
        for key in revoked.sealed_by_keys().keys() {
            quantiser.add_work_cost(QuantiserProcess::signature_check(key.strength()))?;
        }
        quantiser.add_work_cost(QuantiserProcess::RevokeVersion)?;
    }
    for _ in item.references() {
        quantiser.add_work_cost(QuantiserProcess::CheckReferencedVersion)?;
    }
    Ok(())
}

/// Turn a stage failure into a soft error, letting a budget breach through.
fn absorb(
    stage: Result<(), ContractError>,
    errors: &mut Vec<ErrorRecord>,
) -> Result<(), QuantiserError> {
    match stage {
        Ok(()) => Ok(()),
        Err(ContractError::Quantiser(e)) => Err(e),
        Err(e) => {
            errors.push(ErrorRecord::new(ErrorCode::FailedCheck, "", e.to_string()));
            Ok(())
        }
    }
}

fn check_dupes(item: &Contract, errors: &mut Vec<ErrorRecord>) {
    let mut seen = BTreeSet::new();
    for contract in std::iter::once(item).chain(item.new_items()) {
        // An unsealed root has no origin yet and cannot collide.
        let Some(revision_id) = contract.revision_id() else {
            continue;
        };
        if !seen.insert(revision_id.clone()) {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "",
                format!("duplicated revision id: {}", revision_id),
            ));
        }
    }
}
