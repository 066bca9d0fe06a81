use super::Validator;
use crate::contract::Contract;
use capsule_types::{ErrorCode, ErrorRecord, Reference, ReferenceKind};

/// Is `candidate` the item `reference` points at?
fn identifies(reference: &Reference, candidate: &Contract) -> bool {
    match reference.kind {
        ReferenceKind::Transactional => {
            reference.transactional_id.is_some()
                && candidate.transactional().and_then(|t| t.id.as_ref())
                    == reference.transactional_id.as_ref()
        }
        ReferenceKind::Existing => {
            reference.contract_id.is_some() && candidate.id() == reference.contract_id
        }
    }
}

/// Errors that keep `candidate` from satisfying `reference`.
fn unmet(reference: &Reference, candidate: &Contract, object: &str) -> Vec<ErrorRecord> {
    let mut errors = Vec::new();
    if let Some(origin) = reference.origin {
        if candidate.origin() != Some(origin) {
            errors.push(ErrorRecord::new(
                ErrorCode::BadRef,
                object,
                "origin mismatch",
            ));
        }
    }
    for name in &reference.signed_by {
        match candidate.role(name) {
            None => errors.push(ErrorRecord::new(
                ErrorCode::BadRef,
                object,
                format!("role {} not found in referenced item", name),
            )),
            Some(role) if !candidate.is_signed_by(role) => errors.push(ErrorRecord::new(
                ErrorCode::BadRef,
                object,
                format!("referenced item is not signed by {}", name),
            )),
            Some(_) => {}
        }
    }
    for field in &reference.fields {
        if !candidate.state_data().contains_key(field) {
            errors.push(ErrorRecord::new(
                ErrorCode::BadRef,
                object,
                format!("referenced item has no field {}", field),
            ));
        }
    }
    errors
}

impl Validator {
    /// Every reference needs one candidate in the tree that satisfies it;
    /// the item itself counts. When none does, the reasons each candidate fell short are reported
    /// along with the failure.
    pub(super) fn check_references(
        &self,
        item: &Contract,
        tree: &[&Contract],
        errors: &mut Vec<ErrorRecord>,
    ) {
        for reference in item.references() {
            let object = format!("reference[{}]", reference.name);
            let mut reasons = Vec::new();
            let mut satisfied = false;
            for candidate in tree {
                if !identifies(reference, candidate) {
                    continue;
                }
                let missing = unmet(reference, candidate, &object);
                if missing.is_empty() {
                    satisfied = true;
                    break;
                }
                reasons.extend(missing);
            }
            if !satisfied {
                errors.extend(reasons);
                errors.push(ErrorRecord::new(
                    ErrorCode::FailedCheck,
                    object,
                    "no item satisfies the reference",
                ));
            }
        }
    }
}
