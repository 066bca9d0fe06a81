use super::Validator;
use crate::contract::Contract;
use capsule_types::{ErrorCode, ErrorRecord};
use chrono::{DateTime, Duration, Utc};

impl Validator {
    /// Checks that need nothing but the item itself.
    pub(super) fn basic_check(&self, item: &Contract, errors: &mut Vec<ErrorRecord>) {
        let now = self.now();
        let oldest = Duration::try_days(self.config.max_creation_age_days)
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        check_creation_time(
            item.definition().created_at,
            "definition.created_at",
            now,
            oldest,
            errors,
        );
        check_creation_time(item.state().created_at, "state.created_at", now, oldest, errors);

        if !item.expires_at().is_some_and(|at| at > now) {
            errors.push(ErrorRecord::new(
                ErrorCode::Expired,
                "state.expires_at",
                "expired or without expiry",
            ));
        }

        if item.api_level() < 1 || item.api_level() > self.config.max_api_level {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "api_level",
                format!("unsupported api level {}", item.api_level()),
            ));
        }

        if !item.owner().is_some_and(|r| r.is_valid(item.roles())) {
            errors.push(ErrorRecord::new(
                ErrorCode::MissingOwner,
                "state.owner",
                "missing owner",
            ));
        }
        if !item.issuer().is_some_and(|r| r.is_valid(item.roles())) {
            errors.push(ErrorRecord::new(
                ErrorCode::MissingIssuer,
                "state.issuer",
                "missing issuer",
            ));
        }
        if item.revision() < 1 {
            errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.revision",
                "must be positive",
            ));
        }

        match item.creator() {
            Some(creator) if creator.is_valid(item.roles()) => {
                if !item.is_signed_by(creator) {
                    errors.push(ErrorRecord::new(
                        ErrorCode::NotSigned,
                        "",
                        "missing creator signature(s)",
                    ));
                }
            }
            _ => errors.push(ErrorRecord::new(
                ErrorCode::BadValue,
                "state.created_by",
                "missing creator",
            )),
        }
    }
}

fn check_creation_time(
    created_at: DateTime<Utc>,
    field: &str,
    now: DateTime<Utc>,
    oldest: DateTime<Utc>,
    errors: &mut Vec<ErrorRecord>,
) {
    if created_at > now {
        errors.push(ErrorRecord::new(ErrorCode::BadValue, field, "in the future"));
    } else if created_at < oldest {
        errors.push(ErrorRecord::new(ErrorCode::BadValue, field, "too old"));
    }
}
