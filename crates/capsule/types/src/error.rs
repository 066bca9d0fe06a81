use serde::{Deserialize, Serialize};
use std::fmt;

/// Soft validation error codes.
///
/// These are collected, never thrown: a check keeps going after the first
/// one so the submitter sees every problem at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadValue,
    MissingOwner,
    MissingIssuer,
    NotSigned,
    BadSignature,
    BadRef,
    BadRevoke,
    Expired,
    FailedCheck,
    IssuerMustCreate,
    Forbidden,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadValue => "BAD_VALUE",
            Self::MissingOwner => "MISSING_OWNER",
            Self::MissingIssuer => "MISSING_ISSUER",
            Self::NotSigned => "NOT_SIGNED",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::BadRef => "BAD_REF",
            Self::BadRevoke => "BAD_REVOKE",
            Self::Expired => "EXPIRED",
            Self::FailedCheck => "FAILED_CHECK",
            Self::IssuerMustCreate => "ISSUER_MUST_CREATE",
            Self::Forbidden => "FORBIDDEN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One soft error: a code, the dotted path of the offending field and a
/// free-text detail.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: ErrorCode,
    pub object_name: String,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(code: ErrorCode, object_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            object_name: object_name.into(),
            message: message.into(),
        }
    }

    /// Re-home the record under a namespace such as `new[0].`.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.object_name = format!("{}{}", prefix, self.object_name);
        self
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.object_name.is_empty() {
            write!(f, "{}: {}", self.code, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.code, self.object_name, self.message)
        }
    }
}
