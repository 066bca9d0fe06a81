use capsule_crypto::CryptoError;
use capsule_quantiser::QuantiserError;
use capsule_roles::RoleError;
use thiserror::Error;

/// Hard failures of contract operations (construction, codec, revisions).
///
/// Soft validation errors are never reported through this type.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("contract is not sealed")]
    NotSealed,

    #[error("contract is sealed; {0} must happen before sealing")]
    AlreadySealed(&'static str),

    #[error("wrong capsule type: {0}")]
    WrongCapsuleType(String),

    #[error("unsupported capsule version: {0}")]
    UnsupportedVersion(u64),

    #[error("unsupported api level: {0}")]
    UnsupportedApiLevel(i64),

    #[error("revision must be positive, got {0}")]
    BadRevision(i64),

    #[error("revision counter overflow")]
    RevisionOverflow,

    #[error("malformed capsule: {0}")]
    Malformed(String),

    #[error("contract is already split at revision {0}")]
    AlreadySplit(u32),

    #[error("invalid split count: {0}")]
    InvalidSplitCount(usize),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("field is read-only or unknown: {0}")]
    ReadOnlyField(String),

    #[error("at least one key is required")]
    NoKeys,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    Quantiser(#[from] QuantiserError),
}

/// Errors loading a [`crate::ValidationConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
