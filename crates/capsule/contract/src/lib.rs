//! # Capsule Contract
//!
//! The contract entity and everything that operates on it:
//!
//! - [`Contract`]: definition, state and transactional sections, named
//!   roles, permissions, and the new/revoking items submitted with it
//! - [`capsule`]: the `unicapsule` envelope (v3 hash references, legacy v2
//!   embedded items), signatures and content ids
//! - [`TransactionPack`]: hash-indexed resolver for co-submitted items
//! - [`Validator`]: the staged check pipeline producing a [`Verdict`]
//! - [`revision`]: revisions, splits, value splits and revocations
//! - [`ContractDelta`]: default parent/child delta checker
//!
//! ## Error tiers
//!
//! Validation problems are soft [`capsule_types::ErrorRecord`]s collected
//! into the verdict. Exceeding the quantiser budget is the only fatal
//! outcome of a check and surfaces as
//! [`capsule_quantiser::QuantiserError`].

#![deny(unsafe_code)]

pub mod capsule;
pub mod config;
pub mod contract;
pub mod delta;
pub mod error;
pub mod fields;
pub mod pack;
pub mod revision;
pub mod sections;
pub mod validation;

pub use config::ValidationConfig;
pub use contract::{Contract, RevisionId, ROLE_CREATOR, ROLE_ISSUER, ROLE_OWNER};
pub use delta::{ContractDelta, DeltaChecker, DeltaContext};
pub use error::{ConfigError, ContractError};
pub use pack::TransactionPack;
pub use revision::SplitContext;
pub use sections::{BranchId, DataMap, Definition, State, Transactional};
pub use validation::{Validator, Verdict};

/// Highest api level this engine understands.
pub const MAX_API_LEVEL: u32 = 3;
