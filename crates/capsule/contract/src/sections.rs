//! Definition, state and transactional sections of a contract.

use capsule_crypto::HashId;
use capsule_types::Reference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form keyed data of a section.
pub type DataMap = BTreeMap<String, serde_json::Value>;

/// Issuance-time part of a contract. Unchanged for the whole revision
/// chain; issuer role and permissions live beside it on [`crate::Contract`].
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub data: DataMap,
    pub references: Vec<Reference>,
}

/// Per-revision part of a contract. Owner and creator roles live in the
/// contract's role registry.
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub origin: Option<HashId>,
    pub parent: Option<HashId>,
    pub branch_id: Option<BranchId>,
    pub data: DataMap,
}

/// Single-revision section used to tie items of one submission together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transactional {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl Transactional {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            references: Vec::new(),
        }
    }
}

/// Position of a revision inside a split: `<revision>:<index>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId {
    pub revision: u32,
    pub index: u32,
}

impl BranchId {
    pub fn new(revision: u32, index: u32) -> Self {
        Self { revision, index }
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.revision, self.index)
    }
}

impl FromStr for BranchId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (revision, index) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid branch id: {}", s))?;
        Ok(Self {
            revision: revision
                .parse()
                .map_err(|_| format!("invalid branch revision: {}", s))?,
            index: index
                .parse()
                .map_err(|_| format!("invalid branch index: {}", s))?,
        })
    }
}
