use serde::{Deserialize, Serialize};
use std::fmt;

/// Network-wide state of an item as tracked by the voting layer.
///
/// The engine in this workspace only produces per-node verdicts; the state
/// machine that moves items between these states lives with the voting
/// collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    /// Checked locally, no consensus yet.
    Pending,
    /// Checked locally and found valid; waiting for consensus.
    PendingPositive,
    /// Checked locally and found invalid; waiting for consensus.
    PendingNegative,
    Approved,
    Declined,
    /// Unknown to this node.
    Undefined,
    /// Reserved while a transaction that creates it is being voted on.
    LockedForCreation,
    Revoked,
}

impl ItemState {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::PendingPositive | Self::PendingNegative
        )
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::PendingPositive | Self::Approved)
    }

    pub fn is_consensus_found(&self) -> bool {
        matches!(self, Self::Approved | Self::Declined | Self::Revoked)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Local vote for a verdict produced by `check`.
    pub fn from_local_verdict(ok: bool) -> Self {
        if ok {
            Self::PendingPositive
        } else {
            Self::PendingNegative
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::PendingPositive => "PENDING_POSITIVE",
            Self::PendingNegative => "PENDING_NEGATIVE",
            Self::Approved => "APPROVED",
            Self::Declined => "DECLINED",
            Self::Undefined => "UNDEFINED",
            Self::LockedForCreation => "LOCKED_FOR_CREATION",
            Self::Revoked => "REVOKED",
        };
        f.write_str(s)
    }
}
