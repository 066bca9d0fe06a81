use capsule_crypto::KeyStrength;
use std::fmt;

/// Priced operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuantiserProcess {
    CheckStandardSignature,
    CheckStrongSignature,
    ApplicablePermission,
    SplitJoinPermission,
    RegisterVersion,
    RevokeVersion,
    CheckReferencedVersion,
}

impl QuantiserProcess {
    pub fn cost(&self) -> u64 {
        match self {
            Self::CheckStandardSignature => 1,
            Self::CheckStrongSignature => 8,
            Self::ApplicablePermission => 1,
            Self::SplitJoinPermission => 2,
            Self::RegisterVersion => 20,
            Self::RevokeVersion => 20,
            Self::CheckReferencedVersion => 1,
        }
    }

    /// Verification price for a key of the given strength.
    pub fn signature_check(strength: KeyStrength) -> Self {
        match strength {
            KeyStrength::Standard => Self::CheckStandardSignature,
            KeyStrength::Strong => Self::CheckStrongSignature,
        }
    }
}

impl fmt::Display for QuantiserProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CheckStandardSignature => "check_standard_signature",
            Self::CheckStrongSignature => "check_strong_signature",
            Self::ApplicablePermission => "applicable_permission",
            Self::SplitJoinPermission => "split_join_permission",
            Self::RegisterVersion => "register_version",
            Self::RevokeVersion => "revoke_version",
            Self::CheckReferencedVersion => "check_referenced_version",
        };
        f.write_str(s)
    }
}
