use capsule_crypto::HashId;
use serde::{Deserialize, Serialize};

/// What a reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Another item, matched by contract id.
    Existing,
    /// The transactional section of an item submitted alongside.
    Transactional,
}

/// Constraint on another item that must travel with (or already exist
/// beside) the referencing contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub kind: ReferenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactional_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<HashId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<HashId>,
    /// Role names the candidate must be signed by.
    #[serde(default)]
    pub signed_by: Vec<String>,
    /// State data fields the candidate must carry.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl Reference {
    pub fn existing(name: impl Into<String>) -> Self {
        Self::new(name, ReferenceKind::Existing)
    }

    pub fn transactional(name: impl Into<String>, transactional_id: impl Into<String>) -> Self {
        let mut reference = Self::new(name, ReferenceKind::Transactional);
        reference.transactional_id = Some(transactional_id.into());
        reference
    }

    fn new(name: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transactional_id: None,
            contract_id: None,
            origin: None,
            signed_by: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_contract_id(mut self, id: HashId) -> Self {
        self.contract_id = Some(id);
        self
    }

    pub fn with_origin(mut self, origin: HashId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn signed_by(mut self, role: impl Into<String>) -> Self {
        self.signed_by.push(role.into());
        self
    }

    pub fn requires_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }
}
