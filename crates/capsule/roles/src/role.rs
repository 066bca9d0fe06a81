use crate::registry::RoleRegistry;
use capsule_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Nesting bound for lists whose members link back into themselves.
const MAX_ROLE_DEPTH: usize = 16;

/// A named authorization predicate over key sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub kind: RoleKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Satisfied when every listed key is present.
    Keys { keys: BTreeSet<PublicKey> },
    /// Alias for another role of the same contract.
    Link { target: String },
    /// Quorum over sub-roles.
    List { roles: Vec<Role>, mode: ListMode },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    Any,
    All,
    Quorum(u32),
}

impl Role {
    pub fn keys(name: impl Into<String>, keys: impl IntoIterator<Item = PublicKey>) -> Self {
        Self {
            name: name.into(),
            kind: RoleKind::Keys {
                keys: keys.into_iter().collect(),
            },
        }
    }

    pub fn link(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RoleKind::Link {
                target: target.into(),
            },
        }
    }

    pub fn list(name: impl Into<String>, roles: Vec<Role>, mode: ListMode) -> Self {
        Self {
            name: name.into(),
            kind: RoleKind::List { roles, mode },
        }
    }

    /// Same role under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: self.kind.clone(),
        }
    }

    /// Follow links to a key-set or list role.
    pub fn resolve<'a>(&'a self, registry: &'a RoleRegistry) -> Option<&'a Role> {
        match &self.kind {
            RoleKind::Link { target } => registry.resolve(target),
            _ => Some(self),
        }
    }

    pub fn is_valid(&self, registry: &RoleRegistry) -> bool {
        self.is_valid_at(registry, 0)
    }

    fn is_valid_at(&self, registry: &RoleRegistry, depth: usize) -> bool {
        if depth > MAX_ROLE_DEPTH {
            return false;
        }
        let Some(role) = self.resolve(registry) else {
            return false;
        };
        match &role.kind {
            RoleKind::Keys { keys } => !keys.is_empty(),
            RoleKind::Link { .. } => false,
            RoleKind::List { roles, mode } => {
                let quorum_ok = match mode {
                    ListMode::Quorum(n) => *n >= 1 && (*n as usize) <= roles.len(),
                    _ => true,
                };
                quorum_ok
                    && !roles.is_empty()
                    && roles.iter().all(|r| r.is_valid_at(registry, depth + 1))
            }
        }
    }

    /// Can an actor holding `keys` act as this role?
    pub fn is_allowed_for_keys(&self, keys: &BTreeSet<PublicKey>, registry: &RoleRegistry) -> bool {
        self.allowed_at(keys, registry, 0)
    }

    fn allowed_at(&self, keys: &BTreeSet<PublicKey>, registry: &RoleRegistry, depth: usize) -> bool {
        if depth > MAX_ROLE_DEPTH {
            return false;
        }
        let Some(role) = self.resolve(registry) else {
            return false;
        };
        match &role.kind {
            RoleKind::Keys { keys: required } => {
                !required.is_empty() && required.iter().all(|k| keys.contains(k))
            }
            RoleKind::Link { .. } => false,
            RoleKind::List { roles, mode } => {
                let satisfied = roles
                    .iter()
                    .filter(|r| r.allowed_at(keys, registry, depth + 1))
                    .count();
                match mode {
                    ListMode::Any => satisfied >= 1,
                    ListMode::All => !roles.is_empty() && satisfied == roles.len(),
                    ListMode::Quorum(n) => *n >= 1 && satisfied >= *n as usize,
                }
            }
        }
    }

    /// Every key reachable from this role.
    pub fn key_set(&self, registry: &RoleRegistry) -> BTreeSet<PublicKey> {
        let mut out = BTreeSet::new();
        self.collect_keys(registry, &mut out, 0);
        out
    }

    fn collect_keys(&self, registry: &RoleRegistry, out: &mut BTreeSet<PublicKey>, depth: usize) {
        if depth > MAX_ROLE_DEPTH {
            return;
        }
        let Some(role) = self.resolve(registry) else {
            return;
        };
        match &role.kind {
            RoleKind::Keys { keys } => out.extend(keys.iter().cloned()),
            RoleKind::Link { .. } => {}
            RoleKind::List { roles, .. } => {
                for r in roles {
                    r.collect_keys(registry, out, depth + 1);
                }
            }
        }
    }

    /// Do both roles resolve to the same keys?
    pub fn equal_keys(&self, other: &Role, registry: &RoleRegistry) -> bool {
        let mine = self.key_set(registry);
        !mine.is_empty() && mine == other.key_set(registry)
    }
}
