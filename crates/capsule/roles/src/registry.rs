use crate::error::RoleError;
use crate::role::{Role, RoleKind};
use capsule_crypto::PublicKey;
use std::collections::{BTreeMap, BTreeSet};

/// Named roles of one contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleRegistry {
    roles: BTreeMap<String, Role>,
}

impl RoleRegistry {
    /// Insert or replace a role under its own name.
    pub fn register(&mut self, role: Role) -> Option<Role> {
        self.roles.insert(role.name.clone(), role)
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Follow links from `name` to a key-set or list role.
    pub fn resolve(&self, name: &str) -> Option<&Role> {
        self.try_resolve(name).ok()
    }

    /// Like [`RoleRegistry::resolve`] but says why resolution failed.
    pub fn try_resolve(&self, name: &str) -> Result<&Role, RoleError> {
        let mut visited = BTreeSet::new();
        let mut current = name;
        loop {
            if !visited.insert(current) {
                return Err(RoleError::LinkCycle(current.to_string()));
            }
            let role = self
                .roles
                .get(current)
                .ok_or_else(|| RoleError::UnknownRole(current.to_string()))?;
            match &role.kind {
                RoleKind::Link { target } => current = target,
                _ => return Ok(role),
            }
        }
    }

    /// Union of every key mentioned by any registered role.
    pub fn all_keys(&self) -> BTreeSet<PublicKey> {
        self.roles
            .values()
            .flat_map(|role| role.key_set(self))
            .collect()
    }
}
