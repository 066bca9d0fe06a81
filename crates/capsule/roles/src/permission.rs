use crate::decimal;
use crate::registry::RoleRegistry;
use crate::role::Role;
use bigdecimal::BigDecimal;
use capsule_crypto::PublicKey;
use capsule_quantiser::{Quantiser, QuantiserError, QuantiserProcess};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

const PERMISSION_ID_LEN: usize = 6;

/// A named grant bound to one role.
///
/// `id` is unique within a contract. It is the key of the permission map on
/// the wire, so it is not serialized with the body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(skip)]
    pub id: Option<String>,
    pub name: String,
    pub role: Role,
    pub kind: PermissionKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    ChangeOwner,
    Revoke,
    ChangeNumber(ChangeNumberParams),
    SplitJoin(SplitJoinParams),
    ModifyData(ModifyDataParams),
}

/// Integer field that may move within bounds and step limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNumberParams {
    pub field_name: String,
    pub min_value: i64,
    pub max_value: i64,
    pub min_step: i64,
    pub max_step: i64,
}

impl ChangeNumberParams {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            min_value: 0,
            max_value: i64::MAX,
            min_step: i64::MIN,
            max_step: i64::MAX,
        }
    }

    /// Would moving the field from `old` to `new` stay within the limits?
    pub fn allows(&self, old: i64, new: i64) -> bool {
        let Some(step) = new.checked_sub(old) else {
            return false;
        };
        new >= self.min_value
            && new <= self.max_value
            && step >= self.min_step
            && step <= self.max_step
    }
}

/// Decimal field that may be split across siblings or joined back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitJoinParams {
    pub field_name: String,
    #[serde(with = "decimal")]
    pub min_value: BigDecimal,
    #[serde(with = "decimal")]
    pub min_unit: BigDecimal,
    pub join_match_fields: Vec<String>,
}

impl SplitJoinParams {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            min_value: BigDecimal::default(),
            min_unit: BigDecimal::default(),
            join_match_fields: vec!["state.origin".to_string()],
        }
    }

    /// Value is at least `min_value` and a whole multiple of `min_unit`.
    pub fn accepts_value(&self, value: &BigDecimal) -> bool {
        if *value < self.min_value {
            return false;
        }
        let zero = BigDecimal::default();
        self.min_unit <= zero || (value % &self.min_unit) == zero
    }
}

/// State data fields that may change, optionally restricted to a list of
/// allowed values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyDataParams {
    pub fields: BTreeMap<String, Option<Vec<serde_json::Value>>>,
}

impl ModifyDataParams {
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), None);
        self
    }

    pub fn field_with_values(
        mut self,
        name: impl Into<String>,
        values: Vec<serde_json::Value>,
    ) -> Self {
        self.fields.insert(name.into(), Some(values));
        self
    }

    /// May `name` take `value`? `None` means the field was removed.
    pub fn allows(&self, name: &str, value: Option<&serde_json::Value>) -> bool {
        match self.fields.get(name) {
            None => false,
            Some(None) => true,
            Some(Some(allowed)) => match value {
                None | Some(serde_json::Value::Null) => true,
                Some(v) => allowed.contains(v),
            },
        }
    }
}

impl Permission {
    pub fn new(name: impl Into<String>, role: Role, kind: PermissionKind) -> Self {
        Self {
            id: None,
            name: name.into(),
            role,
            kind,
        }
    }

    pub fn change_owner(role: Role) -> Self {
        Self::new("change_owner", role, PermissionKind::ChangeOwner)
    }

    pub fn revoke(role: Role) -> Self {
        Self::new("revoke", role, PermissionKind::Revoke)
    }

    pub fn split_join(role: Role, params: SplitJoinParams) -> Self {
        Self::new("split_join", role, PermissionKind::SplitJoin(params))
    }

    pub fn change_number(role: Role, params: ChangeNumberParams) -> Self {
        Self::new("decrement_permission", role, PermissionKind::ChangeNumber(params))
    }

    pub fn modify_data(role: Role, params: ModifyDataParams) -> Self {
        Self::new("modify_data", role, PermissionKind::ModifyData(params))
    }

    pub fn is_split_join(&self) -> bool {
        matches!(self.kind, PermissionKind::SplitJoin(_))
    }

    /// Charge the cost of applying this permission.
    pub fn charge(&self, quantiser: &mut Quantiser) -> Result<(), QuantiserError> {
        quantiser.add_work_cost(QuantiserProcess::ApplicablePermission)?;
        if self.is_split_join() {
            quantiser.add_work_cost(QuantiserProcess::SplitJoinPermission)?;
        }
        Ok(())
    }
}

/// Multi-valued map from permission name to permissions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PermissionSet {
    by_name: BTreeMap<String, Vec<Permission>>,
}

impl PermissionSet {
    /// Attach a permission, assigning a fresh id if it has none or its id is
    /// already taken. Returns the id in use.
    pub fn add(&mut self, mut permission: Permission) -> String {
        let taken = self.ids();
        let id = match permission.id.take() {
            Some(id) if !taken.contains(id.as_str()) => id,
            _ => loop {
                let candidate = random_id();
                if !taken.contains(candidate.as_str()) {
                    break candidate;
                }
            },
        };
        permission.id = Some(id.clone());
        // Keep each list ordered by id so encoded and decoded sets compare equal.
        let list = self.by_name.entry(permission.name.clone()).or_default();
        list.push(permission);
        list.sort_by(|a, b| a.id.cmp(&b.id));
        id
    }

    pub fn by_name(&self, name: &str) -> &[Permission] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.by_name.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> BTreeSet<&str> {
        self.iter().filter_map(|p| p.id.as_deref()).collect()
    }

    /// First permission under `name` whose role accepts `keys`. No charge.
    pub fn find_permitted(
        &self,
        name: &str,
        keys: &BTreeSet<PublicKey>,
        registry: &RoleRegistry,
    ) -> Option<&Permission> {
        self.by_name(name)
            .iter()
            .find(|p| p.role.is_allowed_for_keys(keys, registry))
    }

    /// Is any permission under `name` granted to `keys`? A grant is charged.
    pub fn is_permitted(
        &self,
        name: &str,
        keys: &BTreeSet<PublicKey>,
        registry: &RoleRegistry,
        quantiser: &mut Quantiser,
    ) -> Result<bool, QuantiserError> {
        match self.find_permitted(name, keys, registry) {
            Some(permission) => {
                permission.charge(quantiser)?;
                trace!(permission = name, id = ?permission.id, "permission granted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// [`PermissionSet::is_permitted`] for the keys of a role.
    pub fn is_permitted_for_role(
        &self,
        name: &str,
        role: &Role,
        registry: &RoleRegistry,
        quantiser: &mut Quantiser,
    ) -> Result<bool, QuantiserError> {
        self.is_permitted(name, &role.key_set(registry), registry, quantiser)
    }
}

fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PERMISSION_ID_LEN)
        .map(char::from)
        .collect()
}
