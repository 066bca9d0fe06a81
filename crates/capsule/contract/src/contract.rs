use crate::config::ValidationConfig;
use crate::error::ContractError;
use crate::sections::{BranchId, DataMap, Definition, State, Transactional};
use crate::validation::Validator;
use crate::MAX_API_LEVEL;
use capsule_crypto::{ExtendedSignature, HashId, PrivateKey, PublicKey};
use crate::revision::SplitContext;
use capsule_quantiser::{Quantiser, QuantiserError, DEFAULT_QUANTA_PER_UNIT};
use capsule_roles::{Permission, PermissionSet, Role, RoleRegistry};
use capsule_types::{ErrorRecord, Reference};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

pub const ROLE_ISSUER: &str = "issuer";
pub const ROLE_OWNER: &str = "owner";
pub const ROLE_CREATOR: &str = "creator";

/// A ledger item: definition, state, optional transactional section, roles
/// and permissions, plus the items that must be approved (`new_items`) or
/// revoked (`revoking_items`) atomically with it.
///
/// The id exists only once the contract is sealed. Every mutating accessor
/// drops the cached capsule, so a changed contract has to be sealed again.
#[derive(Clone, Debug)]
pub struct Contract {
    pub(crate) api_level: u32,
    pub(crate) definition: Definition,
    pub(crate) state: State,
    pub(crate) transactional: Option<Transactional>,
    pub(crate) roles: RoleRegistry,
    pub(crate) permissions: PermissionSet,
    pub(crate) revoking_items: Vec<Contract>,
    pub(crate) new_items: Vec<Contract>,
    pub(crate) sealed_by_keys: BTreeMap<PublicKey, ExtendedSignature>,
    pub(crate) keys_to_sign_with: BTreeMap<PublicKey, PrivateKey>,
    pub(crate) sealed_binary: Option<Vec<u8>>,
    pub(crate) id: Option<HashId>,
    pub(crate) errors: Vec<ErrorRecord>,
    pub(crate) quantiser: Quantiser,
    pub(crate) quanta_per_unit: u64,
    /// Set on every contract of a split; never serialized.
    pub(crate) split_context: Option<Arc<SplitContext>>,
}

/// Identity of one revision within its chain:
/// `origin/parent/revision[/branch]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevisionId {
    pub origin: Option<HashId>,
    pub parent: Option<HashId>,
    pub revision: u32,
    pub branch: Option<BranchId>,
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = |id: &Option<HashId>| id.map(|h| h.to_hex()).unwrap_or_default();
        write!(
            f,
            "{}/{}/{}",
            hex(&self.origin),
            hex(&self.parent),
            self.revision
        )?;
        if let Some(branch) = &self.branch {
            write!(f, "/{}", branch)?;
        }
        Ok(())
    }
}

pub(crate) fn now_seconds() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

impl Contract {
    /// Root contract with issuer, owner and creator roles empty.
    ///
    /// Mostly useful to build deliberately incomplete contracts; see
    /// [`Contract::issue`] for the usual entry point.
    pub fn blank() -> Self {
        let now = now_seconds();
        Self {
            api_level: MAX_API_LEVEL,
            definition: Definition {
                created_at: now,
                expires_at: None,
                data: DataMap::new(),
                references: Vec::new(),
            },
            state: State {
                revision: 1,
                created_at: now,
                expires_at: None,
                origin: None,
                parent: None,
                branch_id: None,
                data: DataMap::new(),
            },
            transactional: None,
            roles: RoleRegistry::default(),
            permissions: PermissionSet::default(),
            revoking_items: Vec::new(),
            new_items: Vec::new(),
            sealed_by_keys: BTreeMap::new(),
            keys_to_sign_with: BTreeMap::new(),
            sealed_binary: None,
            id: None,
            errors: Vec::new(),
            quantiser: Quantiser::unlimited(),
            quanta_per_unit: DEFAULT_QUANTA_PER_UNIT,
            split_context: None,
        }
    }

    /// Root contract issued by `key` with default settings.
    pub fn issue(key: &PrivateKey) -> Self {
        Self::issue_with(key, &ValidationConfig::default())
    }

    /// Root contract issued by `key`: the issuer is the key itself, owner
    /// and creator link to the issuer, the owner may change ownership and
    /// revoke, and `key` is registered to sign.
    pub fn issue_with(key: &PrivateKey, config: &ValidationConfig) -> Self {
        let mut contract = Self::blank();
        contract.quantiser = Quantiser::new(config.quanta_limit);
        contract.quanta_per_unit = config.quanta_per_unit;
        contract
            .roles
            .register(Role::keys(ROLE_ISSUER, [key.public_key()]));
        contract.roles.register(Role::link(ROLE_OWNER, ROLE_ISSUER));
        contract.roles.register(Role::link(ROLE_CREATOR, ROLE_ISSUER));
        contract
            .permissions
            .add(Permission::change_owner(Role::link("@change_owner", ROLE_OWNER)));
        contract
            .permissions
            .add(Permission::revoke(Role::link("@revoke", ROLE_OWNER)));
        contract.state.expires_at = Duration::try_days(config.default_expiration_days)
            .and_then(|days| contract.state.created_at.checked_add_signed(days));
        contract.add_signer_key(key.clone());
        contract
    }

    /// Drop the cached capsule and everything derived from it.
    pub(crate) fn touch(&mut self) {
        self.sealed_binary = None;
        self.id = None;
        self.sealed_by_keys.clear();
    }

    // ----- Identity -----

    /// Content id; `None` until sealed.
    pub fn id(&self) -> Option<HashId> {
        self.id
    }

    /// Id of the chain root: the recorded origin, or the own id for a root.
    pub fn origin(&self) -> Option<HashId> {
        self.state.origin.or(self.id)
    }

    pub fn parent(&self) -> Option<HashId> {
        self.state.parent
    }

    pub fn revision(&self) -> u32 {
        self.state.revision
    }

    pub fn is_root(&self) -> bool {
        self.state.origin.is_none()
    }

    pub fn sealed_binary(&self) -> Option<&[u8]> {
        self.sealed_binary.as_deref()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed_binary.is_some()
    }

    /// `None` for an unsealed root, whose origin is not known yet.
    pub fn revision_id(&self) -> Option<RevisionId> {
        let origin = self.origin()?;
        Some(RevisionId {
            origin: Some(origin),
            parent: self.state.parent,
            revision: self.state.revision,
            branch: self.state.branch_id,
        })
    }

    // ----- Sections -----

    pub fn api_level(&self) -> u32 {
        self.api_level
    }

    pub fn set_api_level(&mut self, level: u32) {
        self.touch();
        self.api_level = level;
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn definition_mut(&mut self) -> &mut Definition {
        self.touch();
        &mut self.definition
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        self.touch();
        &mut self.state
    }

    pub fn state_data(&self) -> &DataMap {
        &self.state.data
    }

    pub fn state_data_mut(&mut self) -> &mut DataMap {
        self.touch();
        &mut self.state.data
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.expires_at.or(self.definition.expires_at)
    }

    pub fn set_expires_at(&mut self, at: Option<DateTime<Utc>>) {
        self.touch();
        self.state.expires_at = at;
    }

    pub fn transactional(&self) -> Option<&Transactional> {
        self.transactional.as_ref()
    }

    pub fn set_transactional(&mut self, transactional: Option<Transactional>) {
        self.touch();
        self.transactional = transactional;
    }

    /// Install a fresh transactional section and return it for filling in.
    pub fn create_transactional_section(&mut self, id: impl Into<String>) -> &mut Transactional {
        self.touch();
        self.transactional.insert(Transactional::new(id))
    }

    /// References of the definition followed by those of the transactional
    /// section.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.definition.references.iter().chain(
            self.transactional
                .iter()
                .flat_map(|t| t.references.iter()),
        )
    }

    pub fn add_reference(&mut self, reference: Reference) {
        self.touch();
        self.definition.references.push(reference);
    }

    // ----- Roles and permissions -----

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn issuer(&self) -> Option<&Role> {
        self.roles.get(ROLE_ISSUER)
    }

    pub fn owner(&self) -> Option<&Role> {
        self.roles.get(ROLE_OWNER)
    }

    pub fn creator(&self) -> Option<&Role> {
        self.roles.get(ROLE_CREATOR)
    }

    /// Register a role under its own name, replacing any previous one.
    pub fn register_role(&mut self, role: Role) {
        self.touch();
        self.roles.register(role);
    }

    pub fn set_owner_keys(&mut self, keys: impl IntoIterator<Item = PublicKey>) {
        self.register_role(Role::keys(ROLE_OWNER, keys));
    }

    pub fn set_creator_keys(&mut self, keys: impl IntoIterator<Item = PublicKey>) {
        self.register_role(Role::keys(ROLE_CREATOR, keys));
    }

    pub fn set_issuer_keys(&mut self, keys: impl IntoIterator<Item = PublicKey>) {
        self.register_role(Role::keys(ROLE_ISSUER, keys));
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Attach a permission and return its id. Permissions belong to the
    /// definition, so this is refused once the contract is sealed.
    pub fn add_permission(&mut self, permission: Permission) -> Result<String, ContractError> {
        if self.is_sealed() {
            return Err(ContractError::AlreadySealed("adding a permission"));
        }
        Ok(self.permissions.add(permission))
    }

    /// Would `keys` be allowed to revoke this contract? No charge.
    pub fn can_be_revoked_by(&self, keys: &BTreeSet<PublicKey>) -> bool {
        self.permissions
            .find_permitted("revoke", keys, &self.roles)
            .is_some()
    }

    // ----- Signing -----

    pub fn add_signer_key(&mut self, key: PrivateKey) {
        self.touch();
        self.keys_to_sign_with.insert(key.public_key(), key);
    }

    pub fn keys_to_sign_with(&self) -> impl Iterator<Item = &PrivateKey> {
        self.keys_to_sign_with.values()
    }

    pub fn sealed_by_keys(&self) -> &BTreeMap<PublicKey, ExtendedSignature> {
        &self.sealed_by_keys
    }

    /// Keys that signed the capsule, or, when nothing verified a capsule,
    /// the keys registered to sign it.
    pub fn signer_keys(&self) -> BTreeSet<PublicKey> {
        if self.sealed_by_keys.is_empty() {
            self.keys_to_sign_with.keys().cloned().collect()
        } else {
            self.sealed_by_keys.keys().cloned().collect()
        }
    }

    pub fn is_signed_by(&self, role: &Role) -> bool {
        role.is_allowed_for_keys(&self.signer_keys(), &self.roles)
    }

    // ----- Linked items -----

    pub fn revoking_items(&self) -> &[Contract] {
        &self.revoking_items
    }

    pub fn new_items(&self) -> &[Contract] {
        &self.new_items
    }

    pub fn new_items_mut(&mut self) -> &mut [Contract] {
        self.touch();
        &mut self.new_items
    }

    /// Revoke `item` together with this contract. Only sealed items can be
    /// revoked since they are referenced by id.
    pub fn add_revoking_item(&mut self, item: Contract) -> Result<(), ContractError> {
        if item.id.is_none() {
            return Err(ContractError::NotSealed);
        }
        self.touch();
        self.revoking_items.push(item);
        Ok(())
    }

    /// Create `item` together with this contract.
    pub fn add_new_item(&mut self, item: Contract) {
        self.touch();
        self.new_items.push(item);
    }

    /// This contract, then its new items' trees, then its revoking items'
    /// trees.
    pub fn contracts_in_tree(&self) -> Vec<&Contract> {
        let mut out = vec![self];
        for item in &self.new_items {
            out.extend(item.contracts_in_tree());
        }
        for item in &self.revoking_items {
            out.extend(item.contracts_in_tree());
        }
        out
    }

    /// Items of `candidates` satisfying every reference of this contract
    /// on origin, signer roles and required data fields.
    pub fn extract_by_valid_reference<'a>(&self, candidates: &'a [Contract]) -> Vec<&'a Contract> {
        candidates
            .iter()
            .filter(|candidate| {
                self.references().all(|reference| {
                    let origin_ok = reference
                        .origin
                        .map_or(true, |o| candidate.origin() == Some(o));
                    let roles_ok = reference.signed_by.iter().all(|name| {
                        candidate
                            .role(name)
                            .is_some_and(|role| candidate.is_signed_by(role))
                    });
                    let fields_ok = reference
                        .fields
                        .iter()
                        .all(|f| candidate.state.data.contains_key(f));
                    origin_ok && roles_ok && fields_ok
                })
            })
            .collect()
    }

    // ----- Checking -----

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn quantiser(&self) -> &Quantiser {
        &self.quantiser
    }

    /// Budget for the next check; negative means unlimited.
    pub fn set_quanta_limit(&mut self, limit: i64) {
        self.quantiser.reset(limit);
    }

    /// Validate this contract and everything submitted with it.
    ///
    /// Returns `Ok(true)` when no soft errors were found; the errors of the
    /// last run are kept in [`Contract::errors`]. A budget breach is the
    /// only `Err`.
    pub fn check(&mut self, prefix: &str) -> Result<bool, QuantiserError> {
        let config = ValidationConfig {
            quanta_per_unit: self.quanta_per_unit,
            ..ValidationConfig::default()
        }
        .with_quanta_limit(self.quantiser.raw_limit());
        self.check_with(&Validator::new(config), prefix)
    }

    /// [`Contract::check`] with an explicit validator.
    pub fn check_with(&mut self, validator: &Validator, prefix: &str) -> Result<bool, QuantiserError> {
        self.errors.clear();
        let mut quantiser = Quantiser::new(validator.config().quanta_limit);
        let outcome = {
            let tree = self.contracts_in_tree();
            validator.check_item(self, &tree, prefix, &mut quantiser)
        };
        self.quantiser = quantiser;
        self.quanta_per_unit = validator.config().quanta_per_unit;
        self.errors = outcome?;
        Ok(self.errors.is_empty())
    }

    /// Network units spent by the last check.
    pub fn processed_cost_units(&self) -> u64 {
        self.quantiser.cost_in_units(self.quanta_per_unit)
    }
}
