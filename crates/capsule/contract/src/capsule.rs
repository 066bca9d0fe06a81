//! The `unicapsule` envelope.
//!
//! A capsule is a CBOR map `{type, version, data, signatures}`. `data` holds
//! the inner payload: the contract record plus its revoking and new items,
//! either as SHA-512 references resolved through a [`TransactionPack`]
//! (version 3) or as embedded capsules (legacy version 2). Every signature
//! covers `data`; the content id is the SHA-512 of the whole envelope, so
//! adding or removing a signature changes the id.

use crate::contract::{now_seconds, Contract, ROLE_CREATOR, ROLE_ISSUER, ROLE_OWNER};
use crate::error::ContractError;
use crate::pack::TransactionPack;
use crate::sections::{BranchId, DataMap, Definition, State, Transactional};
use crate::MAX_API_LEVEL;
use capsule_crypto::{
    cbor, extract_key_tag, sign_at, verify, Blob, ExtendedSignature, HashId, KeyTag, PrivateKey,
    PublicKey,
};
use capsule_quantiser::QuantiserProcess;
use capsule_roles::{Permission, Role};
use capsule_types::{ErrorCode, ErrorRecord, Reference};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

pub const CAPSULE_TYPE: &str = "unicapsule";
pub const CAPSULE_VERSION_V2: u64 = 2;
pub const CAPSULE_VERSION_V3: u64 = 3;

/// Deepest nesting of embedded items a legacy (v2) capsule may carry.
pub const MAX_EMBEDDED_DEPTH: usize = 16;

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    version: u64,
    data: Blob,
    #[serde(default)]
    signatures: Vec<Blob>,
}

#[derive(Serialize, Deserialize)]
struct HashRef {
    sha512: HashId,
}

#[derive(Serialize, Deserialize)]
struct PayloadV3 {
    contract: ContractRecord,
    #[serde(default)]
    revoking: Vec<HashRef>,
    #[serde(default)]
    new: Vec<HashRef>,
}

#[derive(Serialize, Deserialize)]
struct PayloadV2 {
    contract: ContractRecord,
    #[serde(default)]
    revoking: Vec<Blob>,
    #[serde(default)]
    new: Vec<Blob>,
}

#[derive(Serialize, Deserialize)]
struct ContractRecord {
    api_level: i64,
    definition: DefinitionRecord,
    state: StateRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transactional: Option<Transactional>,
}

#[derive(Serialize, Deserialize)]
struct DefinitionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issuer: Option<Role>,
    created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(default)]
    data: DataMap,
    /// Keyed by permission id.
    #[serde(default)]
    permissions: BTreeMap<String, Permission>,
    #[serde(default)]
    references: Vec<Reference>,
    /// Named roles other than issuer, owner and creator.
    #[serde(default)]
    roles: Vec<Role>,
}

#[derive(Serialize, Deserialize)]
struct StateRecord {
    revision: i64,
    created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<HashId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<HashId>,
    #[serde(default)]
    data: DataMap,
}

fn from_seconds(secs: i64) -> Result<DateTime<Utc>, ContractError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| ContractError::Malformed(format!("timestamp out of range: {}", secs)))
}

fn decode_envelope(bytes: &[u8]) -> Result<Envelope, ContractError> {
    let envelope: Envelope =
        cbor::decode(bytes).map_err(|e| ContractError::Malformed(e.to_string()))?;
    if envelope.kind != CAPSULE_TYPE {
        return Err(ContractError::WrongCapsuleType(envelope.kind));
    }
    if envelope.version != CAPSULE_VERSION_V2 && envelope.version != CAPSULE_VERSION_V3 {
        return Err(ContractError::UnsupportedVersion(envelope.version));
    }
    Ok(envelope)
}

impl Contract {
    fn to_record(&self) -> ContractRecord {
        let extra_roles = self
            .roles
            .iter()
            .filter(|r| ![ROLE_ISSUER, ROLE_OWNER, ROLE_CREATOR].contains(&r.name.as_str()))
            .cloned()
            .collect();
        let permissions = self
            .permissions
            .iter()
            .filter_map(|p| p.id.clone().map(|id| (id, p.clone())))
            .collect();

        ContractRecord {
            api_level: i64::from(self.api_level),
            definition: DefinitionRecord {
                issuer: self.issuer().cloned(),
                created_at: self.definition.created_at.timestamp(),
                expires_at: self.definition.expires_at.map(|t| t.timestamp()),
                data: self.definition.data.clone(),
                permissions,
                references: self.definition.references.clone(),
                roles: extra_roles,
            },
            state: StateRecord {
                revision: i64::from(self.state.revision),
                created_at: self.state.created_at.timestamp(),
                expires_at: self.state.expires_at.map(|t| t.timestamp()),
                owner: self.owner().cloned(),
                created_by: self.creator().cloned(),
                branch_id: self.state.branch_id.map(|b| b.to_string()),
                origin: self.state.origin,
                parent: self.state.parent,
                data: self.state.data.clone(),
            },
            transactional: self.transactional.clone(),
        }
    }

    fn from_record(record: ContractRecord) -> Result<Contract, ContractError> {
        let api_level = u32::try_from(record.api_level)
            .ok()
            .filter(|level| *level <= MAX_API_LEVEL)
            .ok_or(ContractError::UnsupportedApiLevel(record.api_level))?;
        if record.state.revision <= 0 {
            return Err(ContractError::BadRevision(record.state.revision));
        }
        let revision =
            u32::try_from(record.state.revision).map_err(|_| ContractError::RevisionOverflow)?;
        let branch_id = record
            .state
            .branch_id
            .as_deref()
            .map(str::parse::<BranchId>)
            .transpose()
            .map_err(ContractError::Malformed)?;

        let definition = record.definition;
        let state = record.state;

        let mut contract = Contract::blank();
        contract.api_level = api_level;
        contract.definition = Definition {
            created_at: from_seconds(definition.created_at)?,
            expires_at: definition.expires_at.map(from_seconds).transpose()?,
            data: definition.data,
            references: definition.references,
        };
        contract.state = State {
            revision,
            created_at: from_seconds(state.created_at)?,
            expires_at: state.expires_at.map(from_seconds).transpose()?,
            origin: state.origin,
            parent: state.parent,
            branch_id,
            data: state.data,
        };
        contract.transactional = record.transactional;

        for role in definition.roles {
            contract.roles.register(role);
        }
        let named = [
            (ROLE_ISSUER, definition.issuer),
            (ROLE_OWNER, state.owner),
            (ROLE_CREATOR, state.created_by),
        ];
        for (name, role) in named {
            if let Some(role) = role {
                contract.roles.register(role.renamed(name));
            }
        }
        for (id, mut permission) in definition.permissions {
            permission.id = Some(id);
            contract.permissions.add(permission);
        }
        Ok(contract)
    }

    /// Seal (if needed) and return the id.
    pub(crate) fn id_or_seal(&mut self) -> Result<HashId, ContractError> {
        match self.id {
            Some(id) => Ok(id),
            None => self.seal(),
        }
    }

    fn revoking_refs(&self) -> Result<Vec<HashRef>, ContractError> {
        self.revoking_items
            .iter()
            .map(|item| {
                item.id
                    .map(|sha512| HashRef { sha512 })
                    .ok_or(ContractError::NotSealed)
            })
            .collect()
    }

    /// Seal in the current format: new and revoking items travel as hash
    /// references. Unsealed new items are sealed first; revoking items must
    /// already be sealed. Returns the new id.
    pub fn seal(&mut self) -> Result<HashId, ContractError> {
        let revoking = self.revoking_refs()?;
        let mut new = Vec::with_capacity(self.new_items.len());
        for item in &mut self.new_items {
            new.push(HashRef {
                sha512: item.id_or_seal()?,
            });
        }
        let data = cbor::encode(&PayloadV3 {
            contract: self.to_record(),
            revoking,
            new,
        })?;
        let id = self.seal_data(CAPSULE_VERSION_V3, data)?;
        self.link_split();
        Ok(id)
    }

    /// Seal in the legacy self-contained format with every new and revoking
    /// item embedded as a full capsule.
    pub fn seal_as_v2(&mut self) -> Result<HashId, ContractError> {
        let mut revoking = Vec::with_capacity(self.revoking_items.len());
        for item in &self.revoking_items {
            let bytes = item.sealed_binary.clone().ok_or(ContractError::NotSealed)?;
            revoking.push(Blob(bytes));
        }
        let mut new = Vec::with_capacity(self.new_items.len());
        for item in &mut self.new_items {
            if item.sealed_binary.is_none() {
                item.seal_as_v2()?;
            }
            let bytes = item.sealed_binary.clone().ok_or(ContractError::NotSealed)?;
            new.push(Blob(bytes));
        }
        let data = cbor::encode(&PayloadV2 {
            contract: self.to_record(),
            revoking,
            new,
        })?;
        let id = self.seal_data(CAPSULE_VERSION_V2, data)?;
        self.link_split();
        Ok(id)
    }

    fn seal_data(&mut self, version: u64, data: Vec<u8>) -> Result<HashId, ContractError> {
        let at = now_seconds();
        let mut signatures = Vec::with_capacity(self.keys_to_sign_with.len());
        let mut sealed_by = BTreeMap::new();
        for (public_key, key) in &self.keys_to_sign_with {
            signatures.push(Blob(sign_at(key, &data, at)?));
            sealed_by.insert(
                public_key.clone(),
                ExtendedSignature {
                    key_tag: public_key.tag(),
                    public_key: public_key.clone(),
                    created_at: at,
                },
            );
        }
        let envelope = Envelope {
            kind: CAPSULE_TYPE.to_string(),
            version,
            data: Blob(data),
            signatures,
        };
        self.sealed_by_keys = sealed_by;
        let id = self.store_envelope(&envelope)?;
        debug!(
            id = %id,
            version,
            signatures = envelope.signatures.len(),
            "contract sealed"
        );
        Ok(id)
    }

    fn store_envelope(&mut self, envelope: &Envelope) -> Result<HashId, ContractError> {
        let bytes = cbor::encode(envelope)?;
        let id = HashId::of(&bytes);
        self.sealed_binary = Some(bytes);
        self.id = Some(id);
        Ok(id)
    }

    fn sealed_envelope(&self) -> Result<Envelope, ContractError> {
        let bytes = self.sealed_binary.as_deref().ok_or(ContractError::NotSealed)?;
        decode_envelope(bytes)
    }

    /// Append signatures over the existing payload. The payload is kept
    /// byte for byte; the envelope and therefore the id change.
    pub fn add_signature_to_seal(&mut self, keys: &[PrivateKey]) -> Result<HashId, ContractError> {
        let mut envelope = self.sealed_envelope()?;
        let at = now_seconds();
        for key in keys {
            let public_key = key.public_key();
            envelope
                .signatures
                .push(Blob(sign_at(key, envelope.data.as_slice(), at)?));
            self.sealed_by_keys.insert(
                public_key.clone(),
                ExtendedSignature {
                    key_tag: public_key.tag(),
                    public_key: public_key.clone(),
                    created_at: at,
                },
            );
            self.keys_to_sign_with.insert(public_key, key.clone());
        }
        let id = self.store_envelope(&envelope)?;
        debug!(id = %id, added = keys.len(), "signatures added to seal");
        Ok(id)
    }

    /// Drop every signature from the seal; the id changes accordingly.
    pub fn remove_all_signatures(&mut self) -> Result<HashId, ContractError> {
        let mut envelope = self.sealed_envelope()?;
        envelope.signatures.clear();
        self.sealed_by_keys.clear();
        self.store_envelope(&envelope)
    }

    /// The raw signature made by `key`, if the seal carries one.
    pub fn find_signature_in_seal(&self, key: &PublicKey) -> Result<Option<Vec<u8>>, ContractError> {
        let tag = key.tag();
        let envelope = self.sealed_envelope()?;
        Ok(envelope
            .signatures
            .into_iter()
            .find(|sig| extract_key_tag(sig.as_slice()).is_ok_and(|t| t == tag))
            .map(Blob::into_inner))
    }

    /// The signed payload without decoding it.
    pub fn extract_contract_bytes(&self) -> Result<Vec<u8>, ContractError> {
        Ok(self.sealed_envelope()?.data.into_inner())
    }

    /// Decode a capsule. Version 3 references are resolved against `pack`
    /// and silently left out when missing; version 2 embedded items are
    /// decoded and added to `pack`.
    ///
    /// Signatures that fail to verify are recorded as `BAD_SIGNATURE` in
    /// [`Contract::errors`] rather than failing the decode.
    pub fn from_sealed(bytes: &[u8], pack: &mut TransactionPack) -> Result<Contract, ContractError> {
        Self::decode_sealed(bytes, pack, 0)
    }

    fn decode_sealed(
        bytes: &[u8],
        pack: &mut TransactionPack,
        depth: usize,
    ) -> Result<Contract, ContractError> {
        if depth > MAX_EMBEDDED_DEPTH {
            return Err(ContractError::Malformed(format!(
                "embedded items nested deeper than {}",
                MAX_EMBEDDED_DEPTH
            )));
        }
        let envelope = decode_envelope(bytes)?;
        let data = envelope.data.as_slice();

        let mut contract = if envelope.version == CAPSULE_VERSION_V3 {
            let payload: PayloadV3 = cbor::decode(data)?;
            let mut contract = Contract::from_record(payload.contract)?;
            contract.revoking_items = resolve_refs(&payload.revoking, pack);
            contract.new_items = resolve_refs(&payload.new, pack);
            contract
        } else {
            let payload: PayloadV2 = cbor::decode(data)?;
            let mut contract = Contract::from_record(payload.contract)?;
            contract.revoking_items = decode_embedded(&payload.revoking, pack, depth + 1)?;
            contract.new_items = decode_embedded(&payload.new, pack, depth + 1)?;
            contract
        };

        contract.verify_seal(data, &envelope.signatures)?;
        contract.sealed_binary = Some(bytes.to_vec());
        contract.id = Some(HashId::of(bytes));
        contract.link_split();
        Ok(contract)
    }

    /// Decode a capsule with no co-submitted items available.
    pub fn from_sealed_standalone(bytes: &[u8]) -> Result<Contract, ContractError> {
        Self::from_sealed(bytes, &mut TransactionPack::new())
    }

    /// Keys any signature may legitimately come from: every key of every
    /// role, including roles bound directly to permissions.
    fn known_keys(&self) -> BTreeSet<PublicKey> {
        let mut keys = self.roles.all_keys();
        for permission in self.permissions.iter() {
            keys.extend(permission.role.key_set(&self.roles));
        }
        keys
    }

    fn verify_seal(&mut self, data: &[u8], signatures: &[Blob]) -> Result<(), ContractError> {
        let known: BTreeMap<KeyTag, PublicKey> = self
            .known_keys()
            .into_iter()
            .map(|key| (key.tag(), key))
            .collect();

        for signature in signatures {
            let tag = match extract_key_tag(signature.as_slice()) {
                Ok(tag) => tag,
                Err(e) => {
                    warn!(error = %e, "malformed signature in capsule");
                    self.errors.push(ErrorRecord::new(
                        ErrorCode::BadSignature,
                        "signature",
                        e.to_string(),
                    ));
                    continue;
                }
            };
            let Some(key) = known.get(&tag) else {
                trace!(key_tag = %tag, "signature by unknown key ignored");
                continue;
            };
            self.quantiser
                .add_work_cost(QuantiserProcess::signature_check(key.strength()))?;
            match verify(key, signature.as_slice(), data) {
                Ok(Some(verified)) => {
                    self.sealed_by_keys.insert(key.clone(), verified);
                }
                Ok(None) | Err(_) => {
                    warn!(key_tag = %tag, "broken signature in capsule");
                    self.errors.push(ErrorRecord::new(
                        ErrorCode::BadSignature,
                        format!("keytag:{}", tag.to_hex()),
                        "the signature is broken",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn resolve_refs(refs: &[HashRef], pack: &TransactionPack) -> Vec<Contract> {
    refs.iter()
        .filter_map(|r| {
            let found = pack.get_reference(&r.sha512).cloned();
            if found.is_none() {
                debug!(id = %r.sha512, "referenced item not in transaction pack");
            }
            found
        })
        .collect()
}

fn decode_embedded(
    capsules: &[Blob],
    pack: &mut TransactionPack,
    depth: usize,
) -> Result<Vec<Contract>, ContractError> {
    let mut items = Vec::with_capacity(capsules.len());
    for capsule in capsules {
        let item = Contract::decode_sealed(capsule.as_slice(), pack, depth)?;
        pack.add_reference(item.clone())?;
        items.push(item);
    }
    Ok(items)
}
