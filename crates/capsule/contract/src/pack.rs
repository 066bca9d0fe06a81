//! Transaction pack: a contract plus every item it references by hash.

use crate::contract::Contract;
use crate::error::ContractError;
use capsule_crypto::{cbor, Blob, HashId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct PackRecord {
    contract: Blob,
    #[serde(default)]
    references: Vec<Blob>,
}

/// Hash-indexed resolver for items submitted together.
///
/// References are kept in insertion order, which [`TransactionPack::pack`]
/// preserves: an item's own new and revoking items come before it.
#[derive(Clone, Debug, Default)]
pub struct TransactionPack {
    contract: Option<Contract>,
    references: BTreeMap<HashId, Contract>,
    order: Vec<HashId>,
}

impl TransactionPack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pack `contract` with everything reachable from it. Every item must be
    /// sealed.
    pub fn from_contract(contract: &Contract) -> Result<Self, ContractError> {
        if contract.id().is_none() {
            return Err(ContractError::NotSealed);
        }
        let mut pack = Self::new();
        pack.add_dependencies(contract)?;
        pack.contract = Some(contract.clone());
        Ok(pack)
    }

    fn add_dependencies(&mut self, item: &Contract) -> Result<(), ContractError> {
        for dependency in item.new_items().iter().chain(item.revoking_items()) {
            self.add_dependencies(dependency)?;
            self.add_reference(dependency.clone())?;
        }
        Ok(())
    }

    /// Index a sealed item. Adding an item twice is a no-op.
    pub fn add_reference(&mut self, item: Contract) -> Result<HashId, ContractError> {
        let id = item.id().ok_or(ContractError::NotSealed)?;
        if !self.references.contains_key(&id) {
            self.order.push(id);
            self.references.insert(id, item);
        }
        Ok(id)
    }

    pub fn get_reference(&self, id: &HashId) -> Option<&Contract> {
        self.references.get(id)
    }

    /// References in dependency order.
    pub fn references(&self) -> impl Iterator<Item = &Contract> {
        self.order.iter().filter_map(|id| self.references.get(id))
    }

    pub fn contract(&self) -> Option<&Contract> {
        self.contract.as_ref()
    }

    pub fn into_contract(self) -> Option<Contract> {
        self.contract
    }

    /// Serialize as `{contract, references}` with every entry a capsule.
    pub fn pack(&self) -> Result<Vec<u8>, ContractError> {
        let contract = self
            .contract
            .as_ref()
            .and_then(Contract::sealed_binary)
            .ok_or(ContractError::NotSealed)?;
        let references = self
            .references()
            .map(|item| {
                item.sealed_binary()
                    .map(Blob::from)
                    .ok_or(ContractError::NotSealed)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let bytes = cbor::encode(&PackRecord {
            contract: Blob::from(contract),
            references,
        })?;
        debug!(references = self.order.len(), bytes = bytes.len(), "transaction packed");
        Ok(bytes)
    }

    /// Decode a pack. Each reference is decoded against those before it, then
    /// the main contract against all of them. A bare capsule is accepted as
    /// a pack with no references.
    pub fn unpack(bytes: &[u8]) -> Result<Self, ContractError> {
        let mut pack = Self::new();
        let record = match cbor::decode::<PackRecord>(bytes) {
            Ok(record) => record,
            Err(_) => {
                pack.contract = Some(Contract::from_sealed(bytes, &mut pack)?);
                return Ok(pack);
            }
        };
        for capsule in &record.references {
            let item = Contract::from_sealed(capsule.as_slice(), &mut pack)?;
            pack.add_reference(item)?;
        }
        let contract = Contract::from_sealed(record.contract.as_slice(), &mut pack)?;
        pack.contract = Some(contract);
        Ok(pack)
    }
}

impl Contract {
    /// Decode a packed transaction (or a bare capsule).
    pub fn from_packed_transaction(bytes: &[u8]) -> Result<Contract, ContractError> {
        TransactionPack::unpack(bytes)?
            .into_contract()
            .ok_or_else(|| ContractError::Malformed("empty transaction pack".into()))
    }

    /// Pack this sealed contract with everything it references.
    pub fn to_packed_transaction(&self) -> Result<Vec<u8>, ContractError> {
        TransactionPack::from_contract(self)?.pack()
    }
}
