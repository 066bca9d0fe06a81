//! Dotted-path field access.
//!
//! Paths name what other items (references, permissions, join matching)
//! see of a contract: `id`, `origin`, `state.revision`,
//! `state.data.amount`, `definition.data.name`, and so on. Values come back
//! as JSON; ids are hex strings and timestamps are integer seconds.

use crate::contract::Contract;
use crate::error::ContractError;
use crate::sections::DataMap;
use chrono::{DateTime, Utc};
use serde_json::Value;

fn hex_value(id: Option<capsule_crypto::HashId>) -> Value {
    id.map_or(Value::Null, |h| Value::String(h.to_hex()))
}

fn time_value(at: Option<DateTime<Utc>>) -> Value {
    at.map_or(Value::Null, |t| Value::from(t.timestamp()))
}

fn lookup(data: &DataMap, path: &str) -> Option<Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = data.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}

fn store(data: &mut DataMap, path: &str, value: Value) -> Result<(), ContractError> {
    let Some((head, rest)) = path.split_once('.') else {
        data.insert(path.to_string(), value);
        return Ok(());
    };
    let mut current = data
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Default::default()));
    let mut segments = rest.split('.').peekable();
    while let Some(segment) = segments.next() {
        let object = current
            .as_object_mut()
            .ok_or_else(|| ContractError::FieldNotFound(path.to_string()))?;
        if segments.peek().is_none() {
            object.insert(segment.to_string(), value);
            return Ok(());
        }
        current = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    Ok(())
}

impl Contract {
    /// Read a field by dotted path.
    pub fn get_field(&self, path: &str) -> Result<Value, ContractError> {
        let value = match path {
            "id" => hex_value(self.id),
            "origin" | "state.origin" => hex_value(self.origin()),
            "state.parent" | "parent" => hex_value(self.state.parent),
            "state.revision" => Value::from(self.state.revision),
            "state.branch_id" => self
                .state
                .branch_id
                .map_or(Value::Null, |b| Value::String(b.to_string())),
            "state.created_at" => time_value(Some(self.state.created_at)),
            "state.expires_at" => time_value(self.state.expires_at),
            "definition.created_at" => time_value(Some(self.definition.created_at)),
            "definition.expires_at" => time_value(self.definition.expires_at),
            "api_level" => Value::from(self.api_level),
            "transactional.id" => self
                .transactional
                .as_ref()
                .and_then(|t| t.id.clone())
                .map_or(Value::Null, Value::String),
            _ => {
                let found = if let Some(rest) = path.strip_prefix("state.data.") {
                    lookup(&self.state.data, rest)
                } else if let Some(rest) = path.strip_prefix("definition.data.") {
                    lookup(&self.definition.data, rest)
                } else {
                    None
                };
                return found.ok_or_else(|| ContractError::FieldNotFound(path.to_string()));
            }
        };
        Ok(value)
    }

    /// Write a field by dotted path. Only data fields and the state expiry
    /// are writable; identity and provenance fields are derived.
    pub fn set_field(&mut self, path: &str, value: Value) -> Result<(), ContractError> {
        if let Some(rest) = path.strip_prefix("state.data.") {
            self.touch();
            return store(&mut self.state.data, rest, value);
        }
        if let Some(rest) = path.strip_prefix("definition.data.") {
            self.touch();
            return store(&mut self.definition.data, rest, value);
        }
        if path == "state.expires_at" {
            let at = match &value {
                Value::Null => None,
                v => {
                    let secs = v
                        .as_i64()
                        .ok_or_else(|| ContractError::Malformed(format!("{}: {}", path, v)))?;
                    Some(
                        DateTime::<Utc>::from_timestamp(secs, 0)
                            .ok_or_else(|| ContractError::Malformed(format!("{}: {}", path, v)))?,
                    )
                }
            };
            self.set_expires_at(at);
            return Ok(());
        }
        Err(ContractError::ReadOnlyField(path.to_string()))
    }
}
