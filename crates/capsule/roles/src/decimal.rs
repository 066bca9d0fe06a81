//! Exact decimals carried as strings.
//!
//! Monetary fields are compared for exact equality, so they never pass
//! through binary floating point. On the wire they are decimal strings.

use crate::error::RoleError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serializer};
use std::str::FromStr;

pub fn parse(text: &str) -> Result<BigDecimal, RoleError> {
    BigDecimal::from_str(text.trim()).map_err(|_| RoleError::InvalidDecimal(text.to_string()))
}

/// Read a decimal out of a JSON value holding either a string or an
/// integer.
pub fn from_value(value: &serde_json::Value) -> Result<BigDecimal, RoleError> {
    match value {
        serde_json::Value::String(s) => parse(s),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => parse(&n.to_string()),
        other => Err(RoleError::InvalidDecimal(other.to_string())),
    }
}

pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse(&text).map_err(serde::de::Error::custom)
}
