//! CBOR encode/decode helpers.

use crate::error::CryptoError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize `value` to CBOR bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    Ok(out)
}

/// Deserialize a value from CBOR bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CryptoError> {
    ciborium::from_reader(bytes).map_err(|e| CryptoError::Decoding(e.to_string()))
}
