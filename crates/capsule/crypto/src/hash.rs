use crate::bytes::deserialize_fixed;
use crate::error::CryptoError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};
use std::fmt;

/// Content-addressed identifier (SHA-512, 64 bytes).
///
/// The id of a contract is the `HashId` of its full sealed capsule, so it
/// covers the signature list as well as the contract body.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashId([u8; 64]);

impl HashId {
    /// Digest arbitrary bytes.
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha512::digest(data);
        let mut out = [0u8; 64];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Wrap an existing 64-byte digest.
    pub fn from_digest(digest: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; 64] = digest
            .try_into()
            .map_err(|_| CryptoError::InvalidDigestLength(digest.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        if text.len() != 128 {
            return Err(CryptoError::InvalidHexLength {
                expected: 128,
                actual: text.len(),
            });
        }
        let mut out = [0u8; 64];
        hex::decode_to_slice(text, &mut out).map_err(|_| CryptoError::InvalidHex)?;
        Ok(Self(out))
    }

    /// Digest check: does `data` hash to this id?
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::of(data) == *self
    }
}

impl fmt::Debug for HashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for HashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

impl Serialize for HashId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for HashId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_fixed::<64, D>(deserializer).map(Self)
    }
}
