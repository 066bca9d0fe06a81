//! Extended signatures.
//!
//! A signature is a CBOR map `{exts, sign}`. `exts` is itself CBOR and
//! carries the signer's key tag, the SHA-512 of the signed data, the signing
//! time and the public key; `sign` is the Ed25519 signature over `exts`.

use crate::bytes::Blob;
use crate::cbor;
use crate::error::CryptoError;
use crate::hash::HashId;
use crate::keys::{KeyTag, PrivateKey, PublicKey};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct SignedBlock {
    exts: Blob,
    sign: Blob,
}

#[derive(Serialize, Deserialize)]
struct SignatureExts {
    key: KeyTag,
    sha512: HashId,
    created_at: i64,
    pub_key: PublicKey,
}

/// A successfully verified signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedSignature {
    pub key_tag: KeyTag,
    pub public_key: PublicKey,
    pub created_at: DateTime<Utc>,
}

/// Sign `data` now.
pub fn sign(key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    sign_at(key, data, Utc::now())
}

/// Sign `data` with an explicit signing time (second resolution).
pub fn sign_at(
    key: &PrivateKey,
    data: &[u8],
    created_at: DateTime<Utc>,
) -> Result<Vec<u8>, CryptoError> {
    let public_key = key.public_key();
    let exts = cbor::encode(&SignatureExts {
        key: public_key.tag(),
        sha512: HashId::of(data),
        created_at: created_at.timestamp(),
        pub_key: public_key,
    })?;
    let sign = key.sign_raw(&exts);
    cbor::encode(&SignedBlock {
        exts: Blob(exts),
        sign: Blob(sign.to_vec()),
    })
}

fn open(signature: &[u8]) -> Result<(SignedBlock, SignatureExts), CryptoError> {
    let block: SignedBlock =
        cbor::decode(signature).map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    let exts: SignatureExts = cbor::decode(block.exts.as_slice())
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    Ok((block, exts))
}

/// Read the key tag of a signature without verifying it.
pub fn extract_key_tag(signature: &[u8]) -> Result<KeyTag, CryptoError> {
    open(signature).map(|(_, exts)| exts.key)
}

/// Verify `signature` over `data` with `key`.
///
/// Returns `Ok(None)` when the envelope is well formed but does not verify
/// (wrong key, tampered data, bad signature bytes).
pub fn verify(
    key: &PublicKey,
    signature: &[u8],
    data: &[u8],
) -> Result<Option<ExtendedSignature>, CryptoError> {
    let (block, exts) = open(signature)?;

    if exts.key != key.tag() || exts.pub_key != *key {
        return Ok(None);
    }
    let Ok(sig) = Signature::from_slice(block.sign.as_slice()) else {
        return Ok(None);
    };
    if key.verifying_key().verify(block.exts.as_slice(), &sig).is_err() {
        return Ok(None);
    }
    if !exts.sha512.matches(data) {
        return Ok(None);
    }
    let Some(created_at) = DateTime::<Utc>::from_timestamp(exts.created_at, 0) else {
        return Ok(None);
    };

    Ok(Some(ExtendedSignature {
        key_tag: exts.key,
        public_key: exts.pub_key,
        created_at,
    }))
}
