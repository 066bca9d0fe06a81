//! # Capsule Crypto
//!
//! Cryptographic primitives shared by every capsule crate:
//!
//! - [`HashId`]: SHA-512 content identifier of a sealed capsule
//! - [`PrivateKey`] / [`PublicKey`]: Ed25519 key pair wrappers
//! - [`KeyTag`]: short BLAKE3 fingerprint embedded in signatures
//! - [`ExtendedSignature`]: signature envelope carrying key tag, data digest
//!   and signing time
//!
//! The [`cbor`] module holds the CBOR helpers used by the capsule codec.

#![deny(unsafe_code)]

pub mod bytes;
pub mod cbor;
pub mod error;
pub mod hash;
pub mod keys;
pub mod signature;

pub use bytes::Blob;
pub use error::CryptoError;
pub use hash::HashId;
pub use keys::{KeyStrength, KeyTag, PrivateKey, PublicKey};
pub use signature::{extract_key_tag, sign, sign_at, verify, ExtendedSignature};
