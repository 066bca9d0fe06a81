use thiserror::Error;

/// Errors raised by hashing, key handling and the signature envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid hex length: {actual} (expected {expected})")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid hex character")]
    InvalidHex,

    #[error("invalid digest length: {0} (expected 64)")]
    InvalidDigestLength(usize),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("cbor encoding failed: {0}")]
    Encoding(String),

    #[error("cbor decoding failed: {0}")]
    Decoding(String),
}
