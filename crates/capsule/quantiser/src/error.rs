use thiserror::Error;

/// Fatal metering condition. Aborts the whole check; never collected as a
/// soft error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantiserError {
    #[error("quantiser limit exceeded: {sum} > {limit}")]
    LimitExceeded { limit: u64, sum: u64 },
}
