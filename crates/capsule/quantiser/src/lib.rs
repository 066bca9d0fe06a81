//! # Capsule Quantiser
//!
//! Bounds the work spent validating one submission. Every priced operation
//! is charged *before* it runs; once the accumulated quanta exceed the
//! limit the call chain aborts with [`QuantiserError::LimitExceeded`].
//!
//! Nested checks do not share a counter. A parent hands each nested check a
//! [`Quantiser::child`] limited to its remaining budget, then folds the
//! child's consumption back with [`Quantiser::add_work_cost_from`].

#![deny(unsafe_code)]

pub mod error;
pub mod process;
pub mod quantiser;

pub use error::QuantiserError;
pub use process::QuantiserProcess;
pub use quantiser::{Quantiser, DEFAULT_QUANTA_PER_UNIT};
