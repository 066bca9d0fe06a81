//! Shared type definitions for the capsule engine.
//!
//! No business logic, just the vocabulary every other capsule crate speaks:
//! soft validation errors, the network-facing item states and the
//! `Reference` constraint object.

pub mod error;
pub mod item_state;
pub mod reference;

pub use error::{ErrorCode, ErrorRecord};
pub use item_state::ItemState;
pub use reference::{Reference, ReferenceKind};
