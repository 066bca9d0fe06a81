//! # Capsule Roles
//!
//! Authorization primitives for contracts.
//!
//! - [`Role`]: a closed set of role shapes (key set, link to a named role,
//!   list with any/all/quorum semantics)
//! - [`RoleRegistry`]: the named roles of one contract; links are resolved
//!   against it by name with cycle detection
//! - [`Permission`] / [`PermissionSet`]: named, role-bound grants whose
//!   successful use is charged to a [`capsule_quantiser::Quantiser`]

#![deny(unsafe_code)]

pub mod decimal;
pub mod error;
pub mod permission;
pub mod registry;
pub mod role;

pub use error::RoleError;
pub use permission::{
    ChangeNumberParams, ModifyDataParams, Permission, PermissionKind, PermissionSet,
    SplitJoinParams,
};
pub use registry::RoleRegistry;
pub use role::{ListMode, Role, RoleKind};
