use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("role link cycle through: {0}")]
    LinkCycle(String),

    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),
}
