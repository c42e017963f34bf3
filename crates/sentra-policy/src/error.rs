//! Error types for policy model validation and reference checking.
//!
//! Split per the system's error taxonomy: validation and reference errors
//! surface synchronously at creation time, before any state is written.
//! Evaluation never returns these -- `evaluate_access` fails closed instead.

use thiserror::Error;

/// Errors from creating or updating permissions, roles, and policies.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Malformed input, surfaced before any write. The message names the
    /// violated rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A permission reference names a permission that does not exist.
    #[error("unknown permission reference: {0}")]
    UnknownPermission(String),

    /// A role reference names a role that does not exist.
    #[error("unknown role reference: {0}")]
    UnknownRole(String),

    /// A policy reference names a policy that does not exist.
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    /// Role inheritance would form a cycle.
    #[error("role inheritance cycle involving '{0}'")]
    InheritanceCycle(String),

    /// An entity with this name already exists.
    #[error("duplicate name: {0}")]
    Duplicate(String),

    /// A role constraint forbids the operation (e.g. assignment cap reached).
    #[error("role constraint violated: {0}")]
    ConstraintViolated(String),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
