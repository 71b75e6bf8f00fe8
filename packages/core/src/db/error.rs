//! Store Error Types
//!
//! This module defines error types for persistent store operations. A lookup
//! that finds nothing is not an error (`Ok(None)`); the variants here are the
//! conditions a store can actually fail with.

use crate::models::Identity;
use thiserror::Error;

/// Persistent store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Identity value cannot address a record of this type
    ///
    /// Callers resolving identities treat this the same as a lookup miss.
    #[error("Malformed identity {identity} for node type '{node_type}': {reason}")]
    MalformedIdentity {
        node_type: String,
        identity: Identity,
        reason: String,
    },

    /// Node to insert has no resolvable identity
    #[error("Node of type '{node_type}' has no resolvable identity")]
    MissingIdentity { node_type: String },

    /// Insert collided with an existing record
    #[error("Unique constraint violated: {node_type} {identity} already exists")]
    UniqueViolation { node_type: String, identity: Identity },

    /// Store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a malformed identity error
    pub fn malformed_identity(
        node_type: impl Into<String>,
        identity: Identity,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedIdentity {
            node_type: node_type.into(),
            identity,
            reason: reason.into(),
        }
    }

    /// Create a unique violation error
    pub fn unique_violation(node_type: impl Into<String>, identity: Identity) -> Self {
        Self::UniqueViolation {
            node_type: node_type.into(),
            identity,
        }
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn is_malformed_identity(&self) -> bool {
        matches!(self, Self::MalformedIdentity { .. })
    }

    /// Whether an insert lost a race with another writer
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}
