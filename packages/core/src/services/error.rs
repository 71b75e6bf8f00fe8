//! Attach Error Types
//!
//! Errors that abort an attach call. There is never a partial result: a call
//! either returns a fully attached graph or one of these.

use crate::db::StoreError;
use crate::models::{Identity, ValidationError};
use crate::schema::{Multiplicity, SchemaError};
use thiserror::Error;

/// Attach operation errors
#[derive(Error, Debug)]
pub enum AttachError {
    /// Input is not a well-formed node graph
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Node type could not be resolved against the schema
    #[error("Schema lookup failed: {0}")]
    Schema(#[from] SchemaError),

    /// Association value shape contradicts its registered multiplicity
    #[error("Association '{node_type}.{field}' is registered as {expected} but holds a different shape")]
    ShapeMismatch {
        node_type: String,
        field: String,
        expected: Multiplicity,
    },

    /// Node identity repeats among its own ancestors
    #[error("Cycle detected at {node_type} {identity}")]
    CycleDetected { node_type: String, identity: Identity },

    /// Graph deeper than the configured limit
    #[error("Graph exceeds maximum depth of {max_depth}")]
    DepthExceeded { max_depth: usize },

    /// Attacher configuration rejected
    #[error("Invalid attacher configuration: {0}")]
    InvalidConfig(String),

    /// Store failure other than a lookup miss
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl AttachError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(
        node_type: impl Into<String>,
        field: impl Into<String>,
        expected: Multiplicity,
    ) -> Self {
        Self::ShapeMismatch {
            node_type: node_type.into(),
            field: field.into(),
            expected,
        }
    }

    /// Create a cycle detected error
    pub fn cycle_detected(node_type: impl Into<String>, identity: Identity) -> Self {
        Self::CycleDetected {
            node_type: node_type.into(),
            identity,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
