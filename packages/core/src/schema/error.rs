//! Schema Error Types
//!
//! Errors raised while building the schema registry or resolving a node type
//! against it.

use thiserror::Error;

/// Schema registry errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Node type has no registered schema
    #[error("Unknown node type: {0}")]
    UnknownType(String),

    /// Node type registered twice
    #[error("Node type registered more than once: {0}")]
    DuplicateType(String),

    /// Field name declared twice within one type
    #[error("Field '{field}' declared more than once on '{node_type}'")]
    DuplicateField { node_type: String, field: String },

    /// Association points at a type the registry does not know
    #[error("Association '{node_type}.{field}' targets unknown type '{target_type}'")]
    UnknownTarget {
        node_type: String,
        field: String,
        target_type: String,
    },

    /// Structurally invalid definition
    #[error("Invalid schema definition: {0}")]
    InvalidDefinition(String),

    /// Schema document could not be parsed
    #[error("Invalid schema document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

impl SchemaError {
    /// Create an unknown type error
    pub fn unknown_type(node_type: impl Into<String>) -> Self {
        Self::UnknownType(node_type.into())
    }

    /// Create a duplicate field error
    pub fn duplicate_field(node_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::DuplicateField {
            node_type: node_type.into(),
            field: field.into(),
        }
    }

    /// Create an invalid definition error
    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }
}
