//! Data Models
//!
//! This module contains the graph structures the attacher operates on:
//!
//! - `Node` - Universal node model for every domain type
//! - `Association` / `NodeRef` - Links between nodes, and the attach result
//! - `Identity` - Ordered identity tuple used for store lookups

mod node;

pub use node::{
    is_empty_value, Association, FieldValue, Identity, Node, NodeRef, ValidationError, TYPE_KEY,
};
