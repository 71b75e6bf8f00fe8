//! Graft Core - Graph Attach Engine
//!
//! This crate reconciles detached in-memory node graphs (built from API
//! responses, fixtures or earlier domain logic) against a persistent store:
//! nodes whose identity is already stored are reused by reference, everything
//! else comes back as a new record ready for the caller to persist.
//!
//! # Architecture
//!
//! - **Declarative Schema**: Identity and association metadata registered once at startup
//! - **Selective Cascade**: Only associations marked cascade-eligible are traversed
//! - **Store Boundary**: A narrow async `NodeStore` trait, lookups only during attach
//! - **Non-Mutating**: Inputs are cloned, never modified
//!
//! # Modules
//!
//! - [`models`] - Node graph structures (Node, Association, NodeRef, Identity)
//! - [`schema`] - Metadata provider and static schema registry
//! - [`db`] - Persistent store contract and in-memory implementation
//! - [`services`] - The graph attacher

pub mod db;
pub mod models;
pub mod schema;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use schema::*;
pub use services::*;
