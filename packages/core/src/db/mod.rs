//! Store Layer
//!
//! This module defines the persistent store boundary the attacher reads from:
//!
//! - `NodeStore` - Async lookup/insert contract
//! - `StoreError` - Failure taxonomy, keeping "malformed identity" and
//!   "unique violation" apart from a plain lookup miss
//! - `InMemoryStore` - Hash-map backed implementation
//!
//! Transactions, queries and commit batching belong to concrete backends and
//! are not part of this contract.

mod error;
mod memory_store;
mod node_store;

pub use error::StoreError;
pub use memory_store::InMemoryStore;
pub use node_store::NodeStore;
