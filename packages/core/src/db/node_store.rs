//! NodeStore Trait - Persistent Store Abstraction
//!
//! This module defines the `NodeStore` trait the attacher resolves identities
//! against. It is deliberately narrow: the attacher only ever reads through
//! `lookup`, and `insert` exists for the caller's persist step.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: Stores are I/O bound, so both methods are async
//! 2. **Shared Instances**: Lookups hand out `Arc<Node>`, so returning "the
//!    store's own instance" is observable with `Arc::ptr_eq`
//! 3. **Miss Is Not An Error**: `lookup` returns `Ok(None)` for a genuine miss;
//!    `Err` is reserved for malformed identities and infrastructure failures
//! 4. **Distinct Conflict**: A duplicate insert fails with
//!    `StoreError::UniqueViolation`, never with anything a lookup returns
//!
//! # Examples
//!
//! ```rust,no_run
//! use graft_core::db::NodeStore;
//! use graft_core::models::Identity;
//! # async fn example(store: &dyn NodeStore) -> Result<(), graft_core::db::StoreError> {
//! match store.lookup("place", &Identity::single(123)).await? {
//!     Some(place) => println!("Found: {:?}", place.property("name")),
//!     None => println!("Place not stored yet"),
//! }
//! # Ok(())
//! # }
//! ```

use super::StoreError;
use crate::models::{Identity, Node};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistent store the attacher resolves identities against
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is typically shared by
/// every concurrent attach call.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Find the stored node of `node_type` with `identity`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(node))` if the record exists
    /// - `Ok(None)` if it does not (not an error)
    /// - `Err(StoreError::MalformedIdentity)` if the identity cannot address a
    ///   record of this type
    /// - `Err(_)` for infrastructure failures
    async fn lookup(&self, node_type: &str, identity: &Identity) -> Result<Option<Arc<Node>>, StoreError>;

    /// Persist a new node
    ///
    /// # Errors
    ///
    /// - `StoreError::UniqueViolation` if a record with the same identity exists
    /// - `StoreError::MissingIdentity` if the node's identity is not resolvable
    async fn insert(&self, node: Node) -> Result<Arc<Node>, StoreError>;
}
