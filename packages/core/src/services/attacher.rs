//! Graph Attacher
//!
//! Reconciles a detached node graph against a persistent store. Nodes whose
//! identity is already stored are replaced by the store's own instance; every
//! other node is cloned and comes back as a new record for the caller to
//! persist.
//!
//! # Algorithm
//!
//! For each node, starting at the root:
//!
//! 1. Clone the node (shallow; children stay shared behind `Arc`)
//! 2. If its identity is resolvable, look it up. A hit is returned as is and
//!    ends the walk on this branch, whatever the input carried below it. A
//!    malformed identity counts as a miss.
//! 3. A node that reaches this point below the configured depth limit fails
//!    the call
//! 4. Otherwise collect the cascade-eligible associations holding a value
//! 5. Attach each referenced node (collections element by element, in order)
//!    and write the results back onto the clone
//! 6. Return the clone as a new record
//!
//! Lookups are issued one at a time on the caller's task; nothing is spawned.
//! The attacher never writes to the store.
//!
//! # Examples
//!
//! ```rust,no_run
//! use graft_core::db::InMemoryStore;
//! use graft_core::models::Node;
//! use graft_core::schema::{AssociationField, EntitySchema, SchemaRegistry};
//! use graft_core::services::GraphAttacher;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(
//!     SchemaRegistry::builder()
//!         .entity(
//!             "place",
//!             EntitySchema::new(["id"])
//!                 .with_association(AssociationField::one("related", "place").cascading()),
//!         )
//!         .build()?,
//! );
//! let store = Arc::new(InMemoryStore::new(registry.clone()));
//! let attacher = GraphAttacher::new(registry, store.clone());
//!
//! let input = Node::new("place")
//!     .with_property("id", json!(123))
//!     .with_one("related", Node::new("place").with_property("id", json!(321)));
//!
//! let attached = attacher.attach(&input).await?;
//! for record in attacher.new_records(&attached) {
//!     println!("would persist {}", record.node_type);
//! }
//! # Ok(())
//! # }
//! ```

use super::{AttachError, AttacherConfig};
use crate::db::{NodeStore, StoreError};
use crate::models::{is_empty_value, Association, FieldValue, Identity, Node, NodeRef, ValidationError};
use crate::schema::{MetadataProvider, SchemaError};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type AttachFuture<'a> = Pin<Box<dyn Future<Output = Result<NodeRef, AttachError>> + Send + 'a>>;

/// `(type, identity)` of every node between the root and the current one
type AncestorPath = Vec<(String, Identity)>;

pub struct GraphAttacher {
    metadata: Arc<dyn MetadataProvider>,
    store: Arc<dyn NodeStore>,
    config: AttacherConfig,
}

impl GraphAttacher {
    pub fn new(metadata: Arc<dyn MetadataProvider>, store: Arc<dyn NodeStore>) -> Self {
        Self {
            metadata,
            store,
            config: AttacherConfig::default(),
        }
    }

    pub fn with_config(
        metadata: Arc<dyn MetadataProvider>,
        store: Arc<dyn NodeStore>,
        config: AttacherConfig,
    ) -> Result<Self, AttachError> {
        config.validate().map_err(AttachError::invalid_config)?;
        Ok(Self {
            metadata,
            store,
            config,
        })
    }

    pub fn config(&self) -> &AttacherConfig {
        &self.config
    }

    /// Attach `node` and everything reachable through its cascading
    /// associations.
    ///
    /// `node` itself is never modified. The result is either
    /// `NodeRef::Existing` holding the store's instance, or `NodeRef::New`
    /// holding a clone whose cascading associations point at attached nodes.
    pub async fn attach(&self, node: &Node) -> Result<NodeRef, AttachError> {
        let mut ancestors = AncestorPath::new();
        self.attach_node(node, &mut ancestors, 1).await
    }

    /// Attach a graph given in its JSON form (see [`Node::from_json`])
    ///
    /// An unregistered type anywhere in the document fails with
    /// `AttachError::Schema`, the same as it does through [`attach`](Self::attach).
    pub async fn attach_value(&self, value: &Value) -> Result<NodeRef, AttachError> {
        let node = Node::from_json(value, self.metadata.as_ref()).map_err(|e| match e {
            ValidationError::UnknownType { node_type, .. } => {
                AttachError::Schema(SchemaError::unknown_type(node_type))
            }
            other => AttachError::InvalidInput(other),
        })?;
        self.attach(&node).await
    }

    /// Records the caller has to persist after attaching, each identity once
    /// (see [`NodeRef::new_records`])
    pub fn new_records(&self, attached: &NodeRef) -> Vec<Arc<Node>> {
        attached.new_records(self.metadata.as_ref())
    }

    fn attach_node<'a>(
        &'a self,
        node: &'a Node,
        ancestors: &'a mut AncestorPath,
        depth: usize,
    ) -> AttachFuture<'a> {
        Box::pin(self.attach_one_node(node, ancestors, depth))
    }

    async fn attach_one_node(
        &self,
        node: &Node,
        ancestors: &mut AncestorPath,
        depth: usize,
    ) -> Result<NodeRef, AttachError> {
        if node.node_type.is_empty() {
            return Err(ValidationError::MissingType(format!("depth {}", depth)).into());
        }

        let mut attached = node.clone();

        let identity = self.metadata.identity_of(&attached)?;
        if let Some(identity) = &identity {
            if self.config.detect_cycles
                && ancestors
                    .iter()
                    .any(|(node_type, seen)| node_type == &attached.node_type && seen == identity)
            {
                return Err(AttachError::cycle_detected(attached.node_type, identity.clone()));
            }

            if let Some(existing) = self.find_existing(&attached.node_type, identity).await? {
                tracing::debug!("Reusing stored {} {}", attached.node_type, identity);
                return Ok(NodeRef::Existing(existing));
            }
        }

        if let Some(max_depth) = self.config.max_depth {
            if depth > max_depth {
                return Err(AttachError::DepthExceeded { max_depth });
            }
        }

        let cascading = self.cascading_associations(&attached)?;
        tracing::debug!(
            "Attaching new {} with {} cascading association(s)",
            attached.node_type,
            cascading.len()
        );
        if cascading.is_empty() {
            return Ok(NodeRef::New(Arc::new(attached)));
        }

        let tracked = match identity {
            Some(identity) if self.config.detect_cycles => {
                ancestors.push((attached.node_type.clone(), identity));
                true
            }
            _ => false,
        };

        for (field, value) in cascading {
            let resolved = match value {
                Association::One(Some(child)) => {
                    let child = self.attach_node(child.node(), ancestors, depth + 1).await?;
                    Association::One(Some(child))
                }
                Association::Many(children) => {
                    let mut resolved = Vec::with_capacity(children.len());
                    for child in &children {
                        resolved.push(self.attach_node(child.node(), ancestors, depth + 1).await?);
                    }
                    Association::Many(resolved)
                }
                Association::One(None) => continue,
            };
            self.metadata
                .set_value(&mut attached, &field, FieldValue::Association(resolved));
        }

        if tracked {
            ancestors.pop();
        }
        Ok(NodeRef::New(Arc::new(attached)))
    }

    /// Look up a stored node, folding a malformed identity into a miss
    async fn find_existing(
        &self,
        node_type: &str,
        identity: &Identity,
    ) -> Result<Option<Arc<Node>>, AttachError> {
        match self.store.lookup(node_type, identity).await {
            Ok(found) => Ok(found),
            Err(StoreError::MalformedIdentity { reason, .. }) => {
                tracing::warn!(
                    "Treating malformed identity {} for {} as not found: {}",
                    identity,
                    node_type,
                    reason
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cascade-eligible associations of `node` that currently hold a value,
    /// in declaration order
    fn cascading_associations(&self, node: &Node) -> Result<Vec<(String, Association)>, AttachError> {
        let mut cascading = Vec::new();
        for field in self.metadata.associations(&node.node_type)? {
            if !field.cascade {
                tracing::trace!("{}.{} does not cascade", node.node_type, field.name);
                continue;
            }

            let value = match self.metadata.get_value(node, &field.name) {
                None => continue,
                Some(FieldValue::Property(value)) if is_empty_value(&value) => continue,
                Some(FieldValue::Property(_)) => {
                    return Err(AttachError::shape_mismatch(
                        &node.node_type,
                        &field.name,
                        field.multiplicity,
                    ))
                }
                Some(FieldValue::Association(value)) => value,
            };

            if value.multiplicity() != field.multiplicity {
                return Err(AttachError::shape_mismatch(
                    &node.node_type,
                    &field.name,
                    field.multiplicity,
                ));
            }
            if value.is_empty() {
                tracing::trace!("{}.{} is empty", node.node_type, field.name);
                continue;
            }
            cascading.push((field.name.clone(), value));
        }
        Ok(cascading)
    }
}

#[cfg(test)]
#[path = "attacher_test.rs"]
mod attacher_test;
