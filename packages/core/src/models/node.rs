//! Node Data Structures
//!
//! This module defines the core `Node` struct and the reference types that tie
//! nodes together into a detached object graph.
//!
//! # Architecture
//!
//! - **Universal Node**: Single struct represents every domain type
//! - **Properties**: Scalar fields (including identity fields) live in a JSON object
//! - **Associations**: Named links to other nodes, either singular or a collection
//! - **Shared Children**: Children are held behind `Arc`, so cloning a node is shallow
//!
//! # Examples
//!
//! ```rust
//! use graft_core::models::Node;
//! use serde_json::json;
//!
//! let place = Node::new("place")
//!     .with_property("id", json!(123))
//!     .with_one("country", Node::new("country").with_property("code", json!("NZ")))
//!     .with_many(
//!         "tags",
//!         vec![Node::new("tag").with_property("slug", json!("harbour"))],
//!     );
//!
//! assert_eq!(place.node_type, "place");
//! assert!(place.association("country").is_some());
//! ```

use crate::schema::{MetadataProvider, Multiplicity};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// JSON key carrying the node type in the dynamic representation
pub const TYPE_KEY: &str = "type";

/// Validation errors for converting and checking input nodes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Expected a JSON object at {0}")]
    NotAnObject(String),

    #[error("Missing node type at {0}")]
    MissingType(String),

    #[error("Unknown node type at {path}: {node_type}")]
    UnknownType { path: String, node_type: String },

    #[error("Invalid value for association '{field}' at {path}: {reason}")]
    InvalidAssociation {
        path: String,
        field: String,
        reason: String,
    },
}

/// Returns true when a field value counts as absent for identity and
/// association purposes: `null`, `""`, `[]` or `{}`.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Ordered tuple of identity field values for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(Vec<Value>);

impl Identity {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Shorthand for the common single-column identity
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical text form, stable across equal identities.
    ///
    /// Usable as a hash key where `serde_json::Value` itself is not.
    pub fn canonical(&self) -> String {
        Value::Array(self.0.clone()).to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// Reference to a node inside a graph.
///
/// Also the result of attaching a node: either the store's own instance for an
/// identity that already exists, or a node that still has to be persisted.
/// Detached input children are `New` references.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRef {
    /// Instance owned by the persistent store, returned verbatim
    Existing(Arc<Node>),

    /// Node not yet persisted
    New(Arc<Node>),
}

impl NodeRef {
    /// Wrap a freshly built node as a detached (new) reference
    pub fn detached(node: Node) -> Self {
        Self::New(Arc::new(node))
    }

    pub fn node(&self) -> &Arc<Node> {
        match self {
            Self::Existing(node) | Self::New(node) => node,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }

    /// Every not-yet-persisted node reachable from this reference.
    ///
    /// Walks depth-first in pre-order: a node comes before its children,
    /// associations are visited by name and collection elements in order.
    /// Existing references end the walk on their branch, since the store
    /// already owns everything behind them.
    ///
    /// Each record is reported once. Nodes with a resolvable identity are
    /// keyed by `(type, identity)` and only the first copy is kept; nodes
    /// without one are keyed by instance.
    pub fn new_records(&self, metadata: &dyn MetadataProvider) -> Vec<Arc<Node>> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        collect_new_records(self, metadata, &mut seen, &mut records);
        records
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum RecordKey {
    Identity(String, String),
    Instance(*const Node),
}

fn collect_new_records(
    node_ref: &NodeRef,
    metadata: &dyn MetadataProvider,
    seen: &mut HashSet<RecordKey>,
    records: &mut Vec<Arc<Node>>,
) {
    let NodeRef::New(node) = node_ref else {
        return;
    };
    if !seen.insert(RecordKey::Instance(Arc::as_ptr(node))) {
        return;
    }

    // Unknown types have no identity to dedupe on
    let identity = metadata.identity_of(node).ok().flatten();
    let first_copy = match identity {
        Some(identity) => seen.insert(RecordKey::Identity(
            node.node_type.clone(),
            identity.canonical(),
        )),
        None => true,
    };
    if first_copy {
        records.push(Arc::clone(node));
    }

    for association in node.associations.values() {
        for child in association.refs() {
            collect_new_records(child, metadata, seen, records);
        }
    }
}

/// Current value of an association field
#[derive(Debug, Clone, PartialEq)]
pub enum Association {
    One(Option<NodeRef>),
    Many(Vec<NodeRef>),
}

impl Association {
    /// `One(None)` and an empty collection are both empty
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(value) => value.is_none(),
            Self::Many(items) => items.is_empty(),
        }
    }

    /// Multiplicity implied by the shape of this value
    pub fn multiplicity(&self) -> Multiplicity {
        match self {
            Self::One(_) => Multiplicity::One,
            Self::Many(_) => Multiplicity::Many,
        }
    }

    pub fn refs(&self) -> std::slice::Iter<'_, NodeRef> {
        match self {
            Self::One(value) => value.as_slice().iter(),
            Self::Many(items) => items.iter(),
        }
    }
}

/// Owned field value as read and written through a `MetadataProvider`
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Property(Value),
    Association(Association),
}

/// One instance of a domain type.
///
/// # Fields
///
/// - `node_type`: Type name, resolved against the schema registry
/// - `properties`: Scalar fields, including identity fields
/// - `associations`: Links to other nodes, keyed by field name
///
/// `Clone` is shallow: children are shared through `Arc`, so cloning a node
/// never copies the subgraph below it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub node_type: String,
    pub properties: Map<String, Value>,
    pub associations: BTreeMap<String, Association>,
}

impl Node {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            properties: Map::new(),
            associations: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set a singular association to a detached child
    pub fn with_one(self, name: impl Into<String>, child: Node) -> Self {
        self.with_association(name, Association::One(Some(NodeRef::detached(child))))
    }

    /// Set a collection association to detached children, keeping their order
    pub fn with_many(self, name: impl Into<String>, children: impl IntoIterator<Item = Node>) -> Self {
        let refs = children.into_iter().map(NodeRef::detached).collect();
        self.with_association(name, Association::Many(refs))
    }

    pub fn with_association(mut self, name: impl Into<String>, value: Association) -> Self {
        self.associations.insert(name.into(), value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.get(name)
    }

    pub fn set_association(&mut self, name: impl Into<String>, value: Association) {
        self.associations.insert(name.into(), value);
    }

    /// The singular child behind `name`, if set
    pub fn one(&self, name: &str) -> Option<&NodeRef> {
        match self.associations.get(name)? {
            Association::One(value) => value.as_ref(),
            Association::Many(_) => None,
        }
    }

    /// The collection behind `name`; empty when unset or singular
    pub fn many(&self, name: &str) -> &[NodeRef] {
        match self.associations.get(name) {
            Some(Association::Many(items)) => items,
            _ => &[],
        }
    }

    /// Build a node graph from its JSON form.
    ///
    /// The object's `"type"` names the node type; nested objects without one
    /// inherit the association's target type. Keys declared as associations
    /// become association values (object or `null` for ONE, array or `null`
    /// for MANY); everything else is a property.
    pub fn from_json(value: &Value, metadata: &dyn MetadataProvider) -> Result<Self, ValidationError> {
        node_from_json(value, None, "$", metadata)
    }

    /// Render the graph back to JSON, mainly for logs and assertions
    pub fn to_json(&self) -> Value {
        let mut object = self.properties.clone();
        object.insert(TYPE_KEY.to_string(), Value::String(self.node_type.clone()));
        for (name, association) in &self.associations {
            let rendered = match association {
                Association::One(None) => Value::Null,
                Association::One(Some(child)) => child.node().to_json(),
                Association::Many(items) => {
                    Value::Array(items.iter().map(|child| child.node().to_json()).collect())
                }
            };
            object.insert(name.clone(), rendered);
        }
        Value::Object(object)
    }
}

fn node_from_json(
    value: &Value,
    inherited_type: Option<&str>,
    path: &str,
    metadata: &dyn MetadataProvider,
) -> Result<Node, ValidationError> {
    let Value::Object(object) = value else {
        return Err(ValidationError::NotAnObject(path.to_string()));
    };

    let node_type = match object.get(TYPE_KEY) {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        Some(_) => return Err(ValidationError::MissingType(path.to_string())),
        None => inherited_type
            .map(str::to_string)
            .ok_or_else(|| ValidationError::MissingType(path.to_string()))?,
    };

    let fields = metadata
        .associations(&node_type)
        .map_err(|_| ValidationError::UnknownType {
            path: path.to_string(),
            node_type: node_type.clone(),
        })?;

    let mut node = Node::new(node_type.clone());
    for (key, field_value) in object {
        if key == TYPE_KEY {
            continue;
        }
        let Some(field) = fields.iter().find(|f| &f.name == key) else {
            node.properties.insert(key.clone(), field_value.clone());
            continue;
        };

        let field_path = format!("{}.{}", path, key);
        let association = match (field.multiplicity, field_value) {
            (Multiplicity::One, Value::Null) => Association::One(None),
            (Multiplicity::Many, Value::Null) => Association::Many(Vec::new()),
            (Multiplicity::One, Value::Object(_)) => {
                let child = node_from_json(field_value, Some(&field.target_type), &field_path, metadata)?;
                Association::One(Some(NodeRef::detached(child)))
            }
            (Multiplicity::Many, Value::Array(items)) => {
                let mut children = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", field_path, index);
                    let child = node_from_json(item, Some(&field.target_type), &item_path, metadata)?;
                    children.push(NodeRef::detached(child));
                }
                Association::Many(children)
            }
            (Multiplicity::One, _) => {
                return Err(ValidationError::InvalidAssociation {
                    path: path.to_string(),
                    field: key.clone(),
                    reason: "expected an object or null".to_string(),
                })
            }
            (Multiplicity::Many, _) => {
                return Err(ValidationError::InvalidAssociation {
                    path: path.to_string(),
                    field: key.clone(),
                    reason: "expected an array or null".to_string(),
                })
            }
        };
        node.associations.insert(key.clone(), association);
    }

    Ok(node)
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
