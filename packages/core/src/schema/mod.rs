//! Schema Metadata
//!
//! Declares, per node type, which fields form its identity and which fields are
//! associations to other nodes. The attacher never inspects values to decide
//! how to treat a field; everything it needs is fixed here at registration time.
//!
//! ## Example Schema Document
//!
//! ```json
//! {
//!   "types": {
//!     "place": {
//!       "identity": ["id"],
//!       "associations": [
//!         { "name": "country", "target_type": "country", "multiplicity": "one", "cascade": true },
//!         { "name": "tags", "target_type": "tag", "multiplicity": "many", "cascade": true },
//!         { "name": "owner", "target_type": "user", "multiplicity": "one" }
//!       ]
//!     },
//!     "country": { "identity": ["code"] },
//!     "tag": { "identity": ["slug"] },
//!     "user": { "identity": ["id"] }
//!   }
//! }
//! ```

mod error;
mod registry;

pub use error::SchemaError;
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};

use crate::models::{is_empty_value, FieldValue, Identity, Node};
use serde::{Deserialize, Serialize};

/// How many nodes an association holds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    One,
    Many,
}

impl std::fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One => write!(f, "one"),
            Self::Many => write!(f, "many"),
        }
    }
}

/// Declaration of one association field on a node type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssociationField {
    /// Field name on the owning node
    pub name: String,

    /// Node type the association points at
    pub target_type: String,

    pub multiplicity: Multiplicity,

    /// Whether attach descends into this association
    ///
    /// Associations that do not cascade are carried over untouched.
    #[serde(default)]
    pub cascade: bool,
}

impl AssociationField {
    /// Non-cascading singular association
    pub fn one(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            multiplicity: Multiplicity::One,
            cascade: false,
        }
    }

    /// Non-cascading collection association
    pub fn many(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            multiplicity: Multiplicity::Many,
            cascade: false,
        }
    }

    /// Mark the association as cascade-eligible
    pub fn cascading(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// Metadata for one node type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySchema {
    /// Identity field names, in lookup order
    #[serde(default)]
    pub identity: Vec<String>,

    #[serde(default)]
    pub associations: Vec<AssociationField>,
}

impl EntitySchema {
    pub fn new<I, S>(identity: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identity: identity.into_iter().map(Into::into).collect(),
            associations: Vec::new(),
        }
    }

    pub fn with_association(mut self, field: AssociationField) -> Self {
        self.associations.push(field);
        self
    }

    pub fn association(&self, name: &str) -> Option<&AssociationField> {
        self.associations.iter().find(|field| field.name == name)
    }
}

/// Source of type metadata for the attacher.
///
/// `identity_fields` and `associations` are the only required methods; the
/// field accessors default to reading and writing `Node` directly.
pub trait MetadataProvider: Send + Sync {
    /// Identity field names for `node_type`, in lookup order
    fn identity_fields(&self, node_type: &str) -> Result<&[String], SchemaError>;

    /// Association declarations for `node_type`
    fn associations(&self, node_type: &str) -> Result<&[AssociationField], SchemaError>;

    /// Current value of `field` on `node`, if set
    fn get_value(&self, node: &Node, field: &str) -> Option<FieldValue> {
        if let Some(association) = node.association(field) {
            return Some(FieldValue::Association(association.clone()));
        }
        node.property(field).cloned().map(FieldValue::Property)
    }

    fn set_value(&self, node: &mut Node, field: &str, value: FieldValue) {
        match value {
            FieldValue::Property(value) => {
                node.properties.insert(field.to_string(), value);
            }
            FieldValue::Association(association) => node.set_association(field, association),
        }
    }

    /// Identity of `node`, or `None` when it is not resolvable.
    ///
    /// Resolvable means the type declares at least one identity field and every
    /// one of them holds a non-empty scalar or structured value.
    fn identity_of(&self, node: &Node) -> Result<Option<Identity>, SchemaError> {
        let fields = self.identity_fields(&node.node_type)?;
        if fields.is_empty() {
            return Ok(None);
        }

        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            match self.get_value(node, field) {
                Some(FieldValue::Property(value)) if !is_empty_value(&value) => values.push(value),
                _ => return Ok(None),
            }
        }
        Ok(Some(Identity::new(values)))
    }
}
