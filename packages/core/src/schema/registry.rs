//! Static Schema Registry
//!
//! Immutable `type -> EntitySchema` table, built once at startup either from
//! code or from a JSON document, then shared behind an `Arc`.
//!
//! Every definition is validated as a whole when the registry is built, so a
//! registry that exists is internally consistent: association targets resolve,
//! field names are unique per type.

use super::{AssociationField, EntitySchema, MetadataProvider, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// On-disk shape of a schema document
#[derive(Debug, Serialize, Deserialize)]
struct SchemaDocument {
    types: BTreeMap<String, EntitySchema>,
}

/// Declarative metadata provider
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Load a registry from a `{"types": {...}}` JSON document
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        document
            .types
            .into_iter()
            .fold(Self::builder(), |builder, (name, schema)| builder.entity(name, schema))
            .build()
    }

    /// Serialize the registry back into its document form
    pub fn to_json_string(&self) -> Result<String, SchemaError> {
        let document = SchemaDocument {
            types: self
                .entities
                .iter()
                .map(|(name, schema)| (name.clone(), schema.clone()))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    pub fn schema(&self, node_type: &str) -> Result<&EntitySchema, SchemaError> {
        self.entities
            .get(node_type)
            .ok_or_else(|| SchemaError::unknown_type(node_type))
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.entities.contains_key(node_type)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl MetadataProvider for SchemaRegistry {
    fn identity_fields(&self, node_type: &str) -> Result<&[String], SchemaError> {
        Ok(&self.schema(node_type)?.identity)
    }

    fn associations(&self, node_type: &str) -> Result<&[AssociationField], SchemaError> {
        Ok(&self.schema(node_type)?.associations)
    }
}

/// Collects entity definitions and validates them together on `build`
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    entities: Vec<(String, EntitySchema)>,
}

impl SchemaRegistryBuilder {
    pub fn entity(mut self, node_type: impl Into<String>, schema: EntitySchema) -> Self {
        self.entities.push((node_type.into(), schema));
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut entities = HashMap::with_capacity(self.entities.len());
        for (node_type, schema) in self.entities {
            if node_type.is_empty() {
                return Err(SchemaError::invalid_definition("node type name cannot be empty"));
            }
            if entities.contains_key(&node_type) {
                return Err(SchemaError::DuplicateType(node_type));
            }
            check_field_names(&node_type, &schema)?;
            entities.insert(node_type, schema);
        }

        for (node_type, schema) in &entities {
            for field in &schema.associations {
                if !entities.contains_key(&field.target_type) {
                    return Err(SchemaError::UnknownTarget {
                        node_type: node_type.clone(),
                        field: field.name.clone(),
                        target_type: field.target_type.clone(),
                    });
                }
            }
        }

        tracing::debug!("Built schema registry with {} node types", entities.len());
        Ok(SchemaRegistry { entities })
    }
}

fn check_field_names(node_type: &str, schema: &EntitySchema) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    let names = schema
        .identity
        .iter()
        .chain(schema.associations.iter().map(|field| &field.name));
    for name in names {
        if name.is_empty() {
            return Err(SchemaError::invalid_definition(format!(
                "empty field name on '{}'",
                node_type
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(SchemaError::duplicate_field(node_type, name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, Node};
    use crate::schema::Multiplicity;
    use serde_json::json;

    fn place_registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .entity(
                "place",
                EntitySchema::new(["id"])
                    .with_association(AssociationField::one("country", "country").cascading())
                    .with_association(AssociationField::many("tags", "tag").cascading())
                    .with_association(AssociationField::one("owner", "user")),
            )
            .entity("country", EntitySchema::new(["code"]))
            .entity("tag", EntitySchema::new(["slug"]))
            .entity("user", EntitySchema::new(["id"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_registers_types() {
        let registry = place_registry();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.type_names(), vec!["country", "place", "tag", "user"]);
        assert_eq!(registry.identity_fields("country").unwrap(), &["code".to_string()]);
        assert!(registry.contains("tag"));
        assert!(!registry.contains("planet"));

        let associations = registry.associations("place").unwrap();
        assert_eq!(associations.len(), 3);
        assert_eq!(associations[1].multiplicity, Multiplicity::Many);
        assert!(!associations[2].cascade);
    }

    #[test]
    fn test_unknown_type() {
        let registry = place_registry();
        let err = registry.identity_fields("planet").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(ref t) if t == "planet"));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let result = SchemaRegistry::builder()
            .entity("tag", EntitySchema::new(["slug"]))
            .entity("tag", EntitySchema::new(["id"]))
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateType(_))));
    }

    #[test]
    fn test_association_colliding_with_identity_rejected() {
        let result = SchemaRegistry::builder()
            .entity(
                "tag",
                EntitySchema::new(["slug"]).with_association(AssociationField::one("slug", "tag")),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let result = SchemaRegistry::builder()
            .entity(
                "place",
                EntitySchema::new(["id"]).with_association(AssociationField::one("country", "country")),
            )
            .build();
        match result {
            Err(SchemaError::UnknownTarget { target_type, .. }) => assert_eq!(target_type, "country"),
            other => panic!("expected UnknownTarget, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_str() {
        let registry = SchemaRegistry::from_json_str(
            r#"{
                "types": {
                    "place": {
                        "identity": ["id"],
                        "associations": [
                            { "name": "related", "target_type": "place", "multiplicity": "many", "cascade": true },
                            { "name": "owner", "target_type": "user", "multiplicity": "one" }
                        ]
                    },
                    "user": { "identity": ["id"] }
                }
            }"#,
        )
        .unwrap();

        let place = registry.schema("place").unwrap();
        assert!(place.association("related").unwrap().cascade);
        assert!(!place.association("owner").unwrap().cascade);
        assert!(registry.associations("user").unwrap().is_empty());
    }

    #[test]
    fn test_from_json_str_invalid_document() {
        let result = SchemaRegistry::from_json_str(r#"{"types": {"place": {"identity": 7}}}"#);
        assert!(matches!(result, Err(SchemaError::InvalidDocument(_))));
    }

    #[test]
    fn test_document_roundtrip_preserves_definitions() {
        let registry = place_registry();
        let json = registry.to_json_string().unwrap();
        let reloaded = SchemaRegistry::from_json_str(&json).unwrap();
        assert_eq!(
            reloaded.schema("place").unwrap(),
            registry.schema("place").unwrap()
        );
    }

    #[test]
    fn test_identity_of_requires_every_field() {
        let registry = SchemaRegistry::builder()
            .entity("slot", EntitySchema::new(["venue", "starts_at"]))
            .build()
            .unwrap();

        let full = Node::new("slot")
            .with_property("venue", json!("hall"))
            .with_property("starts_at", json!(900));
        assert_eq!(
            registry.identity_of(&full).unwrap(),
            Some(Identity::new(vec![json!("hall"), json!(900)]))
        );

        let partial = Node::new("slot").with_property("venue", json!("hall"));
        assert_eq!(registry.identity_of(&partial).unwrap(), None);

        let blank = Node::new("slot")
            .with_property("venue", json!(""))
            .with_property("starts_at", json!(900));
        assert_eq!(registry.identity_of(&blank).unwrap(), None);
    }

    #[test]
    fn test_identity_of_type_without_identity_fields() {
        let registry = SchemaRegistry::builder()
            .entity("note", EntitySchema::default())
            .build()
            .unwrap();
        let note = Node::new("note").with_property("id", json!(1));
        assert_eq!(registry.identity_of(&note).unwrap(), None);
    }
}
