//! Integration tests for the attach-then-persist workflow
//!
//! Tests cover:
//! - Loading the schema registry from a JSON document
//! - Attaching API-shaped JSON payloads
//! - Persisting the new records an attach call reports
//! - Re-attaching the same payload after persistence
//! - Keeping a lookup miss apart from an insert conflict

use anyhow::Result;
use graft_core::{
    db::{InMemoryStore, NodeStore, StoreError},
    models::{Identity, NodeRef},
    schema::SchemaRegistry,
    services::{AttachError, GraphAttacher},
};
use serde_json::{json, Value};
use std::sync::Arc;

const SCHEMA: &str = r#"{
    "types": {
        "place": {
            "identity": ["id"],
            "associations": [
                { "name": "locality", "target_type": "locality", "multiplicity": "one", "cascade": true },
                { "name": "tags", "target_type": "tag", "multiplicity": "many", "cascade": true },
                { "name": "created_by", "target_type": "user", "multiplicity": "one" }
            ]
        },
        "locality": {
            "identity": ["id"],
            "associations": [
                { "name": "country", "target_type": "country", "multiplicity": "one", "cascade": true }
            ]
        },
        "country": { "identity": ["code"] },
        "tag": { "identity": ["slug"] },
        "user": { "identity": ["id"] }
    }
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test helper: Create a test environment
fn create_test_env() -> Result<(GraphAttacher, Arc<InMemoryStore>)> {
    init_tracing();
    let registry = Arc::new(SchemaRegistry::from_json_str(SCHEMA)?);
    let store = Arc::new(InMemoryStore::new(registry.clone()));
    let attacher = GraphAttacher::new(registry, store.clone());
    Ok((attacher, store))
}

fn wellington_payload() -> Value {
    json!({
        "type": "place",
        "id": 6943,
        "name": "Te Papa",
        "locality": {
            "id": 2179537,
            "name": "Wellington",
            "country": { "code": "NZ", "name": "New Zealand" }
        },
        "tags": [ { "slug": "museum" }, { "slug": "waterfront" } ],
        "created_by": { "id": 42 }
    })
}

/// Caller side of the contract: persist everything attach reported as new
async fn persist(
    attacher: &GraphAttacher,
    store: &InMemoryStore,
    attached: &NodeRef,
) -> Result<usize, StoreError> {
    let records = attacher.new_records(attached);
    for record in &records {
        store.insert(record.as_ref().clone()).await?;
    }
    Ok(records.len())
}

// =========================================================================
// Workflow Tests
// =========================================================================

#[tokio::test]
async fn test_fresh_payload_is_entirely_new() -> Result<()> {
    let (attacher, store) = create_test_env()?;

    let attached = attacher.attach_value(&wellington_payload()).await?;
    assert!(attached.is_new());

    let types: Vec<String> = attacher
        .new_records(&attached)
        .iter()
        .map(|node| node.node_type.clone())
        .collect();
    // created_by does not cascade: the user is never looked up, but it is
    // still a detached node the caller has to persist
    assert_eq!(types, vec!["place", "user", "locality", "country", "tag", "tag"]);

    // One lookup per cascaded node
    assert_eq!(store.lookup_count(), 5);
    assert!(store.is_empty().await, "attach must not write to the store");
    Ok(())
}

#[tokio::test]
async fn test_reattach_after_persist_reuses_stored_records() -> Result<()> {
    let (attacher, store) = create_test_env()?;

    let first = attacher.attach_value(&wellington_payload()).await?;
    assert_eq!(persist(&attacher, &store, &first).await?, 6);
    assert_eq!(store.len().await, 6);

    let second = attacher.attach_value(&wellington_payload()).await?;
    assert!(second.is_existing());
    assert!(attacher.new_records(&second).is_empty());

    let stored = store.lookup("place", &Identity::single(6943)).await?.unwrap();
    assert!(Arc::ptr_eq(second.node(), &stored));
    Ok(())
}

#[tokio::test]
async fn test_partially_known_payload() -> Result<()> {
    let (attacher, store) = create_test_env()?;
    let country = store
        .insert(graft_core::Node::new("country").with_property("code", "NZ"))
        .await?;
    let museum = store
        .insert(graft_core::Node::new("tag").with_property("slug", "museum"))
        .await?;

    let attached = attacher.attach_value(&wellington_payload()).await?;

    let locality = attached.node().one("locality").unwrap();
    assert!(locality.is_new());
    assert!(Arc::ptr_eq(locality.node().one("country").unwrap().node(), &country));

    let tags = attached.node().many("tags");
    assert!(Arc::ptr_eq(tags[0].node(), &museum));
    assert!(tags[1].is_new());

    // Stored country keeps its own fields; the payload's name is dropped
    assert!(locality.node().one("country").unwrap().node().property("name").is_none());

    assert_eq!(persist(&attacher, &store, &attached).await?, 4);
    assert_eq!(store.len().await, 6);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_writer_surfaces_as_unique_violation() -> Result<()> {
    let (attacher, store) = create_test_env()?;

    let attached = attacher
        .attach_value(&json!({ "type": "tag", "slug": "museum" }))
        .await?;
    assert!(attached.is_new());

    // Another writer commits the same identity between attach and persist
    store
        .insert(graft_core::Node::new("tag").with_property("slug", "museum"))
        .await?;

    let err = persist(&attacher, &store, &attached).await.unwrap_err();
    assert!(err.is_unique_violation());

    // Attaching again now resolves to the stored record
    let retried = attacher
        .attach_value(&json!({ "type": "tag", "slug": "museum" }))
        .await?;
    assert!(retried.is_existing());
    Ok(())
}

#[tokio::test]
async fn test_outage_aborts_without_result() -> Result<()> {
    let (attacher, store) = create_test_env()?;
    store.set_unavailable(true);

    let err = attacher.attach_value(&wellington_payload()).await.unwrap_err();
    assert!(matches!(err, AttachError::Store(StoreError::Unavailable(_))));
    Ok(())
}

#[tokio::test]
async fn test_payload_with_wrong_shape_rejected() -> Result<()> {
    let (attacher, store) = create_test_env()?;

    let err = attacher
        .attach_value(&json!({ "type": "place", "id": 1, "tags": { "slug": "museum" } }))
        .await
        .unwrap_err();
    assert!(matches!(err, AttachError::InvalidInput(_)));
    assert_eq!(store.lookup_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_payload_repeating_an_identity_persists_cleanly() -> Result<()> {
    let (attacher, store) = create_test_env()?;

    let payload = json!({
        "type": "place",
        "id": 7,
        "tags": [ { "slug": "museum" }, { "slug": "art" }, { "slug": "museum" } ]
    });
    let attached = attacher.attach_value(&payload).await?;

    assert_eq!(persist(&attacher, &store, &attached).await?, 3);
    assert_eq!(store.len().await, 3);
    Ok(())
}
