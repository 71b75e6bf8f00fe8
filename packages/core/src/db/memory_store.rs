//! In-Memory NodeStore
//!
//! Reference `NodeStore` backed by a hash map. Used by the test suite and
//! benchmarks, and usable by embedders that want attach semantics without a
//! database.
//!
//! Records are keyed by `(node_type, identity)`. Lookups are always counted;
//! stores built with [`InMemoryStore::with_lookup_log`] also record each one so
//! tests can assert exactly which identities were resolved and in what order.

use super::{NodeStore, StoreError};
use crate::models::{Identity, Node};
use crate::schema::MetadataProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type RecordKey = (String, String);

pub struct InMemoryStore {
    metadata: Arc<dyn MetadataProvider>,

    records: RwLock<HashMap<RecordKey, Arc<Node>>>,

    lookup_count: AtomicUsize,

    /// Every lookup issued, in call order; only kept when enabled
    lookup_log: Option<Mutex<Vec<(String, Identity)>>>,

    /// When set, every operation fails with `StoreError::Unavailable`
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            metadata,
            records: RwLock::new(HashMap::new()),
            lookup_count: AtomicUsize::new(0),
            lookup_log: None,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Keep a log of every lookup. The log grows with each call until cleared.
    pub fn with_lookup_log(mut self) -> Self {
        self.lookup_log = Some(Mutex::new(Vec::new()));
        self
    }

    /// Simulate an outage (or recovery from one)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::Acquire)
    }

    /// Lookups issued so far, in call order. Empty unless the log is enabled.
    pub async fn lookup_log(&self) -> Vec<(String, Identity)> {
        match &self.lookup_log {
            Some(log) => log.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Reset the lookup count and the log
    pub async fn clear_lookup_log(&self) {
        self.lookup_count.store(0, Ordering::Release);
        if let Some(log) = &self.lookup_log {
            log.lock().await.clear();
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::unavailable("in-memory store marked unavailable"));
        }
        Ok(())
    }

    fn check_identity(&self, node_type: &str, identity: &Identity) -> Result<(), StoreError> {
        let fields = self
            .metadata
            .identity_fields(node_type)
            .map_err(|e| StoreError::Backend(e.into()))?;

        if fields.len() != identity.len() {
            return Err(StoreError::malformed_identity(
                node_type,
                identity.clone(),
                format!("expected {} values, got {}", fields.len(), identity.len()),
            ));
        }
        if identity
            .values()
            .iter()
            .any(|value| matches!(value, Value::Array(_) | Value::Object(_)))
        {
            return Err(StoreError::malformed_identity(
                node_type,
                identity.clone(),
                "identity values must be scalars",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeStore for InMemoryStore {
    async fn lookup(&self, node_type: &str, identity: &Identity) -> Result<Option<Arc<Node>>, StoreError> {
        self.check_available()?;
        self.lookup_count.fetch_add(1, Ordering::AcqRel);
        if let Some(log) = &self.lookup_log {
            log.lock().await.push((node_type.to_string(), identity.clone()));
        }
        self.check_identity(node_type, identity)?;

        let key = (node_type.to_string(), identity.canonical());
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn insert(&self, node: Node) -> Result<Arc<Node>, StoreError> {
        self.check_available()?;
        let identity = self
            .metadata
            .identity_of(&node)
            .map_err(|e| StoreError::Backend(e.into()))?
            .ok_or_else(|| StoreError::MissingIdentity {
                node_type: node.node_type.clone(),
            })?;
        self.check_identity(&node.node_type, &identity)?;

        let key = (node.node_type.clone(), identity.canonical());
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(StoreError::unique_violation(node.node_type, identity));
        }

        tracing::debug!("Inserted {} {}", node.node_type, identity);
        let node = Arc::new(node);
        records.insert(key, Arc::clone(&node));
        Ok(node)
    }
}
