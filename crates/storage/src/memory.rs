//! In-memory document store.
//!
//! Evaluates filters with the core predicate matcher and orders with the
//! core value order, so it behaves like the PostgreSQL adapter without a
//! database. Every query it serves is recorded for inspection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::trace;

use folio_core::error::{StoreError, StoreResult};
use folio_core::models::Document;
use folio_core::ports::{Collections, DocumentStore, FindOneOptions, FindOptions};
use folio_core::query::{Filter, Projection, SortKeys};

// =============================================================================
// Query Log
// =============================================================================

/// Store operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    Find,
    FindOne,
    Count,
}

/// A query served by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    pub op: QueryOp,
    pub filter: Filter,
}

// =============================================================================
// MemoryStore
// =============================================================================

/// A single collection held in memory.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<Vec<Document>>,
    log: Mutex<Vec<QueryRecord>>,
}

impl MemoryStore {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: RwLock::new(docs),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the stored documents in insertion order.
    pub async fn documents(&self) -> Vec<Document> {
        self.docs.read().await.clone()
    }

    /// Remove every document matching `filter`, returning how many were removed.
    pub async fn delete_many(&self, filter: &Filter) -> u64 {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        (before - docs.len()) as u64
    }

    /// Queries served so far, oldest first.
    pub async fn queries(&self) -> Vec<QueryRecord> {
        self.log.lock().await.clone()
    }

    pub async fn clear_queries(&self) {
        self.log.lock().await.clear();
    }

    async fn record(&self, op: QueryOp, filter: &Filter) {
        trace!(?op, filter = %filter.to_document(), "Memory store query");
        self.log.lock().await.push(QueryRecord {
            op,
            filter: filter.clone(),
        });
    }

    async fn select(
        &self,
        filter: &Filter,
        sort: &SortKeys,
        skip: usize,
        limit: Option<usize>,
        projection: Option<&Projection>,
    ) -> Vec<Document> {
        let docs = self.docs.read().await;
        let mut matched: Vec<&Document> = docs.iter().filter(|d| filter.matches(d)).collect();
        if !sort.is_empty() {
            matched.sort_by(|a, b| sort.compare(a, b));
        }

        matched
            .into_iter()
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .map(|d| match projection {
                Some(p) => p.apply(d),
                None => d.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, filter: &Filter, options: FindOptions) -> StoreResult<Vec<Document>> {
        self.record(QueryOp::Find, filter).await;
        Ok(self
            .select(
                filter,
                &options.sort,
                options.skip,
                options.limit,
                options.projection.as_ref(),
            )
            .await)
    }

    async fn find_one(
        &self,
        filter: &Filter,
        options: FindOneOptions,
    ) -> StoreResult<Option<Document>> {
        self.record(QueryOp::FindOne, filter).await;
        Ok(self
            .select(filter, &options.sort, 0, Some(1), options.projection.as_ref())
            .await
            .pop())
    }

    async fn count_documents(&self, filter: &Filter) -> StoreResult<u64> {
        self.record(QueryOp::Count, filter).await;
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| filter.matches(d)).count() as u64)
    }
}

// =============================================================================
// MemoryCollections
// =============================================================================

/// Named in-memory collections.
#[derive(Default)]
pub struct MemoryCollections {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryCollections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build collections from `{"name": [doc, ...], ...}`.
    pub fn from_seed(seed: &Value) -> StoreResult<Self> {
        let map = seed.as_object().ok_or_else(|| {
            StoreError::SerializationError("seed must map collection names to arrays".into())
        })?;

        let mut stores = HashMap::with_capacity(map.len());
        for (name, docs) in map {
            let docs = docs
                .as_array()
                .ok_or_else(|| {
                    StoreError::SerializationError(format!("seed for {name} must be an array"))
                })?
                .iter()
                .map(|doc| {
                    doc.as_object().cloned().ok_or_else(|| {
                        StoreError::SerializationError(format!(
                            "seed for {name} contains a non-object document"
                        ))
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            stores.insert(name.clone(), Arc::new(MemoryStore::new(docs)));
        }

        Ok(Self {
            stores: RwLock::new(stores),
        })
    }

    /// Create or replace a collection.
    pub async fn insert(&self, name: impl Into<String>, docs: Vec<Document>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new(docs));
        self.stores.write().await.insert(name.into(), store.clone());
        store
    }

    /// Concrete store for a collection, if present.
    pub async fn store(&self, name: &str) -> Option<Arc<MemoryStore>> {
        self.stores.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Collections for MemoryCollections {
    async fn collection(&self, name: &str) -> StoreResult<Arc<dyn DocumentStore>> {
        self.store(name)
            .await
            .map(|store| store as Arc<dyn DocumentStore>)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }
}
