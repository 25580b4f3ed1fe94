//! Port traits for document stores.
//!
//! These traits define the storage interface consumed by the paginators.
//! Implementations live in the infrastructure layer (e.g., `folio-storage`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::Document;
use crate::query::{Filter, Projection, SortKeys};

// =============================================================================
// Query Options
// =============================================================================

/// Options for multi-document queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort keys, applied in order.
    pub sort: SortKeys,
    /// Maximum number of documents to return (`None` = unbounded).
    pub limit: Option<usize>,
    /// Number of matching documents to skip first.
    pub skip: usize,
    /// Fields to return (`None` = whole document).
    pub projection: Option<Projection>,
}

/// Options for single-document lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOneOptions {
    pub sort: SortKeys,
    pub projection: Option<Projection>,
}

// =============================================================================
// Store Traits
// =============================================================================

/// A queryable collection of documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch matching documents in the requested order.
    async fn find(&self, filter: &Filter, options: FindOptions) -> StoreResult<Vec<Document>>;

    /// Fetch the first matching document in the requested order.
    async fn find_one(
        &self,
        filter: &Filter,
        options: FindOneOptions,
    ) -> StoreResult<Option<Document>>;

    /// Count matching documents.
    async fn count_documents(&self, filter: &Filter) -> StoreResult<u64>;
}

/// Named access to collections.
#[async_trait]
pub trait Collections: Send + Sync {
    /// Get the store backing a collection.
    async fn collection(&self, name: &str) -> StoreResult<Arc<dyn DocumentStore>>;
}
