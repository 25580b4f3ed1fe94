//! Document store implementation for PostgreSQL.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use folio_core::config::DEFAULT_ID_FIELD;
use folio_core::error::{StoreError, StoreResult};
use folio_core::models::{Document, get_path};
use folio_core::ports::{Collections, DocumentStore, FindOneOptions, FindOptions};
use folio_core::query::{Filter, Projection, SortKeys};

use super::database::Database;
use super::sql::{push_filter, push_order_by};

// =============================================================================
// Store Implementation
// =============================================================================

/// One collection in the `documents` table.
pub struct PgDocumentStore {
    pool: PgPool,
    collection: String,
    id_field: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, collection: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
            id_field: id_field.into(),
        }
    }

    /// Insert or replace documents, keyed by their identifier.
    #[instrument(skip_all, fields(collection = %self.collection, count = docs.len()))]
    pub async fn upsert_many(&self, docs: &[Document]) -> StoreResult<u64> {
        if docs.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let mut written = 0;
        for doc in docs {
            let id = get_path(doc, &self.id_field).cloned().ok_or_else(|| {
                StoreError::SerializationError(format!(
                    "document has no identifier at {}",
                    self.id_field
                ))
            })?;

            let result = sqlx::query(
                r#"
                INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data
                "#,
            )
            .bind(&self.collection)
            .bind(id)
            .bind(Value::Object(doc.clone()))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

            written += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(written)
    }

    fn select<'a>(&self, filter: &Filter) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new("SELECT data FROM documents WHERE collection = ");
        qb.push_bind(self.collection.clone());
        qb.push(" AND ");
        push_filter(&mut qb, filter);
        qb
    }

    async fn fetch(
        &self,
        filter: &Filter,
        sort: &SortKeys,
        skip: usize,
        limit: Option<usize>,
        projection: Option<&Projection>,
    ) -> StoreResult<Vec<Document>> {
        let mut qb = self.select(filter);
        push_order_by(&mut qb, sort);
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit as i64);
        }
        if skip > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(skip as i64);
        }

        let rows: Vec<DocumentRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let doc = row.into_document()?;
                Ok(match projection {
                    Some(p) => p.apply(&doc),
                    None => doc,
                })
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[instrument(skip_all, fields(collection = %self.collection, limit = options.limit, skip = options.skip))]
    async fn find(&self, filter: &Filter, options: FindOptions) -> StoreResult<Vec<Document>> {
        let docs = self
            .fetch(
                filter,
                &options.sort,
                options.skip,
                options.limit,
                options.projection.as_ref(),
            )
            .await?;
        debug!(results = docs.len(), "find");
        Ok(docs)
    }

    #[instrument(skip_all, fields(collection = %self.collection))]
    async fn find_one(
        &self,
        filter: &Filter,
        options: FindOneOptions,
    ) -> StoreResult<Option<Document>> {
        let mut docs = self
            .fetch(filter, &options.sort, 0, Some(1), options.projection.as_ref())
            .await?;
        Ok(docs.pop())
    }

    #[instrument(skip_all, fields(collection = %self.collection))]
    async fn count_documents(&self, filter: &Filter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents WHERE collection = ");
        qb.push_bind(self.collection.clone());
        qb.push(" AND ");
        push_filter(&mut qb, filter);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(count as u64)
    }
}

// =============================================================================
// Collections
// =============================================================================

/// Hands out a [`PgDocumentStore`] per collection name.
pub struct PgCollections {
    db: Arc<Database>,
    id_field: String,
}

impl PgCollections {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_id_field(db, DEFAULT_ID_FIELD)
    }

    pub fn with_id_field(db: Arc<Database>, id_field: impl Into<String>) -> Self {
        Self {
            db,
            id_field: id_field.into(),
        }
    }

    pub fn store(&self, name: &str) -> PgDocumentStore {
        PgDocumentStore::new(self.db.pool().clone(), name, self.id_field.clone())
    }
}

#[async_trait]
impl Collections for PgCollections {
    async fn collection(&self, name: &str) -> StoreResult<Arc<dyn DocumentStore>> {
        Ok(Arc::new(self.store(name)))
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct DocumentRow {
    data: Value,
}

impl DocumentRow {
    fn into_document(self) -> StoreResult<Document> {
        match self.data {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::SerializationError(format!(
                "stored document is not an object: {other}"
            ))),
        }
    }
}
