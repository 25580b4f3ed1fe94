//! GraphQL schema definition.
//!
//! This module exposes document collections as Relay-style connections.
//! Connection fields resolve lazily from one shared paginator, so a query
//! asking only for `pageInfo { hasNextPage }` costs a single window fetch.

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema, SchemaBuilder};
use serde_json::Value;
use tracing::debug;

use folio_core::config::PaginationConfig;
use folio_core::ports::{Collections, DocumentStore, Edge, Paginated};
use folio_core::query::{Direction, Filter, SortOrder, SortSpec};
use folio_core::services::{
    CursorPage, CursorParams, OffsetPage, OffsetParams, find_with_cursor, find_with_offset,
};

use crate::types::FolioSchema;

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the GraphQL schema over a set of collections.
///
/// Includes query depth and complexity limits for DoS protection.
pub fn build_schema(collections: Arc<dyn Collections>, config: PaginationConfig) -> FolioSchema {
    schema_builder(collections, config)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

/// Create a schema builder with the collections and pagination settings.
///
/// Remember to call `.limit_depth()` and `.limit_complexity()` before `.finish()`.
pub fn schema_builder(
    collections: Arc<dyn Collections>,
    config: PaginationConfig,
) -> SchemaBuilder<DocumentQuery, EmptyMutation, EmptySubscription> {
    Schema::build(DocumentQuery, EmptyMutation, EmptySubscription)
        .data(collections)
        .data(config)
}

// -----------------------------------------------------------------------------
// Document Query
// -----------------------------------------------------------------------------

/// Query root: paginated access to document collections.
#[derive(Default)]
pub struct DocumentQuery;

#[Object]
impl DocumentQuery {
    /// Page through a collection by cursor.
    ///
    /// `first`/`after` read forward, `last`/`before` read backward.
    #[allow(clippy::too_many_arguments)]
    async fn documents<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        collection: String,
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
        sort_field: Option<String>,
        #[graphql(default)] sort_order: Order,
        query: Option<Value>,
    ) -> Result<DocumentConnection> {
        let config = ctx.data::<PaginationConfig>()?;
        let store = collection_store(ctx, &collection).await?;
        let (limit, cursor, direction) = resolve_relay_args(first, after, last, before, config)?;

        let params = CursorParams {
            query: parse_query(query)?,
            sort: sort_spec(sort_field, sort_order, config)?,
            limit: Some(limit),
            cursor,
            direction,
            ..Default::default()
        };
        debug!(%collection, limit, %direction, "documents");

        let page = find_with_cursor(store, params, config)?;
        Ok(DocumentConnection {
            page: Arc::new(page),
        })
    }

    /// Page through a collection by offset.
    #[allow(clippy::too_many_arguments)]
    async fn documents_by_offset<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        collection: String,
        limit: Option<i32>,
        #[graphql(default)] offset: i32,
        sort_field: Option<String>,
        #[graphql(default)] sort_order: Order,
        query: Option<Value>,
    ) -> Result<OffsetDocumentConnection> {
        let config = ctx.data::<PaginationConfig>()?;
        let store = collection_store(ctx, &collection).await?;

        let params = OffsetParams {
            query: parse_query(query)?,
            sort: sort_spec(sort_field, sort_order, config)?,
            limit: Some(validate_page_size(limit, config)),
            offset: Some(i64::from(offset)),
            ..Default::default()
        };
        debug!(%collection, offset, "documentsByOffset");

        let page = find_with_offset(store, params, config)?;
        Ok(OffsetDocumentConnection {
            page: Arc::new(page),
        })
    }
}

// -----------------------------------------------------------------------------
// GraphQL Types
// -----------------------------------------------------------------------------

/// Sort order.
#[derive(async_graphql::Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortOrder::Asc,
            Order::Desc => SortOrder::Desc,
        }
    }
}

/// A document paired with its cursor.
#[derive(async_graphql::SimpleObject)]
pub struct DocumentEdge {
    pub node: Value,
    pub cursor: String,
}

impl From<Edge> for DocumentEdge {
    fn from(edge: Edge) -> Self {
        let cursor = edge.cursor().value;
        Self {
            node: Value::Object(edge.node),
            cursor,
        }
    }
}

// -----------------------------------------------------------------------------
// Connection Types (Relay-style pagination)
// -----------------------------------------------------------------------------

/// Cursor-paginated documents.
pub struct DocumentConnection {
    page: Arc<CursorPage>,
}

#[Object]
impl DocumentConnection {
    /// Documents matching the query, ignoring the cursor.
    async fn total_count(&self) -> Result<i64> {
        Ok(self.page.total_count().await? as i64)
    }

    async fn edges(&self) -> Result<Vec<DocumentEdge>> {
        Ok(edges_of(self.page.as_ref()).await?)
    }

    async fn page_info(&self) -> PageInfo {
        PageInfo {
            page: self.page.clone(),
        }
    }
}

/// Page boundaries and absolute positions of a cursor page.
pub struct PageInfo {
    page: Arc<CursorPage>,
}

#[Object]
impl PageInfo {
    async fn has_next_page(&self) -> Result<bool> {
        Ok(self.page.has_next_page().await?)
    }

    async fn has_previous_page(&self) -> Result<bool> {
        Ok(self.page.has_previous_page().await?)
    }

    async fn start_cursor(&self) -> Result<Option<String>> {
        Ok(self.page.start_cursor().await?.map(|c| c.value))
    }

    async fn end_cursor(&self) -> Result<Option<String>> {
        Ok(self.page.end_cursor().await?.map(|c| c.value))
    }

    /// 1-based position of the first edge (0 when the page is empty).
    async fn starting_position(&self) -> Result<i64> {
        Ok(self.page.starting_position().await? as i64)
    }

    /// 1-based position of the last edge (0 when the page is empty).
    async fn ending_position(&self) -> Result<i64> {
        Ok(self.page.ending_position().await? as i64)
    }
}

/// Offset-paginated documents.
pub struct OffsetDocumentConnection {
    page: Arc<OffsetPage>,
}

#[Object]
impl OffsetDocumentConnection {
    async fn total_count(&self) -> Result<i64> {
        Ok(self.page.total_count().await? as i64)
    }

    async fn edges(&self) -> Result<Vec<DocumentEdge>> {
        Ok(edges_of(self.page.as_ref()).await?)
    }

    async fn page_info(&self) -> OffsetPageInfo {
        OffsetPageInfo {
            page: self.page.clone(),
        }
    }
}

pub struct OffsetPageInfo {
    page: Arc<OffsetPage>,
}

#[Object]
impl OffsetPageInfo {
    async fn has_next_page(&self) -> Result<bool> {
        Ok(self.page.has_next_page().await?)
    }

    async fn has_previous_page(&self) -> Result<bool> {
        Ok(self.page.has_previous_page().await?)
    }

    async fn start_cursor(&self) -> Result<Option<String>> {
        Ok(self.page.start_cursor().await?.map(|c| c.value))
    }

    async fn end_cursor(&self) -> Result<Option<String>> {
        Ok(self.page.end_cursor().await?.map(|c| c.value))
    }

    async fn start_offset(&self) -> i64 {
        self.page.start_offset() as i64
    }

    async fn end_offset(&self) -> Result<i64> {
        Ok(self.page.end_offset().await? as i64)
    }
}

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

/// Maximum length for collection names.
const MAX_COLLECTION_NAME_LENGTH: usize = 64;

/// Maximum length for a sort field path.
const MAX_SORT_FIELD_LENGTH: usize = 256;

async fn edges_of(page: &dyn Paginated) -> folio_core::error::PaginationResult<Vec<DocumentEdge>> {
    Ok(page.edges().await?.into_iter().map(DocumentEdge::from).collect())
}

async fn collection_store<'ctx>(
    ctx: &Context<'ctx>,
    name: &str,
) -> Result<Arc<dyn DocumentStore>> {
    validate_collection_name(name)?;
    let collections = ctx.data::<Arc<dyn Collections>>()?;
    Ok(collections.collection(name).await?)
}

/// Validate a collection name: 1-64 characters of `[A-Za-z0-9_-]`.
fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(async_graphql::Error::new("collection cannot be empty"));
    }
    if name.len() > MAX_COLLECTION_NAME_LENGTH {
        return Err(async_graphql::Error::new(format!(
            "collection too long: maximum {} characters allowed",
            MAX_COLLECTION_NAME_LENGTH
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(async_graphql::Error::new(
            "Invalid collection: only letters, digits, '_' and '-' are allowed",
        ));
    }
    Ok(())
}

/// Validate and normalize a page size.
fn validate_page_size(size: Option<i32>, config: &PaginationConfig) -> i64 {
    let max = i64::try_from(config.max_limit).unwrap_or(i64::MAX);
    let default = i64::try_from(config.default_limit).unwrap_or(max);
    size.map(i64::from).unwrap_or(default).clamp(1, max)
}

/// Turn Relay arguments into a limit, a cursor and a direction.
fn resolve_relay_args(
    first: Option<i32>,
    after: Option<String>,
    last: Option<i32>,
    before: Option<String>,
    config: &PaginationConfig,
) -> Result<(i64, Option<String>, Direction)> {
    if first.is_some() && last.is_some() {
        return Err(async_graphql::Error::new("Cannot combine `first` and `last`"));
    }
    if after.is_some() && before.is_some() {
        return Err(async_graphql::Error::new("Cannot combine `after` and `before`"));
    }

    if last.is_some() || before.is_some() {
        Ok((validate_page_size(last, config), before, Direction::Before))
    } else {
        Ok((validate_page_size(first, config), after, Direction::After))
    }
}

fn sort_spec(field: Option<String>, order: Order, config: &PaginationConfig) -> Result<SortSpec> {
    let field = field.unwrap_or_else(|| config.id_field.clone());
    if field.is_empty() || field.len() > MAX_SORT_FIELD_LENGTH {
        return Err(async_graphql::Error::new("Invalid sortField"));
    }
    Ok(SortSpec::new(field, order.into()))
}

fn parse_query(query: Option<Value>) -> Result<Filter> {
    match query {
        None => Ok(Filter::All),
        Some(doc) => Ok(Filter::from_document(&doc)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_name_validation() {
        assert!(validate_collection_name("people_2024-v2").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name(&"a".repeat(65)).is_err());
        // injection attempts
        assert!(validate_collection_name("x; DROP TABLE documents").is_err());
        assert!(validate_collection_name("a.b").is_err());
    }

    #[test]
    fn test_page_size_clamping() {
        let config = PaginationConfig::default();
        assert_eq!(validate_page_size(None, &config), 10);
        assert_eq!(validate_page_size(Some(-5), &config), 1);
        assert_eq!(validate_page_size(Some(0), &config), 1);
        assert_eq!(validate_page_size(Some(10_000), &config), 100);
    }

    #[test]
    fn test_relay_args_pick_direction() {
        let config = PaginationConfig::default();

        let (limit, cursor, direction) =
            resolve_relay_args(Some(5), Some("c".into()), None, None, &config).unwrap();
        assert_eq!((limit, cursor.as_deref(), direction), (5, Some("c"), Direction::After));

        let (limit, cursor, direction) =
            resolve_relay_args(None, None, Some(3), Some("c".into()), &config).unwrap();
        assert_eq!((limit, cursor.as_deref(), direction), (3, Some("c"), Direction::Before));

        assert!(resolve_relay_args(Some(1), None, Some(1), None, &config).is_err());
        assert!(resolve_relay_args(None, Some("a".into()), None, Some("b".into()), &config).is_err());
    }

    #[test]
    fn test_query_parsing() {
        assert!(parse_query(None).unwrap().is_all());
        assert!(parse_query(Some(json!({"v": {"$gt": 1}}))).is_ok());
        assert!(parse_query(Some(json!({"$where": "1"}))).is_err());
    }
}
