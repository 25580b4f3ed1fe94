//! Offset paginator.
//!
//! Skip/limit pagination against a live store. One query answers both page
//! flags: it starts one row early when `offset > 0` (the previous-page
//! sentinel) and reads one row past the page (the peek).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::PaginationConfig;
use crate::error::{PaginationResult, ValidationError};
use crate::memo::Memo;
use crate::metrics::{WindowTimer, record_page_served, record_store_query};
use crate::models::{Document, get_path};
use crate::ports::{Cursor, DocumentStore, Edge, EdgeFormatter, FindOptions, LoadHook, Paginated};
use crate::query::{Filter, Projection, SortKeys, SortSpec};

/// Inputs of an offset pagination call.
#[derive(Clone, Default)]
pub struct OffsetParams {
    pub query: Filter,
    pub sort: SortSpec,
    /// Page size (`None` = configured default).
    pub limit: Option<i64>,
    /// Records to skip (`None` = 0).
    pub offset: Option<i64>,
    /// Fields to return. The identifier is always added.
    pub projection: Option<Projection>,
    pub format_edge: Option<EdgeFormatter>,
    /// Called with the page's documents each time edges are loaded.
    pub on_load_edges: Option<LoadHook>,
}

#[derive(Debug)]
struct Window {
    results: Vec<Document>,
    has_previous: bool,
    has_more: bool,
}

/// Validate inputs and prepare an offset page.
pub fn find_with_offset(
    store: Arc<dyn DocumentStore>,
    params: OffsetParams,
    config: &PaginationConfig,
) -> PaginationResult<OffsetPage> {
    let limit = config.resolve_limit(params.limit)?;
    let offset = config.resolve_offset(params.offset)?;

    if params.sort.field.trim().is_empty() {
        return Err(ValidationError::MissingSortField.into());
    }

    Ok(OffsetPage {
        store,
        base: params.query,
        keys: SortKeys::for_spec(&params.sort, &config.id_field),
        id_field: config.id_field.clone(),
        limit,
        offset,
        projection: params
            .projection
            .map(|p| p.with_field(config.id_field.clone())),
        format_edge: params.format_edge,
        on_load_edges: params.on_load_edges,
        window: Memo::new(),
        total: Memo::new(),
    })
}

/// One offset page, resolved lazily.
pub struct OffsetPage {
    store: Arc<dyn DocumentStore>,
    base: Filter,
    keys: SortKeys,
    id_field: String,
    limit: usize,
    offset: usize,
    projection: Option<Projection>,
    format_edge: Option<EdgeFormatter>,
    on_load_edges: Option<LoadHook>,
    window: Memo<Arc<Window>>,
    total: Memo<u64>,
}

impl OffsetPage {
    async fn window(&self) -> PaginationResult<Arc<Window>> {
        self.window
            .get_or_resolve(|| async { self.fetch_window().await.map(Arc::new) })
            .await
    }

    #[instrument(skip_all, fields(limit = self.limit, offset = self.offset))]
    async fn fetch_window(&self) -> PaginationResult<Window> {
        let _timer = WindowTimer::new();
        let sentinel = usize::from(self.offset > 0);

        record_store_query("find");
        let mut results = self
            .store
            .find(
                &self.base,
                FindOptions {
                    sort: self.keys.clone(),
                    limit: Some(self.limit + 1 + sentinel),
                    skip: self.offset.saturating_sub(1),
                    projection: self.projection.clone(),
                },
            )
            .await?;

        let has_previous = sentinel == 1 && !results.is_empty();
        if has_previous {
            results.remove(0);
        }

        let has_more = results.len() > self.limit;
        results.truncate(self.limit);

        debug!(results = results.len(), has_previous, has_more, "Offset window fetched");
        record_page_served("offset");
        Ok(Window {
            results,
            has_previous,
            has_more,
        })
    }

    /// Offset of the first edge.
    pub fn start_offset(&self) -> usize {
        self.offset
    }

    /// Offset just past the last edge.
    pub async fn end_offset(&self) -> PaginationResult<usize> {
        Ok(self.offset + self.window().await?.results.len())
    }

    fn to_edge(&self, node: Document) -> Edge {
        let id = get_path(&node, &self.id_field)
            .cloned()
            .unwrap_or(Value::Null);
        let edge = Edge::lazy(node, id);
        match &self.format_edge {
            Some(format) => format(edge),
            None => edge,
        }
    }
}

#[async_trait]
impl Paginated for OffsetPage {
    async fn total_count(&self) -> PaginationResult<u64> {
        self.total
            .get_or_resolve(|| async {
                record_store_query("count");
                Ok(self.store.count_documents(&self.base).await?)
            })
            .await
    }

    async fn edges(&self) -> PaginationResult<Vec<Edge>> {
        let window = self.window().await?;
        if let Some(hook) = &self.on_load_edges {
            hook(&window.results);
        }
        Ok(window
            .results
            .iter()
            .cloned()
            .map(|node| self.to_edge(node))
            .collect())
    }

    async fn has_next_page(&self) -> PaginationResult<bool> {
        Ok(self.window().await?.has_more)
    }

    async fn has_previous_page(&self) -> PaginationResult<bool> {
        Ok(self.window().await?.has_previous)
    }

    async fn start_cursor(&self) -> PaginationResult<Option<Cursor>> {
        let window = self.window().await?;
        Ok(window
            .results
            .first()
            .cloned()
            .map(|node| self.to_edge(node).cursor()))
    }

    async fn end_cursor(&self) -> PaginationResult<Option<Cursor>> {
        let window = self.window().await?;
        Ok(window
            .results
            .last()
            .cloned()
            .map(|node| self.to_edge(node).cursor()))
    }
}
