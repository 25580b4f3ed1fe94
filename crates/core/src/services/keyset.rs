//! Keyset (cursor) paginator.
//!
//! A [`CursorPage`] is created per call. The first accessor to need data
//! fetches the page window: seek predicate AND base query, sorted (inverted
//! when walking backward), with one extra peek row. Every other accessor
//! reuses that window. Opposite-side existence, absolute positions and the
//! total count are separate queries, each run on demand and memoized.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::PaginationConfig;
use crate::cursor::decode_cursor_bounded;
use crate::error::{PaginationResult, ValidationError};
use crate::memo::Memo;
use crate::metrics::{
    WindowTimer, record_cursor_decode_error, record_keyset_reset, record_page_served,
    record_store_query,
};
use crate::models::{Document, get_path};
use crate::ports::{
    Cursor, DocumentStore, Edge, EdgeFormatter, FindOneOptions, FindOptions, Paginated,
};
use crate::query::{Direction, Filter, Projection, SortKeys, SortSpec};
use crate::seek::{SeekPredicate, StoreLookup, build_seek_predicate};

use async_trait::async_trait;

// =============================================================================
// Parameters
// =============================================================================

/// Inputs of a keyset pagination call.
#[derive(Clone, Default)]
pub struct CursorParams {
    /// Base query; the cursor restriction is added on top of it.
    pub query: Filter,
    /// Sort field and order. The identifier is appended as tiebreaker.
    pub sort: SortSpec,
    /// Page size (`None` = configured default).
    pub limit: Option<i64>,
    /// Cursor token from a previous page.
    pub cursor: Option<String>,
    /// Side of the cursor to read from.
    pub direction: Direction,
    /// Fields to return. The identifier is always added.
    pub projection: Option<Projection>,
    /// Applied to every edge before it is returned.
    pub format_edge: Option<EdgeFormatter>,
}

// =============================================================================
// Window
// =============================================================================

/// Result of the page query.
#[derive(Debug)]
struct Window {
    /// Page items in caller-facing order, peek row removed.
    results: Vec<Document>,
    /// The peek row was present.
    has_more: bool,
    /// A backward page was replaced by the first page.
    reset: bool,
}

// =============================================================================
// Paginator
// =============================================================================

/// Validate inputs and prepare a keyset page.
///
/// No store access happens here; malformed input fails immediately.
pub fn find_with_cursor(
    store: Arc<dyn DocumentStore>,
    params: CursorParams,
    config: &PaginationConfig,
) -> PaginationResult<CursorPage> {
    let limit = config.resolve_limit(params.limit)?;

    if params.sort.field.trim().is_empty() {
        return Err(ValidationError::MissingSortField.into());
    }

    let cursor = params
        .cursor
        .as_deref()
        .map(|token| decode_cursor_bounded(token, config.max_cursor_len))
        .transpose()
        .inspect_err(|_| record_cursor_decode_error())?;

    let keys = SortKeys::for_spec(&params.sort, &config.id_field);
    let projection = params
        .projection
        .map(|p| p.with_field(config.id_field.clone()));

    Ok(CursorPage {
        store,
        base: params.query,
        sort: params.sort,
        keys,
        id_field: config.id_field.clone(),
        limit,
        cursor,
        direction: params.direction,
        projection,
        format_edge: params.format_edge,
        seek: Memo::new(),
        window: Memo::new(),
        other_side: Memo::new(),
        preceding: Memo::new(),
        total: Memo::new(),
    })
}

/// One keyset page, resolved lazily.
pub struct CursorPage {
    store: Arc<dyn DocumentStore>,
    base: Filter,
    sort: SortSpec,
    keys: SortKeys,
    id_field: String,
    limit: usize,
    cursor: Option<Value>,
    direction: Direction,
    projection: Option<Projection>,
    format_edge: Option<EdgeFormatter>,
    seek: Memo<Option<SeekPredicate>>,
    window: Memo<Arc<Window>>,
    other_side: Memo<bool>,
    /// Records strictly before the page's first item.
    preceding: Memo<u64>,
    total: Memo<u64>,
}

impl CursorPage {
    async fn seek(&self) -> PaginationResult<Option<SeekPredicate>> {
        self.seek
            .get_or_resolve(|| async {
                let lookup = StoreLookup::new(self.store.as_ref(), &self.id_field);
                build_seek_predicate(
                    self.cursor.as_ref(),
                    self.direction,
                    &self.sort,
                    &self.id_field,
                    &lookup,
                )
                .await
            })
            .await
    }

    async fn window(&self) -> PaginationResult<Arc<Window>> {
        self.window
            .get_or_resolve(|| async { self.fetch_window().await.map(Arc::new) })
            .await
    }

    #[instrument(skip_all, fields(limit = self.limit, direction = %self.direction))]
    async fn fetch_window(&self) -> PaginationResult<Window> {
        let _timer = WindowTimer::new();

        let filter = match self.seek().await? {
            Some(seek) => self.base.clone().and(seek.to_filter()),
            None => self.base.clone(),
        };

        let (mut results, fetched) = match self.direction {
            Direction::After => {
                let results = self.find_peeked(&filter, self.keys.clone()).await?;
                let fetched = results.len();
                (results, fetched)
            }
            Direction::Before => {
                let mut results = self.find_peeked(&filter, self.keys.invert()).await?;
                let fetched = results.len();
                results.reverse();
                (results, fetched)
            }
        };

        if self.cursor.is_some() && self.direction == Direction::Before && fetched < self.limit {
            // Not enough room before the cursor for a full page: serve the first page.
            record_keyset_reset();
            let mut results = self.find_peeked(&self.base, self.keys.clone()).await?;
            let has_more = results.len() > self.limit;
            results.truncate(self.limit);
            debug!(fetched, results = results.len(), reset = true, "Keyset window fetched");
            record_page_served("keyset");
            return Ok(Window {
                results,
                has_more,
                reset: true,
            });
        }

        let has_more = results.len() > self.limit;
        if has_more {
            match self.direction {
                Direction::After => results.truncate(self.limit),
                Direction::Before => {
                    results.remove(0);
                }
            }
        }

        debug!(fetched, results = results.len(), has_more, "Keyset window fetched");
        record_page_served("keyset");
        Ok(Window {
            results,
            has_more,
            reset: false,
        })
    }

    async fn find_peeked(&self, filter: &Filter, sort: SortKeys) -> PaginationResult<Vec<Document>> {
        record_store_query("find");
        let docs = self
            .store
            .find(
                filter,
                FindOptions {
                    sort,
                    limit: Some(self.limit + 1),
                    skip: 0,
                    projection: self.projection.clone(),
                },
            )
            .await?;
        Ok(docs)
    }

    /// Whether anything lies on the side of the cursor this page did not read.
    async fn other_side_exists(&self) -> PaginationResult<bool> {
        self.other_side
            .get_or_resolve(|| async {
                let window = self.window().await?;
                if window.results.is_empty() {
                    return Ok(false);
                }
                let Some(seek) = self.seek().await? else {
                    return Ok(false);
                };

                record_store_query("find_one");
                let found = self
                    .store
                    .find_one(
                        &self.base.clone().and(seek.complement()),
                        FindOneOptions {
                            sort: self.keys.clone(),
                            projection: Some(Projection::include([self.id_field.as_str()])),
                        },
                    )
                    .await?;
                Ok(found.is_some())
            })
            .await
    }

    /// Count of records ahead of the page in natural order.
    async fn preceding_count(&self) -> PaginationResult<u64> {
        self.preceding
            .get_or_resolve(|| async {
                let window = self.window().await?;
                if window.reset {
                    return Ok(0);
                }
                let len = window.results.len() as u64;

                let filter = match (self.seek().await?, self.direction) {
                    (None, Direction::After) => return Ok(0),
                    (None, Direction::Before) => self.base.clone(),
                    (Some(seek), Direction::After) => self.base.clone().and(seek.complement()),
                    (Some(seek), Direction::Before) => self.base.clone().and(seek.to_filter()),
                };

                record_store_query("count");
                let upto_end = self.store.count_documents(&filter).await?;
                match self.direction {
                    Direction::After => Ok(upto_end),
                    Direction::Before => Ok(upto_end.saturating_sub(len)),
                }
            })
            .await
    }

    /// 1-based position of the first edge (`0` for an empty page).
    pub async fn starting_position(&self) -> PaginationResult<u64> {
        let window = self.window().await?;
        if window.results.is_empty() {
            return Ok(0);
        }
        Ok(self.preceding_count().await? + 1)
    }

    /// 1-based position of the last edge (`0` for an empty page).
    pub async fn ending_position(&self) -> PaginationResult<u64> {
        let window = self.window().await?;
        if window.results.is_empty() {
            return Ok(0);
        }
        Ok(self.preceding_count().await? + window.results.len() as u64)
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
impl Paginated for CursorPage {
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
        Ok(window
            .results
            .iter()
            .cloned()
            .map(|node| self.to_edge(node))
            .collect())
    }

    async fn has_next_page(&self) -> PaginationResult<bool> {
        let window = self.window().await?;
        if window.reset || self.direction == Direction::After {
            return Ok(window.has_more);
        }
        self.other_side_exists().await
    }

    async fn has_previous_page(&self) -> PaginationResult<bool> {
        let window = self.window().await?;
        if window.reset {
            return Ok(false);
        }
        if self.direction == Direction::Before {
            return Ok(window.has_more);
        }
        self.other_side_exists().await
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
