//! In-memory cursor paginator.
//!
//! Applies the same edge/page-info contract as the keyset paginator to a
//! collection that is already loaded (or produced on demand): filter with
//! the predicate matcher, sort with a stable multi-key sort, attach every
//! cursor up front, then slice the way Relay connections do.

use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::config::{DEFAULT_ID_FIELD, PaginationConfig};
use crate::cursor::decode_cursor_bounded;
use crate::error::{PaginationResult, ValidationError};
use crate::metrics::{record_cursor_decode_error, record_page_served};
use crate::models::{Document, compare_values, get_path};
use crate::ports::{Cursor, Edge, Paginated};
use crate::query::{Direction, Filter, SortKeys, SortOrder, SortSpec, filter_objects};

// =============================================================================
// Document Source
// =============================================================================

/// Produces the documents of a deferred source.
pub type DocumentLoader =
    Arc<dyn Fn() -> BoxFuture<'static, PaginationResult<Vec<Document>>> + Send + Sync>;

/// Records to paginate: already in memory, or loaded once per call.
#[derive(Clone)]
pub enum DocumentSource {
    Loaded(Vec<Document>),
    Deferred(DocumentLoader),
}

impl DocumentSource {
    pub fn deferred<F, Fut>(load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PaginationResult<Vec<Document>>> + Send + 'static,
    {
        Self::Deferred(Arc::new(move || Box::pin(load())))
    }

    pub(crate) async fn load(self) -> PaginationResult<Vec<Document>> {
        match self {
            Self::Loaded(docs) => Ok(docs),
            Self::Deferred(load) => load().await,
        }
    }
}

impl From<Vec<Document>> for DocumentSource {
    fn from(docs: Vec<Document>) -> Self {
        Self::Loaded(docs)
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Lowercase, with runs of non-alphanumeric characters collapsed to `-`.
pub(crate) fn normalize_sort_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_gap = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            in_gap = false;
        } else if !in_gap {
            out.push('-');
            in_gap = true;
        }
    }
    out
}

fn sort_key(doc: &Document, path: &str) -> Value {
    match get_path(doc, path) {
        Some(Value::String(s)) => Value::String(normalize_sort_string(s)),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

/// Filter, attach cursors and sort a loaded collection.
///
/// The identifier is appended ascending unless the sort already names it.
pub(crate) fn prepare_edges(
    docs: Vec<Document>,
    query: &Filter,
    sort: &[SortSpec],
    id_path: &str,
) -> PaginationResult<Vec<Edge>> {
    let keys = sort
        .iter()
        .fold(SortKeys::new(), |keys, spec| keys.with(spec.field.clone(), spec.order))
        .with(id_path, SortOrder::Asc);

    let mut edges = filter_objects(docs, query)
        .into_iter()
        .map(|doc| {
            let cursor = match get_path(&doc, id_path) {
                None | Some(Value::Null) => {
                    return Err(ValidationError::MissingIdentifier {
                        path: id_path.to_string(),
                    });
                }
                Some(id) => Cursor::encode(id),
            };
            Ok(Edge::encoded(doc, cursor))
        })
        .collect::<Result<Vec<_>, _>>()?;

    edges.sort_by(|a, b| {
        keys.iter()
            .map(|(path, order)| {
                order.apply(compare_values(&sort_key(&a.node, path), &sort_key(&b.node, path)))
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    Ok(edges)
}

pub(crate) fn validate_id_path(id_path: &str) -> Result<(), ValidationError> {
    if id_path.trim().is_empty() {
        return Err(ValidationError::EmptyIdField);
    }
    Ok(())
}

// =============================================================================
// Relay Slicing
// =============================================================================

/// Relay connection arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayArgs {
    pub first: Option<usize>,
    pub after: Option<Cursor>,
    pub last: Option<usize>,
    pub before: Option<Cursor>,
}

impl RelayArgs {
    /// `first`/`after` for AFTER, `last`/`before` for BEFORE.
    pub fn from_direction(limit: usize, cursor: Option<Cursor>, direction: Direction) -> Self {
        match direction {
            Direction::After => Self {
                first: Some(limit),
                after: cursor,
                ..Default::default()
            },
            Direction::Before => Self {
                last: Some(limit),
                before: cursor,
                ..Default::default()
            },
        }
    }
}

/// Result of slicing a sorted edge list.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySlice {
    pub edges: Vec<Edge>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

/// Slice sorted edges by Relay arguments.
///
/// `after` drops everything up to and including its edge, `before` keeps
/// only what precedes its edge; an unknown cursor leaves the list as is.
/// `first` and `last` then cap the remainder from either end.
pub fn relay_slice(mut edges: Vec<Edge>, args: &RelayArgs) -> RelaySlice {
    let position = |edges: &[Edge], cursor: &Cursor| edges.iter().position(|e| e.cursor() == *cursor);

    let after_found = match &args.after {
        Some(after) => match position(&edges, after) {
            Some(index) => {
                edges.drain(..=index);
                true
            }
            None => false,
        },
        None => false,
    };

    let before_found = match &args.before {
        Some(before) => match position(&edges, before) {
            Some(index) => {
                edges.truncate(index);
                true
            }
            None => false,
        },
        None => false,
    };

    let remaining = edges.len();

    if let Some(first) = args.first {
        edges.truncate(first);
    }
    if let Some(last) = args.last {
        let excess = edges.len().saturating_sub(last);
        edges.drain(..excess);
    }

    let has_previous_page = match args.last {
        Some(last) => remaining > last,
        None => after_found,
    };
    let has_next_page = match args.first {
        Some(first) => remaining > first,
        None => before_found,
    };

    RelaySlice {
        edges,
        has_previous_page,
        has_next_page,
    }
}

// =============================================================================
// Paginator
// =============================================================================

/// Inputs of an in-memory cursor pagination call.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectsParams {
    /// Path holding each record's unique identifier.
    pub id_path: String,
    pub query: Filter,
    /// Sort keys, applied in order.
    pub sort: Vec<SortSpec>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub direction: Direction,
}

impl Default for ObjectsParams {
    fn default() -> Self {
        Self {
            id_path: DEFAULT_ID_FIELD.to_string(),
            query: Filter::All,
            sort: Vec::new(),
            limit: None,
            cursor: None,
            direction: Direction::After,
        }
    }
}

/// Paginate a loaded collection by cursor.
pub async fn find_with_objects(
    source: impl Into<DocumentSource>,
    params: ObjectsParams,
    config: &PaginationConfig,
) -> PaginationResult<ObjectsPage> {
    let limit = config.resolve_limit(params.limit)?;
    validate_id_path(&params.id_path)?;

    // Re-encode so an equivalent token still matches the minted edge cursor.
    let cursor = params
        .cursor
        .as_deref()
        .map(|token| decode_cursor_bounded(token, config.max_cursor_len))
        .transpose()
        .inspect_err(|_| record_cursor_decode_error())?
        .map(|id| Cursor::encode(&id));

    let docs = source.into().load().await?;
    let all = prepare_edges(docs, &params.query, &params.sort, &params.id_path)?;
    let total_count = all.len() as u64;

    let args = RelayArgs::from_direction(limit, cursor, params.direction);
    let slice = relay_slice(all, &args);

    debug!(total_count, results = slice.edges.len(), "Objects page sliced");
    record_page_served("objects");

    Ok(ObjectsPage { total_count, slice })
}

/// One in-memory cursor page.
#[derive(Debug, Clone)]
pub struct ObjectsPage {
    total_count: u64,
    slice: RelaySlice,
}

#[async_trait]
impl Paginated for ObjectsPage {
    async fn total_count(&self) -> PaginationResult<u64> {
        Ok(self.total_count)
    }

    async fn edges(&self) -> PaginationResult<Vec<Edge>> {
        Ok(self.slice.edges.clone())
    }

    async fn has_next_page(&self) -> PaginationResult<bool> {
        Ok(self.slice.has_next_page)
    }

    async fn has_previous_page(&self) -> PaginationResult<bool> {
        Ok(self.slice.has_previous_page)
    }

    async fn start_cursor(&self) -> PaginationResult<Option<Cursor>> {
        Ok(self.slice.edges.first().map(Edge::cursor))
    }

    async fn end_cursor(&self) -> PaginationResult<Option<Cursor>> {
        Ok(self.slice.edges.last().map(Edge::cursor))
    }
}
