//! Pagination result types.
//!
//! These types implement Relay-style connections. Paginators expose their
//! results lazily through [`Paginated`]; [`Connection`] is the fully resolved
//! snapshot, handy for APIs that answer every field at once.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PaginationResult;
use crate::models::Document;

/// Opaque cursor for pagination.
///
/// The cursor value should be treated as an opaque token by clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub value: String,
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self { value }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// How an edge produces its cursor.
#[derive(Debug, Clone, PartialEq)]
enum EdgeCursor {
    /// Encoded on demand from the node identifier.
    Lazy(Value),
    /// Encoded up front (in-memory pagination encodes at sort time).
    Encoded(Cursor),
}

/// A single item in a paginated result.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<T = Document> {
    /// The actual item.
    pub node: T,
    cursor: EdgeCursor,
}

impl<T> Edge<T> {
    /// Edge whose cursor is derived from `id` when first asked for.
    pub fn lazy(node: T, id: Value) -> Self {
        Self {
            node,
            cursor: EdgeCursor::Lazy(id),
        }
    }

    /// Edge with an already-encoded cursor.
    pub fn encoded(node: T, cursor: Cursor) -> Self {
        Self {
            node,
            cursor: EdgeCursor::Encoded(cursor),
        }
    }

    /// Cursor for this item (used for pagination).
    pub fn cursor(&self) -> Cursor {
        match &self.cursor {
            EdgeCursor::Lazy(id) => Cursor::encode(id),
            EdgeCursor::Encoded(cursor) => cursor.clone(),
        }
    }

    /// Transform the node, keeping the cursor.
    pub fn map_node<U>(self, f: impl FnOnce(T) -> U) -> Edge<U> {
        Edge {
            node: f(self.node),
            cursor: self.cursor,
        }
    }
}

/// Information about the current page in a paginated result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Whether there are items before this page.
    pub has_previous_page: bool,
    /// Cursor of the first item in this page.
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last item in this page.
    pub end_cursor: Option<Cursor>,
}

/// Paginated result set with edges and page info.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection<T = Document> {
    /// List of edges (node + cursor pairs).
    pub edges: Vec<Edge<T>>,
    /// Information about the current page.
    pub page_info: PageInfo,
    /// Total count of matching items, ignoring the cursor.
    pub total_count: u64,
}

impl Connection<Document> {
    /// A connection with no edges and no neighbours.
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
        }
    }

    /// Resolve every field of a paginator.
    ///
    /// Accessors run concurrently; they share the paginator's single
    /// window fetch.
    pub async fn resolve(page: &dyn Paginated) -> PaginationResult<Self> {
        let (edges, total_count, has_next_page, has_previous_page, start_cursor, end_cursor) =
            futures::try_join!(
                page.edges(),
                page.total_count(),
                page.has_next_page(),
                page.has_previous_page(),
                page.start_cursor(),
                page.end_cursor(),
            )?;

        Ok(Self {
            edges,
            page_info: PageInfo {
                has_next_page,
                has_previous_page,
                start_cursor,
                end_cursor,
            },
            total_count,
        })
    }
}

/// Lazily evaluated pagination result.
///
/// Every accessor may be called in any order, repeatedly, or concurrently;
/// all of them observe the same underlying window.
#[async_trait]
pub trait Paginated: Send + Sync {
    /// Number of items matching the base query (cursor ignored).
    async fn total_count(&self) -> PaginationResult<u64>;

    /// Items of this page in caller-facing order.
    async fn edges(&self) -> PaginationResult<Vec<Edge>>;

    async fn has_next_page(&self) -> PaginationResult<bool>;

    async fn has_previous_page(&self) -> PaginationResult<bool>;

    async fn start_cursor(&self) -> PaginationResult<Option<Cursor>>;

    async fn end_cursor(&self) -> PaginationResult<Option<Cursor>>;
}

/// Hook applied to every edge before it is returned.
pub type EdgeFormatter = Arc<dyn Fn(Edge) -> Edge + Send + Sync>;

/// Hook called with the page's documents whenever edges are loaded.
pub type LoadHook = Arc<dyn Fn(&[Document]) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lazy_edge_cursor_encodes_identifier() {
        let edge = Edge::lazy(Document::new(), json!(42));
        assert_eq!(edge.cursor().decode().unwrap(), json!(42));
    }

    #[test]
    fn test_map_node_keeps_cursor() {
        let edge = Edge::encoded(1u8, Cursor::from("abc".to_string()));
        let mapped = edge.map_node(|n| n + 1);
        assert_eq!(mapped.node, 2);
        assert_eq!(mapped.cursor().value, "abc");
    }

    #[test]
    fn test_empty_connection() {
        let empty = Connection::empty();
        assert!(empty.edges.is_empty());
        assert!(!empty.page_info.has_next_page && !empty.page_info.has_previous_page);
        assert_eq!(empty.page_info.start_cursor, None);
        assert_eq!(empty.total_count, 0);
    }
}
