//! In-memory offset paginator.

use async_trait::async_trait;
use tracing::debug;

use crate::config::{DEFAULT_ID_FIELD, PaginationConfig};
use crate::error::PaginationResult;
use crate::metrics::record_page_served;
use crate::ports::{Cursor, Edge, Paginated};
use crate::query::{Filter, SortSpec};

use super::objects::{DocumentSource, prepare_edges, validate_id_path};

/// Inputs of an in-memory offset pagination call.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetObjectsParams {
    pub id_path: String,
    pub query: Filter,
    pub sort: Vec<SortSpec>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Default for OffsetObjectsParams {
    fn default() -> Self {
        Self {
            id_path: DEFAULT_ID_FIELD.to_string(),
            query: Filter::All,
            sort: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// Paginate a loaded collection by offset.
pub async fn find_with_offset_objects(
    source: impl Into<DocumentSource>,
    params: OffsetObjectsParams,
    config: &PaginationConfig,
) -> PaginationResult<OffsetObjectsPage> {
    let limit = config.resolve_limit(params.limit)?;
    let offset = config.resolve_offset(params.offset)?;
    validate_id_path(&params.id_path)?;

    let docs = source.into().load().await?;
    let all = prepare_edges(docs, &params.query, &params.sort, &params.id_path)?;
    let total = all.len();

    let edges: Vec<Edge> = all.into_iter().skip(offset).take(limit).collect();

    debug!(total, offset, results = edges.len(), "Offset objects page sliced");
    record_page_served("offset_objects");

    Ok(OffsetObjectsPage {
        total,
        edges,
        offset,
        limit,
    })
}

/// One in-memory offset page.
#[derive(Debug, Clone)]
pub struct OffsetObjectsPage {
    total: usize,
    edges: Vec<Edge>,
    offset: usize,
    limit: usize,
}

impl OffsetObjectsPage {
    pub fn start_offset(&self) -> usize {
        self.offset
    }

    /// Offset just past the last edge; `None` when nothing matched.
    pub fn end_offset(&self) -> Option<usize> {
        (self.total > 0).then(|| self.offset + self.edges.len())
    }
}

#[async_trait]
impl Paginated for OffsetObjectsPage {
    async fn total_count(&self) -> PaginationResult<u64> {
        Ok(self.total as u64)
    }

    async fn edges(&self) -> PaginationResult<Vec<Edge>> {
        Ok(self.edges.clone())
    }

    async fn has_next_page(&self) -> PaginationResult<bool> {
        Ok(self.total > self.offset + self.limit)
    }

    async fn has_previous_page(&self) -> PaginationResult<bool> {
        Ok(self.offset > 0 && self.total > 0)
    }

    async fn start_cursor(&self) -> PaginationResult<Option<Cursor>> {
        Ok(self.edges.first().map(Edge::cursor))
    }

    async fn end_cursor(&self) -> PaginationResult<Option<Cursor>> {
        Ok(self.edges.last().map(Edge::cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::query::SortOrder;
    use serde_json::{Value, json};

    fn docs(n: i64) -> Vec<Document> {
        (1..=n)
            .filter_map(|i| json!({"_id": i, "rank": 10 - i}).as_object().cloned())
            .collect()
    }

    fn ids(edges: &[Edge]) -> Vec<i64> {
        edges
            .iter()
            .filter_map(|e| e.node.get("_id").and_then(Value::as_i64))
            .collect()
    }

    #[tokio::test]
    async fn test_middle_page() {
        let params = OffsetObjectsParams {
            sort: vec![SortSpec::new("rank", SortOrder::Asc)],
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        };
        let page = find_with_offset_objects(docs(6), params, &PaginationConfig::default())
            .await
            .unwrap();

        // rank ascending reverses the ids
        assert_eq!(ids(&page.edges().await.unwrap()), vec![4, 3]);
        assert!(page.has_next_page().await.unwrap());
        assert!(page.has_previous_page().await.unwrap());
        assert_eq!(page.start_offset(), 2);
        assert_eq!(page.end_offset(), Some(4));
    }

    #[tokio::test]
    async fn test_last_page_has_no_next() {
        let params = OffsetObjectsParams {
            limit: Some(4),
            offset: Some(4),
            ..Default::default()
        };
        let page = find_with_offset_objects(docs(6), params, &PaginationConfig::default())
            .await
            .unwrap();
        assert_eq!(ids(&page.edges().await.unwrap()), vec![5, 6]);
        assert!(!page.has_next_page().await.unwrap());
        assert_eq!(page.end_offset(), Some(6));
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let page = find_with_offset_objects(
            Vec::<Document>::new(),
            OffsetObjectsParams::default(),
            &PaginationConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(page.end_offset(), None);
        assert!(!page.has_previous_page().await.unwrap());
        assert_eq!(page.start_cursor().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_negative_offset_rejected() {
        let params = OffsetObjectsParams {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(
            find_with_offset_objects(docs(3), params, &PaginationConfig::default())
                .await
                .is_err()
        );
    }
}
