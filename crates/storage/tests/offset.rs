//! Offset paginator behaviour against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use folio_core::config::PaginationConfig;
use folio_core::error::{PaginationError, ValidationError};
use folio_core::models::Document;
use folio_core::ports::{Cursor, Paginated};
use folio_core::query::{SortOrder, SortSpec};
use folio_core::services::{OffsetPage, OffsetParams, find_with_offset};
use folio_storage::{MemoryStore, QueryOp};

fn store(n: i64) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(
        (1..=n)
            .filter_map(|i| json!({"_id": i, "n": i * 10}).as_object().cloned())
            .collect(),
    ))
}

fn params(limit: i64, offset: i64) -> OffsetParams {
    OffsetParams {
        sort: SortSpec::new("n", SortOrder::Asc),
        limit: Some(limit),
        offset: Some(offset),
        ..Default::default()
    }
}

fn page(store: &Arc<MemoryStore>, params: OffsetParams) -> OffsetPage {
    find_with_offset(store.clone(), params, &PaginationConfig::default()).unwrap()
}

async fn ids(page: &OffsetPage) -> Vec<i64> {
    page.edges()
        .await
        .unwrap()
        .iter()
        .filter_map(|e| e.node.get("_id").and_then(Value::as_i64))
        .collect()
}

#[tokio::test]
async fn test_first_page() {
    let store = store(5);
    let page = page(&store, params(2, 0));

    assert_eq!(ids(&page).await, vec![1, 2]);
    assert!(page.has_next_page().await.unwrap());
    assert!(!page.has_previous_page().await.unwrap());
    assert_eq!(page.start_offset(), 0);
    assert_eq!(page.end_offset().await.unwrap(), 2);
}

#[tokio::test]
async fn test_middle_page_drops_sentinel_and_peek() {
    let store = store(5);
    let page = page(&store, params(2, 2));

    assert_eq!(ids(&page).await, vec![3, 4]);
    assert!(page.has_next_page().await.unwrap());
    assert!(page.has_previous_page().await.unwrap());
    assert_eq!(page.start_offset(), 2);
    assert_eq!(page.end_offset().await.unwrap(), 4);
    assert_eq!(page.start_cursor().await.unwrap(), Some(Cursor::encode(&json!(3))));
    assert_eq!(page.end_cursor().await.unwrap(), Some(Cursor::encode(&json!(4))));
}

#[tokio::test]
async fn test_last_page() {
    let store = store(5);
    let page = page(&store, params(2, 4));

    assert_eq!(ids(&page).await, vec![5]);
    assert!(!page.has_next_page().await.unwrap());
    assert!(page.has_previous_page().await.unwrap());
    assert_eq!(page.end_offset().await.unwrap(), 5);
}

#[tokio::test]
async fn test_offset_past_the_end() {
    let store = store(5);
    let page = page(&store, params(2, 10));

    assert!(ids(&page).await.is_empty());
    assert!(!page.has_next_page().await.unwrap());
    assert!(!page.has_previous_page().await.unwrap());
    assert_eq!(page.start_cursor().await.unwrap(), None);
}

#[tokio::test]
async fn test_single_query_serves_every_accessor() {
    let store = store(5);
    let page = page(&store, params(2, 2));

    let (edges, next, previous, end) = tokio::join!(
        page.edges(),
        page.has_next_page(),
        page.has_previous_page(),
        page.end_offset()
    );
    assert_eq!(edges.unwrap().len(), 2);
    assert!(next.unwrap() && previous.unwrap());
    assert_eq!(end.unwrap(), 4);

    let queries = store.queries().await;
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].op, QueryOp::Find);

    assert_eq!(page.total_count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_load_hook_sees_page_documents() {
    let store = store(5);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let page = page(
        &store,
        OffsetParams {
            on_load_edges: Some(Arc::new(move |docs: &[Document]| {
                assert_eq!(docs.len(), 2);
                seen.fetch_add(1, Ordering::SeqCst);
            })),
            ..params(2, 0)
        },
    );

    page.edges().await.unwrap();
    page.edges().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_negative_offset_rejected() {
    let store = store(1);
    let result = find_with_offset(store.clone(), params(2, -1), &PaginationConfig::default());
    assert!(matches!(
        result.err(),
        Some(PaginationError::Validation(ValidationError::InvalidOffset(-1)))
    ));
}
