//! Keyset paginator behaviour against the in-memory store.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Value, json};

use folio_core::config::PaginationConfig;
use folio_core::error::{CursorDecodeError, PaginationError, ValidationError};
use folio_core::models::Document;
use folio_core::ports::{Connection, Cursor, Edge, Paginated};
use folio_core::query::{Direction, Filter, Projection, SortOrder, SortSpec};
use folio_core::services::{CursorPage, CursorParams, find_with_cursor};
use folio_storage::{MemoryStore, QueryOp};

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

/// `[{_id:1,v:"a"},{_id:2,v:"b"},{_id:3,v:"b"},{_id:4,v:"c"}]`
fn scenario() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(vec![
        doc(json!({"_id": 3, "v": "b"})),
        doc(json!({"_id": 1, "v": "a"})),
        doc(json!({"_id": 4, "v": "c"})),
        doc(json!({"_id": 2, "v": "b"})),
    ]))
}

fn page(store: &Arc<MemoryStore>, params: CursorParams) -> CursorPage {
    find_with_cursor(store.clone(), params, &PaginationConfig::default()).unwrap()
}

fn by(field: &str, order: SortOrder, limit: i64) -> CursorParams {
    CursorParams {
        sort: SortSpec::new(field, order),
        limit: Some(limit),
        ..Default::default()
    }
}

fn ids(edges: &[Edge]) -> Vec<i64> {
    edges
        .iter()
        .filter_map(|e| e.node.get("_id").and_then(Value::as_i64))
        .collect()
}

async fn page_ids(page: &CursorPage) -> Vec<i64> {
    ids(&page.edges().await.unwrap())
}

async fn count_ops(store: &MemoryStore, op: QueryOp) -> usize {
    store.queries().await.iter().filter(|q| q.op == op).count()
}

#[tokio::test]
async fn test_scenario_first_and_second_page() {
    let store = scenario();

    let first = page(&store, by("v", SortOrder::Asc, 2));
    assert_eq!(page_ids(&first).await, vec![1, 2]);
    assert!(first.has_next_page().await.unwrap());
    assert!(!first.has_previous_page().await.unwrap());

    let second = page(
        &store,
        CursorParams {
            cursor: Some(Cursor::encode(&json!(2)).value),
            direction: Direction::After,
            ..by("v", SortOrder::Asc, 2)
        },
    );
    assert_eq!(page_ids(&second).await, vec![3, 4]);
    assert!(!second.has_next_page().await.unwrap());
    assert!(second.has_previous_page().await.unwrap());
}

#[tokio::test]
async fn test_boundary_exact_limit_has_no_next_page() {
    let store = scenario();
    let page = page(&store, by("_id", SortOrder::Asc, 4));
    assert_eq!(page.edges().await.unwrap().len(), 4);
    assert!(!page.has_next_page().await.unwrap());
}

#[tokio::test]
async fn test_peek_then_follow_end_cursor() {
    let store = Arc::new(MemoryStore::new(
        (1..=3).map(|i| doc(json!({"_id": i}))).collect(),
    ));

    let first = page(&store, by("_id", SortOrder::Asc, 2));
    assert_eq!(page_ids(&first).await, vec![1, 2]);
    assert!(first.has_next_page().await.unwrap());

    let next = page(
        &store,
        CursorParams {
            cursor: first.end_cursor().await.unwrap().map(|c| c.value),
            ..by("_id", SortOrder::Asc, 2)
        },
    );
    assert_eq!(page_ids(&next).await, vec![3]);
    assert!(!next.has_next_page().await.unwrap());
}

#[tokio::test]
async fn test_backward_page_before_cursor() {
    let store = scenario();
    let page = page(
        &store,
        CursorParams {
            cursor: Some(Cursor::encode(&json!(4)).value),
            direction: Direction::Before,
            ..by("_id", SortOrder::Asc, 2)
        },
    );

    assert_eq!(page_ids(&page).await, vec![2, 3]);
    assert!(page.has_previous_page().await.unwrap());
    assert!(page.has_next_page().await.unwrap());
    assert_eq!(page.starting_position().await.unwrap(), 2);
    assert_eq!(page.ending_position().await.unwrap(), 3);
}

#[tokio::test]
async fn test_backward_without_cursor_reads_the_tail() {
    let store = scenario();
    let page = page(
        &store,
        CursorParams {
            direction: Direction::Before,
            ..by("_id", SortOrder::Asc, 2)
        },
    );

    assert_eq!(page_ids(&page).await, vec![3, 4]);
    assert!(page.has_previous_page().await.unwrap());
    assert!(!page.has_next_page().await.unwrap());
    assert_eq!(page.starting_position().await.unwrap(), 3);
    assert_eq!(page.ending_position().await.unwrap(), 4);
}

#[tokio::test]
async fn test_short_backward_page_resets_to_first_page() {
    let store = scenario();
    let reset = page(
        &store,
        CursorParams {
            cursor: Some(Cursor::encode(&json!(2)).value),
            direction: Direction::Before,
            ..by("_id", SortOrder::Asc, 2)
        },
    );
    let first = page(&store, by("_id", SortOrder::Asc, 2));

    assert_eq!(page_ids(&reset).await, page_ids(&first).await);
    assert!(!reset.has_previous_page().await.unwrap());
    assert!(reset.has_next_page().await.unwrap());
    assert_eq!(reset.starting_position().await.unwrap(), 1);
    assert_eq!(reset.ending_position().await.unwrap(), 2);
}

#[tokio::test]
async fn test_positions_follow_the_cursor() {
    let store = scenario();

    let first = page(&store, by("v", SortOrder::Asc, 2));
    assert_eq!(first.starting_position().await.unwrap(), 1);
    assert_eq!(first.ending_position().await.unwrap(), 2);

    let second = page(
        &store,
        CursorParams {
            cursor: Some(Cursor::encode(&json!(2)).value),
            ..by("v", SortOrder::Asc, 2)
        },
    );
    assert_eq!(second.starting_position().await.unwrap(), 3);
    assert_eq!(second.ending_position().await.unwrap(), 4);

    let past_end = page(
        &store,
        CursorParams {
            cursor: Some(Cursor::encode(&json!(4)).value),
            ..by("v", SortOrder::Asc, 2)
        },
    );
    assert!(past_end.edges().await.unwrap().is_empty());
    assert_eq!(past_end.starting_position().await.unwrap(), 0);
    assert_eq!(past_end.ending_position().await.unwrap(), 0);
}

#[tokio::test]
async fn test_descending_ties_follow_identifier() {
    let store = Arc::new(MemoryStore::new(
        (1..=4).map(|i| doc(json!({"_id": i, "v": "same"}))).collect(),
    ));

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = page(
            &store,
            CursorParams {
                cursor: cursor.clone(),
                ..by("v", SortOrder::Desc, 1)
            },
        );
        seen.extend(page_ids(&page).await);
        if !page.has_next_page().await.unwrap() {
            break;
        }
        cursor = page.end_cursor().await.unwrap().map(|c| c.value);
    }

    assert_eq!(seen, vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn test_array_index_sort_field() {
    let store = Arc::new(MemoryStore::new(vec![
        doc(json!({"_id": 1, "tags": ["b", "z"]})),
        doc(json!({"_id": 2, "tags": ["a", "y"]})),
        doc(json!({"_id": 3, "tags": ["c", "x"]})),
    ]));

    let first = page(&store, by("tags.0", SortOrder::Asc, 1));
    assert_eq!(page_ids(&first).await, vec![2]);

    let next = page(
        &store,
        CursorParams {
            cursor: first.end_cursor().await.unwrap().map(|c| c.value),
            ..by("tags.0", SortOrder::Asc, 1)
        },
    );
    assert_eq!(page_ids(&next).await, vec![1]);
}

#[tokio::test]
async fn test_window_is_fetched_once() {
    let store = scenario();
    let page = page(
        &store,
        CursorParams {
            cursor: Some(Cursor::encode(&json!(2)).value),
            ..by("v", SortOrder::Asc, 2)
        },
    );

    let (edges, next, end, again) = tokio::join!(
        page.edges(),
        page.has_next_page(),
        page.end_cursor(),
        page.edges()
    );
    assert_eq!(edges.unwrap(), again.unwrap());
    assert!(!next.unwrap());
    assert!(end.unwrap().is_some());

    // one lookup for the cursor's sort value, one window query
    assert_eq!(count_ops(&store, QueryOp::FindOne).await, 1);
    assert_eq!(count_ops(&store, QueryOp::Find).await, 1);

    assert!(page.has_previous_page().await.unwrap());
    assert!(page.has_previous_page().await.unwrap());
    assert_eq!(count_ops(&store, QueryOp::FindOne).await, 2);
    assert_eq!(count_ops(&store, QueryOp::Find).await, 1);
}

#[tokio::test]
async fn test_total_count_ignores_cursor() {
    let store = scenario();
    let page = page(
        &store,
        CursorParams {
            query: Filter::from_document(&json!({"v": {"$ne": "a"}})).unwrap(),
            cursor: Some(Cursor::encode(&json!(3)).value),
            ..by("_id", SortOrder::Asc, 2)
        },
    );
    assert_eq!(page.total_count().await.unwrap(), 3);
    assert_eq!(page_ids(&page).await, vec![4]);
}

#[tokio::test]
async fn test_malformed_cursor_fails_before_any_query() {
    let store = scenario();
    let result = find_with_cursor(
        store.clone(),
        CursorParams {
            cursor: Some("%%%".into()),
            ..Default::default()
        },
        &PaginationConfig::default(),
    );

    assert!(matches!(
        result.err(),
        Some(PaginationError::Decode(CursorDecodeError::InvalidEncoding(_)))
    ));
    assert!(store.queries().await.is_empty());
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let store = scenario();
    for limit in [0, -1, 101] {
        let result = find_with_cursor(
            store.clone(),
            by("_id", SortOrder::Asc, limit),
            &PaginationConfig::default(),
        );
        assert!(matches!(
            result.err(),
            Some(PaginationError::Validation(ValidationError::InvalidLimit(_)))
        ));
    }
}

#[tokio::test]
async fn test_deleted_cursor_record_fails_and_is_memoized() {
    let store = scenario();
    let first = page(&store, by("v", SortOrder::Asc, 2));
    let cursor = first.end_cursor().await.unwrap().map(|c| c.value);

    // the record behind the cursor disappears between requests
    assert_eq!(store.delete_many(&Filter::eq("_id", json!(2))).await, 1);
    store.clear_queries().await;

    let page = page(
        &store,
        CursorParams {
            cursor,
            ..by("v", SortOrder::Asc, 2)
        },
    );

    let expected = PaginationError::NotFoundDependency { id: "2".into() };
    assert_eq!(page.edges().await.unwrap_err(), expected);
    assert_eq!(page.has_next_page().await.unwrap_err(), expected);
    assert_eq!(count_ops(&store, QueryOp::FindOne).await, 1);
    assert_eq!(count_ops(&store, QueryOp::Find).await, 0);
}

#[tokio::test]
async fn test_projection_keeps_identifier() {
    let store = Arc::new(MemoryStore::new(vec![doc(
        json!({"_id": 1, "v": "a", "secret": true}),
    )]));
    let page = page(
        &store,
        CursorParams {
            projection: Some(Projection::include(["v"])),
            ..by("_id", SortOrder::Asc, 5)
        },
    );

    let edges = page.edges().await.unwrap();
    assert_eq!(edges[0].node, doc(json!({"v": "a", "_id": 1})));
    assert_eq!(edges[0].cursor(), Cursor::encode(&json!(1)));
}

#[tokio::test]
async fn test_edge_formatter_is_applied() {
    let store = scenario();
    let page = page(
        &store,
        CursorParams {
            format_edge: Some(Arc::new(|edge: Edge| {
                edge.map_node(|mut node| {
                    node.insert("seen".into(), json!(true));
                    node
                })
            })),
            ..by("_id", SortOrder::Asc, 1)
        },
    );

    let edges = page.edges().await.unwrap();
    assert_eq!(edges[0].node.get("seen"), Some(&json!(true)));
}

#[tokio::test]
async fn test_connection_resolves_every_field() {
    let store = scenario();
    let page = page(&store, by("v", SortOrder::Asc, 2));
    let connection = Connection::resolve(&page).await.unwrap();

    assert_eq!(ids(&connection.edges), vec![1, 2]);
    assert_eq!(connection.total_count, 4);
    assert!(connection.page_info.has_next_page);
    assert_eq!(connection.page_info.start_cursor, Some(Cursor::encode(&json!(1))));
    assert_eq!(connection.page_info.end_cursor, Some(Cursor::encode(&json!(2))));
}

// =============================================================================
// Properties
// =============================================================================

async fn walk_forward(store: &Arc<MemoryStore>, base: &CursorParams) -> Vec<i64> {
    let mut seen = Vec::new();
    let mut cursor = None;
    for _ in 0..64 {
        let page = page(
            store,
            CursorParams {
                cursor: cursor.clone(),
                direction: Direction::After,
                ..base.clone()
            },
        );
        seen.extend(page_ids(&page).await);
        if !page.has_next_page().await.unwrap() {
            break;
        }
        cursor = page.end_cursor().await.unwrap().map(|c| c.value);
    }
    seen
}

async fn walk_backward(store: &Arc<MemoryStore>, base: &CursorParams) -> Vec<i64> {
    let mut seen: Vec<i64> = Vec::new();
    let mut cursor = None;
    for _ in 0..64 {
        let page = page(
            store,
            CursorParams {
                cursor: cursor.clone(),
                direction: Direction::Before,
                ..base.clone()
            },
        );
        // a reset page restarts at the front and overlaps what was already seen
        let fresh: Vec<i64> = page_ids(&page)
            .await
            .into_iter()
            .take_while(|id| Some(id) != seen.first())
            .collect();
        seen.splice(0..0, fresh);
        if !page.has_previous_page().await.unwrap() {
            break;
        }
        cursor = page.start_cursor().await.unwrap().map(|c| c.value);
    }
    seen
}

#[tokio::test]
async fn test_walks_reach_missing_and_mixed_type_sort_values() {
    // sort order: missing/null, then numbers, then strings
    let store = Arc::new(MemoryStore::new(vec![
        doc(json!({"_id": 1})),
        doc(json!({"_id": 2, "v": "a"})),
        doc(json!({"_id": 3, "v": "b"})),
        doc(json!({"_id": 4, "v": 5})),
        doc(json!({"_id": 5, "v": null})),
        doc(json!({"_id": 6, "v": 5})),
    ]));
    let ascending = vec![1, 5, 4, 6, 2, 3];
    let descending: Vec<i64> = ascending.iter().rev().copied().collect();

    for limit in 1..=3 {
        let base = by("v", SortOrder::Asc, limit);
        assert_eq!(walk_forward(&store, &base).await, ascending, "asc, limit {limit}");
        assert_eq!(walk_backward(&store, &base).await, ascending, "asc, limit {limit}");

        let base = by("v", SortOrder::Desc, limit);
        assert_eq!(walk_forward(&store, &base).await, descending, "desc, limit {limit}");
        assert_eq!(walk_backward(&store, &base).await, descending, "desc, limit {limit}");
    }

    // positions still count the records before a cursor of another type
    let after_null = page(
        &store,
        CursorParams {
            cursor: Some(Cursor::encode(&json!(5)).value),
            ..by("v", SortOrder::Asc, 2)
        },
    );
    assert_eq!(page_ids(&after_null).await, vec![4, 6]);
    assert_eq!(after_null.starting_position().await.unwrap(), 3);
    assert!(after_null.has_previous_page().await.unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_forward_and_backward_walks_agree(
        values in prop::collection::vec(0i64..3, 0..12),
        limit in 1i64..5,
        descending in any::<bool>(),
    ) {
        let docs: Vec<Document> = values
            .iter()
            .enumerate()
            .map(|(i, v)| doc(json!({"_id": i as i64 + 1, "v": v})))
            .collect();
        let order = if descending { SortOrder::Desc } else { SortOrder::Asc };

        let mut expected: Vec<(i64, i64)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, i as i64 + 1))
            .collect();
        expected.sort();
        if descending {
            expected.reverse();
        }
        let expected: Vec<i64> = expected.into_iter().map(|(_, id)| id).collect();

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (forward, backward, total) = rt.block_on(async {
            let store = Arc::new(MemoryStore::new(docs));
            let base = by("v", order, limit);
            let total = page(&store, base.clone()).total_count().await.unwrap();
            (walk_forward(&store, &base).await, walk_backward(&store, &base).await, total)
        });

        prop_assert_eq!(&forward, &expected);
        prop_assert_eq!(&backward, &expected);
        prop_assert_eq!(total, values.len() as u64);
    }
}
