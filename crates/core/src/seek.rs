//! Seek-predicate builder.
//!
//! A seek predicate restricts a query to the records strictly after (or
//! before) the record a cursor names. With the identifier as sort field this
//! is a single comparison. For any other field the cursor's record is looked
//! up to learn its current sort value `v`, and the predicate becomes
//!
//! ```text
//! (field op v) OR (field = v AND id op cursorId)
//! ```
//!
//! which keeps the order total when several records share `v`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::error::{PaginationError, PaginationResult};
use crate::metrics::record_store_query;
use crate::models::{get_path, split_array_index};
use crate::ports::{DocumentStore, FindOneOptions};
use crate::query::{Comparison, Direction, Filter, Projection, SortSpec};

// =============================================================================
// Seek Predicate
// =============================================================================

/// Current sort value of the cursor's record (compound sorts only).
#[derive(Debug, Clone, PartialEq)]
pub struct SortValue {
    pub field: String,
    pub value: Value,
}

/// "Strictly past this cursor" in a given sort and direction.
///
/// Comparisons follow the store's sort order, so values of other types and
/// missing fields are placed exactly where the sort puts them.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekPredicate {
    pub id_field: String,
    /// Identifier decoded from the cursor.
    pub id: Value,
    /// Strict comparison applied to both the sort field and the identifier.
    pub op: Comparison,
    /// `None` when the sort field is the identifier.
    pub sort_value: Option<SortValue>,
}

impl SeekPredicate {
    /// Render as a store filter.
    pub fn to_filter(&self) -> Filter {
        let by_id = Filter::order_cmp(&self.id_field, self.op, self.id.clone());
        match &self.sort_value {
            None => by_id,
            Some(SortValue { field, value }) => Filter::Or(vec![
                Filter::order_cmp(field, self.op, value.clone()),
                Filter::And(vec![Filter::order_eq(field, value.clone()), by_id]),
            ]),
        }
    }

    /// Everything the predicate excludes: the cursor record and the other side.
    pub fn complement(&self) -> Filter {
        let by_id = Filter::order_cmp(&self.id_field, self.op.complement(), self.id.clone());
        match &self.sort_value {
            None => by_id,
            Some(SortValue { field, value }) => Filter::Or(vec![
                Filter::order_cmp(field, self.op.opposite(), value.clone()),
                Filter::And(vec![Filter::order_eq(field, value.clone()), by_id]),
            ]),
        }
    }
}

// =============================================================================
// Sort Value Lookup
// =============================================================================

/// Point lookup of a record's current sort value.
#[async_trait]
pub trait SortValueLookup: Send + Sync {
    /// Value of `field` on the record identified by `id`.
    ///
    /// A missing record is [`PaginationError::NotFoundDependency`]; a missing
    /// field is `null`.
    async fn sort_value(&self, id: &Value, field: &str) -> PaginationResult<Value>;
}

/// [`SortValueLookup`] backed by a document store.
pub struct StoreLookup<'a> {
    store: &'a dyn DocumentStore,
    id_field: &'a str,
}

impl<'a> StoreLookup<'a> {
    pub fn new(store: &'a dyn DocumentStore, id_field: &'a str) -> Self {
        Self { store, id_field }
    }
}

#[async_trait]
impl SortValueLookup for StoreLookup<'_> {
    async fn sort_value(&self, id: &Value, field: &str) -> PaginationResult<Value> {
        // Array positions cannot be projected directly; ask for a one-element slice.
        let array_index = split_array_index(field);
        let projection = match array_index {
            Some((array, index)) => Projection::slice(array, index, 1),
            None => Projection::include([field]),
        };

        record_store_query("find_one");
        let doc = self
            .store
            .find_one(
                &Filter::eq(self.id_field, id.clone()),
                FindOneOptions {
                    projection: Some(projection),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| PaginationError::NotFoundDependency { id: id.to_string() })?;

        let value = match array_index {
            Some((array, _)) => get_path(&doc, array)
                .and_then(Value::as_array)
                .and_then(|items| items.first()),
            None => get_path(&doc, field),
        };

        Ok(value.cloned().unwrap_or(Value::Null))
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Build the seek predicate for a decoded cursor.
///
/// Returns `Ok(None)` when there is no cursor: the page is unrestricted.
pub async fn build_seek_predicate(
    cursor: Option<&Value>,
    direction: Direction,
    sort: &SortSpec,
    id_field: &str,
    lookup: &dyn SortValueLookup,
) -> PaginationResult<Option<SeekPredicate>> {
    let Some(id) = cursor else {
        return Ok(None);
    };

    let op = Comparison::strict_for_sign(sort.order.sign() * direction.sign());

    let sort_value = if sort.field == id_field {
        None
    } else {
        let value = lookup.sort_value(id, &sort.field).await?;
        Some(SortValue {
            field: sort.field.clone(),
            value,
        })
    };

    let predicate = SeekPredicate {
        id_field: id_field.to_string(),
        id: id.clone(),
        op,
        sort_value,
    };
    trace!(filter = %predicate.to_filter().to_document(), "Built seek predicate");

    Ok(Some(predicate))
}
