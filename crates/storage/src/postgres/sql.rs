//! Filter and sort translation to SQL over JSONB documents.
//!
//! Every field path is bound as a `text[]` parameter and read with
//! `data #> $n`; every value is bound as `jsonb`. Nothing from the caller is
//! interpolated into the SQL text.
//!
//! Range comparisons only match values of the same JSON type, mirroring the
//! in-memory matcher. Sorting and seek conditions instead use a sort key of
//! `(type rank, value)` with missing fields read as `null`, so every value
//! has a place in one total order.

use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use folio_core::models::type_rank;
use folio_core::query::{Comparison, Condition, Filter, SortKeys, SortOrder};

/// Split a dotted path into `#>` segments.
pub(crate) fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

fn push_field(qb: &mut QueryBuilder<'_, Postgres>, path: &str) {
    qb.push("(data #> ");
    qb.push_bind(path_segments(path));
    qb.push("::text[])");
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    qb.push_bind(value.clone());
    qb.push("::jsonb");
}

/// Push a boolean SQL expression for `filter`. Never evaluates to NULL.
pub(crate) fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::And(parts) => push_junction(qb, parts, " AND ", "TRUE"),
        Filter::Or(parts) => push_junction(qb, parts, " OR ", "FALSE"),
        Filter::Field { path, condition } => push_condition(qb, path, condition),
    }
}

fn push_junction(qb: &mut QueryBuilder<'_, Postgres>, parts: &[Filter], sep: &str, empty: &str) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(sep);
        }
        push_filter(qb, part);
    }
    qb.push(")");
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, path: &str, condition: &Condition) {
    match condition {
        Condition::Eq(value) => push_eq(qb, path, value),
        Condition::Ne(value) => {
            qb.push("NOT ");
            push_eq(qb, path, value);
        }
        Condition::Cmp(op, value) => push_cmp(qb, path, *op, value),
        Condition::In(values) => push_any_eq(qb, path, values),
        Condition::Nin(values) => {
            qb.push("NOT ");
            push_any_eq(qb, path, values);
        }
        Condition::Exists(true) => {
            qb.push("(");
            push_field(qb, path);
            qb.push(" IS NOT NULL)");
        }
        Condition::Exists(false) => {
            qb.push("(");
            push_field(qb, path);
            qb.push(" IS NULL)");
        }
        Condition::OrderCmp(op, value) => push_order_cmp(qb, path, op.symbol(), value),
        Condition::OrderEq(value) => push_order_cmp(qb, path, "=", value),
    }
}

fn push_eq(qb: &mut QueryBuilder<'_, Postgres>, path: &str, value: &Value) {
    // null matches both an explicit null and a missing field
    if value.is_null() {
        qb.push("COALESCE(");
        push_field(qb, path);
        qb.push(" = 'null'::jsonb, TRUE)");
        return;
    }

    qb.push("COALESCE(");
    push_field(qb, path);
    qb.push(" = ");
    push_value(qb, value);
    if !value.is_array() {
        // scalar targets also match any element of an array field
        qb.push(" OR (jsonb_typeof(");
        push_field(qb, path);
        qb.push(") = 'array' AND ");
        push_field(qb, path);
        qb.push(" @> jsonb_build_array(");
        push_value(qb, value);
        qb.push("))");
    }
    qb.push(", FALSE)");
}

fn push_any_eq(qb: &mut QueryBuilder<'_, Postgres>, path: &str, values: &[Value]) {
    if values.is_empty() {
        qb.push("FALSE");
        return;
    }
    qb.push("(");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        push_eq(qb, path, value);
    }
    qb.push(")");
}

fn push_cmp(qb: &mut QueryBuilder<'_, Postgres>, path: &str, op: Comparison, value: &Value) {
    qb.push("COALESCE(jsonb_typeof(");
    push_field(qb, path);
    qb.push(") = jsonb_typeof(");
    push_value(qb, value);
    qb.push(") AND ");
    push_field(qb, path);
    qb.push(" ");
    qb.push(op.symbol());
    qb.push(" ");
    push_value(qb, value);
    qb.push(", FALSE)");
}

/// Field value as sorted: a missing field reads as `null`.
fn push_sort_value(qb: &mut QueryBuilder<'_, Postgres>, path: &str) {
    qb.push("COALESCE(");
    push_field(qb, path);
    qb.push(", 'null'::jsonb)");
}

/// Type rank of the sorted value, numbered like `TypeRank::ordinal`.
fn push_sort_rank(qb: &mut QueryBuilder<'_, Postgres>, path: &str) {
    qb.push("(CASE jsonb_typeof(");
    push_sort_value(qb, path);
    qb.push(") WHEN 'null' THEN 0 WHEN 'number' THEN 1 WHEN 'string' THEN 2 WHEN 'array' THEN 4 WHEN 'boolean' THEN 7 ELSE ");
    for (key, rank) in [("$binary", 5), ("$oid", 6), ("$date", 8)] {
        qb.push("CASE WHEN ");
        push_sort_value(qb, path);
        qb.push(" - ");
        qb.push_bind(key);
        qb.push(" = '{}'::jsonb AND ");
        push_sort_value(qb, path);
        qb.push(" ? ");
        qb.push_bind(key);
        qb.push(format!(" THEN {rank} ELSE "));
    }
    qb.push("3 END END END END)");
}

/// `(rank, value) op (rank', value')`, a row comparison in sort order.
fn push_order_cmp(qb: &mut QueryBuilder<'_, Postgres>, path: &str, symbol: &str, value: &Value) {
    qb.push("(");
    push_sort_rank(qb, path);
    qb.push(", ");
    push_sort_value(qb, path);
    qb.push(") ");
    qb.push(symbol);
    qb.push(" (");
    qb.push_bind(type_rank(value).ordinal());
    qb.push(", ");
    push_value(qb, value);
    qb.push(")");
}

/// Push `ORDER BY ...` for the given keys (nothing for an empty sort).
pub(crate) fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, sort: &SortKeys) {
    for (i, (field, order)) in sort.iter().enumerate() {
        let direction = match order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        };
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        push_sort_rank(qb, field);
        qb.push(direction);
        qb.push(", ");
        push_sort_value(qb, field);
        qb.push(direction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(filter: &Filter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_filter(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("a.b.2"), vec!["a", "b", "2"]);
    }

    #[test]
    fn test_values_are_bound_not_inlined() {
        let sql = render(&Filter::eq("name", json!("'; DROP TABLE documents; --")));
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("$1::text[]"));
        assert!(sql.contains("$2::jsonb"));
    }

    #[test]
    fn test_comparison_requires_same_type() {
        let sql = render(&Filter::cmp("v", Comparison::Gt, json!(3)));
        assert_eq!(
            sql,
            "COALESCE(jsonb_typeof((data #> $1::text[])) = jsonb_typeof($2::jsonb) \
             AND (data #> $3::text[]) > $4::jsonb, FALSE)"
        );
    }

    #[test]
    fn test_empty_junctions() {
        assert_eq!(render(&Filter::And(vec![])), "TRUE");
        assert_eq!(render(&Filter::Or(vec![])), "FALSE");
        assert_eq!(render(&Filter::All), "TRUE");
    }

    #[test]
    fn test_order_by_sorts_on_rank_then_value() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT data FROM documents");
        push_order_by(
            &mut qb,
            &SortKeys::new()
                .with("v", SortOrder::Desc)
                .with("_id", SortOrder::Desc),
        );
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT data FROM documents ORDER BY (CASE jsonb_typeof("));
        assert_eq!(sql.matches(" DESC").count(), 4);
        // each key binds 13 parameters for its rank and one for its value
        assert!(sql.ends_with("COALESCE((data #> $28::text[]), 'null'::jsonb) DESC"));
    }

    #[test]
    fn test_order_comparison_is_a_row_comparison() {
        let sql = render(&Filter::order_cmp("v", Comparison::Gt, Value::Null));
        assert!(sql.starts_with("((CASE jsonb_typeof(COALESCE((data #> $1::text[]), 'null'::jsonb))"));
        assert!(sql.ends_with(", COALESCE((data #> $14::text[]), 'null'::jsonb)) > ($15, $16::jsonb)"));
        assert!(!sql.contains("NULLS"));

        let eq = render(&Filter::order_eq("v", json!("a")));
        assert!(eq.ends_with(") = ($15, $16::jsonb)"));
    }
}
