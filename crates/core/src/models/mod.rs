//! Document and value model.
//!
//! Documents are JSON objects. Values that plain JSON cannot express
//! (object ids, dates, binary) use canonical extended-JSON wrappers, see
//! [`ext`], so they survive cursor encoding without a custom wire format.

pub mod ext;

use std::cmp::Ordering;

use serde_json::{Map, Value};

/// A stored record.
pub type Document = Map<String, Value>;

// =============================================================================
// Path Access
// =============================================================================

/// Resolve a dotted path (`a.b.2.c`) inside a document.
///
/// Object segments are looked up by key, array segments by numeric index.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Set a dotted path inside a document, creating intermediate objects.
///
/// Existing non-object values along the path are replaced.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}

/// Split a path whose last segment addresses an array position.
///
/// `tags.2` yields `("tags", 2)`; paths without a trailing numeric segment
/// yield `None`.
pub fn split_array_index(path: &str) -> Option<(&str, usize)> {
    let (prefix, last) = path.rsplit_once('.')?;
    if prefix.is_empty() || last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((prefix, last.parse().ok()?))
}

// =============================================================================
// Value Ordering
// =============================================================================

/// Canonical type bracket used to order values of different types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeRank {
    Null,
    Number,
    String,
    Object,
    Array,
    Binary,
    ObjectId,
    Boolean,
    Date,
}

impl TypeRank {
    /// Position of the bracket in the cross-type order, starting at 0.
    pub fn ordinal(self) -> i32 {
        self as i32
    }
}

/// Determine the type bracket of a value, recognising extended-JSON wrappers.
pub fn type_rank(value: &Value) -> TypeRank {
    match value {
        Value::Null => TypeRank::Null,
        Value::Bool(_) => TypeRank::Boolean,
        Value::Number(_) => TypeRank::Number,
        Value::String(_) => TypeRank::String,
        Value::Array(_) => TypeRank::Array,
        Value::Object(map) => match ext::wrapper_kind(map) {
            Some(ext::ExtKind::ObjectId) => TypeRank::ObjectId,
            Some(ext::ExtKind::Date) => TypeRank::Date,
            Some(ext::ExtKind::Binary) => TypeRank::Binary,
            None => TypeRank::Object,
        },
    }
}

/// Total order over values.
///
/// Values of different types order by [`TypeRank`]; values of the same
/// type order naturally. Objects and arrays compare element by element.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_sequences(x.iter(), y.iter()),
        (Value::Object(x), Value::Object(y)) => match rank_a {
            TypeRank::Date => compare_dates(x, y),
            // Object ids and binary payloads compare by their canonical text.
            _ => compare_objects(x, y),
        },
        _ => Ordering::Equal,
    }
}

/// Whether two values are equal under [`compare_values`].
///
/// Numerically equal integers and floats compare equal, unlike `Value::eq`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

fn compare_numbers(x: &serde_json::Number, y: &serde_json::Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or(f64::NAN);
    let b = y.as_f64().unwrap_or(f64::NAN);
    a.total_cmp(&b)
}

fn compare_sequences<'a>(
    mut x: impl Iterator<Item = &'a Value>,
    mut y: impl Iterator<Item = &'a Value>,
) -> Ordering {
    loop {
        match (x.next(), y.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => match compare_values(a, b) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

fn compare_objects(x: &Map<String, Value>, y: &Map<String, Value>) -> Ordering {
    let mut left = x.iter();
    let mut right = y.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((ka, va)), Some((kb, vb))) => {
                let ord = ka.cmp(kb).then_with(|| compare_values(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_dates(x: &Map<String, Value>, y: &Map<String, Value>) -> Ordering {
    match (ext::date_millis(x), ext::date_millis(y)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => compare_objects(x, y),
    }
}
