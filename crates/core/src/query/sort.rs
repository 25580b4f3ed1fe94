//! Sort specification, traversal direction and the sort inverter.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::models::{Document, compare_values, get_path};

// =============================================================================
// Sort Order
// =============================================================================

/// Ordering direction for a sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl SortOrder {
    /// `1` for ascending, `-1` for descending.
    pub fn sign(self) -> i8 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Apply this order to a natural ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl TryFrom<i64> for SortOrder {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Asc),
            -1 => Ok(Self::Desc),
            other => Err(ValidationError::InvalidSortOrder(other)),
        }
    }
}

// =============================================================================
// Direction
// =============================================================================

/// Which side of the cursor a page is taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    After,
    Before,
}

impl Direction {
    /// `1` for AFTER, `-1` for BEFORE.
    pub fn sign(self) -> i8 {
        match self {
            Self::After => 1,
            Self::Before => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::After => "AFTER",
            Self::Before => "BEFORE",
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AFTER" => Ok(Self::After),
            "BEFORE" => Ok(Self::Before),
            _ => Err(ValidationError::InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sort Spec & Keys
// =============================================================================

/// Caller-facing sort: one field and an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ID_FIELD, SortOrder::Asc)
    }
}

/// Ordered list of `(field, order)` keys, as sent to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortKeys(Vec<(String, SortOrder)>);

impl SortKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys for a caller sort, with the identifier appended as tiebreaker.
    ///
    /// The tiebreaker uses the same order as the primary key so the
    /// combined order stays a single direction.
    pub fn for_spec(spec: &SortSpec, id_field: &str) -> Self {
        let mut keys = Self::new().with(spec.field.clone(), spec.order);
        if spec.field != id_field {
            keys = keys.with(id_field, spec.order);
        }
        keys
    }

    /// Append a key; a field already present is ignored.
    pub fn with(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        let field = field.into();
        if !self.contains(&field) {
            self.0.push((field, order));
        }
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|(f, _)| f == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortOrder)> {
        self.0.iter().map(|(f, o)| (f.as_str(), *o))
    }

    /// Flip every order (the sort inverter).
    pub fn invert(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|(field, order)| (field.clone(), order.reversed()))
                .collect(),
        )
    }

    /// Order two documents by these keys. Missing fields sort as null.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in &self.0 {
            let left = get_path(a, field).unwrap_or(&Value::Null);
            let right = get_path(b, field).unwrap_or(&Value::Null);
            let ord = order.apply(compare_values(left, right));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Render as a `{field: 1 | -1}` document.
    pub fn to_document(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(field, order)| (field.clone(), Value::from(order.sign())))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_for_spec_appends_identifier_tiebreaker() {
        let keys = SortKeys::for_spec(&SortSpec::new("name", SortOrder::Desc), "_id");
        assert_eq!(keys.to_document(), json!({"name": -1, "_id": -1}));

        let id_only = SortKeys::for_spec(&SortSpec::default(), "_id");
        assert_eq!(id_only.to_document(), json!({"_id": 1}));
    }

    #[test]
    fn test_invert_flips_every_order() {
        let keys = SortKeys::new()
            .with("a", SortOrder::Asc)
            .with("b", SortOrder::Desc);
        assert_eq!(keys.invert().to_document(), json!({"a": -1, "b": 1}));
        assert_eq!(keys.invert().invert(), keys);
    }

    #[test]
    fn test_compare_uses_tiebreaker() {
        let keys = SortKeys::for_spec(&SortSpec::new("v", SortOrder::Asc), "_id");
        let a = json!({"_id": 2, "v": "b"}).as_object().cloned().unwrap();
        let b = json!({"_id": 3, "v": "b"}).as_object().cloned().unwrap();
        assert_eq!(keys.compare(&a, &b), Ordering::Less);
        assert_eq!(keys.invert().compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_direction_parsing_is_case_insensitive() {
        assert_eq!("before".parse::<Direction>().unwrap(), Direction::Before);
        assert_eq!(" AFTER ".parse::<Direction>().unwrap(), Direction::After);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_sort_order_validation() {
        assert_eq!(SortOrder::try_from(-1).unwrap(), SortOrder::Desc);
        assert_eq!(
            SortOrder::try_from(0).unwrap_err(),
            ValidationError::InvalidSortOrder(0)
        );
    }
}
