//! Store filter model.
//!
//! A [`Filter`] is what the paginators hand to the store: the caller's base
//! query, seek predicates, and their conjunctions. Filters parse from and
//! render to MongoDB-style query documents, and [`Filter::matches`] evaluates
//! them against in-memory documents.

use std::cmp::Ordering;

use serde_json::{Map, Value, json};

use crate::error::ValidationError;
use crate::models::{Document, compare_values, ext, get_path, type_rank, values_equal};

// =============================================================================
// Comparison Operators
// =============================================================================

/// Ordering comparison used in range conditions and seek predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    /// Pick the strict operator for a combined sort/direction sign.
    ///
    /// A positive sign seeks forward (`$gt`), a negative sign backward (`$lt`).
    pub fn strict_for_sign(sign: i8) -> Self {
        if sign >= 0 { Self::Gt } else { Self::Lt }
    }

    /// Query-document operator name.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }

    /// SQL operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Parse a query-document operator name.
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            _ => None,
        }
    }

    /// Same strictness, other side: `>` becomes `<`, `>=` becomes `<=`.
    pub fn opposite(self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
        }
    }

    /// Logical negation: `>` becomes `<=`, `<` becomes `>=`.
    pub fn complement(self) -> Self {
        match self {
            Self::Gt => Self::Lte,
            Self::Gte => Self::Lt,
            Self::Lt => Self::Gte,
            Self::Lte => Self::Gt,
        }
    }

    /// Whether an ordering of `left` against `right` satisfies `left op right`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

// =============================================================================
// Conditions
// =============================================================================

/// A condition on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Cmp(Comparison, Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    /// Position in sort order: every type is comparable, a missing field
    /// counts as null, and arrays compare as a whole.
    OrderCmp(Comparison, Value),
    /// Same position in sort order as the value.
    OrderEq(Value),
}

impl Condition {
    /// Evaluate against the value found at the field path (if any).
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Eq(target) => matches_eq(value, target),
            Self::Ne(target) => !matches_eq(value, target),
            Self::Cmp(op, target) => value.is_some_and(|v| {
                let holds = |candidate: &Value| {
                    type_rank(candidate) == type_rank(target)
                        && op.holds(compare_values(candidate, target))
                };
                holds(v) || v.as_array().is_some_and(|items| items.iter().any(holds))
            }),
            Self::In(targets) => targets.iter().any(|t| matches_eq(value, t)),
            Self::Nin(targets) => !targets.iter().any(|t| matches_eq(value, t)),
            Self::Exists(expected) => value.is_some() == *expected,
            Self::OrderCmp(op, target) => {
                op.holds(compare_values(value.unwrap_or(&Value::Null), target))
            }
            Self::OrderEq(target) => values_equal(value.unwrap_or(&Value::Null), target),
        }
    }

    fn to_document(&self) -> Value {
        match self {
            Self::Eq(v) => json!({ "$eq": v }),
            Self::Ne(v) => json!({ "$ne": v }),
            Self::Cmp(op, v) => json!({ op.operator(): v }),
            Self::In(vs) => json!({ "$in": vs }),
            Self::Nin(vs) => json!({ "$nin": vs }),
            Self::Exists(b) => json!({ "$exists": b }),
            Self::OrderCmp(op, v) => json!({ op.operator(): v }),
            Self::OrderEq(v) => json!({ "$eq": v }),
        }
    }
}

fn matches_eq(value: Option<&Value>, target: &Value) -> bool {
    match value {
        None => target.is_null(),
        Some(v) => {
            values_equal(v, target)
                || (!target.is_array()
                    && v.as_array()
                        .is_some_and(|items| items.iter().any(|item| values_equal(item, target))))
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Store filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Field { path: String, condition: Condition },
}

impl Filter {
    /// Condition on a single field.
    pub fn field(path: impl Into<String>, condition: Condition) -> Self {
        Self::Field {
            path: path.into(),
            condition,
        }
    }

    /// Equality on a single field.
    pub fn eq(path: impl Into<String>, value: Value) -> Self {
        Self::field(path, Condition::Eq(value))
    }

    /// Range comparison on a single field.
    pub fn cmp(path: impl Into<String>, op: Comparison, value: Value) -> Self {
        Self::field(path, Condition::Cmp(op, value))
    }

    /// Sort-order comparison on a single field, as used by seek predicates.
    pub fn order_cmp(path: impl Into<String>, op: Comparison, value: Value) -> Self {
        Self::field(path, Condition::OrderCmp(op, value))
    }

    /// Sort-order equality on a single field.
    pub fn order_eq(path: impl Into<String>, value: Value) -> Self {
        Self::field(path, Condition::OrderEq(value))
    }

    /// Conjunction of two filters; `All` is absorbed.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::All, f) | (f, Self::All) => f,
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Whether this filter places no restriction.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Parse a MongoDB-style query document.
    ///
    /// `null` and `{}` both mean "match everything".
    pub fn from_document(query: &Value) -> Result<Self, ValidationError> {
        match query {
            Value::Null => Ok(Self::All),
            Value::Object(map) => parse_object(map),
            other => Err(ValidationError::InvalidQuery(format!(
                "query must be an object, got {other}"
            ))),
        }
    }

    /// Render back to a MongoDB-style query document.
    pub fn to_document(&self) -> Value {
        match self {
            Self::All => json!({}),
            Self::And(parts) => {
                json!({ "$and": parts.iter().map(Self::to_document).collect::<Vec<_>>() })
            }
            Self::Or(parts) => {
                json!({ "$or": parts.iter().map(Self::to_document).collect::<Vec<_>>() })
            }
            Self::Field { path, condition } => json!({ path.as_str(): condition.to_document() }),
        }
    }

    /// Evaluate against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::And(parts) => parts.iter().all(|f| f.matches(doc)),
            Self::Or(parts) => parts.iter().any(|f| f.matches(doc)),
            Self::Field { path, condition } => condition.matches(get_path(doc, path)),
        }
    }
}

fn parse_object(map: &Map<String, Value>) -> Result<Filter, ValidationError> {
    let mut parts = Vec::with_capacity(map.len());

    for (key, value) in map {
        match key.as_str() {
            "$and" | "$or" => {
                let items = value.as_array().ok_or_else(|| {
                    ValidationError::InvalidQuery(format!("{key} expects an array"))
                })?;
                let children = items
                    .iter()
                    .map(Filter::from_document)
                    .collect::<Result<Vec<_>, _>>()?;
                parts.push(if key == "$and" {
                    Filter::And(children)
                } else {
                    Filter::Or(children)
                });
            }
            op if op.starts_with('$') => {
                return Err(ValidationError::UnsupportedOperator(op.to_string()));
            }
            path => parts.extend(parse_field(path, value)?),
        }
    }

    Ok(match parts.len() {
        0 => Filter::All,
        1 => parts.remove(0),
        _ => Filter::And(parts),
    })
}

fn parse_field(path: &str, value: &Value) -> Result<Vec<Filter>, ValidationError> {
    let operators = match value {
        Value::Object(map)
            if !map.is_empty()
                && ext::wrapper_kind(map).is_none()
                && map.keys().all(|k| k.starts_with('$')) =>
        {
            map
        }
        // Plain values (including extended-JSON wrappers) mean equality.
        _ => return Ok(vec![Filter::eq(path, value.clone())]),
    };

    operators
        .iter()
        .map(|(op, operand)| {
            let condition = match op.as_str() {
                "$eq" => Condition::Eq(operand.clone()),
                "$ne" => Condition::Ne(operand.clone()),
                "$in" => Condition::In(operand_list(op, operand)?),
                "$nin" => Condition::Nin(operand_list(op, operand)?),
                "$exists" => Condition::Exists(operand.as_bool().unwrap_or(!operand.is_null())),
                other => match Comparison::from_operator(other) {
                    Some(cmp) => Condition::Cmp(cmp, operand.clone()),
                    None => return Err(ValidationError::UnsupportedOperator(other.to_string())),
                },
            };
            Ok(Filter::field(path, condition))
        })
        .collect()
}

fn operand_list(op: &str, operand: &Value) -> Result<Vec<Value>, ValidationError> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| ValidationError::InvalidQuery(format!("{op} expects an array")))
}

/// Keep only the documents matching a filter.
pub fn filter_objects(docs: Vec<Document>, filter: &Filter) -> Vec<Document> {
    docs.into_iter().filter(|d| filter.matches(d)).collect()
}
