//! Field projection.
//!
//! Inclusion entries keep only the listed paths. `$slice` entries trim an
//! array to a window. A projection made only of slices keeps every other
//! field untouched.

use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{Document, get_path, set_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProjection {
    Include(String),
    Slice {
        path: String,
        skip: usize,
        limit: usize,
    },
}

impl FieldProjection {
    pub fn path(&self) -> &str {
        match self {
            Self::Include(path) | Self::Slice { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<FieldProjection>,
}

impl Projection {
    /// Keep only the given paths.
    pub fn include<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: paths
                .into_iter()
                .map(|p| FieldProjection::Include(p.into()))
                .collect(),
        }
    }

    /// Trim the array at `path` to `limit` elements starting at `skip`.
    pub fn slice(path: impl Into<String>, skip: usize, limit: usize) -> Self {
        Self {
            fields: vec![FieldProjection::Slice {
                path: path.into(),
                skip,
                limit,
            }],
        }
    }

    /// Add an inclusion entry unless the path is already projected.
    pub fn with_field(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.fields.iter().any(|f| f.path() == path) {
            self.fields.push(FieldProjection::Include(path));
        }
        self
    }

    pub fn fields(&self) -> &[FieldProjection] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn is_inclusion(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f, FieldProjection::Include(_)))
    }

    /// Parse `{"a": 1, "b.c": true, "tags": {"$slice": [2, 1]}}`.
    pub fn from_document(doc: &Value) -> Result<Self, ValidationError> {
        let map = doc.as_object().ok_or_else(|| {
            ValidationError::InvalidQuery("projection must be an object".into())
        })?;

        let mut fields = Vec::with_capacity(map.len());
        for (path, spec) in map {
            let entry = match spec {
                Value::Bool(true) => FieldProjection::Include(path.clone()),
                Value::Number(n) if n.as_i64() == Some(1) => FieldProjection::Include(path.clone()),
                Value::Object(op) => match op.get("$slice") {
                    Some(Value::Array(args)) if args.len() == 2 => FieldProjection::Slice {
                        path: path.clone(),
                        skip: slice_arg(&args[0])?,
                        limit: slice_arg(&args[1])?,
                    },
                    Some(limit) => FieldProjection::Slice {
                        path: path.clone(),
                        skip: 0,
                        limit: slice_arg(limit)?,
                    },
                    None => {
                        return Err(ValidationError::InvalidQuery(format!(
                            "unsupported projection for {path}"
                        )));
                    }
                },
                _ => {
                    return Err(ValidationError::InvalidQuery(format!(
                        "only inclusion projections are supported ({path})"
                    )));
                }
            };
            fields.push(entry);
        }

        Ok(Self { fields })
    }

    /// Produce the projected copy of a document.
    pub fn apply(&self, doc: &Document) -> Document {
        if self.fields.is_empty() {
            return doc.clone();
        }

        let mut out = if self.is_inclusion() {
            Document::new()
        } else {
            doc.clone()
        };

        for field in &self.fields {
            match field {
                FieldProjection::Include(path) => {
                    if let Some(value) = get_path(doc, path) {
                        set_path(&mut out, path, value.clone());
                    }
                }
                FieldProjection::Slice { path, skip, limit } => {
                    if let Some(value) = get_path(doc, path) {
                        let sliced = match value {
                            Value::Array(items) => Value::Array(
                                items.iter().skip(*skip).take(*limit).cloned().collect(),
                            ),
                            other => other.clone(),
                        };
                        set_path(&mut out, path, sliced);
                    }
                }
            }
        }

        out
    }
}

fn slice_arg(value: &Value) -> Result<usize, ValidationError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ValidationError::InvalidQuery(format!("invalid $slice argument {value}")))
}
