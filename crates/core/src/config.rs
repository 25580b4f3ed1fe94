//! Pagination configuration.
//!
//! Every recognised option is listed here with its default. Paginator
//! parameter structs fall back to these values and are validated against
//! them before any store access.

use crate::error::ValidationError;

/// Default identifier field for stored documents.
pub const DEFAULT_ID_FIELD: &str = "_id";
/// Default page size when a caller supplies none.
pub const DEFAULT_LIMIT: usize = 10;
/// Default upper bound on page size.
pub const DEFAULT_MAX_LIMIT: usize = 100;
/// Bound on cursor token length accepted by the decoder.
pub const DEFAULT_MAX_CURSOR_LEN: usize = 8 * 1024;

/// Engine-wide pagination settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Page size used when the caller omits `limit`.
    pub default_limit: usize,
    /// Largest accepted `limit`.
    pub max_limit: usize,
    /// Identifier field; always projected and used as sort tiebreaker.
    pub id_field: String,
    /// Longest cursor token accepted before decoding.
    pub max_cursor_len: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            id_field: DEFAULT_ID_FIELD.to_string(),
            max_cursor_len: DEFAULT_MAX_CURSOR_LEN,
        }
    }
}

impl PaginationConfig {
    /// Check the configuration is self-consistent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id_field.trim().is_empty() {
            return Err(ValidationError::EmptyIdField);
        }
        if self.max_limit == 0 {
            return Err(ValidationError::InvalidLimit(0));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ValidationError::InvalidLimit(self.default_limit as i64));
        }
        Ok(())
    }

    /// Resolve a requested limit against the defaults and bounds.
    pub fn resolve_limit(&self, requested: Option<i64>) -> Result<usize, ValidationError> {
        match requested {
            None => Ok(self.default_limit),
            Some(n) if n >= 1 && (n as u64) <= self.max_limit as u64 => Ok(n as usize),
            Some(n) => Err(ValidationError::InvalidLimit(n)),
        }
    }

    /// Resolve a requested offset (defaults to 0).
    pub fn resolve_offset(&self, requested: Option<i64>) -> Result<usize, ValidationError> {
        match requested {
            None => Ok(0),
            Some(n) if n >= 0 => Ok(n as usize),
            Some(n) => Err(ValidationError::InvalidOffset(n)),
        }
    }
}
