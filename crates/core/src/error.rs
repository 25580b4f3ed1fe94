//! Error types for the pagination domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ValidationError`] - Malformed paginator input, rejected before any store access
//! - [`CursorDecodeError`] - Malformed cursor tokens
//! - [`StoreError`] - Document store failures, propagated unmodified
//! - [`PaginationError`] - Top-level error returned by every paginator
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Every error is `Clone`: a paginator memoizes the outcome of its window
//! query, failures included, and hands the same outcome to every accessor.

use thiserror::Error;

// =============================================================================
// Validation Errors
// =============================================================================

/// Malformed input shape.
///
/// Raised while validating paginator parameters, before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Limit is below 1 or above the configured maximum.
    #[error("Invalid limit: {0}")]
    InvalidLimit(i64),

    /// Offset is negative.
    #[error("Invalid offset: {0}")]
    InvalidOffset(i64),

    /// Sort order is neither 1 nor -1.
    #[error("Invalid sort order: {0} (expected 1 or -1)")]
    InvalidSortOrder(i64),

    /// Direction is neither AFTER nor BEFORE.
    #[error("Invalid cursor direction: {0} (expected AFTER or BEFORE)")]
    InvalidDirection(String),

    /// Sort field is empty.
    #[error("Sort field is required")]
    MissingSortField,

    /// Identifier field/path is empty.
    #[error("Identifier field cannot be empty")]
    EmptyIdField,

    /// Query document could not be parsed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Query uses an operator the matcher does not understand.
    #[error("Unsupported query operator: {0}")]
    UnsupportedOperator(String),

    /// An in-memory record has no identifier at the configured path.
    #[error("Unable to extract a node ID using path {path}")]
    MissingIdentifier {
        /// Identifier path that was probed.
        path: String,
    },
}

// =============================================================================
// Cursor Errors
// =============================================================================

/// Cursor token could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorDecodeError {
    #[error("cursor token is empty")]
    Empty,

    #[error("cursor token exceeds max length: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("cursor token is not valid base64url: {0}")]
    InvalidEncoding(String),

    #[error("cursor payload is not a valid value: {0}")]
    InvalidPayload(String),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Document store errors.
///
/// These errors originate from the store collaborator. The pagination
/// layer never retries them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Failed to establish a connection to the store.
    #[error("Store connection error: {0}")]
    ConnectionError(String),

    /// Query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Stored data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Named collection is unknown to the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
}

// =============================================================================
// Pagination Errors
// =============================================================================

/// Top-level paginator error.
///
/// Every failure aborts the current paginator call; the caller decides
/// whether to retry with new input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Cursor token was malformed.
    #[error("Cursor decode error: {0}")]
    Decode(#[from] CursorDecodeError),

    /// The record named by a cursor no longer exists.
    ///
    /// Only raised for compound sorts, where the seek predicate needs the
    /// record's current sort value.
    #[error("No document found for cursor id {id}")]
    NotFoundDependency {
        /// JSON rendering of the identifier that could not be loaded.
        id: String,
    },

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for paginator operations.
pub type PaginationResult<T> = Result<T, PaginationError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
