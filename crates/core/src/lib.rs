//! Core domain layer for folio.
//!
//! This crate contains the document model, the query model, the cursor
//! codec and the paginators. It follows hexagonal architecture principles -
//! this is the innermost layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       folio (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │        folio-graphql          │        folio-storage        │
//! │           (API)               │   (PostgreSQL, in-memory)   │
//! ├───────────────────────────────┴─────────────────────────────┤
//! │                   folio-core  ← YOU ARE HERE                │
//! │        (models, query, cursor, seek, paginators)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Documents, dotted paths and the canonical value order
//! - [`query`] - Filters, sort keys and projections sent to the store
//! - [`cursor`] - Opaque cursor codec
//! - [`seek`] - Seek predicates ("strictly past this cursor")
//! - [`services`] - Keyset, offset and in-memory paginators
//! - [`ports`] - Store traits and pagination result types
//! - [`config`] - Limits and defaults
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Lazy results
//!
//! A paginator validates its input up front and then does nothing until an
//! accessor is called. The first accessor that needs data fetches the page
//! window; every other accessor shares it (see [`memo::Memo`]). Secondary
//! queries, such as counts and opposite-side checks, run only when asked for.
//!
//! ## Peek-ahead
//!
//! Store-backed pages fetch `limit + 1` rows. The extra row answers "is
//! there another page" without counting the collection.

pub mod config;
pub mod cursor;
pub mod error;
pub mod memo;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod query;
pub mod seek;
pub mod services;
