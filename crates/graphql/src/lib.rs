//! GraphQL API for folio.
//!
//! Exposes document collections as Relay-style connections, paged either
//! by opaque cursor (`documents`) or by offset (`documentsByOffset`).
//!
//! ```ignore
//! use std::sync::Arc;
//! use folio_core::config::PaginationConfig;
//! use folio_graphql::{build_schema, serve, ServerConfig};
//! use folio_storage::MemoryCollections;
//!
//! let schema = build_schema(Arc::new(MemoryCollections::new()), PaginationConfig::default());
//! serve(schema, ServerConfig::default()).await?;
//! ```

mod schema;
mod server;
mod types;

pub use schema::{
    DocumentConnection, DocumentEdge, DocumentQuery, MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH,
    OffsetDocumentConnection, OffsetPageInfo, Order, PageInfo, build_schema, schema_builder,
};
pub use server::{ServerConfig, router, serve, serve_with_shutdown};
pub use types::FolioSchema;
