//! PostgreSQL storage adapter.
//!
//! This module implements the store traits defined in `folio-core`
//! using PostgreSQL as the backing store. Documents live as JSONB rows in
//! a single `documents` table keyed by `(collection, id)`.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgCollections`] - Hands out one store per collection name
//! - [`PgDocumentStore`] - `DocumentStore` over one collection
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_server(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let collections = PgCollections::new(Arc::new(db));
//! ```

mod collection;
mod database;
mod sql;

pub use collection::{PgCollections, PgDocumentStore};
pub use database::{Database, DatabaseConfig};
