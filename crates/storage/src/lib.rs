//! Storage layer for folio.
//!
//! This crate provides implementations of the document store traits
//! defined in `folio-core`:
//!
//! - [`memory`] - In-memory collections for tests, demos and `--memory` mode
//! - [`postgres`] - PostgreSQL JSONB collections
//!
//! # Usage
//!
//! ```ignore
//! use folio_storage::{Database, DatabaseConfig, PgCollections};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_server(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Serve collections
//! let collections = Arc::new(PgCollections::new(Arc::new(db)));
//! ```

pub mod memory;
pub mod postgres;

pub use memory::{MemoryCollections, MemoryStore, QueryOp, QueryRecord};
pub use postgres::{Database, DatabaseConfig, PgCollections, PgDocumentStore};
