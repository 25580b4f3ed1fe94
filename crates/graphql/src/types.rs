//! GraphQL type definitions.

use async_graphql::{EmptyMutation, EmptySubscription, Schema};

use crate::schema::DocumentQuery;

/// The folio GraphQL schema type.
pub type FolioSchema = Schema<DocumentQuery, EmptyMutation, EmptySubscription>;
