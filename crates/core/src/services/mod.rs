//! Paginators.
//!
//! Store-backed: [`keyset`] (cursor) and [`offset`]. In-memory:
//! [`objects`] (cursor) and [`offset_objects`].

pub mod keyset;
pub mod objects;
pub mod offset;
pub mod offset_objects;

pub use keyset::{CursorPage, CursorParams, find_with_cursor};
pub use objects::{
    DocumentLoader, DocumentSource, ObjectsPage, ObjectsParams, RelayArgs, RelaySlice,
    find_with_objects, relay_slice,
};
pub use offset::{OffsetPage, OffsetParams, find_with_offset};
pub use offset_objects::{OffsetObjectsPage, OffsetObjectsParams, find_with_offset_objects};
