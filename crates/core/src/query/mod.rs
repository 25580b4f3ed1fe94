//! Query model shared by the paginators and the store adapters.

mod filter;
mod projection;
mod sort;

pub use filter::*;
pub use projection::*;
pub use sort::*;
