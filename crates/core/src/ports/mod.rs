mod pagination;
mod store;

pub use pagination::*;
pub use store::*;
