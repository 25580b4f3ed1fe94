//! Single-flight memoization for paginator accessors.

use std::future::Future;

use tokio::sync::OnceCell;

use crate::error::PaginationResult;

/// Lazily computed, memoized result.
///
/// Concurrent callers collapse into one computation; every later caller
/// receives a clone of the same outcome, failures included.
#[derive(Debug)]
pub struct Memo<T> {
    cell: OnceCell<PaginationResult<T>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized outcome, running `resolve` if nothing is stored yet.
    pub async fn get_or_resolve<F, Fut>(&self, resolve: F) -> PaginationResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PaginationResult<T>>,
    {
        self.cell.get_or_init(resolve).await.clone()
    }

    /// Whether the computation has already completed.
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}
