//! Relational store operations needed to refresh views.

use crate::matview::domain::ViewName;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for view store operations.
pub type ViewStoreResult<T> = Result<T, ViewStoreError>;

/// Refresh strategy for a materialized view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshMode {
    /// Rebuild without locking out readers; needs a populated view with a
    /// unique index.
    Concurrent,
    /// Rebuild holding an exclusive lock on the view.
    Blocking,
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Concurrent => "concurrent",
            Self::Blocking => "blocking",
        })
    }
}

/// Store holding the materialized views.
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Counts the rows currently in `view`.
    async fn count_rows(&self, view: &ViewName) -> ViewStoreResult<u64>;

    /// Re-derives `view` using `mode`.
    async fn refresh(&self, view: &ViewName, mode: RefreshMode) -> ViewStoreResult<()>;
}

/// Errors returned by view store implementations.
#[derive(Debug, Clone, Error)]
pub enum ViewStoreError {
    /// The store rejected or failed the statement.
    #[error("view store error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ViewStoreError {
    /// Wraps a store-specific error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
