//! Loader contract for the refresh cycle.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// A source of data synced into the local store during a refresh cycle.
#[async_trait]
pub trait DataLoader: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Runs one load, returning every failure encountered.
    ///
    /// An empty list means the load completed cleanly.
    async fn load(&self) -> Vec<LoadFailure>;
}

/// A failure reported by a [`DataLoader`].
#[derive(Debug, Clone, Error)]
pub enum LoadFailure {
    /// The load stopped before writing anything.
    #[error("load aborted: {0}")]
    Aborted(Arc<dyn std::error::Error + Send + Sync>),
    /// Part of the load failed; the rest was written.
    #[error("{0}")]
    Partial(Arc<dyn std::error::Error + Send + Sync>),
}

impl LoadFailure {
    /// Wraps an error that stopped the load.
    #[must_use]
    pub fn aborted(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Aborted(Arc::new(err))
    }

    /// Wraps an error affecting part of the load.
    #[must_use]
    pub fn partial(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Partial(Arc::new(err))
    }

    /// Returns `true` when the load wrote nothing.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}
