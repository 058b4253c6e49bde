//! Port loading the locally known tests and jobs.

use crate::bug_mapping::domain::{JobCache, TestCache};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Source of the name lookups used to resolve warehouse matches.
#[async_trait]
pub trait ReferenceDataSource: Send + Sync {
    /// Loads every known test keyed by name.
    async fn load_test_cache(&self) -> Result<TestCache, ReferenceDataError>;

    /// Loads every known CI job keyed by name.
    async fn load_job_cache(&self) -> Result<JobCache, ReferenceDataError>;
}

/// Errors returned while loading reference data.
#[derive(Debug, Clone, Error)]
#[error("failed to load reference data: {0}")]
pub struct ReferenceDataError(Arc<dyn std::error::Error + Send + Sync>);

impl ReferenceDataError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}
