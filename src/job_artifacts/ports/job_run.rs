//! Lookup of stored job runs.

use crate::job_artifacts::domain::JobRunId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Stored job run fields needed to locate artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRunRecord {
    /// Job run identifier.
    pub id: JobRunId,
    /// Name of the job definition.
    pub job_name: String,
    /// Job run URL, when recorded.
    pub url: Option<String>,
}

/// Read access to job runs in the relational store.
#[async_trait]
pub trait JobRunRepository: Send + Sync {
    /// Finds a job run by identifier.
    async fn find_job_run(&self, id: JobRunId) -> Result<Option<JobRunRecord>, JobRunRepositoryError>;
}

/// Errors returned by job run repository implementations.
#[derive(Debug, Clone, Error)]
pub enum JobRunRepositoryError {
    /// Persistence failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl JobRunRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
