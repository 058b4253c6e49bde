//! Destination for refresh timings.

use crate::matview::domain::RefreshReport;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Receives the timings of a completed refresh batch.
#[async_trait]
pub trait RefreshMetricsSink: Send + Sync {
    /// Publishes per-view and total timings from `report`.
    async fn push(&self, report: &RefreshReport) -> Result<(), MetricsPushError>;
}

/// Errors returned while publishing refresh metrics.
#[derive(Debug, Clone, Error)]
pub enum MetricsPushError {
    /// The sink could not be configured.
    #[error("invalid metrics sink configuration: {0}")]
    Configuration(String),
    /// The request could not be delivered.
    #[error("metrics push failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
    /// The sink answered with a non-success status.
    #[error("metrics push rejected with status {status}")]
    Rejected {
        /// HTTP status code returned.
        status: u16,
    },
}

impl MetricsPushError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
