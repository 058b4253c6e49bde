//! Warehouse port producing ticket rows for parameterized queries.

use crate::bug_mapping::domain::TicketRow;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for warehouse operations.
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Lazy, finite, non-restartable sequence of rows.
///
/// The end of the sequence is signalled by the stream returning `None`.
pub type TicketRowStream = BoxStream<'static, WarehouseResult<TicketRow>>;

/// Which mapping a warehouse query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingSource {
    /// Tickets mentioning a known test name.
    TestMentions,
    /// Tickets mentioning a known job name.
    JobMentions,
    /// Tickets referenced by triage records.
    TriageKeys,
}

impl MappingSource {
    /// Returns the canonical label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TestMentions => "test",
            Self::JobMentions => "job",
            Self::TriageKeys => "triage",
        }
    }
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named array parameter bound into a warehouse query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameter {
    /// Parameter name without the `@` prefix.
    pub name: String,
    /// Parameter values.
    pub values: Vec<String>,
}

/// A parameterized warehouse query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseQuery {
    source: MappingSource,
    sql: String,
    parameters: Vec<QueryParameter>,
}

impl WarehouseQuery {
    /// Creates a query without parameters.
    #[must_use]
    pub fn new(source: MappingSource, sql: impl Into<String>) -> Self {
        Self {
            source,
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    /// Adds a named array parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.parameters.push(QueryParameter {
            name: name.into(),
            values,
        });
        self
    }

    /// Returns the mapping this query produces.
    #[must_use]
    pub const fn source(&self) -> MappingSource {
        self.source
    }

    /// Returns the query text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns bound parameters.
    #[must_use]
    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Returns the values of the named parameter.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&[String]> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| parameter.values.as_slice())
    }
}

/// Analytics warehouse contract.
#[async_trait]
pub trait TicketWarehouse: Send + Sync {
    /// Executes a query and returns its rows lazily.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] when the query cannot be started.
    /// Errors raised while iterating are yielded as stream items.
    async fn query(&self, query: &WarehouseQuery) -> WarehouseResult<TicketRowStream>;
}

/// Errors returned by warehouse implementations.
#[derive(Debug, Clone, Error)]
pub enum WarehouseError {
    /// The query could not be executed.
    #[error("failed to execute query: {0}")]
    Query(Arc<dyn std::error::Error + Send + Sync>),

    /// Iteration over the result set failed.
    #[error("failed to iterate over ticket results: {0}")]
    Read(Arc<dyn std::error::Error + Send + Sync>),
}

impl WarehouseError {
    /// Wraps a query execution error.
    pub fn query(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Query(Arc::new(err))
    }

    /// Wraps a row iteration error.
    pub fn read(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Read(Arc::new(err))
    }
}
