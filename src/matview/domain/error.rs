//! Materialized view domain errors.

use thiserror::Error;

/// Errors returned while constructing view domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatviewDomainError {
    /// The view name is not a plain, optionally schema-qualified identifier.
    #[error("invalid materialized view name: {0:?}")]
    InvalidViewName(String),
}
